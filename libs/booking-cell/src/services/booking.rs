// libs/booking-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info};
use uuid::Uuid;

use crate::models::{
    Appointment, AppointmentStatus, BookAppointmentRequest, BookingError,
};
use crate::services::access::{AccessPolicy, Actor};
use crate::services::appointment_store::AppointmentStore;
use crate::services::lifecycle::AppointmentLifecycle;
use crate::services::slot_store::SlotStore;

/// Orchestrates slot reservation and appointment creation as one atomic
/// admission, and drives forward status transitions.
pub struct BookingEngine {
    slots: Arc<SlotStore>,
    appointments: Arc<AppointmentStore>,
    lifecycle: AppointmentLifecycle,
    access: AccessPolicy,
}

impl BookingEngine {
    pub fn new(slots: Arc<SlotStore>, appointments: Arc<AppointmentStore>) -> Self {
        Self {
            slots,
            appointments,
            lifecycle: AppointmentLifecycle::new(),
            access: AccessPolicy::new(),
        }
    }

    /// Book an appointment against a slot.
    ///
    /// Capacity is claimed first; if the appointment record cannot be
    /// admitted afterwards (duplicate booking), the reservation is released
    /// so the slot's counter never leaks.
    pub async fn book(
        &self,
        actor: &Actor,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, BookingError> {
        self.access.can_book(actor, request.patient_id)?;

        let slot = self.slots.get(request.slot_id).await?;
        if slot.doctor_id != request.doctor_id {
            return Err(BookingError::ValidationError(
                "doctor_id does not match the slot's doctor".to_string(),
            ));
        }
        if slot.clinic_id != request.clinic_id {
            return Err(BookingError::ValidationError(
                "clinic_id does not match the slot's clinic".to_string(),
            ));
        }
        if slot.start_time <= Utc::now() {
            return Err(BookingError::ValidationError(
                "slot start time is in the past".to_string(),
            ));
        }

        let reservation = self.slots.reserve(request.slot_id).await?;

        let now = Utc::now();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            patient_id: request.patient_id,
            doctor_id: request.doctor_id,
            clinic_id: request.clinic_id,
            slot_id: reservation.slot_id(),
            status: AppointmentStatus::Pending,
            reason_for_visit: request.reason_for_visit,
            notes: None,
            cancelled_at: None,
            cancelled_reason: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        match self.appointments.insert_booked(appointment).await {
            Ok(booked) => {
                info!(
                    "Booked appointment {} for patient {} on slot {}",
                    booked.id, booked.patient_id, booked.slot_id
                );
                Ok(booked)
            }
            Err(admission_error) => {
                // Compensate: give the claimed capacity unit back.
                if let Err(release_error) = self.slots.release(reservation.slot_id()).await {
                    error!(
                        "Failed to release slot {} after refused admission: {}",
                        reservation.slot_id(),
                        release_error
                    );
                    return Err(BookingError::Storage(format!(
                        "reservation leak on slot {}: {}",
                        reservation.slot_id(),
                        release_error
                    )));
                }
                Err(admission_error)
            }
        }
    }

    pub async fn get(
        &self,
        actor: &Actor,
        appointment_id: Uuid,
    ) -> Result<Appointment, BookingError> {
        let appointment = self.appointments.get(appointment_id).await?;
        self.access.can_view(actor, &appointment)?;
        Ok(appointment)
    }

    /// Admin-only view of every appointment, newest first.
    pub async fn list_all(
        &self,
        actor: &Actor,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Vec<Appointment>, BookingError> {
        self.access.can_list_all(actor)?;
        Ok(self.appointments.list_all(limit, offset).await)
    }

    pub async fn list_for_patient(
        &self,
        actor: &Actor,
        patient_id: Uuid,
    ) -> Result<Vec<Appointment>, BookingError> {
        self.access.can_list_for_patient(actor, patient_id)?;
        Ok(self.appointments.list_for_patient(patient_id).await)
    }

    pub async fn confirm(
        &self,
        actor: &Actor,
        appointment_id: Uuid,
    ) -> Result<Appointment, BookingError> {
        self.transition(actor, appointment_id, AppointmentStatus::Confirmed)
            .await
    }

    pub async fn complete(
        &self,
        actor: &Actor,
        appointment_id: Uuid,
    ) -> Result<Appointment, BookingError> {
        self.transition(actor, appointment_id, AppointmentStatus::Completed)
            .await
    }

    /// Mark the patient as absent. The capacity unit stays consumed: a
    /// no-show still occupied the slot.
    pub async fn mark_no_show(
        &self,
        actor: &Actor,
        appointment_id: Uuid,
    ) -> Result<Appointment, BookingError> {
        self.transition(actor, appointment_id, AppointmentStatus::NoShow)
            .await
    }

    async fn transition(
        &self,
        actor: &Actor,
        appointment_id: Uuid,
        target: AppointmentStatus,
    ) -> Result<Appointment, BookingError> {
        let appointment = self.appointments.get(appointment_id).await?;
        self.access.can_transition(actor, &appointment)?;

        let lifecycle = self.lifecycle;
        let updated = self
            .appointments
            .update_with(appointment_id, move |appointment| {
                // Revalidated under the write lock: the status may have moved
                // since the access check read it.
                lifecycle.validate_transition(appointment.status, target)?;
                appointment.status = target;
                Ok(())
            })
            .await?;

        info!("Appointment {} moved to {}", updated.id, updated.status);
        Ok(updated)
    }
}
