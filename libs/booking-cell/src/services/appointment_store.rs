// libs/booking-cell/src/services/appointment_store.rs
use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::models::{Appointment, AppointmentStatus, BookingError};

/// Owner of all appointment records.
///
/// All mutations go through the single write lock, which is what makes the
/// duplicate-admission check and every status change atomic with respect
/// to concurrent callers.
pub struct AppointmentStore {
    appointments: RwLock<HashMap<Uuid, Appointment>>,
}

impl Default for AppointmentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AppointmentStore {
    pub fn new() -> Self {
        Self {
            appointments: RwLock::new(HashMap::new()),
        }
    }

    /// Insert a freshly booked appointment.
    ///
    /// The duplicate check and the insert happen under one write lock, so
    /// two racing bookings by the same patient on the same slot cannot
    /// both pass. Uniqueness is keyed on (slot, patient) over non-cancelled
    /// appointments; a patient whose earlier booking was cancelled may book
    /// the slot again.
    pub async fn insert_booked(
        &self,
        appointment: Appointment,
    ) -> Result<Appointment, BookingError> {
        let mut map = self.appointments.write().await;

        let duplicate = map.values().any(|existing| {
            existing.slot_id == appointment.slot_id
                && existing.patient_id == appointment.patient_id
                && existing.status != AppointmentStatus::Cancelled
        });
        if duplicate {
            debug!(
                "Duplicate booking refused: patient {} already active on slot {}",
                appointment.patient_id, appointment.slot_id
            );
            return Err(BookingError::DuplicateBooking);
        }

        map.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    pub async fn get(&self, appointment_id: Uuid) -> Result<Appointment, BookingError> {
        self.appointments
            .read()
            .await
            .get(&appointment_id)
            .cloned()
            .ok_or(BookingError::AppointmentNotFound)
    }

    /// Atomic read-modify-write on one appointment. The closure runs under
    /// the write lock against a draft copy; the draft is committed only when
    /// the closure returns `Ok`, so an erroring closure changes nothing.
    pub async fn update_with<F>(
        &self,
        appointment_id: Uuid,
        mutate: F,
    ) -> Result<Appointment, BookingError>
    where
        F: FnOnce(&mut Appointment) -> Result<(), BookingError>,
    {
        let mut map = self.appointments.write().await;
        let appointment = map
            .get_mut(&appointment_id)
            .ok_or(BookingError::AppointmentNotFound)?;

        let mut draft = appointment.clone();
        mutate(&mut draft)?;
        draft.updated_at = Utc::now();
        *appointment = draft.clone();
        Ok(draft)
    }

    pub async fn list_for_patient(&self, patient_id: Uuid) -> Vec<Appointment> {
        let mut results: Vec<Appointment> = self
            .appointments
            .read()
            .await
            .values()
            .filter(|appointment| appointment.patient_id == patient_id)
            .cloned()
            .collect();

        results.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        results
    }

    /// Every appointment, newest first, with optional paging.
    pub async fn list_all(
        &self,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Vec<Appointment> {
        let mut results: Vec<Appointment> =
            self.appointments.read().await.values().cloned().collect();

        results.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let offset = offset.unwrap_or(0);
        let mut results: Vec<Appointment> = results.into_iter().skip(offset).collect();
        if let Some(limit) = limit {
            results.truncate(limit);
        }
        results
    }

    /// Number of non-cancelled appointments referencing a slot. Compared
    /// against the slot's `booked_count` by the consistency audit.
    pub async fn active_count_for_slot(&self, slot_id: Uuid) -> u32 {
        self.appointments
            .read()
            .await
            .values()
            .filter(|appointment| {
                appointment.slot_id == slot_id
                    && appointment.status != AppointmentStatus::Cancelled
            })
            .count() as u32
    }
}
