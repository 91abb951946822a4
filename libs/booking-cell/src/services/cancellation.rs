// libs/booking-cell/src/services/cancellation.rs
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info};
use uuid::Uuid;

use crate::models::{Appointment, AppointmentStatus, BookingError};
use crate::services::access::{AccessPolicy, Actor};
use crate::services::appointment_store::AppointmentStore;
use crate::services::lifecycle::AppointmentLifecycle;
use crate::services::slot_store::SlotStore;

/// Cancels appointments and returns their capacity unit to the slot.
pub struct CancellationEngine {
    slots: Arc<SlotStore>,
    appointments: Arc<AppointmentStore>,
    lifecycle: AppointmentLifecycle,
    access: AccessPolicy,
}

impl CancellationEngine {
    pub fn new(slots: Arc<SlotStore>, appointments: Arc<AppointmentStore>) -> Self {
        Self {
            slots,
            appointments,
            lifecycle: AppointmentLifecycle::new(),
            access: AccessPolicy::new(),
        }
    }

    /// Cancel an appointment.
    ///
    /// The status flip happens under the appointment store's write lock, so
    /// two racing cancellations resolve to exactly one winner; the loser gets
    /// `AlreadyCancelled` and the capacity unit is released exactly once.
    pub async fn cancel(
        &self,
        actor: &Actor,
        appointment_id: Uuid,
        reason: String,
    ) -> Result<Appointment, BookingError> {
        let appointment = self.appointments.get(appointment_id).await?;
        self.access.can_cancel(actor, &appointment)?;

        let lifecycle = self.lifecycle;
        // Captured under the write lock, so the rollback below restores the
        // status that was actually overwritten, not the pre-lock snapshot.
        let mut prior_status = None;
        let cancelled = self
            .appointments
            .update_with(appointment_id, |appointment| {
                // Recheck under the write lock: the access check above read an
                // unlocked snapshot.
                if appointment.status == AppointmentStatus::Cancelled {
                    return Err(BookingError::AlreadyCancelled);
                }
                lifecycle.validate_transition(appointment.status, AppointmentStatus::Cancelled)?;
                prior_status = Some(appointment.status);
                appointment.status = AppointmentStatus::Cancelled;
                appointment.cancelled_at = Some(Utc::now());
                appointment.cancelled_reason = Some(reason);
                Ok(())
            })
            .await?;

        if let Err(release_error) = self.slots.release(cancelled.slot_id).await {
            error!(
                "Failed to release slot {} after cancelling appointment {}: {}",
                cancelled.slot_id, cancelled.id, release_error
            );
            // Roll the cancellation back rather than leave the counter stale.
            self.appointments
                .update_with(appointment_id, move |appointment| {
                    if let Some(status) = prior_status {
                        appointment.status = status;
                    }
                    appointment.cancelled_at = None;
                    appointment.cancelled_reason = None;
                    Ok(())
                })
                .await?;
            return Err(BookingError::Storage(format!(
                "could not return capacity to slot {}: {}",
                cancelled.slot_id, release_error
            )));
        }

        info!(
            "Cancelled appointment {} and released slot {}",
            cancelled.id, cancelled.slot_id
        );
        Ok(cancelled)
    }
}
