// libs/booking-cell/src/services/lifecycle.rs
use tracing::warn;

use crate::models::{AppointmentStatus, BookingError};

/// Pure transition table for appointment statuses.
///
/// Pending is the entry state of every new booking. Cancelled, Completed and
/// NoShow are terminal: nothing leaves them, not even an Admin.
#[derive(Debug, Default, Clone, Copy)]
pub struct AppointmentLifecycle;

impl AppointmentLifecycle {
    pub fn new() -> Self {
        Self
    }

    pub fn valid_transitions(&self, from: AppointmentStatus) -> &'static [AppointmentStatus] {
        match from {
            AppointmentStatus::Pending => &[
                AppointmentStatus::Confirmed,
                AppointmentStatus::Cancelled,
                AppointmentStatus::NoShow,
            ],
            AppointmentStatus::Confirmed => &[
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
                AppointmentStatus::NoShow,
            ],
            AppointmentStatus::Cancelled
            | AppointmentStatus::Completed
            | AppointmentStatus::NoShow => &[],
        }
    }

    pub fn is_terminal(&self, status: AppointmentStatus) -> bool {
        self.valid_transitions(status).is_empty()
    }

    pub fn validate_transition(
        &self,
        from: AppointmentStatus,
        to: AppointmentStatus,
    ) -> Result<(), BookingError> {
        if self.valid_transitions(from).contains(&to) {
            Ok(())
        } else {
            warn!("Rejected status transition {} -> {}", from, to);
            Err(BookingError::InvalidStateTransition(from))
        }
    }
}
