// libs/booking-cell/src/services/consistency.rs
use std::sync::Arc;

use tracing::warn;

use crate::models::{BookingError, ConsistencyReport};
use crate::services::access::{AccessPolicy, Actor};
use crate::services::appointment_store::AppointmentStore;
use crate::services::slot_store::SlotStore;

/// Cross-checks every slot's counter against the appointments that reference
/// it. Read-only; reports drift, never repairs it.
pub struct ConsistencyService {
    slots: Arc<SlotStore>,
    appointments: Arc<AppointmentStore>,
    access: AccessPolicy,
}

impl ConsistencyService {
    pub fn new(slots: Arc<SlotStore>, appointments: Arc<AppointmentStore>) -> Self {
        Self {
            slots,
            appointments,
            access: AccessPolicy::new(),
        }
    }

    pub async fn audit(&self, actor: &Actor) -> Result<ConsistencyReport, BookingError> {
        self.access.can_audit(actor)?;

        let slots = self.slots.snapshot().await;
        let mut issues = Vec::new();

        for slot in &slots {
            let active = self.appointments.active_count_for_slot(slot.id).await;
            if slot.booked_count != active {
                issues.push(format!(
                    "slot {}: booked_count is {} but {} active appointments reference it",
                    slot.id, slot.booked_count, active
                ));
            }
            if slot.booked_count > slot.capacity {
                issues.push(format!(
                    "slot {}: booked_count {} exceeds capacity {}",
                    slot.id, slot.booked_count, slot.capacity
                ));
            }
        }

        if !issues.is_empty() {
            warn!("Consistency audit found {} issue(s)", issues.len());
        }

        Ok(ConsistencyReport {
            is_consistent: issues.is_empty(),
            checked_slots: slots.len(),
            issues,
        })
    }
}
