// libs/booking-cell/src/state.rs
use std::sync::Arc;

use shared_config::AppConfig;

use crate::services::access::AccessPolicy;
use crate::services::appointment_store::AppointmentStore;
use crate::services::booking::BookingEngine;
use crate::services::cancellation::CancellationEngine;
use crate::services::consistency::ConsistencyService;
use crate::services::slot_store::SlotStore;

/// Shared state for the booking routes: the config plus the two stores all
/// engines operate on. One instance lives for the process lifetime.
pub struct BookingState {
    pub config: Arc<AppConfig>,
    pub slots: Arc<SlotStore>,
    pub appointments: Arc<AppointmentStore>,
}

impl BookingState {
    pub fn new(config: Arc<AppConfig>) -> Arc<Self> {
        Arc::new(Self {
            config,
            slots: Arc::new(SlotStore::new()),
            appointments: Arc::new(AppointmentStore::new()),
        })
    }

    pub fn booking_engine(&self) -> BookingEngine {
        BookingEngine::new(self.slots.clone(), self.appointments.clone())
    }

    pub fn cancellation_engine(&self) -> CancellationEngine {
        CancellationEngine::new(self.slots.clone(), self.appointments.clone())
    }

    pub fn access_policy(&self) -> AccessPolicy {
        AccessPolicy::new()
    }

    pub fn consistency_service(&self) -> ConsistencyService {
        ConsistencyService::new(self.slots.clone(), self.appointments.clone())
    }
}
