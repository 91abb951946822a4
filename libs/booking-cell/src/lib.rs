pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod state;

// Re-export the core types for external use
pub use models::*;
pub use state::BookingState;

pub use services::access::{AccessPolicy, Actor};
pub use services::appointment_store::AppointmentStore;
pub use services::booking::BookingEngine;
pub use services::cancellation::CancellationEngine;
pub use services::consistency::ConsistencyService;
pub use services::lifecycle::AppointmentLifecycle;
pub use services::slot_store::{ReservationToken, SlotStore};
