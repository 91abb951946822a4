use std::sync::Arc;

use axum::{
    Json,
    Router,
    routing::get,
};
use serde_json::json;

use booking_cell::BookingState;
use booking_cell::router::{appointment_routes, slot_routes};

pub fn create_router(state: Arc<BookingState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic Booking API is running!" }))
        .route(
            "/health",
            get(|| async { Json(json!({"status": "healthy", "service": "clinic-booking-api"})) }),
        )
        .nest("/api/v1/slots", slot_routes(state.clone()))
        .nest("/api/v1/appointments", appointment_routes(state.clone()))
}
