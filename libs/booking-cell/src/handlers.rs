// libs/booking-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    BookAppointmentRequest, BookingError, CancelAppointmentRequest, CreateSlotRequest,
    SlotSearchQuery,
};
use crate::services::access::Actor;
use crate::state::BookingState;

#[derive(Debug, Deserialize)]
pub struct AppointmentListParams {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

fn map_booking_error(error: BookingError) -> AppError {
    match error {
        BookingError::SlotNotFound => AppError::NotFound("Slot not found".to_string()),
        BookingError::AppointmentNotFound => {
            AppError::NotFound("Appointment not found".to_string())
        }
        BookingError::SlotUnavailable
        | BookingError::DuplicateBooking
        | BookingError::AlreadyCancelled
        | BookingError::InvalidStateTransition(_)
        | BookingError::InvalidState(_) => AppError::Conflict(error.to_string()),
        BookingError::ValidationError(message) => AppError::ValidationError(message),
        BookingError::Forbidden => {
            AppError::Forbidden("Not authorized to perform this operation".to_string())
        }
        BookingError::Storage(message) => AppError::Internal(message),
    }
}

fn actor_from(user: &User) -> Result<Actor, AppError> {
    Actor::from_user(user).map_err(map_booking_error)
}

// ==============================================================================
// SLOT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_slot(
    State(state): State<Arc<BookingState>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateSlotRequest>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_from(&user)?;
    state
        .access_policy()
        .can_manage_slot(&actor, request.doctor_id)
        .map_err(map_booking_error)?;

    let slot = state.slots.create(request).await.map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "slot": slot,
        "message": "Slot created successfully"
    })))
}

#[axum::debug_handler]
pub async fn list_slots(
    State(state): State<Arc<BookingState>>,
    Extension(_user): Extension<User>,
    Query(query): Query<SlotSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let slots = state.slots.list_available(&query).await;

    Ok(Json(json!({
        "success": true,
        "count": slots.len(),
        "slots": slots
    })))
}

#[axum::debug_handler]
pub async fn deactivate_slot(
    State(state): State<Arc<BookingState>>,
    Path(slot_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_from(&user)?;
    let slot = state.slots.get(slot_id).await.map_err(map_booking_error)?;
    state
        .access_policy()
        .can_deactivate(&actor, &slot)
        .map_err(map_booking_error)?;

    let slot = state
        .slots
        .deactivate(slot_id)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "slot": slot,
        "message": "Slot deactivated"
    })))
}

// ==============================================================================
// APPOINTMENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<BookingState>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_from(&user)?;
    let appointment = state
        .booking_engine()
        .book(&actor, request)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment booked successfully"
    })))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<BookingState>>,
    Extension(user): Extension<User>,
    Query(params): Query<AppointmentListParams>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_from(&user)?;
    let appointments = state
        .booking_engine()
        .list_all(&actor, params.limit, params.offset)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "count": appointments.len(),
        "appointments": appointments
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<BookingState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_from(&user)?;
    let appointment = state
        .booking_engine()
        .get(&actor, appointment_id)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn get_patient_appointments(
    State(state): State<Arc<BookingState>>,
    Path(patient_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_from(&user)?;
    let appointments = state
        .booking_engine()
        .list_for_patient(&actor, patient_id)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "count": appointments.len(),
        "appointments": appointments
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<BookingState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<CancelAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_from(&user)?;
    let appointment = state
        .cancellation_engine()
        .cancel(&actor, appointment_id, request.reason)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment cancelled successfully"
    })))
}

#[axum::debug_handler]
pub async fn confirm_appointment(
    State(state): State<Arc<BookingState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_from(&user)?;
    let appointment = state
        .booking_engine()
        .confirm(&actor, appointment_id)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment confirmed"
    })))
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<Arc<BookingState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_from(&user)?;
    let appointment = state
        .booking_engine()
        .complete(&actor, appointment_id)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment completed"
    })))
}

#[axum::debug_handler]
pub async fn mark_no_show(
    State(state): State<Arc<BookingState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_from(&user)?;
    let appointment = state
        .booking_engine()
        .mark_no_show(&actor, appointment_id)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment marked as no-show"
    })))
}

#[axum::debug_handler]
pub async fn check_consistency(
    State(state): State<Arc<BookingState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_from(&user)?;
    let report = state
        .consistency_service()
        .audit(&actor)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "report": report
    })))
}
