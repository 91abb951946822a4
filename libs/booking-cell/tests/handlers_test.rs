use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use booking_cell::router::{appointment_routes, slot_routes};
use booking_cell::BookingState;
use shared_config::AppConfig;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

fn create_test_app() -> (Router, Arc<BookingState>, AppConfig) {
    let config = TestConfig::default().to_app_config();
    let state = BookingState::new(Arc::new(config.clone()));
    let app = Router::new()
        .nest("/api/v1/slots", slot_routes(state.clone()))
        .nest("/api/v1/appointments", appointment_routes(state.clone()));
    (app, state, config)
}

fn bearer(user: &TestUser, config: &AppConfig) -> String {
    let token = JwtTestUtils::create_test_token(user, &config.jwt_secret, Some(24));
    format!("Bearer {}", token)
}

fn post_json(uri: &str, auth: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("authorization", auth)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(uri: &str, auth: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("authorization", auth)
        .body(Body::empty())
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn slot_payload(doctor_id: Uuid, capacity: u32) -> Value {
    json!({
        "doctor_id": doctor_id,
        "clinic_id": Uuid::new_v4(),
        "start_time": Utc::now() + Duration::hours(2),
        "duration_minutes": 30,
        "capacity": capacity
    })
}

/// Creates a slot through the HTTP surface as the given doctor and returns
/// the slot JSON.
async fn create_slot_via_api(app: &Router, config: &AppConfig, doctor_id: Uuid, capacity: u32) -> Value {
    let doctor = TestUser::with_id(doctor_id, "doctor@example.com", "doctor");
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/v1/slots",
            &bearer(&doctor, config),
            slot_payload(doctor_id, capacity),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    json_body(response).await["slot"].clone()
}

fn book_payload(slot: &Value, patient_id: &str) -> Value {
    json!({
        "patient_id": patient_id,
        "doctor_id": slot["doctor_id"],
        "clinic_id": slot["clinic_id"],
        "slot_id": slot["id"],
        "reason_for_visit": "follow-up"
    })
}

#[tokio::test]
async fn requests_without_a_token_are_unauthorized() {
    let (app, _state, _config) = create_test_app();

    let request = Request::builder()
        .method("GET")
        .uri("/api/v1/slots")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn tampered_tokens_are_rejected() {
    let (app, _state, _config) = create_test_app();
    let user = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_invalid_signature_token(&user);

    let response = app
        .oneshot(get_request("/api/v1/slots", &format!("Bearer {}", token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expired_tokens_are_rejected() {
    let (app, _state, config) = create_test_app();
    let user = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_expired_token(&user, &config.jwt_secret);

    let response = app
        .oneshot(get_request("/api/v1/slots", &format!("Bearer {}", token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn doctor_creates_slot_and_patient_books_it() {
    let (app, _state, config) = create_test_app();
    let doctor_id = Uuid::new_v4();
    let slot = create_slot_via_api(&app, &config, doctor_id, 2).await;

    let patient_id = Uuid::new_v4();
    let patient = TestUser::with_id(patient_id, "patient@example.com", "patient");

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/v1/appointments",
            &bearer(&patient, &config),
            book_payload(&slot, &patient_id.to_string()),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["appointment"]["status"], "pending");
    assert_eq!(body["appointment"]["slot_id"], slot["id"]);
}

#[tokio::test]
async fn doctor_cannot_create_a_slot_for_another_doctor() {
    let (app, _state, config) = create_test_app();
    let doctor = TestUser::doctor("doctor@example.com");

    let response = app
        .oneshot(post_json(
            "/api/v1/slots",
            &bearer(&doctor, &config),
            slot_payload(Uuid::new_v4(), 1),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn booking_a_full_slot_returns_conflict() {
    let (app, _state, config) = create_test_app();
    let slot = create_slot_via_api(&app, &config, Uuid::new_v4(), 1).await;

    let first_id = Uuid::new_v4();
    let first = TestUser::with_id(first_id, "first@example.com", "patient");
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/v1/appointments",
            &bearer(&first, &config),
            book_payload(&slot, &first_id.to_string()),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let second_id = Uuid::new_v4();
    let second = TestUser::with_id(second_id, "second@example.com", "patient");
    let response = app
        .oneshot(post_json(
            "/api/v1/appointments",
            &bearer(&second, &config),
            book_payload(&slot, &second_id.to_string()),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn patient_cannot_cancel_someone_elses_appointment() {
    let (app, _state, config) = create_test_app();
    let slot = create_slot_via_api(&app, &config, Uuid::new_v4(), 1).await;

    let owner_id = Uuid::new_v4();
    let owner = TestUser::with_id(owner_id, "owner@example.com", "patient");
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/v1/appointments",
            &bearer(&owner, &config),
            book_payload(&slot, &owner_id.to_string()),
        ))
        .await
        .unwrap();
    let appointment_id = json_body(response).await["appointment"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let intruder = TestUser::patient("intruder@example.com");
    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/v1/appointments/{}/cancel", appointment_id),
            &bearer(&intruder, &config),
            json!({"reason": "not mine"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // An admin may cancel it, and the cancellation is idempotent at 409 after.
    let admin = TestUser::admin("admin@example.com");
    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/v1/appointments/{}/cancel", appointment_id),
            &bearer(&admin, &config),
            json!({"reason": "clinic closed"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(post_json(
            &format!("/api/v1/appointments/{}/cancel", appointment_id),
            &bearer(&admin, &config),
            json!({"reason": "clinic closed"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn availability_listing_shows_remaining_capacity() {
    let (app, _state, config) = create_test_app();
    let doctor_id = Uuid::new_v4();
    let slot = create_slot_via_api(&app, &config, doctor_id, 3).await;

    let patient_id = Uuid::new_v4();
    let patient = TestUser::with_id(patient_id, "patient@example.com", "patient");
    app.clone()
        .oneshot(post_json(
            "/api/v1/appointments",
            &bearer(&patient, &config),
            book_payload(&slot, &patient_id.to_string()),
        ))
        .await
        .unwrap();

    let response = app
        .oneshot(get_request(
            &format!("/api/v1/slots?doctor_id={}", doctor_id),
            &bearer(&patient, &config),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["slots"][0]["available"], 2);
    assert_eq!(body["slots"][0]["booked_count"], 1);
}

#[tokio::test]
async fn only_admin_lists_all_appointments() {
    let (app, _state, config) = create_test_app();
    let slot = create_slot_via_api(&app, &config, Uuid::new_v4(), 3).await;

    for i in 0..3 {
        let patient_id = Uuid::new_v4();
        let patient =
            TestUser::with_id(patient_id, &format!("patient{}@example.com", i), "patient");
        let response = app
            .clone()
            .oneshot(post_json(
                "/api/v1/appointments",
                &bearer(&patient, &config),
                book_payload(&slot, &patient_id.to_string()),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let patient = TestUser::patient("patient@example.com");
    let response = app
        .clone()
        .oneshot(get_request("/api/v1/appointments", &bearer(&patient, &config)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let admin = TestUser::admin("admin@example.com");
    let response = app
        .clone()
        .oneshot(get_request("/api/v1/appointments", &bearer(&admin, &config)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["count"], 3);

    let response = app
        .oneshot(get_request(
            "/api/v1/appointments?limit=2&offset=1",
            &bearer(&admin, &config),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["count"], 2);
}

#[tokio::test]
async fn unknown_appointment_returns_not_found() {
    let (app, _state, config) = create_test_app();
    let user = TestUser::patient("patient@example.com");

    let response = app
        .oneshot(get_request(
            &format!("/api/v1/appointments/{}", Uuid::new_v4()),
            &bearer(&user, &config),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn consistency_check_requires_an_admin() {
    let (app, _state, config) = create_test_app();

    let patient = TestUser::patient("patient@example.com");
    let response = app
        .clone()
        .oneshot(get_request(
            "/api/v1/appointments/consistency/check",
            &bearer(&patient, &config),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let admin = TestUser::admin("admin@example.com");
    let response = app
        .oneshot(get_request(
            "/api/v1/appointments/consistency/check",
            &bearer(&admin, &config),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["report"]["is_consistent"], true);
}

#[tokio::test]
async fn only_admin_deactivates_slots() {
    let (app, _state, config) = create_test_app();
    let doctor_id = Uuid::new_v4();
    let slot = create_slot_via_api(&app, &config, doctor_id, 1).await;
    let slot_id = slot["id"].as_str().unwrap();

    let doctor = TestUser::with_id(doctor_id, "doctor@example.com", "doctor");
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/v1/slots/{}", slot_id))
                .header("authorization", bearer(&doctor, &config))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let admin = TestUser::admin("admin@example.com");
    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/v1/slots/{}", slot_id))
                .header("authorization", bearer(&admin, &config))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["slot"]["is_active"], false);
}
