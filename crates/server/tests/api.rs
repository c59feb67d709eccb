//! End-to-end checks of the HTTP surface against an in-memory database

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, NaiveDate, Utc};
use serde_json::{json, Value};
use staybook_core::Database;
use staybook_server::{router, AppState, Config};
use tower::ServiceExt;

const ADMIN_EMAIL: &str = "admin@staybook.test";
const ADMIN_PASSWORD: &str = "admin-password";

fn app() -> Router {
    let db = Database::open_in_memory().unwrap();
    db.seed_admin(ADMIN_EMAIL, ADMIN_PASSWORD).unwrap();
    router(AppState::new(db, Config::default()))
}

fn day(offset: i64) -> NaiveDate {
    Utc::now().date_naive() + Duration::days(offset)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>) -> (StatusCode,
    Value,
) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn login(app: &Router, email: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body["token"].as_str().unwrap().to_string()
}

/// Admin creates a tenant, a hotel and one room; returns (admin token, hotel id, room id)
async fn setup_hotel(app: &Router) -> (String, String, String) {
    let admin = login(app, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let (status, tenant) = send(
        app,
        Method::POST,
        "/api/admin/tenants",
        Some(&admin),
        Some(json!({ "name": "Seaside Group", "subdomain": "seaside" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{tenant}");

    let (status, hotel) = send(
        app,
        Method::POST,
        "/api/admin/hotels",
        Some(&admin),
        Some(json!({
            "tenant_id": tenant["id"],
            "name": "Harbour View",
            "address": "1 Quay Street",
            "city": "Lisbon",
            "country": "Portugal",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{hotel}");
    let hotel_id = hotel["id"].as_str().unwrap().to_string();

    let (status, room) = send(
        app,
        Method::POST,
        &format!("/api/hotel-admin/rooms?hotel_id={hotel_id}"),
        Some(&admin),
        Some(json!({
            "room_number": "101",
            "room_type": "DELUXE",
            "price_per_night": "100.00",
            "capacity": 2,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{room}");
    let room_id = room["id"].as_str().unwrap().to_string();

    (admin, hotel_id, room_id)
}

fn booking_body(room_id: &str, check_in: NaiveDate, check_out: NaiveDate) -> Value {
    json!({
        "room_id": room_id,
        "check_in": check_in,
        "check_out": check_out,
        "guests": 2,
        "guest_name": "Ana Sousa",
        "guest_email": "ana@example.com",
    })
}

#[tokio::test]
async fn test_health_reports_up() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "UP");
    assert!(body["schema_version"].as_u64().unwrap() >= 1);
}

#[tokio::test]
async fn test_register_login_and_me() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "email": "Guest@Example.com",
            "password": "correct-horse",
            "first_name": "Rui",
            "last_name": "Costa",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["user"]["email"], "guest@example.com");
    assert!(body["user"].get("password_hash").is_none());

    let token = login(&app, "guest@example.com", "correct-horse").await;
    let (status, me) = send(&app, Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "guest@example.com");
    assert_eq!(me["roles"], json!(["CUSTOMER"]));
}

#[tokio::test]
async fn test_wrong_password_is_unauthorized() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": ADMIN_EMAIL, "password": "not-the-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], 401);
}

#[tokio::test]
async fn test_protected_route_requires_token() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], 401);
    assert!(body["timestamp"].is_string());

    let (status, _) = send(&app, Method::GET, "/api/auth/me", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_customer_cannot_reach_admin_routes() {
    let app = app();
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "email": "mallory@example.com",
            "password": "mallory-pass",
            "first_name": "Mallory",
            "last_name": "Jones",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let token = login(&app, "mallory@example.com", "mallory-pass").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/admin/tenants",
        Some(&token),
        Some(json!({ "name": "Rogue", "subdomain": "rogue" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Forbidden");
}

#[tokio::test]
async fn test_anonymous_booking_and_double_booking() {
    let app = app();
    let (_, hotel_id, room_id) = setup_hotel(&app).await;

    let (status, hotels) =
        send(&app, Method::GET, "/api/hotels/search?city=lisbon", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(hotels["total_elements"], 1);
    assert_eq!(hotels["content"][0]["id"], hotel_id.as_str());

    let (status, booking) = send(
        &app,
        Method::POST,
        "/api/bookings",
        None,
        Some(booking_body(&room_id, day(10), day(12))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{booking}");
    assert_eq!(booking["status"], "CONFIRMED");
    assert!(booking["guest_id"].is_null());
    let confirmation = booking["confirmation_number"].as_str().unwrap().to_string();

    // Overlapping stay on the same room
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/bookings",
        None,
        Some(booking_body(&room_id, day(11), day(13))),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");

    // Back-to-back stay is fine
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/bookings",
        None,
        Some(booking_body(&room_id, day(12), day(14))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, found) = send(
        &app,
        Method::GET,
        &format!("/api/bookings/search?confirmation_number={confirmation}&email=ana@example.com"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["id"], booking["id"]);

    let (status, _) = send(
        &app,
        Method::GET,
        &format!(
            "/api/bookings/search?confirmation_number={confirmation}&email=someone@example.com"
        ),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_booking_validation_errors() {
    let app = app();
    let (_, _, room_id) = setup_hotel(&app).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/bookings",
        None,
        Some(booking_body(&room_id, day(5), day(5))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
    assert_eq!(body["error"], "Bad Request");
    assert!(body["message"].is_string());

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/bookings",
        None,
        Some(booking_body(&room_id, day(-3), day(2))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Missing guest details for an anonymous booking
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/bookings",
        None,
        Some(json!({
            "room_id": room_id,
            "check_in": day(5),
            "check_out": day(6),
            "guests": 1,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_input_is_bad_request() {
    let app = app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::GET, "/api/hotels/not-a-uuid", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_front_desk_check_in_and_receipt() {
    let app = app();
    let (admin, hotel_id, room_id) = setup_hotel(&app).await;

    let (status, booking) = send(
        &app,
        Method::POST,
        "/api/bookings",
        None,
        Some(booking_body(&room_id, day(0), day(2))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{booking}");
    let booking_id = booking["id"].as_str().unwrap().to_string();

    let (status, arrivals) = send(
        &app,
        Method::GET,
        &format!("/api/front-desk/arrivals?hotel_id={hotel_id}"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{arrivals}");
    assert_eq!(arrivals.as_array().unwrap().len(), 1);

    let (status, checked_in) = send(
        &app,
        Method::POST,
        &format!("/api/front-desk/bookings/{booking_id}/check-in"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{checked_in}");
    assert_eq!(checked_in["status"], "CHECKED_IN");

    // A checked-in stay can no longer be cancelled
    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/front-desk/bookings/{booking_id}/cancel"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, receipt) = send(
        &app,
        Method::GET,
        &format!("/api/front-desk/bookings/{booking_id}/receipt"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{receipt}");
}

#[tokio::test]
async fn test_guest_modifies_then_cancels_with_refund() {
    let app = app();
    let (admin, hotel_id, room_id) = setup_hotel(&app).await;
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "email": "rui@example.com",
            "password": "correct-horse",
            "first_name": "Rui",
            "last_name": "Costa",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let guest = login(&app, "rui@example.com", "correct-horse").await;

    let (status, booking) = send(
        &app,
        Method::POST,
        "/api/bookings",
        Some(&guest),
        Some(json!({ "room_id": room_id, "check_in": day(10), "check_out": day(12), "guests": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{booking}");
    let booking_id = booking["id"].as_str().unwrap().to_string();

    let (status, modified) = send(
        &app,
        Method::POST,
        &format!("/api/bookings/{booking_id}/modify"),
        Some(&guest),
        Some(json!({ "check_out": day(13), "reason": "Staying longer" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{modified}");
    assert_eq!(modified["reservation"]["check_out"], json!(day(13)));
    assert_eq!(modified["previous_total"], booking["total_amount"]);

    let (status, history) = send(
        &app,
        Method::GET,
        &format!("/api/front-desk/bookings/{booking_id}/history"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{history}");
    let actions: Vec<&str> = history
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["action"].as_str().unwrap())
        .collect();
    assert_eq!(actions, ["CREATED", "MODIFIED"]);

    let (status, cancelled) = send(
        &app,
        Method::POST,
        &format!("/api/bookings/{booking_id}/cancel"),
        Some(&guest),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{cancelled}");
    assert_eq!(cancelled["reservation"]["status"], "CANCELLED");
    // more than a week ahead, so everything comes back
    assert_eq!(cancelled["refund_amount"], cancelled["reservation"]["total_amount"]);

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/bookings/{booking_id}/modify"),
        Some(&guest),
        Some(json!({ "check_in": day(20), "check_out": day(21) })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, swept) = send(
        &app,
        Method::POST,
        &format!("/api/front-desk/auto-check-out?hotel_id={hotel_id}"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{swept}");
    assert_eq!(swept["checked_out"], 0);
}
