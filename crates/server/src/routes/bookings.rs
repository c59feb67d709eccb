//! Guest-facing reservations

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use staybook_core::services::{
    BookingModification, BookingRequest, BookingService, CancellationResult, ModificationResult,
    RoomTypeBookingRequest,
};
use staybook_core::Reservation;
use uuid::Uuid;

use crate::auth::{AuthUser, MaybeUser};
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct LookupParams {
    confirmation_number: String,
    email: String,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct ReasonBody {
    #[serde(default)]
    pub reason: Option<String>,
}

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create))
        .route("/room-type", post(create_by_room_type))
        .route("/my", get(my_bookings))
        .route("/search", get(lookup))
        .route("/:id", get(booking))
        .route("/:id/modify", post(modify))
        .route("/:id/cancel", post(cancel))
}

async fn create(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    ApiJson(request): ApiJson<BookingRequest>,
) -> ApiResult<(StatusCode, Json<Reservation>)> {
    let today = Utc::now().date_naive();
    let booking = state.run(|db| {
        BookingService::new(db, state.pricing()).create_booking(user.as_ref(), &request, today)
    })?;
    Ok((StatusCode::CREATED, Json(booking)))
}

async fn create_by_room_type(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    ApiJson(request): ApiJson<RoomTypeBookingRequest>,
) -> ApiResult<(StatusCode, Json<Reservation>)> {
    let today = Utc::now().date_naive();
    let booking = state.run(|db| {
        BookingService::new(db, state.pricing())
            .create_booking_by_room_type(user.as_ref(), &request, today)
    })?;
    Ok((StatusCode::CREATED, Json(booking)))
}

async fn my_bookings(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<Vec<Reservation>>> {
    Ok(Json(state.run(|db| BookingService::new(db, state.pricing()).my_bookings(&user))?))
}

async fn lookup(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<LookupParams>,
) -> ApiResult<Json<Reservation>> {
    let booking = state.run(|db| {
        BookingService::new(db, state.pricing()).lookup(&params.confirmation_number, &params.email)
    })?;
    Ok(Json(booking))
}

async fn booking(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Reservation>> {
    Ok(Json(state.run(|db| BookingService::new(db, state.pricing()).find_booking(&user, id))?))
}

async fn modify(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(changes): ApiJson<BookingModification>,
) -> ApiResult<Json<ModificationResult>> {
    let today = Utc::now().date_naive();
    let result = state.run(|db| {
        BookingService::new(db, state.pricing()).modify_booking(&user, id, &changes, today)
    })?;
    Ok(Json(result))
}

async fn cancel(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    body: Option<ApiJson<ReasonBody>>,
) -> ApiResult<Json<CancellationResult>> {
    let reason = body.and_then(|ApiJson(body)| body.reason);
    let today = Utc::now().date_naive();
    let result = state.run(|db| {
        BookingService::new(db, state.pricing()).cancel_booking(&user, id, reason, today)
    })?;
    Ok(Json(result))
}
