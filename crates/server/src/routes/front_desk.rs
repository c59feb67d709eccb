//! Front desk operations
//!
//! Hotel-wide lists take `?hotel_id=` and fall back to the caller's hotel.

use axum::{
    extract::State,
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use staybook_core::services::{
    BookingService, ChargeService, CheckoutSummary, FrontDeskService, FrontDeskStats,
};
use staybook_core::storage::{ReservationFilter, RoomFilter};
use staybook_core::{
    BookingHistoryEntry, ConsolidatedReceipt, Page, Reservation, ReservationStatus, Room,
    RoomStatus, RoomType,
};
use uuid::Uuid;

use super::bookings::ReasonBody;
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery, HotelParam, Paging};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct BookingSearch {
    hotel_id: Option<Uuid>,
    query: Option<String>,
    status: Option<ReservationStatus>,
}

#[derive(Debug, Default, Deserialize)]
struct CheckInBody {
    #[serde(default)]
    room_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RoomParams {
    pub hotel_id: Option<Uuid>,
    pub status: Option<RoomStatus>,
    pub room_type: Option<RoomType>,
}

impl RoomParams {
    pub fn filter(&self) -> RoomFilter {
        RoomFilter {
            status: self.status,
            room_type: self.room_type,
        }
    }
}

#[derive(Debug, Serialize)]
struct AutoCheckOut {
    hotel_id: Uuid,
    checked_out: usize,
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: RoomStatus,
}

#[derive(Debug, Deserialize)]
struct AvailabilityBody {
    available: bool,
}

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/bookings", get(search))
        .route("/bookings/:id", get(booking))
        .route("/bookings/:id/check-in", post(check_in))
        .route("/bookings/:id/check-out", post(check_out))
        .route("/bookings/:id/no-show", post(no_show))
        .route("/bookings/:id/cancel", post(cancel))
        .route("/bookings/:id/receipt", get(receipt))
        .route("/bookings/:id/history", get(history))
        .route("/auto-check-out", post(auto_check_out))
        .route("/arrivals", get(arrivals))
        .route("/departures", get(departures))
        .route("/in-house", get(in_house))
        .route("/rooms", get(rooms))
        .route("/rooms/:id/status", put(room_status))
        .route("/rooms/:id/availability", put(room_availability))
        .route("/stats", get(stats))
}

async fn search(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(params): ApiQuery<BookingSearch>,
    ApiQuery(paging): ApiQuery<Paging>,
) -> ApiResult<Json<Page<Reservation>>> {
    let filter = ReservationFilter {
        hotel_id: params.hotel_id,
        query: params.query,
        status: params.status,
    };
    let page = state.run(|db| {
        BookingService::new(db, state.pricing()).search(&user, filter, paging.request())
    })?;
    Ok(Json(page))
}

async fn booking(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Reservation>> {
    Ok(Json(state.run(|db| FrontDeskService::new(db).booking(&user, id))?))
}

async fn check_in(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    body: Option<ApiJson<CheckInBody>>,
) -> ApiResult<Json<Reservation>> {
    let room_id = body.and_then(|ApiJson(body)| body.room_id);
    let now = Utc::now();
    let booking = state.run(|db| {
        FrontDeskService::new(db).check_in(&user, id, room_id, now.date_naive(), now)
    })?;
    Ok(Json(booking))
}

async fn check_out(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<CheckoutSummary>> {
    Ok(Json(state.run(|db| FrontDeskService::new(db).check_out(&user, id, Utc::now()))?))
}

async fn no_show(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Reservation>> {
    let today = Utc::now().date_naive();
    Ok(Json(state.run(|db| FrontDeskService::new(db).mark_no_show(&user, id, today))?))
}

async fn cancel(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    body: Option<ApiJson<ReasonBody>>,
) -> ApiResult<Json<Reservation>> {
    let reason = body.and_then(|ApiJson(body)| body.reason);
    Ok(Json(state.run(|db| FrontDeskService::new(db).cancel(&user, id, reason, Utc::now()))?))
}

async fn history(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Vec<BookingHistoryEntry>>> {
    Ok(Json(state.run(|db| FrontDeskService::new(db).history(&user, id))?))
}

async fn auto_check_out(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(hotel): ApiQuery<HotelParam>,
) -> ApiResult<Json<AutoCheckOut>> {
    let hotel_id = hotel.resolve(&user)?;
    let now = Utc::now();
    let checked_out = state.run(|db| {
        FrontDeskService::new(db).auto_check_out(&user, hotel_id, now.date_naive(), now)
    })?;
    Ok(Json(AutoCheckOut {
        hotel_id,
        checked_out,
    }))
}

async fn receipt(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<ConsolidatedReceipt>> {
    Ok(Json(state.run(|db| ChargeService::new(db).receipt(&user, id))?))
}

async fn arrivals(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(hotel): ApiQuery<HotelParam>,
) -> ApiResult<Json<Vec<Reservation>>> {
    let hotel_id = hotel.resolve(&user)?;
    let today = Utc::now().date_naive();
    Ok(Json(state.run(|db| FrontDeskService::new(db).arrivals(&user, hotel_id, today))?))
}

async fn departures(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(hotel): ApiQuery<HotelParam>,
) -> ApiResult<Json<Vec<Reservation>>> {
    let hotel_id = hotel.resolve(&user)?;
    let today = Utc::now().date_naive();
    Ok(Json(state.run(|db| FrontDeskService::new(db).departures(&user, hotel_id, today))?))
}

async fn in_house(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(hotel): ApiQuery<HotelParam>,
) -> ApiResult<Json<Vec<Reservation>>> {
    let hotel_id = hotel.resolve(&user)?;
    Ok(Json(state.run(|db| FrontDeskService::new(db).in_house(&user, hotel_id))?))
}

async fn rooms(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(params): ApiQuery<RoomParams>,
) -> ApiResult<Json<Vec<Room>>> {
    let hotel_id = HotelParam { hotel_id: params.hotel_id }.resolve(&user)?;
    Ok(Json(state.run(|db| FrontDeskService::new(db).rooms(&user, hotel_id, params.filter()))?))
}

async fn room_status(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<StatusBody>,
) -> ApiResult<Json<Room>> {
    let today = Utc::now().date_naive();
    let room = state.run(|db| {
        FrontDeskService::new(db).update_room_status(&user, id, body.status, today)
    })?;
    Ok(Json(room))
}

async fn room_availability(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<AvailabilityBody>,
) -> ApiResult<Json<Room>> {
    let today = Utc::now().date_naive();
    let room = state.run(|db| {
        FrontDeskService::new(db).set_room_availability(&user, id, body.available, today)
    })?;
    Ok(Json(room))
}

async fn stats(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(hotel): ApiQuery<HotelParam>,
) -> ApiResult<Json<FrontDeskStats>> {
    let hotel_id = hotel.resolve(&user)?;
    let today = Utc::now().date_naive();
    Ok(Json(state.run(|db| FrontDeskService::new(db).stats(&user, hotel_id, today))?))
}
