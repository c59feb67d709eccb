//! Charges posted to a guest's folio

use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use staybook_core::services::{ChargeService, NewRoomCharge};
use staybook_core::{ConsolidatedReceipt, RoomCharge};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery, HotelParam};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct PaidBody {
    paid: bool,
    #[serde(default)]
    payment_reference: Option<String>,
}

#[derive(Debug, Serialize)]
struct UnpaidTotal {
    reservation_id: Uuid,
    unpaid_total: Decimal,
}

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create))
        .route("/unpaid", get(unpaid_for_hotel))
        .route("/reservation/:reservation_id", get(for_reservation))
        .route("/reservation/:reservation_id/unpaid-total", get(unpaid_total))
        .route("/reservation/:reservation_id/receipt", get(receipt))
        .route("/:id/paid", put(set_paid))
        .route("/:id", delete(remove))
}

async fn create(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(hotel): ApiQuery<HotelParam>,
    ApiJson(request): ApiJson<NewRoomCharge>,
) -> ApiResult<(StatusCode, Json<RoomCharge>)> {
    let hotel_id = hotel.resolve(&user)?;
    let charge = state.run(|db| ChargeService::new(db).create(&user, hotel_id, request))?;
    Ok((StatusCode::CREATED, Json(charge)))
}

async fn unpaid_for_hotel(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(hotel): ApiQuery<HotelParam>,
) -> ApiResult<Json<Vec<RoomCharge>>> {
    let hotel_id = hotel.resolve(&user)?;
    Ok(Json(state.run(|db| ChargeService::new(db).unpaid_for_hotel(&user, hotel_id))?))
}

async fn for_reservation(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(reservation_id): ApiPath<Uuid>,
) -> ApiResult<Json<Vec<RoomCharge>>> {
    Ok(Json(state.run(|db| ChargeService::new(db).list_for_reservation(&user, reservation_id))?))
}

async fn unpaid_total(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(reservation_id): ApiPath<Uuid>,
) -> ApiResult<Json<UnpaidTotal>> {
    let unpaid_total = state.run(|db| ChargeService::new(db).unpaid_total(&user, reservation_id))?;
    Ok(Json(UnpaidTotal {
        reservation_id,
        unpaid_total,
    }))
}

async fn receipt(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(reservation_id): ApiPath<Uuid>,
) -> ApiResult<Json<ConsolidatedReceipt>> {
    Ok(Json(state.run(|db| ChargeService::new(db).receipt(&user, reservation_id))?))
}

async fn set_paid(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<PaidBody>,
) -> ApiResult<Json<RoomCharge>> {
    let charge = state.run(|db| {
        ChargeService::new(db).set_paid(&user, id, body.paid, body.payment_reference, Utc::now())
    })?;
    Ok(Json(charge))
}

async fn remove(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    state.run(|db| ChargeService::new(db).delete(&user, id))?;
    Ok(StatusCode::NO_CONTENT)
}
