//! Hotel shop orders

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use staybook_core::services::{NewShopOrder, ShopService};
use staybook_core::{Database, OrderStatus, Page, ShopOrder};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery, HotelParam, Paging};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct OrderParams {
    hotel_id: Option<Uuid>,
    status: Option<OrderStatus>,
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: OrderStatus,
}

#[derive(Debug, Default, Deserialize)]
struct PaymentBody {
    #[serde(default)]
    payment_reference: Option<String>,
}

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list).post(create))
        .route("/orders/number/:order_number", get(by_number))
        .route("/orders/reservation/:reservation_id", get(for_reservation))
        .route("/orders/:id", get(order))
        .route("/orders/:id/status", put(update_status))
        .route("/orders/:id/pay", post(mark_paid))
}

fn service<'a>(state: &AppState, db: &'a Database) -> ShopService<'a> {
    ShopService::new(db, state.config.tax_rate)
}

async fn list(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(params): ApiQuery<OrderParams>,
    ApiQuery(paging): ApiQuery<Paging>,
) -> ApiResult<Json<Page<ShopOrder>>> {
    let hotel_id = HotelParam { hotel_id: params.hotel_id }.resolve(&user)?;
    let page = state.run(|db| {
        service(&state, db).list(&user, hotel_id, params.status, paging.request())
    })?;
    Ok(Json(page))
}

async fn create(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(hotel): ApiQuery<HotelParam>,
    ApiJson(request): ApiJson<NewShopOrder>,
) -> ApiResult<(StatusCode, Json<ShopOrder>)> {
    let hotel_id = hotel.resolve(&user)?;
    let order = state.run(|db| {
        service(&state, db).create_order(&user, hotel_id, request, Utc::now())
    })?;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn order(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<ShopOrder>> {
    Ok(Json(state.run(|db| service(&state, db).find(&user, id))?))
}

async fn by_number(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(order_number): ApiPath<String>,
) -> ApiResult<Json<ShopOrder>> {
    Ok(Json(state.run(|db| service(&state, db).find_by_number(&user, &order_number))?))
}

async fn for_reservation(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(reservation_id): ApiPath<Uuid>,
) -> ApiResult<Json<Vec<ShopOrder>>> {
    Ok(Json(state.run(|db| service(&state, db).for_reservation(&user, reservation_id))?))
}

async fn update_status(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<StatusBody>,
) -> ApiResult<Json<ShopOrder>> {
    Ok(Json(state.run(|db| service(&state, db).update_status(&user, id, body.status, Utc::now()))?))
}

async fn mark_paid(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    body: Option<ApiJson<PaymentBody>>,
) -> ApiResult<Json<ShopOrder>> {
    let reference = body.and_then(|ApiJson(body)| body.payment_reference);
    Ok(Json(state.run(|db| service(&state, db).mark_paid(&user, id, reference, Utc::now()))?))
}
