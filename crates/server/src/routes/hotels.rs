//! Public hotel browsing and registration requests

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use staybook_core::services::{BookingService, NewRegistration, RegistrationService, ShopService};
use staybook_core::{
    Hotel, HotelRegistration, Page, PriceQuote, Product, ProductCategory, Room, RoomType,
    RoomTypeAvailability,
};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery, Paging};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct SearchParams {
    query: Option<String>,
    city: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StayParams {
    check_in: NaiveDate,
    check_out: NaiveDate,
    guests: Option<u32>,
    room_type: Option<RoomType>,
}

#[derive(Debug, Deserialize)]
struct QuoteRequest {
    room_type: RoomType,
    check_in: NaiveDate,
    check_out: NaiveDate,
    promo_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CategoryParam {
    category: Option<ProductCategory>,
}

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/search", get(search))
        .route("/:id", get(hotel))
        .route("/:id/availability", get(availability))
        .route("/:id/room-types", get(room_types))
        .route("/:id/quote", post(quote))
        .route("/:id/products", get(products))
}

pub(super) fn public_routes() -> Router<AppState> {
    Router::new().route("/hotel-registrations", post(submit_registration))
}

async fn search(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<SearchParams>,
    ApiQuery(paging): ApiQuery<Paging>,
) -> ApiResult<Json<Page<Hotel>>> {
    let page = state.run(|db| {
        BookingService::new(db, state.pricing())
            .search_hotels(params.query, params.city, paging.request())
    })?;
    Ok(Json(page))
}

async fn hotel(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Hotel>> {
    Ok(Json(state.run(|db| BookingService::new(db, state.pricing()).hotel(id))?))
}

async fn availability(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(stay): ApiQuery<StayParams>,
) -> ApiResult<Json<Vec<Room>>> {
    let rooms = state.run(|db| {
        BookingService::new(db, state.pricing()).available_rooms(
            id,
            stay.check_in,
            stay.check_out,
            stay.guests.unwrap_or(1),
            stay.room_type,
        )
    })?;
    Ok(Json(rooms))
}

async fn room_types(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(stay): ApiQuery<StayParams>,
) -> ApiResult<Json<Vec<RoomTypeAvailability>>> {
    let types = state.run(|db| {
        let guests = stay.guests.unwrap_or(1);
        BookingService::new(db, state.pricing())
            .room_types(id, stay.check_in, stay.check_out, guests)
    })?;
    Ok(Json(types))
}

async fn quote(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<QuoteRequest>,
) -> ApiResult<Json<PriceQuote>> {
    let today = Utc::now().date_naive();
    let quote = state.run(|db| {
        BookingService::new(db, state.pricing()).quote(
            id,
            request.room_type,
            request.check_in,
            request.check_out,
            request.promo_code.as_deref(),
            today,
        )
    })?;
    Ok(Json(quote))
}

async fn products(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(params): ApiQuery<CategoryParam>,
) -> ApiResult<Json<Vec<Product>>> {
    let products = state.run(|db| {
        ShopService::new(db, state.config.tax_rate).catalogue(id, params.category)
    })?;
    Ok(Json(products))
}

async fn submit_registration(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<NewRegistration>,
) -> ApiResult<(StatusCode, Json<HotelRegistration>)> {
    let registration = state.run(|db| RegistrationService::new(db).submit(&request, Utc::now()))?;
    Ok((StatusCode::CREATED, Json(registration)))
}
