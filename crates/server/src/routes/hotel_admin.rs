//! Hotel configuration: rooms, products, pricing rules and staff

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use staybook_core::services::{
    HotelAdminService, NewStaff, ProductInput, PromoInput, RoomInput, SeasonInput, StrategyInput,
};
use staybook_core::{
    Page, PricingStrategy, Product, ProductCategory, PromotionalCode, Room, SeasonalRate, User,
    UserRole,
};
use uuid::Uuid;

use super::front_desk::RoomParams;
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery, HotelParam, Paging};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct ProductParams {
    hotel_id: Option<Uuid>,
    category: Option<ProductCategory>,
}

#[derive(Debug, Deserialize)]
struct StaffParams {
    hotel_id: Option<Uuid>,
    role: Option<UserRole>,
}

#[derive(Debug, Deserialize)]
struct ActiveBody {
    active: bool,
}

#[derive(Debug, Serialize)]
struct CreatedStaff {
    user: User,
    temporary_password: String,
}

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/rooms", get(list_rooms).post(create_room))
        .route("/rooms/:id", get(room).put(update_room).delete(delete_room))
        .route("/products", get(list_products).post(create_product))
        .route("/products/:id", put(update_product).delete(delete_product))
        .route("/pricing/strategies", get(list_strategies).post(create_strategy))
        .route("/pricing/strategies/:id", put(update_strategy).delete(delete_strategy))
        .route("/pricing/seasonal-rates", get(list_seasons).post(create_season))
        .route("/pricing/seasonal-rates/:id", put(update_season).delete(delete_season))
        .route("/pricing/promo-codes", get(list_promos).post(create_promo))
        .route("/pricing/promo-codes/:id", put(update_promo).delete(delete_promo))
        .route("/staff", get(list_staff).post(create_staff))
        .route("/staff/:id/active", put(set_staff_active))
}

async fn list_rooms(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(params): ApiQuery<RoomParams>,
) -> ApiResult<Json<Vec<Room>>> {
    let hotel_id = HotelParam { hotel_id: params.hotel_id }.resolve(&user)?;
    Ok(Json(state.run(|db| HotelAdminService::new(db).rooms(&user, hotel_id, params.filter()))?))
}

async fn create_room(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(hotel): ApiQuery<HotelParam>,
    ApiJson(input): ApiJson<RoomInput>,
) -> ApiResult<(StatusCode, Json<Room>)> {
    let hotel_id = hotel.resolve(&user)?;
    let room = state.run(|db| HotelAdminService::new(db).create_room(&user, hotel_id, &input))?;
    Ok((StatusCode::CREATED, Json(room)))
}

async fn room(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Room>> {
    Ok(Json(state.run(|db| HotelAdminService::new(db).room(&user, id))?))
}

async fn update_room(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<RoomInput>,
) -> ApiResult<Json<Room>> {
    Ok(Json(state.run(|db| HotelAdminService::new(db).update_room(&user, id, &input))?))
}

async fn delete_room(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    state.run(|db| HotelAdminService::new(db).delete_room(&user, id))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_products(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(params): ApiQuery<ProductParams>,
) -> ApiResult<Json<Vec<Product>>> {
    let hotel_id = HotelParam { hotel_id: params.hotel_id }.resolve(&user)?;
    Ok(Json(state.run(|db| HotelAdminService::new(db).products(&user, hotel_id, params.category))?))
}

async fn create_product(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(hotel): ApiQuery<HotelParam>,
    ApiJson(input): ApiJson<ProductInput>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let hotel_id = hotel.resolve(&user)?;
    let product = state.run(|db| {
        HotelAdminService::new(db).create_product(&user, hotel_id, &input)
    })?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn update_product(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<ProductInput>,
) -> ApiResult<Json<Product>> {
    Ok(Json(state.run(|db| HotelAdminService::new(db).update_product(&user, id, &input))?))
}

async fn delete_product(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    state.run(|db| HotelAdminService::new(db).delete_product(&user, id))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_strategies(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(hotel): ApiQuery<HotelParam>,
) -> ApiResult<Json<Vec<PricingStrategy>>> {
    let hotel_id = hotel.resolve(&user)?;
    Ok(Json(state.run(|db| HotelAdminService::new(db).strategies(&user, hotel_id))?))
}

async fn create_strategy(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(hotel): ApiQuery<HotelParam>,
    ApiJson(input): ApiJson<StrategyInput>,
) -> ApiResult<(StatusCode, Json<PricingStrategy>)> {
    let hotel_id = hotel.resolve(&user)?;
    let strategy = state.run(|db| {
        HotelAdminService::new(db).create_strategy(&user, hotel_id, &input)
    })?;
    Ok((StatusCode::CREATED, Json(strategy)))
}

async fn update_strategy(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(hotel): ApiQuery<HotelParam>,
    ApiJson(input): ApiJson<StrategyInput>,
) -> ApiResult<Json<PricingStrategy>> {
    let hotel_id = hotel.resolve(&user)?;
    Ok(Json(state.run(|db| {
        HotelAdminService::new(db).update_strategy(&user, hotel_id, id, &input)
    })?))
}

async fn delete_strategy(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(hotel): ApiQuery<HotelParam>,
) -> ApiResult<StatusCode> {
    let hotel_id = hotel.resolve(&user)?;
    state.run(|db| HotelAdminService::new(db).delete_strategy(&user, hotel_id, id))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_seasons(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(hotel): ApiQuery<HotelParam>,
) -> ApiResult<Json<Vec<SeasonalRate>>> {
    let hotel_id = hotel.resolve(&user)?;
    Ok(Json(state.run(|db| HotelAdminService::new(db).seasons(&user, hotel_id))?))
}

async fn create_season(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(hotel): ApiQuery<HotelParam>,
    ApiJson(input): ApiJson<SeasonInput>,
) -> ApiResult<(StatusCode, Json<SeasonalRate>)> {
    let hotel_id = hotel.resolve(&user)?;
    let season = state.run(|db| HotelAdminService::new(db).create_season(&user, hotel_id, &input))?;
    Ok((StatusCode::CREATED, Json(season)))
}

async fn update_season(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(hotel): ApiQuery<HotelParam>,
    ApiJson(input): ApiJson<SeasonInput>,
) -> ApiResult<Json<SeasonalRate>> {
    let hotel_id = hotel.resolve(&user)?;
    Ok(Json(state.run(|db| HotelAdminService::new(db).update_season(&user, hotel_id, id, &input))?))
}

async fn delete_season(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(hotel): ApiQuery<HotelParam>,
) -> ApiResult<StatusCode> {
    let hotel_id = hotel.resolve(&user)?;
    state.run(|db| HotelAdminService::new(db).delete_season(&user, hotel_id, id))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_promos(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(hotel): ApiQuery<HotelParam>,
) -> ApiResult<Json<Vec<PromotionalCode>>> {
    let hotel_id = hotel.resolve(&user)?;
    Ok(Json(state.run(|db| HotelAdminService::new(db).promos(&user, hotel_id))?))
}

async fn create_promo(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(hotel): ApiQuery<HotelParam>,
    ApiJson(input): ApiJson<PromoInput>,
) -> ApiResult<(StatusCode, Json<PromotionalCode>)> {
    let hotel_id = hotel.resolve(&user)?;
    let promo = state.run(|db| HotelAdminService::new(db).create_promo(&user, hotel_id, &input))?;
    Ok((StatusCode::CREATED, Json(promo)))
}

async fn update_promo(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(hotel): ApiQuery<HotelParam>,
    ApiJson(input): ApiJson<PromoInput>,
) -> ApiResult<Json<PromotionalCode>> {
    let hotel_id = hotel.resolve(&user)?;
    Ok(Json(state.run(|db| HotelAdminService::new(db).update_promo(&user, hotel_id, id, &input))?))
}

async fn delete_promo(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(hotel): ApiQuery<HotelParam>,
) -> ApiResult<StatusCode> {
    let hotel_id = hotel.resolve(&user)?;
    state.run(|db| HotelAdminService::new(db).delete_promo(&user, hotel_id, id))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_staff(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(params): ApiQuery<StaffParams>,
    ApiQuery(paging): ApiQuery<Paging>,
) -> ApiResult<Json<Page<User>>> {
    let hotel_id = HotelParam { hotel_id: params.hotel_id }.resolve(&user)?;
    let page = state.run(|db| {
        HotelAdminService::new(db).list_staff(&user, hotel_id, params.role, paging.request())
    })?;
    Ok(Json(page))
}

async fn create_staff(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(hotel): ApiQuery<HotelParam>,
    ApiJson(staff): ApiJson<NewStaff>,
) -> ApiResult<(StatusCode, Json<CreatedStaff>)> {
    let hotel_id = hotel.resolve(&user)?;
    let (user, temporary_password) = state.run(|db| {
        HotelAdminService::new(db).create_staff(&user, hotel_id, &staff)
    })?;
    Ok((StatusCode::CREATED, Json(CreatedStaff { user, temporary_password })))
}

async fn set_staff_active(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<ActiveBody>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.run(|db| HotelAdminService::new(db).set_staff_active(&user, id, body.active))?))
}
