//! Platform administration: tenants, hotels, users and registration requests

use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use staybook_core::services::{
    AdminService, HotelInput, NewUser, PlatformStatistics, RegistrationApproval,
    RegistrationService, TenantInput, UserUpdate,
};
use staybook_core::storage::{HotelFilter, UserFilter};
use staybook_core::{
    Hotel, HotelRegistration, HotelStatistics, Page, RegistrationStatistics, RegistrationStatus,
    Room, Tenant, TenantStatistics, User, UserRole,
};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath, ApiQuery, Paging};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct TenantParams {
    #[serde(default)]
    active_only: bool,
}

#[derive(Debug, Deserialize)]
struct HotelParams {
    query: Option<String>,
    city: Option<String>,
    #[serde(default)]
    active_only: bool,
}

#[derive(Debug, Deserialize)]
struct UserParams {
    hotel_id: Option<Uuid>,
    role: Option<UserRole>,
    query: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RegistrationParams {
    status: Option<RegistrationStatus>,
}

#[derive(Debug, Deserialize)]
struct AssignAdminBody {
    user_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct RoleBody {
    role: UserRole,
}

#[derive(Debug, Default, Deserialize)]
struct NotesBody {
    #[serde(default)]
    notes: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RejectBody {
    reason: String,
}

#[derive(Debug, Serialize)]
struct CreatedUser {
    user: User,
    #[serde(skip_serializing_if = "Option::is_none")]
    temporary_password: Option<String>,
}

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/statistics", get(statistics))
        .route("/tenants", get(tenants).post(create_tenant))
        .route("/tenants/statistics", get(tenant_statistics))
        .route("/tenants/:id", get(tenant).put(update_tenant).delete(delete_tenant))
        .route("/tenants/:id/toggle", post(toggle_tenant))
        .route("/tenants/:id/hotels", get(tenant_hotels))
        .route("/hotels", get(hotels).post(create_hotel))
        .route("/hotels/statistics", get(hotel_statistics))
        .route("/hotels/:id", get(hotel).put(update_hotel).delete(delete_hotel))
        .route("/hotels/:id/toggle", post(toggle_hotel))
        .route("/hotels/:id/rooms", get(hotel_rooms))
        .route("/hotels/:id/admin", put(assign_admin))
        .route("/users", get(users).post(create_user))
        .route("/users/:id", get(user).put(update_user).delete(delete_user))
        .route("/users/:id/toggle", post(toggle_user))
        .route("/users/:id/roles", post(add_role))
        .route("/users/:id/roles/:role", delete(remove_role))
        .route("/hotel-registrations", get(registrations))
        .route("/hotel-registrations/statistics", get(registration_statistics))
        .route("/hotel-registrations/:id", get(registration))
        .route("/hotel-registrations/:id/review", post(review_registration))
        .route("/hotel-registrations/:id/approve", post(approve_registration))
        .route("/hotel-registrations/:id/reject", post(reject_registration))
}

async fn statistics(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> ApiResult<Json<PlatformStatistics>> {
    Ok(Json(state.run(|db| AdminService::new(db).statistics(&actor))?))
}

async fn tenants(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiQuery(params): ApiQuery<TenantParams>,
    ApiQuery(paging): ApiQuery<Paging>,
) -> ApiResult<Json<Page<Tenant>>> {
    let page = state.run(|db| {
        AdminService::new(db).tenants(&actor, paging.request(), params.active_only)
    })?;
    Ok(Json(page))
}

async fn create_tenant(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiJson(input): ApiJson<TenantInput>,
) -> ApiResult<(StatusCode, Json<Tenant>)> {
    let tenant = state.run(|db| AdminService::new(db).create_tenant(&actor, &input))?;
    Ok((StatusCode::CREATED, Json(tenant)))
}

async fn tenant_statistics(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> ApiResult<Json<TenantStatistics>> {
    Ok(Json(state.run(|db| AdminService::new(db).tenant_statistics(&actor))?))
}

async fn tenant(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Tenant>> {
    Ok(Json(state.run(|db| AdminService::new(db).tenant(&actor, id))?))
}

async fn update_tenant(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<TenantInput>,
) -> ApiResult<Json<Tenant>> {
    Ok(Json(state.run(|db| AdminService::new(db).update_tenant(&actor, id, &input))?))
}

async fn delete_tenant(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    state.run(|db| AdminService::new(db).delete_tenant(&actor, id))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn toggle_tenant(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Tenant>> {
    Ok(Json(state.run(|db| AdminService::new(db).toggle_tenant(&actor, id))?))
}

async fn tenant_hotels(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Vec<Hotel>>> {
    Ok(Json(state.run(|db| AdminService::new(db).tenant_hotels(&actor, id))?))
}

async fn hotels(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiQuery(params): ApiQuery<HotelParams>,
    ApiQuery(paging): ApiQuery<Paging>,
) -> ApiResult<Json<Page<Hotel>>> {
    let filter = HotelFilter {
        query: params.query,
        city: params.city,
        active_only: params.active_only,
    };
    Ok(Json(state.run(|db| AdminService::new(db).hotels(&actor, &filter, paging.request()))?))
}

async fn create_hotel(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiJson(input): ApiJson<HotelInput>,
) -> ApiResult<(StatusCode, Json<Hotel>)> {
    let hotel = state.run(|db| AdminService::new(db).create_hotel(&actor, &input))?;
    Ok((StatusCode::CREATED, Json(hotel)))
}

async fn hotel_statistics(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> ApiResult<Json<HotelStatistics>> {
    Ok(Json(state.run(|db| AdminService::new(db).hotel_statistics(&actor))?))
}

async fn hotel(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Hotel>> {
    Ok(Json(state.run(|db| AdminService::new(db).hotel(&actor, id))?))
}

async fn update_hotel(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<HotelInput>,
) -> ApiResult<Json<Hotel>> {
    Ok(Json(state.run(|db| AdminService::new(db).update_hotel(&actor, id, &input))?))
}

/// Hotels are deactivated rather than removed
async fn delete_hotel(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Hotel>> {
    Ok(Json(state.run(|db| AdminService::new(db).delete_hotel(&actor, id))?))
}

async fn toggle_hotel(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Hotel>> {
    Ok(Json(state.run(|db| AdminService::new(db).toggle_hotel(&actor, id))?))
}

async fn hotel_rooms(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Vec<Room>>> {
    Ok(Json(state.run(|db| AdminService::new(db).hotel_rooms(&actor, id))?))
}

async fn assign_admin(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<AssignAdminBody>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.run(|db| AdminService::new(db).assign_admin(&actor, id, body.user_id))?))
}

async fn users(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiQuery(params): ApiQuery<UserParams>,
    ApiQuery(paging): ApiQuery<Paging>,
) -> ApiResult<Json<Page<User>>> {
    let filter = UserFilter {
        hotel_id: params.hotel_id,
        role: params.role,
        query: params.query,
    };
    Ok(Json(state.run(|db| AdminService::new(db).users(&actor, &filter, paging.request()))?))
}

async fn create_user(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiJson(request): ApiJson<NewUser>,
) -> ApiResult<(StatusCode, Json<CreatedUser>)> {
    let (user, temporary_password) = state.run(|db| {
        AdminService::new(db).create_user(&actor, &request)
    })?;
    Ok((StatusCode::CREATED, Json(CreatedUser { user, temporary_password })))
}

async fn user(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.run(|db| AdminService::new(db).user(&actor, id))?))
}

async fn update_user(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(update): ApiJson<UserUpdate>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.run(|db| AdminService::new(db).update_user(&actor, id, &update))?))
}

async fn delete_user(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    state.run(|db| AdminService::new(db).delete_user(&actor, id))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn toggle_user(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.run(|db| AdminService::new(db).toggle_user(&actor, id))?))
}

async fn add_role(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<RoleBody>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.run(|db| AdminService::new(db).add_role(&actor, id, body.role))?))
}

async fn remove_role(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath((id, role)): ApiPath<(Uuid, String)>,
) -> ApiResult<Json<User>> {
    let role = UserRole::from_str(&role.to_uppercase())
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown role: {role}")))?;
    Ok(Json(state.run(|db| AdminService::new(db).remove_role(&actor, id, role))?))
}

async fn registrations(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiQuery(params): ApiQuery<RegistrationParams>,
    ApiQuery(paging): ApiQuery<Paging>,
) -> ApiResult<Json<Page<HotelRegistration>>> {
    let page = state.run(|db| {
        RegistrationService::new(db).list(&actor, params.status, paging.request())
    })?;
    Ok(Json(page))
}

async fn registration_statistics(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> ApiResult<Json<RegistrationStatistics>> {
    Ok(Json(state.run(|db| RegistrationService::new(db).statistics(&actor))?))
}

async fn registration(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<HotelRegistration>> {
    Ok(Json(state.run(|db| RegistrationService::new(db).find(&actor, id))?))
}

async fn review_registration(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    body: Option<ApiJson<NotesBody>>,
) -> ApiResult<Json<HotelRegistration>> {
    let notes = body.and_then(|ApiJson(body)| body.notes);
    Ok(Json(state.run(|db| {
        RegistrationService::new(db).mark_under_review(&actor, id, notes, Utc::now())
    })?))
}

async fn approve_registration(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    body: Option<ApiJson<NotesBody>>,
) -> ApiResult<Json<RegistrationApproval>> {
    let notes = body.and_then(|ApiJson(body)| body.notes);
    Ok(Json(state.run(|db| RegistrationService::new(db).approve(&actor, id, notes, Utc::now()))?))
}

async fn reject_registration(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<RejectBody>,
) -> ApiResult<Json<HotelRegistration>> {
    Ok(Json(state.run(|db| {
        RegistrationService::new(db).reject(&actor, id, &body.reason, Utc::now())
    })?))
}
