//! Maintenance work orders

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use staybook_core::services::{MaintenanceService, NewMaintenanceTask};
use staybook_core::{MaintenanceStatus, MaintenanceTask};
use uuid::Uuid;

use super::housekeeping::AssignBody;
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery, HotelParam};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct TaskParams {
    hotel_id: Option<Uuid>,
    status: Option<MaintenanceStatus>,
}

#[derive(Debug, Deserialize)]
struct CompleteBody {
    work_performed: String,
    #[serde(default)]
    actual_cost: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
struct VerifyBody {
    #[serde(default)]
    notes: Option<String>,
}

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/tasks", get(list).post(create))
        .route("/tasks/my", get(my_tasks))
        .route("/tasks/overdue", get(overdue))
        .route("/tasks/:id", get(task))
        .route("/tasks/:id/assign", post(assign))
        .route("/tasks/:id/start", post(start))
        .route("/tasks/:id/complete", post(complete))
        .route("/tasks/:id/verify", post(verify))
        .route("/tasks/:id/cancel", post(cancel))
}

async fn list(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(params): ApiQuery<TaskParams>,
) -> ApiResult<Json<Vec<MaintenanceTask>>> {
    let hotel_id = HotelParam { hotel_id: params.hotel_id }.resolve(&user)?;
    Ok(Json(state.run(|db| MaintenanceService::new(db).list(&user, hotel_id, params.status))?))
}

async fn create(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(request): ApiJson<NewMaintenanceTask>,
) -> ApiResult<(StatusCode, Json<MaintenanceTask>)> {
    let task = state.run(|db| MaintenanceService::new(db).create(&user, request, Utc::now()))?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn my_tasks(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<Vec<MaintenanceTask>>> {
    Ok(Json(state.run(|db| MaintenanceService::new(db).my_tasks(&user))?))
}

async fn overdue(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(hotel): ApiQuery<HotelParam>,
) -> ApiResult<Json<Vec<MaintenanceTask>>> {
    let hotel_id = hotel.resolve(&user)?;
    Ok(Json(state.run(|db| MaintenanceService::new(db).overdue(&user, hotel_id, Utc::now()))?))
}

async fn task(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<MaintenanceTask>> {
    Ok(Json(state.run(|db| MaintenanceService::new(db).task(&user, id))?))
}

async fn assign(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<AssignBody>,
) -> ApiResult<Json<MaintenanceTask>> {
    Ok(Json(state.run(|db| {
        MaintenanceService::new(db).assign(&user, id, body.staff_id, Utc::now())
    })?))
}

async fn start(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<MaintenanceTask>> {
    Ok(Json(state.run(|db| MaintenanceService::new(db).start(&user, id, Utc::now()))?))
}

async fn complete(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<CompleteBody>,
) -> ApiResult<Json<MaintenanceTask>> {
    let task = state.run(|db| {
        MaintenanceService::new(db).complete(
            &user,
            id,
            &body.work_performed,
            body.actual_cost,
            Utc::now(),
        )
    })?;
    Ok(Json(task))
}

async fn verify(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    body: Option<ApiJson<VerifyBody>>,
) -> ApiResult<Json<MaintenanceTask>> {
    let notes = body.and_then(|ApiJson(body)| body.notes);
    Ok(Json(state.run(|db| MaintenanceService::new(db).verify(&user, id, notes, Utc::now()))?))
}

async fn cancel(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<MaintenanceTask>> {
    Ok(Json(state.run(|db| MaintenanceService::new(db).cancel(&user, id, Utc::now()))?))
}
