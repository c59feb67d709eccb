//! Housekeeping task board

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use staybook_core::services::{HousekeepingService, NewHousekeepingTask};
use staybook_core::{HousekeepingStatistics, HousekeepingTask, HousekeepingTaskStatus, User};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery, HotelParam};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct TaskParams {
    hotel_id: Option<Uuid>,
    status: Option<HousekeepingTaskStatus>,
}

#[derive(Debug, Deserialize)]
pub(super) struct AssignBody {
    pub staff_id: Uuid,
}

#[derive(Debug, Default, Deserialize)]
struct CompleteBody {
    #[serde(default)]
    with_issues: bool,
}

#[derive(Debug, Deserialize)]
struct InspectBody {
    approved: bool,
    #[serde(default)]
    quality_score: Option<u8>,
    #[serde(default)]
    notes: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: HousekeepingTaskStatus,
}

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/tasks", get(list).post(create))
        .route("/tasks/my", get(my_tasks))
        .route("/tasks/:id", get(task))
        .route("/tasks/:id/assign", post(assign))
        .route("/tasks/:id/start", post(start))
        .route("/tasks/:id/pause", post(pause))
        .route("/tasks/:id/resume", post(resume))
        .route("/tasks/:id/complete", post(complete))
        .route("/tasks/:id/inspect", post(inspect))
        .route("/tasks/:id/status", put(update_status))
        .route("/staff", get(staff))
        .route("/statistics", get(statistics))
}

async fn list(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(params): ApiQuery<TaskParams>,
) -> ApiResult<Json<Vec<HousekeepingTask>>> {
    let hotel_id = HotelParam { hotel_id: params.hotel_id }.resolve(&user)?;
    Ok(Json(state.run(|db| HousekeepingService::new(db).list(&user, hotel_id, params.status))?))
}

async fn create(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(request): ApiJson<NewHousekeepingTask>,
) -> ApiResult<(StatusCode, Json<HousekeepingTask>)> {
    let task = state.run(|db| {
        HousekeepingService::new(db).create_task(&user, request, Utc::now())
    })?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn my_tasks(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<Vec<HousekeepingTask>>> {
    Ok(Json(state.run(|db| HousekeepingService::new(db).my_tasks(&user))?))
}

async fn task(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<HousekeepingTask>> {
    Ok(Json(state.run(|db| HousekeepingService::new(db).task(&user, id))?))
}

async fn assign(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<AssignBody>,
) -> ApiResult<Json<HousekeepingTask>> {
    Ok(Json(state.run(|db| {
        HousekeepingService::new(db).assign(&user, id, body.staff_id, Utc::now())
    })?))
}

async fn start(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<HousekeepingTask>> {
    Ok(Json(state.run(|db| HousekeepingService::new(db).start(&user, id, Utc::now()))?))
}

async fn pause(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<HousekeepingTask>> {
    Ok(Json(state.run(|db| HousekeepingService::new(db).pause(&user, id, Utc::now()))?))
}

async fn resume(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<HousekeepingTask>> {
    Ok(Json(state.run(|db| HousekeepingService::new(db).resume(&user, id, Utc::now()))?))
}

async fn complete(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    body: Option<ApiJson<CompleteBody>>,
) -> ApiResult<Json<HousekeepingTask>> {
    let with_issues = body.is_some_and(|ApiJson(body)| body.with_issues);
    Ok(Json(state.run(|db| {
        HousekeepingService::new(db).complete(&user, id, with_issues, Utc::now())
    })?))
}

async fn inspect(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<InspectBody>,
) -> ApiResult<Json<HousekeepingTask>> {
    let task = state.run(|db| {
        HousekeepingService::new(db).inspect(
            &user,
            id,
            body.approved,
            body.quality_score,
            body.notes,
            Utc::now(),
        )
    })?;
    Ok(Json(task))
}

async fn update_status(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<StatusBody>,
) -> ApiResult<Json<HousekeepingTask>> {
    Ok(Json(state.run(|db| {
        HousekeepingService::new(db).update_status(&user, id, body.status, Utc::now())
    })?))
}

async fn staff(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(hotel): ApiQuery<HotelParam>,
) -> ApiResult<Json<Vec<User>>> {
    let hotel_id = hotel.resolve(&user)?;
    Ok(Json(state.run(|db| HousekeepingService::new(db).staff(&user, hotel_id))?))
}

async fn statistics(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(hotel): ApiQuery<HotelParam>,
) -> ApiResult<Json<HousekeepingStatistics>> {
    let hotel_id = hotel.resolve(&user)?;
    Ok(Json(state.run(|db| HousekeepingService::new(db).statistics(&user, hotel_id, Utc::now()))?))
}
