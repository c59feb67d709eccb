//! Sign-up, sign-in and the current account

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use staybook_core::credentials::{check_credentials, replacement_hash};
use staybook_core::services::{AccountService, RegisterRequest};
use staybook_core::User;
use tracing::info;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct ChangePasswordRequest {
    current_password: String,
    new_password: String,
}

#[derive(Debug, Serialize)]
struct AuthResponse {
    token: String,
    token_type: &'static str,
    user: User,
}

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
        .route("/change-password", post(change_password))
}

fn respond(state: &AppState, user: User) -> ApiResult<AuthResponse> {
    let token = state.tokens.issue(&user, Utc::now())?;
    Ok(AuthResponse {
        token,
        token_type: "Bearer",
        user,
    })
}

async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    // argon2 runs before the database is locked
    let customer = request.prepare()?;
    let user = state.run(|db| AccountService::new(db).create_customer(customer))?;
    Ok((StatusCode::CREATED, Json(respond(&state, user)?)))
}

async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let candidate = state.run(|db| AccountService::new(db).login_candidate(&request.email))?;
    let user = check_credentials(candidate, &request.password)?;
    state.run(|db| AccountService::new(db).record_login(&user))?;
    info!(user_id = %user.id, "Signed in");
    Ok(Json(respond(&state, user)?))
}

async fn me(AuthUser(user): AuthUser) -> Json<User> {
    Json(user)
}

async fn change_password(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(request): ApiJson<ChangePasswordRequest>,
) -> ApiResult<StatusCode> {
    let current = state.run(|db| AccountService::new(db).me(user.id))?;
    let password_hash =
        replacement_hash(&current, &request.current_password, &request.new_password)?;
    state.run(|db| AccountService::new(db).set_password_hash(&user, password_hash))?;
    Ok(StatusCode::NO_CONTENT)
}
