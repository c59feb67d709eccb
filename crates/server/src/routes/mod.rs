//! HTTP routes

mod accounts;
mod admin;
mod bookings;
mod charges;
mod front_desk;
mod hotel_admin;
mod hotels;
mod housekeeping;
mod maintenance;
mod shop;

use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::error::ApiResult;
use crate::state::AppState;

/// Full application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/auth", accounts::routes())
        .nest("/api/hotels", hotels::routes())
        .nest("/api/public", hotels::public_routes())
        .nest("/api/bookings", bookings::routes())
        .nest("/api/front-desk", front_desk::routes())
        .nest("/api/hotel-admin", hotel_admin::routes())
        .nest("/api/housekeeping", housekeeping::routes())
        .nest("/api/maintenance", maintenance::routes())
        .nest("/api/shop", shop::routes())
        .nest("/api/room-charges", charges::routes())
        .nest("/api/admin", admin::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let schema = state.run(|db| db.schema_version())?;
    Ok(Json(json!({ "status": "UP", "schema_version": schema })))
}
