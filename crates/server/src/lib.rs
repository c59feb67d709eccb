//! Staybook HTTP server
//!
//! JSON REST API over `staybook-core`, authenticated with bearer tokens.

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use routes::router;
pub use state::AppState;
