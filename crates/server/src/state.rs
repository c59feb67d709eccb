//! Shared handler state

use std::sync::{Arc, Mutex};

use staybook_core::{Database, PricingPolicy};

use crate::auth::TokenKeys;
use crate::config::Config;
use crate::error::{ApiError, ApiResult};

/// One SQLite connection behind a mutex, plus configuration and signing keys
#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<Database>>,
    pub config: Arc<Config>,
    pub tokens: Arc<TokenKeys>,
}

impl AppState {
    pub fn new(db: Database, config: Config) -> Self {
        let tokens = TokenKeys::new(config.jwt_secret.as_bytes(), config.token_ttl_hours);
        Self {
            db: Arc::new(Mutex::new(db)),
            config: Arc::new(config),
            tokens: Arc::new(tokens),
        }
    }

    /// Run `f` with the database locked. The lock is released before the
    /// handler continues, so `f` must not block on anything else.
    pub fn run<T>(&self, f: impl FnOnce(&Database) -> staybook_core::Result<T>) -> ApiResult<T> {
        let db = self
            .db
            .lock()
            .map_err(|_| ApiError::Internal("Database lock poisoned".into()))?;
        Ok(f(&db)?)
    }

    pub fn pricing(&self) -> PricingPolicy {
        self.config.pricing_policy()
    }
}
