//! Bearer token authentication
//!
//! Tokens are HS256 JWTs. Every authenticated request reloads the user so
//! that disabled accounts and role changes take effect immediately.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use staybook_core::services::AccountService;
use staybook_core::{User, UserRole};
use tracing::debug;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub roles: Vec<UserRole>,
    pub tenant_id: Option<Uuid>,
    pub hotel_id: Option<Uuid>,
    pub iat: i64,
    pub exp: i64,
}

/// Signing and verification keys derived from the configured secret
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenKeys {
    pub fn new(secret: &[u8], ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
            ttl: Duration::hours(ttl_hours),
        }
    }

    pub fn issue(&self, user: &User, now: DateTime<Utc>) -> ApiResult<String> {
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            roles: user.roles.iter().copied().collect(),
            tenant_id: user.tenant_id,
            hotel_id: user.hotel_id,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("Token signing failed: {e}")))
    }

    pub fn verify(&self, token: &str) -> ApiResult<Claims> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "Rejected bearer token");
                ApiError::Unauthorized("Invalid or expired token".into())
            })
    }
}

fn bearer(parts: &Parts) -> ApiResult<Option<&str>> {
    let Some(value) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|token| Some(token.trim()))
        .ok_or_else(|| ApiError::Unauthorized("Malformed Authorization header".into()))
}

fn load_user(state: &AppState, token: &str) -> ApiResult<User> {
    let claims = state.tokens.verify(token)?;
    state.run(|db| AccountService::new(db).me(claims.sub))
}

/// The signed-in user; requests without a valid token are refused with 401
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token =
            bearer(parts)?.ok_or_else(|| ApiError::Unauthorized("Authentication required".into()))?;
        load_user(state, token).map(AuthUser)
    }
}

/// The signed-in user when a token is sent. A token that is present but
/// invalid is still refused.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match bearer(parts)? {
            Some(token) => load_user(state, token).map(|user| MaybeUser(Some(user))),
            None => Ok(MaybeUser(None)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        let mut user = User::new(
            "desk@lakeside.test".into(),
            "unused".into(),
            "Abel".into(),
            "Girma".into(),
            UserRole::Frontdesk,
        );
        user.tenant_id = Some(Uuid::new_v4());
        user.hotel_id = Some(Uuid::new_v4());
        user
    }

    #[test]
    fn test_issue_and_verify() {
        let keys = TokenKeys::new(b"unit-test-secret", 2);
        let user = user();
        let token = keys.issue(&user, Utc::now()).unwrap();

        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.roles, vec![UserRole::Frontdesk]);
        assert_eq!(claims.hotel_id, user.hotel_id);
        assert_eq!(claims.exp - claims.iat, 2 * 3600);
    }

    #[test]
    fn test_rejects_foreign_and_expired_tokens() {
        let keys = TokenKeys::new(b"unit-test-secret", 1);
        let other = TokenKeys::new(b"someone-else", 1);
        let token = other.issue(&user(), Utc::now()).unwrap();
        assert!(matches!(keys.verify(&token), Err(ApiError::Unauthorized(_))));

        let stale = keys.issue(&user(), Utc::now() - Duration::hours(3)).unwrap();
        assert!(keys.verify(&stale).is_err());
    }
}
