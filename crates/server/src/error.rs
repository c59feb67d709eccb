//! HTTP error mapping
//!
//! Every failure leaves the server as `{ timestamp, status, error, message }`.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] staybook_core::Error),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Internal(String),
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Wire shape of every error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub timestamp: DateTime<Utc>,
    pub status: u16,
    pub error: String,
    pub message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        use staybook_core::Error as E;
        match self {
            ApiError::Core(E::Validation(_) | E::InvalidState(_)) => StatusCode::BAD_REQUEST,
            ApiError::Core(E::Authentication(_)) => StatusCode::UNAUTHORIZED,
            ApiError::Core(E::PermissionDenied(_)) => StatusCode::FORBIDDEN,
            ApiError::Core(E::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Core(E::Conflict(_)) => StatusCode::CONFLICT,
            ApiError::Core(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }

    /// Client-facing text; the core error variants carry their own prefix
    fn message(&self) -> String {
        use staybook_core::Error as E;
        match self {
            ApiError::Core(
                E::Validation(m)
                | E::InvalidState(m)
                | E::Authentication(m)
                | E::PermissionDenied(m)
                | E::NotFound(m)
                | E::Conflict(m),
            ) => m.clone(),
            ApiError::BadRequest(m) | ApiError::Unauthorized(m) => m.clone(),
            ApiError::Core(_) | ApiError::Internal(_) => "An unexpected error occurred".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }
        let body = ErrorBody {
            timestamp: Utc::now(),
            status: status.as_u16(),
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.message(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use staybook_core::Error;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (Error::validation("bad"), StatusCode::BAD_REQUEST),
            (Error::invalid_state("late"), StatusCode::BAD_REQUEST),
            (Error::Authentication("who".into()), StatusCode::UNAUTHORIZED),
            (Error::PermissionDenied("no".into()), StatusCode::FORBIDDEN),
            (Error::not_found("Room", 7), StatusCode::NOT_FOUND),
            (Error::Conflict("taken".into()), StatusCode::CONFLICT),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
        let io = Error::Io(std::io::Error::other("disk"));
        assert_eq!(ApiError::from(io).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = ApiError::from(Error::Io(std::io::Error::other("/var/lib/secret")));
        assert_eq!(err.message(), "An unexpected error occurred");
        let err = ApiError::from(Error::Conflict("Room 101 is taken".into()));
        assert_eq!(err.message(), "Room 101 is taken");
    }
}
