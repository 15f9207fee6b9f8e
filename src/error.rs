use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::alerts::AlertError;
use crate::directions::GeoError;

/// Structured error body returned by every failing endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("an active trip already exists for this user")]
    ActiveTripExists,
    #[error("no active trip for this user")]
    NoActiveTrip,
    #[error("no emergency contacts configured")]
    NoContacts,
    #[error("missing or empty x-user-id header")]
    Unauthorized,
    #[error("not a guardian of this ward")]
    NotGuardian,
    #[error(transparent)]
    Geo(#[from] GeoError),
    #[error(transparent)]
    Alert(#[from] AlertError),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(detail) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION", detail.clone())
            }
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", self.to_string()),
            AppError::ActiveTripExists => {
                (StatusCode::CONFLICT, "ACTIVE_TRIP_EXISTS", self.to_string())
            }
            AppError::NoActiveTrip => (StatusCode::NOT_FOUND, "NO_ACTIVE_TRIP", self.to_string()),
            AppError::NoContacts => (StatusCode::CONFLICT, "NO_CONTACTS", self.to_string()),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "AUTH_REQUIRED", self.to_string()),
            AppError::NotGuardian => (StatusCode::FORBIDDEN, "NOT_GUARDIAN", self.to_string()),
            AppError::Geo(GeoError::NoResults) => {
                (StatusCode::NOT_FOUND, "NO_RESULTS", self.to_string())
            }
            AppError::Geo(e) => (StatusCode::BAD_GATEWAY, "MAPS_PROVIDER", e.to_string()),
            AppError::Alert(e) => (StatusCode::BAD_GATEWAY, "ALERT_RELAY", e.to_string()),
            AppError::Db(e) => {
                error!("database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "internal error".to_string(),
                )
            }
        };

        (
            status,
            Json(ErrorBody {
                error: ErrorDetail { code, message },
            }),
        )
            .into_response()
    }
}
