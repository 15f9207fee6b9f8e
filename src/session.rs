//! Explicit session context.
//!
//! The hosted identity provider lives outside this service; requests carry
//! the authenticated user's opaque id in `x-user-id`. Guardian access is
//! never inferred from ambient state: the ward id comes from the request
//! path and is checked against the guardians table.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Debug, Clone)]
pub struct SessionContext {
    pub user_id: String,
}

impl SessionContext {
    pub fn from_header(value: Option<&str>) -> Result<Self, AppError> {
        match value {
            Some(id) if !id.trim().is_empty() => Ok(Self {
                user_id: id.trim().to_string(),
            }),
            _ => Err(AppError::Unauthorized),
        }
    }
}

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for SessionContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok());
        SessionContext::from_header(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_trimmed_user_id() {
        let session = SessionContext::from_header(Some("  user-42 ")).unwrap();
        assert_eq!(session.user_id, "user-42");
    }

    #[test]
    fn missing_or_blank_header_is_unauthorized() {
        assert!(matches!(
            SessionContext::from_header(None),
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            SessionContext::from_header(Some("   ")),
            Err(AppError::Unauthorized)
        ));
    }
}
