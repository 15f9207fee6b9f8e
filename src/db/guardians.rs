//! Guardian-to-ward links. A guardian may read a ward's trip, location,
//! safe zones and notifications only when a link row exists.

use crate::error::AppError;

use super::{queries, DbPool};

pub async fn link(pool: &DbPool, guardian_id: &str, ward_id: &str) -> Result<(), AppError> {
    if guardian_id == ward_id {
        return Err(AppError::Validation(
            "a user cannot be their own guardian".into(),
        ));
    }
    sqlx::query(queries::INSERT_GUARDIAN_LINK)
        .bind(guardian_id)
        .bind(ward_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn unlink(pool: &DbPool, guardian_id: &str, ward_id: &str) -> Result<(), AppError> {
    sqlx::query(queries::DELETE_GUARDIAN_LINK)
        .bind(guardian_id)
        .bind(ward_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Fail-fast check used by every guardian endpoint.
pub async fn require_link(pool: &DbPool, guardian_id: &str, ward_id: &str) -> Result<(), AppError> {
    let row = sqlx::query(queries::SELECT_GUARDIAN_LINK)
        .bind(guardian_id)
        .bind(ward_id)
        .fetch_optional(pool)
        .await?;
    if row.is_none() {
        return Err(AppError::NotGuardian);
    }
    Ok(())
}
