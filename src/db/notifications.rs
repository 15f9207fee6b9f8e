use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Notification, NotificationKind};

use super::{queries, DbPool};

pub async fn insert(
    pool: &DbPool,
    user_id: &str,
    kind: NotificationKind,
    title: &str,
    message: &str,
) -> Result<(), AppError> {
    sqlx::query(queries::INSERT_NOTIFICATION)
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(kind)
        .bind(title)
        .bind(message)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn list(
    pool: &DbPool,
    user_id: &str,
    limit: i64,
) -> Result<Vec<Notification>, AppError> {
    let notifications = sqlx::query_as(queries::SELECT_NOTIFICATIONS)
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;
    Ok(notifications)
}

pub async fn mark_read(
    pool: &DbPool,
    user_id: &str,
    notification_id: Uuid,
) -> Result<(), AppError> {
    let result = sqlx::query(queries::MARK_NOTIFICATION_READ)
        .bind(notification_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("notification"));
    }
    Ok(())
}
