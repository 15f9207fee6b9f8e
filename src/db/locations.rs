//! Append-only location history.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppError;
use crate::geo::LatLng;
use crate::models::LocationSample;

use super::{queries, DbPool};

pub async fn append(
    pool: &DbPool,
    user_id: &str,
    trip_id: Option<Uuid>,
    position: LatLng,
    at: DateTime<Utc>,
) -> Result<(), AppError> {
    sqlx::query(queries::INSERT_LOCATION_SAMPLE)
        .bind(user_id)
        .bind(trip_id)
        .bind(position.lat)
        .bind(position.lng)
        .bind(at)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn latest_for(pool: &DbPool, user_id: &str) -> Result<Option<LocationSample>, AppError> {
    let sample = sqlx::query_as(queries::SELECT_LATEST_LOCATION)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(sample)
}

pub async fn history_for_trip(pool: &DbPool, trip_id: Uuid) -> Result<Vec<LocationSample>, AppError> {
    let samples = sqlx::query_as(queries::SELECT_TRIP_LOCATIONS)
        .bind(trip_id)
        .fetch_all(pool)
        .await?;
    Ok(samples)
}
