//! Trip record accessors.
//!
//! Creation enforces the single-active-trip invariant twice over: a
//! `FOR UPDATE` scan serializes racing starts when a non-terminal row
//! already exists, and the `trips_owner_active_idx` partial unique index
//! catches the case where none does yet, so two empty scans cannot both
//! insert. The index violation surfaces as [`AppError::ActiveTripExists`].

use chrono::{DateTime, Utc};
use sqlx::Row;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::geo::LatLng;
use crate::models::{TravelMode, Trip, TripStatus};

use super::{queries, DbPool};

pub struct NewTrip {
    pub owner_id: String,
    pub origin_address: String,
    pub origin: LatLng,
    pub dest_address: String,
    pub destination: LatLng,
    pub travel_mode: TravelMode,
    pub distance_meters: f64,
    pub distance_text: String,
    pub duration_seconds: i32,
    pub duration_text: String,
    pub safety_check_interval_seconds: i32,
    pub monitor_deviation: bool,
    pub emergency_message: Option<String>,
    pub route_polyline: String,
}

pub async fn create_active(pool: &DbPool, new: &NewTrip) -> Result<Trip, AppError> {
    let mut tx = pool.begin().await?;

    let existing = sqlx::query(queries::SELECT_NON_TERMINAL_TRIP)
        .bind(&new.owner_id)
        .fetch_optional(&mut *tx)
        .await?;
    if existing.is_some() {
        return Err(AppError::ActiveTripExists);
    }

    let trip_id = Uuid::new_v4();
    let start_time = Utc::now();
    let estimated_end_time = start_time + chrono::Duration::seconds(new.duration_seconds.into());

    let inserted = sqlx::query_as(queries::INSERT_TRIP)
        .bind(trip_id)
        .bind(&new.owner_id)
        .bind(&new.origin_address)
        .bind(new.origin.lat)
        .bind(new.origin.lng)
        .bind(&new.dest_address)
        .bind(new.destination.lat)
        .bind(new.destination.lng)
        .bind(new.travel_mode)
        .bind(new.distance_meters)
        .bind(&new.distance_text)
        .bind(new.duration_seconds)
        .bind(&new.duration_text)
        .bind(start_time)
        .bind(estimated_end_time)
        .bind(new.safety_check_interval_seconds)
        .bind(new.monitor_deviation)
        .bind(&new.emergency_message)
        .bind(&new.route_polyline)
        .fetch_one(&mut *tx)
        .await;
    let trip: Trip = inserted.map_err(map_trip_insert_error)?;

    tx.commit().await?;
    info!("started trip {} for user {}", trip.trip_id, trip.owner_id);
    Ok(trip)
}

fn map_trip_insert_error(e: sqlx::Error) -> AppError {
    match &e {
        sqlx::Error::Database(db)
            if db.kind() == sqlx::error::ErrorKind::UniqueViolation =>
        {
            AppError::ActiveTripExists
        }
        _ => AppError::Db(e),
    }
}

pub async fn fetch(pool: &DbPool, trip_id: Uuid) -> Result<Option<Trip>, AppError> {
    let trip = sqlx::query_as(queries::SELECT_TRIP)
        .bind(trip_id)
        .fetch_optional(pool)
        .await?;
    Ok(trip)
}

pub async fn fetch_active_for(pool: &DbPool, user_id: &str) -> Result<Option<Trip>, AppError> {
    let trip = sqlx::query_as(queries::SELECT_ACTIVE_TRIP_FOR_USER)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(trip)
}

pub async fn update_live_position(
    pool: &DbPool,
    trip_id: Uuid,
    position: LatLng,
    at: DateTime<Utc>,
) -> Result<(), AppError> {
    sqlx::query(queries::UPDATE_TRIP_LIVE_POSITION)
        .bind(trip_id)
        .bind(position.lat)
        .bind(position.lng)
        .bind(at)
        .execute(pool)
        .await?;
    Ok(())
}

/// Guarded forward transition: only an active trip becomes an emergency.
pub async fn mark_emergency(pool: &DbPool, trip_id: Uuid) -> Result<(), AppError> {
    sqlx::query(queries::UPDATE_TRIP_EMERGENCY)
        .bind(trip_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Guarded forward transition: completion from active or emergency, never
/// a second time.
pub async fn mark_completed(
    pool: &DbPool,
    trip_id: Uuid,
    end_time: DateTime<Utc>,
    actual_duration_seconds: i32,
) -> Result<TripStatus, AppError> {
    let result = sqlx::query(queries::UPDATE_TRIP_COMPLETED)
        .bind(trip_id)
        .bind(end_time)
        .bind(actual_duration_seconds)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        // Already terminal; report what is there now.
        let row = sqlx::query(queries::SELECT_TRIP)
            .bind(trip_id)
            .fetch_optional(pool)
            .await?
            .ok_or(AppError::NotFound("trip"))?;
        let status: TripStatus = row.try_get("status")?;
        return Ok(status);
    }

    info!("completed trip {trip_id}");
    Ok(TripStatus::Completed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;
    use std::fmt;

    #[derive(Debug)]
    struct DuplicateActiveTrip;

    impl fmt::Display for DuplicateActiveTrip {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(
                f,
                "duplicate key value violates unique constraint \"trips_owner_active_idx\""
            )
        }
    }

    impl StdError for DuplicateActiveTrip {}

    impl sqlx::error::DatabaseError for DuplicateActiveTrip {
        fn message(&self) -> &str {
            "duplicate key value violates unique constraint \"trips_owner_active_idx\""
        }

        fn constraint(&self) -> Option<&str> {
            Some("trips_owner_active_idx")
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            sqlx::error::ErrorKind::UniqueViolation
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }
    }

    #[test]
    fn concurrent_insert_unique_violation_maps_to_active_trip_exists() {
        let e = sqlx::Error::Database(Box::new(DuplicateActiveTrip));
        assert!(matches!(
            map_trip_insert_error(e),
            AppError::ActiveTripExists
        ));
    }

    #[test]
    fn other_database_errors_pass_through() {
        assert!(matches!(
            map_trip_insert_error(sqlx::Error::PoolClosed),
            AppError::Db(_)
        ));
    }
}
