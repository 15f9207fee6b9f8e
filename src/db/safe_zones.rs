//! Safe-zone CRUD. Zones belong to the ward; `created_by` records which
//! guardian added one.

use uuid::Uuid;

use crate::error::AppError;
use crate::geo::LatLng;
use crate::models::SafeZone;

use super::{queries, DbPool};

pub struct SafeZoneInput {
    pub name: String,
    pub address: Option<String>,
    pub center: LatLng,
    pub radius_meters: f64,
}

impl SafeZoneInput {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::Validation("safe zone name is required".into()));
        }
        if !self.radius_meters.is_finite() || self.radius_meters <= 0.0 {
            return Err(AppError::Validation(
                "safe zone radius must be positive".into(),
            ));
        }
        Ok(())
    }
}

pub async fn create(
    pool: &DbPool,
    user_id: &str,
    created_by: &str,
    input: &SafeZoneInput,
) -> Result<SafeZone, AppError> {
    input.validate()?;
    let zone = sqlx::query_as(queries::INSERT_SAFE_ZONE)
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(input.name.trim())
        .bind(&input.address)
        .bind(input.center.lat)
        .bind(input.center.lng)
        .bind(input.radius_meters)
        .bind(created_by)
        .fetch_one(pool)
        .await?;
    Ok(zone)
}

pub async fn list(pool: &DbPool, user_id: &str) -> Result<Vec<SafeZone>, AppError> {
    let zones = sqlx::query_as(queries::SELECT_SAFE_ZONES)
        .bind(user_id)
        .fetch_all(pool)
        .await?;
    Ok(zones)
}

pub async fn delete(pool: &DbPool, user_id: &str, zone_id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query(queries::DELETE_SAFE_ZONE)
        .bind(zone_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("safe zone"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radius_must_be_positive_and_finite() {
        let mut input = SafeZoneInput {
            name: "Home".into(),
            address: None,
            center: LatLng::new(12.97, 77.59),
            radius_meters: 150.0,
        };
        assert!(input.validate().is_ok());

        input.radius_meters = 0.0;
        assert!(input.validate().is_err());
        input.radius_meters = f64::NAN;
        assert!(input.validate().is_err());
    }
}
