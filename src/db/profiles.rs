//! Profile and safety-settings accessors. Settings are created lazily with
//! defaults the first time a user is seen.

use crate::error::AppError;
use crate::models::{SafetySettings, UserProfile};

use super::{queries, DbPool};

pub async fn fetch_profile(pool: &DbPool, user_id: &str) -> Result<Option<UserProfile>, AppError> {
    let profile = sqlx::query_as(queries::SELECT_PROFILE)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(profile)
}

pub async fn upsert_profile(
    pool: &DbPool,
    user_id: &str,
    display_name: Option<&str>,
    phone: Option<&str>,
    email: Option<&str>,
) -> Result<UserProfile, AppError> {
    let profile = sqlx::query_as(queries::UPSERT_PROFILE)
        .bind(user_id)
        .bind(display_name)
        .bind(phone)
        .bind(email)
        .fetch_one(pool)
        .await?;
    Ok(profile)
}

/// Read settings, inserting the documented defaults on first access.
pub async fn fetch_or_default_settings(
    pool: &DbPool,
    user_id: &str,
) -> Result<SafetySettings, AppError> {
    if let Some(settings) = sqlx::query_as(queries::SELECT_SETTINGS)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
    {
        return Ok(settings);
    }

    let defaults = SafetySettings::defaults_for(user_id);
    sqlx::query(queries::INSERT_DEFAULT_SETTINGS)
        .bind(&defaults.user_id)
        .bind(&defaults.emergency_message)
        .bind(defaults.safety_check_interval_seconds)
        .bind(defaults.deviation_threshold_meters)
        .bind(defaults.route_buffer_meters)
        .bind(defaults.stagnation_radius_meters)
        .bind(defaults.stagnation_threshold_seconds)
        .bind(defaults.alert_countdown_seconds)
        .bind(defaults.auto_alert_on_missed_check)
        .bind(defaults.confirmation_window_seconds)
        .bind(defaults.monitor_deviation)
        .execute(pool)
        .await?;

    // Re-read in case a concurrent first access won the insert.
    let settings = sqlx::query_as(queries::SELECT_SETTINGS)
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    Ok(settings)
}

pub async fn update_settings(
    pool: &DbPool,
    user_id: &str,
    settings: &SafetySettings,
) -> Result<SafetySettings, AppError> {
    if settings.safety_check_interval_seconds <= 0 {
        return Err(AppError::Validation(
            "safety check interval must be positive".into(),
        ));
    }
    if settings.stagnation_threshold_seconds <= 0 || settings.alert_countdown_seconds <= 0 {
        return Err(AppError::Validation("thresholds must be positive".into()));
    }

    // Make sure the row exists so a fresh user can save settings directly.
    fetch_or_default_settings(pool, user_id).await?;

    let updated = sqlx::query_as(queries::UPDATE_SETTINGS)
        .bind(user_id)
        .bind(&settings.emergency_message)
        .bind(settings.safety_check_interval_seconds)
        .bind(settings.deviation_threshold_meters)
        .bind(settings.route_buffer_meters)
        .bind(settings.stagnation_radius_meters)
        .bind(settings.stagnation_threshold_seconds)
        .bind(settings.alert_countdown_seconds)
        .bind(settings.auto_alert_on_missed_check)
        .bind(settings.confirmation_window_seconds)
        .bind(settings.monitor_deviation)
        .fetch_one(pool)
        .await?;
    Ok(updated)
}
