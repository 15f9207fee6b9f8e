use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserProfile {
    pub user_id: String,
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Per-user safety preferences. Created lazily with defaults on first read.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SafetySettings {
    #[serde(skip_deserializing, default)]
    pub user_id: String,
    pub emergency_message: String,
    pub safety_check_interval_seconds: i32,
    pub deviation_threshold_meters: f64,
    pub route_buffer_meters: f64,
    pub stagnation_radius_meters: f64,
    pub stagnation_threshold_seconds: i32,
    pub alert_countdown_seconds: i32,
    pub auto_alert_on_missed_check: bool,
    pub confirmation_window_seconds: i32,
    pub monitor_deviation: bool,
}

pub const DEFAULT_EMERGENCY_MESSAGE: &str =
    "Emergency! I need help. This is an automated alert from my safety app.";

impl SafetySettings {
    pub fn defaults_for(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            emergency_message: DEFAULT_EMERGENCY_MESSAGE.to_string(),
            safety_check_interval_seconds: 300,
            deviation_threshold_meters: 1000.0,
            route_buffer_meters: 200.0,
            stagnation_radius_meters: 30.0,
            stagnation_threshold_seconds: 600,
            alert_countdown_seconds: 10,
            auto_alert_on_missed_check: true,
            confirmation_window_seconds: 60,
            monitor_deviation: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_thresholds() {
        let s = SafetySettings::defaults_for("u1");
        assert_eq!(s.safety_check_interval_seconds, 300);
        assert_eq!(s.deviation_threshold_meters, 1000.0);
        assert_eq!(s.route_buffer_meters, 200.0);
        assert_eq!(s.stagnation_radius_meters, 30.0);
        assert_eq!(s.stagnation_threshold_seconds, 600);
        assert_eq!(s.alert_countdown_seconds, 10);
        assert!(s.auto_alert_on_missed_check);
    }
}
