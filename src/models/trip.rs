use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::geo::LatLng;

/// Lifecycle of a trip. Only moves forward: active -> emergency | completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "trip_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TripStatus {
    Active,
    Emergency,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "travel_mode", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    Driving,
    Walking,
    Bicycling,
    Transit,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Trip {
    pub trip_id: Uuid,
    pub owner_id: String,
    pub origin_address: String,
    pub origin_lat: f64,
    pub origin_lng: f64,
    pub dest_address: String,
    pub dest_lat: f64,
    pub dest_lng: f64,
    pub travel_mode: TravelMode,
    pub distance_meters: Option<f64>,
    pub distance_text: Option<String>,
    pub duration_seconds: Option<i32>,
    pub duration_text: Option<String>,
    pub start_time: DateTime<Utc>,
    pub estimated_end_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub actual_duration_seconds: Option<i32>,
    pub status: TripStatus,
    pub safety_check_interval_seconds: i32,
    pub monitor_deviation: bool,
    pub emergency_message: Option<String>,
    /// Encoded overview polyline of the planned route.
    pub route_polyline: Option<String>,
    pub last_lat: Option<f64>,
    pub last_lng: Option<f64>,
    pub last_point_at: Option<DateTime<Utc>>,
}

impl Trip {
    pub fn destination(&self) -> LatLng {
        LatLng::new(self.dest_lat, self.dest_lng)
    }
}
