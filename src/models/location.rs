use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::geo::LatLng;

/// One appended point of a user's location history. Append-only, never mutated.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LocationSample {
    pub sample_id: i64,
    pub user_id: String,
    pub trip_id: Option<Uuid>,
    pub lat: f64,
    pub lng: f64,
    pub timestamp: DateTime<Utc>,
}

impl LocationSample {
    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}
