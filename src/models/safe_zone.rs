use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::geo::LatLng;

/// A named geofence owned by a user, managed by their guardian.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SafeZone {
    pub zone_id: Uuid,
    pub user_id: String,
    pub name: String,
    pub address: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub radius_meters: f64,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SafeZone {
    pub fn center(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}
