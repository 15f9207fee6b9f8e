//! Guardian dashboard: read-side aggregation over a ward's records.
//!
//! No state machine here; everything is computed from the current rows.
//! In-zone status is great-circle distance against each zone radius, and a
//! location older than five minutes is flagged stale.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::db::{self, DbPool};
use crate::error::AppError;
use crate::geo::{distance, LatLng};
use crate::models::{LocationSample, Notification, SafeZone, Trip};

const STALE_AFTER_MINUTES: i64 = 5;
const DASHBOARD_NOTIFICATION_LIMIT: i64 = 50;

#[derive(Debug, Serialize)]
pub struct ZoneStatus {
    #[serde(flatten)]
    pub zone: SafeZone,
    pub in_zone: Option<bool>,
    pub distance_meters: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct WardLocation {
    pub lat: f64,
    pub lng: f64,
    pub timestamp: DateTime<Utc>,
    pub stale: bool,
}

#[derive(Debug, Serialize)]
pub struct DashboardSnapshot {
    pub ward_id: String,
    pub active_trip: Option<Trip>,
    pub location: Option<WardLocation>,
    pub in_any_safe_zone: bool,
    pub safe_zones: Vec<ZoneStatus>,
    pub notifications: Vec<Notification>,
}

pub fn is_stale(sample_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - sample_at > Duration::minutes(STALE_AFTER_MINUTES)
}

pub fn zone_status(zone: SafeZone, position: Option<LatLng>) -> ZoneStatus {
    let distance_meters = position.map(|p| distance::haversine_meters(p, zone.center()));
    let in_zone = distance_meters.map(|d| d <= zone.radius_meters);
    ZoneStatus {
        zone,
        in_zone,
        distance_meters,
    }
}

fn ward_location(sample: &LocationSample, now: DateTime<Utc>) -> WardLocation {
    WardLocation {
        lat: sample.lat,
        lng: sample.lng,
        timestamp: sample.timestamp,
        stale: is_stale(sample.timestamp, now),
    }
}

/// Assemble the full dashboard for a ward. The caller must have verified
/// the guardian link already.
pub async fn dashboard(pool: &DbPool, ward_id: &str) -> Result<DashboardSnapshot, AppError> {
    let now = Utc::now();

    let (active_trip, latest, zones, notifications) = futures::try_join!(
        db::trips::fetch_active_for(pool, ward_id),
        db::locations::latest_for(pool, ward_id),
        db::safe_zones::list(pool, ward_id),
        db::notifications::list(pool, ward_id, DASHBOARD_NOTIFICATION_LIMIT),
    )?;

    let position = latest.as_ref().map(LocationSample::position);
    let safe_zones: Vec<ZoneStatus> = zones
        .into_iter()
        .map(|zone| zone_status(zone, position))
        .collect();
    let in_any_safe_zone = safe_zones.iter().any(|z| z.in_zone == Some(true));

    Ok(DashboardSnapshot {
        ward_id: ward_id.to_string(),
        active_trip,
        location: latest.as_ref().map(|s| ward_location(s, now)),
        in_any_safe_zone,
        safe_zones,
        notifications,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn zone(radius: f64) -> SafeZone {
        SafeZone {
            zone_id: Uuid::new_v4(),
            user_id: "ward".into(),
            name: "Home".into(),
            address: None,
            lat: 12.9716,
            lng: 77.5946,
            radius_meters: radius,
            created_by: Some("guardian".into()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn inside_radius_is_in_zone() {
        // ~110 m from the center.
        let status = zone_status(zone(200.0), Some(LatLng::new(12.9726, 77.5946)));
        assert_eq!(status.in_zone, Some(true));
    }

    #[test]
    fn outside_radius_is_not_in_zone() {
        let status = zone_status(zone(50.0), Some(LatLng::new(12.9726, 77.5946)));
        assert_eq!(status.in_zone, Some(false));
    }

    #[test]
    fn no_location_means_unknown_zone_state() {
        let status = zone_status(zone(50.0), None);
        assert_eq!(status.in_zone, None);
        assert!(status.distance_meters.is_none());
    }

    #[test]
    fn five_minute_boundary_controls_staleness() {
        let now = Utc::now();
        assert!(!is_stale(now - Duration::minutes(4), now));
        assert!(!is_stale(now - Duration::minutes(5), now));
        assert!(is_stale(now - Duration::minutes(5) - Duration::seconds(1), now));
    }
}
