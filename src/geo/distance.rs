//! Great-circle and point-to-route distance helpers used by the trip
//! monitor (route envelope checks) and the guardian dashboard (safe zones).

use super::LatLng;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine great-circle distance in meters.
pub fn haversine_meters(a: LatLng, b: LatLng) -> f64 {
    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// Distance in meters from `point` to the segment `a`-`b`.
///
/// Uses a local equirectangular projection centered on `point`, which is
/// accurate well below 1 m at the segment lengths a directions provider
/// returns.
pub fn point_to_segment_meters(point: LatLng, a: LatLng, b: LatLng) -> f64 {
    let (ax, ay) = project(point, a);
    let (bx, by) = project(point, b);

    let dx = bx - ax;
    let dy = by - ay;
    let len_sq = dx * dx + dy * dy;

    // Degenerate segment: both endpoints coincide.
    if len_sq == 0.0 {
        return (ax * ax + ay * ay).sqrt();
    }

    // Projection of the origin (the point) onto the segment, clamped.
    let t = (-(ax * dx + ay * dy) / len_sq).clamp(0.0, 1.0);
    let cx = ax + t * dx;
    let cy = ay + t * dy;
    (cx * cx + cy * cy).sqrt()
}

/// Minimum distance in meters from `point` to a polyline path.
/// Returns `None` for an empty path.
pub fn point_to_path_meters(point: LatLng, path: &[LatLng]) -> Option<f64> {
    match path {
        [] => None,
        [only] => Some(haversine_meters(point, *only)),
        _ => path
            .windows(2)
            .map(|seg| point_to_segment_meters(point, seg[0], seg[1]))
            .min_by(|a, b| a.total_cmp(b)),
    }
}

fn project(origin: LatLng, p: LatLng) -> (f64, f64) {
    let x = (p.lng - origin.lng).to_radians() * origin.lat.to_radians().cos() * EARTH_RADIUS_M;
    let y = (p.lat - origin.lat).to_radians() * EARTH_RADIUS_M;
    (x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_of_identical_points_is_zero() {
        let p = LatLng::new(12.9716, 77.5946);
        assert_eq!(haversine_meters(p, p), 0.0);
    }

    #[test]
    fn haversine_matches_known_distance() {
        // One hundredth of a degree in each axis near Bengaluru.
        let a = LatLng::new(12.97, 77.59);
        let b = LatLng::new(12.98, 77.60);
        let d = haversine_meters(a, b);
        assert!((1500.0..1600.0).contains(&d), "got {d}");
    }

    #[test]
    fn point_on_segment_has_near_zero_distance() {
        let a = LatLng::new(12.9700, 77.5900);
        let b = LatLng::new(12.9700, 77.6100);
        let mid = LatLng::new(12.9700, 77.6000);
        assert!(point_to_segment_meters(mid, a, b) < 0.5);
    }

    #[test]
    fn point_beside_segment_measures_perpendicular_offset() {
        // ~0.002 deg of latitude north of an east-west segment: ~222 m.
        let a = LatLng::new(12.9700, 77.5900);
        let b = LatLng::new(12.9700, 77.6100);
        let p = LatLng::new(12.9720, 77.6000);
        let d = point_to_segment_meters(p, a, b);
        assert!((210.0..235.0).contains(&d), "got {d}");
    }

    #[test]
    fn point_past_segment_end_clamps_to_endpoint() {
        let a = LatLng::new(12.9700, 77.5900);
        let b = LatLng::new(12.9700, 77.6000);
        let p = LatLng::new(12.9700, 77.6200);
        let to_end = haversine_meters(p, b);
        let d = point_to_segment_meters(p, a, b);
        assert!((d - to_end).abs() < 2.0, "got {d}, want ~{to_end}");
    }

    #[test]
    fn path_distance_takes_the_closest_segment() {
        let path = vec![
            LatLng::new(12.9700, 77.5900),
            LatLng::new(12.9700, 77.6000),
            LatLng::new(12.9800, 77.6000),
        ];
        let p = LatLng::new(12.9750, 77.6005);
        let d = point_to_path_meters(p, &path).unwrap();
        assert!(d < 100.0, "got {d}");
    }

    #[test]
    fn empty_path_yields_none() {
        assert!(point_to_path_meters(LatLng::new(0.0, 0.0), &[]).is_none());
    }
}
