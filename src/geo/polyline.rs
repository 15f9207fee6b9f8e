//! Encoded polyline codec (the "Google polyline algorithm").
//!
//! Each coordinate is stored as a zig-zag signed delta from the previous
//! point, scaled by 1e5 and emitted in 5-bit chunks offset by 63.

use thiserror::Error;

use super::LatLng;

const PRECISION: f64 = 1e5;

#[derive(Debug, Error, PartialEq)]
pub enum PolylineError {
    #[error("polyline ends mid-coordinate")]
    Truncated,
    #[error("invalid polyline character at byte {0}")]
    InvalidChar(usize),
}

/// Decode an encoded polyline into a coordinate sequence.
pub fn decode(encoded: &str) -> Result<Vec<LatLng>, PolylineError> {
    let bytes = encoded.as_bytes();
    let mut points = Vec::new();
    let mut idx = 0usize;
    let mut lat = 0i64;
    let mut lng = 0i64;

    while idx < bytes.len() {
        lat += read_delta(bytes, &mut idx)?;
        lng += read_delta(bytes, &mut idx)?;
        points.push(LatLng::new(lat as f64 / PRECISION, lng as f64 / PRECISION));
    }

    Ok(points)
}

/// Encode a coordinate sequence. Inverse of [`decode`] at 5-decimal precision.
pub fn encode(points: &[LatLng]) -> String {
    let mut out = String::with_capacity(points.len() * 8);
    let mut prev_lat = 0i64;
    let mut prev_lng = 0i64;

    for point in points {
        let lat = (point.lat * PRECISION).round() as i64;
        let lng = (point.lng * PRECISION).round() as i64;
        write_delta(lat - prev_lat, &mut out);
        write_delta(lng - prev_lng, &mut out);
        prev_lat = lat;
        prev_lng = lng;
    }

    out
}

fn read_delta(bytes: &[u8], idx: &mut usize) -> Result<i64, PolylineError> {
    let mut result = 0i64;
    let mut shift = 0u32;

    loop {
        let raw = *bytes.get(*idx).ok_or(PolylineError::Truncated)? as i64 - 63;
        if !(0..64).contains(&raw) {
            return Err(PolylineError::InvalidChar(*idx));
        }
        *idx += 1;
        result |= (raw & 0x1f) << shift;
        shift += 5;
        if raw < 0x20 {
            break;
        }
        if shift > 60 {
            return Err(PolylineError::InvalidChar(*idx - 1));
        }
    }

    // Undo zig-zag: LSB carries the sign.
    Ok(if result & 1 != 0 {
        !(result >> 1)
    } else {
        result >> 1
    })
}

fn write_delta(delta: i64, out: &mut String) {
    let mut value = if delta < 0 { !(delta << 1) } else { delta << 1 };
    while value >= 0x20 {
        out.push(((0x20 | (value & 0x1f)) + 63) as u8 as char);
        value >>= 5;
    }
    out.push((value + 63) as u8 as char);
}

#[cfg(test)]
mod tests {
    use super::*;

    // Worked example from the polyline algorithm reference.
    const REFERENCE: &str = "_p~iF~ps|U_ulLnnqC_mqNvxq`@";

    fn reference_points() -> Vec<LatLng> {
        vec![
            LatLng::new(38.5, -120.2),
            LatLng::new(40.7, -120.95),
            LatLng::new(43.252, -126.453),
        ]
    }

    #[test]
    fn decodes_reference_polyline() {
        let points = decode(REFERENCE).unwrap();
        assert_eq!(points.len(), 3);
        for (got, want) in points.iter().zip(reference_points()) {
            assert!((got.lat - want.lat).abs() < 1e-5);
            assert!((got.lng - want.lng).abs() < 1e-5);
        }
    }

    #[test]
    fn encodes_reference_points() {
        assert_eq!(encode(&reference_points()), REFERENCE);
    }

    #[test]
    fn encode_then_decode_is_identity_within_precision() {
        let route = vec![
            LatLng::new(12.97163, 77.59457),
            LatLng::new(12.97201, 77.59502),
            LatLng::new(12.97499, 77.59800),
            LatLng::new(12.98010, 77.60011),
            LatLng::new(-33.86882, 151.20929),
        ];
        let decoded = decode(&encode(&route)).unwrap();
        assert_eq!(decoded.len(), route.len());
        for (got, want) in decoded.iter().zip(&route) {
            assert!((got.lat - want.lat).abs() < 1e-5, "lat {} vs {}", got.lat, want.lat);
            assert!((got.lng - want.lng).abs() < 1e-5, "lng {} vs {}", got.lng, want.lng);
        }
    }

    #[test]
    fn empty_input_decodes_to_no_points() {
        assert_eq!(decode("").unwrap(), Vec::new());
        assert_eq!(encode(&[]), "");
    }

    #[test]
    fn truncated_polyline_is_an_error() {
        // Drop the final byte so the last longitude chunk never terminates.
        let cut = &REFERENCE[..REFERENCE.len() - 1];
        assert_eq!(decode(cut), Err(PolylineError::Truncated));
    }

    #[test]
    fn out_of_range_byte_is_an_error() {
        assert!(matches!(decode("_p~iF\u{7f}"), Err(PolylineError::InvalidChar(_))));
    }
}
