//! HTTP client for a Google-Maps-shaped REST provider.
//!
//! Transport and parsing are separated so the parsers can be exercised from
//! recorded fixtures without a network.

use async_trait::async_trait;
use serde::Deserialize;

use crate::geo::{polyline, LatLng};
use crate::models::TravelMode;

use super::{DirectionsProvider, GeoError, GeocodedAddress, PlaceSuggestion, Route};

pub struct MapsClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl MapsClient {
    pub fn new(base_url: &str, api_key: &str, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
        }
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, GeoError> {
        let url = format!("{}{}", self.base_url, path);
        let mut query = query.to_vec();
        query.push(("key", self.api_key.clone()));

        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| GeoError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GeoError::Http(format!(
                "{} returned HTTP {}",
                path,
                response.status()
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| GeoError::Http(e.to_string()))
    }
}

fn mode_param(mode: TravelMode) -> &'static str {
    match mode {
        TravelMode::Driving => "driving",
        TravelMode::Walking => "walking",
        TravelMode::Bicycling => "bicycling",
        TravelMode::Transit => "transit",
    }
}

fn latlng_param(p: LatLng) -> String {
    format!("{:.6},{:.6}", p.lat, p.lng)
}

#[async_trait]
impl DirectionsProvider for MapsClient {
    async fn reverse_geocode(&self, position: LatLng) -> Result<GeocodedAddress, GeoError> {
        let body: GeocodeResponse = self
            .get_json("/geocode/json", &[("latlng", latlng_param(position))])
            .await?;
        parse_geocode(body)
    }

    async fn autocomplete(&self, input: &str) -> Result<Vec<PlaceSuggestion>, GeoError> {
        let body: AutocompleteResponse = self
            .get_json("/place/autocomplete/json", &[("input", input.to_string())])
            .await?;
        parse_autocomplete(body)
    }

    async fn place_details(&self, place_id: &str) -> Result<GeocodedAddress, GeoError> {
        let body: PlaceDetailsResponse = self
            .get_json("/place/details/json", &[("place_id", place_id.to_string())])
            .await?;
        parse_place_details(body)
    }

    async fn directions(
        &self,
        origin: LatLng,
        destination: LatLng,
        mode: TravelMode,
    ) -> Result<Route, GeoError> {
        let body: DirectionsResponse = self
            .get_json(
                "/directions/json",
                &[
                    ("origin", latlng_param(origin)),
                    ("destination", latlng_param(destination)),
                    ("mode", mode_param(mode).to_string()),
                ],
            )
            .await?;
        parse_directions(body)
    }
}

// ---- wire types -----------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    formatted_address: String,
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: WireLatLng,
}

#[derive(Debug, Deserialize)]
struct WireLatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct AutocompleteResponse {
    status: String,
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    place_id: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct PlaceDetailsResponse {
    status: String,
    result: Option<PlaceDetailsResult>,
}

#[derive(Debug, Deserialize)]
struct PlaceDetailsResult {
    formatted_address: String,
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    status: String,
    #[serde(default)]
    routes: Vec<WireRoute>,
}

#[derive(Debug, Deserialize)]
struct WireRoute {
    overview_polyline: WirePolyline,
    legs: Vec<WireLeg>,
}

#[derive(Debug, Deserialize)]
struct WirePolyline {
    points: String,
}

#[derive(Debug, Deserialize)]
struct WireLeg {
    distance: WireValueText,
    duration: WireValueText,
}

#[derive(Debug, Deserialize)]
struct WireValueText {
    value: f64,
    text: String,
}

// ---- parsers --------------------------------------------------------------

fn check_status(status: &str) -> Result<(), GeoError> {
    match status {
        "OK" => Ok(()),
        "ZERO_RESULTS" => Err(GeoError::NoResults),
        other => Err(GeoError::Status(other.to_string())),
    }
}

fn parse_geocode(body: GeocodeResponse) -> Result<GeocodedAddress, GeoError> {
    check_status(&body.status)?;
    let first = body.results.into_iter().next().ok_or(GeoError::NoResults)?;
    Ok(GeocodedAddress {
        address: first.formatted_address,
        position: LatLng::new(first.geometry.location.lat, first.geometry.location.lng),
    })
}

fn parse_autocomplete(body: AutocompleteResponse) -> Result<Vec<PlaceSuggestion>, GeoError> {
    match check_status(&body.status) {
        Ok(()) => Ok(body
            .predictions
            .into_iter()
            .map(|p| PlaceSuggestion {
                place_id: p.place_id,
                description: p.description,
            })
            .collect()),
        // No matches is an empty list, not an error, for autocomplete.
        Err(GeoError::NoResults) => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}

fn parse_place_details(body: PlaceDetailsResponse) -> Result<GeocodedAddress, GeoError> {
    check_status(&body.status)?;
    let result = body.result.ok_or(GeoError::NoResults)?;
    Ok(GeocodedAddress {
        address: result.formatted_address,
        position: LatLng::new(result.geometry.location.lat, result.geometry.location.lng),
    })
}

fn parse_directions(body: DirectionsResponse) -> Result<Route, GeoError> {
    check_status(&body.status)?;
    let route = body.routes.into_iter().next().ok_or(GeoError::NoResults)?;

    let (distance_meters, distance_text, duration_seconds, duration_text) = route
        .legs
        .first()
        .map(|leg| {
            (
                leg.distance.value,
                leg.distance.text.clone(),
                leg.duration.value as i32,
                leg.duration.text.clone(),
            )
        })
        .ok_or(GeoError::NoResults)?;

    let overview = polyline::decode(&route.overview_polyline.points)?;

    Ok(Route {
        distance_meters,
        distance_text,
        duration_seconds,
        duration_text,
        overview,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_directions_response() {
        let body: DirectionsResponse = serde_json::from_str(
            r#"{
                "status": "OK",
                "routes": [{
                    "overview_polyline": {"points": "_p~iF~ps|U_ulLnnqC_mqNvxq`@"},
                    "legs": [{
                        "distance": {"value": 2300.0, "text": "2.3 km"},
                        "duration": {"value": 540, "text": "9 mins"}
                    }]
                }]
            }"#,
        )
        .unwrap();

        let route = parse_directions(body).unwrap();
        assert_eq!(route.distance_meters, 2300.0);
        assert_eq!(route.duration_seconds, 540);
        assert_eq!(route.overview.len(), 3);
        assert!((route.overview[0].lat - 38.5).abs() < 1e-5);
    }

    #[test]
    fn zero_results_directions_is_no_results_error() {
        let body: DirectionsResponse =
            serde_json::from_str(r#"{"status": "ZERO_RESULTS", "routes": []}"#).unwrap();
        assert!(matches!(parse_directions(body), Err(GeoError::NoResults)));
    }

    #[test]
    fn denied_request_surfaces_provider_status() {
        let body: GeocodeResponse =
            serde_json::from_str(r#"{"status": "REQUEST_DENIED", "results": []}"#).unwrap();
        match parse_geocode(body) {
            Err(GeoError::Status(s)) => assert_eq!(s, "REQUEST_DENIED"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parses_reverse_geocode_first_result() {
        let body: GeocodeResponse = serde_json::from_str(
            r#"{
                "status": "OK",
                "results": [
                    {"formatted_address": "MG Road, Bengaluru",
                     "geometry": {"location": {"lat": 12.9758, "lng": 77.6096}}},
                    {"formatted_address": "Bengaluru",
                     "geometry": {"location": {"lat": 12.97, "lng": 77.59}}}
                ]
            }"#,
        )
        .unwrap();

        let place = parse_geocode(body).unwrap();
        assert_eq!(place.address, "MG Road, Bengaluru");
        assert_eq!(place.position.lat, 12.9758);
    }

    #[test]
    fn autocomplete_zero_results_is_an_empty_list() {
        let body: AutocompleteResponse =
            serde_json::from_str(r#"{"status": "ZERO_RESULTS", "predictions": []}"#).unwrap();
        assert!(parse_autocomplete(body).unwrap().is_empty());
    }
}
