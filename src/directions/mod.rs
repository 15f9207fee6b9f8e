//! Geocoding and directions provider boundary.
//!
//! One trait, pluggable implementations. Every failure crossing this
//! boundary is a [`GeoError`]; nothing panics out of a provider call.

pub mod maps;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::geo::polyline::PolylineError;
use crate::geo::LatLng;
use crate::models::TravelMode;

pub use maps::MapsClient;

#[derive(Debug, Error)]
pub enum GeoError {
    #[error("maps request failed: {0}")]
    Http(String),
    #[error("maps provider returned status {0}")]
    Status(String),
    #[error("no results for this query")]
    NoResults,
    #[error("malformed route polyline: {0}")]
    Polyline(#[from] PolylineError),
}

#[derive(Debug, Clone, Serialize)]
pub struct GeocodedAddress {
    pub address: String,
    pub position: LatLng,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlaceSuggestion {
    pub place_id: String,
    pub description: String,
}

/// A computed route between two endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct Route {
    pub distance_meters: f64,
    pub distance_text: String,
    pub duration_seconds: i32,
    pub duration_text: String,
    /// Decoded overview path.
    pub overview: Vec<LatLng>,
}

#[async_trait]
pub trait DirectionsProvider: Send + Sync {
    async fn reverse_geocode(&self, position: LatLng) -> Result<GeocodedAddress, GeoError>;

    async fn autocomplete(&self, input: &str) -> Result<Vec<PlaceSuggestion>, GeoError>;

    async fn place_details(&self, place_id: &str) -> Result<GeocodedAddress, GeoError>;

    async fn directions(
        &self,
        origin: LatLng,
        destination: LatLng,
        mode: TravelMode,
    ) -> Result<Route, GeoError>;
}
