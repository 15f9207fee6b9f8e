//! HTTP API: the surface the mobile client drives.
//!
//! Trip-session routes are keyed by the caller's session (`/trips/active/*`)
//! since a user has at most one non-terminal trip; guardian routes name the
//! ward explicitly in the path.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::alerts::AlertDispatcher;
use crate::db::{self, DbPool};
use crate::directions::DirectionsProvider;
use crate::error::AppError;
use crate::geo::LatLng;
use crate::guardian;
use crate::models::{
    ContactPriority, EmergencyContact, LocationSample, Notification, SafeZone, SafetySettings,
    TravelMode, Trip, TripStatus, UserProfile,
};
use crate::monitor::state::MonitorSnapshot;
use crate::monitor::{MonitorRegistry, PgMonitorStore, TripMonitor};
use crate::session::SessionContext;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub registry: MonitorRegistry,
    pub provider: Arc<dyn DirectionsProvider>,
    pub dispatcher: Arc<dyn AlertDispatcher>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/places/reverse-geocode", get(reverse_geocode))
        .route("/places/autocomplete", get(autocomplete))
        .route("/places/:place_id", get(place_details))
        .route("/trips", post(start_trip))
        .route("/trips/active", get(active_trip))
        .route("/trips/active/position", post(report_position))
        .route("/trips/active/confirm-safety", post(confirm_safety))
        .route("/trips/active/cancel-alert", post(cancel_alert))
        .route("/trips/active/sos", post(trigger_sos))
        .route("/trips/active/complete", post(complete_trip))
        .route("/trips/:trip_id/history", get(trip_history))
        .route("/contacts", get(list_contacts).post(create_contact))
        .route("/contacts/:contact_id", put(update_contact).delete(delete_contact))
        .route("/profile", get(get_profile).put(put_profile))
        .route("/settings", get(get_settings).put(put_settings))
        .route("/guardians", post(add_guardian))
        .route("/guardians/:guardian_id", delete(remove_guardian))
        .route("/wards/:ward_id/dashboard", get(ward_dashboard))
        .route("/wards/:ward_id/safe-zones", post(create_safe_zone))
        .route("/wards/:ward_id/safe-zones/:zone_id", delete(delete_safe_zone))
        .route(
            "/wards/:ward_id/notifications/:notification_id/read",
            post(mark_notification_read),
        )
        .with_state(state)
}

// ---- health ---------------------------------------------------------------

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    active_trips: usize,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        active_trips: state.registry.active_count().await,
    })
}

// ---- places ---------------------------------------------------------------

#[derive(Deserialize)]
struct ReverseGeocodeQuery {
    lat: f64,
    lng: f64,
}

async fn reverse_geocode(
    State(state): State<AppState>,
    _session: SessionContext,
    Query(q): Query<ReverseGeocodeQuery>,
) -> Result<Json<crate::directions::GeocodedAddress>, AppError> {
    let place = state
        .provider
        .reverse_geocode(LatLng::new(q.lat, q.lng))
        .await?;
    Ok(Json(place))
}

#[derive(Deserialize)]
struct AutocompleteQuery {
    input: String,
}

async fn autocomplete(
    State(state): State<AppState>,
    _session: SessionContext,
    Query(q): Query<AutocompleteQuery>,
) -> Result<Json<Vec<crate::directions::PlaceSuggestion>>, AppError> {
    if q.input.trim().is_empty() {
        return Err(AppError::Validation("input is required".into()));
    }
    Ok(Json(state.provider.autocomplete(q.input.trim()).await?))
}

async fn place_details(
    State(state): State<AppState>,
    _session: SessionContext,
    Path(place_id): Path<String>,
) -> Result<Json<crate::directions::GeocodedAddress>, AppError> {
    Ok(Json(state.provider.place_details(&place_id).await?))
}

// ---- trips ----------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct EndpointInput {
    pub address: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

impl EndpointInput {
    fn resolve(&self, which: &str) -> Result<LatLng, AppError> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Ok(LatLng::new(lat, lng)),
            _ => Err(AppError::Validation(format!(
                "{which} is not resolved to coordinates"
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StartTripRequest {
    pub origin: EndpointInput,
    pub destination: EndpointInput,
    pub travel_mode: TravelMode,
    pub safety_interval_minutes: u32,
    pub monitor_deviation: Option<bool>,
    pub emergency_message: Option<String>,
}

#[derive(Serialize)]
struct TripResponse {
    trip: Trip,
    /// Absent when no live session exists, e.g. after a service restart.
    monitor: Option<MonitorSnapshot>,
}

async fn start_trip(
    State(state): State<AppState>,
    session: SessionContext,
    Json(request): Json<StartTripRequest>,
) -> Result<Json<TripResponse>, AppError> {
    let origin = request.origin.resolve("origin")?;
    let destination = request.destination.resolve("destination")?;
    if request.safety_interval_minutes == 0 {
        return Err(AppError::Validation(
            "safety interval must be at least one minute".into(),
        ));
    }

    // Resolve missing display addresses, then compute the route. A routing
    // failure is recoverable: nothing is persisted yet.
    let origin_address = match &request.origin.address {
        Some(a) if !a.trim().is_empty() => a.trim().to_string(),
        _ => state.provider.reverse_geocode(origin).await?.address,
    };
    let dest_address = match &request.destination.address {
        Some(a) if !a.trim().is_empty() => a.trim().to_string(),
        _ => state.provider.reverse_geocode(destination).await?.address,
    };
    let route = state
        .provider
        .directions(origin, destination, request.travel_mode)
        .await?;

    let settings = db::profiles::fetch_or_default_settings(&state.pool, &session.user_id).await?;

    let new_trip = db::trips::NewTrip {
        owner_id: session.user_id.clone(),
        origin_address,
        origin,
        dest_address,
        destination,
        travel_mode: request.travel_mode,
        distance_meters: route.distance_meters,
        distance_text: route.distance_text.clone(),
        duration_seconds: route.duration_seconds,
        duration_text: route.duration_text.clone(),
        safety_check_interval_seconds: (request.safety_interval_minutes * 60) as i32,
        monitor_deviation: request.monitor_deviation.unwrap_or(settings.monitor_deviation),
        emergency_message: request.emergency_message.clone(),
        // Re-encode rather than trusting the provider's string verbatim.
        route_polyline: crate::geo::polyline::encode(&route.overview),
    };
    let trip = db::trips::create_active(&state.pool, &new_trip).await?;

    let monitor = TripMonitor::spawn(
        Arc::new(PgMonitorStore::new(state.pool.clone())),
        Arc::clone(&state.dispatcher),
        &trip,
        &settings,
        route.overview,
    );
    let snapshot = monitor.snapshot().await;
    state.registry.insert(&session.user_id, monitor).await;

    Ok(Json(TripResponse {
        trip,
        monitor: Some(snapshot),
    }))
}

async fn active_trip(
    State(state): State<AppState>,
    session: SessionContext,
) -> Result<Json<TripResponse>, AppError> {
    let trip = db::trips::fetch_active_for(&state.pool, &session.user_id)
        .await?
        .ok_or(AppError::NoActiveTrip)?;
    let monitor = match state.registry.get(&session.user_id).await {
        Some(m) => Some(m.snapshot().await),
        None => None,
    };
    Ok(Json(TripResponse { trip, monitor }))
}

#[derive(Debug, Deserialize)]
pub struct PositionReport {
    pub lat: f64,
    pub lng: f64,
    pub timestamp: Option<DateTime<Utc>>,
}

async fn report_position(
    State(state): State<AppState>,
    session: SessionContext,
    Json(report): Json<PositionReport>,
) -> Result<Json<MonitorSnapshot>, AppError> {
    let monitor = state
        .registry
        .get(&session.user_id)
        .await
        .ok_or(AppError::NoActiveTrip)?;
    let at = report.timestamp.unwrap_or_else(Utc::now);
    let snapshot = monitor
        .handle_position(LatLng::new(report.lat, report.lng), at)
        .await?;
    Ok(Json(snapshot))
}

async fn confirm_safety(
    State(state): State<AppState>,
    session: SessionContext,
) -> Result<Json<MonitorSnapshot>, AppError> {
    let monitor = state
        .registry
        .get(&session.user_id)
        .await
        .ok_or(AppError::NoActiveTrip)?;
    Ok(Json(monitor.confirm_safety().await))
}

#[derive(Debug, Deserialize)]
pub struct CancelAlertRequest {
    pub seq: u64,
}

async fn cancel_alert(
    State(state): State<AppState>,
    session: SessionContext,
    Json(request): Json<CancelAlertRequest>,
) -> Result<Json<MonitorSnapshot>, AppError> {
    let monitor = state
        .registry
        .get(&session.user_id)
        .await
        .ok_or(AppError::NoActiveTrip)?;
    Ok(Json(monitor.cancel_alert(request.seq).await))
}

#[derive(Serialize)]
struct SosResponse {
    sms_sent: usize,
    calls_placed: usize,
    failures: usize,
}

async fn trigger_sos(
    State(state): State<AppState>,
    session: SessionContext,
) -> Result<Json<SosResponse>, AppError> {
    let monitor = state
        .registry
        .get(&session.user_id)
        .await
        .ok_or(AppError::NoActiveTrip)?;
    let outcome = monitor.trigger_sos().await?;
    Ok(Json(SosResponse {
        sms_sent: outcome.sms_sent,
        calls_placed: outcome.calls_placed,
        failures: outcome.failures,
    }))
}

#[derive(Serialize)]
struct CompleteResponse {
    status: TripStatus,
    monitor: Option<MonitorSnapshot>,
}

async fn complete_trip(
    State(state): State<AppState>,
    session: SessionContext,
) -> Result<Json<CompleteResponse>, AppError> {
    if let Some(monitor) = state.registry.remove(&session.user_id).await {
        let snapshot = monitor.complete().await?;
        return Ok(Json(CompleteResponse {
            status: TripStatus::Completed,
            monitor: Some(snapshot),
        }));
    }

    // No live session (e.g. the service restarted): close the row directly.
    let trip = db::trips::fetch_active_for(&state.pool, &session.user_id)
        .await?
        .ok_or(AppError::NoActiveTrip)?;
    let duration = (Utc::now() - trip.start_time).num_seconds() as i32;
    let status =
        db::trips::mark_completed(&state.pool, trip.trip_id, Utc::now(), duration).await?;
    Ok(Json(CompleteResponse {
        status,
        monitor: None,
    }))
}

async fn trip_history(
    State(state): State<AppState>,
    session: SessionContext,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<Vec<LocationSample>>, AppError> {
    let trip = db::trips::fetch(&state.pool, trip_id)
        .await?
        .ok_or(AppError::NotFound("trip"))?;
    if trip.owner_id != session.user_id {
        db::guardians::require_link(&state.pool, &session.user_id, &trip.owner_id).await?;
    }
    Ok(Json(db::locations::history_for_trip(&state.pool, trip_id).await?))
}

// ---- contacts -------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub relation: Option<String>,
    pub priority: Option<ContactPriority>,
    pub notify_sms: Option<bool>,
    pub notify_call: Option<bool>,
    pub notify_email: Option<bool>,
}

impl ContactRequest {
    fn into_input(self) -> db::contacts::ContactInput {
        db::contacts::ContactInput {
            name: self.name,
            phone: self.phone,
            email: self.email,
            relation: self.relation,
            priority: self.priority.unwrap_or(ContactPriority::Primary),
            notify_sms: self.notify_sms.unwrap_or(true),
            notify_call: self.notify_call.unwrap_or(false),
            notify_email: self.notify_email.unwrap_or(false),
        }
    }
}

async fn list_contacts(
    State(state): State<AppState>,
    session: SessionContext,
) -> Result<Json<Vec<EmergencyContact>>, AppError> {
    Ok(Json(db::contacts::list(&state.pool, &session.user_id).await?))
}

async fn create_contact(
    State(state): State<AppState>,
    session: SessionContext,
    Json(request): Json<ContactRequest>,
) -> Result<Json<EmergencyContact>, AppError> {
    let contact =
        db::contacts::create(&state.pool, &session.user_id, &request.into_input()).await?;
    Ok(Json(contact))
}

async fn update_contact(
    State(state): State<AppState>,
    session: SessionContext,
    Path(contact_id): Path<Uuid>,
    Json(request): Json<ContactRequest>,
) -> Result<Json<EmergencyContact>, AppError> {
    let contact = db::contacts::update(
        &state.pool,
        &session.user_id,
        contact_id,
        &request.into_input(),
    )
    .await?;
    Ok(Json(contact))
}

async fn delete_contact(
    State(state): State<AppState>,
    session: SessionContext,
    Path(contact_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    db::contacts::delete(&state.pool, &session.user_id, contact_id).await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

// ---- profile & settings ---------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

async fn get_profile(
    State(state): State<AppState>,
    session: SessionContext,
) -> Result<Json<Option<UserProfile>>, AppError> {
    Ok(Json(
        db::profiles::fetch_profile(&state.pool, &session.user_id).await?,
    ))
}

async fn put_profile(
    State(state): State<AppState>,
    session: SessionContext,
    Json(request): Json<ProfileRequest>,
) -> Result<Json<UserProfile>, AppError> {
    let profile = db::profiles::upsert_profile(
        &state.pool,
        &session.user_id,
        request.display_name.as_deref(),
        request.phone.as_deref(),
        request.email.as_deref(),
    )
    .await?;
    Ok(Json(profile))
}

async fn get_settings(
    State(state): State<AppState>,
    session: SessionContext,
) -> Result<Json<SafetySettings>, AppError> {
    Ok(Json(
        db::profiles::fetch_or_default_settings(&state.pool, &session.user_id).await?,
    ))
}

async fn put_settings(
    State(state): State<AppState>,
    session: SessionContext,
    Json(mut settings): Json<SafetySettings>,
) -> Result<Json<SafetySettings>, AppError> {
    settings.user_id = session.user_id.clone();
    Ok(Json(
        db::profiles::update_settings(&state.pool, &session.user_id, &settings).await?,
    ))
}

// ---- guardians ------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct AddGuardianRequest {
    pub guardian_id: String,
}

async fn add_guardian(
    State(state): State<AppState>,
    session: SessionContext,
    Json(request): Json<AddGuardianRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if request.guardian_id.trim().is_empty() {
        return Err(AppError::Validation("guardian_id is required".into()));
    }
    db::guardians::link(&state.pool, request.guardian_id.trim(), &session.user_id).await?;
    Ok(Json(serde_json::json!({ "linked": true })))
}

async fn remove_guardian(
    State(state): State<AppState>,
    session: SessionContext,
    Path(guardian_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    db::guardians::unlink(&state.pool, &guardian_id, &session.user_id).await?;
    Ok(Json(serde_json::json!({ "linked": false })))
}

async fn ward_dashboard(
    State(state): State<AppState>,
    session: SessionContext,
    Path(ward_id): Path<String>,
) -> Result<Json<guardian::DashboardSnapshot>, AppError> {
    db::guardians::require_link(&state.pool, &session.user_id, &ward_id).await?;
    Ok(Json(guardian::dashboard(&state.pool, &ward_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct SafeZoneRequest {
    pub name: String,
    pub address: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub radius_meters: f64,
}

async fn create_safe_zone(
    State(state): State<AppState>,
    session: SessionContext,
    Path(ward_id): Path<String>,
    Json(request): Json<SafeZoneRequest>,
) -> Result<Json<SafeZone>, AppError> {
    db::guardians::require_link(&state.pool, &session.user_id, &ward_id).await?;
    let input = db::safe_zones::SafeZoneInput {
        name: request.name,
        address: request.address,
        center: LatLng::new(request.lat, request.lng),
        radius_meters: request.radius_meters,
    };
    let zone = db::safe_zones::create(&state.pool, &ward_id, &session.user_id, &input).await?;
    Ok(Json(zone))
}

async fn delete_safe_zone(
    State(state): State<AppState>,
    session: SessionContext,
    Path((ward_id, zone_id)): Path<(String, Uuid)>,
) -> Result<Json<serde_json::Value>, AppError> {
    db::guardians::require_link(&state.pool, &session.user_id, &ward_id).await?;
    db::safe_zones::delete(&state.pool, &ward_id, zone_id).await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

async fn mark_notification_read(
    State(state): State<AppState>,
    session: SessionContext,
    Path((ward_id, notification_id)): Path<(String, Uuid)>,
) -> Result<Json<Vec<Notification>>, AppError> {
    db::guardians::require_link(&state.pool, &session.user_id, &ward_id).await?;
    db::notifications::mark_read(&state.pool, &ward_id, notification_id).await?;
    Ok(Json(db::notifications::list(&state.pool, &ward_id, 50).await?))
}
