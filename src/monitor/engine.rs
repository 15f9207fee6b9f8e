//! Async supervision of one active trip.
//!
//! The engine owns the 1-second ticker, persistence of samples and trip
//! mutations, and the emergency fan-out. All state transitions go through
//! the single [`MonitorState`] lock, so a user's cancel and the ticker's
//! expiry resolve in one order. Persistence goes through [`MonitorStore`],
//! with the Postgres implementation delegating to the `db` accessors.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::alerts::{self, AlertDispatcher, DispatchOutcome};
use crate::db::{self, DbPool};
use crate::error::AppError;
use crate::geo::LatLng;
use crate::models::{EmergencyContact, NotificationKind, SafetySettings, Trip};

use super::state::{MonitorConfig, MonitorEvent, MonitorSnapshot, MonitorState, TripPhase};
use super::AlertReason;

/// Everything the engine persists or looks up while a trip runs.
#[async_trait]
pub trait MonitorStore: Send + Sync {
    async fn emergency_contacts(&self, user_id: &str)
        -> Result<Vec<EmergencyContact>, AppError>;

    async fn notify(
        &self,
        user_id: &str,
        kind: NotificationKind,
        title: &str,
        message: &str,
    ) -> Result<(), AppError>;

    async fn append_location(
        &self,
        user_id: &str,
        trip_id: Uuid,
        position: LatLng,
        at: DateTime<Utc>,
    ) -> Result<(), AppError>;

    async fn update_live_position(
        &self,
        trip_id: Uuid,
        position: LatLng,
        at: DateTime<Utc>,
    ) -> Result<(), AppError>;

    async fn mark_emergency(&self, trip_id: Uuid) -> Result<(), AppError>;

    async fn mark_completed(
        &self,
        trip_id: Uuid,
        end_time: DateTime<Utc>,
        actual_duration_seconds: i32,
    ) -> Result<(), AppError>;
}

pub struct PgMonitorStore {
    pool: DbPool,
}

impl PgMonitorStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MonitorStore for PgMonitorStore {
    async fn emergency_contacts(
        &self,
        user_id: &str,
    ) -> Result<Vec<EmergencyContact>, AppError> {
        db::contacts::list(&self.pool, user_id).await
    }

    async fn notify(
        &self,
        user_id: &str,
        kind: NotificationKind,
        title: &str,
        message: &str,
    ) -> Result<(), AppError> {
        db::notifications::insert(&self.pool, user_id, kind, title, message).await
    }

    async fn append_location(
        &self,
        user_id: &str,
        trip_id: Uuid,
        position: LatLng,
        at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        db::locations::append(&self.pool, user_id, Some(trip_id), position, at).await
    }

    async fn update_live_position(
        &self,
        trip_id: Uuid,
        position: LatLng,
        at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        db::trips::update_live_position(&self.pool, trip_id, position, at).await
    }

    async fn mark_emergency(&self, trip_id: Uuid) -> Result<(), AppError> {
        db::trips::mark_emergency(&self.pool, trip_id).await
    }

    async fn mark_completed(
        &self,
        trip_id: Uuid,
        end_time: DateTime<Utc>,
        actual_duration_seconds: i32,
    ) -> Result<(), AppError> {
        db::trips::mark_completed(&self.pool, trip_id, end_time, actual_duration_seconds)
            .await?;
        Ok(())
    }
}

struct EngineDeps {
    store: Arc<dyn MonitorStore>,
    dispatcher: Arc<dyn AlertDispatcher>,
    emergency_message: String,
}

pub struct TripMonitor {
    trip_id: Uuid,
    owner_id: String,
    state: Arc<Mutex<MonitorState>>,
    deps: Arc<EngineDeps>,
    cancel: CancellationToken,
}

impl TripMonitor {
    /// Build the session state and start its ticker task.
    pub fn spawn(
        store: Arc<dyn MonitorStore>,
        dispatcher: Arc<dyn AlertDispatcher>,
        trip: &Trip,
        settings: &SafetySettings,
        route: Vec<LatLng>,
    ) -> Arc<Self> {
        let config = MonitorConfig::from_settings(settings, trip);
        let state = Arc::new(Mutex::new(MonitorState::new(
            config,
            route,
            trip.destination(),
            trip.start_time,
        )));

        let emergency_message = trip
            .emergency_message
            .clone()
            .unwrap_or_else(|| settings.emergency_message.clone());

        let monitor = Arc::new(Self {
            trip_id: trip.trip_id,
            owner_id: trip.owner_id.clone(),
            state,
            deps: Arc::new(EngineDeps {
                store,
                dispatcher,
                emergency_message,
            }),
            cancel: CancellationToken::new(),
        });

        let ticker = Arc::clone(&monitor);
        tokio::spawn(async move { ticker.run_ticker().await });

        info!(
            "monitoring trip {} for user {} (interval {}s)",
            monitor.trip_id, monitor.owner_id, trip.safety_check_interval_seconds
        );
        monitor
    }

    async fn run_ticker(self: Arc<Self>) {
        let mut interval = time::interval(Duration::from_secs(1));
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = interval.tick() => {
                    let events = self.state.lock().await.tick();
                    self.react(events).await;
                }
            }
        }
        info!("ticker stopped for trip {}", self.trip_id);
    }

    async fn react(&self, events: Vec<MonitorEvent>) {
        for event in events {
            if let Err(e) = self.react_one(event).await {
                error!("trip {}: event handling failed: {e}", self.trip_id);
            }
        }
    }

    async fn react_one(&self, event: MonitorEvent) -> Result<(), AppError> {
        match event {
            MonitorEvent::SafetyCheckDue => {
                info!("trip {}: safety check due", self.trip_id);
                self.deps
                    .store
                    .notify(
                        &self.owner_id,
                        NotificationKind::Safety,
                        "Safety check",
                        "Please confirm you are safe.",
                    )
                    .await
            }
            MonitorEvent::AlertStarted {
                reason,
                seq,
                countdown_seconds,
            } => {
                warn!(
                    "trip {}: alert countdown {seq} started ({}), {countdown_seconds}s to cancel",
                    self.trip_id,
                    reason.describe()
                );
                self.deps
                    .store
                    .notify(
                        &self.owner_id,
                        NotificationKind::Safety,
                        "Alert countdown started",
                        reason.describe(),
                    )
                    .await
            }
            MonitorEvent::AlertCancelled { seq } => {
                info!("trip {}: alert {seq} cancelled by user", self.trip_id);
                Ok(())
            }
            MonitorEvent::BackOnRoute => {
                info!("trip {}: back on route", self.trip_id);
                self.deps
                    .store
                    .notify(
                        &self.owner_id,
                        NotificationKind::Trip,
                        "Back on route",
                        "Position returned inside the planned route.",
                    )
                    .await
            }
            MonitorEvent::EmergencyRequested { reason } => {
                // Ticker-driven expiry: nobody is waiting on the result.
                match self.run_emergency(reason).await {
                    Ok(outcome) => {
                        info!(
                            "trip {}: emergency dispatched ({} sms, {} calls)",
                            self.trip_id, outcome.sms_sent, outcome.calls_placed
                        );
                        Ok(())
                    }
                    Err(AppError::NoContacts) => {
                        warn!(
                            "trip {}: emergency requested but no contacts configured",
                            self.trip_id
                        );
                        // Surface the blocked alert outside the process log.
                        self.deps
                            .store
                            .notify(
                                &self.owner_id,
                                NotificationKind::Safety,
                                "Emergency not sent",
                                "No emergency contacts are configured.",
                            )
                            .await
                    }
                    Err(e) => Err(e),
                }
            }
            MonitorEvent::TripCompleted {
                actual_duration_seconds,
            } => {
                self.deps
                    .store
                    .mark_completed(self.trip_id, Utc::now(), actual_duration_seconds as i32)
                    .await?;
                self.deps
                    .store
                    .notify(
                        &self.owner_id,
                        NotificationKind::Trip,
                        "Trip completed",
                        "The trip ended safely.",
                    )
                    .await
            }
        }
    }

    /// Fan-out with the zero-contact guard: the Emergency transition is only
    /// committed after at least one contact is confirmed to exist.
    async fn run_emergency(&self, reason: AlertReason) -> Result<DispatchOutcome, AppError> {
        let contacts = self.deps.store.emergency_contacts(&self.owner_id).await?;
        if contacts.is_empty() {
            return Err(AppError::NoContacts);
        }

        let last_position = self.state.lock().await.last_position();
        let message = alerts::compose_emergency_message(
            &self.deps.emergency_message,
            Some(reason),
            last_position,
        );

        let outcome =
            alerts::dispatch_emergency(self.deps.dispatcher.as_ref(), &contacts, &message).await;

        self.deps.store.mark_emergency(self.trip_id).await?;
        self.deps
            .store
            .notify(
                &self.owner_id,
                NotificationKind::Emergency,
                "Emergency alert sent",
                &message,
            )
            .await?;
        self.state.lock().await.enter_emergency();

        Ok(outcome)
    }

    /// Record a position fix: appended to history, mirrored onto the trip
    /// row for guardian reads, then run through the hazard checks. Inert
    /// once the trip is completed.
    pub async fn handle_position(
        &self,
        position: LatLng,
        at: DateTime<Utc>,
    ) -> Result<MonitorSnapshot, AppError> {
        let (events, snapshot) = {
            let mut state = self.state.lock().await;
            if state.phase() == TripPhase::Completed {
                return Ok(state.snapshot());
            }
            let events = state.observe_position(position, at);
            (events, state.snapshot())
        };

        self.deps
            .store
            .append_location(&self.owner_id, self.trip_id, position, at)
            .await?;
        self.deps
            .store
            .update_live_position(self.trip_id, position, at)
            .await?;

        self.react(events).await;
        Ok(snapshot)
    }

    pub async fn confirm_safety(&self) -> MonitorSnapshot {
        let mut state = self.state.lock().await;
        state.confirm_safety();
        state.snapshot()
    }

    pub async fn cancel_alert(&self, seq: u64) -> MonitorSnapshot {
        let (events, snapshot) = {
            let mut state = self.state.lock().await;
            let events = state.cancel_alert(seq);
            (events, state.snapshot())
        };
        self.react(events).await;
        snapshot
    }

    /// Manual SOS. Unlike the ticker path the caller gets the result, so a
    /// missing-contacts condition surfaces as an error with no state change.
    pub async fn trigger_sos(&self) -> Result<DispatchOutcome, AppError> {
        let requested = {
            let mut state = self.state.lock().await;
            !state.trigger_sos().is_empty()
        };
        if !requested {
            return Err(AppError::NoActiveTrip);
        }
        self.run_emergency(AlertReason::Sos).await
    }

    /// Explicit end-trip action: tears the ticker down, then persists the
    /// completion. The token is cancelled first so a failed write cannot
    /// leave the ticker spinning on a completed-in-memory session.
    pub async fn complete(&self) -> Result<MonitorSnapshot, AppError> {
        let (events, snapshot) = {
            let mut state = self.state.lock().await;
            let events = state.complete(Utc::now());
            (events, state.snapshot())
        };
        self.cancel.cancel();
        for event in events {
            self.react_one(event).await?;
        }
        Ok(snapshot)
    }

    pub async fn snapshot(&self) -> MonitorSnapshot {
        self.state.lock().await.snapshot()
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl Drop for TripMonitor {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Live trip sessions by owner. The database invariant is the source of
/// truth for "one active trip per user"; this map lets API handlers reach
/// the in-process session.
#[derive(Clone, Default)]
pub struct MonitorRegistry {
    inner: Arc<Mutex<HashMap<String, Arc<TripMonitor>>>>,
}

impl MonitorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, owner_id: &str, monitor: Arc<TripMonitor>) {
        if let Some(old) = self
            .inner
            .lock()
            .await
            .insert(owner_id.to_string(), monitor)
        {
            // Should not happen given the database guard; stop the stray
            // ticker anyway.
            warn!("replacing a live monitor for user {owner_id}");
            old.shutdown();
        }
    }

    pub async fn get(&self, owner_id: &str) -> Option<Arc<TripMonitor>> {
        self.inner.lock().await.get(owner_id).cloned()
    }

    pub async fn remove(&self, owner_id: &str) -> Option<Arc<TripMonitor>> {
        self.inner.lock().await.remove(owner_id)
    }

    pub async fn active_count(&self) -> usize {
        self.inner.lock().await.len()
    }
}
