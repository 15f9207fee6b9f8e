//! Trip supervision state machine.
//!
//! Pure and clock-injected: callers feed wall-clock ticks and position fixes
//! in, and get emitted [`MonitorEvent`]s back. All I/O (persistence, alert
//! fan-out) happens in the engine, which holds this state behind one lock so
//! a cancel and an expiry can never both win.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::geo::{distance, LatLng};
use crate::models::{SafetySettings, Trip};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TripPhase {
    Active,
    AlertPending,
    Emergency,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertReason {
    Deviation,
    DistanceIncrease,
    Stagnation,
    MissedCheck,
    Sos,
}

impl AlertReason {
    pub fn describe(self) -> &'static str {
        match self {
            AlertReason::Deviation => "route deviation detected",
            AlertReason::DistanceIncrease => "moving away from destination",
            AlertReason::Stagnation => "no movement detected",
            AlertReason::MissedCheck => "safety check not confirmed",
            AlertReason::Sos => "manual SOS",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    /// The periodic safety-check countdown reached zero; prompt the user.
    SafetyCheckDue,
    /// A hazard started the alert countdown.
    AlertStarted {
        reason: AlertReason,
        seq: u64,
        countdown_seconds: u32,
    },
    /// The user cancelled the countdown in time.
    AlertCancelled { seq: u64 },
    /// The countdown expired (or SOS was pressed); the engine must attempt
    /// the emergency fan-out and commit [`MonitorState::enter_emergency`]
    /// only once contacts are confirmed to exist.
    EmergencyRequested { reason: AlertReason },
    /// Previously off-route position came back inside the envelope.
    BackOnRoute,
    /// Explicit end-trip action.
    TripCompleted { actual_duration_seconds: i64 },
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub safety_check_interval: u32,
    pub deviation_threshold_m: f64,
    pub route_buffer_m: f64,
    pub stagnation_radius_m: f64,
    pub stagnation_threshold: u32,
    pub alert_countdown: u32,
    pub auto_alert_on_missed_check: bool,
    pub confirmation_window: u32,
    pub monitor_deviation: bool,
}

impl MonitorConfig {
    pub fn from_settings(settings: &SafetySettings, trip: &Trip) -> Self {
        Self {
            safety_check_interval: trip.safety_check_interval_seconds.max(1) as u32,
            deviation_threshold_m: settings.deviation_threshold_meters,
            route_buffer_m: settings.route_buffer_meters,
            stagnation_radius_m: settings.stagnation_radius_meters,
            stagnation_threshold: settings.stagnation_threshold_seconds.max(1) as u32,
            alert_countdown: settings.alert_countdown_seconds.max(1) as u32,
            auto_alert_on_missed_check: settings.auto_alert_on_missed_check,
            confirmation_window: settings.confirmation_window_seconds.max(1) as u32,
            monitor_deviation: trip.monitor_deviation && settings.monitor_deviation,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingAlert {
    pub reason: AlertReason,
    pub seq: u64,
    pub remaining_seconds: u32,
}

/// Serializable view of the session for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct MonitorSnapshot {
    pub phase: TripPhase,
    pub safety_check_remaining_seconds: u32,
    pub awaiting_confirmation: bool,
    pub alert: Option<PendingAlert>,
    pub last_position: Option<LatLng>,
    pub off_route: bool,
}

#[derive(Debug)]
pub struct MonitorState {
    config: MonitorConfig,
    route: Vec<LatLng>,
    destination: LatLng,
    started_at: DateTime<Utc>,
    phase: TripPhase,
    safety_remaining: u32,
    confirmation_remaining: Option<u32>,
    alert: Option<PendingAlert>,
    next_alert_seq: u64,
    last_position: Option<(LatLng, DateTime<Utc>)>,
    prev_dest_distance: Option<f64>,
    off_route: bool,
    stagnation_anchor: Option<(LatLng, DateTime<Utc>)>,
    stagnation_flagged: bool,
}

impl MonitorState {
    pub fn new(
        config: MonitorConfig,
        route: Vec<LatLng>,
        destination: LatLng,
        started_at: DateTime<Utc>,
    ) -> Self {
        let safety_remaining = config.safety_check_interval;
        Self {
            config,
            route,
            destination,
            started_at,
            phase: TripPhase::Active,
            safety_remaining,
            confirmation_remaining: None,
            alert: None,
            next_alert_seq: 1,
            last_position: None,
            prev_dest_distance: None,
            off_route: false,
            stagnation_anchor: None,
            stagnation_flagged: false,
        }
    }

    pub fn phase(&self) -> TripPhase {
        self.phase
    }

    pub fn last_position(&self) -> Option<LatLng> {
        self.last_position.map(|(p, _)| p)
    }

    pub fn snapshot(&self) -> MonitorSnapshot {
        MonitorSnapshot {
            phase: self.phase,
            safety_check_remaining_seconds: self.safety_remaining,
            awaiting_confirmation: self.confirmation_remaining.is_some(),
            alert: self.alert.clone(),
            last_position: self.last_position(),
            off_route: self.off_route,
        }
    }

    /// Advance all countdowns by one second of wall clock.
    pub fn tick(&mut self) -> Vec<MonitorEvent> {
        let mut events = Vec::new();
        if !matches!(self.phase, TripPhase::Active | TripPhase::AlertPending) {
            return events;
        }

        // Alert countdown. Expiry clears the pending alert and drops back to
        // Active; the Emergency transition is committed by the engine after
        // it has verified at least one contact exists.
        let expired = match self.alert.as_mut() {
            Some(alert) => {
                alert.remaining_seconds -= 1;
                alert.remaining_seconds == 0
            }
            None => false,
        };
        if expired {
            if let Some(alert) = self.alert.take() {
                self.phase = TripPhase::Active;
                events.push(MonitorEvent::EmergencyRequested {
                    reason: alert.reason,
                });
            }
        }

        // Unconfirmed safety check escalates after the confirmation window.
        // Runs before the countdown below so a freshly opened window is not
        // shortened by its own tick.
        if let Some(remaining) = self.confirmation_remaining.as_mut() {
            *remaining -= 1;
            if *remaining == 0 {
                self.confirmation_remaining = None;
                self.start_alert(AlertReason::MissedCheck, &mut events);
            }
        }

        // Safety-check countdown keeps running in both phases.
        self.safety_remaining -= 1;
        if self.safety_remaining == 0 {
            self.safety_remaining = self.config.safety_check_interval;
            events.push(MonitorEvent::SafetyCheckDue);
            if self.config.auto_alert_on_missed_check
                && self.confirmation_remaining.is_none()
                && self.alert.is_none()
            {
                self.confirmation_remaining = Some(self.config.confirmation_window);
            }
        }

        events
    }

    /// Record a position fix and run deviation and stagnation checks.
    /// Inert once the trip is in Emergency or Completed.
    pub fn observe_position(&mut self, position: LatLng, at: DateTime<Utc>) -> Vec<MonitorEvent> {
        let mut events = Vec::new();
        if !matches!(self.phase, TripPhase::Active | TripPhase::AlertPending) {
            return events;
        }

        self.last_position = Some((position, at));

        if self.config.monitor_deviation {
            self.check_route_deviation(position, &mut events);
        }
        self.check_stagnation(position, at, &mut events);

        events
    }

    fn check_route_deviation(&mut self, position: LatLng, events: &mut Vec<MonitorEvent>) {
        // Distance to destination growing past the threshold between two
        // consecutive samples.
        let dest_distance = distance::haversine_meters(position, self.destination);
        if let Some(prev) = self.prev_dest_distance {
            if dest_distance - prev > self.config.deviation_threshold_m {
                self.start_alert(AlertReason::DistanceIncrease, events);
            }
        }
        self.prev_dest_distance = Some(dest_distance);

        // Route envelope: planned path widened by the buffer.
        if let Some(path_distance) = distance::point_to_path_meters(position, &self.route) {
            if path_distance > self.config.route_buffer_m {
                if !self.off_route {
                    self.off_route = true;
                    self.start_alert(AlertReason::Deviation, events);
                }
            } else if self.off_route {
                self.off_route = false;
                events.push(MonitorEvent::BackOnRoute);
            }
        }
    }

    fn check_stagnation(&mut self, position: LatLng, at: DateTime<Utc>, events: &mut Vec<MonitorEvent>) {
        match self.stagnation_anchor {
            None => self.stagnation_anchor = Some((position, at)),
            Some((anchor, since)) => {
                if distance::haversine_meters(position, anchor) >= self.config.stagnation_radius_m {
                    self.stagnation_anchor = Some((position, at));
                    self.stagnation_flagged = false;
                } else {
                    let elapsed = (at - since).num_seconds();
                    // Strictly greater-than: a 10-minute threshold fires on
                    // the 601st second, not the 600th.
                    if elapsed > i64::from(self.config.stagnation_threshold)
                        && !self.stagnation_flagged
                    {
                        self.stagnation_flagged = true;
                        self.start_alert(AlertReason::Stagnation, events);
                    }
                }
            }
        }
    }

    fn start_alert(&mut self, reason: AlertReason, events: &mut Vec<MonitorEvent>) {
        if self.phase != TripPhase::Active || self.alert.is_some() {
            return;
        }
        let seq = self.next_alert_seq;
        self.next_alert_seq += 1;
        self.alert = Some(PendingAlert {
            reason,
            seq,
            remaining_seconds: self.config.alert_countdown,
        });
        self.phase = TripPhase::AlertPending;
        events.push(MonitorEvent::AlertStarted {
            reason,
            seq,
            countdown_seconds: self.config.alert_countdown,
        });
    }

    /// Cancel the pending alert identified by `seq`. A stale sequence (the
    /// countdown already expired or was replaced) is a no-op.
    pub fn cancel_alert(&mut self, seq: u64) -> Vec<MonitorEvent> {
        let mut events = Vec::new();
        if self.phase == TripPhase::AlertPending
            && self.alert.as_ref().map(|a| a.seq) == Some(seq)
        {
            self.alert = None;
            self.phase = TripPhase::Active;
            events.push(MonitorEvent::AlertCancelled { seq });
        }
        events
    }

    /// "I'm safe" response to the periodic prompt: clears the confirmation
    /// window and restarts the interval.
    pub fn confirm_safety(&mut self) {
        if matches!(self.phase, TripPhase::Active | TripPhase::AlertPending) {
            self.confirmation_remaining = None;
            self.safety_remaining = self.config.safety_check_interval;
        }
    }

    /// Manual SOS: skips the countdown entirely.
    pub fn trigger_sos(&mut self) -> Vec<MonitorEvent> {
        let mut events = Vec::new();
        if matches!(self.phase, TripPhase::Active | TripPhase::AlertPending) {
            self.alert = None;
            self.phase = TripPhase::Active;
            events.push(MonitorEvent::EmergencyRequested {
                reason: AlertReason::Sos,
            });
        }
        events
    }

    /// Commit the Emergency phase. Called by the engine once the fan-out
    /// preconditions held (at least one contact).
    pub fn enter_emergency(&mut self) {
        if matches!(self.phase, TripPhase::Active | TripPhase::AlertPending) {
            self.alert = None;
            self.confirmation_remaining = None;
            self.phase = TripPhase::Emergency;
        }
    }

    /// Explicit end-trip action. Idempotent.
    pub fn complete(&mut self, now: DateTime<Utc>) -> Vec<MonitorEvent> {
        let mut events = Vec::new();
        if self.phase != TripPhase::Completed {
            self.phase = TripPhase::Completed;
            self.alert = None;
            self.confirmation_remaining = None;
            events.push(MonitorEvent::TripCompleted {
                actual_duration_seconds: (now - self.started_at).num_seconds(),
            });
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn config(interval: u32) -> MonitorConfig {
        MonitorConfig {
            safety_check_interval: interval,
            deviation_threshold_m: 1000.0,
            route_buffer_m: 200.0,
            stagnation_radius_m: 30.0,
            stagnation_threshold: 600,
            alert_countdown: 10,
            auto_alert_on_missed_check: false,
            confirmation_window: 60,
            monitor_deviation: true,
        }
    }

    fn straight_route() -> Vec<LatLng> {
        vec![
            LatLng::new(12.9700, 77.5900),
            LatLng::new(12.9750, 77.5950),
            LatLng::new(12.9800, 77.6000),
        ]
    }

    fn state_with(config: MonitorConfig) -> MonitorState {
        MonitorState::new(
            config,
            straight_route(),
            LatLng::new(12.9800, 77.6000),
            Utc::now(),
        )
    }

    fn first_alert(events: &[MonitorEvent]) -> Option<(AlertReason, u64)> {
        events.iter().find_map(|e| match e {
            MonitorEvent::AlertStarted { reason, seq, .. } => Some((*reason, *seq)),
            _ => None,
        })
    }

    #[test]
    fn safety_check_fires_on_the_300th_tick_and_resets() {
        let mut state = state_with(config(300));
        for i in 1..300 {
            let events = state.tick();
            assert!(events.is_empty(), "unexpected events at tick {i}: {events:?}");
        }
        let events = state.tick();
        assert_eq!(events, vec![MonitorEvent::SafetyCheckDue]);
        assert_eq!(state.snapshot().safety_check_remaining_seconds, 300);
    }

    #[test]
    fn auto_alert_escalates_sixty_seconds_after_unconfirmed_check() {
        let mut cfg = config(300);
        cfg.auto_alert_on_missed_check = true;
        let mut state = state_with(cfg);

        for _ in 0..300 {
            state.tick();
        }
        assert!(state.snapshot().awaiting_confirmation);

        for i in 1..60 {
            let events = state.tick();
            assert!(first_alert(&events).is_none(), "escalated early at +{i}s");
        }
        let events = state.tick();
        assert_eq!(first_alert(&events), Some((AlertReason::MissedCheck, 1)));
        assert_eq!(state.phase(), TripPhase::AlertPending);
    }

    #[test]
    fn confirming_within_the_window_prevents_escalation() {
        let mut cfg = config(300);
        cfg.auto_alert_on_missed_check = true;
        let mut state = state_with(cfg);

        for _ in 0..300 {
            state.tick();
        }
        state.confirm_safety();

        for _ in 0..120 {
            let events = state.tick();
            assert!(first_alert(&events).is_none());
        }
        assert_eq!(state.phase(), TripPhase::Active);
    }

    #[test]
    fn alert_countdown_expires_into_emergency_request() {
        let mut state = state_with(config(300));
        let start = Utc::now();
        // Step far off the route to start the countdown.
        let events = state.observe_position(LatLng::new(12.9500, 77.5500), start);
        let (reason, _) = first_alert(&events).expect("alert should start");
        assert_eq!(reason, AlertReason::Deviation);

        for _ in 0..9 {
            assert!(state.tick().is_empty());
        }
        let events = state.tick();
        assert!(events.contains(&MonitorEvent::EmergencyRequested {
            reason: AlertReason::Deviation
        }));
    }

    #[test]
    fn timely_cancel_prevents_expiry() {
        let mut state = state_with(config(300));
        let events = state.observe_position(LatLng::new(12.9500, 77.5500), Utc::now());
        let (_, seq) = first_alert(&events).unwrap();

        for _ in 0..9 {
            state.tick();
        }
        assert_eq!(
            state.cancel_alert(seq),
            vec![MonitorEvent::AlertCancelled { seq }]
        );
        assert_eq!(state.phase(), TripPhase::Active);
        // The would-be expiry tick is now inert.
        for _ in 0..20 {
            for event in state.tick() {
                assert!(!matches!(event, MonitorEvent::EmergencyRequested { .. }));
            }
        }
    }

    #[test]
    fn stale_cancel_sequence_is_a_no_op() {
        let mut state = state_with(config(300));
        let events = state.observe_position(LatLng::new(12.9500, 77.5500), Utc::now());
        let (_, seq) = first_alert(&events).unwrap();
        assert!(state.cancel_alert(seq + 1).is_empty());
        assert_eq!(state.phase(), TripPhase::AlertPending);
    }

    #[test]
    fn deviation_clears_with_back_on_route_exactly_once() {
        let mut state = state_with(config(300));
        let now = Utc::now();

        let events = state.observe_position(LatLng::new(12.9500, 77.5500), now);
        assert_eq!(first_alert(&events), Some((AlertReason::Deviation, 1)));
        let (_, seq) = first_alert(&events).unwrap();
        state.cancel_alert(seq);

        // Back inside the envelope: exactly one notification.
        let on_route = LatLng::new(12.9750, 77.5950);
        let events = state.observe_position(on_route, now + Duration::seconds(40));
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, MonitorEvent::BackOnRoute))
                .count(),
            1
        );
        let events = state.observe_position(on_route, now + Duration::seconds(41));
        assert!(!events.contains(&MonitorEvent::BackOnRoute));
    }

    #[test]
    fn distance_increase_between_samples_starts_an_alert() {
        let mut cfg = config(300);
        cfg.route_buffer_m = 1_000_000.0; // keep the envelope check quiet
        let mut state = state_with(cfg);
        let now = Utc::now();

        state.observe_position(LatLng::new(12.9750, 77.5950), now);
        // ~2.4 km further from the destination than the previous sample.
        let events = state.observe_position(
            LatLng::new(12.9600, 77.5800),
            now + Duration::seconds(10),
        );
        assert_eq!(
            first_alert(&events).map(|(r, _)| r),
            Some(AlertReason::DistanceIncrease)
        );
    }

    #[test]
    fn stagnation_fires_at_second_601_not_before() {
        let mut state = state_with(config(7200));
        let start = Utc::now();
        let here = LatLng::new(12.9750, 77.5950);
        // Jitter under 5 m around the anchor.
        let nearby = LatLng::new(12.97502, 77.59502);

        for s in 0..=600 {
            let pos = if s % 2 == 0 { here } else { nearby };
            let events = state.observe_position(pos, start + Duration::seconds(s));
            assert!(
                first_alert(&events).is_none(),
                "stagnation fired early at +{s}s"
            );
        }
        let events = state.observe_position(here, start + Duration::seconds(601));
        assert_eq!(
            first_alert(&events).map(|(r, _)| r),
            Some(AlertReason::Stagnation)
        );
    }

    #[test]
    fn movement_beyond_thirty_meters_resets_the_stagnation_clock() {
        let mut state = state_with(config(7200));
        let start = Utc::now();
        let here = LatLng::new(12.9750, 77.5950);
        // ~55 m north.
        let moved = LatLng::new(12.9755, 77.5950);

        state.observe_position(here, start);
        state.observe_position(moved, start + Duration::seconds(500));
        // 601 s after the original anchor, but only 101 s after the move.
        let events = state.observe_position(moved, start + Duration::seconds(601));
        assert!(first_alert(&events).is_none());
        // And one episode only fires once.
        let events = state.observe_position(moved, start + Duration::seconds(1102));
        assert_eq!(
            first_alert(&events).map(|(r, _)| r),
            Some(AlertReason::Stagnation)
        );
        let events = state.observe_position(moved, start + Duration::seconds(1103));
        assert!(first_alert(&events).is_none());
    }

    #[test]
    fn sos_requests_emergency_directly() {
        let mut state = state_with(config(300));
        let events = state.trigger_sos();
        assert_eq!(
            events,
            vec![MonitorEvent::EmergencyRequested {
                reason: AlertReason::Sos
            }]
        );
        // Phase is committed only by the engine.
        assert_eq!(state.phase(), TripPhase::Active);
        state.enter_emergency();
        assert_eq!(state.phase(), TripPhase::Emergency);
    }

    #[test]
    fn completion_makes_later_positions_and_ticks_inert() {
        let mut state = state_with(config(300));
        let now = Utc::now();
        let events = state.complete(now + Duration::seconds(90));
        assert_eq!(
            events,
            vec![MonitorEvent::TripCompleted {
                actual_duration_seconds: 90
            }]
        );
        assert!(state
            .observe_position(LatLng::new(12.9500, 77.5500), now + Duration::seconds(95))
            .is_empty());
        assert!(state.tick().is_empty());
        // Idempotent.
        assert!(state.complete(now + Duration::seconds(100)).is_empty());
    }
}
