//! Emergency alert composition and fan-out.
//!
//! The dispatcher seam keeps the monitor engine testable; the production
//! implementation posts to the SMS/voice relay (`relay` module).

pub mod relay_client;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::geo::LatLng;
use crate::models::EmergencyContact;
use crate::monitor::AlertReason;

pub use relay_client::RelayClient;

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("alert relay request failed: {0}")]
    Relay(String),
}

#[async_trait]
pub trait AlertDispatcher: Send + Sync {
    async fn send_sms(&self, recipient: &str, message: &str) -> Result<(), AlertError>;

    async fn make_call(&self, recipient: &str) -> Result<(), AlertError>;
}

/// Build the outbound emergency text: the user's configured message, an
/// optional reason annotation, and a maps link for the last known position
/// (the literal `unknown` when no fix was ever recorded).
pub fn compose_emergency_message(
    custom_text: &str,
    reason: Option<AlertReason>,
    last_position: Option<LatLng>,
) -> String {
    let mut message = custom_text.trim().to_string();

    if let Some(reason) = reason {
        message.push_str(&format!(" Reason: {}.", reason.describe()));
    }

    match last_position {
        Some(p) => message.push_str(&format!(
            " My location: https://maps.google.com/?q={:.6},{:.6}",
            p.lat, p.lng
        )),
        None => message.push_str(" My location: unknown"),
    }

    message
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub sms_sent: usize,
    pub calls_placed: usize,
    pub failures: usize,
}

/// One outbound dispatch per contact per enabled channel. Individual relay
/// failures are logged and counted; the fan-out keeps going so one bad
/// number cannot block the rest.
pub async fn dispatch_emergency(
    dispatcher: &dyn AlertDispatcher,
    contacts: &[EmergencyContact],
    message: &str,
) -> DispatchOutcome {
    let mut outcome = DispatchOutcome::default();

    for contact in contacts {
        if contact.notify_sms {
            match dispatcher.send_sms(&contact.phone, message).await {
                Ok(()) => outcome.sms_sent += 1,
                Err(e) => {
                    warn!("SMS to {} failed: {e}", contact.name);
                    outcome.failures += 1;
                }
            }
        }
        if contact.notify_call {
            match dispatcher.make_call(&contact.phone).await {
                Ok(()) => outcome.calls_placed += 1,
                Err(e) => {
                    warn!("call to {} failed: {e}", contact.name);
                    outcome.failures += 1;
                }
            }
        }
        if contact.notify_email {
            // The relay carries SMS and voice only.
            warn!("contact {} wants email alerts, channel unavailable", contact.name);
        }
    }

    info!(
        "emergency fan-out: {} sms, {} calls, {} failures",
        outcome.sms_sent, outcome.calls_placed, outcome.failures
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::contact::ContactPriority;
    use chrono::Utc;
    use std::sync::Mutex;
    use uuid::Uuid;

    #[derive(Default)]
    struct RecordingDispatcher {
        sms: Mutex<Vec<(String, String)>>,
        calls: Mutex<Vec<String>>,
        fail_sms: bool,
    }

    #[async_trait]
    impl AlertDispatcher for RecordingDispatcher {
        async fn send_sms(&self, recipient: &str, message: &str) -> Result<(), AlertError> {
            if self.fail_sms {
                return Err(AlertError::Relay("boom".into()));
            }
            self.sms
                .lock()
                .unwrap()
                .push((recipient.to_string(), message.to_string()));
            Ok(())
        }

        async fn make_call(&self, recipient: &str) -> Result<(), AlertError> {
            self.calls.lock().unwrap().push(recipient.to_string());
            Ok(())
        }
    }

    fn contact(name: &str, phone: &str, sms: bool, call: bool) -> EmergencyContact {
        EmergencyContact {
            contact_id: Uuid::new_v4(),
            user_id: "u1".into(),
            name: name.into(),
            phone: phone.into(),
            email: None,
            relation: None,
            priority: ContactPriority::Primary,
            notify_sms: sms,
            notify_call: call,
            notify_email: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn message_includes_custom_text_reason_and_maps_link() {
        let message = compose_emergency_message(
            "Help me!",
            Some(AlertReason::Stagnation),
            Some(LatLng::new(12.9716, 77.5946)),
        );
        assert!(message.starts_with("Help me!"));
        assert!(message.contains("no movement detected"));
        assert!(message.contains("https://maps.google.com/?q=12.971600,77.594600"));
    }

    #[test]
    fn message_without_a_fix_says_unknown() {
        let message = compose_emergency_message("Help me!", None, None);
        assert!(message.ends_with("My location: unknown"));
        assert!(!message.contains("Reason"));
    }

    #[tokio::test]
    async fn one_sms_per_contact() {
        let dispatcher = RecordingDispatcher::default();
        let contacts = vec![
            contact("a", "+911111111111", true, false),
            contact("b", "+912222222222", true, false),
            contact("c", "+913333333333", true, true),
        ];

        let outcome = dispatch_emergency(&dispatcher, &contacts, "msg").await;
        assert_eq!(outcome.sms_sent, 3);
        assert_eq!(outcome.calls_placed, 1);
        assert_eq!(outcome.failures, 0);

        let sms = dispatcher.sms.lock().unwrap();
        assert_eq!(sms.len(), 3);
        assert!(sms.iter().all(|(_, m)| m == "msg"));
    }

    #[tokio::test]
    async fn email_only_contact_gets_no_dispatch_and_no_failure() {
        let dispatcher = RecordingDispatcher::default();
        let mut email_only = contact("a", "+911111111111", false, false);
        email_only.email = Some("a@example.com".into());
        email_only.notify_email = true;

        let outcome = dispatch_emergency(&dispatcher, &[email_only], "msg").await;
        assert_eq!(outcome, DispatchOutcome::default());
        assert!(dispatcher.sms.lock().unwrap().is_empty());
        assert!(dispatcher.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn a_failing_channel_does_not_stop_the_fan_out() {
        let dispatcher = RecordingDispatcher {
            fail_sms: true,
            ..Default::default()
        };
        let contacts = vec![
            contact("a", "+911111111111", true, true),
            contact("b", "+912222222222", true, false),
        ];

        let outcome = dispatch_emergency(&dispatcher, &contacts, "msg").await;
        assert_eq!(outcome.sms_sent, 0);
        assert_eq!(outcome.failures, 2);
        assert_eq!(outcome.calls_placed, 1);
    }
}
