//! Inbound user actions
//!
//! Front-ends (chat bot, CLI) translate button taps and commands into these
//! events. The daemon doesn't know about platform-specific details.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user action against their study session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Start studying a subject, optionally with a goal ("HH:MM" or hours)
    StartSession {
        subject: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        goal: Option<String>,
    },
    StartBreak,
    EndBreak,
    EndSession,
    /// Abandon the session without recording it
    CancelSession,
    /// Request an on-demand summary of the active session
    Status,
}

impl SessionEvent {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Self::StartSession { .. } => "start_session",
            Self::StartBreak => "start_break",
            Self::EndBreak => "end_break",
            Self::EndSession => "end_session",
            Self::CancelSession => "cancel_session",
            Self::Status => "status",
        }
    }
}

/// An event tagged with the acting user and when it happened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub user_id: String,
    /// When the action happened. Absent means "now" on the daemon's clock.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at: Option<DateTime<Utc>>,
    pub event: SessionEvent,
}

impl EventEnvelope {
    pub fn new(user_id: impl Into<String>, event: SessionEvent) -> Self {
        Self {
            user_id: user_id.into(),
            at: None,
            event,
        }
    }

    pub fn at(mut self, at: DateTime<Utc>) -> Self {
        self.at = Some(at);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_session_wire_format() {
        let json = r#"{"user_id":"42","event":{"type":"start_session","subject":"MATH","goal":"01:30"}}"#;
        let envelope: EventEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.user_id, "42");
        assert!(envelope.at.is_none());
        assert_eq!(
            envelope.event,
            SessionEvent::StartSession {
                subject: "MATH".into(),
                goal: Some("01:30".into()),
            }
        );
    }

    #[test]
    fn start_session_without_goal() {
        let json = r#"{"type":"start_session","subject":"BIO"}"#;
        let event: SessionEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            event,
            SessionEvent::StartSession {
                subject: "BIO".into(),
                goal: None,
            }
        );
    }

    #[test]
    fn timestamped_envelope() {
        let json = r#"{"user_id":"42","at":"2025-06-04T12:00:00Z","event":{"type":"end_break"}}"#;
        let envelope: EventEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(
            envelope.at,
            crate::time::parse_rfc3339_utc("2025-06-04T12:00:00Z")
        );
        assert_eq!(envelope.event, SessionEvent::EndBreak);
    }

    #[test]
    fn all_variants_parse() {
        let messages = [
            r#"{"type":"start_session","subject":"MATH"}"#,
            r#"{"type":"start_break"}"#,
            r#"{"type":"end_break"}"#,
            r#"{"type":"end_session"}"#,
            r#"{"type":"cancel_session"}"#,
            r#"{"type":"status"}"#,
        ];
        for json in messages {
            let event: SessionEvent = serde_json::from_str(json).unwrap();
            assert_eq!(serde_json::to_value(&event).unwrap()["type"], event.name());
        }
    }

    #[test]
    fn unknown_event_rejected() {
        assert!(serde_json::from_str::<SessionEvent>(r#"{"type":"launch"}"#).is_err());
    }
}
