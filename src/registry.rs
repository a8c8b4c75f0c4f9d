//! Session registry - tracks the active study session of every user
//!
//! Each user has at most one resident session. Every transition runs while
//! holding that user's map entry, so read-validate-write is one step and a
//! concurrent `get` never sees a half-applied transition. Distinct users live
//! in different shards and proceed independently.

use crate::event::{EventEnvelope, SessionEvent};
use crate::goal::Goal;
use crate::session::{SessionError, StudySession};
use crate::summary::SessionSummary;
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Source of "now" for transitions without an explicit timestamp
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock, for replaying recorded events and for tests.
/// Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = at;
    }

    pub fn advance(&self, by: TimeDelta) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Result of applying an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "summary", rename_all = "snake_case")]
pub enum Outcome {
    Started(SessionSummary),
    BreakStarted(SessionSummary),
    BreakEnded(SessionSummary),
    /// Final summary; the session is no longer resident
    Ended(SessionSummary),
    Cancelled,
    Status(SessionSummary),
}

impl Outcome {
    pub fn summary(&self) -> Option<&SessionSummary> {
        match self {
            Self::Started(s)
            | Self::BreakStarted(s)
            | Self::BreakEnded(s)
            | Self::Ended(s)
            | Self::Status(s) => Some(s),
            Self::Cancelled => None,
        }
    }
}

/// Registry of active study sessions, keyed by user id
#[derive(Debug)]
pub struct SessionRegistry<C: Clock = SystemClock> {
    sessions: DashMap<String, StudySession>,
    clock: C,
}

impl Default for SessionRegistry<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl<C: Clock> SessionRegistry<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            sessions: DashMap::new(),
            clock,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Start a session for `user_id`.
    ///
    /// A malformed goal does not reject the start; progress is then reported as 0.
    pub fn start(
        &self,
        user_id: &str,
        subject: &str,
        goal: Option<String>,
    ) -> Result<SessionSummary, SessionError> {
        self.start_at(user_id, subject, goal, self.now())
    }

    pub fn start_break(&self, user_id: &str) -> Result<SessionSummary, SessionError> {
        self.start_break_at(user_id, self.now())
    }

    pub fn end_break(&self, user_id: &str) -> Result<SessionSummary, SessionError> {
        self.end_break_at(user_id, self.now())
    }

    /// End the session and remove it, returning the final summary.
    pub fn end(&self, user_id: &str) -> Result<SessionSummary, SessionError> {
        self.end_at(user_id, self.now())
    }

    /// On-demand summary of the active session, evaluated now.
    pub fn summary(&self, user_id: &str) -> Result<SessionSummary, SessionError> {
        self.summary_at(user_id, self.now())
    }

    /// Snapshot of the active session, if any
    pub fn get(&self, user_id: &str) -> Option<StudySession> {
        self.sessions.get(user_id).map(|s| s.value().clone())
    }

    /// Discard the active session without producing a summary.
    pub fn cancel(&self, user_id: &str) -> Result<(), SessionError> {
        match self.sessions.remove(user_id) {
            Some(_) => {
                info!(%user_id, "session cancelled");
                debug!("{} active session(s)", self.sessions.len());
                Ok(())
            }
            None => Err(SessionError::NoActiveSession),
        }
    }

    /// Apply an inbound event. Events without a timestamp use the registry clock.
    pub fn apply(&self, envelope: EventEnvelope) -> Result<Outcome, SessionError> {
        let EventEnvelope { user_id, at, event } = envelope;
        let now = at.unwrap_or_else(|| self.now());
        debug!(%user_id, event = event.name(), "apply");

        let result = match event {
            SessionEvent::StartSession { subject, goal } => self
                .start_at(&user_id, &subject, goal, now)
                .map(Outcome::Started),
            SessionEvent::StartBreak => self
                .start_break_at(&user_id, now)
                .map(Outcome::BreakStarted),
            SessionEvent::EndBreak => self.end_break_at(&user_id, now).map(Outcome::BreakEnded),
            SessionEvent::EndSession => self.end_at(&user_id, now).map(Outcome::Ended),
            SessionEvent::CancelSession => self.cancel(&user_id).map(|()| Outcome::Cancelled),
            SessionEvent::Status => self.summary_at(&user_id, now).map(Outcome::Status),
        };

        if let Err(e) = &result {
            debug!(%user_id, kind = e.kind(), "event rejected: {e}");
        }
        result
    }

    pub fn start_at(
        &self,
        user_id: &str,
        subject: &str,
        goal: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<SessionSummary, SessionError> {
        match self.sessions.entry(user_id.to_string()) {
            Entry::Occupied(_) => Err(SessionError::AlreadyActive),
            Entry::Vacant(slot) => {
                if let Some(goal) = goal.as_deref()
                    && !goal.trim().is_empty()
                    && let Err(e) = goal.parse::<Goal>()
                {
                    warn!(%user_id, "{e}; tracking without a goal");
                }
                let session = StudySession::start(user_id, subject, goal, now);
                let summary = SessionSummary::capture(&session, now);
                slot.insert(session);
                info!(%user_id, %subject, "session started");
                debug!("{} active session(s)", self.sessions.len());
                Ok(summary)
            }
        }
    }

    pub fn start_break_at(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<SessionSummary, SessionError> {
        let summary = self.update(user_id, now, |session| session.start_break(now).map(drop))?;
        info!(%user_id, "break started");
        Ok(summary)
    }

    pub fn end_break_at(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<SessionSummary, SessionError> {
        let summary = self.update(user_id, now, |session| session.end_break(now).map(drop))?;
        info!(%user_id, "break ended");
        Ok(summary)
    }

    pub fn end_at(&self, user_id: &str, now: DateTime<Utc>) -> Result<SessionSummary, SessionError> {
        let summary = match self.sessions.entry(user_id.to_string()) {
            Entry::Vacant(_) => return Err(SessionError::NoActiveSession),
            Entry::Occupied(mut slot) => {
                let ended_at = slot.get_mut().end(now)?;
                let summary = SessionSummary::capture(slot.get(), ended_at);
                slot.remove();
                summary
            }
        };
        info!(
            %user_id,
            subject = %summary.subject,
            study_secs = summary.total_study_secs,
            break_secs = summary.total_break_secs,
            "session ended"
        );
        debug!("{} active session(s)", self.sessions.len());
        Ok(summary)
    }

    pub fn summary_at(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<SessionSummary, SessionError> {
        self.sessions
            .get(user_id)
            .map(|s| SessionSummary::capture(s.value(), now.max(s.latest_instant())))
            .ok_or(SessionError::NoActiveSession)
    }

    /// Run a guarded transition on the user's session while holding its entry.
    fn update<F>(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        transition: F,
    ) -> Result<SessionSummary, SessionError>
    where
        F: FnOnce(&mut StudySession) -> Result<(), SessionError>,
    {
        let mut session = self
            .sessions
            .get_mut(user_id)
            .ok_or(SessionError::NoActiveSession)?;
        transition(session.value_mut())?;
        let at = now.max(session.latest_instant());
        Ok(SessionSummary::capture(session.value(), at))
    }

    /// Get active session count
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Check if a user has an active session
    pub fn has_session(&self, user_id: &str) -> bool {
        self.sessions.contains_key(user_id)
    }
}
