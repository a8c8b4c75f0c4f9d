//! Study session state and lifecycle transitions
//!
//! A session moves `Studying -> OnBreak -> Studying -> ... -> Ended`.
//! "Not started" is represented by the absence of a session; the registry
//! never keeps an ended session resident.

use crate::goal::Goal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A closed break within a session. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl BreakInterval {
    pub fn duration(&self) -> chrono::TimeDelta {
        self.end - self.start
    }
}

/// Lifecycle phase of a resident or finished session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Studying,
    OnBreak,
    Ended,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Studying => "studying",
            Self::OnBreak => "on break",
            Self::Ended => "ended",
        })
    }
}

/// A user-triggered transition, used in error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    StartBreak,
    EndBreak,
    End,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::StartBreak => "start a break",
            Self::EndBreak => "end a break",
            Self::End => "end the session",
        })
    }
}

/// Recoverable lifecycle outcomes. None of these corrupt state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("no active study session")]
    NoActiveSession,
    #[error("cannot {action} while {from}")]
    InvalidTransition { from: Phase, action: Action },
    #[error("a study session is already active")]
    AlreadyActive,
}

impl SessionError {
    /// Stable machine-readable kind, used on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoActiveSession => "no_active_session",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::AlreadyActive => "already_active",
        }
    }
}

/// One user's study session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudySession {
    pub(crate) user_id: String,
    pub(crate) subject: String,
    pub(crate) goal: Option<String>,
    pub(crate) start_time: DateTime<Utc>,
    pub(crate) end_time: Option<DateTime<Utc>>,
    pub(crate) breaks: Vec<BreakInterval>,
    pub(crate) current_break_start: Option<DateTime<Utc>>,
}

impl StudySession {
    /// Begin a new session in the `Studying` phase.
    ///
    /// A blank goal is treated as no goal.
    pub fn start(
        user_id: impl Into<String>,
        subject: impl Into<String>,
        goal: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            subject: subject.into(),
            goal: goal.filter(|g| !g.trim().is_empty()),
            start_time: now,
            end_time: None,
            breaks: Vec::new(),
            current_break_start: None,
        }
    }

    pub fn phase(&self) -> Phase {
        if self.end_time.is_some() {
            Phase::Ended
        } else if self.current_break_start.is_some() {
            Phase::OnBreak
        } else {
            Phase::Studying
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// The goal exactly as entered.
    pub fn goal_text(&self) -> Option<&str> {
        self.goal.as_deref()
    }

    /// The parsed goal, or `None` if absent or malformed.
    pub fn goal(&self) -> Option<Goal> {
        self.goal.as_deref().and_then(|g| g.parse().ok())
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    pub fn breaks(&self) -> &[BreakInterval] {
        &self.breaks
    }

    pub fn current_break_start(&self) -> Option<DateTime<Utc>> {
        self.current_break_start
    }

    /// Latest instant recorded in this session.
    pub(crate) fn latest_instant(&self) -> DateTime<Utc> {
        self.end_time
            .or(self.current_break_start)
            .or_else(|| self.breaks.last().map(|b| b.end))
            .unwrap_or(self.start_time)
    }

    /// Never let a new timestamp precede one already recorded.
    fn monotonic(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.max(self.latest_instant())
    }

    /// Enter `OnBreak`. Returns the recorded break start.
    pub fn start_break(&mut self, now: DateTime<Utc>) -> Result<DateTime<Utc>, SessionError> {
        match self.phase() {
            Phase::Studying => {
                let at = self.monotonic(now);
                self.current_break_start = Some(at);
                Ok(at)
            }
            from => Err(SessionError::InvalidTransition {
                from,
                action: Action::StartBreak,
            }),
        }
    }

    /// Close the open break and return to `Studying`.
    pub fn end_break(&mut self, now: DateTime<Utc>) -> Result<BreakInterval, SessionError> {
        match (self.phase(), self.current_break_start) {
            (Phase::OnBreak, Some(start)) => {
                let interval = BreakInterval {
                    start,
                    end: self.monotonic(now),
                };
                self.breaks.push(interval);
                self.current_break_start = None;
                Ok(interval)
            }
            (from, _) => Err(SessionError::InvalidTransition {
                from,
                action: Action::EndBreak,
            }),
        }
    }

    /// Finish the session. An open break is closed at the same instant as
    /// `end_time`. Returns the recorded end time.
    pub fn end(&mut self, now: DateTime<Utc>) -> Result<DateTime<Utc>, SessionError> {
        match self.phase() {
            Phase::Ended => Err(SessionError::InvalidTransition {
                from: Phase::Ended,
                action: Action::End,
            }),
            phase => {
                let at = self.monotonic(now);
                if phase == Phase::OnBreak {
                    self.end_break(at)?;
                }
                self.end_time = Some(at);
                Ok(at)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 4, 12, 0, 0).unwrap()
    }

    fn mins(n: i64) -> TimeDelta {
        TimeDelta::minutes(n)
    }

    #[test]
    fn start_enters_studying() {
        let s = StudySession::start("u1", "MATH", Some("01:00".into()), t0());
        assert_eq!(s.phase(), Phase::Studying);
        assert_eq!(s.subject(), "MATH");
        assert_eq!(s.goal_text(), Some("01:00"));
        assert_eq!(s.goal().map(|g| g.minutes()), Some(60));
        assert_eq!(s.start_time(), t0());
        assert!(s.end_time().is_none());
        assert!(s.breaks().is_empty());
    }

    #[test]
    fn blank_goal_is_no_goal() {
        let s = StudySession::start("u1", "MATH", Some("  ".into()), t0());
        assert!(s.goal_text().is_none());
    }

    #[test]
    fn malformed_goal_is_kept_but_unparsed() {
        let s = StudySession::start("u1", "MATH", Some("abc".into()), t0());
        assert_eq!(s.goal_text(), Some("abc"));
        assert!(s.goal().is_none());
    }

    #[test]
    fn break_cycle() {
        let mut s = StudySession::start("u1", "MATH", None, t0());
        s.start_break(t0() + mins(10)).unwrap();
        assert_eq!(s.phase(), Phase::OnBreak);
        assert_eq!(s.current_break_start(), Some(t0() + mins(10)));

        let interval = s.end_break(t0() + mins(20)).unwrap();
        assert_eq!(interval.duration(), mins(10));
        assert_eq!(s.phase(), Phase::Studying);
        assert!(s.current_break_start().is_none());
        assert_eq!(s.breaks(), &[interval]);
    }

    #[test]
    fn double_start_break_is_invalid_and_leaves_state() {
        let mut s = StudySession::start("u1", "MATH", None, t0());
        s.start_break(t0() + mins(10)).unwrap();
        let before = s.clone();

        let err = s.start_break(t0() + mins(11)).unwrap_err();
        assert_eq!(
            err,
            SessionError::InvalidTransition {
                from: Phase::OnBreak,
                action: Action::StartBreak
            }
        );
        assert_eq!(s, before);
    }

    #[test]
    fn end_break_while_studying_is_invalid() {
        let mut s = StudySession::start("u1", "MATH", None, t0());
        let err = s.end_break(t0() + mins(5)).unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidTransition {
                from: Phase::Studying,
                ..
            }
        ));
        assert!(s.breaks().is_empty());
    }

    #[test]
    fn end_while_on_break_closes_break_at_end_time() {
        let mut s = StudySession::start("u1", "MATH", None, t0());
        s.start_break(t0() + mins(30)).unwrap();
        let end = s.end(t0() + mins(45)).unwrap();

        assert_eq!(s.phase(), Phase::Ended);
        assert_eq!(s.breaks().len(), 1);
        assert_eq!(s.breaks()[0].end, end);
        assert!(s.current_break_start().is_none());
    }

    #[test]
    fn ended_session_rejects_mutation() {
        let mut s = StudySession::start("u1", "MATH", None, t0());
        s.end(t0() + mins(5)).unwrap();
        let before = s.clone();

        assert!(s.start_break(t0() + mins(6)).is_err());
        assert!(s.end_break(t0() + mins(6)).is_err());
        assert!(s.end(t0() + mins(6)).is_err());
        assert_eq!(s, before);
    }

    #[test]
    fn skewed_timestamps_are_clamped_forward() {
        let mut s = StudySession::start("u1", "MATH", None, t0());
        let at = s.start_break(t0() - mins(5)).unwrap();
        assert_eq!(at, t0());

        let interval = s.end_break(t0() - mins(1)).unwrap();
        assert_eq!(interval.start, t0());
        assert_eq!(interval.end, t0());

        let end = s.end(t0() - mins(10)).unwrap();
        assert_eq!(end, t0());
    }

    #[test]
    fn error_kinds_and_messages() {
        let err = SessionError::InvalidTransition {
            from: Phase::OnBreak,
            action: Action::StartBreak,
        };
        assert_eq!(err.kind(), "invalid_transition");
        assert_eq!(err.to_string(), "cannot start a break while on break");
        assert_eq!(SessionError::NoActiveSession.kind(), "no_active_session");
        assert_eq!(SessionError::AlreadyActive.kind(), "already_active");
    }

    #[test]
    fn phase_serialization() {
        assert_eq!(
            serde_json::to_string(&Phase::OnBreak).unwrap(),
            "\"on_break\""
        );
    }
}
