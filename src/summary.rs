//! Read-only session summaries handed to rendering and storage.

use crate::clock;
use crate::session::{BreakInterval, Phase, StudySession};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of a session combined with its derived values.
///
/// Produced when a session ends (final) or on demand for an open session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub user_id: String,
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
    pub start_time: DateTime<Utc>,
    /// `None` while the session is still open
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub break_intervals: Vec<BreakInterval>,
    /// Start of the break in progress, for on-demand summaries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_break_start: Option<DateTime<Utc>>,
    pub total_study_secs: i64,
    pub total_break_secs: i64,
    pub study_break_ratio: String,
    pub goal_progress_percentage: u8,
}

impl SessionSummary {
    /// Evaluate every derived value of `session` at `now`.
    pub fn capture(session: &StudySession, now: DateTime<Utc>) -> Self {
        Self {
            user_id: session.user_id.clone(),
            subject: session.subject.clone(),
            goal: session.goal.clone(),
            start_time: session.start_time,
            end_time: session.end_time,
            break_intervals: session.breaks.clone(),
            current_break_start: session.current_break_start,
            total_study_secs: clock::total_study_time(session, now).num_seconds(),
            total_break_secs: clock::total_break_time(session, now).num_seconds(),
            study_break_ratio: clock::study_break_ratio(session, now),
            goal_progress_percentage: clock::goal_progress_percentage(session, now),
        }
    }

    pub fn total_study_time(&self) -> TimeDelta {
        TimeDelta::seconds(self.total_study_secs)
    }

    pub fn total_break_time(&self) -> TimeDelta {
        TimeDelta::seconds(self.total_break_secs)
    }

    pub fn phase(&self) -> Phase {
        StudySession::from(self).phase()
    }

    pub fn is_final(&self) -> bool {
        self.end_time.is_some()
    }
}

/// Rebuild a read-only session view so derived values can be recomputed.
impl From<&SessionSummary> for StudySession {
    fn from(summary: &SessionSummary) -> Self {
        Self {
            user_id: summary.user_id.clone(),
            subject: summary.subject.clone(),
            goal: summary.goal.clone(),
            start_time: summary.start_time,
            end_time: summary.end_time,
            breaks: summary.break_intervals.clone(),
            current_break_start: summary.current_break_start,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 4, 12, 0, 0).unwrap()
    }

    fn mins(n: i64) -> TimeDelta {
        TimeDelta::minutes(n)
    }

    #[test]
    fn capture_final_summary() {
        let mut s = StudySession::start("u1", "MATH", Some("01:00".into()), t0());
        s.start_break(t0() + mins(10)).unwrap();
        s.end_break(t0() + mins(20)).unwrap();
        s.end(t0() + mins(70)).unwrap();

        let summary = SessionSummary::capture(&s, t0() + mins(70));
        assert!(summary.is_final());
        assert_eq!(summary.phase(), Phase::Ended);
        assert_eq!(summary.total_study_time(), mins(60));
        assert_eq!(summary.total_break_time(), mins(10));
        assert_eq!(summary.study_break_ratio, "6:1");
        assert_eq!(summary.goal_progress_percentage, 100);
        assert_eq!(summary.break_intervals.len(), 1);
    }

    #[test]
    fn serialized_summary_recomputes_identically() {
        let mut s = StudySession::start("u1", "BIO", Some("2".into()), t0());
        s.start_break(t0() + mins(25)).unwrap();
        s.end_break(t0() + mins(32)).unwrap();
        s.start_break(t0() + mins(61)).unwrap();
        s.end(t0() + mins(75)).unwrap();
        let summary = SessionSummary::capture(&s, t0() + mins(75));

        let json = serde_json::to_string(&summary).unwrap();
        let parsed: SessionSummary = serde_json::from_str(&json).unwrap();
        let view = StudySession::from(&parsed);

        let later = t0() + mins(999);
        assert_eq!(SessionSummary::capture(&view, later), summary);
    }

    #[test]
    fn open_summary_keeps_current_break() {
        let mut s = StudySession::start("u1", "BIO", None, t0());
        s.start_break(t0() + mins(5)).unwrap();
        let summary = SessionSummary::capture(&s, t0() + mins(8));

        assert!(!summary.is_final());
        assert_eq!(summary.phase(), Phase::OnBreak);
        assert_eq!(summary.total_break_time(), mins(3));
        assert_eq!(summary.total_study_time(), mins(5));
    }

    #[test]
    fn goal_omitted_from_json_when_absent() {
        let s = StudySession::start("u1", "BIO", None, t0());
        let json = serde_json::to_string(&SessionSummary::capture(&s, t0())).unwrap();
        assert!(!json.contains("\"goal\""));
        assert!(json.contains("\"end_time\":null"));
    }
}
