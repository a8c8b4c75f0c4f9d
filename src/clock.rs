//! Derived time accounting for a session snapshot.
//!
//! Every function here is pure: it reads a [`StudySession`] plus the
//! instant to evaluate an open session at, and never mutates anything.
//! For an ended session `now` is ignored in favour of `end_time`.

use crate::session::StudySession;
use crate::time::whole_minutes;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;

/// Timezone summaries are presented in unless configured otherwise.
pub const DEFAULT_DISPLAY_TZ: Tz = chrono_tz::Asia::Manila;

/// Instant an open session is measured up to.
fn reference_instant(session: &StudySession, now: DateTime<Utc>) -> DateTime<Utc> {
    session.end_time.unwrap_or(now)
}

/// Closed breaks plus the currently open break (measured to `now`).
pub fn total_break_time(session: &StudySession, now: DateTime<Utc>) -> TimeDelta {
    let closed: TimeDelta = session.breaks.iter().map(|b| b.duration()).sum();
    let open = match (session.current_break_start, session.end_time) {
        (Some(start), None) => (now - start).max(TimeDelta::zero()),
        _ => TimeDelta::zero(),
    };
    (closed + open).max(TimeDelta::zero())
}

/// Elapsed session time minus break time, clamped at zero.
pub fn total_study_time(session: &StudySession, now: DateTime<Utc>) -> TimeDelta {
    let elapsed = reference_instant(session, now) - session.start_time;
    (elapsed - total_break_time(session, now)).max(TimeDelta::zero())
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Study:break ratio in whole minutes, reduced by their gcd.
///
/// `"M:0"` when no break minutes have accrued (including `"0:0"`).
pub fn study_break_ratio(session: &StudySession, now: DateTime<Utc>) -> String {
    ratio_from_minutes(
        whole_minutes(total_study_time(session, now)),
        whole_minutes(total_break_time(session, now)),
    )
}

pub(crate) fn ratio_from_minutes(study: u64, brk: u64) -> String {
    if brk == 0 {
        return format!("{study}:0");
    }
    let divisor = gcd(study, brk);
    format!("{}:{}", study / divisor, brk / divisor)
}

/// Percentage of the goal reached, floored and capped at 100.
///
/// Sessions without a goal, or whose goal is malformed or zero, report 0.
pub fn goal_progress_percentage(session: &StudySession, now: DateTime<Utc>) -> u8 {
    let Some(goal) = session.goal().filter(|g| g.is_positive()) else {
        return 0;
    };
    let study_secs = u64::try_from(total_study_time(session, now).num_seconds()).unwrap_or(0);
    let goal_secs = u64::from(goal.minutes()) * 60;
    let percent = study_secs.saturating_mul(100) / goal_secs;
    percent.min(100) as u8
}

/// A closed break projected into a display timezone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalBreak<TzT: TimeZone> {
    pub start: DateTime<TzT>,
    pub end: DateTime<TzT>,
}

/// Session timestamps projected into a display timezone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTimes<TzT: TimeZone> {
    pub start: DateTime<TzT>,
    pub end: Option<DateTime<TzT>>,
    pub breaks: Vec<LocalBreak<TzT>>,
}

/// Project start, end and every closed break into `tz`.
pub fn local_times<TzT: TimeZone>(session: &StudySession, tz: &TzT) -> LocalTimes<TzT> {
    LocalTimes {
        start: session.start_time.with_timezone(tz),
        end: session.end_time.map(|t| t.with_timezone(tz)),
        breaks: session
            .breaks
            .iter()
            .map(|b| LocalBreak {
                start: b.start.with_timezone(tz),
                end: b.end.with_timezone(tz),
            })
            .collect(),
    }
}

/// [`local_times`] in Asia/Manila.
pub fn manila_local_times(session: &StudySession) -> LocalTimes<Tz> {
    local_times(session, &DEFAULT_DISPLAY_TZ)
}

/// 12-hour wall-clock rendering, e.g. `"08:05 PM"`.
pub fn format_clock_time<TzT: TimeZone>(t: &DateTime<TzT>) -> String
where
    TzT::Offset: std::fmt::Display,
{
    t.format("%I:%M %p").to_string()
}
