//! Plain-text rendering of a session summary, as shown to the user when a
//! session ends or on a status request.

use crate::clock::{self, format_clock_time};
use crate::session::{Phase, StudySession};
use crate::summary::SessionSummary;
use crate::time::format_hours_minutes;
use chrono_tz::Tz;
use std::fmt::Write;

fn goal_line(summary: &SessionSummary, session: &StudySession) -> String {
    match (session.goal(), summary.goal.as_deref()) {
        (Some(goal), _) => format!(
            "Goal: {goal} ({}% reached)",
            summary.goal_progress_percentage
        ),
        (None, Some(raw)) => format!("Goal: {raw} (not recognized)"),
        (None, None) => "Goal: No goal set".to_string(),
    }
}

/// Multi-line report with times in `tz`.
pub fn render_summary(summary: &SessionSummary, tz: &Tz) -> String {
    let session = StudySession::from(summary);
    let local = clock::local_times(&session, tz);
    let mut out = String::new();

    let title = match session.phase() {
        Phase::Ended => "Study Session Summary",
        Phase::OnBreak => "Study Session (on break)",
        Phase::Studying => "Study Session (studying)",
    };
    let _ = writeln!(out, "{title}");
    let _ = writeln!(out, "Subject: {}", summary.subject);
    let _ = writeln!(out, "{}", goal_line(summary, &session));
    let _ = writeln!(out, "Started: {}", format_clock_time(&local.start));
    if let Some(end) = &local.end {
        let _ = writeln!(out, "Ended: {}", format_clock_time(end));
    }
    let _ = writeln!(
        out,
        "Total Study Time: {}",
        format_hours_minutes(summary.total_study_time())
    );
    let _ = writeln!(
        out,
        "Total Break Time: {}",
        format_hours_minutes(summary.total_break_time())
    );
    let _ = writeln!(out, "Study/Break Ratio: {}", summary.study_break_ratio);

    if !local.breaks.is_empty() {
        let _ = writeln!(out, "Break Details:");
        for b in &local.breaks {
            let _ = writeln!(
                out,
                "Break: {} - {}",
                format_clock_time(&b.start),
                format_clock_time(&b.end)
            );
        }
    }
    if let Some(start) = summary.current_break_start {
        let _ = writeln!(
            out,
            "On break since {}",
            format_clock_time(&start.with_timezone(tz))
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 4, 12, 0, 0).unwrap()
    }

    #[test]
    fn renders_final_summary_in_manila() {
        let mut s = StudySession::start("u1", "MATH", Some("01:00".into()), t0());
        s.start_break(t0() + TimeDelta::minutes(10)).unwrap();
        s.end_break(t0() + TimeDelta::minutes(20)).unwrap();
        let end = s.end(t0() + TimeDelta::minutes(70)).unwrap();
        let summary = SessionSummary::capture(&s, end);

        let text = render_summary(&summary, &clock::DEFAULT_DISPLAY_TZ);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Study Session Summary",
                "Subject: MATH",
                "Goal: 1h (100% reached)",
                "Started: 08:00 PM",
                "Ended: 09:10 PM",
                "Total Study Time: 1h 0m",
                "Total Break Time: 0h 10m",
                "Study/Break Ratio: 6:1",
                "Break Details:",
                "Break: 08:10 PM - 08:20 PM",
            ]
        );
    }

    #[test]
    fn renders_open_session_on_break() {
        let mut s = StudySession::start("u1", "BIO", Some("abc".into()), t0());
        s.start_break(t0() + TimeDelta::minutes(30)).unwrap();
        let summary = SessionSummary::capture(&s, t0() + TimeDelta::minutes(35));

        let text = render_summary(&summary, &chrono_tz::UTC);
        assert!(text.starts_with("Study Session (on break)\n"));
        assert!(text.contains("Goal: abc (not recognized)"));
        assert!(!text.contains("Ended:"));
        assert!(text.contains("On break since 12:30 PM"));
    }

    #[test]
    fn renders_missing_goal() {
        let s = StudySession::start("u1", "BIO", None, t0());
        let text = render_summary(&SessionSummary::capture(&s, t0()), &chrono_tz::UTC);
        assert!(text.contains("Goal: No goal set"));
    }
}
