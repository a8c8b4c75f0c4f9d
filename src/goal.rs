//! Study goal parsing.
//!
//! Goals are entered either as `"HH:MM"` (e.g. `"01:30"`) or as a whole
//! number of hours (e.g. `"2"`, as sent by the preset goal buttons).

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GoalError {
    #[error("malformed goal {0:?}: expected HH:MM or whole hours")]
    Malformed(String),
}

/// A parsed study goal, stored as total minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Goal {
    minutes: u32,
}

impl Goal {
    pub fn from_minutes(minutes: u32) -> Self {
        Self { minutes }
    }

    pub fn minutes(&self) -> u32 {
        self.minutes
    }

    /// A zero-length goal cannot be used as a progress denominator.
    pub fn is_positive(&self) -> bool {
        self.minutes > 0
    }
}

impl FromStr for Goal {
    type Err = GoalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let malformed = || GoalError::Malformed(s.to_string());

        if let Some((hours, minutes)) = input.split_once(':') {
            let hours: u32 = hours.trim().parse().map_err(|_| malformed())?;
            let minutes: u32 = minutes.trim().parse().map_err(|_| malformed())?;
            if minutes >= 60 {
                return Err(malformed());
            }
            let total = hours
                .checked_mul(60)
                .and_then(|h| h.checked_add(minutes))
                .ok_or_else(malformed)?;
            return Ok(Self::from_minutes(total));
        }

        let hours: u32 = input.parse().map_err(|_| malformed())?;
        hours
            .checked_mul(60)
            .map(Self::from_minutes)
            .ok_or_else(malformed)
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (hours, minutes) = (self.minutes / 60, self.minutes % 60);
        if minutes == 0 {
            write!(f, "{hours}h")
        } else {
            write!(f, "{hours}h {minutes}m")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hhmm() {
        assert_eq!("01:30".parse::<Goal>().unwrap().minutes(), 90);
        assert_eq!("00:45".parse::<Goal>().unwrap().minutes(), 45);
        assert_eq!(" 10:00 ".parse::<Goal>().unwrap().minutes(), 600);
    }

    #[test]
    fn parse_whole_hours() {
        assert_eq!("1".parse::<Goal>().unwrap().minutes(), 60);
        assert_eq!("6".parse::<Goal>().unwrap().minutes(), 360);
    }

    #[test]
    fn rejects_garbage() {
        for input in ["abc", "", "1.5", "-1", "01:60", "01:-5", "1:2:3", ":30", "01:"] {
            assert!(
                matches!(input.parse::<Goal>(), Err(GoalError::Malformed(_))),
                "expected {input:?} to be rejected"
            );
        }
    }

    #[test]
    fn zero_goal_parses_but_is_not_positive() {
        let goal: Goal = "00:00".parse().unwrap();
        assert!(!goal.is_positive());
        assert!(!"0".parse::<Goal>().unwrap().is_positive());
    }

    #[test]
    fn display() {
        assert_eq!(Goal::from_minutes(120).to_string(), "2h");
        assert_eq!(Goal::from_minutes(90).to_string(), "1h 30m");
    }
}
