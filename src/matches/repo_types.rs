use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "match_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Scheduled,
    Live,
    Finished,
    Postponed,
    Canceled,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Scheduled => "scheduled",
            MatchStatus::Live => "live",
            MatchStatus::Finished => "finished",
            MatchStatus::Postponed => "postponed",
            MatchStatus::Canceled => "canceled",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(MatchStatus::Scheduled),
            "live" => Ok(MatchStatus::Live),
            "finished" => Ok(MatchStatus::Finished),
            "postponed" => Ok(MatchStatus::Postponed),
            "canceled" => Ok(MatchStatus::Canceled),
            other => Err(AppError::invalid(format!("Invalid match status: {other}"))),
        }
    }
}

/// Home/away goal pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub home: i32,
    pub away: i32,
}

impl Score {
    pub fn new(home: i32, away: i32) -> Self {
        Self { home, away }
    }
}

/// `past` / `upcoming` filter shared by match and prediction listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Past,
    Upcoming,
}

impl FromStr for Period {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "past" => Ok(Period::Past),
            "upcoming" => Ok(Period::Upcoming),
            other => Err(AppError::invalid(format!("Invalid status filter: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Match {
    pub id: Uuid,
    pub home_team: String,
    pub away_team: String,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub match_date: OffsetDateTime,
    pub stadium: Option<String>,
    pub stage: Option<String>,
    pub status: MatchStatus,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Match {
    /// Both scores, or `None` while the result is incomplete.
    pub fn final_score(&self) -> Option<Score> {
        match (self.home_score, self.away_score) {
            (Some(home), Some(away)) => Some(Score { home, away }),
            _ => None,
        }
    }

    pub fn is_past(&self, now: OffsetDateTime) -> bool {
        self.match_date < now || self.status == MatchStatus::Finished
    }

    pub fn is_upcoming(&self, now: OffsetDateTime) -> bool {
        self.match_date > now
            && matches!(self.status, MatchStatus::Scheduled | MatchStatus::Postponed)
    }
}

/// Validated fields for a new match row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMatch {
    pub home_team: String,
    pub away_team: String,
    pub match_date: OffsetDateTime,
    pub stadium: Option<String>,
    pub stage: Option<String>,
    pub status: MatchStatus,
    pub score: Option<Score>,
}


#[cfg(test)]
mod tests {
    use super::fixtures::fixture;
    use super::*;
    use time::{macros::datetime, Duration};

    const NOW: OffsetDateTime = datetime!(2025-04-15 18:00 UTC);

    #[test]
    fn status_parses_only_known_values() {
        assert_eq!("finished".parse::<MatchStatus>().unwrap(), MatchStatus::Finished);
        assert_eq!("canceled".parse::<MatchStatus>().unwrap(), MatchStatus::Canceled);
        assert!(matches!(
            "abandoned".parse::<MatchStatus>(),
            Err(AppError::InvalidInput(_))
        ));
        assert!("Finished".parse::<MatchStatus>().is_err());
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(serde_json::to_value(MatchStatus::Postponed).unwrap(), "postponed");
    }

    #[test]
    fn finished_match_is_past_even_before_kickoff() {
        let m = fixture(NOW + Duration::hours(2), MatchStatus::Finished);
        assert!(m.is_past(NOW));
        assert!(!m.is_upcoming(NOW));
    }

    #[test]
    fn kickoff_in_past_is_past_regardless_of_status() {
        let m = fixture(NOW - Duration::minutes(1), MatchStatus::Scheduled);
        assert!(m.is_past(NOW));
        assert!(!m.is_upcoming(NOW));
    }

    #[test]
    fn upcoming_requires_scheduled_or_postponed() {
        let later = NOW + Duration::days(1);
        assert!(fixture(later, MatchStatus::Scheduled).is_upcoming(NOW));
        assert!(fixture(later, MatchStatus::Postponed).is_upcoming(NOW));
        assert!(!fixture(later, MatchStatus::Live).is_upcoming(NOW));
        assert!(!fixture(later, MatchStatus::Canceled).is_upcoming(NOW));
    }

    #[test]
    fn final_score_needs_both_sides() {
        let mut m = fixture(NOW, MatchStatus::Live);
        m.home_score = Some(1);
        assert_eq!(m.final_score(), None);
        m.away_score = Some(0);
        assert_eq!(m.final_score(), Some(Score::new(1, 0)));
    }

    #[test]
    fn period_filter_parses() {
        assert_eq!("past".parse::<Period>().unwrap(), Period::Past);
        assert_eq!("upcoming".parse::<Period>().unwrap(), Period::Upcoming);
        assert!("soon".parse::<Period>().is_err());
    }
}
