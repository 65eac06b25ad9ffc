//! Match status transitions and the prediction lock window.
//!
//! Everything here is pure: callers load the match inside a transaction, run
//! [`transition`], then persist [`Transition::updated`] and carry out
//! [`Transition::rescore`] before committing.

use time::OffsetDateTime;

use super::repo_types::{Match, MatchStatus, NewMatch, Score};
use crate::error::{AppError, AppResult};

const MAX_TEAM_LEN: usize = 100;
const MAX_STADIUM_LEN: usize = 100;
const MAX_STAGE_LEN: usize = 50;

/// Predictions can no longer be created or edited once kickoff is reached,
/// whatever the stored status says.
pub fn is_locked(m: &Match, now: OffsetDateTime) -> bool {
    now >= m.match_date
}

/// Partial admin update. The outer `None` keeps the current value; for
/// nullable columns `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchChanges {
    pub home_team: Option<String>,
    pub away_team: Option<String>,
    pub home_score: Option<Option<i32>>,
    pub away_score: Option<Option<i32>>,
    pub match_date: Option<OffsetDateTime>,
    pub stadium: Option<Option<String>>,
    pub stage: Option<Option<String>>,
    pub status: Option<MatchStatus>,
}

/// What must happen to the match's predictions after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rescore {
    /// Match is finished with this result; (re)compute every prediction.
    Apply(Score),
    /// Match left `finished`; previously earned points no longer hold.
    Clear,
    /// Points are unaffected.
    Keep,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub updated: Match,
    pub rescore: Rescore,
}

fn check_text(field: &str, value: &str, max: usize) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::invalid(format!("{field} must not be empty")));
    }
    if value.chars().count() > max {
        return Err(AppError::invalid(format!("{field} is too long")));
    }
    Ok(())
}

fn check_optional_text(field: &str, value: Option<&str>, max: usize) -> AppResult<()> {
    match value {
        Some(v) if v.chars().count() > max => {
            Err(AppError::invalid(format!("{field} is too long")))
        }
        _ => Ok(()),
    }
}

/// Scores come in pairs, are never negative, and `finished` requires them.
fn check_result(
    status: MatchStatus,
    home: Option<i32>,
    away: Option<i32>,
) -> AppResult<Option<Score>> {
    let score = match (home, away) {
        (Some(h), Some(a)) => {
            if h < 0 || a < 0 {
                return Err(AppError::invalid("Scores must be non-negative"));
            }
            Some(Score::new(h, a))
        }
        (None, None) => None,
        _ => {
            return Err(AppError::invalid(
                "home_score and away_score must be set together",
            ))
        }
    };

    if status == MatchStatus::Finished && score.is_none() {
        return Err(AppError::invalid(
            "A finished match requires both home_score and away_score",
        ));
    }
    Ok(score)
}

/// Validates a match about to be created.
pub fn validate_new(m: &NewMatch) -> AppResult<()> {
    check_text("home_team", &m.home_team, MAX_TEAM_LEN)?;
    check_text("away_team", &m.away_team, MAX_TEAM_LEN)?;
    check_optional_text("stadium", m.stadium.as_deref(), MAX_STADIUM_LEN)?;
    check_optional_text("stage", m.stage.as_deref(), MAX_STAGE_LEN)?;
    check_result(m.status, m.score.map(|s| s.home), m.score.map(|s| s.away))?;
    Ok(())
}

/// Applies `changes` to `current`.
///
/// Fails with `InvalidInput` when the resulting state would be inconsistent,
/// leaving `current` untouched. Entering or staying in `finished` always
/// yields [`Rescore::Apply`]; recomputation is idempotent so repeated updates
/// of a finished match are harmless and pick up score corrections.
pub fn transition(current: &Match, changes: MatchChanges) -> AppResult<Transition> {
    let mut next = current.clone();

    if let Some(home_team) = changes.home_team {
        check_text("home_team", &home_team, MAX_TEAM_LEN)?;
        next.home_team = home_team;
    }
    if let Some(away_team) = changes.away_team {
        check_text("away_team", &away_team, MAX_TEAM_LEN)?;
        next.away_team = away_team;
    }
    if let Some(stadium) = changes.stadium {
        check_optional_text("stadium", stadium.as_deref(), MAX_STADIUM_LEN)?;
        next.stadium = stadium;
    }
    if let Some(stage) = changes.stage {
        check_optional_text("stage", stage.as_deref(), MAX_STAGE_LEN)?;
        next.stage = stage;
    }
    if let Some(match_date) = changes.match_date {
        next.match_date = match_date;
    }
    if let Some(home_score) = changes.home_score {
        next.home_score = home_score;
    }
    if let Some(away_score) = changes.away_score {
        next.away_score = away_score;
    }
    if let Some(status) = changes.status {
        next.status = status;
    }

    let score = check_result(next.status, next.home_score, next.away_score)?;

    let rescore = match (current.status, next.status, score) {
        (_, MatchStatus::Finished, Some(score)) => Rescore::Apply(score),
        (MatchStatus::Finished, _, _) => Rescore::Clear,
        _ => Rescore::Keep,
    };

    Ok(Transition {
        updated: next,
        rescore,
    })
}
