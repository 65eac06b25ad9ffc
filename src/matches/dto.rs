use serde::{Deserialize, Deserializer, Serialize};
use time::{
    format_description::well_known::Rfc3339, macros::format_description, OffsetDateTime,
    PrimitiveDateTime,
};
use uuid::Uuid;

use super::{
    lifecycle::MatchChanges,
    repo::MatchFilter,
    repo_types::{Match, MatchStatus, NewMatch, Period, Score},
};
use crate::error::{AppError, AppResult};

/// Parses RFC 3339, or a naive `YYYY-MM-DDTHH:MM[:SS]` taken as UTC.
pub fn parse_datetime(raw: &str) -> AppResult<OffsetDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(dt);
    }
    let with_seconds = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    let without_seconds = format_description!("[year]-[month]-[day]T[hour]:[minute]");
    PrimitiveDateTime::parse(raw, with_seconds)
        .or_else(|_| PrimitiveDateTime::parse(raw, without_seconds))
        .map(PrimitiveDateTime::assume_utc)
        .map_err(|_| AppError::invalid(format!("Invalid date format: {raw}")))
}

#[derive(Debug, Deserialize)]
pub struct CreateMatchRequest {
    pub home_team: String,
    pub away_team: String,
    pub match_date: String,
    pub stadium: Option<String>,
    pub stage: Option<String>,
    pub status: Option<String>,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
}

impl CreateMatchRequest {
    pub fn into_new_match(self) -> AppResult<NewMatch> {
        let status = match self.status.as_deref() {
            Some(s) => s.parse::<MatchStatus>()?,
            None => MatchStatus::Scheduled,
        };
        let score = match (self.home_score, self.away_score) {
            (Some(h), Some(a)) if h >= 0 && a >= 0 => Some(Score::new(h, a)),
            (None, None) => None,
            (Some(_), Some(_)) => return Err(AppError::invalid("Scores must be non-negative")),
            _ => {
                return Err(AppError::invalid(
                    "home_score and away_score must be set together",
                ))
            }
        };
        Ok(NewMatch {
            home_team: self.home_team.trim().to_string(),
            away_team: self.away_team.trim().to_string(),
            match_date: parse_datetime(&self.match_date)?,
            stadium: self.stadium,
            stage: self.stage,
            status,
            score,
        })
    }
}

/// Tells an explicit `null` (`Some(None)`) apart from an absent field (`None`).
fn nullable<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateMatchRequest {
    pub home_team: Option<String>,
    pub away_team: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub home_score: Option<Option<i32>>,
    #[serde(default, deserialize_with = "nullable")]
    pub away_score: Option<Option<i32>>,
    pub match_date: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub stadium: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub stage: Option<Option<String>>,
    pub status: Option<String>,
}

impl UpdateMatchRequest {
    pub fn into_changes(self) -> AppResult<MatchChanges> {
        Ok(MatchChanges {
            home_team: self.home_team.map(|t| t.trim().to_string()),
            away_team: self.away_team.map(|t| t.trim().to_string()),
            home_score: self.home_score,
            away_score: self.away_score,
            match_date: self.match_date.as_deref().map(parse_datetime).transpose()?,
            stadium: self.stadium,
            stage: self.stage,
            status: self
                .status
                .as_deref()
                .map(str::parse::<MatchStatus>)
                .transpose()?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListMatchesQuery {
    pub status: Option<String>,
    pub team: Option<String>,
    pub from_date: Option<String>,
    pub to_date: Option<String>,
}

impl ListMatchesQuery {
    pub fn into_filter(self) -> AppResult<MatchFilter> {
        Ok(MatchFilter {
            period: self
                .status
                .as_deref()
                .filter(|s| !s.is_empty())
                .map(str::parse::<Period>)
                .transpose()?,
            team: self.team.map(|t| t.trim().to_string()),
            from: self.from_date.as_deref().map(parse_datetime).transpose()?,
            to: self.to_date.as_deref().map(parse_datetime).transpose()?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct MatchResponse {
    pub id: Uuid,
    pub home_team: String,
    pub away_team: String,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    #[serde(with = "time::serde::rfc3339")]
    pub match_date: OffsetDateTime,
    pub stadium: Option<String>,
    pub stage: Option<String>,
    pub status: MatchStatus,
    pub is_past: bool,
    pub is_upcoming: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl MatchResponse {
    pub fn new(m: Match, now: OffsetDateTime) -> Self {
        Self {
            is_past: m.is_past(now),
            is_upcoming: m.is_upcoming(now),
            id: m.id,
            home_team: m.home_team,
            away_team: m.away_team,
            home_score: m.home_score,
            away_score: m.away_score,
            match_date: m.match_date,
            stadium: m.stadium,
            stage: m.stage,
            status: m.status,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}
