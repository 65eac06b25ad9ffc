use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{
    repo_types::Prediction,
    rules::{PredictionInput, PredictionPatch},
    scoring::{result_of, PredictionResult},
};
use crate::matches::repo_types::{Match, MatchStatus};

#[derive(Debug, Deserialize)]
pub struct CreatePredictionRequest {
    pub match_id: Uuid,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub comment: Option<String>,
    pub subject: Option<String>,
}

impl CreatePredictionRequest {
    pub fn split(self) -> (Uuid, PredictionInput) {
        (
            self.match_id,
            PredictionInput {
                home_score: self.home_score,
                away_score: self.away_score,
                comment: self.comment,
                subject: self.subject,
            },
        )
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePredictionRequest {
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub comment: Option<String>,
    pub subject: Option<String>,
}

impl From<UpdatePredictionRequest> for PredictionPatch {
    fn from(r: UpdatePredictionRequest) -> Self {
        Self {
            home_score: r.home_score,
            away_score: r.away_score,
            comment: r.comment,
            subject: r.subject,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListPredictionsQuery {
    pub match_status: Option<String>,
}

/// Denormalized match info embedded in each prediction.
#[derive(Debug, Serialize)]
pub struct MatchSummary {
    pub id: Uuid,
    pub home_team: String,
    pub away_team: String,
    #[serde(with = "time::serde::rfc3339")]
    pub match_date: OffsetDateTime,
    pub status: MatchStatus,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
}

impl From<&Match> for MatchSummary {
    fn from(m: &Match) -> Self {
        Self {
            id: m.id,
            home_team: m.home_team.clone(),
            away_team: m.away_team.clone(),
            match_date: m.match_date,
            status: m.status,
            home_score: m.home_score,
            away_score: m.away_score,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub match_id: Uuid,
    pub home_score: i32,
    pub away_score: i32,
    pub comment: Option<String>,
    pub subject: Option<String>,
    pub points_earned: Option<i32>,
    pub result: Option<PredictionResult>,
    pub result_label: Option<&'static str>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(rename = "match")]
    pub match_summary: MatchSummary,
}

impl PredictionResponse {
    pub fn new(p: Prediction, m: &Match, now: OffsetDateTime) -> Self {
        let result = result_of(&p, m, now);
        Self {
            id: p.id,
            user_id: p.user_id,
            match_id: p.match_id,
            home_score: p.home_score,
            away_score: p.away_score,
            comment: p.comment,
            subject: p.subject,
            points_earned: p.points_earned,
            result,
            result_label: result.map(|r| r.label()),
            created_at: p.created_at,
            updated_at: p.updated_at,
            match_summary: MatchSummary::from(m),
        }
    }
}
