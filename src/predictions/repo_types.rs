use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::matches::repo_types::Score;

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Prediction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub match_id: Uuid,
    pub home_score: i32,
    pub away_score: i32,
    pub comment: Option<String>,
    pub subject: Option<String>,
    /// Stays `NULL` until the match is finished with a full score.
    pub points_earned: Option<i32>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Prediction {
    pub fn score(&self) -> Score {
        Score::new(self.home_score, self.away_score)
    }
}

/// Validated fields for a new prediction row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPrediction {
    pub user_id: Uuid,
    pub match_id: Uuid,
    pub score: Score,
    pub comment: Option<String>,
    pub subject: Option<String>,
}
