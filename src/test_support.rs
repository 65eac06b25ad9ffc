//! Seed data for the `#[sqlx::test]` cases.

use sqlx::PgPool;
use time::OffsetDateTime;

use crate::{
    auth::repo_types::User,
    matches::{
        lifecycle::MatchChanges,
        repo as match_repo,
        repo_types::{Match, MatchStatus, NewMatch},
    },
    predictions::rules::PredictionInput,
};

pub async fn seed_user(db: &PgPool, username: &str, is_admin: bool) -> User {
    User::create(
        db,
        username,
        &format!("{username}@example.com"),
        "unused-hash",
        is_admin,
    )
    .await
    .expect("seed user")
}

pub async fn seed_match(db: &PgPool, kickoff: OffsetDateTime) -> Match {
    match_repo::insert(
        db,
        &NewMatch {
            home_team: "Real Madrid".into(),
            away_team: "Liverpool".into(),
            match_date: kickoff,
            stadium: Some("Santiago Bernabeu".into()),
            stage: Some("Quarter-final".into()),
            status: MatchStatus::Scheduled,
            score: None,
        },
    )
    .await
    .expect("seed match")
}

pub fn guess(home: i32, away: i32) -> PredictionInput {
    PredictionInput {
        home_score: Some(home),
        away_score: Some(away),
        ..Default::default()
    }
}

pub fn finish(home: i32, away: i32) -> MatchChanges {
    MatchChanges {
        status: Some(MatchStatus::Finished),
        home_score: Some(Some(home)),
        away_score: Some(Some(away)),
        ..Default::default()
    }
}
