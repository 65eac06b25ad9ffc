use sqlx::PgPool;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    lifecycle::{self, MatchChanges},
    repo::{self, MatchFilter},
    repo_types::{Match, NewMatch, Period},
};
use crate::{
    access::{authorize, Action, Target},
    auth::services::load_identity,
    error::{AppError, AppResult},
    predictions::services::apply_rescore,
};

pub async fn list(db: &PgPool, filter: &MatchFilter, now: OffsetDateTime) -> AppResult<Vec<Match>> {
    Ok(repo::list(db, filter, now).await?)
}

pub async fn list_period(
    db: &PgPool,
    period: Period,
    now: OffsetDateTime,
) -> AppResult<Vec<Match>> {
    let filter = MatchFilter {
        period: Some(period),
        ..Default::default()
    };
    list(db, &filter, now).await
}

pub async fn get(db: &PgPool, id: Uuid) -> AppResult<Match> {
    repo::find_by_id(db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Match not found"))
}

pub async fn create(db: &PgPool, user_id: Uuid, new: NewMatch) -> AppResult<Match> {
    let mut tx = db.begin().await?;
    let identity = load_identity(&mut *tx, user_id).await?;
    authorize(&identity, Action::CreateMatch, Target::None)?;

    lifecycle::validate_new(&new)?;
    let m = repo::insert(&mut *tx, &new).await?;
    tx.commit().await?;

    info!(
        match_id = %m.id,
        home = %m.home_team,
        away = %m.away_team,
        status = %m.status,
        "match created"
    );
    Ok(m)
}

/// Applies an admin update. The match row, its new state and any rescored
/// predictions are committed together; on any error nothing is written.
pub async fn update(
    db: &PgPool,
    user_id: Uuid,
    id: Uuid,
    changes: MatchChanges,
) -> AppResult<Match> {
    let mut tx = db.begin().await?;
    let identity = load_identity(&mut *tx, user_id).await?;
    authorize(&identity, Action::UpdateMatch, Target::None)?;

    let current = repo::find_by_id_for_update(&mut *tx, id)
        .await?
        .ok_or_else(|| AppError::not_found("Match not found"))?;

    let transition = lifecycle::transition(&current, changes).map_err(|e| {
        warn!(match_id = %id, error = %e, "match transition rejected");
        e
    })?;

    let updated = repo::update(&mut *tx, &transition.updated).await?;
    let touched = apply_rescore(&mut tx, updated.id, transition.rescore).await?;
    tx.commit().await?;

    info!(
        match_id = %updated.id,
        from = %current.status,
        to = %updated.status,
        predictions_rescored = touched,
        "match updated"
    );
    Ok(updated)
}

pub async fn delete(db: &PgPool, user_id: Uuid, id: Uuid) -> AppResult<()> {
    let mut tx = db.begin().await?;
    let identity = load_identity(&mut *tx, user_id).await?;
    authorize(&identity, Action::DeleteMatch, Target::None)?;

    if !repo::delete(&mut *tx, id).await? {
        return Err(AppError::not_found("Match not found"));
    }
    tx.commit().await?;

    info!(match_id = %id, "match deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        matches::repo_types::MatchStatus,
        predictions::{repo as prediction_repo, services as prediction_services},
        test_support::{finish, guess, seed_match, seed_user},
    };
    use time::Duration;

    #[sqlx::test(migrations = "./migrations")]
    async fn finishing_without_score_keeps_stored_state(pool: PgPool) {
        let admin = seed_user(&pool, "admin", true).await;
        let m = seed_match(&pool, OffsetDateTime::now_utc() + Duration::hours(1)).await;

        let changes = MatchChanges {
            status: Some(MatchStatus::Finished),
            ..Default::default()
        };
        let err = update(&pool, admin.id, m.id, changes).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let stored = get(&pool, m.id).await.unwrap();
        assert_eq!(stored.status, MatchStatus::Scheduled);
        assert_eq!(stored.final_score(), None);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn only_admins_change_matches(pool: PgPool) {
        let fan = seed_user(&pool, "fan", false).await;
        let m = seed_match(&pool, OffsetDateTime::now_utc() + Duration::hours(1)).await;

        let err = update(&pool, fan.id, m.id, finish(1, 0)).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        let err = delete(&pool, fan.id, m.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert_eq!(get(&pool, m.id).await.unwrap().status, MatchStatus::Scheduled);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn clearing_venue_and_provisional_score(pool: PgPool) {
        let admin = seed_user(&pool, "admin", true).await;
        let m = seed_match(&pool, OffsetDateTime::now_utc() + Duration::hours(1)).await;

        let live = MatchChanges {
            status: Some(MatchStatus::Live),
            home_score: Some(Some(1)),
            away_score: Some(Some(0)),
            ..Default::default()
        };
        update(&pool, admin.id, m.id, live).await.unwrap();

        let cleared = MatchChanges {
            stadium: Some(None),
            home_score: Some(None),
            away_score: Some(None),
            ..Default::default()
        };
        let updated = update(&pool, admin.id, m.id, cleared).await.unwrap();
        assert_eq!(updated.stadium, None);
        assert_eq!(updated.stage.as_deref(), Some("Quarter-final"));
        assert_eq!(updated.final_score(), None);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn deleting_a_match_removes_its_predictions(pool: PgPool) {
        let admin = seed_user(&pool, "admin", true).await;
        let fan = seed_user(&pool, "fan", false).await;
        let now = OffsetDateTime::now_utc();
        let m = seed_match(&pool, now + Duration::hours(1)).await;
        let (p, _) = prediction_services::create(&pool, fan.id, m.id, guess(1, 1), now)
            .await
            .unwrap();

        delete(&pool, admin.id, m.id).await.unwrap();
        assert!(matches!(get(&pool, m.id).await, Err(AppError::NotFound(_))));
        assert!(prediction_repo::find_by_id(&pool, p.id).await.unwrap().is_none());

        let err = delete(&pool, admin.id, m.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
