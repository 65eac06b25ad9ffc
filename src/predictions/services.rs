use std::collections::HashMap;

use sqlx::{PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    repo,
    repo_types::Prediction,
    rules::{self, PredictionInput, PredictionPatch},
    scoring,
};
use crate::{
    access::{authorize, Action, Identity, Target},
    auth::services::load_identity,
    error::{AppError, AppResult},
    matches::{
        lifecycle::Rescore,
        repo as match_repo,
        repo_types::{Match, Period},
    },
};

/// Carries out the scoring side of a match transition inside `tx`.
/// Returns how many predictions were written.
pub async fn apply_rescore(
    tx: &mut Transaction<'_, Postgres>,
    match_id: Uuid,
    rescore: Rescore,
) -> AppResult<u64> {
    match rescore {
        Rescore::Apply(actual) => {
            let predictions = repo::list_for_match_for_update(&mut **tx, match_id).await?;
            let points = scoring::score_all(&predictions, actual);
            Ok(repo::set_points_batch(&mut **tx, &points).await?)
        }
        Rescore::Clear => Ok(repo::clear_points(&mut **tx, match_id).await?),
        Rescore::Keep => Ok(0),
    }
}

/// The caller's predictions with their matches.
pub async fn list_mine(
    db: &PgPool,
    user_id: Uuid,
    period: Option<Period>,
    now: OffsetDateTime,
) -> AppResult<Vec<(Prediction, Match)>> {
    let predictions = repo::list_by_user(db, user_id, period, now).await?;
    let ids: Vec<Uuid> = predictions.iter().map(|p| p.match_id).collect();
    let mut matches: HashMap<Uuid, Match> = match_repo::find_many(db, &ids)
        .await?
        .into_iter()
        .map(|m| (m.id, m))
        .collect();

    // One prediction per (user, match), so each match is taken at most once.
    Ok(predictions
        .into_iter()
        .filter_map(|p| match matches.remove(&p.match_id) {
            Some(m) => Some((p, m)),
            None => {
                warn!(
                    prediction_id = %p.id,
                    match_id = %p.match_id,
                    "match vanished during listing"
                );
                None
            }
        })
        .collect())
}

pub async fn get_mine(db: &PgPool, user_id: Uuid, id: Uuid) -> AppResult<(Prediction, Match)> {
    let identity = load_identity(db, user_id).await?;
    let prediction = owned(&identity, Action::ReadPrediction, repo::find_by_id(db, id).await?)?;

    let m = match_repo::find_by_id(db, prediction.match_id)
        .await?
        .ok_or_else(|| AppError::not_found("Match not found"))?;
    Ok((prediction, m))
}

/// Collapses "missing" and "someone else's" into the same `NotFound`.
fn owned(
    identity: &Identity,
    action: Action,
    prediction: Option<Prediction>,
) -> AppResult<Prediction> {
    let prediction = prediction.ok_or_else(|| AppError::not_found("Prediction not found"))?;
    authorize(identity, action, Target::Owner(prediction.user_id))?;
    Ok(prediction)
}

/// Loads an owned prediction and its match for writing.
///
/// The match row is locked before the prediction row, the order a match
/// update uses when it rescores, so an edit racing a finalize waits for it
/// instead of deadlocking.
async fn lock_owned(
    tx: &mut Transaction<'_, Postgres>,
    identity: &Identity,
    action: Action,
    id: Uuid,
) -> AppResult<(Prediction, Match)> {
    let found = owned(identity, action, repo::find_by_id(&mut **tx, id).await?)?;
    let m = match_repo::find_by_id_for_share(&mut **tx, found.match_id)
        .await?
        .ok_or_else(|| AppError::not_found("Match not found"))?;

    // Re-read under the row lock; it may have been edited or deleted meanwhile.
    let current = repo::find_by_id_for_update(&mut **tx, id).await?;
    let current = owned(identity, action, current)?;
    Ok((current, m))
}

pub async fn create(
    db: &PgPool,
    user_id: Uuid,
    match_id: Uuid,
    input: PredictionInput,
    now: OffsetDateTime,
) -> AppResult<(Prediction, Match)> {
    let mut tx = db.begin().await?;
    let identity = load_identity(&mut *tx, user_id).await?;
    authorize(&identity, Action::CreatePrediction, Target::None)?;

    let m = match_repo::find_by_id_for_share(&mut *tx, match_id).await?;
    let already = match &m {
        Some(_) => repo::exists_for(&mut *tx, user_id, match_id).await?,
        None => false,
    };

    let new = rules::check_create(user_id, m.as_ref(), already, input, now).map_err(|e| {
        warn!(%user_id, %match_id, error = %e, "prediction rejected");
        e
    })?;
    let m = m.ok_or_else(|| AppError::not_found("Match not found"))?;

    // The unique constraint backs the check above against concurrent inserts.
    let prediction = repo::insert(&mut *tx, &new).await?;
    tx.commit().await?;

    info!(prediction_id = %prediction.id, %user_id, %match_id, "prediction created");
    Ok((prediction, m))
}

pub async fn update(
    db: &PgPool,
    user_id: Uuid,
    id: Uuid,
    patch: PredictionPatch,
    now: OffsetDateTime,
) -> AppResult<(Prediction, Match)> {
    let mut tx = db.begin().await?;
    let identity = load_identity(&mut *tx, user_id).await?;
    let (current, m) = lock_owned(&mut tx, &identity, Action::UpdatePrediction, id).await?;

    let next = rules::apply_edit(&current, &m, patch, now).map_err(|e| {
        warn!(prediction_id = %id, error = %e, "prediction edit rejected");
        e
    })?;
    let saved = repo::update(&mut *tx, &next).await?;
    tx.commit().await?;

    info!(prediction_id = %saved.id, %user_id, "prediction updated");
    Ok((saved, m))
}

pub async fn delete(db: &PgPool, user_id: Uuid, id: Uuid, now: OffsetDateTime) -> AppResult<()> {
    let mut tx = db.begin().await?;
    let identity = load_identity(&mut *tx, user_id).await?;
    let (current, m) = lock_owned(&mut tx, &identity, Action::DeletePrediction, id).await?;
    rules::ensure_open(&m, now)?;

    repo::delete(&mut *tx, current.id).await?;
    tx.commit().await?;

    info!(prediction_id = %id, %user_id, "prediction deleted");
    Ok(())
}
