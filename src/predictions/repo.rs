use sqlx::{PgExecutor, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{NewPrediction, Prediction};
use crate::matches::{repo::push_period, repo_types::Period};

const PREDICTION_COLUMNS: &str = "id, user_id, match_id, home_score, away_score, comment, \
                                  subject, points_earned, created_at, updated_at";

pub async fn find_by_id<'e>(db: impl PgExecutor<'e>, id: Uuid) -> sqlx::Result<Option<Prediction>> {
    sqlx::query_as::<_, Prediction>(&format!(
        "SELECT {PREDICTION_COLUMNS} FROM predictions WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn find_by_id_for_update<'e>(
    db: impl PgExecutor<'e>,
    id: Uuid,
) -> sqlx::Result<Option<Prediction>> {
    sqlx::query_as::<_, Prediction>(&format!(
        "SELECT {PREDICTION_COLUMNS} FROM predictions WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn exists_for<'e>(
    db: impl PgExecutor<'e>,
    user_id: Uuid,
    match_id: Uuid,
) -> sqlx::Result<bool> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM predictions WHERE user_id = $1 AND match_id = $2)",
    )
    .bind(user_id)
    .bind(match_id)
    .fetch_one(db)
    .await
}

/// Inserts a prediction. A concurrent duplicate fails on
/// `predictions_user_match_key` and surfaces as a unique violation.
pub async fn insert<'e>(db: impl PgExecutor<'e>, p: &NewPrediction) -> sqlx::Result<Prediction> {
    sqlx::query_as::<_, Prediction>(&format!(
        r#"
        INSERT INTO predictions (user_id, match_id, home_score, away_score, comment, subject)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {PREDICTION_COLUMNS}
        "#
    ))
    .bind(p.user_id)
    .bind(p.match_id)
    .bind(p.score.home)
    .bind(p.score.away)
    .bind(&p.comment)
    .bind(&p.subject)
    .fetch_one(db)
    .await
}

/// Writes the user-editable columns. `points_earned` is left alone.
pub async fn update<'e>(db: impl PgExecutor<'e>, p: &Prediction) -> sqlx::Result<Prediction> {
    sqlx::query_as::<_, Prediction>(&format!(
        r#"
        UPDATE predictions
           SET home_score = $2,
               away_score = $3,
               comment = $4,
               subject = $5,
               updated_at = now()
         WHERE id = $1
        RETURNING {PREDICTION_COLUMNS}
        "#
    ))
    .bind(p.id)
    .bind(p.home_score)
    .bind(p.away_score)
    .bind(&p.comment)
    .bind(&p.subject)
    .fetch_one(db)
    .await
}

pub async fn delete<'e>(db: impl PgExecutor<'e>, id: Uuid) -> sqlx::Result<bool> {
    let res = sqlx::query("DELETE FROM predictions WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(res.rows_affected() > 0)
}

/// All predictions on a match, row-locked for rescoring.
pub async fn list_for_match_for_update<'e>(
    db: impl PgExecutor<'e>,
    match_id: Uuid,
) -> sqlx::Result<Vec<Prediction>> {
    sqlx::query_as::<_, Prediction>(&format!(
        r#"
        SELECT {PREDICTION_COLUMNS} FROM predictions
         WHERE match_id = $1
         ORDER BY created_at
           FOR UPDATE
        "#
    ))
    .bind(match_id)
    .fetch_all(db)
    .await
}

/// Stores computed points for many predictions in one statement.
pub async fn set_points_batch<'e>(
    db: impl PgExecutor<'e>,
    points: &[(Uuid, i32)],
) -> sqlx::Result<u64> {
    if points.is_empty() {
        return Ok(0);
    }
    let (ids, values): (Vec<Uuid>, Vec<i32>) = points.iter().copied().unzip();
    let res = sqlx::query(
        r#"
        UPDATE predictions AS p
           SET points_earned = v.points,
               updated_at = now()
          FROM UNNEST($1::uuid[], $2::int4[]) AS v(id, points)
         WHERE p.id = v.id
        "#,
    )
    .bind(&ids)
    .bind(&values)
    .execute(db)
    .await?;
    Ok(res.rows_affected())
}

pub async fn clear_points<'e>(db: impl PgExecutor<'e>, match_id: Uuid) -> sqlx::Result<u64> {
    let res = sqlx::query(
        r#"
        UPDATE predictions
           SET points_earned = NULL,
               updated_at = now()
         WHERE match_id = $1 AND points_earned IS NOT NULL
        "#,
    )
    .bind(match_id)
    .execute(db)
    .await?;
    Ok(res.rows_affected())
}

/// The caller's predictions, optionally narrowed to past or upcoming matches.
pub async fn list_by_user<'e>(
    db: impl PgExecutor<'e>,
    user_id: Uuid,
    period: Option<Period>,
    now: OffsetDateTime,
) -> sqlx::Result<Vec<Prediction>> {
    let mut qb = QueryBuilder::<Postgres>::new(
        "SELECT p.id, p.user_id, p.match_id, p.home_score, p.away_score, p.comment, \
         p.subject, p.points_earned, p.created_at, p.updated_at \
         FROM predictions p JOIN matches m ON m.id = p.match_id WHERE p.user_id = ",
    );
    qb.push_bind(user_id);
    if let Some(period) = period {
        qb.push(" AND ");
        push_period(&mut qb, "m", period, now);
    }
    qb.push(" ORDER BY m.match_date DESC");

    qb.build_query_as::<Prediction>().fetch_all(db).await
}
