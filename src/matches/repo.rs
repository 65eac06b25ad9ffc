use sqlx::{PgExecutor, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{Match, NewMatch, Period};

const MATCH_COLUMNS: &str = "id, home_team, away_team, home_score, away_score, match_date, \
                             stadium, stage, status, created_at, updated_at";

/// Filters for the public match listing.
#[derive(Debug, Clone, Default)]
pub struct MatchFilter {
    pub period: Option<Period>,
    pub team: Option<String>,
    pub from: Option<OffsetDateTime>,
    pub to: Option<OffsetDateTime>,
}

/// Escapes LIKE metacharacters so a team search matches literally.
pub(crate) fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Appends the SQL form of [`Match::is_past`] / [`Match::is_upcoming`] for the
/// `matches` row aliased as `alias`.
pub(crate) fn push_period<'a>(
    qb: &mut QueryBuilder<'a, Postgres>,
    alias: &str,
    period: Period,
    now: OffsetDateTime,
) {
    match period {
        Period::Past => {
            qb.push(format!("({alias}.match_date < "));
            qb.push_bind(now);
            qb.push(format!(" OR {alias}.status = 'finished')"));
        }
        Period::Upcoming => {
            qb.push(format!("({alias}.match_date > "));
            qb.push_bind(now);
            qb.push(format!(
                " AND {alias}.status IN ('scheduled', 'postponed'))"
            ));
        }
    }
}

pub async fn list<'e>(
    db: impl PgExecutor<'e>,
    filter: &MatchFilter,
    now: OffsetDateTime,
) -> sqlx::Result<Vec<Match>> {
    let mut qb =
        QueryBuilder::<Postgres>::new(format!("SELECT {MATCH_COLUMNS} FROM matches m WHERE TRUE"));

    if let Some(period) = filter.period {
        qb.push(" AND ");
        push_period(&mut qb, "m", period, now);
    }
    if let Some(team) = filter.team.as_deref().filter(|t| !t.is_empty()) {
        let pattern = like_pattern(team);
        qb.push(" AND (m.home_team ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR m.away_team ILIKE ");
        qb.push_bind(pattern);
        qb.push(")");
    }
    if let Some(from) = filter.from {
        qb.push(" AND m.match_date >= ");
        qb.push_bind(from);
    }
    if let Some(to) = filter.to {
        qb.push(" AND m.match_date <= ");
        qb.push_bind(to);
    }

    match filter.period {
        Some(Period::Upcoming) => qb.push(" ORDER BY m.match_date ASC"),
        _ => qb.push(" ORDER BY m.match_date DESC"),
    };

    qb.build_query_as::<Match>().fetch_all(db).await
}

pub async fn find_by_id<'e>(db: impl PgExecutor<'e>, id: Uuid) -> sqlx::Result<Option<Match>> {
    sqlx::query_as::<_, Match>(&format!("SELECT {MATCH_COLUMNS} FROM matches WHERE id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await
}

/// Loads a match and locks its row for the rest of the transaction.
pub async fn find_by_id_for_update<'e>(
    db: impl PgExecutor<'e>,
    id: Uuid,
) -> sqlx::Result<Option<Match>> {
    sqlx::query_as::<_, Match>(&format!(
        "SELECT {MATCH_COLUMNS} FROM matches WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(db)
    .await
}

/// Loads a match with a shared lock; blocks a concurrent finalize until commit.
pub async fn find_by_id_for_share<'e>(
    db: impl PgExecutor<'e>,
    id: Uuid,
) -> sqlx::Result<Option<Match>> {
    sqlx::query_as::<_, Match>(&format!(
        "SELECT {MATCH_COLUMNS} FROM matches WHERE id = $1 FOR SHARE"
    ))
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn find_many<'e>(db: impl PgExecutor<'e>, ids: &[Uuid]) -> sqlx::Result<Vec<Match>> {
    sqlx::query_as::<_, Match>(&format!(
        "SELECT {MATCH_COLUMNS} FROM matches WHERE id = ANY($1)"
    ))
    .bind(ids)
    .fetch_all(db)
    .await
}

pub async fn insert<'e>(db: impl PgExecutor<'e>, m: &NewMatch) -> sqlx::Result<Match> {
    sqlx::query_as::<_, Match>(&format!(
        r#"
        INSERT INTO matches
            (home_team, away_team, home_score, away_score, match_date, stadium, stage, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {MATCH_COLUMNS}
        "#
    ))
    .bind(&m.home_team)
    .bind(&m.away_team)
    .bind(m.score.map(|s| s.home))
    .bind(m.score.map(|s| s.away))
    .bind(m.match_date)
    .bind(&m.stadium)
    .bind(&m.stage)
    .bind(m.status)
    .fetch_one(db)
    .await
}

/// Writes every mutable column of `m` and bumps `updated_at`.
pub async fn update<'e>(db: impl PgExecutor<'e>, m: &Match) -> sqlx::Result<Match> {
    sqlx::query_as::<_, Match>(&format!(
        r#"
        UPDATE matches
           SET home_team = $2,
               away_team = $3,
               home_score = $4,
               away_score = $5,
               match_date = $6,
               stadium = $7,
               stage = $8,
               status = $9,
               updated_at = now()
         WHERE id = $1
        RETURNING {MATCH_COLUMNS}
        "#
    ))
    .bind(m.id)
    .bind(&m.home_team)
    .bind(&m.away_team)
    .bind(m.home_score)
    .bind(m.away_score)
    .bind(m.match_date)
    .bind(&m.stadium)
    .bind(&m.stage)
    .bind(m.status)
    .fetch_one(db)
    .await
}

/// Deletes the match; its predictions go with it via `ON DELETE CASCADE`.
pub async fn delete<'e>(db: impl PgExecutor<'e>, id: Uuid) -> sqlx::Result<bool> {
    let res = sqlx::query("DELETE FROM matches WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(res.rows_affected() > 0)
}
