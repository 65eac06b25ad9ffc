use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use time::OffsetDateTime;
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{CreateMatchRequest, ListMatchesQuery, MatchResponse, UpdateMatchRequest},
    repo_types::{Match, Period},
    services,
};
use crate::{
    auth::{dto::MessageResponse, extractors::AuthUser},
    error::AppResult,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/matches", get(list_matches).post(create_match))
        .route("/matches/past", get(past_matches))
        .route("/matches/upcoming", get(upcoming_matches))
        .route(
            "/matches/:id",
            get(get_match).put(update_match).delete(delete_match),
        )
}

fn respond_all(matches: Vec<Match>, now: OffsetDateTime) -> Json<Vec<MatchResponse>> {
    Json(
        matches
            .into_iter()
            .map(|m| MatchResponse::new(m, now))
            .collect(),
    )
}

#[instrument(skip(state))]
pub async fn list_matches(
    State(state): State<AppState>,
    query: Result<Query<ListMatchesQuery>, QueryRejection>,
) -> AppResult<Json<Vec<MatchResponse>>> {
    let Query(query) = query?;
    let filter = query.into_filter()?;
    let now = OffsetDateTime::now_utc();
    let matches = services::list(&state.db, &filter, now).await?;
    Ok(respond_all(matches, now))
}

#[instrument(skip(state))]
pub async fn past_matches(State(state): State<AppState>) -> AppResult<Json<Vec<MatchResponse>>> {
    let now = OffsetDateTime::now_utc();
    let matches = services::list_period(&state.db, Period::Past, now).await?;
    Ok(respond_all(matches, now))
}

#[instrument(skip(state))]
pub async fn upcoming_matches(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<MatchResponse>>> {
    let now = OffsetDateTime::now_utc();
    let matches = services::list_period(&state.db, Period::Upcoming, now).await?;
    Ok(respond_all(matches, now))
}

#[instrument(skip(state))]
pub async fn get_match(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Json<MatchResponse>> {
    let Path(id) = id?;
    let m = services::get(&state.db, id).await?;
    Ok(Json(MatchResponse::new(m, OffsetDateTime::now_utc())))
}

#[instrument(skip(state, payload))]
pub async fn create_match(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<CreateMatchRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<MatchResponse>)> {
    let Json(req) = payload?;
    let m = services::create(&state.db, user_id, req.into_new_match()?).await?;
    Ok((
        StatusCode::CREATED,
        Json(MatchResponse::new(m, OffsetDateTime::now_utc())),
    ))
}

#[instrument(skip(state, payload))]
pub async fn update_match(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateMatchRequest>, JsonRejection>,
) -> AppResult<Json<MatchResponse>> {
    let Path(id) = id?;
    let Json(req) = payload?;
    let m = services::update(&state.db, user_id, id, req.into_changes()?).await?;
    Ok(Json(MatchResponse::new(m, OffsetDateTime::now_utc())))
}

#[instrument(skip(state))]
pub async fn delete_match(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Json<MessageResponse>> {
    let Path(id) = id?;
    services::delete(&state.db, user_id, id).await?;
    Ok(Json(MessageResponse {
        message: "Match deleted".into(),
    }))
}
