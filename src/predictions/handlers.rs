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
    dto::{
        CreatePredictionRequest, ListPredictionsQuery, PredictionResponse,
        UpdatePredictionRequest,
    },
    services,
};
use crate::{
    auth::{dto::MessageResponse, extractors::AuthUser},
    error::AppResult,
    matches::repo_types::Period,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/predictions", get(list_predictions).post(create_prediction))
        .route(
            "/predictions/:id",
            get(get_prediction)
                .put(update_prediction)
                .delete(delete_prediction),
        )
}

#[instrument(skip(state))]
pub async fn list_predictions(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    query: Result<Query<ListPredictionsQuery>, QueryRejection>,
) -> AppResult<Json<Vec<PredictionResponse>>> {
    let Query(query) = query?;
    let period = query
        .match_status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(str::parse::<Period>)
        .transpose()?;

    let now = OffsetDateTime::now_utc();
    let rows = services::list_mine(&state.db, user_id, period, now).await?;
    Ok(Json(
        rows.into_iter()
            .map(|(p, m)| PredictionResponse::new(p, &m, now))
            .collect(),
    ))
}

#[instrument(skip(state))]
pub async fn get_prediction(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Json<PredictionResponse>> {
    let Path(id) = id?;
    let (p, m) = services::get_mine(&state.db, user_id, id).await?;
    Ok(Json(PredictionResponse::new(p, &m, OffsetDateTime::now_utc())))
}

#[instrument(skip(state, payload))]
pub async fn create_prediction(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<CreatePredictionRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<PredictionResponse>)> {
    let Json(req) = payload?;
    let (match_id, input) = req.split();
    let now = OffsetDateTime::now_utc();
    let (p, m) = services::create(&state.db, user_id, match_id, input, now).await?;
    Ok((StatusCode::CREATED, Json(PredictionResponse::new(p, &m, now))))
}

#[instrument(skip(state, payload))]
pub async fn update_prediction(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdatePredictionRequest>, JsonRejection>,
) -> AppResult<Json<PredictionResponse>> {
    let Path(id) = id?;
    let Json(req) = payload?;
    let now = OffsetDateTime::now_utc();
    let (p, m) = services::update(&state.db, user_id, id, req.into(), now).await?;
    Ok(Json(PredictionResponse::new(p, &m, now)))
}

#[instrument(skip(state))]
pub async fn delete_prediction(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Json<MessageResponse>> {
    let Path(id) = id?;
    services::delete(&state.db, user_id, id, OffsetDateTime::now_utc()).await?;
    Ok(Json(MessageResponse {
        message: "Prediction deleted".into(),
    }))
}
