use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    response::IntoResponse,
};

use app_api::{MetricsRequest, TrackRequest};

use crate::{errors::HttpError, state::HttpState};

pub async fn metrics(
    State(state): State<HttpState>,
    query: Result<Query<MetricsRequest>, QueryRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let Query(req) = query?;
    let response = app_api::metrics(&state.context, req).await?;
    Ok(Json(response))
}

pub async fn track(
    State(state): State<HttpState>,
    body: Result<Json<TrackRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let Json(req) = body?;
    let response = app_api::track(&state.context, req).await?;
    Ok(Json(response))
}

pub async fn health(State(state): State<HttpState>) -> Result<impl IntoResponse, HttpError> {
    let response = app_api::health(&state.context).await?;
    Ok(Json(response))
}
