use axum::{
    extract::{Path, State},
    http::{StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::domain::{EarthDate, RoverId, Sol};

use super::{error::ApiError, state::HttpState};

pub(super) async fn manifest(
    State(state): State<HttpState>,
    Path(rover): Path<String>,
) -> Result<Response, ApiError> {
    let rover = RoverId::parse(&rover)?;
    let manifest = state.rovers.manifest(&rover).await?;
    json_response(&manifest)
}

pub(super) async fn photos_by_sol(
    State(state): State<HttpState>,
    Path((rover, day)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let rover = RoverId::parse(&rover)?;
    let sol = Sol::parse(&day)?;
    let photos = state.rovers.photos_by_sol(&rover, sol).await?;
    json_response(&photos)
}

pub(super) async fn photos_by_earth_date(
    State(state): State<HttpState>,
    Path((rover, date)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let rover = RoverId::parse(&rover)?;
    let date = EarthDate::parse(&date)?;
    let photos = state.rovers.photos_by_earth_date(&rover, &date).await?;
    json_response(&photos)
}

pub(super) async fn health(State(state): State<HttpState>) -> Response {
    match state.cache_backend().ping().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => ApiError::unavailable("Cache backend unavailable", &err).into_response(),
    }
}

pub(super) async fn fallback() -> ApiError {
    ApiError::not_found("Route not found", None)
}

fn json_response<T: Serialize>(value: &T) -> Result<Response, ApiError> {
    let body = serde_json::to_vec(value).map_err(|err| ApiError::serialization(&err))?;
    Ok((StatusCode::OK, [(CONTENT_TYPE, "application/json")], body).into_response())
}
