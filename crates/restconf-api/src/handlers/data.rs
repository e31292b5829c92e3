//! Data resource handlers
//!
//! The identifier is taken from the raw request path so that percent
//! escapes reach the path decoder untouched.

use axum::body::Bytes;
use axum::extract::{OriginalUri, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::Value;

use crate::error::ApiError;
use crate::state::AppState;

/// GET {root}/data/{*identifier}
/// Read the subtree at the identifier
pub async fn read_data(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<Value>, ApiError> {
    let body = state.service.read(uri.path()).await?;
    Ok(Json(body))
}

/// POST {root}/data/{*identifier}
/// Create the body nodes under the identifier
pub async fn create_data(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let document = parse_body(&body)?;
    state.service.create(uri.path(), &document).await?;
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, uri.path().to_string())],
    ))
}

/// PUT {root}/data/{*identifier}
/// Create or replace the body nodes under the identifier
pub async fn replace_data(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let document = parse_body(&body)?;
    state.service.replace(uri.path(), &document).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE {root}/data/{*identifier}
pub async fn delete_data(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
) -> Result<StatusCode, ApiError> {
    state.service.delete(uri.path()).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn parse_body(body: &[u8]) -> Result<Value, ApiError> {
    Ok(serde_json::from_slice(body)?)
}
