//! Event stream handler
//!
//! A subscription is a never-ending `application/json` response body
//! carrying one notification object per line. The stream ends when the
//! client disconnects or the hub shuts down.

use std::convert::Infallible;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use futures::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::info;

use crate::error::ApiError;
use crate::hub::ChannelSink;
use crate::state::AppState;

/// Response header carrying the subscription id
pub const SUBSCRIPTION_ID_HEADER: &str = "x-subscription-id";

/// Body chunks buffered between the consumer task and the connection
const BODY_BUFFER: usize = 16;

/// GET {root}/streams/{stream_id}
/// Subscribe to notifications and stream them as JSON lines
pub async fn subscribe_stream(
    State(state): State<AppState>,
    Path(stream_id): Path<String>,
) -> Result<Response, ApiError> {
    let (sink, chunks) = ChannelSink::channel(BODY_BUFFER);
    let handle = state.service.subscribe(&stream_id, sink)?;

    info!(subscription_id = handle.id(), %stream_id, "Event stream opened");

    let body = Body::from_stream(ReceiverStream::new(chunks).map(Ok::<_, Infallible>));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(SUBSCRIPTION_ID_HEADER, handle.id())
        .body(body)
        .map_err(|e| ApiError::Internal(format!("Failed to build stream response: {}", e)))
}
