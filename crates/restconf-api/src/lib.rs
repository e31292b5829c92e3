//! restconf-api - RESTCONF operation surface and HTTP adapter
//!
//! This crate wires the translation core to HTTP. [`RestconfService`]
//! exposes read / create / replace / delete / subscribe over any
//! [`TreeEngine`](restconf_core::TreeEngine); [`EventBroadcastHub`] fans
//! engine notifications out to stream subscribers; [`create_router`]
//! mounts both under the configured root path.
//!
//! # Usage
//!
//! ```ignore
//! use restconf_api::{create_router, AppState, ServiceConfig};
//!
//! let state = AppState::with_engine(engine, ServiceConfig::default());
//! let router = create_router(state);
//! ```

pub mod error;
pub mod handlers;
pub mod hub;
pub mod service;
pub mod state;

pub use error::ApiError;
pub use hub::{
    ChannelSink, EventBroadcastHub, EventSink, HubConfig, OverflowPolicy, SubscriptionHandle,
    SubscriptionState,
};
pub use service::{RestconfService, ServiceConfig};
pub use state::AppState;

use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the RESTCONF router with the given application state
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let root = state.root_path().trim_end_matches('/').to_string();
    let data = get(handlers::data::read_data)
        .post(handlers::data::create_data)
        .put(handlers::data::replace_data)
        .delete(handlers::data::delete_data);

    Router::new()
        // Health check
        .route("/health", get(|| async { "OK" }))
        // Data resources; the bare marker is routed so the service can reject it
        .route(&format!("{}/data", root), data.clone())
        .route(&format!("{}/data/", root), data.clone())
        .route(&format!("{}/data/{{*identifier}}", root), data)
        // Notification streams
        .route(
            &format!("{}/streams/{{stream_id}}", root),
            get(handlers::streams::subscribe_stream),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
