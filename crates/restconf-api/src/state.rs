//! Application state for the RESTCONF API

use std::sync::Arc;

use restconf_core::TreeEngine;

use crate::hub::EventBroadcastHub;
use crate::service::{RestconfService, ServiceConfig};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub service: RestconfService,
}

impl AppState {
    pub fn new(service: RestconfService) -> Self {
        Self { service }
    }

    /// Build the service around `engine` with a hub sized by its default config
    pub fn with_engine(engine: Arc<dyn TreeEngine>, config: ServiceConfig) -> Self {
        Self::new(RestconfService::new(
            engine,
            EventBroadcastHub::default(),
            config,
        ))
    }

    pub fn root_path(&self) -> &str {
        self.service.root_path()
    }
}
