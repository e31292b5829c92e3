//! Operation surface consumed by the HTTP adapter
//!
//! [`RestconfService`] turns request URIs and JSON bodies into
//! [`DataRequest`]s for the tree engine, renders query results back into
//! JSON, and hands stream subscriptions to the [`EventBroadcastHub`].

use std::sync::Arc;

use restconf_conv::{json_to_tree, tree_to_json};
use restconf_core::{
    DataRequest, EditIntent, RestconfError, RestconfResult, ResourceIdentifier, TreeEngine,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::hub::{EventBroadcastHub, EventSink, SubscriptionHandle};

/// Where the RESTCONF API is mounted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Root mount point; data resources live under `{root_path}/data`
    pub root_path: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            root_path: "/onos/restconf".to_string(),
        }
    }
}

/// RESTCONF operations over a tree engine
#[derive(Clone)]
pub struct RestconfService {
    engine: Arc<dyn TreeEngine>,
    hub: EventBroadcastHub,
    config: ServiceConfig,
}

impl RestconfService {
    pub fn new(engine: Arc<dyn TreeEngine>, hub: EventBroadcastHub, config: ServiceConfig) -> Self {
        Self {
            engine,
            hub,
            config,
        }
    }

    pub fn root_path(&self) -> &str {
        &self.config.root_path
    }

    pub fn hub(&self) -> &EventBroadcastHub {
        &self.hub
    }

    /// Parse a request URI path into a non-empty identifier
    pub fn identifier(&self, uri: &str) -> RestconfResult<ResourceIdentifier> {
        let identifier = ResourceIdentifier::from_uri(&self.config.root_path, uri)?;
        if !identifier.is_valid() {
            return Err(RestconfError::NotADataResource(format!(
                "{} does not name a data node",
                uri
            )));
        }
        Ok(identifier)
    }

    /// Read the subtree at `uri` as a JSON object
    pub async fn read(&self, uri: &str) -> RestconfResult<Value> {
        let identifier = self.identifier(uri)?;
        debug!(%uri, operation = "query", "Executing request");

        let node = self
            .engine
            .execute(DataRequest::query(identifier))
            .await?
            .ok_or_else(|| RestconfError::NotFound(uri.to_string()))?;

        tree_to_json(std::slice::from_ref(&node))
    }

    /// Create the nodes in `body` under `uri`
    pub async fn create(&self, uri: &str, body: &Value) -> RestconfResult<()> {
        self.edit(EditIntent::Create, uri, Some(body)).await
    }

    /// Create or replace the nodes in `body` under `uri`
    pub async fn replace(&self, uri: &str, body: &Value) -> RestconfResult<()> {
        self.edit(EditIntent::Replace, uri, Some(body)).await
    }

    /// Remove the node at `uri`
    pub async fn delete(&self, uri: &str) -> RestconfResult<()> {
        self.edit(EditIntent::Delete, uri, None).await
    }

    /// Register a subscriber for `stream_id` that writes events to `sink`
    pub fn subscribe<S: EventSink>(
        &self,
        stream_id: &str,
        sink: S,
    ) -> RestconfResult<SubscriptionHandle> {
        self.hub.subscribe(stream_id, sink)
    }

    /// Forward engine notifications into the hub.
    ///
    /// Returns `None` when the engine has no notification channel.
    pub fn start_notification_bridge(&self) -> Option<JoinHandle<()>> {
        match self.engine.notifications() {
            Some(receiver) => {
                info!("Forwarding engine notifications to stream subscribers");
                Some(self.hub.spawn_notification_listener(receiver))
            }
            None => {
                debug!("Engine produces no notifications");
                None
            }
        }
    }

    async fn edit(&self, intent: EditIntent, uri: &str, body: Option<&Value>) -> RestconfResult<()> {
        let identifier = self.identifier(uri)?;
        let payload = match body {
            Some(body) => json_to_tree(body)?,
            None => Vec::new(),
        };

        let request = DataRequest::edit(intent, identifier, payload);
        debug!(%uri, operation = %request.operation, "Executing request");

        if let Some(node) = self.engine.execute(request).await? {
            warn!(%uri, node = node.name(), "Engine returned data for an edit, ignoring");
        }
        Ok(())
    }
}
