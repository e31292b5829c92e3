//! TreeEngine trait - the seam to the external schema/execution engine
//!
//! The gateway core translates URIs and payloads into a [`DataRequest`]
//! and renders whatever tree the engine returns. How the engine validates,
//! stores, or executes the request is outside this crate.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::RestconfResult;
use crate::identifier::ResourceIdentifier;
use crate::tree::DataNode;

/// Edit intent carried by an `EditConfig` operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditIntent {
    /// Create the target; fails if it already exists
    Create,
    /// Create or replace the target
    Replace,
    /// Remove the target
    Delete,
}

/// Operation requested from the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "intent", rename_all = "snake_case")]
pub enum OperationType {
    /// Read the subtree at the target
    Query,
    /// Modify the datastore
    EditConfig(EditIntent),
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationType::Query => f.write_str("query"),
            OperationType::EditConfig(EditIntent::Create) => f.write_str("create"),
            OperationType::EditConfig(EditIntent::Replace) => f.write_str("replace"),
            OperationType::EditConfig(EditIntent::Delete) => f.write_str("delete"),
        }
    }
}

/// A fully translated request, owned by the request that built it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRequest {
    pub operation: OperationType,
    /// Target location
    pub identifier: ResourceIdentifier,
    /// Body nodes to place under the target (create/replace only)
    pub payload: Vec<DataNode>,
}

impl DataRequest {
    pub fn query(identifier: ResourceIdentifier) -> Self {
        Self {
            operation: OperationType::Query,
            identifier,
            payload: Vec::new(),
        }
    }

    pub fn edit(intent: EditIntent, identifier: ResourceIdentifier, payload: Vec<DataNode>) -> Self {
        Self {
            operation: OperationType::EditConfig(intent),
            identifier,
            payload,
        }
    }
}

/// Kind of an asynchronous notification produced by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    YangNotification,
    NetconfNotification,
    SyslogEvent,
    SnmpEvent,
}

/// Notification emitted by the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub kind: NotificationKind,
    pub time: DateTime<Utc>,
    /// JSON payload delivered to stream subscribers
    pub data: serde_json::Value,
}

impl NotificationEvent {
    pub fn new(kind: NotificationKind, data: serde_json::Value) -> Self {
        Self {
            kind,
            time: Utc::now(),
            data,
        }
    }

    /// Shorthand for a YANG notification
    pub fn yang(data: serde_json::Value) -> Self {
        Self::new(NotificationKind::YangNotification, data)
    }
}

/// The external tree engine.
///
/// Implementations report failures as
/// [`RestconfError::TreeEngineFailure`](crate::RestconfError::TreeEngineFailure),
/// [`RestconfError::Conflict`](crate::RestconfError::Conflict) or
/// [`RestconfError::NotFound`](crate::RestconfError::NotFound). Engines are
/// assumed to be transactional: callers never retry.
#[async_trait]
pub trait TreeEngine: Send + Sync {
    /// Execute a request. Queries return the subtree at the target;
    /// edits normally return `None`.
    async fn execute(&self, request: DataRequest) -> RestconfResult<Option<DataNode>>;

    /// Subscribe to engine notifications, if the engine produces any
    fn notifications(&self) -> Option<broadcast::Receiver<NotificationEvent>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_operation_display() {
        assert_eq!(OperationType::Query.to_string(), "query");
        assert_eq!(
            OperationType::EditConfig(EditIntent::Replace).to_string(),
            "replace"
        );
    }

    #[test]
    fn test_operation_serializes_with_intent() {
        let value = serde_json::to_value(OperationType::EditConfig(EditIntent::Create)).unwrap();
        assert_eq!(value, json!({"type": "edit_config", "intent": "create"}));
    }

    #[test]
    fn test_yang_notification_shorthand() {
        let event = NotificationEvent::yang(json!({"alarm": {"severity": "major"}}));
        assert_eq!(event.kind, NotificationKind::YangNotification);
        assert_eq!(event.data["alarm"]["severity"], json!("major"));
    }
}
