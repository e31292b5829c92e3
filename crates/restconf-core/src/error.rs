//! Common error types for the RESTCONF translation core

use thiserror::Error;

/// Result type for gateway operations
pub type RestconfResult<T> = Result<T, RestconfError>;

/// Errors that can occur while translating or executing a RESTCONF request
#[derive(Debug, Error)]
pub enum RestconfError {
    /// Malformed percent-encoding in a path segment
    #[error("Invalid percent-encoding in '{segment}': {reason}")]
    Decode { segment: String, reason: String },

    /// Path segment does not follow the `[ns:]name[=key[,key]*]` grammar
    #[error("Malformed path segment '{segment}': {reason}")]
    MalformedSegment { segment: String, reason: String },

    /// URI is outside the configured data root
    #[error("Not a data resource: {0}")]
    NotADataResource(String),

    /// JSON value type that cannot be represented in the data tree
    #[error("Unsupported node type {node_type} for field '{field}'")]
    UnsupportedNodeType { field: String, node_type: String },

    /// Opaque failure reported by the tree engine
    #[error("Tree engine failure: {0}")]
    TreeEngineFailure(String),

    /// Target node already exists (create)
    #[error("Resource already exists: {0}")]
    Conflict(String),

    /// Target node does not exist
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Streaming consumer's output is no longer writable
    #[error("Event sink closed")]
    SinkClosed,

    /// No worker capacity left for a new subscription
    #[error("Worker pool exhausted ({capacity} subscriptions active)")]
    PoolExhausted { capacity: usize },

    /// Internal error (e.g. the writer produced unparseable output)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RestconfError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            RestconfError::Decode { .. } => 400,
            RestconfError::MalformedSegment { .. } => 400,
            RestconfError::NotADataResource(_) => 400,
            RestconfError::UnsupportedNodeType { .. } => 400,
            RestconfError::TreeEngineFailure(_) => 500,
            RestconfError::Conflict(_) => 409,
            RestconfError::NotFound(_) => 404,
            RestconfError::SinkClosed => 410,
            RestconfError::PoolExhausted { .. } => 503,
            RestconfError::Internal(_) => 500,
        }
    }

    /// Whether the error was caused by the request itself
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    pub(crate) fn malformed(segment: &str, reason: impl Into<String>) -> Self {
        RestconfError::MalformedSegment {
            segment: segment.to_string(),
            reason: reason.into(),
        }
    }
}
