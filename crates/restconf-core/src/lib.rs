//! restconf-core - Core types for the RESTCONF translation gateway
//!
//! This crate provides the schema-independent building blocks shared by the
//! codec and API layers: resource identifiers parsed from request paths, the
//! abstract data tree, and the [`TreeEngine`] trait through which an external
//! schema engine executes requests.

pub mod engine;
pub mod error;
pub mod identifier;
pub mod path;
pub mod tree;

pub use engine::{
    DataRequest, EditIntent, NotificationEvent, NotificationKind, OperationType, TreeEngine,
};
pub use error::{RestconfError, RestconfResult};
pub use identifier::{ElementKind, PathElement, ResourceIdentifier};
pub use tree::{DataNode, DataTreeBuilder, NodeKind, TreeEvent, TreeSink};
