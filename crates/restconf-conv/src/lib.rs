//! restconf-conv - JSON codec for RESTCONF payloads
//!
//! Translates between JSON documents and the schema-independent data tree
//! of `restconf-core`, in both directions:
//!
//! - [`builder`] walks a JSON document and drives any
//!   [`TreeSink`](restconf_core::TreeSink) (JSON → tree)
//! - [`writer`] renders tree events back into compact JSON text (tree → JSON)
//!
//! # Quick Start
//!
//! ```rust
//! use restconf_conv::{json_to_tree, tree_to_json};
//! use serde_json::json;
//!
//! let body = json!({"top": {"name": "core", "tags": ["b", "a", "b"]}});
//! let nodes = json_to_tree(&body).unwrap();
//!
//! // Leaf-lists are sets: duplicates collapse, order is normalized
//! let rendered = tree_to_json(&nodes).unwrap();
//! assert_eq!(rendered, json!({"top": {"name": "core", "tags": ["a", "b"]}}));
//! ```
//!
//! Scalars are always rendered as JSON strings; numbers and booleans in a
//! request body come back as their text form.

pub mod builder;
pub mod writer;

pub use builder::{build, json_to_tree};
pub use writer::{tree_to_json, tree_to_string, TreeTextWriter};
