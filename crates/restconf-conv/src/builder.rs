//! JSON to tree
//!
//! Walks a JSON document depth-first and emits [`TreeSink`] calls:
//!
//! | JSON | Sink calls |
//! |------|------------|
//! | object | `enter_container`, fields in document order, `exit(Container)` |
//! | array of strings/numbers | `add_leaf_list` with the de-duplicated value set |
//! | array of objects | `enter_list`, one anonymous entry per element, `exit(List)` |
//! | string, number, boolean | `add_leaf` with the text form |
//! | null | rejected |
//!
//! The top-level object is the unnamed root and is not emitted as a node.

use std::collections::BTreeSet;

use restconf_core::tree::{DataNode, DataTreeBuilder, NodeKind, TreeSink};
use restconf_core::{RestconfError, RestconfResult};
use serde_json::{Map, Value};

/// Emit sink calls for a JSON document whose root is an object
pub fn build<S: TreeSink + ?Sized>(document: &Value, sink: &mut S) -> RestconfResult<()> {
    match document {
        Value::Object(fields) => build_fields(fields, sink),
        other => Err(unsupported("", other)),
    }
}

/// Build a JSON document into materialized top-level nodes
pub fn json_to_tree(document: &Value) -> RestconfResult<Vec<DataNode>> {
    let mut builder = DataTreeBuilder::new();
    build(document, &mut builder)?;
    builder.finish()
}

fn build_fields<S: TreeSink + ?Sized>(fields: &Map<String, Value>, sink: &mut S) -> RestconfResult<()> {
    for (name, value) in fields {
        build_node(name, value, sink)?;
    }
    Ok(())
}

fn build_node<S: TreeSink + ?Sized>(name: &str, value: &Value, sink: &mut S) -> RestconfResult<()> {
    if name.is_empty() {
        return Err(RestconfError::UnsupportedNodeType {
            field: String::new(),
            node_type: "unnamed field".to_string(),
        });
    }

    match value {
        Value::Object(fields) => {
            sink.enter_container(name)?;
            build_fields(fields, sink)?;
            sink.exit(NodeKind::Container)
        }
        Value::Array(items) => build_array(name, items, sink),
        Value::String(text) => sink.add_leaf(name, text),
        Value::Number(number) => sink.add_leaf(name, &number.to_string()),
        Value::Bool(flag) => sink.add_leaf(name, if *flag { "true" } else { "false" }),
        Value::Null => Err(unsupported(name, value)),
    }
}

fn build_array<S: TreeSink + ?Sized>(name: &str, items: &[Value], sink: &mut S) -> RestconfResult<()> {
    if let Some(values) = leaf_list_values(items) {
        return sink.add_leaf_list(name, &values);
    }

    sink.enter_list(name)?;
    for item in items {
        match item {
            Value::Object(fields) => {
                sink.enter_container("")?;
                build_fields(fields, sink)?;
                sink.exit(NodeKind::Container)?;
            }
            other => return Err(unsupported(name, other)),
        }
    }
    sink.exit(NodeKind::List)
}

/// Text values of an array made only of strings and numbers
fn leaf_list_values(items: &[Value]) -> Option<BTreeSet<String>> {
    items
        .iter()
        .map(|item| match item {
            Value::String(text) => Some(text.clone()),
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        })
        .collect()
}

fn unsupported(field: &str, value: &Value) -> RestconfError {
    RestconfError::UnsupportedNodeType {
        field: field.to_string(),
        node_type: type_name(value).to_string(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
