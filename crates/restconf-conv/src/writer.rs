//! Tree to JSON
//!
//! [`TreeTextWriter`] accumulates JSON text incrementally. Every value and
//! every closed node is followed by a `,`; the separator is trimmed again
//! when the enclosing node is closed and once more by [`finalize`].
//!
//! [`finalize`]: TreeTextWriter::finalize

use std::collections::BTreeSet;

use restconf_core::tree::{self, DataNode, NodeKind, TreeSink};
use restconf_core::{RestconfError, RestconfResult};
use serde_json::Value;

/// Stateful JSON text writer driven by tree events
#[derive(Debug, Default)]
pub struct TreeTextWriter {
    text: String,
    open: Vec<NodeKind>,
}

impl TreeTextWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a container (`{`) or a list (`[`). An empty field name opens
    /// an anonymous value such as the document root or a list entry.
    pub fn open(&mut self, field: &str, kind: NodeKind) -> RestconfResult<()> {
        let bracket = match kind {
            NodeKind::Container => '{',
            NodeKind::List => '[',
            NodeKind::Leaf | NodeKind::LeafList => {
                return Err(RestconfError::Internal(format!(
                    "cannot open {} '{}' as a node",
                    kind, field
                )))
            }
        };
        self.append_field(field);
        self.text.push(bracket);
        self.open.push(kind);
        Ok(())
    }

    /// Write `"field":"value",`. An empty value is written as `""`.
    pub fn leaf(&mut self, field: &str, value: &str) {
        self.append_field(field);
        self.text.push_str(&quote(value));
        self.text.push(',');
    }

    /// Write `"field":["v1","v2"],`
    pub fn leaf_set<'a, I>(&mut self, field: &str, values: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.append_field(field);
        self.text.push('[');
        for value in values {
            self.text.push_str(&quote(value));
            self.text.push(',');
        }
        self.trim_trailing_comma();
        self.text.push_str("],");
    }

    /// Close the innermost open node. Closing a leaf or leaf-list is a no-op.
    pub fn close(&mut self, kind: NodeKind) -> RestconfResult<()> {
        let bracket = match kind {
            NodeKind::Container => '}',
            NodeKind::List => ']',
            NodeKind::Leaf | NodeKind::LeafList => return Ok(()),
        };
        match self.open.pop() {
            Some(open) if open == kind => {}
            open => {
                return Err(RestconfError::Internal(format!(
                    "close({}) does not match open node {:?}",
                    kind, open
                )))
            }
        }
        self.trim_trailing_comma();
        self.text.push(bracket);
        self.text.push(',');
        Ok(())
    }

    /// Text written so far, without a trailing separator
    pub fn as_str(&self) -> &str {
        self.text.strip_suffix(',').unwrap_or(&self.text)
    }

    /// Trim the final separator and return the document text
    pub fn finalize(mut self) -> RestconfResult<String> {
        if let Some(open) = self.open.last() {
            return Err(RestconfError::Internal(format!(
                "{} node(s) still open at finalize (innermost {})",
                self.open.len(),
                open
            )));
        }
        self.trim_trailing_comma();
        Ok(self.text)
    }

    /// Finalize and parse the text into a structured JSON value.
    ///
    /// A parse failure means the writer produced invalid output and is
    /// reported as an internal error.
    pub fn finalize_value(self) -> RestconfResult<Value> {
        let text = self.finalize()?;
        serde_json::from_str(&text).map_err(|e| {
            RestconfError::Internal(format!("tree writer produced invalid JSON: {}", e))
        })
    }

    fn append_field(&mut self, field: &str) {
        if !field.is_empty() {
            self.text.push_str(&quote(field));
            self.text.push(':');
        }
    }

    fn trim_trailing_comma(&mut self) {
        if self.text.ends_with(',') {
            self.text.pop();
        }
    }
}

impl TreeSink for TreeTextWriter {
    fn enter_container(&mut self, name: &str) -> RestconfResult<()> {
        self.open(name, NodeKind::Container)
    }

    fn enter_list(&mut self, name: &str) -> RestconfResult<()> {
        self.open(name, NodeKind::List)
    }

    fn add_leaf(&mut self, name: &str, value: &str) -> RestconfResult<()> {
        self.leaf(name, value);
        Ok(())
    }

    fn add_leaf_list(&mut self, name: &str, values: &BTreeSet<String>) -> RestconfResult<()> {
        self.leaf_set(name, values.iter().map(String::as_str));
        Ok(())
    }

    fn exit(&mut self, kind: NodeKind) -> RestconfResult<()> {
        self.close(kind)
    }
}

/// Render sibling nodes as the fields of one JSON object, as text
pub fn tree_to_string(nodes: &[DataNode]) -> RestconfResult<String> {
    render(nodes)?.finalize()
}

/// Render sibling nodes as the fields of one JSON object
pub fn tree_to_json(nodes: &[DataNode]) -> RestconfResult<Value> {
    render(nodes)?.finalize_value()
}

fn render(nodes: &[DataNode]) -> RestconfResult<TreeTextWriter> {
    let mut writer = TreeTextWriter::new();
    writer.open("", NodeKind::Container)?;
    tree::replay(tree::walk(nodes), &mut writer)?;
    writer.close(NodeKind::Container)?;
    Ok(writer)
}

fn quote(text: &str) -> String {
    Value::String(text.to_string()).to_string()
}
