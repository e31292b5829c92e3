//! Abstract data tree
//!
//! The gateway never depends on a concrete schema system. Trees travel
//! between layers either materialized as [`DataNode`] values or as a flat
//! sequence of [`TreeEvent`]s fed into a [`TreeSink`]:
//!
//! ```text
//! JSON ──TreeBuilder──▶ TreeSink (DataTreeBuilder) ──▶ DataNode
//! DataNode ──walk()──▶ TreeEvent* ──replay()──▶ TreeSink (TreeTextWriter) ──▶ JSON
//! ```
//!
//! List entries are anonymous: inside a list, each entry is opened with
//! `enter_container("")` and closed with `exit(NodeKind::Container)`.

use std::collections::BTreeSet;

use crate::error::{RestconfError, RestconfResult};

/// Kind of a data tree node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Single instance, named children
    Container,
    /// Multi instance, keyed entries with named children
    List,
    /// Single scalar value
    Leaf,
    /// Set of scalar values
    LeafList,
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NodeKind::Container => "container",
            NodeKind::List => "list",
            NodeKind::Leaf => "leaf",
            NodeKind::LeafList => "leaf-list",
        };
        f.write_str(s)
    }
}

/// Materialized data tree node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataNode {
    Container {
        name: String,
        children: Vec<DataNode>,
    },
    List {
        name: String,
        entries: Vec<Vec<DataNode>>,
    },
    Leaf {
        name: String,
        value: String,
    },
    /// Values are a set; rendering order is the set's sorted order
    LeafList {
        name: String,
        values: BTreeSet<String>,
    },
}

impl DataNode {
    pub fn container(name: impl Into<String>, children: Vec<DataNode>) -> Self {
        DataNode::Container {
            name: name.into(),
            children,
        }
    }

    pub fn list(name: impl Into<String>, entries: Vec<Vec<DataNode>>) -> Self {
        DataNode::List {
            name: name.into(),
            entries,
        }
    }

    pub fn leaf(name: impl Into<String>, value: impl Into<String>) -> Self {
        DataNode::Leaf {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn leaf_list<I, V>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        DataNode::LeafList {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            DataNode::Container { name, .. }
            | DataNode::List { name, .. }
            | DataNode::Leaf { name, .. }
            | DataNode::LeafList { name, .. } => name,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            DataNode::Container { .. } => NodeKind::Container,
            DataNode::List { .. } => NodeKind::List,
            DataNode::Leaf { .. } => NodeKind::Leaf,
            DataNode::LeafList { .. } => NodeKind::LeafList,
        }
    }

    /// Named child of a container
    pub fn child(&self, name: &str) -> Option<&DataNode> {
        match self {
            DataNode::Container { children, .. } => children.iter().find(|c| c.name() == name),
            _ => None,
        }
    }

    /// Lazily walk this node as a sequence of tree events
    pub fn walk(&self) -> TreeWalk<'_> {
        walk(std::slice::from_ref(self))
    }
}

/// One step of a depth-first tree traversal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEvent<'a> {
    /// Open a container, list, or (with an empty name) a list entry
    Enter { name: &'a str, kind: NodeKind },
    Leaf { name: &'a str, value: &'a str },
    LeafList {
        name: &'a str,
        values: &'a BTreeSet<String>,
    },
    /// Close the innermost open container or list
    Exit(NodeKind),
}

/// Receiver of tree construction calls
pub trait TreeSink {
    fn enter_container(&mut self, name: &str) -> RestconfResult<()>;

    fn enter_list(&mut self, name: &str) -> RestconfResult<()>;

    fn add_leaf(&mut self, name: &str, value: &str) -> RestconfResult<()>;

    fn add_leaf_list(&mut self, name: &str, values: &BTreeSet<String>) -> RestconfResult<()>;

    fn exit(&mut self, kind: NodeKind) -> RestconfResult<()>;
}

enum Step<'a> {
    Visit(&'a DataNode),
    Entry(&'a [DataNode]),
    Exit(NodeKind),
}

/// Stack-based lazy iterator over the events of a forest of nodes
pub struct TreeWalk<'a> {
    stack: Vec<Step<'a>>,
}

impl<'a> TreeWalk<'a> {
    fn push_children(&mut self, children: &'a [DataNode]) {
        self.stack.extend(children.iter().rev().map(Step::Visit));
    }
}

impl<'a> Iterator for TreeWalk<'a> {
    type Item = TreeEvent<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let event = match self.stack.pop()? {
            Step::Visit(DataNode::Container { name, children }) => {
                self.stack.push(Step::Exit(NodeKind::Container));
                self.push_children(children);
                TreeEvent::Enter {
                    name,
                    kind: NodeKind::Container,
                }
            }
            Step::Visit(DataNode::List { name, entries }) => {
                self.stack.push(Step::Exit(NodeKind::List));
                self.stack
                    .extend(entries.iter().rev().map(|entry| Step::Entry(entry.as_slice())));
                TreeEvent::Enter {
                    name,
                    kind: NodeKind::List,
                }
            }
            Step::Visit(DataNode::Leaf { name, value }) => TreeEvent::Leaf { name, value },
            Step::Visit(DataNode::LeafList { name, values }) => TreeEvent::LeafList { name, values },
            Step::Entry(children) => {
                self.stack.push(Step::Exit(NodeKind::Container));
                self.push_children(children);
                TreeEvent::Enter {
                    name: "",
                    kind: NodeKind::Container,
                }
            }
            Step::Exit(kind) => TreeEvent::Exit(kind),
        };
        Some(event)
    }
}

/// Walk a sequence of sibling nodes depth-first
pub fn walk(nodes: &[DataNode]) -> TreeWalk<'_> {
    let mut walker = TreeWalk {
        stack: Vec::with_capacity(nodes.len()),
    };
    walker.push_children(nodes);
    walker
}

/// Feed tree events into a sink
pub fn replay<'a, I, S>(events: I, sink: &mut S) -> RestconfResult<()>
where
    I: IntoIterator<Item = TreeEvent<'a>>,
    S: TreeSink + ?Sized,
{
    for event in events {
        match event {
            TreeEvent::Enter {
                name,
                kind: NodeKind::List,
            } => sink.enter_list(name)?,
            TreeEvent::Enter { name, .. } => sink.enter_container(name)?,
            TreeEvent::Leaf { name, value } => sink.add_leaf(name, value)?,
            TreeEvent::LeafList { name, values } => sink.add_leaf_list(name, values)?,
            TreeEvent::Exit(kind) => sink.exit(kind)?,
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Container,
    List,
    Entry,
}

#[derive(Debug)]
struct Frame {
    name: String,
    kind: FrameKind,
    children: Vec<DataNode>,
    entries: Vec<Vec<DataNode>>,
}

impl Frame {
    fn new(name: &str, kind: FrameKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            children: Vec::new(),
            entries: Vec::new(),
        }
    }
}

/// [`TreeSink`] that materializes the calls into [`DataNode`]s
#[derive(Debug, Default)]
pub struct DataTreeBuilder {
    roots: Vec<DataNode>,
    open: Vec<Frame>,
}

impl DataTreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn in_list(&self) -> bool {
        matches!(self.open.last(), Some(frame) if frame.kind == FrameKind::List)
    }

    fn attach(&mut self, node: DataNode) -> RestconfResult<()> {
        match self.open.last_mut() {
            None => self.roots.push(node),
            Some(parent) if parent.kind == FrameKind::List => {
                return Err(RestconfError::Internal(format!(
                    "{} '{}' added directly under list '{}'",
                    node.kind(),
                    node.name(),
                    parent.name
                )))
            }
            Some(parent) => parent.children.push(node),
        }
        Ok(())
    }

    /// Top-level nodes built so far; fails if a node is still open
    pub fn finish(self) -> RestconfResult<Vec<DataNode>> {
        if !self.open.is_empty() {
            return Err(RestconfError::Internal(format!(
                "{} node(s) left open",
                self.open.len()
            )));
        }
        Ok(self.roots)
    }
}

impl TreeSink for DataTreeBuilder {
    fn enter_container(&mut self, name: &str) -> RestconfResult<()> {
        let kind = if self.in_list() {
            FrameKind::Entry
        } else {
            FrameKind::Container
        };
        self.open.push(Frame::new(name, kind));
        Ok(())
    }

    fn enter_list(&mut self, name: &str) -> RestconfResult<()> {
        if self.in_list() {
            return Err(RestconfError::Internal(format!(
                "list '{}' opened directly inside another list",
                name
            )));
        }
        self.open.push(Frame::new(name, FrameKind::List));
        Ok(())
    }

    fn add_leaf(&mut self, name: &str, value: &str) -> RestconfResult<()> {
        self.attach(DataNode::leaf(name, value))
    }

    fn add_leaf_list(&mut self, name: &str, values: &BTreeSet<String>) -> RestconfResult<()> {
        self.attach(DataNode::LeafList {
            name: name.to_string(),
            values: values.clone(),
        })
    }

    fn exit(&mut self, kind: NodeKind) -> RestconfResult<()> {
        let unbalanced = || RestconfError::Internal(format!("unbalanced exit({}) in tree builder", kind));

        let frame = self.open.pop().ok_or_else(unbalanced)?;
        match (frame.kind, kind) {
            (FrameKind::Entry, NodeKind::Container) => match self.open.last_mut() {
                Some(list) => {
                    list.entries.push(frame.children);
                    Ok(())
                }
                None => Err(unbalanced()),
            },
            (FrameKind::Container, NodeKind::Container) => self.attach(DataNode::Container {
                name: frame.name,
                children: frame.children,
            }),
            (FrameKind::List, NodeKind::List) => self.attach(DataNode::List {
                name: frame.name,
                entries: frame.entries,
            }),
            _ => Err(unbalanced()),
        }
    }
}
