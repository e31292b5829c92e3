//! In-memory tree engine for running the gateway without a schema engine
//!
//! Nodes are addressed by local name only; namespaces are ignored. A
//! multi-instance element `name=k1,k2` selects the entry of list `name`
//! whose leading leaves carry the values `k1, k2` in order, or the value
//! `k1` of leaf-list `name`. Every committed edit is announced as a YANG
//! notification.

use async_trait::async_trait;
use parking_lot::RwLock;
use restconf_core::{
    DataNode, DataRequest, EditIntent, NotificationEvent, OperationType, PathElement,
    RestconfError, RestconfResult, ResourceIdentifier, TreeEngine,
};
use serde_json::json;
use tokio::sync::broadcast;
use tracing::debug;

const NOTIFICATION_BUFFER: usize = 64;

pub struct MemoryEngine {
    roots: RwLock<Vec<DataNode>>,
    events: broadcast::Sender<NotificationEvent>,
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::with_data(Vec::new())
    }
}

impl MemoryEngine {
    /// Start from an existing set of top-level nodes
    pub fn with_data(roots: Vec<DataNode>) -> Self {
        let (events, _) = broadcast::channel(NOTIFICATION_BUFFER);
        Self {
            roots: RwLock::new(roots),
            events,
        }
    }

    /// Copy of the current datastore
    pub fn snapshot(&self) -> Vec<DataNode> {
        self.roots.read().clone()
    }

    /// Apply an edit to a staged copy and commit it only on success, so a
    /// failed edit leaves the datastore untouched
    fn apply(
        &self,
        intent: EditIntent,
        identifier: &ResourceIdentifier,
        payload: Vec<DataNode>,
    ) -> RestconfResult<()> {
        let mut roots = self.roots.write();
        let mut staged = roots.clone();
        edit(&mut staged, intent, identifier, payload)?;
        *roots = staged;
        Ok(())
    }

    fn announce(&self, operation: OperationType, identifier: &ResourceIdentifier) {
        let event = NotificationEvent::yang(json!({
            "data-change": {
                "operation": operation.to_string(),
                "target": identifier.to_string(),
            }
        }));
        // No receivers is not an error
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl TreeEngine for MemoryEngine {
    async fn execute(&self, request: DataRequest) -> RestconfResult<Option<DataNode>> {
        debug!(operation = %request.operation, target = %request.identifier, "Memory engine request");

        match request.operation {
            OperationType::Query => Ok(find(&self.roots.read(), request.identifier.elements())),
            OperationType::EditConfig(intent) => {
                self.apply(intent, &request.identifier, request.payload)?;
                self.announce(request.operation, &request.identifier);
                Ok(None)
            }
        }
    }

    fn notifications(&self) -> Option<broadcast::Receiver<NotificationEvent>> {
        Some(self.events.subscribe())
    }
}

fn edit(
    roots: &mut Vec<DataNode>,
    intent: EditIntent,
    identifier: &ResourceIdentifier,
    payload: Vec<DataNode>,
) -> RestconfResult<()> {
    match intent {
        EditIntent::Create => {
            let children = children_mut(roots, identifier.elements(), true)?;
            if let Some(existing) = payload
                .iter()
                .find(|node| children.iter().any(|c| c.name() == node.name()))
            {
                return Err(RestconfError::Conflict(format!(
                    "{}/{}",
                    identifier,
                    existing.name()
                )));
            }
            children.extend(payload);
        }
        EditIntent::Replace => {
            let children = children_mut(roots, identifier.elements(), true)?;
            for node in payload {
                match children.iter().position(|c| c.name() == node.name()) {
                    Some(index) => children[index] = node,
                    None => children.push(node),
                }
            }
        }
        EditIntent::Delete => remove(roots, identifier)?,
    }
    Ok(())
}

/// Leading leaf values of a list entry equal `keys`
fn entry_matches(entry: &[DataNode], keys: &[String]) -> bool {
    let leaves: Vec<&str> = entry
        .iter()
        .filter_map(|node| match node {
            DataNode::Leaf { value, .. } => Some(value.as_str()),
            _ => None,
        })
        .take(keys.len())
        .collect();
    leaves.len() == keys.len() && leaves.iter().zip(keys).all(|(l, k)| *l == k)
}

fn find(nodes: &[DataNode], elements: &[PathElement]) -> Option<DataNode> {
    let (element, rest) = elements.split_first()?;
    let node = nodes.iter().find(|n| n.name() == element.name)?;

    if !element.is_multi_instance() {
        return match (node, rest.is_empty()) {
            (_, true) => Some(node.clone()),
            (DataNode::Container { children, .. }, false) => find(children, rest),
            _ => None,
        };
    }

    match node {
        DataNode::List { entries, .. } => {
            let entry = entries.iter().find(|e| entry_matches(e, &element.keys))?;
            if rest.is_empty() {
                Some(DataNode::container(&element.name, entry.clone()))
            } else {
                find(entry, rest)
            }
        }
        DataNode::LeafList { values, .. } if rest.is_empty() && element.keys.len() == 1 => values
            .get(&element.keys[0])
            .map(|value| DataNode::leaf_list(&element.name, [value.clone()])),
        _ => None,
    }
}

/// Children of the node addressed by `elements`. With `create`, missing
/// containers along the way are added; list entries are never invented.
fn children_mut<'a>(
    nodes: &'a mut Vec<DataNode>,
    elements: &[PathElement],
    create: bool,
) -> RestconfResult<&'a mut Vec<DataNode>> {
    let Some((element, rest)) = elements.split_first() else {
        return Ok(nodes);
    };
    let position = nodes.iter().position(|n| n.name() == element.name);

    let children = if element.is_multi_instance() {
        let index = position.ok_or_else(|| missing(element))?;
        match &mut nodes[index] {
            DataNode::List { entries, .. } => entries
                .iter_mut()
                .find(|e| entry_matches(e, &element.keys))
                .ok_or_else(|| missing(element))?,
            other => return Err(not_a_parent(element, other)),
        }
    } else {
        let index = match position {
            Some(index) => index,
            None if create => {
                nodes.push(DataNode::container(&element.name, Vec::new()));
                nodes.len() - 1
            }
            None => return Err(missing(element)),
        };
        match &mut nodes[index] {
            DataNode::Container { children, .. } => children,
            other => return Err(not_a_parent(element, other)),
        }
    };

    children_mut(children, rest, create)
}

fn remove(roots: &mut Vec<DataNode>, identifier: &ResourceIdentifier) -> RestconfResult<()> {
    let Some((target, parents)) = identifier.elements().split_last() else {
        return Err(RestconfError::NotFound(identifier.to_string()));
    };
    let siblings = children_mut(roots, parents, false)?;
    let not_found = || RestconfError::NotFound(identifier.to_string());

    if !target.is_multi_instance() {
        let before = siblings.len();
        siblings.retain(|n| n.name() != target.name);
        return if siblings.len() < before {
            Ok(())
        } else {
            Err(not_found())
        };
    }

    let index = siblings
        .iter()
        .position(|n| n.name() == target.name)
        .ok_or_else(not_found)?;
    let removed = match &mut siblings[index] {
        DataNode::List { entries, .. } => {
            let before = entries.len();
            entries.retain(|e| !entry_matches(e, &target.keys));
            entries.len() < before
        }
        DataNode::LeafList { values, .. } => {
            target.keys.len() == 1 && values.remove(&target.keys[0])
        }
        _ => false,
    };

    if removed {
        Ok(())
    } else {
        Err(not_found())
    }
}

fn missing(element: &PathElement) -> RestconfError {
    RestconfError::NotFound(element.to_string())
}

fn not_a_parent(element: &PathElement, node: &DataNode) -> RestconfError {
    RestconfError::TreeEngineFailure(format!(
        "'{}' is a {}, it cannot hold child nodes",
        element.name,
        node.kind()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use restconf_core::NotificationKind;

    fn id(path: &str) -> ResourceIdentifier {
        ResourceIdentifier::from_data_path(path).unwrap()
    }

    fn seeded() -> MemoryEngine {
        MemoryEngine::with_data(vec![DataNode::container(
            "top",
            vec![
                DataNode::list(
                    "interface",
                    vec![
                        vec![DataNode::leaf("name", "eth0"), DataNode::leaf("mtu", "1500")],
                        vec![DataNode::leaf("name", "eth1"), DataNode::leaf("mtu", "9000")],
                    ],
                ),
                DataNode::leaf_list("dns", ["10.0.0.1", "10.0.0.2"]),
            ],
        )])
    }

    async fn query(engine: &MemoryEngine, path: &str) -> Option<DataNode> {
        engine.execute(DataRequest::query(id(path))).await.unwrap()
    }

    #[tokio::test]
    async fn test_query_container_and_list_entry() {
        let engine = seeded();

        let top = query(&engine, "/test:top").await.unwrap();
        assert_eq!(top.name(), "top");

        let entry = query(&engine, "/test:top/interface=eth1").await.unwrap();
        assert_eq!(
            entry,
            DataNode::container(
                "interface",
                vec![DataNode::leaf("name", "eth1"), DataNode::leaf("mtu", "9000")]
            )
        );

        let mtu = query(&engine, "/test:top/interface=eth0/mtu").await.unwrap();
        assert_eq!(mtu, DataNode::leaf("mtu", "1500"));

        let dns = query(&engine, "/test:top/dns=10.0.0.2").await.unwrap();
        assert_eq!(dns, DataNode::leaf_list("dns", ["10.0.0.2"]));

        assert!(query(&engine, "/test:top/interface=eth9").await.is_none());
        assert!(query(&engine, "/test:other").await.is_none());
    }

    #[tokio::test]
    async fn test_create_adds_missing_containers() {
        let engine = MemoryEngine::default();
        engine
            .execute(DataRequest::edit(
                EditIntent::Create,
                id("/test:top/system"),
                vec![DataNode::leaf("hostname", "gw")],
            ))
            .await
            .unwrap();

        assert_eq!(
            engine.snapshot(),
            vec![DataNode::container(
                "top",
                vec![DataNode::container(
                    "system",
                    vec![DataNode::leaf("hostname", "gw")]
                )]
            )]
        );
    }

    #[tokio::test]
    async fn test_create_of_existing_node_conflicts() {
        let engine = seeded();
        let err = engine
            .execute(DataRequest::edit(
                EditIntent::Create,
                id("/test:top"),
                vec![DataNode::leaf_list("dns", ["8.8.8.8"])],
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, RestconfError::Conflict(ref target) if target == "/test:top/dns"));
    }

    #[tokio::test]
    async fn test_replace_overwrites_in_place() {
        let engine = seeded();
        engine
            .execute(DataRequest::edit(
                EditIntent::Replace,
                id("/test:top/interface=eth0"),
                vec![DataNode::leaf("mtu", "1400")],
            ))
            .await
            .unwrap();

        let mtu = query(&engine, "/test:top/interface=eth0/mtu").await.unwrap();
        assert_eq!(mtu, DataNode::leaf("mtu", "1400"));
    }

    #[tokio::test]
    async fn test_edit_through_a_leaf_fails() {
        let engine = seeded();
        let err = engine
            .execute(DataRequest::edit(
                EditIntent::Replace,
                id("/test:top/dns/x"),
                vec![DataNode::leaf("a", "1")],
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, RestconfError::TreeEngineFailure(_)));
    }

    #[tokio::test]
    async fn test_failed_edit_leaves_datastore_unchanged() {
        let engine = MemoryEngine::default();
        let mut events = engine.notifications().unwrap();

        let err = engine
            .execute(DataRequest::edit(
                EditIntent::Create,
                id("/m:fresh/list=1"),
                vec![DataNode::leaf("a", "1")],
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, RestconfError::NotFound(_)));
        assert!(engine.snapshot().is_empty());
        assert!(events.try_recv().is_err());

        let engine = seeded();
        let before = engine.snapshot();
        let err = engine
            .execute(DataRequest::edit(
                EditIntent::Replace,
                id("/test:top/new/interface=eth0"),
                vec![DataNode::leaf("a", "1")],
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, RestconfError::NotFound(_)));
        assert_eq!(engine.snapshot(), before);
    }

    #[tokio::test]
    async fn test_delete_entry_value_and_node() {
        let engine = seeded();
        let delete = |path: &str| DataRequest::edit(EditIntent::Delete, id(path), Vec::new());

        engine.execute(delete("/test:top/interface=eth0")).await.unwrap();
        assert!(query(&engine, "/test:top/interface=eth0").await.is_none());
        assert!(query(&engine, "/test:top/interface=eth1").await.is_some());

        engine.execute(delete("/test:top/dns=10.0.0.1")).await.unwrap();
        assert_eq!(
            query(&engine, "/test:top/dns").await.unwrap(),
            DataNode::leaf_list("dns", ["10.0.0.2"])
        );

        engine.execute(delete("/test:top")).await.unwrap();
        assert!(engine.snapshot().is_empty());

        assert!(matches!(
            engine.execute(delete("/test:top")).await,
            Err(RestconfError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_edits_are_announced() {
        let engine = MemoryEngine::default();
        let mut events = engine.notifications().unwrap();

        engine
            .execute(DataRequest::edit(
                EditIntent::Replace,
                id("/test:top"),
                vec![DataNode::leaf("a", "1")],
            ))
            .await
            .unwrap();

        let event = events.recv().await.unwrap();
        assert_eq!(event.kind, NotificationKind::YangNotification);
        assert_eq!(
            event.data,
            json!({"data-change": {"operation": "replace", "target": "/test:top"}})
        );
    }
}
