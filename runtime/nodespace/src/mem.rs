//! In-memory node table backend.
//!
//! Development and test backend for the [`NodeSpace`] contract, in the same
//! spirit as a mocked platform layer: the contract is real, the storage is a
//! mutex-guarded table instead of a filesystem. The optional capacity bound
//! exists so registration-failure paths stay testable.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::{AccessMode, AttrEntry, NodeError, NodeId, NodeSpace, Result};

struct NodeRec {
    name: String,
    parent: Option<NodeId>,
    attrs: Vec<AttrEntry>,
}

/// In-memory implementation of [`NodeSpace`].
pub struct MemNodeSpace {
    nodes: Mutex<BTreeMap<NodeId, NodeRec>>,
    next_id: AtomicU64,
    capacity: Option<usize>,
    releases: AtomicUsize,
}

impl MemNodeSpace {
    /// Create an unbounded node table.
    pub fn new() -> Self {
        Self {
            nodes: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            capacity: None,
            releases: AtomicUsize::new(0),
        }
    }

    /// Create a node table that refuses registrations beyond `capacity`
    /// live nodes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::new()
        }
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.lock().unwrap().len()
    }

    /// True if no node is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True while `node` is registered.
    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.lock().unwrap().contains_key(&node)
    }

    /// Name of a live node.
    pub fn node_name(&self, node: NodeId) -> Option<String> {
        self.nodes.lock().unwrap().get(&node).map(|rec| rec.name.clone())
    }

    /// Children of `parent`, in id order.
    pub fn children(&self, parent: NodeId) -> Vec<(NodeId, String)> {
        self.nodes
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, rec)| rec.parent == Some(parent))
            .map(|(id, rec)| (*id, rec.name.clone()))
            .collect()
    }

    /// Still-published attributes of a live node.
    pub fn attributes(&self, node: NodeId) -> Vec<AttrEntry> {
        self.nodes
            .lock()
            .unwrap()
            .get(&node)
            .map(|rec| rec.attrs.clone())
            .unwrap_or_default()
    }

    /// Total number of nodes released so far.
    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::Acquire)
    }
}

impl Default for MemNodeSpace {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeSpace for MemNodeSpace {
    fn register_node(
        &self,
        parent: Option<NodeId>,
        name: &str,
        attrs: &[AttrEntry],
    ) -> Result<NodeId> {
        let mut nodes = self.nodes.lock().unwrap();

        if let Some(capacity) = self.capacity {
            if nodes.len() >= capacity {
                return Err(NodeError::Exhausted { capacity });
            }
        }
        if let Some(parent) = parent {
            if !nodes.contains_key(&parent) {
                return Err(NodeError::NoSuchNode(parent));
            }
        }
        let taken = nodes
            .values()
            .any(|rec| rec.parent == parent && rec.name == name);
        if taken {
            return Err(NodeError::NameTaken { name: name.into() });
        }

        let id = NodeId::from_raw(self.next_id.fetch_add(1, Ordering::Relaxed));
        nodes.insert(
            id,
            NodeRec {
                name: name.into(),
                parent,
                attrs: attrs.to_vec(),
            },
        );
        log::debug!("registered {id} as {name:?}");
        Ok(id)
    }

    fn unregister_attribute(&self, node: NodeId, name: &str) {
        if let Some(rec) = self.nodes.lock().unwrap().get_mut(&node) {
            rec.attrs.retain(|attr| attr.name != name);
        }
    }

    fn release_node(&self, node: NodeId) {
        if self.nodes.lock().unwrap().remove(&node).is_some() {
            self.releases.fetch_add(1, Ordering::AcqRel);
            log::debug!("released {node}");
        } else {
            log::warn!("release of unknown {node} ignored");
        }
    }

    fn attribute_mode(&self, node: NodeId, name: &str) -> Option<AccessMode> {
        self.nodes
            .lock()
            .unwrap()
            .get(&node)?
            .attrs
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ATTRS: &[AttrEntry] = &[
        AttrEntry {
            name: "id",
            mode: AccessMode::READ,
        },
        AttrEntry {
            name: "acknowledge",
            mode: AccessMode::RW,
        },
    ];

    #[test]
    fn test_register_and_probe() {
        let space = MemNodeSpace::new();
        let top = space.register_node(None, "elog", &[]).unwrap();
        let node = space.register_node(Some(top), "0x1", ATTRS).unwrap();

        assert_eq!(space.attribute_mode(node, "id"), Some(AccessMode::READ));
        assert_eq!(
            space.attribute_mode(node, "acknowledge"),
            Some(AccessMode::RW)
        );
        assert_eq!(space.attribute_mode(node, "missing"), None);
        assert_eq!(space.node_name(node).as_deref(), Some("0x1"));
        assert_eq!(space.children(top), vec![(node, "0x1".into())]);
    }

    #[test]
    fn test_sibling_names_must_be_unique() {
        let space = MemNodeSpace::new();
        let top = space.register_node(None, "elog", &[]).unwrap();
        space.register_node(Some(top), "0x1", ATTRS).unwrap();

        let err = space.register_node(Some(top), "0x1", ATTRS).unwrap_err();
        assert_eq!(err, NodeError::NameTaken { name: "0x1".into() });

        // Same name under a different parent is fine.
        let other = space.register_node(None, "other", &[]).unwrap();
        space.register_node(Some(other), "0x1", ATTRS).unwrap();
    }

    #[test]
    fn test_unknown_parent_rejected() {
        let space = MemNodeSpace::new();
        let ghost = NodeId::from_raw(999);
        let err = space.register_node(Some(ghost), "0x1", ATTRS).unwrap_err();
        assert_eq!(err, NodeError::NoSuchNode(ghost));
    }

    #[test]
    fn test_capacity_bound() {
        let space = MemNodeSpace::with_capacity(1);
        space.register_node(None, "elog", &[]).unwrap();
        let err = space.register_node(None, "full", &[]).unwrap_err();
        assert_eq!(err, NodeError::Exhausted { capacity: 1 });
    }

    #[test]
    fn test_unregister_attribute_hides_only_that_file() {
        let space = MemNodeSpace::new();
        let node = space.register_node(None, "0x1", ATTRS).unwrap();

        space.unregister_attribute(node, "acknowledge");
        assert_eq!(space.attribute_mode(node, "acknowledge"), None);
        assert_eq!(space.attribute_mode(node, "id"), Some(AccessMode::READ));

        // Unpublishing twice is harmless.
        space.unregister_attribute(node, "acknowledge");
        assert_eq!(space.attribute_mode(node, "id"), Some(AccessMode::READ));
    }

    #[test]
    fn test_release_counts_each_node_once() {
        let space = MemNodeSpace::new();
        let node = space.register_node(None, "0x1", ATTRS).unwrap();
        assert_eq!(space.release_count(), 0);

        space.release_node(node);
        assert_eq!(space.release_count(), 1);
        assert!(!space.contains(node));
        assert_eq!(space.attribute_mode(node, "id"), None);

        // A second release of the same id is ignored, not counted.
        space.release_node(node);
        assert_eq!(space.release_count(), 1);
    }

    #[test]
    fn test_ids_are_never_reused() {
        let space = MemNodeSpace::new();
        let first = space.register_node(None, "a", &[]).unwrap();
        space.release_node(first);
        let second = space.register_node(None, "a", &[]).unwrap();
        assert_ne!(first, second);
    }
}
