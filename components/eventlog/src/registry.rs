//! Record registry: one named container node plus weak member tracking.
//!
//! The registry owns only the container. Members keep themselves alive
//! through their registration credits and whatever handles producers hold;
//! the registry tracks them weakly so dispatch can resolve a node to a live
//! record without extending any lifetime.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, Weak};

use crate::record::{EventRecord, RecordRef};
use crate::{EventLogError, NodeId, NodeSpace, Result};

pub struct Registry {
    name: String,
    container: NodeId,
    nodes: Arc<dyn NodeSpace>,
    members: Mutex<BTreeMap<NodeId, Weak<EventRecord>>>,
}

impl Registry {
    /// Create the registry and its container node.
    pub fn create(name: &str, nodes: Arc<dyn NodeSpace>) -> Result<Arc<Registry>> {
        let container = match nodes.register_node(None, name, &[]) {
            Ok(id) => id,
            Err(err) => {
                log::warn!("failed to create container {name:?}: {err}");
                return Err(EventLogError::CreationFailed(err));
            }
        };
        Ok(Arc::new(Self {
            name: name.into(),
            container,
            nodes,
            members: Mutex::new(BTreeMap::new()),
        }))
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The container node all member records hang under.
    #[inline]
    pub fn container(&self) -> NodeId {
        self.container
    }

    pub(crate) fn nodes(&self) -> &Arc<dyn NodeSpace> {
        &self.nodes
    }

    /// Resolve a node to a live member, taking a strong reference that lasts
    /// as long as the returned handle. Returns `None` for unknown nodes and
    /// for members already released.
    pub fn resolve(&self, node: NodeId) -> Option<RecordRef> {
        self.members
            .lock()
            .unwrap()
            .get(&node)?
            .upgrade()
            .map(RecordRef::from_arc)
    }

    /// Number of members still alive.
    pub fn member_count(&self) -> usize {
        self.members
            .lock()
            .unwrap()
            .values()
            .filter(|member| member.strong_count() > 0)
            .count()
    }

    pub(crate) fn enroll(&self, node: NodeId, member: Weak<EventRecord>) {
        self.members.lock().unwrap().insert(node, member);
    }

    pub(crate) fn forget(&self, node: NodeId) {
        self.members.lock().unwrap().remove(&node);
    }

    /// Tear the registry down: surrender every still-registered member's
    /// registration credit, then release the container node.
    ///
    /// Members a producer still holds strongly survive their credit loss and
    /// are released when that handle drops. The member map is drained before
    /// any credit is surrendered so release hooks never contend with it.
    pub fn teardown(&self) {
        let members: Vec<Weak<EventRecord>> = {
            let mut members = self.members.lock().unwrap();
            let drained = members.values().cloned().collect();
            members.clear();
            drained
        };
        for member in members {
            if let Some(record) = member.upgrade() {
                if record.begin_removal() {
                    record.surrender_credit();
                }
            }
        }
        self.nodes.release_node(self.container);
        log::debug!("registry {:?} torn down", self.name);
    }
}

impl core::fmt::Debug for Registry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Registry")
            .field("name", &self.name)
            .field("container", &self.container)
            .field("members", &self.member_count())
            .finish()
    }
}
