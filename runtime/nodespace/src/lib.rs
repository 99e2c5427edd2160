//! Virtual Node Layer - Boundary to the filesystem that makes objects visible
//!
//! # Purpose
//! Defines the narrow contract between SysView and whatever subsystem turns a
//! registered node into externally visible paths. Components publish a node
//! with a set of named attribute files; the node layer answers visibility
//! probes for those attributes and retires nodes when their owners release
//! them.
//!
//! # Integration Points
//! - Depends on: nothing above `std`
//! - Provides to: `sysview-eventlog` (dispatch and lifecycle), tests, demo
//! - Backends: `MemNodeSpace` (in-memory node table for development/testing);
//!   a production backend would forward to a real VFS behind the same trait
//!
//! # Architecture
//! `NodeSpace` is the whole surface: register a node under a parent with its
//! attribute entries, unpublish a single attribute, release a node, and probe
//! an attribute's mode. The layer sees attribute names and modes only, never
//! handlers; dispatch stays on the caller's side of the boundary.
//!
//! # Testing Strategy
//! - Unit tests: registration, sibling-name collisions, capacity, visibility
//! - Integration tests: driven from `sysview-eventlog` through the trait

use bitflags::bitflags;
use thiserror::Error;

mod mem;

pub use mem::MemNodeSpace;

bitflags! {
    /// Access mode bits of one attribute file.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AccessMode: u8 {
        const READ = 0b01;
        const WRITE = 0b10;
        const RW = Self::READ.bits() | Self::WRITE.bits();
    }
}

/// Handle to a registered virtual node.
///
/// Back-reference only: holding a `NodeId` grants no lifetime over the object
/// behind it. Ids are assigned monotonically and never reused, so a released
/// node's id can never resolve to a different object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

impl NodeId {
    /// Reconstruct a handle from its raw value.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw value of this handle.
    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl core::fmt::Display for NodeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// An attribute as the node layer sees it: a file name and its mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttrEntry {
    pub name: &'static str,
    pub mode: AccessMode,
}

/// Node layer error types
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NodeError {
    #[error("node name already taken: {name}")]
    NameTaken { name: String },

    #[error("no such node: {0}")]
    NoSuchNode(NodeId),

    #[error("node table exhausted (capacity {capacity})")]
    Exhausted { capacity: usize },
}

pub type Result<T> = core::result::Result<T, NodeError>;

/// The boundary to the virtual-filesystem collaborator.
///
/// Implementations are shared across the threads the filesystem dispatches
/// file operations on.
pub trait NodeSpace: Send + Sync {
    /// Register a node under `parent` (or at the top level) carrying the
    /// given attribute files. Sibling names must be unique.
    fn register_node(
        &self,
        parent: Option<NodeId>,
        name: &str,
        attrs: &[AttrEntry],
    ) -> Result<NodeId>;

    /// Unpublish a single attribute file. After this returns, no new file
    /// operation can reach the attribute; operations already in flight are
    /// unaffected. Unknown nodes and names are ignored.
    fn unregister_attribute(&self, node: NodeId, name: &str);

    /// Retire a node entirely. Invoked by the owner's release path, never
    /// before.
    fn release_node(&self, node: NodeId);

    /// Visibility probe: the mode of a still-published attribute, or `None`
    /// once the attribute is unpublished or the node released. The node layer
    /// performs this check before forwarding any file operation.
    fn attribute_mode(&self, node: NodeId, name: &str) -> Option<AccessMode>;
}
