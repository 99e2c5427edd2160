//! Event Log Exposure - Reference-counted attribute publishing for kernel records
//!
//! # Purpose
//! Publishes in-kernel event-log records to user space as directory nodes
//! carrying file-like attributes (`id`, `type`, `acknowledge`, `raw`). Reads
//! and writes on those files dispatch to per-record handlers; a write to the
//! `acknowledge` doorbell retires the record from within its own handler,
//! safely under concurrent access.
//!
//! # Integration Points
//! - Depends on: `sysview-nodespace` (node registration and visibility)
//! - Provides to: event producers (`create_and_register`) and to the node
//!   layer's file-operation entry points (`handle_show` / `handle_store` /
//!   `handle_read_raw`)
//!
//! # Architecture
//! A `Registry` owns one container node and tracks member records weakly.
//! Each record is `Arc`-backed; the count of one held on behalf of the
//! creator lives inside the record itself as a registration credit. Dispatch
//! upgrades the weak member entry for the duration of every handler call, so
//! a doorbell store that surrenders the credit can never free a record while
//! another handler still runs on it.
//!
//! # Testing Strategy
//! - Unit tests: format contracts, table invariants, lifecycle state machine,
//!   error paths
//! - Integration tests: end-to-end acknowledge flow, teardown cascade, racing
//!   doorbell-vs-show stress under scoped threads

use thiserror::Error;

mod attr;
mod dispatch;
mod lifecycle;
mod record;
mod registry;

pub use attr::{lookup, AttrDescriptor, AttrOp, BinAttrDescriptor, ACK_USAGE, RAW_ATTR, RECORD_ATTRS};
pub use dispatch::{handle_read_raw, handle_show, handle_store};
pub use lifecycle::create_and_register;
pub use record::{EventRecord, RecordKind, RecordRef, RecordState};
pub use registry::Registry;

// The node-layer types that appear in this crate's public surface.
pub use sysview_nodespace::{AccessMode, AttrEntry, MemNodeSpace, NodeError, NodeId, NodeSpace};

/// Event log error types
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventLogError {
    #[error("allocation failed")]
    AllocationFailed,

    #[error("registration failed: {0}")]
    RegistrationFailed(NodeError),

    #[error("container creation failed: {0}")]
    CreationFailed(NodeError),

    #[error("attribute not found: {name}")]
    NotFound { name: String },

    #[error("attribute is not readable")]
    NotReadable,

    #[error("attribute is not writable")]
    NotWritable,
}

pub type Result<T> = core::result::Result<T, EventLogError>;
