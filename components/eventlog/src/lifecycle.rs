//! Record lifecycle: creation, registration, and the self-removal protocol.
//!
//! ## Design
//!
//! `create_and_register` is the producer boundary: one call per event that
//! needs exposure. Failure of any step leaves no observable partial record,
//! because the fallible payload copy happens before the node exists and
//! nothing after node registration can fail.
//!
//! `self_remove` is the doorbell path. It runs *inside* a store handler that
//! is executing on the very record being removed, so the ordering is rigid:
//!
//! 1. win the `Registered -> Removing` transition (racing doorbells and
//!    teardown arbitrate here; losers return immediately),
//! 2. unpublish the attribute, so no new dispatch can reach it,
//! 3. surrender the registration credit.
//!
//! The credit drop can free the record only after the dispatch bridge lets go
//! of the strong reference it took when it resolved the node, which is after
//! the handler (and this function) have returned.

use std::sync::Arc;

use crate::attr::{self, AttrDescriptor};
use crate::record::{EventRecord, RecordKind, RecordRef};
use crate::registry::Registry;
use crate::{EventLogError, Result};

/// Allocate, publish, and enroll a new record.
///
/// The node is named by the record's identity in lowercase hex; identities
/// must therefore be unique within one registry. The returned handle is the
/// producer's own reference, independent of the registration credit.
pub fn create_and_register(
    registry: &Arc<Registry>,
    id: u64,
    kind: RecordKind,
    payload: &[u8],
) -> Result<RecordRef> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(payload.len())
        .map_err(|_| EventLogError::AllocationFailed)?;
    buffer.extend_from_slice(payload);

    let name = format!("0x{id:x}");
    let entries = attr::node_entries();
    let node = registry
        .nodes()
        .register_node(Some(registry.container()), &name, &entries)
        .map_err(|err| {
            log::warn!("failed to register record 0x{id:x}: {err}");
            EventLogError::RegistrationFailed(err)
        })?;

    let record = RecordRef::from_arc(Arc::new(EventRecord::new(
        id,
        kind,
        buffer.into_boxed_slice(),
        node,
        Arc::clone(registry.nodes()),
        Arc::downgrade(registry),
    )));
    registry.enroll(node, record.downgrade());
    record.install_credit();
    log::debug!("record 0x{id:x} registered under {:?}", registry.name());
    Ok(record)
}

/// Retire `record` from within a store handler executing on it.
///
/// Only reachable through the acknowledge doorbell; the caller (the dispatch
/// bridge) holds a strong reference for the duration of the handler call, so
/// the record outlives this function even when the credit was the only other
/// reference.
pub(crate) fn self_remove(record: &EventRecord, attr: &AttrDescriptor) {
    if !record.begin_removal() {
        return;
    }
    record.nodes().unregister_attribute(record.node(), attr.name);
    record.surrender_credit();
}
