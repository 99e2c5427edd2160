//! Dispatch bridge: the file-operation entry points the node layer invokes.
//!
//! The bridge resolves `(node, attribute)` to a live record and descriptor,
//! then forwards to the typed handler. It performs no mutation of its own.
//! Resolution takes a strong reference that is held across the handler call
//! and dropped only after the handler's result is in hand; a store handler
//! is free to retire its own record before returning.

use crate::attr::{self, AttrDescriptor, RAW_ATTR};
use crate::record::RecordRef;
use crate::registry::Registry;
use crate::{EventLogError, NodeId, Result};

fn resolve(
    registry: &Registry,
    node: NodeId,
    attr_name: &str,
) -> Result<(RecordRef, &'static AttrDescriptor)> {
    let not_found = || EventLogError::NotFound {
        name: attr_name.into(),
    };
    // Publication probe first: an unpublished attribute must be
    // indistinguishable from one that never existed.
    if registry.nodes().attribute_mode(node, attr_name).is_none() {
        return Err(not_found());
    }
    let record = registry.resolve(node).ok_or_else(not_found)?;
    let desc = attr::lookup(attr_name).ok_or_else(not_found)?;
    Ok((record, desc))
}

/// Read attribute `attr_name` of the record behind `node` into `out`.
///
/// Returns the number of bytes appended.
pub fn handle_show(
    registry: &Registry,
    node: NodeId,
    attr_name: &str,
    out: &mut String,
) -> Result<usize> {
    let (record, desc) = resolve(registry, node, attr_name)?;
    if !desc.op.has_show() {
        return Err(EventLogError::NotReadable);
    }
    desc.op.show(&record, out)
}

/// Write `input` to attribute `attr_name` of the record behind `node`.
///
/// Returns the number of bytes the handler consumed. The handler may retire
/// the record before returning; the bridge's reference is dropped last, after
/// the result is already in hand.
pub fn handle_store(
    registry: &Registry,
    node: NodeId,
    attr_name: &str,
    input: &[u8],
) -> Result<usize> {
    let (record, desc) = resolve(registry, node, attr_name)?;
    if !desc.op.has_store() {
        return Err(EventLogError::NotWritable);
    }
    let result = desc.op.store(&record, desc, input);
    drop(record);
    result
}

/// Windowed read of the record's payload through the `raw` binary attribute.
///
/// Copies at most `out.len()` bytes starting at `offset`; reads at or past
/// the end of the payload return `Ok(0)`.
pub fn handle_read_raw(
    registry: &Registry,
    node: NodeId,
    offset: usize,
    out: &mut [u8],
) -> Result<usize> {
    if registry.nodes().attribute_mode(node, RAW_ATTR.name).is_none() {
        return Err(EventLogError::NotFound {
            name: RAW_ATTR.name.into(),
        });
    }
    let record = registry.resolve(node).ok_or_else(|| EventLogError::NotFound {
        name: RAW_ATTR.name.into(),
    })?;
    let payload = record.payload();
    if offset >= payload.len() {
        return Ok(0);
    }
    let count = out.len().min(payload.len() - offset);
    out[..count].copy_from_slice(&payload[offset..offset + count]);
    Ok(count)
}
