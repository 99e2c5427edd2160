//! Exposed event-log records and their reference-counted handles.
//!
//! ## Design
//!
//! A record is published once, observed concurrently through its attribute
//! files, and destroyed when its last strong reference drops. The reference
//! held on behalf of the creator lives inside the record itself as a
//! *registration credit*: a strong self-reference installed at registration
//! time and surrendered exactly once, by the acknowledge doorbell or by
//! registry teardown. The release hook runs in `Drop`, so it fires exactly
//! once, exactly at the one-to-zero transition, and never while any handler
//! still holds the record.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::registry::Registry;
use crate::{NodeId, NodeSpace};

/// Kind code carried by every record.
///
/// Codes are open-ended: the label mapping is total, and codes without a
/// known label render as `"unknown"` rather than failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordKind(u64);

impl RecordKind {
    /// Platform error log.
    pub const PEL: RecordKind = RecordKind(0);

    pub const fn new(code: u64) -> Self {
        Self(code)
    }

    #[inline]
    pub const fn code(self) -> u64 {
        self.0
    }

    /// Human-readable label for this kind. Total over all codes.
    pub fn label(self) -> &'static str {
        match self.0 {
            0 => "PEL",
            _ => "unknown",
        }
    }
}

/// Lifecycle states of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordState {
    /// Allocated but not yet visible.
    Unregistered = 0,
    /// Published under the container; attributes reachable.
    Registered = 1,
    /// Doorbell rung or teardown begun; the registration credit is gone or
    /// about to go, no new removal may start.
    Removing = 2,
    /// Terminal; set by the release hook.
    Released = 3,
}

impl RecordState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => RecordState::Unregistered,
            1 => RecordState::Registered,
            2 => RecordState::Removing,
            _ => RecordState::Released,
        }
    }
}

/// An exposed event-log record.
///
/// Owns its payload buffer exclusively; the buffer is only ever copied out
/// through the `raw` attribute, never aliased out. The node id is a
/// back-reference and grants no lifetime.
pub struct EventRecord {
    id: u64,
    kind: RecordKind,
    payload: Box<[u8]>,
    node: NodeId,
    state: AtomicU8,
    /// Registration credit: the strong self-reference standing for the
    /// creator's hold. `None` once surrendered.
    credit: Mutex<Option<RecordRef>>,
    nodes: Arc<dyn NodeSpace>,
    registry: Weak<Registry>,
}

impl EventRecord {
    pub(crate) fn new(
        id: u64,
        kind: RecordKind,
        payload: Box<[u8]>,
        node: NodeId,
        nodes: Arc<dyn NodeSpace>,
        registry: Weak<Registry>,
    ) -> Self {
        Self {
            id,
            kind,
            payload,
            node,
            state: AtomicU8::new(RecordState::Unregistered as u8),
            credit: Mutex::new(None),
            nodes,
            registry,
        }
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    #[inline]
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// The payload bytes delivered with the record.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn state(&self) -> RecordState {
        RecordState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn nodes(&self) -> &Arc<dyn NodeSpace> {
        &self.nodes
    }

    pub(crate) fn mark_registered(&self) {
        self.state
            .store(RecordState::Registered as u8, Ordering::Release);
    }

    /// Try to transition `Registered -> Removing`. Exactly one caller wins
    /// when removals race; the losers must not touch the credit.
    pub(crate) fn begin_removal(&self) -> bool {
        self.state
            .compare_exchange(
                RecordState::Registered as u8,
                RecordState::Removing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Surrender the registration credit.
    ///
    /// The caller must hold a strong reference of its own, so the drop here
    /// can never be the final one while `&self` is live.
    pub(crate) fn surrender_credit(&self) {
        let credit = self.credit.lock().unwrap().take();
        drop(credit);
    }
}

impl Drop for EventRecord {
    fn drop(&mut self) {
        self.state
            .store(RecordState::Released as u8, Ordering::Release);
        if let Some(registry) = self.registry.upgrade() {
            registry.forget(self.node);
        }
        self.nodes.release_node(self.node);
        log::debug!("record 0x{:x} released", self.id);
    }
}

impl core::fmt::Debug for EventRecord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventRecord")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("node", &self.node)
            .field("state", &self.state())
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

/// Strong handle to an [`EventRecord`].
///
/// `retain` and `release` are the whole counting discipline: `release`
/// consumes the handle, so a holder cannot release more credits than it
/// owns.
#[derive(Debug)]
pub struct RecordRef(Arc<EventRecord>);

impl RecordRef {
    pub(crate) fn from_arc(record: Arc<EventRecord>) -> Self {
        Self(record)
    }

    /// Take an additional reference.
    pub fn retain(&self) -> RecordRef {
        RecordRef(Arc::clone(&self.0))
    }

    /// Give this reference up. If it was the last, the release hook runs.
    pub fn release(self) {}

    /// Current strong count, observable for tests and diagnostics.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    pub(crate) fn downgrade(&self) -> Weak<EventRecord> {
        Arc::downgrade(&self.0)
    }

    /// Install the registration credit and publish the record.
    pub(crate) fn install_credit(&self) {
        *self.0.credit.lock().unwrap() = Some(self.retain());
        self.0.mark_registered();
    }
}

impl Clone for RecordRef {
    fn clone(&self) -> Self {
        self.retain()
    }
}

impl core::ops::Deref for RecordRef {
    type Target = EventRecord;

    fn deref(&self) -> &EventRecord {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_labels_are_total() {
        assert_eq!(RecordKind::PEL.label(), "PEL");
        assert_eq!(RecordKind::new(0).label(), "PEL");
        assert_eq!(RecordKind::new(1).label(), "unknown");
        assert_eq!(RecordKind::new(0xdead_beef).label(), "unknown");
        assert_eq!(RecordKind::new(u64::MAX).label(), "unknown");
    }

    #[test]
    fn test_kind_code_round_trip() {
        assert_eq!(RecordKind::new(7).code(), 7);
        assert_eq!(RecordKind::PEL.code(), 0);
    }

    #[test]
    fn test_state_from_raw() {
        assert_eq!(RecordState::from_u8(0), RecordState::Unregistered);
        assert_eq!(RecordState::from_u8(1), RecordState::Registered);
        assert_eq!(RecordState::from_u8(2), RecordState::Removing);
        assert_eq!(RecordState::from_u8(3), RecordState::Released);
    }
}
