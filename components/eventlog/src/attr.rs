//! Attribute descriptors and the record attribute table.
//!
//! Purely declarative: a fixed, ordered set of named attributes shared by
//! every record, each carrying its show/store behavior as a variant of
//! [`AttrOp`]. The table is never mutated; lookup's only failure mode is
//! "not found".

use core::fmt::Write as _;

use static_assertions::const_assert;

use crate::record::EventRecord;
use crate::{AccessMode, AttrEntry, EventLogError, Result};

/// Usage string shown when reading the `acknowledge` doorbell.
pub const ACK_USAGE: &str = "ack - acknowledge log message\n";

/// Immutable description of one named attribute file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttrDescriptor {
    pub name: &'static str,
    pub mode: AccessMode,
    pub op: AttrOp,
}

/// Behavior of a known attribute.
///
/// Show and store presence is a total function of the variant; the dispatch
/// bridge checks presence before invoking, and the table below keeps mode
/// bits and presence consistent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrOp {
    /// Record identity, `"0x%x\n"` lowercase hex.
    Id,
    /// Kind code and label, `"0x%x <label>\n"`.
    Kind,
    /// Doorbell: show prints a usage line; store retires the record.
    Acknowledge,
}

impl AttrOp {
    pub(crate) fn has_show(self) -> bool {
        matches!(self, AttrOp::Id | AttrOp::Kind | AttrOp::Acknowledge)
    }

    pub(crate) fn has_store(self) -> bool {
        matches!(self, AttrOp::Acknowledge)
    }

    /// Render this attribute for `record` into `out`, returning the number
    /// of bytes written. Rendering into a `String` cannot fail.
    pub(crate) fn show(self, record: &EventRecord, out: &mut String) -> Result<usize> {
        let start = out.len();
        match self {
            AttrOp::Id => {
                let _ = writeln!(out, "0x{:x}", record.id());
            }
            AttrOp::Kind => {
                let kind = record.kind();
                let _ = writeln!(out, "0x{:x} {}", kind.code(), kind.label());
            }
            AttrOp::Acknowledge => out.push_str(ACK_USAGE),
        }
        Ok(out.len() - start)
    }

    /// Apply a store of `input` to `record`. The doorbell ignores the input
    /// content entirely and reports the full input length as consumed.
    pub(crate) fn store(
        self,
        record: &EventRecord,
        desc: &AttrDescriptor,
        input: &[u8],
    ) -> Result<usize> {
        match self {
            AttrOp::Id | AttrOp::Kind => Err(EventLogError::NotWritable),
            AttrOp::Acknowledge => {
                crate::lifecycle::self_remove(record, desc);
                Ok(input.len())
            }
        }
    }
}

/// The attribute table bound to every record node, in display order.
pub const RECORD_ATTRS: &[AttrDescriptor] = &[
    AttrDescriptor {
        name: "id",
        mode: AccessMode::READ,
        op: AttrOp::Id,
    },
    AttrDescriptor {
        name: "type",
        mode: AccessMode::READ,
        op: AttrOp::Kind,
    },
    AttrDescriptor {
        name: "acknowledge",
        mode: AccessMode::RW,
        op: AttrOp::Acknowledge,
    },
];

const_assert!(RECORD_ATTRS.len() == 3);
const_assert!(RECORD_ATTRS[2].mode.bits() == AccessMode::RW.bits());

/// Description of one binary attribute file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinAttrDescriptor {
    pub name: &'static str,
    pub mode: AccessMode,
}

/// The windowed read-only view of a record's payload buffer.
pub const RAW_ATTR: BinAttrDescriptor = BinAttrDescriptor {
    name: "raw",
    mode: AccessMode::READ,
};

/// Find a text attribute by name.
pub fn lookup(name: &str) -> Option<&'static AttrDescriptor> {
    RECORD_ATTRS.iter().find(|desc| desc.name == name)
}

/// The full file surface a record node registers with the node layer.
pub(crate) fn node_entries() -> Vec<AttrEntry> {
    RECORD_ATTRS
        .iter()
        .map(|desc| AttrEntry {
            name: desc.name,
            mode: desc.mode,
        })
        .chain([AttrEntry {
            name: RAW_ATTR.name,
            mode: RAW_ATTR.mode,
        }])
        .collect()
}
