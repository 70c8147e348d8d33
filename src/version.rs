//! Version numbering translation.
//!
//! Two numbering schemes coexist: operation-log versions are zero-based and
//! name the state an operation advances *from*; snapshot versions are
//! one-based and count the operations applied. Operation `v` produces
//! snapshot `v + 1`. Every cross-table calculation goes through here.

/// Next legal snapshot version given the highest operation version on
/// record, or `None` when the document has no operations yet.
pub const fn next_snapshot_version(max_op_version: Option<u64>) -> u64 {
    match max_op_version {
        Some(v) => v + 2,
        None => 1,
    }
}

/// Operation-log version recorded for a commit proposing `snapshot_version`.
///
/// Callers validate `snapshot_version >= 1` before translating.
pub const fn op_version_for(snapshot_version: u64) -> u64 {
    snapshot_version - 1
}

/// Snapshot version produced by applying operation `op_version`.
pub const fn snapshot_version_after(op_version: u64) -> u64 {
    op_version + 1
}
