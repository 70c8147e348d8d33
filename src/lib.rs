//! Foliodb - versioned document store
//!
//! Optimistic-concurrency-controlled persistence for collaboratively-edited
//! documents. Each document is a `(collection, id)` pair backed by an
//! append-only operation log and a materialized snapshot, kept consistent
//! by a transactional commit protocol over a SQL backend.

pub mod config;
pub mod interfaces;
pub mod storage;
pub mod version;

pub use config::StoreConfig;
pub use interfaces::{CommitOutcome, DocStore, Result, Snapshot, StorageError};
