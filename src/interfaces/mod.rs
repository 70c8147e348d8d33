//! Public interfaces.

pub mod doc_store;

pub use doc_store::{CommitOutcome, DocStore, Result, Snapshot, StorageError};
