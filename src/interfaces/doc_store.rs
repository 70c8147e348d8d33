//! Document storage interface.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
///
/// A stale proposed version is *not* an error; it is reported as
/// [`CommitOutcome::Conflict`] so callers can re-fetch and retry.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("store is closed")]
    Closed,

    #[error("invalid identifier: {what} must be non-empty")]
    InvalidIdentifier { what: &'static str },

    #[error("invalid snapshot version {version}: snapshot versions start at 1")]
    InvalidVersion { version: u64 },

    #[error("corrupt payload for document {collection}/{id}: {source}")]
    Corrupt {
        collection: String,
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("payload encoding failed: {0}")]
    Encode(serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StorageError {
    /// Whether the failure is a transient serialization problem worth
    /// retrying.
    ///
    /// The locking read in the commit protocol can deadlock under heavy
    /// concurrent load on one document (gap locking on the operation log
    /// index). The store never retries on its own; callers inspect this to
    /// decide. Matches SQLSTATE 40001 (serialization failure, MySQL deadlock),
    /// 40P01 (PostgreSQL deadlock) and SQLITE_BUSY.
    pub fn is_retryable(&self) -> bool {
        let StorageError::Database(sqlx::Error::Database(err)) = self else {
            return false;
        };
        matches!(err.code().as_deref(), Some("40001" | "40P01" | "5"))
    }
}

/// Outcome of a commit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum CommitOutcome {
    /// The operation and snapshot were persisted.
    Committed,
    /// Another writer already advanced the document; nothing was persisted.
    /// The caller should re-fetch and retry with updated data.
    Conflict,
}

impl CommitOutcome {
    pub fn is_conflict(&self) -> bool {
        matches!(self, CommitOutcome::Conflict)
    }
}

/// Materialized state of a document at a version.
///
/// Version 0 means the document has never been committed; such snapshots are
/// synthesized by readers and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Document id within its collection.
    pub id: String,
    /// One-based snapshot version: the number of operations applied.
    pub version: u64,
    /// Document type name, if the document exists.
    pub doc_type: Option<String>,
    /// Materialized document state. `None` for version 0 and for deleted
    /// documents.
    pub data: Option<Value>,
    /// Reserved; not persisted by this store.
    pub metadata: Option<Value>,
}

impl Snapshot {
    /// Snapshot of a document that has never been committed.
    pub fn empty(id: &str) -> Self {
        Self {
            id: id.to_string(),
            version: 0,
            doc_type: None,
            data: None,
            metadata: None,
        }
    }

    /// Proposed snapshot for a commit.
    pub fn new(id: &str, version: u64, doc_type: Option<String>, data: Option<Value>) -> Self {
        Self {
            id: id.to_string(),
            version,
            doc_type,
            data,
            metadata: None,
        }
    }
}

/// Interface for versioned document persistence.
///
/// Implementations:
/// - `SqliteDocStore`: SQLite storage
/// - `PostgresDocStore`: PostgreSQL storage
/// - `MysqlDocStore`: MySQL storage
#[async_trait]
pub trait DocStore: Send + Sync {
    /// Persist an operation and its resulting snapshot if the snapshot is
    /// for the next version of the document.
    ///
    /// Same-document commits serialize on a locking read of the operation
    /// log; a proposed version that is not the next expected version returns
    /// [`CommitOutcome::Conflict`] with no persistent effect.
    async fn commit(
        &self,
        collection: &str,
        id: &str,
        op: &Value,
        snapshot: &Snapshot,
    ) -> Result<CommitOutcome>;

    /// Fetch the current snapshot of a document.
    ///
    /// A document that has never been committed yields a version 0 snapshot,
    /// not an error.
    async fn get_snapshot(&self, collection: &str, id: &str) -> Result<Snapshot>;

    /// Fetch operations in the half-open range `[from, to)`.
    ///
    /// `from`/`to` are the versions a document had *before* each operation
    /// applied (operation `v` produces snapshot `v + 1`). `None` means
    /// unbounded above. Operations are ordered by ascending version.
    async fn get_ops(
        &self,
        collection: &str,
        id: &str,
        from: u64,
        to: Option<u64>,
    ) -> Result<Vec<Value>>;

    /// Fetch operations from `from` up to the version of `snapshot`.
    async fn get_ops_to_snapshot(
        &self,
        collection: &str,
        id: &str,
        from: u64,
        snapshot: &Snapshot,
    ) -> Result<Vec<Value>> {
        self.get_ops(collection, id, from, Some(snapshot.version))
            .await
    }

    /// Mark the store closed for new calls and wind down the pool.
    ///
    /// Idempotent; in-flight operations are allowed to finish.
    async fn close(&self);
}
