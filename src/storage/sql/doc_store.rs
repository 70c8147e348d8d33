//! Unified SQL document store implementation.
//!
//! One generic struct carries the pool and table names; a macro generates
//! the trait implementation for each SQL backend, eliminating duplication
//! while keeping the executor types concrete.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};

use sea_query::{
    Alias, Expr, InsertStatement, Order, Query, SelectStatement, UpdateStatement,
};

use crate::config::StoreConfig;
use crate::interfaces::{Result, Snapshot, StorageError};
use crate::storage::schema::{Ops, Snapshots};
use crate::version;

use super::SqlDatabase;

/// SQL-based implementation of [`DocStore`].
///
/// This generic implementation works with any SQL database that implements
/// the [`SqlDatabase`] trait (SQLite, PostgreSQL, MySQL). Table names come
/// from [`StoreConfig`]; one store instance owns one pool, so several store
/// instances in a process never share state.
///
/// [`DocStore`]: crate::interfaces::DocStore
pub struct SqlDocStore<DB: SqlDatabase> {
    pool: DB::Pool,
    ops_table: String,
    snapshots_table: String,
    debug: bool,
    closed: AtomicBool,
    _marker: PhantomData<DB>,
}

impl<DB: SqlDatabase> SqlDocStore<DB> {
    /// Create a new SQL document store over the given pool.
    pub fn new(pool: DB::Pool, config: &StoreConfig) -> Self {
        Self {
            pool,
            ops_table: config.ops_table.clone(),
            snapshots_table: config.snapshots_table.clone(),
            debug: config.debug,
            closed: AtomicBool::new(false),
            _marker: PhantomData,
        }
    }

    /// Get the underlying pool.
    pub fn pool(&self) -> &DB::Pool {
        &self.pool
    }

    /// Whether [`close`] has been called.
    ///
    /// [`close`]: crate::interfaces::DocStore::close
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(StorageError::Closed);
        }
        Ok(())
    }

    fn validate_doc_key(collection: &str, id: &str) -> Result<()> {
        if collection.is_empty() {
            return Err(StorageError::InvalidIdentifier { what: "collection" });
        }
        if id.is_empty() {
            return Err(StorageError::InvalidIdentifier { what: "id" });
        }
        Ok(())
    }

    fn ops(&self) -> Alias {
        Alias::new(&self.ops_table)
    }

    fn snapshots(&self) -> Alias {
        Alias::new(&self.snapshots_table)
    }

    fn corrupt(&self, collection: &str, id: &str, source: serde_json::Error) -> StorageError {
        StorageError::Corrupt {
            collection: collection.to_string(),
            id: id.to_string(),
            source,
        }
    }

    /// `SELECT max(version)` over the document's operations. Built into a
    /// locking select by the commit path.
    fn max_op_version_stmt(&self, collection: &str, id: &str) -> SelectStatement {
        Query::select()
            .expr(Expr::col(Ops::Version).max())
            .from(self.ops())
            .and_where(Expr::col(Ops::Collection).eq(collection))
            .and_where(Expr::col(Ops::DocId).eq(id))
            .to_owned()
    }

    fn insert_op_stmt(
        &self,
        collection: &str,
        id: &str,
        op_version: u64,
        op_text: &str,
    ) -> InsertStatement {
        Query::insert()
            .into_table(self.ops())
            .columns([Ops::Collection, Ops::DocId, Ops::Version, Ops::Operation])
            .values_panic([
                collection.into(),
                id.into(),
                (op_version as i64).into(),
                op_text.into(),
            ])
            .to_owned()
    }

    fn insert_snapshot_stmt(
        &self,
        collection: &str,
        id: &str,
        snapshot: &Snapshot,
        data_text: &Option<String>,
    ) -> InsertStatement {
        let created_at = chrono::Utc::now().to_rfc3339();

        Query::insert()
            .into_table(self.snapshots())
            .columns([
                Snapshots::Collection,
                Snapshots::DocId,
                Snapshots::DocType,
                Snapshots::Version,
                Snapshots::Data,
                Snapshots::CreatedAt,
            ])
            .values_panic([
                collection.into(),
                id.into(),
                snapshot.doc_type.clone().into(),
                (snapshot.version as i64).into(),
                data_text.clone().into(),
                created_at.into(),
            ])
            .to_owned()
    }

    /// Update the existing snapshot row in place. Matching on the prior
    /// version guards against touching anything but the state this commit
    /// was validated against. `created_at` is never rewritten.
    fn update_snapshot_stmt(
        &self,
        collection: &str,
        id: &str,
        snapshot: &Snapshot,
        data_text: &Option<String>,
    ) -> UpdateStatement {
        Query::update()
            .table(self.snapshots())
            .value(Snapshots::DocType, snapshot.doc_type.clone())
            .value(Snapshots::Version, snapshot.version as i64)
            .value(Snapshots::Data, data_text.clone())
            .and_where(Expr::col(Snapshots::Collection).eq(collection))
            .and_where(Expr::col(Snapshots::DocId).eq(id))
            .and_where(Expr::col(Snapshots::Version).eq((snapshot.version - 1) as i64))
            .to_owned()
    }

    fn select_snapshot_stmt(&self, collection: &str, id: &str) -> SelectStatement {
        Query::select()
            .column(Snapshots::Version)
            .column(Snapshots::DocType)
            .column(Snapshots::Data)
            .from(self.snapshots())
            .and_where(Expr::col(Snapshots::Collection).eq(collection))
            .and_where(Expr::col(Snapshots::DocId).eq(id))
            .limit(1)
            .to_owned()
    }

    fn select_ops_stmt(
        &self,
        collection: &str,
        id: &str,
        from: u64,
        to: Option<u64>,
    ) -> SelectStatement {
        let mut stmt = Query::select()
            .column(Ops::Operation)
            .from(self.ops())
            .and_where(Expr::col(Ops::Collection).eq(collection))
            .and_where(Expr::col(Ops::DocId).eq(id))
            .and_where(Expr::col(Ops::Version).gte(from as i64))
            .order_by(Ops::Version, Order::Asc)
            .to_owned();

        if let Some(to) = to {
            stmt.and_where(Expr::col(Ops::Version).lt(to as i64));
        }

        stmt
    }
}

/// Macro to implement DocStore for a specific SQL backend.
///
/// The statement builders above are backend-neutral; only the executing
/// code needs the concrete pool type.
macro_rules! impl_doc_store {
    ($db_type:ty, $feature:literal) => {
        #[cfg(feature = $feature)]
        impl SqlDocStore<$db_type> {
            /// Create the operation log and snapshots tables if absent.
            pub async fn init(&self) -> crate::interfaces::Result<()> {
                let sql = <$db_type>::build_create_table(crate::storage::schema::create_ops_table(
                    &self.ops_table,
                ));
                sqlx::query(&sql).execute(&self.pool).await?;

                let sql = <$db_type>::build_create_table(
                    crate::storage::schema::create_snapshots_table(&self.snapshots_table),
                );
                sqlx::query(&sql).execute(&self.pool).await?;

                Ok(())
            }
        }

        #[cfg(feature = $feature)]
        #[async_trait::async_trait]
        impl crate::interfaces::DocStore for SqlDocStore<$db_type> {
            async fn commit(
                &self,
                collection: &str,
                id: &str,
                op: &serde_json::Value,
                snapshot: &Snapshot,
            ) -> Result<crate::interfaces::CommitOutcome> {
                use crate::interfaces::CommitOutcome;
                use sqlx::{Acquire, Row};

                self.ensure_open()?;
                Self::validate_doc_key(collection, id)?;
                if snapshot.version == 0 {
                    return Err(StorageError::InvalidVersion { version: 0 });
                }

                let op_text = serde_json::to_string(op).map_err(StorageError::Encode)?;
                let data_text = snapshot
                    .data
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()
                    .map_err(StorageError::Encode)?;

                let mut conn = self.pool.acquire().await?;
                if self.debug {
                    tracing::debug!(collection, id, version = snapshot.version, "commit begin");
                }
                let mut tx = conn.begin().await?;

                // Locking read of the document's max operation version: the
                // serialization point. Concurrent commits to the same
                // document block here until this transaction ends.
                let sql =
                    <$db_type>::build_locking_select(self.max_op_version_stmt(collection, id));
                let row = sqlx::query(&sql).fetch_optional(&mut *tx).await?;
                let max_op_version = match row {
                    Some(row) => row.get::<Option<i64>, _>(0).map(|v| v as u64),
                    None => None,
                };

                let expected = version::next_snapshot_version(max_op_version);
                if snapshot.version != expected {
                    if self.debug {
                        tracing::debug!(
                            collection,
                            id,
                            proposed = snapshot.version,
                            expected,
                            "commit conflict"
                        );
                    }
                    tx.rollback().await?;
                    return Ok(CommitOutcome::Conflict);
                }

                let sql = <$db_type>::build_insert(self.insert_op_stmt(
                    collection,
                    id,
                    version::op_version_for(snapshot.version),
                    &op_text,
                ));
                // With no operation rows yet, the locking read has nothing
                // to lock on PostgreSQL, so two first commits can both pass
                // the version check. The operation log's primary key turns
                // the loser into a conflict.
                match sqlx::query(&sql).execute(&mut *tx).await {
                    Ok(_) => {}
                    Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                        tx.rollback().await?;
                        return Ok(CommitOutcome::Conflict);
                    }
                    Err(e) => return Err(e.into()),
                }

                let sql = if snapshot.version == 1 {
                    <$db_type>::build_insert(
                        self.insert_snapshot_stmt(collection, id, snapshot, &data_text),
                    )
                } else {
                    <$db_type>::build_update(
                        self.update_snapshot_stmt(collection, id, snapshot, &data_text),
                    )
                };
                sqlx::query(&sql).execute(&mut *tx).await?;

                tx.commit().await?;
                Ok(CommitOutcome::Committed)
            }

            async fn get_snapshot(&self, collection: &str, id: &str) -> Result<Snapshot> {
                use sqlx::Row;

                self.ensure_open()?;
                Self::validate_doc_key(collection, id)?;

                let sql = <$db_type>::build_select(self.select_snapshot_stmt(collection, id));
                let row = sqlx::query(&sql).fetch_optional(&self.pool).await?;

                let Some(row) = row else {
                    return Ok(Snapshot::empty(id));
                };

                let snapshot_version: i64 = row.get("version");
                let doc_type: Option<String> = row.get("doc_type");
                let data = match row.get::<Option<String>, _>("data") {
                    Some(text) => Some(
                        serde_json::from_str(&text)
                            .map_err(|e| self.corrupt(collection, id, e))?,
                    ),
                    None => None,
                };

                Ok(Snapshot {
                    id: id.to_string(),
                    version: snapshot_version as u64,
                    doc_type,
                    data,
                    metadata: None,
                })
            }

            async fn get_ops(
                &self,
                collection: &str,
                id: &str,
                from: u64,
                to: Option<u64>,
            ) -> Result<Vec<serde_json::Value>> {
                use sqlx::Row;

                self.ensure_open()?;
                Self::validate_doc_key(collection, id)?;

                let sql =
                    <$db_type>::build_select(self.select_ops_stmt(collection, id, from, to));
                let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

                // Any undecodable payload fails the whole call; partial op
                // ranges are useless to replaying callers.
                let mut ops = Vec::with_capacity(rows.len());
                for row in rows {
                    let text: String = row.get("operation");
                    let op = serde_json::from_str(&text)
                        .map_err(|e| self.corrupt(collection, id, e))?;
                    ops.push(op);
                }

                Ok(ops)
            }

            async fn close(&self) {
                if !self.closed.swap(true, Ordering::SeqCst) {
                    tracing::info!("document store closed");
                }
                self.pool.close().await;
            }
        }
    };
}

impl_doc_store!(super::sqlite::Sqlite, "sqlite");
impl_doc_store!(super::postgres::Postgres, "postgres");
impl_doc_store!(super::mysql::Mysql, "mysql");
