//! Database schema definitions using sea-query.
//!
//! Column identifiers are fixed; table names come from [`StoreConfig`] so
//! the statements are built against a caller-supplied [`Alias`].
//!
//! [`StoreConfig`]: crate::config::StoreConfig

use sea_query::{Alias, ColumnDef, Iden, Index, Table, TableCreateStatement};

/// Operation log table columns.
///
/// `version` is zero-based: the snapshot version the operation advances
/// from. Per document the column holds a contiguous run `0, 1, 2, ...`.
#[derive(Iden)]
pub enum Ops {
    #[iden = "collection"]
    Collection,
    #[iden = "doc_id"]
    DocId,
    #[iden = "version"]
    Version,
    #[iden = "operation"]
    Operation,
}

/// Snapshots table columns.
///
/// At most one row per document; `version` is one-based. `created_at` is set
/// on row creation and never updated.
#[derive(Iden)]
pub enum Snapshots {
    #[iden = "collection"]
    Collection,
    #[iden = "doc_id"]
    DocId,
    #[iden = "doc_type"]
    DocType,
    #[iden = "version"]
    Version,
    #[iden = "data"]
    Data,
    #[iden = "created_at"]
    CreatedAt,
}

/// Build the CREATE TABLE statement for the operation log.
pub fn create_ops_table(name: &str) -> TableCreateStatement {
    Table::create()
        .table(Alias::new(name))
        .if_not_exists()
        .col(ColumnDef::new(Ops::Collection).string().not_null())
        .col(ColumnDef::new(Ops::DocId).string().not_null())
        .col(ColumnDef::new(Ops::Version).big_integer().not_null())
        .col(ColumnDef::new(Ops::Operation).text().not_null())
        .primary_key(
            Index::create()
                .col(Ops::Collection)
                .col(Ops::DocId)
                .col(Ops::Version),
        )
        .to_owned()
}

/// Build the CREATE TABLE statement for the snapshots table.
pub fn create_snapshots_table(name: &str) -> TableCreateStatement {
    Table::create()
        .table(Alias::new(name))
        .if_not_exists()
        .col(ColumnDef::new(Snapshots::Collection).string().not_null())
        .col(ColumnDef::new(Snapshots::DocId).string().not_null())
        .col(ColumnDef::new(Snapshots::DocType).string())
        .col(ColumnDef::new(Snapshots::Version).big_integer().not_null())
        .col(ColumnDef::new(Snapshots::Data).text())
        .col(ColumnDef::new(Snapshots::CreatedAt).string().not_null())
        .primary_key(
            Index::create()
                .col(Snapshots::Collection)
                .col(Snapshots::DocId),
        )
        .to_owned()
}
