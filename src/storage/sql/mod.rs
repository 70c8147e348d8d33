//! Unified SQL storage implementation.
//!
//! This module provides a shared document store implementation for SQL
//! backends (SQLite, PostgreSQL, MySQL). The implementation is parameterized
//! by database type using the `SqlDatabase` trait.

mod doc_store;
mod query;

pub use doc_store::SqlDocStore;
pub use query::SqlDatabase;

#[cfg(feature = "sqlite")]
pub mod sqlite {
    //! SQLite database backend.

    use sea_query::SqliteQueryBuilder;
    use sqlx::SqlitePool;

    /// SQLite database marker type.
    pub struct Sqlite;

    impl super::SqlDatabase for Sqlite {
        type Pool = SqlitePool;

        fn build_select(stmt: sea_query::SelectStatement) -> String {
            stmt.to_string(SqliteQueryBuilder)
        }

        fn build_locking_select(stmt: sea_query::SelectStatement) -> String {
            // SQLite has no FOR UPDATE; write transactions already hold the
            // database-level writer lock.
            stmt.to_string(SqliteQueryBuilder)
        }

        fn build_insert(stmt: sea_query::InsertStatement) -> String {
            stmt.to_string(SqliteQueryBuilder)
        }

        fn build_update(stmt: sea_query::UpdateStatement) -> String {
            stmt.to_string(SqliteQueryBuilder)
        }

        fn build_create_table(stmt: sea_query::TableCreateStatement) -> String {
            stmt.to_string(SqliteQueryBuilder)
        }
    }

    /// SQLite document store.
    pub type SqliteDocStore = super::SqlDocStore<Sqlite>;
}

#[cfg(feature = "postgres")]
pub mod postgres {
    //! PostgreSQL database backend.

    use sea_query::{LockType, PostgresQueryBuilder};
    use sqlx::PgPool;

    /// PostgreSQL database marker type.
    pub struct Postgres;

    impl super::SqlDatabase for Postgres {
        type Pool = PgPool;

        fn build_select(stmt: sea_query::SelectStatement) -> String {
            stmt.to_string(PostgresQueryBuilder)
        }

        fn build_locking_select(mut stmt: sea_query::SelectStatement) -> String {
            stmt.lock(LockType::Update).to_string(PostgresQueryBuilder)
        }

        fn build_insert(stmt: sea_query::InsertStatement) -> String {
            stmt.to_string(PostgresQueryBuilder)
        }

        fn build_update(stmt: sea_query::UpdateStatement) -> String {
            stmt.to_string(PostgresQueryBuilder)
        }

        fn build_create_table(stmt: sea_query::TableCreateStatement) -> String {
            stmt.to_string(PostgresQueryBuilder)
        }
    }

    /// PostgreSQL document store.
    pub type PostgresDocStore = super::SqlDocStore<Postgres>;
}

#[cfg(feature = "mysql")]
pub mod mysql {
    //! MySQL database backend.

    use sea_query::{LockType, MysqlQueryBuilder};
    use sqlx::MySqlPool;

    /// MySQL database marker type.
    pub struct Mysql;

    impl super::SqlDatabase for Mysql {
        type Pool = MySqlPool;

        fn build_select(stmt: sea_query::SelectStatement) -> String {
            stmt.to_string(MysqlQueryBuilder)
        }

        fn build_locking_select(mut stmt: sea_query::SelectStatement) -> String {
            // InnoDB gap locking on this read can deadlock under heavy
            // same-document load; surfaced to callers as retryable.
            stmt.lock(LockType::Update).to_string(MysqlQueryBuilder)
        }

        fn build_insert(stmt: sea_query::InsertStatement) -> String {
            stmt.to_string(MysqlQueryBuilder)
        }

        fn build_update(stmt: sea_query::UpdateStatement) -> String {
            stmt.to_string(MysqlQueryBuilder)
        }

        fn build_create_table(stmt: sea_query::TableCreateStatement) -> String {
            stmt.to_string(MysqlQueryBuilder)
        }
    }

    /// MySQL document store.
    pub type MysqlDocStore = super::SqlDocStore<Mysql>;
}
