//! SQL database abstraction trait.

/// Trait for SQL database backends.
///
/// This trait abstracts over different SQL databases (PostgreSQL, SQLite,
/// MySQL) by providing the pool type and query building methods. The locking
/// select is the one dialect-sensitive spot: engines with `FOR UPDATE`
/// acquire a row lock there, SQLite falls back to its transaction-level
/// write serialization.
pub trait SqlDatabase: Send + Sync + 'static {
    /// The connection pool type for this database.
    type Pool: Clone + Send + Sync;

    /// Build a SQL query string from a sea-query SELECT statement.
    fn build_select(stmt: sea_query::SelectStatement) -> String;

    /// Build a SELECT that blocks concurrent writers of the matched rows
    /// until the surrounding transaction ends.
    fn build_locking_select(stmt: sea_query::SelectStatement) -> String;

    /// Build a SQL query string from a sea-query INSERT statement.
    fn build_insert(stmt: sea_query::InsertStatement) -> String;

    /// Build a SQL query string from a sea-query UPDATE statement.
    fn build_update(stmt: sea_query::UpdateStatement) -> String;

    /// Build a SQL statement from a sea-query CREATE TABLE statement.
    fn build_create_table(stmt: sea_query::TableCreateStatement) -> String;
}
