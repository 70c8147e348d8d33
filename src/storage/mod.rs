//! Storage implementations.

use tracing::info;

use crate::config::StoreConfig;
use crate::interfaces::Result;

pub mod schema;
pub mod sql;

pub use sql::{SqlDatabase, SqlDocStore};

#[cfg(feature = "sqlite")]
pub use sql::sqlite::SqliteDocStore;

#[cfg(feature = "postgres")]
pub use sql::postgres::PostgresDocStore;

#[cfg(feature = "mysql")]
pub use sql::mysql::MysqlDocStore;

/// Connect to SQLite, create the schema if needed, and return a ready store.
#[cfg(feature = "sqlite")]
pub async fn connect_sqlite(config: &StoreConfig) -> Result<SqliteDocStore> {
    use sqlx::sqlite::SqlitePoolOptions;

    if let Some(path) = config.uri.strip_prefix("sqlite:") {
        let path = path.split('?').next().unwrap_or(path);
        if !path.is_empty() && path != ":memory:" {
            if let Some(parent) = std::path::Path::new(path).parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| crate::interfaces::StorageError::Database(sqlx::Error::Io(e)))?;
            }
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(config.pool_size)
        .connect(&config.uri)
        .await?;

    let store = SqliteDocStore::new(pool, config);
    store.init().await?;

    info!(uri = %config.uri, pool_size = config.pool_size, "document store ready");
    Ok(store)
}

/// Connect to PostgreSQL, create the schema if needed, and return a ready
/// store.
#[cfg(feature = "postgres")]
pub async fn connect_postgres(config: &StoreConfig) -> Result<PostgresDocStore> {
    use sqlx::postgres::PgPoolOptions;

    let pool = PgPoolOptions::new()
        .max_connections(config.pool_size)
        .connect(&config.uri)
        .await?;

    let store = PostgresDocStore::new(pool, config);
    store.init().await?;

    info!(pool_size = config.pool_size, "document store ready");
    Ok(store)
}

/// Connect to MySQL, create the schema if needed, and return a ready store.
#[cfg(feature = "mysql")]
pub async fn connect_mysql(config: &StoreConfig) -> Result<MysqlDocStore> {
    use sqlx::mysql::MySqlPoolOptions;

    let pool = MySqlPoolOptions::new()
        .max_connections(config.pool_size)
        .connect(&config.uri)
        .await?;

    let store = MysqlDocStore::new(pool, config);
    store.init().await?;

    info!(pool_size = config.pool_size, "document store ready");
    Ok(store)
}
