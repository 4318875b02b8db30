//! Run Store: persistence for pipeline runs and pipeline definitions.
//!
//! [`RunStore`] is the contract consumed by the submission flow, the
//! reconciler, and the HTTP layer. [`PgRunStore`] backs it with PostgreSQL;
//! [`InMemoryRunStore`] provides the same semantics without a database.

pub mod error;
pub mod memory;
pub mod models;
pub mod pg;
pub mod repositories;
pub mod store;

use sqlx::postgres::PgPoolOptions;

pub use error::StoreError;
pub use memory::InMemoryRunStore;
pub use pg::PgRunStore;
pub use store::{RunListQuery, RunStore, RunUpdate};

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Run a trivial query to confirm the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply all pending migrations from `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}
