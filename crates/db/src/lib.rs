//! Persistence layer: Postgres repositories for the administrative reference
//! data (EOD settings, vessels of interest, weighting, species-risk toggle)
//! and the refresh orchestration that feeds the in-memory cache.

use sqlx::postgres::PgPoolOptions;

pub mod eod_repository;
pub mod models;
pub mod refresh;
pub mod repositories;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}
