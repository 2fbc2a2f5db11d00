//! External stores probed by the health endpoints.
//!
//! Both stores connect lazily. The first call that needs a connection opens
//! it and later calls reuse it. A connect attempt is made once per call and
//! its failure is returned as is; the next call starts a fresh attempt.

mod pg;
mod redis_cache;
#[cfg(test)]
pub mod testing;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

pub use self::pg::PgAssignmentStore;
pub use self::redis_cache::RedisCacheStore;

/// Fixed id of the row the database check writes and reads back.
pub const SENTINEL_ASSIGNMENT_ID: Uuid = Uuid::from_u128(1);

/// Fixed key/value pair the cache check writes and reads back.
pub const SENTINEL_CACHE_KEY: &str = "health_check:test";
pub const SENTINEL_CACHE_VALUE: &str = "ok";

/// Store failures. Messages are the client library's own text.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("{0}")]
    Connection(String),

    /// The store was reached but rejected a query or command.
    #[error("{0}")]
    Query(String),
}

/// Relational store holding `assignments`.
#[async_trait]
pub trait AssignmentStore: Send + Sync {
    /// Database clock, connecting first if needed.
    async fn current_time(&self) -> Result<DateTime<Utc>, StoreError>;

    /// Inserts the sentinel assignment, or resets its goal and status if it exists.
    async fn upsert_sentinel(&self) -> Result<(), StoreError>;

    /// Reads a row as a JSON object keyed by column name. The table is
    /// defined outside this service, so column types are not assumed.
    async fn fetch(&self, id: Uuid) -> Result<Option<Value>, StoreError>;

    /// Releases the connection, if one was opened.
    async fn close(&self);
}

/// Key-value cache.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Releases the connection, if one was opened.
    async fn close(&self);
}
