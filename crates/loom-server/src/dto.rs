//! Response bodies for the health endpoints.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
}

/// The sentinel row as read back from the database, every column included.
#[derive(Debug, Serialize)]
pub struct SchemaTest {
    pub table: &'static str,
    pub record: Value,
}

/// Body of a successful `GET /health/db`.
#[derive(Debug, Serialize)]
pub struct DatabaseHealthResponse {
    pub status: &'static str,
    /// Database clock at the time of the check.
    pub timestamp: DateTime<Utc>,
    pub database: &'static str,
    pub schema_test: SchemaTest,
}

/// Outcome of the cache write/read round trip.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheRoundTrip {
    pub key: &'static str,
    pub expected_value: &'static str,
    pub actual_value: Option<String>,
    #[serde(rename = "match")]
    pub matches: bool,
}

/// Body of a successful `GET /health/redis`.
#[derive(Debug, Serialize)]
pub struct RedisHealthResponse {
    pub status: &'static str,
    pub redis: &'static str,
    pub test: CacheRoundTrip,
}
