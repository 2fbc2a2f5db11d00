//! Liveness and dependency health checks.
//!
//! `/health` never touches a store. `/health/db` and `/health/redis` each do a
//! write followed by a read against their store and report 500 with the
//! store's error text if any step fails.

use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::{SecondsFormat, Utc};
use tracing::{debug, error};

use crate::dto::{CacheRoundTrip, DatabaseHealthResponse, HealthResponse, RedisHealthResponse, SchemaTest};
use crate::error::HealthError;
use crate::stores::{
    AssignmentStore, CacheStore, StoreError, SENTINEL_ASSIGNMENT_ID, SENTINEL_CACHE_KEY,
    SENTINEL_CACHE_VALUE,
};
use crate::ServerState;

/// Liveness endpoint: `GET /health`.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

/// Database endpoint: `GET /health/db`.
pub async fn database(
    State(state): State<Arc<ServerState>>,
) -> Result<Json<DatabaseHealthResponse>, HealthError> {
    check_database(state.assignments.as_ref())
        .await
        .map(Json)
        .map_err(|e| {
            error!("Database health check failed: {}", e);
            HealthError::Database(describe(e))
        })
}

/// Cache endpoint: `GET /health/redis`.
pub async fn redis(
    State(state): State<Arc<ServerState>>,
) -> Result<Json<RedisHealthResponse>, HealthError> {
    check_cache(state.cache.as_ref())
        .await
        .map(Json)
        .map_err(|e| {
            error!("Redis health check failed: {}", e);
            HealthError::Redis(describe(e))
        })
}

async fn check_database(store: &dyn AssignmentStore) -> Result<DatabaseHealthResponse, StoreError> {
    let timestamp = store.current_time().await?;

    store.upsert_sentinel().await?;

    let record = store.fetch(SENTINEL_ASSIGNMENT_ID).await?.ok_or_else(|| {
        StoreError::Query(format!("assignment {} missing after upsert", SENTINEL_ASSIGNMENT_ID))
    })?;

    debug!("Sentinel assignment read back");

    Ok(DatabaseHealthResponse {
        status: "ok",
        timestamp,
        database: "connected",
        schema_test: SchemaTest { table: "assignments", record },
    })
}

async fn check_cache(store: &dyn CacheStore) -> Result<RedisHealthResponse, StoreError> {
    store.set(SENTINEL_CACHE_KEY, SENTINEL_CACHE_VALUE).await?;
    let actual = store.get(SENTINEL_CACHE_KEY).await?;
    let matches = actual.as_deref() == Some(SENTINEL_CACHE_VALUE);

    Ok(RedisHealthResponse {
        status: "ok",
        redis: "connected",
        test: CacheRoundTrip {
            key: SENTINEL_CACHE_KEY,
            expected_value: SENTINEL_CACHE_VALUE,
            actual_value: actual,
            matches,
        },
    })
}

/// Error text for the response body; never empty.
fn describe(e: StoreError) -> String {
    let message = e.to_string();
    if message.trim().is_empty() {
        return "unknown store error".into();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::testing::{
        MemoryAssignmentStore, MemoryCacheStore, UnreachableStore, SENTINEL_GOAL, SENTINEL_STATUS,
    };
    use serde_json::json;

    fn state(
        assignments: Arc<dyn AssignmentStore>,
        cache: Arc<dyn CacheStore>,
    ) -> State<Arc<ServerState>> {
        State(Arc::new(ServerState { assignments, cache }))
    }

    #[tokio::test]
    async fn health_reports_ok_with_rfc3339_timestamp() {
        let Json(body) = health().await;

        assert_eq!(body.status, "ok");
        assert!(chrono::DateTime::parse_from_rfc3339(&body.timestamp).is_ok());
    }

    #[tokio::test]
    async fn database_check_upserts_and_reads_sentinel() {
        let db = Arc::new(MemoryAssignmentStore::default());
        let Json(body) = database(state(db.clone(), Arc::new(MemoryCacheStore::default())))
            .await
            .unwrap();

        assert_eq!(body.database, "connected");
        assert_eq!(body.schema_test.table, "assignments");
        assert_eq!(body.schema_test.record["id"], json!(SENTINEL_ASSIGNMENT_ID));

        let stored = db.fetch(SENTINEL_ASSIGNMENT_ID).await.unwrap().unwrap();
        assert_eq!(stored["goal"], SENTINEL_GOAL);
        assert_eq!(stored["status"], SENTINEL_STATUS);
    }

    #[tokio::test]
    async fn database_check_resets_existing_sentinel() {
        let db = Arc::new(MemoryAssignmentStore::default());
        db.insert(
            SENTINEL_ASSIGNMENT_ID,
            json!({
                "id": SENTINEL_ASSIGNMENT_ID,
                "user_id": "someone",
                "goal": "tampered",
                "status": "failed",
                "priority": 3,
            }),
        );

        let Json(body) = database(state(db.clone(), Arc::new(MemoryCacheStore::default())))
            .await
            .unwrap();

        let record = body.schema_test.record;
        assert_eq!(record["goal"], SENTINEL_GOAL);
        assert_eq!(record["status"], SENTINEL_STATUS);
        // Only goal and status are overwritten on conflict.
        assert_eq!(record["user_id"], "someone");
        // Columns the service does not know about are passed through.
        assert_eq!(record["priority"], 3);
    }

    #[tokio::test]
    async fn database_failure_becomes_error() {
        let unreachable = Arc::new(UnreachableStore::new("connection refused"));
        let err = database(state(unreachable, Arc::new(MemoryCacheStore::default())))
            .await
            .unwrap_err();

        assert!(matches!(err, HealthError::Database(msg) if msg == "connection refused"));
    }

    #[tokio::test]
    async fn cache_check_round_trips_sentinel() {
        let cache = Arc::new(MemoryCacheStore::default());
        let Json(body) = redis(state(Arc::new(MemoryAssignmentStore::default()), cache.clone()))
            .await
            .unwrap();

        assert_eq!(body.redis, "connected");
        assert!(body.test.matches);
        assert_eq!(body.test.actual_value.as_deref(), Some("ok"));
        assert_eq!(cache.value("health_check:test").as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn cache_failure_becomes_error() {
        let unreachable = Arc::new(UnreachableStore::new("Connection refused (os error 111)"));
        let err = redis(state(Arc::new(MemoryAssignmentStore::default()), unreachable))
            .await
            .unwrap_err();

        assert!(matches!(err, HealthError::Redis(msg) if msg.contains("refused")));
    }

    #[test]
    fn describe_never_returns_empty_text() {
        assert_eq!(describe(StoreError::Query(String::new())), "unknown store error");
        assert_eq!(describe(StoreError::Query("boom".into())), "boom");
    }
}
