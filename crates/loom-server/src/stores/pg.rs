//! Postgres-backed assignment store.
//!
//! Holds one `PgConnection`, opened on first use. Connect failures surface
//! the driver error immediately; there is no pool and no retry.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{AssignmentStore, StoreError, SENTINEL_ASSIGNMENT_ID};
use crate::config::DatabaseSettings;

// Literals are left untyped so Postgres coerces them to whatever the
// externally managed column types are (e.g. an enum `status`).
const UPSERT_SENTINEL: &str = r#"
    INSERT INTO assignments (id, goal, status, user_id, team_id, graph_id, params)
    VALUES ($1, 'verification_test', 'completed', 'test_user', 'test_team', 'test_graph', '{}')
    ON CONFLICT (id)
    DO UPDATE SET goal = 'verification_test', status = 'completed'
"#;

const SELECT_ASSIGNMENT: &str = r#"
    SELECT row_to_json(a) FROM assignments a WHERE a.id = $1
"#;

/// Assignment store over a single lazily opened connection.
pub struct PgAssignmentStore {
    options: PgConnectOptions,
    address: String,
    connection: Mutex<Option<PgConnection>>,
}

impl PgAssignmentStore {
    pub fn new(settings: &DatabaseSettings) -> Self {
        Self {
            options: settings.connect_options(),
            address: format!("{}:{}/{}", settings.host, settings.port, settings.database),
            connection: Mutex::new(None),
        }
    }

    /// Returns the open connection, connecting first if there is none.
    async fn connection(&self) -> Result<MappedMutexGuard<'_, PgConnection>, StoreError> {
        let mut slot = self.connection.lock().await;
        if slot.is_none() {
            info!(database = %self.address, "Connecting to Postgres");
            let conn = PgConnection::connect_with(&self.options)
                .await
                .map_err(|e| StoreError::Connection(e.to_string()))?;
            *slot = Some(conn);
        }

        MutexGuard::try_map(slot, Option::as_mut)
            .map_err(|_| StoreError::Connection("Postgres connection unavailable".into()))
    }

    /// Converts a query failure, dropping the connection if it is broken so
    /// the next call reconnects.
    async fn query_failed(&self, e: sqlx::Error) -> StoreError {
        if matches!(e, sqlx::Error::Io(_) | sqlx::Error::Protocol(_)) {
            if self.connection.lock().await.take().is_some() {
                warn!(database = %self.address, "Dropping broken Postgres connection");
            }
        }
        StoreError::Query(e.to_string())
    }
}

#[async_trait]
impl AssignmentStore for PgAssignmentStore {
    async fn current_time(&self) -> Result<DateTime<Utc>, StoreError> {
        let result = {
            let mut conn = self.connection().await?;
            sqlx::query_scalar::<_, DateTime<Utc>>("SELECT NOW()")
                .fetch_one(&mut *conn)
                .await
        };

        match result {
            Ok(now) => Ok(now),
            Err(e) => Err(self.query_failed(e).await),
        }
    }

    async fn upsert_sentinel(&self) -> Result<(), StoreError> {
        let result = {
            let mut conn = self.connection().await?;
            sqlx::query(UPSERT_SENTINEL)
                .bind(SENTINEL_ASSIGNMENT_ID)
                .execute(&mut *conn)
                .await
        };

        match result {
            Ok(done) => {
                debug!(rows = done.rows_affected(), "Sentinel assignment upserted");
                Ok(())
            }
            Err(e) => Err(self.query_failed(e).await),
        }
    }

    async fn fetch(&self, id: Uuid) -> Result<Option<Value>, StoreError> {
        let result = {
            let mut conn = self.connection().await?;
            sqlx::query_scalar::<_, Value>(SELECT_ASSIGNMENT)
                .bind(id)
                .fetch_optional(&mut *conn)
                .await
        };

        match result {
            Ok(row) => Ok(row),
            Err(e) => Err(self.query_failed(e).await),
        }
    }

    async fn close(&self) {
        let Some(conn) = self.connection.lock().await.take() else {
            return;
        };

        if let Err(e) = conn.close().await {
            warn!(database = %self.address, "Postgres close failed: {}", e);
            return;
        }
        info!(database = %self.address, "Postgres connection closed");
    }
}
