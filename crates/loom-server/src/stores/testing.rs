//! In-memory and unreachable stores for handler tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use super::{AssignmentStore, CacheStore, StoreError, SENTINEL_ASSIGNMENT_ID};

/// Values the sentinel upsert writes into `goal` and `status`.
pub const SENTINEL_GOAL: &str = "verification_test";
pub const SENTINEL_STATUS: &str = "completed";

/// Assignment table held in memory with the same upsert semantics as Postgres.
#[derive(Default)]
pub struct MemoryAssignmentStore {
    rows: Mutex<HashMap<Uuid, Value>>,
    closed: AtomicBool,
}

impl MemoryAssignmentStore {
    /// Seeds a row, e.g. a sentinel left in a different state by someone else.
    pub fn insert(&self, id: Uuid, row: Value) {
        self.rows.lock().unwrap().insert(id, row);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssignmentStore for MemoryAssignmentStore {
    async fn current_time(&self) -> Result<DateTime<Utc>, StoreError> {
        Ok(Utc::now())
    }

    async fn upsert_sentinel(&self) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows.entry(SENTINEL_ASSIGNMENT_ID).or_insert_with(|| {
            json!({
                "id": SENTINEL_ASSIGNMENT_ID,
                "created_at": Utc::now(),
                "user_id": "test_user",
                "team_id": "test_team",
                "graph_id": "test_graph",
                "params": {},
            })
        });
        row["goal"] = json!(SENTINEL_GOAL);
        row["status"] = json!(SENTINEL_STATUS);
        Ok(())
    }

    async fn fetch(&self, id: Uuid) -> Result<Option<Value>, StoreError> {
        Ok(self.rows.lock().unwrap().get(&id).cloned())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Cache held in memory.
#[derive(Default)]
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<String, String>>,
    closed: AtomicBool,
}

impl MemoryCacheStore {
    pub fn value(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.lock().unwrap().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.value(key))
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// A store whose every call fails to connect.
pub struct UnreachableStore {
    message: String,
}

impl UnreachableStore {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }

    fn fail<T>(&self) -> Result<T, StoreError> {
        Err(StoreError::Connection(self.message.clone()))
    }
}

#[async_trait]
impl AssignmentStore for UnreachableStore {
    async fn current_time(&self) -> Result<DateTime<Utc>, StoreError> {
        self.fail()
    }

    async fn upsert_sentinel(&self) -> Result<(), StoreError> {
        self.fail()
    }

    async fn fetch(&self, _id: Uuid) -> Result<Option<Value>, StoreError> {
        self.fail()
    }

    async fn close(&self) {}
}

#[async_trait]
impl CacheStore for UnreachableStore {
    async fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
        self.fail()
    }

    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        self.fail()
    }

    async fn close(&self) {}
}
