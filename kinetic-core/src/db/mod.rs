//! Key-value persistence for workouts, stats and messages.
//!
//! Every record is stored as a JSON document under a string key built from a
//! namespace prefix and an owner id (`fitness_stats_<userId>`). Writes are
//! last-write-wins; there is no versioning at this boundary.

pub mod memory;
pub mod models;
pub mod operations;
pub mod schema;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use log::debug;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::env;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;

pub const WORKOUTS_KEY: &str = "fitness_workouts";
pub const STATS_KEY: &str = "fitness_stats";

pub fn stats_key(user_id: &str) -> String {
    format!("{}_{}", STATS_KEY, user_id)
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),
    #[error("connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),
    #[error("query failed: {0}")]
    Query(#[from] diesel::result::Error),
    #[error("migration failed: {0}")]
    Migration(String),
    #[error("failed to encode value: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("malformed value under key '{key}': {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Asynchronous key-value store holding JSON documents.
pub trait LocalStore: Send + Sync {
    /// Returns `None` when nothing has been written under `key`.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Value>, StoreError>> + Send;

    fn set(&self, key: &str, value: Value) -> impl Future<Output = Result<(), StoreError>> + Send;
}

impl<S: LocalStore> LocalStore for Arc<S> {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Value>, StoreError>> + Send {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: Value) -> impl Future<Output = Result<(), StoreError>> + Send {
        (**self).set(key, value)
    }
}

pub async fn read_json<S, T>(store: &S, key: &str) -> Result<Option<T>, StoreError>
where
    S: LocalStore,
    T: DeserializeOwned,
{
    match store.get(key).await? {
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|source| StoreError::Malformed {
                key: key.to_string(),
                source,
            }),
        None => Ok(None),
    }
}

pub async fn write_json<S, T>(store: &S, key: &str, value: &T) -> Result<(), StoreError>
where
    S: LocalStore,
    T: Serialize + ?Sized,
{
    let value = serde_json::to_value(value)?;
    debug!("Writing key {}", key);
    store.set(key, value).await
}

static DB_PATH: OnceCell<String> = OnceCell::const_new();

pub const DEFAULT_DB_PATH: &str = "kinetic.db";

/// The process-wide database path: whatever [`set_db_path`] registered, else
/// `DATABASE_URL`, else [`DEFAULT_DB_PATH`].
pub async fn get_db_path() -> &'static String {
    DB_PATH
        .get_or_init(async || env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DB_PATH.into()))
        .await
}

pub async fn set_db_path(path: &str) -> anyhow::Result<()> {
    DB_PATH
        .set(path.to_string())
        .map_err(|e| anyhow::anyhow!(format!("Failed to set DB_PATH: {:?}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::WorkoutStats;

    #[tokio::test]
    async fn json_helpers_round_trip_through_store() {
        let store = MemoryStore::new();
        assert!(
            read_json::<_, WorkoutStats>(&store, "missing")
                .await
                .unwrap()
                .is_none()
        );

        let stats = WorkoutStats {
            total_workouts: 3,
            current_streak: 2,
            ..Default::default()
        };
        write_json(&store, &stats_key("demo"), &stats).await.unwrap();
        let loaded: WorkoutStats = read_json(&store, "fitness_stats_demo")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded, stats);
    }

    #[tokio::test]
    async fn malformed_documents_are_reported_with_their_key() {
        let store = MemoryStore::new();
        store
            .set(WORKOUTS_KEY, serde_json::json!({"not": "a list"}))
            .await
            .unwrap();
        let err = read_json::<_, Vec<models::Workout>>(&store, WORKOUTS_KEY)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Malformed { ref key, .. } if key == WORKOUTS_KEY));
    }

    #[tokio::test]
    async fn shared_store_is_visible_through_arc() {
        let store = Arc::new(MemoryStore::new());
        let alias = Arc::clone(&store);
        write_json(&alias, "k", &vec![1, 2, 3]).await.unwrap();
        let loaded: Vec<u32> = read_json(&store, "k").await.unwrap().unwrap();
        assert_eq!(loaded, vec![1, 2, 3]);
    }
}
