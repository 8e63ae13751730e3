use crate::db::schema::kv_entries;
use crate::db::{LocalStore, StoreError};
use chrono::Utc;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use log::{debug, info};
use serde_json::Value;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

type SqlitePool = Pool<ConnectionManager<SqliteConnection>>;

#[derive(Insertable)]
#[diesel(table_name = kv_entries)]
struct NewEntry {
    key: String,
    value: String,
    updated_at: i64,
}

#[derive(Debug)]
struct ConnectionOptions;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionOptions {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute("PRAGMA busy_timeout = 5000; PRAGMA synchronous = NORMAL;")
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// [`LocalStore`] backed by a single SQLite table.
///
/// Diesel is synchronous, so every call runs on tokio's blocking pool.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (or creates) the database and applies pending migrations.
    ///
    /// `":memory:"` gives a private in-memory database; the pool is then
    /// limited to one connection so that every call sees the same data.
    pub fn open(database_url: &str) -> Result<Self, StoreError> {
        let in_memory = database_url == ":memory:";
        let manager = ConnectionManager::<SqliteConnection>::new(database_url);
        let pool = Pool::builder()
            .max_size(if in_memory { 1 } else { 4 })
            .connection_customizer(Box::new(ConnectionOptions))
            .build(manager)?;

        let mut conn = pool.get()?;
        if !in_memory {
            conn.batch_execute("PRAGMA journal_mode = WAL;")?;
        }
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| StoreError::Migration(e.to_string()))?;
        for migration in &applied {
            info!("Applied migration {}", migration);
        }
        debug!("Opened key-value store at {}", database_url);

        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Self::open(":memory:")
    }
}

impl LocalStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let pool = self.pool.clone();
        let lookup = key.to_string();
        let raw = tokio::task::spawn_blocking(move || -> Result<Option<String>, StoreError> {
            let mut conn = pool.get()?;
            let value = kv_entries::table
                .filter(kv_entries::key.eq(lookup.as_str()))
                .select(kv_entries::value)
                .first::<String>(&mut conn)
                .optional()?;
            Ok(value)
        })
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))??;

        raw.map(|text| {
            serde_json::from_str(&text).map_err(|source| StoreError::Malformed {
                key: key.to_string(),
                source,
            })
        })
        .transpose()
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let pool = self.pool.clone();
        let entry = NewEntry {
            key: key.to_string(),
            value: serde_json::to_string(&value)?,
            updated_at: Utc::now().timestamp(),
        };
        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let mut conn = pool.get()?;
            diesel::replace_into(kv_entries::table)
                .values(&entry)
                .execute(&mut conn)?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn missing_key_reads_as_none() {
        let store = SqliteStore::in_memory().unwrap();
        assert_eq!(store.get("fitness_workouts").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_overwrites_previous_value() {
        let store = SqliteStore::in_memory().unwrap();
        store.set("fitness_stats_demo", json!({"totalWorkouts": 1})).await.unwrap();
        store.set("fitness_stats_demo", json!({"totalWorkouts": 2})).await.unwrap();
        assert_eq!(
            store.get("fitness_stats_demo").await.unwrap(),
            Some(json!({"totalWorkouts": 2}))
        );
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let store = SqliteStore::in_memory().unwrap();
        store.set("a", json!([1])).await.unwrap();
        store.set("b", json!("two")).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some(json!([1])));
        assert_eq!(store.get("b").await.unwrap(), Some(json!("two")));
    }
}
