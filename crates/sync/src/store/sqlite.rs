//! SQLite-backed local store.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pantry_core::{LocalId, RemoteId};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

use super::r#trait::{LocalStore, StoreError};
use crate::types::{PendingOp, Rejection, StoredRecord};

impl sqlx::Type<sqlx::Sqlite> for PendingOp {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <&str as sqlx::Type<sqlx::Sqlite>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for PendingOp {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<'r, sqlx::Sqlite>>::decode(value)?;
        Ok(PendingOp::from_str(s)?)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for PendingOp {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        let s = self.as_str();
        <&str as sqlx::Encode<'q, sqlx::Sqlite>>::encode_by_ref(&s, buf)
    }
}

/// SQLite-backed record store.
///
/// This struct is cheap to clone and is safe to share across threads.
#[derive(Debug, Clone)]
pub struct SqliteLocalStore {
    pool: SqlitePool,
}

impl SqliteLocalStore {
    /// Open (or create) the database file at `path`.
    pub async fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create store directory at {parent:?}"))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .with_context(|| format!("failed to create SQLite pool for local store at {path:?}"))?;

        Self::from_pool(pool).await
    }

    /// A private in-memory database (tests/dev).
    pub async fn open_in_memory() -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .context("invalid in-memory SQLite URL")?;

        // Every connection to `:memory:` is a separate database, so keep exactly one alive.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .context("failed to create in-memory SQLite pool")?;

        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> anyhow::Result<Self> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                collection  TEXT NOT NULL,
                local_id    TEXT NOT NULL,
                remote_id   TEXT NULL,
                pending_op  TEXT NULL,
                version     INTEGER NOT NULL,
                payload     TEXT NOT NULL,
                rejection   TEXT NULL,
                updated_at  TEXT NOT NULL,
                PRIMARY KEY (collection, local_id)
            )
            "#,
        )
        .execute(&pool)
        .await
        .context("failed to create records table")?;

        Ok(Self { pool })
    }

    /// Default database location: `{app_data_dir}/pantry/pantry.db`.
    pub fn default_path() -> anyhow::Result<PathBuf> {
        let base = dirs::data_dir()
            .or_else(|| {
                dirs::home_dir().map(|mut h| {
                    h.push(".local");
                    h.push("share");
                    h
                })
            })
            .context(
                "failed to resolve OS app data directory - tried data_dir() and home_dir()/.local/share",
            )?;

        let mut path = base;
        path.push("pantry");
        path.push("pantry.db");
        Ok(path)
    }

    async fn load_rows(&self, collection: &str) -> anyhow::Result<Vec<StoredRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT
                local_id,
                remote_id,
                pending_op,
                version,
                payload,
                rejection,
                updated_at
            FROM records
            WHERE collection = ?1
            ORDER BY local_id ASC
            "#,
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await
        .context("failed to load records")?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(row_to_record(row)?);
        }
        Ok(records)
    }

    async fn upsert(&self, collection: &str, record: &StoredRecord) -> anyhow::Result<()> {
        let payload =
            serde_json::to_string(&record.payload).context("failed to serialize payload")?;
        let rejection = record
            .rejection
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .context("failed to serialize rejection")?;

        sqlx::query(
            r#"
            INSERT INTO records (
                collection,
                local_id,
                remote_id,
                pending_op,
                version,
                payload,
                rejection,
                updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(collection, local_id)
            DO UPDATE SET
                remote_id = excluded.remote_id,
                pending_op = excluded.pending_op,
                version = excluded.version,
                payload = excluded.payload,
                rejection = excluded.rejection,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(collection)
        .bind(record.local_id.to_string())
        .bind(record.remote_id.as_ref().map(RemoteId::to_string))
        .bind(record.pending_op)
        .bind(record.version as i64)
        .bind(payload)
        .bind(rejection)
        .bind(record.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("failed to upsert record")?;

        Ok(())
    }

    async fn delete(&self, collection: &str, local_id: LocalId) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            DELETE FROM records
            WHERE collection = ?1
              AND local_id = ?2
            "#,
        )
        .bind(collection)
        .bind(local_id.to_string())
        .execute(&self.pool)
        .await
        .context("failed to delete record")?;

        Ok(())
    }
}

#[async_trait]
impl LocalStore for SqliteLocalStore {
    async fn load(&self, collection: &str) -> Result<Vec<StoredRecord>, StoreError> {
        Ok(self.load_rows(collection).await?)
    }

    async fn put(&self, collection: &str, record: &StoredRecord) -> Result<(), StoreError> {
        Ok(self.upsert(collection, record).await?)
    }

    async fn remove(&self, collection: &str, local_id: LocalId) -> Result<(), StoreError> {
        Ok(self.delete(collection, local_id).await?)
    }
}

/// Map a database row into a `StoredRecord`.
fn row_to_record(row: sqlx::sqlite::SqliteRow) -> anyhow::Result<StoredRecord> {
    let local_str: String = row.try_get("local_id")?;
    let local_id = local_str
        .parse::<LocalId>()
        .context("invalid local_id in records")?;

    let remote_str: Option<String> = row.try_get("remote_id")?;
    let remote_id = remote_str
        .map(RemoteId::new)
        .transpose()
        .context("invalid remote_id in records")?;

    let pending_op: Option<PendingOp> = row.try_get("pending_op")?;

    let version: i64 = row.try_get("version")?;

    let payload_str: String = row.try_get("payload")?;
    let payload =
        serde_json::from_str(&payload_str).context("invalid JSON payload in records")?;

    let rejection_str: Option<String> = row.try_get("rejection")?;
    let rejection: Option<Rejection> = rejection_str
        .map(|s| serde_json::from_str(&s))
        .transpose()
        .context("invalid rejection in records")?;

    let updated_at_str: String = row.try_get("updated_at")?;
    let updated_at = DateTime::parse_from_rfc3339(&updated_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .context("invalid updated_at in records")?;

    Ok(StoredRecord {
        local_id,
        remote_id,
        pending_op,
        version: version as u64,
        payload,
        rejection,
        updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(pending_op: Option<PendingOp>, remote: Option<&str>) -> StoredRecord {
        StoredRecord {
            local_id: LocalId::new(),
            remote_id: remote.map(|r| RemoteId::new(r).unwrap()),
            pending_op,
            version: 3,
            payload: json!({ "name": "Milk", "quantity": 1.0, "unit": "L" }),
            rejection: None,
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn put_then_load_preserves_fields() {
        let store = SqliteLocalStore::open_in_memory().await.unwrap();
        let mut rec = record(Some(PendingOp::Update), Some("r1"));
        rec.rejection = Some(Rejection {
            version: 3,
            reason: "quantity too large".into(),
        });

        store.put("inventory", &rec).await.unwrap();
        let loaded = store.load("inventory").await.unwrap();

        assert_eq!(loaded.len(), 1);
        let got = &loaded[0];
        assert_eq!(got.local_id, rec.local_id);
        assert_eq!(got.remote_id, rec.remote_id);
        assert_eq!(got.pending_op, Some(PendingOp::Update));
        assert_eq!(got.version, 3);
        assert_eq!(got.payload, rec.payload);
        assert_eq!(got.rejection, rec.rejection);
    }

    #[tokio::test]
    async fn put_is_an_upsert() {
        let store = SqliteLocalStore::open_in_memory().await.unwrap();
        let mut rec = record(Some(PendingOp::Create), None);
        store.put("inventory", &rec).await.unwrap();

        rec.pending_op = None;
        rec.remote_id = Some(RemoteId::new("r9").unwrap());
        rec.version = 4;
        store.put("inventory", &rec).await.unwrap();

        let loaded = store.load("inventory").await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].pending_op, None);
        assert_eq!(loaded[0].version, 4);
    }

    #[tokio::test]
    async fn collections_are_partitioned_and_ordered() {
        let store = SqliteLocalStore::open_in_memory().await.unwrap();
        let first = record(Some(PendingOp::Create), None);
        let second = record(Some(PendingOp::Create), None);
        let purchase = record(None, Some("p1"));

        store.put("inventory", &second).await.unwrap();
        store.put("inventory", &first).await.unwrap();
        store.put("purchases", &purchase).await.unwrap();

        let items = store.load("inventory").await.unwrap();
        assert_eq!(
            items.iter().map(|r| r.local_id).collect::<Vec<_>>(),
            vec![first.local_id, second.local_id]
        );
        assert_eq!(store.load("purchases").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let store = SqliteLocalStore::open_in_memory().await.unwrap();
        let rec = record(Some(PendingOp::Create), None);
        store.put("inventory", &rec).await.unwrap();

        store.remove("inventory", rec.local_id).await.unwrap();
        store.remove("inventory", rec.local_id).await.unwrap();
        assert!(store.load("inventory").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("pantry.db");
        let rec = record(Some(PendingOp::Delete), Some("r5"));

        {
            let store = SqliteLocalStore::open(&path).await.unwrap();
            store.put("inventory", &rec).await.unwrap();
            store.pool.close().await;
        }

        let store = SqliteLocalStore::open(&path).await.unwrap();
        let loaded = store.load("inventory").await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].pending_op, Some(PendingOp::Delete));
    }
}
