//! SQLite-backed one-time password store.
//!
//! Implements the `OtpStore` trait. The table is keyed by email with a
//! UNIQUE constraint, so issuing a new code replaces any previous row for
//! the same address. Expired rows linger until the purge sweep removes
//! them. All database operations run in `spawn_blocking` to avoid blocking
//! the async runtime.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cohort_core::OtpStore;
use cohort_domain::{OtpEntry, Result as DomainResult};
use rusqlite::{params, Row};
use tokio::task;

use super::manager::DbManager;
use super::pool::DbConnection;
use super::{epoch_to_datetime, map_join_error, map_sql_error, parse_uuid};

/// SQLite-backed OTP store.
pub struct SqliteOtpStore {
    db: Arc<DbManager>,
}

impl SqliteOtpStore {
    /// Construct a store backed by the shared database manager.
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    fn query_by_email(conn: &DbConnection, email: &str) -> DomainResult<Option<OtpEntry>> {
        match conn.query_row(OTP_FIND_SQL, params![email], map_otp_row) {
            Ok(entry) => Ok(Some(entry)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(err) => Err(map_sql_error(err)),
        }
    }

    fn upsert_entry(conn: &DbConnection, entry: &OtpEntry) -> DomainResult<()> {
        conn.execute(
            OTP_UPSERT_SQL,
            params![
                entry.id.to_string(),
                entry.email,
                entry.code,
                entry.expires_at.timestamp(),
                entry.verified,
                entry.created_at.timestamp(),
            ],
        )
        .map_err(map_sql_error)?;
        Ok(())
    }

    fn delete_by_email(conn: &DbConnection, email: &str) -> DomainResult<()> {
        conn.execute(OTP_DELETE_SQL, params![email]).map_err(map_sql_error)?;
        Ok(())
    }

    fn delete_expired(conn: &DbConnection, now: i64) -> DomainResult<u64> {
        let removed = conn.execute(OTP_PURGE_SQL, params![now]).map_err(map_sql_error)?;
        Ok(removed as u64)
    }
}

#[async_trait]
impl OtpStore for SqliteOtpStore {
    async fn find(&self, email: &str) -> DomainResult<Option<OtpEntry>> {
        let db = Arc::clone(&self.db);
        let email = email.to_string();

        task::spawn_blocking(move || -> DomainResult<Option<OtpEntry>> {
            let conn = db.get_connection()?;
            Self::query_by_email(&conn, &email)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn upsert(&self, entry: &OtpEntry) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let row = entry.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            Self::upsert_entry(&conn, &row)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn delete(&self, email: &str) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let email = email.to_string();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            Self::delete_by_email(&conn, &email)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> DomainResult<u64> {
        let db = Arc::clone(&self.db);
        let now_secs = now.timestamp();

        task::spawn_blocking(move || -> DomainResult<u64> {
            let conn = db.get_connection()?;
            Self::delete_expired(&conn, now_secs)
        })
        .await
        .map_err(map_join_error)?
    }
}

const OTP_FIND_SQL: &str = "SELECT
        id, email, code, expires_at, verified, created_at
    FROM otp_entries
    WHERE email = ?1";

const OTP_UPSERT_SQL: &str = "INSERT INTO otp_entries (
        id, email, code, expires_at, verified, created_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
    ON CONFLICT(email) DO UPDATE SET
        id = excluded.id,
        code = excluded.code,
        expires_at = excluded.expires_at,
        verified = excluded.verified,
        created_at = excluded.created_at";

const OTP_DELETE_SQL: &str = "DELETE FROM otp_entries WHERE email = ?1";

const OTP_PURGE_SQL: &str = "DELETE FROM otp_entries WHERE expires_at <= ?1";

fn map_otp_row(row: &Row<'_>) -> rusqlite::Result<OtpEntry> {
    let raw_id: String = row.get(0)?;
    Ok(OtpEntry {
        id: parse_uuid(0, &raw_id)?,
        email: row.get(1)?,
        code: row.get(2)?,
        expires_at: epoch_to_datetime(3, row.get(3)?)?,
        verified: row.get(4)?,
        created_at: epoch_to_datetime(5, row.get(5)?)?,
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;

    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_find_returns_none_for_missing_email() {
        let (store, _mgr, _dir) = setup().await;

        let found = store.find("missing@example.com").await.expect("query succeeded");
        assert!(found.is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_upsert_then_find_roundtrip() {
        let (store, _mgr, _dir) = setup().await;
        let now = test_now();

        let entry = OtpEntry::issued(
            "ada@example.com".into(),
            "042137".into(),
            Duration::seconds(300),
            now,
        );
        store.upsert(&entry).await.expect("upsert succeeded");

        let found =
            store.find("ada@example.com").await.expect("query succeeded").expect("entry exists");
        assert_eq!(found.id, entry.id);
        assert_eq!(found.code, "042137");
        assert_eq!(found.expires_at, now + Duration::seconds(300));
        assert!(!found.verified);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_upsert_replaces_row_for_same_email() {
        let (store, mgr, _dir) = setup().await;
        let now = test_now();

        let first =
            OtpEntry::issued("ada@example.com".into(), "111111".into(), Duration::seconds(300), now);
        store.upsert(&first).await.expect("first upsert");

        let second = OtpEntry::issued(
            "ada@example.com".into(),
            "222222".into(),
            Duration::seconds(300),
            now + Duration::seconds(60),
        );
        store.upsert(&second).await.expect("second upsert");

        let found =
            store.find("ada@example.com").await.expect("query succeeded").expect("entry exists");
        assert_eq!(found.id, second.id, "replacement takes over the row");
        assert_eq!(found.code, "222222");

        let conn = mgr.get_connection().expect("connection acquired");
        let rows: i64 =
            conn.query_row("SELECT COUNT(*) FROM otp_entries", [], |r| r.get(0)).unwrap();
        assert_eq!(rows, 1, "one live row per email");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_verified_flag_roundtrips() {
        let (store, _mgr, _dir) = setup().await;
        let now = test_now();

        let mut entry =
            OtpEntry::issued("ada@example.com".into(), "042137".into(), Duration::seconds(300), now);
        entry.verified = true;
        store.upsert(&entry).await.expect("upsert succeeded");

        let found =
            store.find("ada@example.com").await.expect("query succeeded").expect("entry exists");
        assert!(found.verified);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_delete_removes_row_and_tolerates_missing() {
        let (store, _mgr, _dir) = setup().await;
        let now = test_now();

        let entry =
            OtpEntry::issued("ada@example.com".into(), "042137".into(), Duration::seconds(300), now);
        store.upsert(&entry).await.expect("upsert succeeded");

        store.delete("ada@example.com").await.expect("delete succeeded");
        assert!(store.find("ada@example.com").await.expect("query succeeded").is_none());

        store.delete("ada@example.com").await.expect("second delete tolerated");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_purge_removes_only_expired_rows() {
        let (store, _mgr, _dir) = setup().await;
        let now = test_now();
        let ttl = Duration::seconds(300);

        // Expired five minutes ago, expired exactly now, still live.
        let long_gone =
            OtpEntry::issued("a@example.com".into(), "111111".into(), ttl, now - ttl - ttl);
        let boundary = OtpEntry::issued("b@example.com".into(), "222222".into(), ttl, now - ttl);
        let live = OtpEntry::issued("c@example.com".into(), "333333".into(), ttl, now);

        for entry in [&long_gone, &boundary, &live] {
            store.upsert(entry).await.expect("upsert succeeded");
        }

        let removed = store.purge_expired(now).await.expect("purge succeeded");
        assert_eq!(removed, 2, "expiry boundary is inclusive");

        assert!(store.find("a@example.com").await.expect("query").is_none());
        assert!(store.find("b@example.com").await.expect("query").is_none());
        assert!(store.find("c@example.com").await.expect("query").is_some());
    }

    fn test_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 1, 9, 0, 0).single().expect("valid time")
    }

    /// Set up a test store with fresh database.
    async fn setup() -> (SqliteOtpStore, Arc<DbManager>, TempDir) {
        let temp_dir = TempDir::new().expect("temp dir created");
        let db_path = temp_dir.path().join("otp.db");

        let mgr = Arc::new(DbManager::new(&db_path, 4).expect("db manager created"));
        mgr.run_migrations().expect("migrations run");

        let store = SqliteOtpStore::new(mgr.clone());
        (store, mgr, temp_dir)
    }
}
