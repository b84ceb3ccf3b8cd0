//! SQLite-backed reminder row repository.
//!
//! Implements the `NotificationRepository` trait. The table carries a
//! `UNIQUE(meeting_id, batch_id)` constraint, so `upsert_pending` relies on
//! `ON CONFLICT DO NOTHING` and reports through its return value whether a
//! row was actually created. All database operations run in
//! `spawn_blocking` to avoid blocking the async runtime.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use cohort_core::NotificationRepository;
use cohort_domain::constants::MEETING_RECENCY_MINS;
use cohort_domain::{Notification, Result as DomainResult};
use rusqlite::{params, params_from_iter, Row};
use tokio::task;
use uuid::Uuid;

use super::manager::DbManager;
use super::pool::DbConnection;
use super::{epoch_to_datetime, map_join_error, map_sql_error, parse_uuid};

/// SQLite-backed notification repository.
pub struct SqliteNotificationRepository {
    db: Arc<DbManager>,
}

impl SqliteNotificationRepository {
    /// Construct a repository backed by the shared database manager.
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    fn insert_pending(conn: &DbConnection, row: &Notification) -> DomainResult<bool> {
        let inserted = conn
            .execute(
                NOTIFICATION_UPSERT_SQL,
                params![
                    row.id.to_string(),
                    row.meeting_id,
                    row.batch_id,
                    row.notify_at.timestamp(),
                    row.message,
                    row.is_sent,
                    row.created_at.timestamp(),
                ],
            )
            .map_err(map_sql_error)?;
        Ok(inserted > 0)
    }

    fn query_due(conn: &DbConnection, now: i64) -> DomainResult<Vec<Notification>> {
        let mut stmt = conn.prepare(NOTIFICATION_DUE_SQL).map_err(map_sql_error)?;
        let due = stmt
            .query_map(params![now], map_notification_row)
            .map_err(map_sql_error)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(map_sql_error)?;
        Ok(due)
    }

    fn update_sent(conn: &DbConnection, id: Uuid) -> DomainResult<()> {
        // Zero rows means the reminder is already gone; marking sent is
        // idempotent either way.
        conn.execute(NOTIFICATION_MARK_SENT_SQL, params![id.to_string()])
            .map_err(map_sql_error)?;
        Ok(())
    }

    fn query_recent(
        conn: &DbConnection,
        batch_ids: &[i64],
        cutoff: i64,
        now: i64,
    ) -> DomainResult<Vec<Notification>> {
        let sql = recent_sql(batch_ids.len());
        let mut stmt = conn.prepare(&sql).map_err(map_sql_error)?;

        let bindings = batch_ids.iter().copied().chain([cutoff, now]);
        let recent = stmt
            .query_map(params_from_iter(bindings), map_notification_row)
            .map_err(map_sql_error)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(map_sql_error)?;
        Ok(recent)
    }
}

#[async_trait]
impl NotificationRepository for SqliteNotificationRepository {
    async fn upsert_pending(&self, notification: &Notification) -> DomainResult<bool> {
        let db = Arc::clone(&self.db);
        let row = notification.clone();

        task::spawn_blocking(move || -> DomainResult<bool> {
            let conn = db.get_connection()?;
            Self::insert_pending(&conn, &row)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn due_unsent(&self, now: DateTime<Utc>) -> DomainResult<Vec<Notification>> {
        let db = Arc::clone(&self.db);
        let now_secs = now.timestamp();

        task::spawn_blocking(move || -> DomainResult<Vec<Notification>> {
            let conn = db.get_connection()?;
            Self::query_due(&conn, now_secs)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn mark_sent(&self, id: Uuid) -> DomainResult<()> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            Self::update_sent(&conn, id)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn recent_for_batches(
        &self,
        batch_ids: &[i64],
        now: DateTime<Utc>,
    ) -> DomainResult<Vec<Notification>> {
        if batch_ids.is_empty() {
            return Ok(Vec::new());
        }

        let db = Arc::clone(&self.db);
        let ids = batch_ids.to_vec();
        let cutoff = (now - Duration::minutes(MEETING_RECENCY_MINS)).timestamp();
        let now_secs = now.timestamp();

        task::spawn_blocking(move || -> DomainResult<Vec<Notification>> {
            let conn = db.get_connection()?;
            Self::query_recent(&conn, &ids, cutoff, now_secs)
        })
        .await
        .map_err(map_join_error)?
    }
}

const NOTIFICATION_UPSERT_SQL: &str = "INSERT INTO notifications (
        id, meeting_id, batch_id, notify_at, message, is_sent, created_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
    ON CONFLICT(meeting_id, batch_id) DO NOTHING";

const NOTIFICATION_DUE_SQL: &str = "SELECT
        id, meeting_id, batch_id, notify_at, message, is_sent, created_at
    FROM notifications
    WHERE is_sent = 0 AND notify_at <= ?1
    ORDER BY notify_at ASC";

const NOTIFICATION_MARK_SENT_SQL: &str = "UPDATE notifications SET is_sent = 1 WHERE id = ?1";

/// Listing query with one placeholder per batch id. A reminder is visible
/// once sent or due, and only while its meeting is recent enough to matter.
fn recent_sql(batch_count: usize) -> String {
    let placeholders = vec!["?"; batch_count].join(", ");
    format!(
        "SELECT
            n.id, n.meeting_id, n.batch_id, n.notify_at, n.message, n.is_sent, n.created_at
        FROM notifications n
        JOIN meetings m ON m.id = n.meeting_id
        WHERE n.batch_id IN ({placeholders})
          AND m.scheduled_at >= ?
          AND (n.is_sent = 1 OR n.notify_at <= ?)
        ORDER BY n.notify_at DESC"
    )
}

fn map_notification_row(row: &Row<'_>) -> rusqlite::Result<Notification> {
    let raw_id: String = row.get(0)?;
    Ok(Notification {
        id: parse_uuid(0, &raw_id)?,
        meeting_id: row.get(1)?,
        batch_id: row.get(2)?,
        notify_at: epoch_to_datetime(3, row.get(3)?)?,
        message: row.get(4)?,
        is_sent: row.get(5)?,
        created_at: epoch_to_datetime(6, row.get(6)?)?,
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use tempfile::TempDir;

    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_upsert_inserts_once_per_meeting_and_batch() {
        let (repo, _mgr, _dir) = setup().await;
        let now = test_now();

        let first = Notification::pending(10, 1, now, "first message".into(), now);
        assert!(repo.upsert_pending(&first).await.expect("insert succeeded"));

        // Same (meeting, batch) pair with a fresh id must be a no-op.
        let second = Notification::pending(10, 1, now, "second message".into(), now);
        assert!(!repo.upsert_pending(&second).await.expect("conflict ignored"));

        let due = repo.due_unsent(now).await.expect("query succeeded");
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, first.id, "existing row left untouched");
        assert_eq!(due[0].message, "first message");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_due_unsent_filters_and_sorts() {
        let (repo, _mgr, _dir) = setup().await;
        let now = test_now();

        let earlier = Notification::pending(1, 1, now - Duration::minutes(5), "earlier".into(), now);
        let at_now = Notification::pending(2, 1, now, "at now".into(), now);
        let future = Notification::pending(3, 1, now + Duration::minutes(5), "future".into(), now);
        let sent = Notification::pending(4, 1, now - Duration::minutes(10), "sent".into(), now);

        for row in [&earlier, &at_now, &future, &sent] {
            assert!(repo.upsert_pending(row).await.expect("insert succeeded"));
        }
        repo.mark_sent(sent.id).await.expect("mark succeeded");

        let due = repo.due_unsent(now).await.expect("query succeeded");
        let messages: Vec<_> = due.iter().map(|n| n.message.as_str()).collect();
        assert_eq!(messages, vec!["earlier", "at now"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_mark_sent_is_permanent_and_idempotent() {
        let (repo, mgr, _dir) = setup().await;
        let now = test_now();

        let row = Notification::pending(1, 1, now, "message".into(), now);
        repo.upsert_pending(&row).await.expect("insert succeeded");

        repo.mark_sent(row.id).await.expect("first mark succeeded");
        repo.mark_sent(row.id).await.expect("second mark succeeded");

        assert!(repo.due_unsent(now).await.expect("query succeeded").is_empty());

        let conn = mgr.get_connection().expect("connection acquired");
        let is_sent: bool = conn
            .query_row(
                "SELECT is_sent FROM notifications WHERE id = ?1",
                params![row.id.to_string()],
                |r| r.get(0),
            )
            .expect("row exists");
        assert!(is_sent);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_mark_sent_on_missing_row_is_not_an_error() {
        let (repo, _mgr, _dir) = setup().await;

        repo.mark_sent(Uuid::now_v7()).await.expect("missing row tolerated");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_recent_for_batches_scopes_and_orders() {
        let (repo, mgr, _dir) = setup().await;
        let now = test_now();

        // Meetings: recent ones in both batches, plus one long past.
        seed_meeting(&mgr, 10, 1, now + Duration::hours(1));
        seed_meeting(&mgr, 11, 1, now - Duration::hours(2));
        seed_meeting(&mgr, 12, 2, now + Duration::hours(1));
        seed_meeting(&mgr, 13, 1, now + Duration::hours(1));
        seed_meeting(&mgr, 14, 1, now + Duration::hours(2));

        let visible_due =
            Notification::pending(10, 1, now - Duration::minutes(1), "due".into(), now);
        let hidden_future =
            Notification::pending(13, 1, now + Duration::minutes(30), "future".into(), now);
        let old_meeting = Notification::pending(11, 1, now, "old meeting".into(), now);
        let other_batch = Notification::pending(12, 2, now, "other batch".into(), now);

        for row in [&visible_due, &hidden_future, &old_meeting, &other_batch] {
            repo.upsert_pending(row).await.expect("insert succeeded");
        }

        // A sent reminder stays visible even with a future notify_at.
        let visible_sent =
            Notification::pending(14, 1, now + Duration::minutes(10), "sent".into(), now);
        repo.upsert_pending(&visible_sent).await.expect("insert succeeded");
        repo.mark_sent(visible_sent.id).await.expect("mark succeeded");

        let recent = repo.recent_for_batches(&[1], now).await.expect("query succeeded");
        let messages: Vec<_> = recent.iter().map(|n| n.message.as_str()).collect();
        assert_eq!(messages, vec!["sent", "due"], "newest notify_at first");

        let both = repo.recent_for_batches(&[1, 2], now).await.expect("query succeeded");
        let messages: Vec<_> = both.iter().map(|n| n.message.as_str()).collect();
        assert_eq!(messages, vec!["sent", "other batch", "due"]);

        assert!(repo.recent_for_batches(&[], now).await.expect("query succeeded").is_empty());
    }

    fn test_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 1, 12, 0, 0).single().expect("valid time")
    }

    fn seed_meeting(mgr: &DbManager, id: i64, batch_id: i64, scheduled_at: DateTime<Utc>) {
        let conn = mgr.get_connection().expect("connection acquired");
        conn.execute(
            "INSERT INTO meetings (id, title, description, scheduled_at, meeting_link, batch_id, created_at)
             VALUES (?1, 'Sync', NULL, ?2, 'https://meet.example.com/x', ?3, ?2)",
            params![id, scheduled_at.timestamp(), batch_id],
        )
        .expect("meeting seeded");
    }

    /// Set up a test repository with fresh database and two batches.
    async fn setup() -> (SqliteNotificationRepository, Arc<DbManager>, TempDir) {
        let temp_dir = TempDir::new().expect("temp dir created");
        let db_path = temp_dir.path().join("notifications.db");

        let mgr = Arc::new(DbManager::new(&db_path, 4).expect("db manager created"));
        mgr.run_migrations().expect("migrations run");

        let conn = mgr.get_connection().expect("connection acquired");
        conn.execute_batch(
            "INSERT INTO batches (id, name, start_date, end_date) VALUES (1, 'First', 0, 0);
             INSERT INTO batches (id, name, start_date, end_date) VALUES (2, 'Second', 0, 0);",
        )
        .expect("batches seeded");
        drop(conn);

        let repo = SqliteNotificationRepository::new(mgr.clone());
        (repo, mgr, temp_dir)
    }
}
