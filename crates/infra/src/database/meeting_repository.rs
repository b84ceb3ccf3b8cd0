//! SQLite-backed meeting repository.
//!
//! Implements the `MeetingRepository` trait for persisted meetings. All
//! database operations run in `spawn_blocking` to avoid blocking the async
//! runtime.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use cohort_core::MeetingRepository;
use cohort_domain::{Meeting, MeetingDraft, Result as DomainResult};
use rusqlite::{params, Row};
use tokio::task;

use super::manager::DbManager;
use super::pool::DbConnection;
use super::{epoch_to_datetime, map_join_error, map_sql_error};

/// SQLite-backed meeting repository.
pub struct SqliteMeetingRepository {
    db: Arc<DbManager>,
}

impl SqliteMeetingRepository {
    /// Construct a repository backed by the shared database manager.
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    fn insert_meeting(
        conn: &DbConnection,
        draft: &MeetingDraft,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Meeting> {
        conn.execute(
            MEETING_INSERT_SQL,
            params![
                draft.title,
                draft.description,
                draft.scheduled_at.timestamp(),
                draft.meeting_link,
                draft.batch_id,
                created_at.timestamp(),
            ],
        )
        .map_err(map_sql_error)?;

        Ok(Meeting {
            id: conn.last_insert_rowid(),
            title: draft.title.clone(),
            description: draft.description.clone(),
            scheduled_at: draft.scheduled_at,
            meeting_link: draft.meeting_link.clone(),
            batch_id: draft.batch_id,
            created_at,
        })
    }

    fn query_window(conn: &DbConnection, from: i64, to: i64) -> DomainResult<Vec<Meeting>> {
        let mut stmt = conn.prepare(MEETING_WINDOW_SQL).map_err(map_sql_error)?;
        let meetings = stmt
            .query_map(params![from, to], map_meeting_row)
            .map_err(map_sql_error)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(map_sql_error)?;
        Ok(meetings)
    }

    fn query_by_id(conn: &DbConnection, id: i64) -> DomainResult<Option<Meeting>> {
        match conn.query_row(MEETING_BY_ID_SQL, params![id], map_meeting_row) {
            Ok(meeting) => Ok(Some(meeting)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(err) => Err(map_sql_error(err)),
        }
    }

    fn query_upcoming(conn: &DbConnection, batch_id: i64, now: i64) -> DomainResult<Vec<Meeting>> {
        let mut stmt = conn.prepare(MEETING_UPCOMING_SQL).map_err(map_sql_error)?;
        let meetings = stmt
            .query_map(params![batch_id, now], map_meeting_row)
            .map_err(map_sql_error)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(map_sql_error)?;
        Ok(meetings)
    }
}

#[async_trait]
impl MeetingRepository for SqliteMeetingRepository {
    async fn starting_within(
        &self,
        from: DateTime<Utc>,
        window: Duration,
    ) -> DomainResult<Vec<Meeting>> {
        let db = Arc::clone(&self.db);
        let from_secs = from.timestamp();
        let to_secs = (from + window).timestamp();

        task::spawn_blocking(move || -> DomainResult<Vec<Meeting>> {
            let conn = db.get_connection()?;
            Self::query_window(&conn, from_secs, to_secs)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn find_by_id(&self, id: i64) -> DomainResult<Option<Meeting>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Option<Meeting>> {
            let conn = db.get_connection()?;
            Self::query_by_id(&conn, id)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn insert(&self, draft: MeetingDraft) -> DomainResult<Meeting> {
        let db = Arc::clone(&self.db);
        let created_at = Utc::now();

        task::spawn_blocking(move || -> DomainResult<Meeting> {
            let conn = db.get_connection()?;
            Self::insert_meeting(&conn, &draft, created_at)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn upcoming_for_batch(
        &self,
        batch_id: i64,
        now: DateTime<Utc>,
    ) -> DomainResult<Vec<Meeting>> {
        let db = Arc::clone(&self.db);
        let now_secs = now.timestamp();

        task::spawn_blocking(move || -> DomainResult<Vec<Meeting>> {
            let conn = db.get_connection()?;
            Self::query_upcoming(&conn, batch_id, now_secs)
        })
        .await
        .map_err(map_join_error)?
    }
}

const MEETING_INSERT_SQL: &str = "INSERT INTO meetings (
        title, description, scheduled_at, meeting_link, batch_id, created_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

const MEETING_WINDOW_SQL: &str = "SELECT
        id, title, description, scheduled_at, meeting_link, batch_id, created_at
    FROM meetings
    WHERE scheduled_at > ?1 AND scheduled_at <= ?2
    ORDER BY scheduled_at ASC";

const MEETING_BY_ID_SQL: &str = "SELECT
        id, title, description, scheduled_at, meeting_link, batch_id, created_at
    FROM meetings
    WHERE id = ?1";

const MEETING_UPCOMING_SQL: &str = "SELECT
        id, title, description, scheduled_at, meeting_link, batch_id, created_at
    FROM meetings
    WHERE batch_id = ?1 AND scheduled_at >= ?2
    ORDER BY scheduled_at ASC";

fn map_meeting_row(row: &Row<'_>) -> rusqlite::Result<Meeting> {
    Ok(Meeting {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        scheduled_at: epoch_to_datetime(3, row.get(3)?)?,
        meeting_link: row.get(4)?,
        batch_id: row.get(5)?,
        created_at: epoch_to_datetime(6, row.get(6)?)?,
    })
}

// ============================================================================
// Tests
// ============================================================================
