//! SQLite-backed batch membership repository.
//!
//! Resolves the reminder audience: who belongs to a batch and whether a
//! batch exists at all. All database operations run in `spawn_blocking` to
//! avoid blocking the async runtime.

use std::sync::Arc;

use async_trait::async_trait;
use cohort_core::MembershipRepository;
use cohort_domain::{BatchMember, Result as DomainResult};
use rusqlite::{params, Row};
use tokio::task;

use super::manager::DbManager;
use super::pool::DbConnection;
use super::{map_join_error, map_sql_error};

/// SQLite-backed membership repository.
pub struct SqliteMembershipRepository {
    db: Arc<DbManager>,
}

impl SqliteMembershipRepository {
    /// Construct a repository backed by the shared database manager.
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    fn query_members(conn: &DbConnection, batch_id: i64) -> DomainResult<Vec<BatchMember>> {
        let mut stmt = conn.prepare(MEMBERS_OF_BATCH_SQL).map_err(map_sql_error)?;
        let members = stmt
            .query_map(params![batch_id], map_member_row)
            .map_err(map_sql_error)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(map_sql_error)?;
        Ok(members)
    }

    fn query_batch_exists(conn: &DbConnection, batch_id: i64) -> DomainResult<bool> {
        let exists: i64 = conn
            .query_row(BATCH_EXISTS_SQL, params![batch_id], |row| row.get(0))
            .map_err(map_sql_error)?;
        Ok(exists != 0)
    }
}

#[async_trait]
impl MembershipRepository for SqliteMembershipRepository {
    async fn members_of_batch(&self, batch_id: i64) -> DomainResult<Vec<BatchMember>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<BatchMember>> {
            let conn = db.get_connection()?;
            Self::query_members(&conn, batch_id)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn batch_exists(&self, batch_id: i64) -> DomainResult<bool> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<bool> {
            let conn = db.get_connection()?;
            Self::query_batch_exists(&conn, batch_id)
        })
        .await
        .map_err(map_join_error)?
    }
}

const MEMBERS_OF_BATCH_SQL: &str = "SELECT
        member_id, display_name, email
    FROM batch_members
    WHERE batch_id = ?1
    ORDER BY display_name ASC";

const BATCH_EXISTS_SQL: &str = "SELECT EXISTS(SELECT 1 FROM batches WHERE id = ?1)";

fn map_member_row(row: &Row<'_>) -> rusqlite::Result<BatchMember> {
    Ok(BatchMember { member_id: row.get(0)?, display_name: row.get(1)?, email: row.get(2)? })
}

// ============================================================================
// Tests
// ============================================================================
