//! SQLite connection pooling
//!
//! Per-connection pragmas are applied through the pool's init hook so every
//! checked-out connection has the same settings:
//! - WAL mode for better concurrency
//! - NORMAL synchronous mode for balanced safety/performance
//! - WAL autocheckpoint for automatic checkpoint management
//! - Foreign key constraints enabled
//! - Busy timeout for handling lock contention

use std::path::Path;
use std::time::Duration;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

/// Pooled SQLite handle shared by the repositories.
pub type DbPool = Pool<SqliteConnectionManager>;

/// One checked-out pool connection.
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// How long `get_connection` waits for a free slot before failing.
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// How long a connection retries on a locked database before surfacing
/// `SQLITE_BUSY`.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Create a connection pool for the database at `path`.
///
/// `max_size` is clamped to at least one connection.
pub fn create_pool(path: &Path, max_size: u32) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(path).with_init(|conn| apply_pragmas(conn));

    Pool::builder()
        .max_size(max_size.max(1))
        .connection_timeout(CONNECTION_TIMEOUT)
        .build(manager)
}

/// Apply connection-level pragmas.
fn apply_pragmas(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;\n\
         PRAGMA wal_autocheckpoint=1000;\n\
         PRAGMA synchronous=NORMAL;\n\
         PRAGMA foreign_keys=ON;\n",
    )?;

    // Busy timeout is a separate call as it takes a parameter.
    conn.busy_timeout(BUSY_TIMEOUT)?;

    Ok(())
}
