//! Connection bootstrap for snapshot databases.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON` and a busy timeout.
//! - Returned connections are migrated to [`latest_version`](super::migrations::latest_version).

use super::migrations::apply_migrations;
use super::{DbError, DbResult};
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens (creating if needed) a snapshot database file.
///
/// Emits one `event=db_open` line with duration and outcome.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    let path = path.as_ref();
    traced_open("file", || Connection::open(path))
}

/// Opens a private in-memory snapshot database.
pub fn open_db_in_memory() -> DbResult<Connection> {
    traced_open("memory", Connection::open_in_memory)
}

fn traced_open(
    mode: &'static str,
    open: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    let result = open()
        .map_err(|err| ("db_open_failed", DbError::from(err)))
        .and_then(|mut conn| match configure(&mut conn) {
            Ok(migrated) => Ok((conn, migrated)),
            Err(err) => Err(("db_bootstrap_failed", err)),
        });
    let elapsed_ms = started_at.elapsed().as_millis();

    match result {
        Ok((conn, migrated)) => {
            info!(
                "event=db_open module=db status=ok mode={mode} migrations_applied={migrated} duration_ms={elapsed_ms}"
            );
            Ok(conn)
        }
        Err((error_code, err)) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={elapsed_ms} error_code={error_code} error={err}"
            );
            Err(err)
        }
    }
}

/// Applies connection pragmas, then migrations. Returns the migrations run.
fn configure(conn: &mut Connection) -> DbResult<usize> {
    conn.pragma_update(None, "foreign_keys", true)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    apply_migrations(conn)
}

#[cfg(test)]
mod tests {
    use super::{open_db, open_db_in_memory};
    use crate::db::migrations::{latest_version, schema_version};
    use crate::db::DbError;
    use rusqlite::Connection;

    #[test]
    fn in_memory_connection_is_configured() {
        let conn = open_db_in_memory().unwrap();
        let foreign_keys: bool = conn
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .unwrap();
        assert!(foreign_keys);
        assert_eq!(schema_version(&conn).unwrap(), latest_version());
    }

    #[test]
    fn reopening_a_file_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blocktree.db");

        drop(open_db(&path).unwrap());
        let conn = open_db(&path).unwrap();
        assert_eq!(schema_version(&conn).unwrap(), latest_version());
    }

    #[test]
    fn file_from_a_newer_binary_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("future.db");
        let conn = Connection::open(&path).unwrap();
        conn.pragma_update(None, "user_version", 999).unwrap();
        drop(conn);

        assert!(matches!(
            open_db(&path),
            Err(DbError::UnsupportedSchemaVersion {
                db_version: 999,
                ..
            })
        ));
    }
}
