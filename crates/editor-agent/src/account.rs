//! Saved-account access: the auth rows in the target's `state.vscdb`
//! SQLite database (`ItemTable` key/value schema).

use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

use hookswitch_core::{BackendError, BackendResult};

pub const EMAIL_KEY: &str = "cursorAuth/cachedEmail";
pub const ACCESS_TOKEN_KEY: &str = "cursorAuth/accessToken";
pub const REFRESH_TOKEN_KEY: &str = "cursorAuth/refreshToken";

// ─── Read / write ─────────────────────────────────────────────────────────

/// Read `(email, access_token)`; empty strings when the database or the
/// rows don't exist yet (signed-out install).
pub fn read_account(db: &Path) -> BackendResult<(String, String)> {
    if !db.is_file() {
        return Ok((String::new(), String::new()));
    }
    let conn = open(db)?;
    let email = read_item(&conn, EMAIL_KEY)?.unwrap_or_default();
    let token = read_item(&conn, ACCESS_TOKEN_KEY)?.unwrap_or_default();
    Ok((email, token))
}

/// Upsert the auth rows. The access token doubles as the refresh token —
/// the target refreshes it on next start.
pub fn write_account(db: &Path, email: &str, token: &str) -> BackendResult<()> {
    if let Some(parent) = db.parent() {
        std::fs::create_dir_all(parent).map_err(BackendError::Io)?;
    }
    let conn = open(db)?;
    write_item(&conn, EMAIL_KEY, email)?;
    write_item(&conn, ACCESS_TOKEN_KEY, token)?;
    write_item(&conn, REFRESH_TOKEN_KEY, token)?;
    Ok(())
}

// ─── Internal ─────────────────────────────────────────────────────────────

fn open(db: &Path) -> BackendResult<Connection> {
    let conn = Connection::open(db).map_err(db_err)?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS ItemTable (key TEXT PRIMARY KEY, value BLOB)",
        [],
    )
    .map_err(db_err)?;
    Ok(conn)
}

fn read_item(conn: &Connection, key: &str) -> BackendResult<Option<String>> {
    conn.query_row("SELECT value FROM ItemTable WHERE key = ?1", [key], |row| {
        row.get::<_, String>(0)
    })
    .optional()
    .map_err(db_err)
}

fn write_item(conn: &Connection, key: &str, value: &str) -> BackendResult<()> {
    conn.execute(
        "INSERT INTO ItemTable (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        [key, value],
    )
    .map_err(db_err)?;
    Ok(())
}

/// A locked database means the target holds it open — that's the busy
/// condition the orchestrator resolves with a kill, not an opaque failure.
fn db_err(e: rusqlite::Error) -> BackendError {
    if let rusqlite::Error::SqliteFailure(inner, _) = &e {
        if matches!(
            inner.code,
            rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
        ) {
            return BackendError::ProcessBusy;
        }
    }
    BackendError::Other(format!("state database error: {e}"))
}

// ─── Tests ────────────────────────────────────────────────────────────────
