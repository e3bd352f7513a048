//! Key-value slot storage. Each slot holds one UTF-8 JSON document; the
//! repository is the only caller.

use anyhow::Context;
use rusqlite::{Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

pub const DB_FILE: &str = "edutrack.sqlite3";

pub const SLOT_STUDENTS: &str = "students";
pub const SLOT_TEACHERS: &str = "teachers";
pub const SLOT_STUDENT_ATTENDANCE: &str = "studentAttendance";
pub const SLOT_TEACHER_ATTENDANCE: &str = "teacherAttendance";

pub fn open_store(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)
        .with_context(|| format!("failed to create workspace {}", workspace.to_string_lossy()))?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.to_string_lossy()))?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS slots(
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT
        )",
        [],
    )?;

    Ok(conn)
}

pub fn slot_get(conn: &Connection, key: &str) -> anyhow::Result<Option<String>> {
    conn.query_row("SELECT value FROM slots WHERE key = ?", [key], |r| r.get(0))
        .optional()
        .with_context(|| format!("failed to read slot {}", key))
}

pub fn slot_set(conn: &Connection, key: &str, value: &str) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO slots(key, value, updated_at)
         VALUES(?, ?, strftime('%Y-%m-%dT%H:%M:%SZ','now'))
         ON CONFLICT(key) DO UPDATE SET
           value = excluded.value,
           updated_at = excluded.updated_at",
        (key, value),
    )
    .with_context(|| format!("failed to write slot {}", key))?;
    Ok(())
}

/// None when the slot has never been written. A slot that exists but fails to
/// parse is an error with no recovery path.
pub fn slot_get_json<T: DeserializeOwned>(conn: &Connection, key: &str) -> anyhow::Result<Option<T>> {
    let Some(raw) = slot_get(conn, key)? else {
        return Ok(None);
    };
    let value =
        serde_json::from_str(&raw).with_context(|| format!("slot {} holds malformed JSON", key))?;
    Ok(Some(value))
}

pub fn slot_set_json<T: Serialize>(conn: &Connection, key: &str, value: &T) -> anyhow::Result<()> {
    let raw =
        serde_json::to_string(value).with_context(|| format!("failed to serialize slot {}", key))?;
    slot_set(conn, key, &raw)
}
