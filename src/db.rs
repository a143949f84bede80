use rusqlite::{Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Opens (creating if needed) the workspace database. Collections are stored
/// as JSON text blobs in a single key/value table, one fixed key per kind,
/// mirroring the browser-local storage model this tool replaces.
pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join("idcards.sqlite3");
    let conn = Connection::open(db_path)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv(
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )?;

    Ok(conn)
}

/// Serializes `value` and stores it under `key`, replacing any previous blob.
pub fn kv_save<T: Serialize>(conn: &Connection, key: &str, value: &T) -> anyhow::Result<()> {
    let text = serde_json::to_string(value)?;
    conn.execute(
        "INSERT OR REPLACE INTO kv(key, value) VALUES(?, ?)",
        (key, &text),
    )?;
    Ok(())
}

/// Loads the blob stored under `key`. A missing row and a blob that no longer
/// deserializes are both reported as `None`; corrupt data must never prevent
/// the store from starting with an empty collection.
pub fn kv_load<T: DeserializeOwned>(conn: &Connection, key: &str) -> Option<T> {
    let text: Option<String> = conn
        .query_row("SELECT value FROM kv WHERE key = ?", [key], |r| r.get(0))
        .optional()
        .ok()
        .flatten();
    text.and_then(|t| serde_json::from_str(&t).ok())
}
