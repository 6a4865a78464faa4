use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, Row, params};
use serde_json::Value;
use tracing::warn;

use super::Store;
use crate::collections::{Collection, CollectionId, CollectionItem, NewCollectionItem};
use crate::error::{Error, Result};
use crate::history::{HistoryEntry, HistoryId, NewHistoryEntry};
use crate::http::request::RequestSpec;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS history (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  url TEXT NOT NULL,
  method TEXT NOT NULL,
  headers TEXT NOT NULL,
  body TEXT NOT NULL,
  raw_body TEXT,
  response TEXT NOT NULL,
  created_at INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS collections (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS collection_items (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  collection_id INTEGER NOT NULL REFERENCES collections(id),
  url TEXT NOT NULL,
  method TEXT NOT NULL,
  headers TEXT NOT NULL,
  body TEXT NOT NULL,
  raw_body TEXT
);
";

/// SQLite-backed store. JSON columns are stored as text.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

/// Columns as read, before the JSON columns are decoded.
struct RawRequest {
    url: String,
    method: String,
    headers: String,
    body: String,
    raw_body: Option<String>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        // Databases created before bodies kept their typed text.
        add_missing_column(&conn, "history", "raw_body", "TEXT")?;
        add_missing_column(&conn, "collection_items", "raw_body", "TEXT")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // SQLite keeps its own consistency; a poisoned guard is still usable.
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Store for SqliteStore {
    fn list_history(&self) -> Result<Vec<HistoryEntry>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, url, method, headers, body, raw_body, response, created_at
             FROM history
             ORDER BY created_at DESC, id DESC",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, HistoryId>(0)?,
                    raw_request(row, 1)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, i64>(7)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let entries = rows
            .into_iter()
            .filter_map(|(id, raw, response, created_at)| {
                let decoded = decode_request(raw).and_then(|request| {
                    Ok(HistoryEntry {
                        id,
                        request,
                        response: decode_json("stored response", &response)?,
                        created_at,
                    })
                });
                decoded
                    .inspect_err(|err| warn!(id, "skipping unreadable history entry: {err}"))
                    .ok()
            })
            .collect();
        Ok(entries)
    }

    fn insert_history(&self, entry: &NewHistoryEntry) -> Result<HistoryEntry> {
        let (headers, body) = encode_request(&entry.request)?;
        let response = encode_json("response", &entry.response)?;

        let conn = self.conn();
        conn.execute(
            "INSERT INTO history (url, method, headers, body, raw_body, response, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.request.url,
                entry.request.method.as_str(),
                headers,
                body,
                entry.request.raw_body,
                response,
                entry.created_at
            ],
        )?;

        Ok(HistoryEntry {
            id: conn.last_insert_rowid(),
            request: entry.request.clone(),
            response: entry.response.clone(),
            created_at: entry.created_at,
        })
    }

    fn delete_history(&self, id: HistoryId) -> Result<()> {
        self.conn()
            .execute("DELETE FROM history WHERE id = ?1", params![id])?;
        Ok(())
    }

    fn clear_history(&self) -> Result<()> {
        self.conn().execute("DELETE FROM history", [])?;
        Ok(())
    }

    fn list_collections(&self) -> Result<Vec<Collection>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT id, name FROM collections ORDER BY id")?;
        let collections = stmt
            .query_map([], |row| {
                Ok(Collection {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(collections)
    }

    fn create_collection(&self, name: &str) -> Result<Collection> {
        let conn = self.conn();
        conn.execute("INSERT INTO collections (name) VALUES (?1)", params![name])?;
        Ok(Collection {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
        })
    }

    fn insert_collection_item(&self, item: &NewCollectionItem) -> Result<CollectionItem> {
        let (headers, body) = encode_request(&item.request)?;

        let conn = self.conn();
        conn.execute(
            "INSERT INTO collection_items (collection_id, url, method, headers, body, raw_body)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                item.collection_id,
                item.request.url,
                item.request.method.as_str(),
                headers,
                body,
                item.request.raw_body
            ],
        )?;

        Ok(CollectionItem {
            id: conn.last_insert_rowid(),
            collection_id: item.collection_id,
            request: item.request.clone(),
        })
    }

    fn list_collection_items(&self, collection_id: CollectionId) -> Result<Vec<CollectionItem>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, collection_id, url, method, headers, body, raw_body
             FROM collection_items
             WHERE collection_id = ?1
             ORDER BY id",
        )?;

        let rows = stmt
            .query_map(params![collection_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, CollectionId>(1)?,
                    raw_request(row, 2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let items = rows
            .into_iter()
            .filter_map(|(id, collection_id, raw)| {
                decode_request(raw)
                    .map(|request| CollectionItem {
                        id,
                        collection_id,
                        request,
                    })
                    .inspect_err(|err| warn!(id, "skipping unreadable collection item: {err}"))
                    .ok()
            })
            .collect();
        Ok(items)
    }
}

/// Reads `url, method, headers, body, raw_body` starting at column `first`.
fn raw_request(row: &Row<'_>, first: usize) -> rusqlite::Result<RawRequest> {
    Ok(RawRequest {
        url: row.get(first)?,
        method: row.get(first + 1)?,
        headers: row.get(first + 2)?,
        body: row.get(first + 3)?,
        raw_body: row.get(first + 4)?,
    })
}

fn add_missing_column(conn: &Connection, table: &str, column: &str, decl: &str) -> Result<()> {
    let present: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM pragma_table_info(?1) WHERE name = ?2",
        params![table, column],
        |row| row.get(0),
    )?;
    if !present {
        conn.execute_batch(&format!("ALTER TABLE {table} ADD COLUMN {column} {decl}"))?;
    }
    Ok(())
}

fn decode_request(raw: RawRequest) -> Result<RequestSpec> {
    Ok(RequestSpec {
        url: raw.url,
        method: raw.method.parse()?,
        headers: serde_json::from_str(&raw.headers).map_err(|source| Error::Json {
            field: "stored headers",
            source,
        })?,
        body: decode_json("stored body", &raw.body)?,
        raw_body: raw.raw_body,
    })
}

fn encode_request(request: &RequestSpec) -> Result<(String, String)> {
    let headers = serde_json::to_string(&request.headers).map_err(|source| Error::Encode {
        what: "headers",
        source,
    })?;
    Ok((headers, encode_json("body", &request.body)?))
}

fn decode_json(field: &'static str, raw: &str) -> Result<Value> {
    serde_json::from_str(raw).map_err(|source| Error::Json { field, source })
}

fn encode_json(what: &'static str, value: &Value) -> Result<String> {
    serde_json::to_string(value).map_err(|source| Error::Encode { what, source })
}
