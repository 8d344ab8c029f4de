//! Entry operations: put, match, delete, list.
//!
//! A put is a single-row upsert, so concurrent writers to the same key
//! resolve last-write-wins with no versioning.

use super::connection::CacheDb;
use super::hash::RequestKey;
use crate::{Error, Response};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, OptionalExtension};

/// A response read back from a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub store: String,
    pub method: String,
    pub url: String,
    pub response: Response,
    pub stored_at: String,
}

/// Listing row for a stored entry, without its body.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct EntrySummary {
    pub method: String,
    pub url: String,
    pub status: u16,
    pub body_len: u64,
    pub stored_at: String,
}

const ENTRY_COLUMNS: &str = "e.store, e.method, e.url, e.status, e.status_text, e.headers_json, e.body, e.stored_at";

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<(StoredEntry, String)> {
    let headers_json: String = row.get(5)?;
    let body: Vec<u8> = row.get(6)?;
    let entry = StoredEntry {
        store: row.get(0)?,
        method: row.get(1)?,
        url: row.get(2)?,
        response: Response {
            status: row.get(3)?,
            status_text: row.get(4)?,
            headers: Vec::new(),
            body: Bytes::from(body),
        },
        stored_at: row.get(7)?,
    };
    Ok((entry, headers_json))
}

fn decode_headers(entry: (StoredEntry, String)) -> Result<StoredEntry, Error> {
    let (mut entry, headers_json) = entry;
    entry.response.headers =
        serde_json::from_str(&headers_json).map_err(|e| Error::CorruptEntry(format!("{}: {e}", entry.url)))?;
    Ok(entry)
}

impl CacheDb {
    /// Store a response under a request key, replacing any previous entry.
    ///
    /// Opens the store first if it doesn't exist yet.
    pub async fn put_entry(&self, store: &str, key: &RequestKey, response: &Response) -> Result<(), Error> {
        let headers_json = serde_json::to_string(&response.headers)
            .map_err(|e| Error::CorruptEntry(format!("{}: {e}", key.url)))?;
        let store = store.to_string();
        let key = key.clone();
        let response = response.clone();
        let now = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO cache_stores (name, created_at) VALUES (?1, ?2)",
                    params![store, now],
                )?;
                tx.execute(
                    "INSERT INTO cache_entries (
                        store, key_hash, method, url, status, status_text, headers_json, body, body_len, stored_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                    ON CONFLICT(store, key_hash) DO UPDATE SET
                        method = excluded.method,
                        url = excluded.url,
                        status = excluded.status,
                        status_text = excluded.status_text,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        body_len = excluded.body_len,
                        stored_at = excluded.stored_at",
                    params![
                        store,
                        key.hash,
                        key.method,
                        key.url,
                        response.status,
                        response.status_text,
                        headers_json,
                        response.body.as_ref(),
                        response.body.len() as i64,
                        now,
                    ],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up a key in one store.
    ///
    /// Returns None if the store or the entry doesn't exist.
    pub async fn match_entry(&self, store: &str, key: &RequestKey) -> Result<Option<StoredEntry>, Error> {
        let store = store.to_string();
        let hash = key.hash.clone();
        let raw = self
            .conn
            .call(move |conn| -> Result<Option<(StoredEntry, String)>, Error> {
                let sql = format!("SELECT {ENTRY_COLUMNS} FROM cache_entries e WHERE e.store = ?1 AND e.key_hash = ?2");
                let row = conn.query_row(&sql, params![store, hash], row_to_entry).optional()?;
                Ok(row)
            })
            .await
            .map_err(Error::from)?;

        raw.map(decode_headers).transpose()
    }

    /// Look up a key across every store, oldest store first.
    pub async fn match_any(&self, key: &RequestKey) -> Result<Option<StoredEntry>, Error> {
        let hash = key.hash.clone();
        let raw = self
            .conn
            .call(move |conn| -> Result<Option<(StoredEntry, String)>, Error> {
                let sql = format!(
                    "SELECT {ENTRY_COLUMNS} FROM cache_entries e
                     JOIN cache_stores s ON s.name = e.store
                     WHERE e.key_hash = ?1
                     ORDER BY s.id ASC LIMIT 1"
                );
                let row = conn.query_row(&sql, params![hash], row_to_entry).optional()?;
                Ok(row)
            })
            .await
            .map_err(Error::from)?;

        raw.map(decode_headers).transpose()
    }

    /// Remove a single entry. Returns false if it wasn't stored.
    pub async fn delete_entry(&self, store: &str, key: &RequestKey) -> Result<bool, Error> {
        let store = store.to_string();
        let hash = key.hash.clone();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted =
                    conn.execute("DELETE FROM cache_entries WHERE store = ?1 AND key_hash = ?2", params![store, hash])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in a store (0 if the store doesn't exist).
    pub async fn entry_count(&self, store: &str) -> Result<u64, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM cache_entries WHERE store = ?1", params![store], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// List the entries of a store, ordered by URL.
    pub async fn entries(&self, store: &str) -> Result<Vec<EntrySummary>, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<EntrySummary>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT method, url, status, body_len, stored_at FROM cache_entries
                     WHERE store = ?1 ORDER BY url ASC",
                )?;
                let rows = stmt
                    .query_map(params![store], |row| {
                        Ok(EntrySummary {
                            method: row.get(0)?,
                            url: row.get(1)?,
                            status: row.get(2)?,
                            body_len: row.get::<_, i64>(3)? as u64,
                            stored_at: row.get(4)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn js_response(body: &str) -> Response {
        Response::new(200, body.to_string())
            .with_status_text("OK")
            .with_header("Content-Type", "application/javascript")
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let key = RequestKey::get("https://app.test/logo.a1b2c3d4.js");

        db.put_entry("soci-app-runtime-v5", &key, &js_response("console.log(1)")).await.unwrap();

        let entry = db.match_entry("soci-app-runtime-v5", &key).await.unwrap().unwrap();
        assert_eq!(entry.url, "https://app.test/logo.a1b2c3d4.js");
        assert_eq!(entry.response, js_response("console.log(1)"));
        assert!(db.has_store("soci-app-runtime-v5").await.unwrap());
    }

    #[tokio::test]
    async fn test_match_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let key = RequestKey::get("https://app.test/nope.js");
        assert!(db.match_entry("soci-app-runtime-v5", &key).await.unwrap().is_none());
        assert!(db.match_any(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites_same_key() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let key = RequestKey::get("https://app.test/");

        db.put_entry("runtime", &key, &Response::new(200, "<h1>first</h1>")).await.unwrap();
        db.put_entry("runtime", &key, &Response::new(200, "<h1>second</h1>")).await.unwrap();

        assert_eq!(db.entry_count("runtime").await.unwrap(), 1);
        let entry = db.match_entry("runtime", &key).await.unwrap().unwrap();
        assert_eq!(entry.response.text(), "<h1>second</h1>");
    }

    #[tokio::test]
    async fn test_match_any_prefers_oldest_store() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let key = RequestKey::get("https://app.test/");
        db.open_store("static").await.unwrap();
        db.open_store("runtime").await.unwrap();

        db.put_entry("runtime", &key, &Response::new(200, "runtime")).await.unwrap();
        db.put_entry("static", &key, &Response::new(200, "static")).await.unwrap();

        let entry = db.match_any(&key).await.unwrap().unwrap();
        assert_eq!(entry.store, "static");
    }

    #[tokio::test]
    async fn test_delete_store_evicts_entries() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let key = RequestKey::get("https://app.test/api/roles");
        db.put_entry("v1-runtime", &key, &Response::new(200, "[]")).await.unwrap();

        db.delete_store("v1-runtime").await.unwrap();

        assert!(db.match_any(&key).await.unwrap().is_none());
        assert_eq!(db.entry_count("v1-runtime").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_entry_leaves_other_stores() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let key = RequestKey::get("https://app.test/api/roles");
        db.put_entry("static", &key, &Response::new(200, "static")).await.unwrap();
        db.put_entry("runtime", &key, &Response::new(200, "[]")).await.unwrap();

        assert!(db.delete_entry("runtime", &key).await.unwrap());
        assert!(!db.delete_entry("runtime", &key).await.unwrap());
        assert_eq!(db.match_any(&key).await.unwrap().unwrap().store, "static");
    }

    #[tokio::test]
    async fn test_entries_listing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_entry("runtime", &RequestKey::get("https://app.test/b.js"), &Response::new(200, "bb"))
            .await
            .unwrap();
        db.put_entry("runtime", &RequestKey::get("https://app.test/a.js"), &Response::new(200, "a"))
            .await
            .unwrap();

        let listed = db.entries("runtime").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].url, "https://app.test/a.js");
        assert_eq!(listed[0].body_len, 1);
        assert_eq!(listed[1].body_len, 2);
    }

    #[tokio::test]
    async fn test_corrupt_headers_reported() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let key = RequestKey::get("https://app.test/x.css");
        db.put_entry("runtime", &key, &Response::new(200, "body")).await.unwrap();
        db.conn
            .call(|conn| conn.execute("UPDATE cache_entries SET headers_json = 'not json'", []))
            .await
            .unwrap();

        let result = db.match_entry("runtime", &key).await;
        assert!(matches!(result, Err(Error::CorruptEntry(_))));
    }
}
