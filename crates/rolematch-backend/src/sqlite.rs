//! SQLite document store.
//!
//! One row per document key. The roster is stored as a JSON payload; version
//! and provenance are real columns so they can be inspected with `sqlite3`.

use std::path::Path;

use async_trait::async_trait;
use parking_lot::Mutex;
use rolematch_types::{Document, DocumentKey, Principal, PrincipalId, Roster, now_millis};
use rusqlite::{Connection, OptionalExtension, params};

use crate::error::StoreResult;
use crate::feed::{ChangeEvent, ChangeFeed, Subscription};
use crate::store::{DocumentStore, DocumentWrite};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    key TEXT PRIMARY KEY,
    version INTEGER NOT NULL,
    roster TEXT NOT NULL,
    updated_at INTEGER,
    updated_by_id TEXT,
    updated_by_email TEXT
);
"#;

/// Document store backed by a SQLite file.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    feed: ChangeFeed,
}

impl SqliteStore {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        tracing::debug!(path = %path.as_ref().display(), "opened sqlite store");
        Self::with_connection(conn)
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            feed: ChangeFeed::default(),
        })
    }

    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    fn read(conn: &Connection, key: &DocumentKey) -> StoreResult<Option<Document>> {
        let row = conn
            .query_row(
                "SELECT version, roster, updated_at, updated_by_id, updated_by_email
                 FROM documents WHERE key = ?1",
                params![key.as_str()],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<i64>>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, Option<String>>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((version, roster, updated_at, by_id, by_email)) = row else {
            return Ok(None);
        };
        let roster: Roster = serde_json::from_str(&roster)?;
        let updated_by = match (by_id, by_email) {
            (Some(id), Some(email)) => Some(Principal {
                id: PrincipalId::parse(&id).unwrap_or_else(|_| PrincipalId::for_email(&email)),
                email,
            }),
            (None, Some(email)) => Some(Principal::from_email(email)),
            _ => None,
        };

        Ok(Some(Document {
            key: key.clone(),
            roster,
            version: version as u64,
            updated_at: updated_at.map(|t| t as u64),
            updated_by,
        }))
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn fetch(&self, key: &DocumentKey) -> StoreResult<Option<Document>> {
        let conn = self.conn.lock();
        Self::read(&conn, key)
    }

    async fn upsert(&self, write: DocumentWrite) -> StoreResult<Document> {
        let stored = {
            let mut conn = self.conn.lock();
            let tx = conn.transaction()?;
            let current = Self::read(&tx, &write.key)?;
            let next = write.apply_to(current.as_ref(), now_millis())?;
            let author = next.updated_by.as_ref();

            tx.execute(
                "INSERT INTO documents (key, version, roster, updated_at, updated_by_id, updated_by_email)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(key) DO UPDATE SET
                    version = excluded.version,
                    roster = excluded.roster,
                    updated_at = excluded.updated_at,
                    updated_by_id = excluded.updated_by_id,
                    updated_by_email = excluded.updated_by_email",
                params![
                    next.key.as_str(),
                    next.version as i64,
                    serde_json::to_string(&next.roster)?,
                    next.updated_at.map(|t| t as i64),
                    author.map(|p| p.id.to_string()),
                    author.map(|p| p.email.clone()),
                ],
            )?;
            tx.commit()?;
            next
        };

        tracing::debug!(key = %stored.key, version = stored.version, "sqlite store accepted write");
        self.feed.publish(ChangeEvent::new(stored.clone()));
        Ok(stored)
    }

    fn subscribe(&self, key: &DocumentKey) -> Subscription {
        self.feed.subscribe(key)
    }
}
