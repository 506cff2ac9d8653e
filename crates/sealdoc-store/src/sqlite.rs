//! SQLite implementation of the Store trait.
//!
//! This is the persistent storage backend for the ledger. It uses rusqlite
//! with bundled SQLite, wrapped in async via tokio::spawn_blocking. Every
//! mutation runs in a single transaction together with its audit event.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use sealdoc_core::{
    Document, DocumentId, Identity, KeyHandle, LedgerEvent, RecordedEvent, Timestamp,
};
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{GrantResult, InsertResult, Store, UpdateResult};

const DOCUMENT_COLUMNS: &str =
    "d.id, d.name, d.body, d.key_handle, d.owner, d.created_at, d.updated_at, d.version";

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file if needed and brings the schema up to date.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "opened sqlite store");
        Self::init(conn)
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(mut conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|_| StoreError::Poisoned)?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::TaskFailed(e.to_string()))?
    }
}

fn blob32(row: &Row<'_>, idx: usize) -> rusqlite::Result<[u8; 32]> {
    let bytes: Vec<u8> = row.get(idx)?;
    bytes
        .try_into()
        .map_err(|_| rusqlite::Error::InvalidColumnType(idx, "32-byte blob".into(), Type::Blob))
}

/// Row layout: `DOCUMENT_COLUMNS`.
fn row_to_document(row: &Row<'_>) -> rusqlite::Result<Document> {
    Ok(Document {
        id: DocumentId::from_bytes(blob32(row, 0)?),
        name: row.get(1)?,
        body: row.get(2)?,
        key_handle: KeyHandle::from_bytes(blob32(row, 3)?),
        owner: Identity::from_bytes(blob32(row, 4)?),
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
        version: row.get::<_, i64>(7)? as u64,
    })
}

/// Convert a `u64` window to SQLite's signed `LIMIT`/`OFFSET`.
fn sql_window(offset: u64, limit: u64) -> (i64, i64) {
    (
        i64::try_from(offset).unwrap_or(i64::MAX),
        i64::try_from(limit).unwrap_or(i64::MAX),
    )
}

fn append_event(
    conn: &Connection,
    event: &LedgerEvent,
    recorded_at: Timestamp,
) -> Result<RecordedEvent> {
    conn.execute(
        "INSERT INTO events (document_id, kind, payload, recorded_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            event.document_id().as_bytes().as_slice(),
            i64::from(event.kind_tag()),
            event.to_bytes(),
            recorded_at,
        ],
    )?;

    Ok(RecordedEvent {
        seq: conn.last_insert_rowid() as u64,
        recorded_at,
        event: event.clone(),
    })
}

#[async_trait]
impl Store for SqliteStore {
    async fn create_document(&self, doc: &Document, event: &LedgerEvent) -> Result<InsertResult> {
        let doc = doc.clone();
        let event = event.clone();

        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            let id = doc.id.as_bytes().as_slice();

            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM documents WHERE id = ?1)",
                params![id],
                |row| row.get(0),
            )?;
            if exists {
                return Ok(InsertResult::AlreadyExists);
            }

            tx.execute(
                "INSERT INTO documents (
                    id, name, body, key_handle, owner, created_at, updated_at, version
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    id,
                    doc.name,
                    doc.body,
                    doc.key_handle.as_bytes().as_slice(),
                    doc.owner.as_bytes().as_slice(),
                    doc.created_at,
                    doc.updated_at,
                    doc.version as i64,
                ],
            )?;
            tx.execute(
                "INSERT INTO editors (document_id, identity, granted_at) VALUES (?1, ?2, ?3)",
                params![id, doc.owner.as_bytes().as_slice(), doc.created_at],
            )?;
            tx.execute("INSERT INTO registry (document_id) VALUES (?1)", params![id])?;
            let recorded = append_event(&tx, &event, doc.created_at)?;

            tx.commit()?;
            Ok(InsertResult::Inserted(recorded))
        })
        .await
    }

    async fn get_document(&self, id: &DocumentId) -> Result<Option<Document>> {
        let id = *id;

        self.blocking(move |conn| {
            conn.query_row(
                &format!("SELECT {DOCUMENT_COLUMNS} FROM documents d WHERE d.id = ?1"),
                params![id.as_bytes().as_slice()],
                row_to_document,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn update_body(
        &self,
        id: &DocumentId,
        body: &str,
        updated_at: Timestamp,
        expected_version: u64,
        event: &LedgerEvent,
    ) -> Result<UpdateResult> {
        let id = *id;
        let body = body.to_string();
        let event = event.clone();

        self.blocking(move |conn| {
            let tx = conn.transaction()?;

            let current: Option<i64> = tx
                .query_row(
                    "SELECT version FROM documents WHERE id = ?1",
                    params![id.as_bytes().as_slice()],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(current) = current else {
                return Ok(UpdateResult::NotFound);
            };
            if current as u64 != expected_version {
                return Ok(UpdateResult::VersionMismatch {
                    current: current as u64,
                });
            }

            tx.execute(
                "UPDATE documents SET body = ?1, updated_at = ?2, version = version + 1
                 WHERE id = ?3",
                params![body, updated_at, id.as_bytes().as_slice()],
            )?;
            let recorded = append_event(&tx, &event, updated_at)?;

            tx.commit()?;
            Ok(UpdateResult::Updated(recorded))
        })
        .await
    }

    async fn add_editor(
        &self,
        id: &DocumentId,
        identity: &Identity,
        granted_at: Timestamp,
        event: &LedgerEvent,
    ) -> Result<GrantResult> {
        let id = *id;
        let identity = *identity;
        let event = event.clone();

        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            let doc_id = id.as_bytes().as_slice();

            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM documents WHERE id = ?1)",
                params![doc_id],
                |row| row.get(0),
            )?;
            if !exists {
                return Ok(GrantResult::NotFound);
            }

            let inserted = tx.execute(
                "INSERT OR IGNORE INTO editors (document_id, identity, granted_at)
                 VALUES (?1, ?2, ?3)",
                params![doc_id, identity.as_bytes().as_slice(), granted_at],
            )?;
            if inserted == 0 {
                return Ok(GrantResult::AlreadyEditor);
            }
            let recorded = append_event(&tx, &event, granted_at)?;

            tx.commit()?;
            Ok(GrantResult::Granted(recorded))
        })
        .await
    }

    async fn is_editor(&self, id: &DocumentId, identity: &Identity) -> Result<bool> {
        let id = *id;
        let identity = *identity;

        self.blocking(move |conn| {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM editors WHERE document_id = ?1 AND identity = ?2)",
                params![id.as_bytes().as_slice(), identity.as_bytes().as_slice()],
                |row| row.get(0),
            )
            .map_err(StoreError::from)
        })
        .await
    }

    async fn editors(&self, id: &DocumentId) -> Result<Vec<Identity>> {
        let id = *id;

        self.blocking(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT identity FROM editors WHERE document_id = ?1 ORDER BY rowid",
            )?;
            let editors = stmt
                .query_map(params![id.as_bytes().as_slice()], |row| {
                    Ok(Identity::from_bytes(blob32(row, 0)?))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(editors)
        })
        .await
    }

    async fn count(&self) -> Result<u64> {
        self.blocking(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM registry", [], |row| row.get(0))?;
            Ok(count as u64)
        })
        .await
    }

    async fn list_ids(&self, offset: u64, limit: u64) -> Result<Vec<DocumentId>> {
        let (offset, limit) = sql_window(offset, limit);

        self.blocking(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT document_id FROM registry ORDER BY position LIMIT ?1 OFFSET ?2",
            )?;
            let ids = stmt
                .query_map(params![limit, offset], |row| {
                    Ok(DocumentId::from_bytes(blob32(row, 0)?))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(ids)
        })
        .await
    }

    async fn list_documents(&self, offset: u64, limit: u64) -> Result<Vec<Document>> {
        let (offset, limit) = sql_window(offset, limit);

        self.blocking(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {DOCUMENT_COLUMNS} FROM registry r
                 JOIN documents d ON d.id = r.document_id
                 ORDER BY r.position LIMIT ?1 OFFSET ?2"
            ))?;
            let docs = stmt
                .query_map(params![limit, offset], row_to_document)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(docs)
        })
        .await
    }

    async fn events(&self, after_seq: u64, limit: u64) -> Result<Vec<RecordedEvent>> {
        let (after_seq, limit) = sql_window(after_seq, limit);

        self.blocking(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT seq, recorded_at, payload FROM events
                 WHERE seq > ?1 ORDER BY seq LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(params![after_seq, limit], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, Vec<u8>>(2)?,
                    ))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            rows.into_iter()
                .map(|(seq, recorded_at, payload)| -> Result<RecordedEvent> {
                    let event = LedgerEvent::from_bytes(&payload)
                        .map_err(|e| StoreError::Serialization(e.to_string()))?;
                    Ok(RecordedEvent {
                        seq: seq as u64,
                        recorded_at,
                        event,
                    })
                })
                .collect()
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_doc(name: &str, owner: Identity, now: Timestamp) -> (Document, LedgerEvent) {
        let doc = Document::new(name, KeyHandle::from_bytes([0x0f; 32]), owner, now);
        let event = LedgerEvent::DocumentCreated {
            id: doc.id,
            owner,
            name: name.to_string(),
        };
        (doc, event)
    }

    #[tokio::test]
    async fn test_create_and_get_document() {
        let store = SqliteStore::open_memory().unwrap();
        let owner = Identity::from_bytes([0x01; 32]);
        let (doc, event) = make_doc("report.pdf", owner, 1_700_000_000_000);

        let result = store.create_document(&doc, &event).await.unwrap();
        assert!(matches!(result, InsertResult::Inserted(ref r) if r.seq == 1));

        let stored = store.get_document(&doc.id).await.unwrap().unwrap();
        assert_eq!(stored, doc);
        assert!(store.is_editor(&doc.id, &owner).await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_create_rolls_back() {
        let store = SqliteStore::open_memory().unwrap();
        let first = Identity::from_bytes([0x01; 32]);
        let second = Identity::from_bytes([0x02; 32]);

        let (doc, event) = make_doc("report.pdf", first, 100);
        store.create_document(&doc, &event).await.unwrap();

        let (dup, dup_event) = make_doc("report.pdf", second, 200);
        assert_eq!(
            store.create_document(&dup, &dup_event).await.unwrap(),
            InsertResult::AlreadyExists
        );

        let stored = store.get_document(&doc.id).await.unwrap().unwrap();
        assert_eq!(stored.owner, first);
        assert_eq!(stored.created_at, 100);
        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.events(0, 100).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_and_version_mismatch() {
        let store = SqliteStore::open_memory().unwrap();
        let owner = Identity::from_bytes([0x01; 32]);
        let (doc, event) = make_doc("a", owner, 100);
        store.create_document(&doc, &event).await.unwrap();

        let update = LedgerEvent::DocumentUpdated { id: doc.id, editor: owner, version: 1 };
        let UpdateResult::Updated(recorded) =
            store.update_body(&doc.id, "v1:AA==:BB==", 150, 0, &update).await.unwrap()
        else {
            panic!("expected Updated");
        };
        assert_eq!(recorded.seq, 2);
        assert_eq!(recorded.event, update);

        assert_eq!(
            store.update_body(&doc.id, "stale", 160, 0, &update).await.unwrap(),
            UpdateResult::VersionMismatch { current: 1 }
        );

        let stored = store.get_document(&doc.id).await.unwrap().unwrap();
        assert_eq!(stored.body, "v1:AA==:BB==");
        assert_eq!(stored.version, 1);
        assert_eq!(stored.updated_at, 150);
        assert_eq!(stored.created_at, 100);
    }

    #[tokio::test]
    async fn test_add_editor_idempotent() {
        let store = SqliteStore::open_memory().unwrap();
        let owner = Identity::from_bytes([0x01; 32]);
        let grantee = Identity::from_bytes([0x02; 32]);
        let (doc, event) = make_doc("a", owner, 100);
        store.create_document(&doc, &event).await.unwrap();

        let grant = LedgerEvent::AccessGranted { id: doc.id, owner, grantee };
        assert!(matches!(
            store.add_editor(&doc.id, &grantee, 200, &grant).await.unwrap(),
            GrantResult::Granted(_)
        ));
        assert_eq!(
            store.add_editor(&doc.id, &grantee, 300, &grant).await.unwrap(),
            GrantResult::AlreadyEditor
        );
        assert_eq!(
            store.add_editor(&doc.id, &owner, 300, &grant).await.unwrap(),
            GrantResult::AlreadyEditor
        );

        assert_eq!(store.editors(&doc.id).await.unwrap(), vec![owner, grantee]);
        assert_eq!(store.events(0, 100).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_document() {
        let store = SqliteStore::open_memory().unwrap();
        let id = DocumentId::from_bytes([0x77; 32]);
        let who = Identity::from_bytes([0x01; 32]);
        let event = LedgerEvent::AccessGranted { id, owner: who, grantee: who };

        assert_eq!(store.get_document(&id).await.unwrap(), None);
        assert!(!store.is_editor(&id, &who).await.unwrap());
        assert!(store.editors(&id).await.unwrap().is_empty());
        assert_eq!(
            store.add_editor(&id, &who, 1, &event).await.unwrap(),
            GrantResult::NotFound
        );
        assert_eq!(
            store.update_body(&id, "", 1, 0, &event).await.unwrap(),
            UpdateResult::NotFound
        );
    }

    #[tokio::test]
    async fn test_pagination_clamps() {
        let store = SqliteStore::open_memory().unwrap();
        let owner = Identity::from_bytes([0x01; 32]);
        let mut ids = Vec::new();
        for i in 0..5 {
            let (doc, event) = make_doc(&format!("doc-{i}"), owner, i);
            store.create_document(&doc, &event).await.unwrap();
            ids.push(doc.id);
        }

        assert_eq!(store.count().await.unwrap(), 5);
        assert_eq!(store.list_ids(0, 2).await.unwrap(), ids[0..2]);
        assert_eq!(store.list_ids(3, 10).await.unwrap(), ids[3..5]);
        assert!(store.list_ids(5, 1).await.unwrap().is_empty());
        assert!(store.list_ids(u64::MAX, u64::MAX).await.unwrap().is_empty());
        assert_eq!(store.list_ids(0, u64::MAX).await.unwrap(), ids);

        let docs = store.list_documents(1, 2).await.unwrap();
        assert_eq!(docs.iter().map(|d| d.id).collect::<Vec<_>>(), ids[1..3]);
    }

    #[tokio::test]
    async fn test_reopen_preserves_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        let owner = Identity::from_bytes([0x01; 32]);
        let (doc, event) = make_doc("persistent.txt", owner, 42);

        {
            let store = SqliteStore::open(&path).unwrap();
            store.create_document(&doc, &event).await.unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get_document(&doc.id).await.unwrap(), Some(doc.clone()));
        assert_eq!(store.list_ids(0, 10).await.unwrap(), vec![doc.id]);

        let events = store.events(0, 10).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, event);
        assert_eq!(events[0].recorded_at, 42);
    }
}
