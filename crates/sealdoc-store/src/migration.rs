//! Database schema migrations for SQLite.
//!
//! Each migration is a SQL batch that transforms the schema from version N to
//! N+1. Applied versions are recorded in `schema_migrations`.

use rusqlite::Connection;
use sealdoc_core::now_millis;
use tracing::info;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// Idempotent: calling it on an up-to-date database does nothing.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema version {current} is newer than supported version {CURRENT_VERSION}"
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
            info!(version, "applied schema migration");
        }

        tx.commit()?;
    }

    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: documents, editors, registry, events.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE documents (
            id BLOB PRIMARY KEY,              -- 32 bytes, Blake3 of name
            name TEXT NOT NULL,
            body TEXT NOT NULL,               -- encrypted payload, '' until first write
            key_handle BLOB NOT NULL,         -- 32 bytes, confidential handle
            owner BLOB NOT NULL,              -- 32 bytes, Ed25519 public key
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            version INTEGER NOT NULL DEFAULT 0
        );

        -- Append-only: rows are never deleted.
        CREATE TABLE editors (
            document_id BLOB NOT NULL REFERENCES documents(id),
            identity BLOB NOT NULL,
            granted_at INTEGER NOT NULL,
            PRIMARY KEY (document_id, identity)
        );

        -- Creation order of every document.
        CREATE TABLE registry (
            position INTEGER PRIMARY KEY AUTOINCREMENT,
            document_id BLOB NOT NULL UNIQUE REFERENCES documents(id)
        );

        CREATE TABLE events (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            document_id BLOB NOT NULL,
            kind INTEGER NOT NULL,            -- LedgerEvent kind tag
            payload BLOB NOT NULL,            -- CBOR-encoded LedgerEvent
            recorded_at INTEGER NOT NULL
        );

        CREATE INDEX idx_documents_owner ON documents(owner);
        CREATE INDEX idx_editors_identity ON editors(identity);
        CREATE INDEX idx_events_document ON events(document_id, seq);
        "#,
    )?;

    Ok(())
}
