//! Store trait: the abstract interface for ledger persistence.
//!
//! Each state-changing method applies its whole effect, including the audit
//! event, in one atomic step. Either everything lands or nothing does.

use async_trait::async_trait;
use sealdoc_core::{Document, DocumentId, Identity, LedgerEvent, RecordedEvent, Timestamp};

use crate::error::Result;

/// Result of creating a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertResult {
    /// The document, its owner entry, its registry slot and its creation
    /// event were written.
    Inserted(RecordedEvent),
    /// A document already occupies this identifier. Nothing was written.
    AlreadyExists,
}

/// Result of replacing a document body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateResult {
    /// The body was replaced and the version advanced.
    Updated(RecordedEvent),
    /// No document with this identifier.
    NotFound,
    /// Another update landed first.
    VersionMismatch {
        /// The version currently stored.
        current: u64,
    },
}

/// Result of adding an editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantResult {
    /// The identity was added and the grant event recorded.
    Granted(RecordedEvent),
    /// The identity was already an editor. Nothing was written.
    AlreadyEditor,
    /// No document with this identifier.
    NotFound,
}

/// The Store trait: async interface for ledger persistence.
///
/// For SQLite, implementations use `spawn_blocking` internally to avoid
/// blocking the runtime.
#[async_trait]
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Document Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a new document with its owner as the first editor.
    ///
    /// Also appends the document to the registry and records `event`.
    async fn create_document(&self, doc: &Document, event: &LedgerEvent) -> Result<InsertResult>;

    /// Get a document by identifier.
    async fn get_document(&self, id: &DocumentId) -> Result<Option<Document>>;

    /// Replace a body if the stored version still equals `expected_version`.
    async fn update_body(
        &self,
        id: &DocumentId,
        body: &str,
        updated_at: Timestamp,
        expected_version: u64,
        event: &LedgerEvent,
    ) -> Result<UpdateResult>;

    // ─────────────────────────────────────────────────────────────────────────
    // Editor Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Add `identity` to a document's editors and record `event`.
    async fn add_editor(
        &self,
        id: &DocumentId,
        identity: &Identity,
        granted_at: Timestamp,
        event: &LedgerEvent,
    ) -> Result<GrantResult>;

    /// Whether `identity` may edit the document. False for unknown documents.
    async fn is_editor(&self, id: &DocumentId, identity: &Identity) -> Result<bool>;

    /// All editors of a document, in grant order.
    async fn editors(&self, id: &DocumentId) -> Result<Vec<Identity>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Registry Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Number of documents ever created.
    async fn count(&self) -> Result<u64>;

    /// Identifiers in creation order, starting at `offset`.
    ///
    /// Returns at most `limit` entries and never fails for out-of-range input.
    async fn list_ids(&self, offset: u64, limit: u64) -> Result<Vec<DocumentId>>;

    /// Full records in creation order, with the same clamping as `list_ids`.
    async fn list_documents(&self, offset: u64, limit: u64) -> Result<Vec<Document>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Audit Trail
    // ─────────────────────────────────────────────────────────────────────────

    /// Recorded events with `seq > after_seq`, oldest first.
    async fn events(&self, after_seq: u64, limit: u64) -> Result<Vec<RecordedEvent>>;
}

/// The `[offset, offset + limit)` window of a sequence of length `len`,
/// clamped to the sequence bounds.
pub fn page_bounds(len: usize, offset: u64, limit: u64) -> (usize, usize) {
    let start = usize::try_from(offset).unwrap_or(usize::MAX).min(len);
    let take = usize::try_from(limit).unwrap_or(usize::MAX);
    let end = start.saturating_add(take).min(len);
    (start, end)
}
