//! In-memory implementation of the Store trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use sealdoc_core::{Document, DocumentId, Identity, LedgerEvent, RecordedEvent, Timestamp};

use crate::error::{Result, StoreError};
use crate::traits::{page_bounds, GrantResult, InsertResult, Store, UpdateResult};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Documents indexed by ID.
    documents: HashMap<DocumentId, Document>,

    /// Editors per document, in grant order.
    editors: HashMap<DocumentId, Vec<Identity>>,

    /// Every identifier ever created, in creation order.
    registry: Vec<DocumentId>,

    /// Audit trail. `events[i].seq == i + 1`.
    events: Vec<RecordedEvent>,
}

impl MemoryStoreInner {
    fn record(&mut self, event: &LedgerEvent, recorded_at: Timestamp) -> RecordedEvent {
        let recorded = RecordedEvent {
            seq: self.events.len() as u64 + 1,
            recorded_at,
            event: event.clone(),
        };
        self.events.push(recorded.clone());
        recorded
    }
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner.write().map_err(|_| StoreError::Poisoned)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_document(&self, doc: &Document, event: &LedgerEvent) -> Result<InsertResult> {
        let mut inner = self.write()?;

        if inner.documents.contains_key(&doc.id) {
            return Ok(InsertResult::AlreadyExists);
        }

        inner.documents.insert(doc.id, doc.clone());
        inner.editors.insert(doc.id, vec![doc.owner]);
        inner.registry.push(doc.id);
        let recorded = inner.record(event, doc.created_at);

        Ok(InsertResult::Inserted(recorded))
    }

    async fn get_document(&self, id: &DocumentId) -> Result<Option<Document>> {
        let inner = self.read()?;
        Ok(inner.documents.get(id).cloned())
    }

    async fn update_body(
        &self,
        id: &DocumentId,
        body: &str,
        updated_at: Timestamp,
        expected_version: u64,
        event: &LedgerEvent,
    ) -> Result<UpdateResult> {
        let mut inner = self.write()?;

        let Some(doc) = inner.documents.get_mut(id) else {
            return Ok(UpdateResult::NotFound);
        };
        if doc.version != expected_version {
            return Ok(UpdateResult::VersionMismatch {
                current: doc.version,
            });
        }

        doc.apply_update(body, updated_at);
        let recorded = inner.record(event, updated_at);

        Ok(UpdateResult::Updated(recorded))
    }

    async fn add_editor(
        &self,
        id: &DocumentId,
        identity: &Identity,
        granted_at: Timestamp,
        event: &LedgerEvent,
    ) -> Result<GrantResult> {
        let mut inner = self.write()?;

        if !inner.documents.contains_key(id) {
            return Ok(GrantResult::NotFound);
        }

        let editors = inner.editors.entry(*id).or_default();
        if editors.contains(identity) {
            return Ok(GrantResult::AlreadyEditor);
        }
        editors.push(*identity);
        let recorded = inner.record(event, granted_at);

        Ok(GrantResult::Granted(recorded))
    }

    async fn is_editor(&self, id: &DocumentId, identity: &Identity) -> Result<bool> {
        let inner = self.read()?;
        Ok(inner
            .editors
            .get(id)
            .is_some_and(|editors| editors.contains(identity)))
    }

    async fn editors(&self, id: &DocumentId) -> Result<Vec<Identity>> {
        let inner = self.read()?;
        Ok(inner.editors.get(id).cloned().unwrap_or_default())
    }

    async fn count(&self) -> Result<u64> {
        let inner = self.read()?;
        Ok(inner.registry.len() as u64)
    }

    async fn list_ids(&self, offset: u64, limit: u64) -> Result<Vec<DocumentId>> {
        let inner = self.read()?;
        let (start, end) = page_bounds(inner.registry.len(), offset, limit);
        Ok(inner.registry[start..end].to_vec())
    }

    async fn list_documents(&self, offset: u64, limit: u64) -> Result<Vec<Document>> {
        let inner = self.read()?;
        let (start, end) = page_bounds(inner.registry.len(), offset, limit);

        inner.registry[start..end]
            .iter()
            .map(|id| {
                inner
                    .documents
                    .get(id)
                    .cloned()
                    .ok_or_else(|| StoreError::InvalidData(format!("registry entry {id} has no document")))
            })
            .collect()
    }

    async fn events(&self, after_seq: u64, limit: u64) -> Result<Vec<RecordedEvent>> {
        let inner = self.read()?;
        let (start, end) = page_bounds(inner.events.len(), after_seq, limit);
        Ok(inner.events[start..end].to_vec())
    }
}
