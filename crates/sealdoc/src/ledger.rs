//! The Ledger: authoritative document and permission state.
//!
//! State-changing calls (`create`, `update_body`, `grant_access`) are
//! serialized behind one write lock and each one is applied by a spawned
//! task. A caller that stops waiting cannot interrupt a transition halfway:
//! it either commits in full or has no effect on the store.
//!
//! Reads go straight to the store and always see the last committed write.

use std::future::Future;
use std::sync::Arc;

use sealdoc_core::{
    compute_identifier, now_millis, ContractAddress, Document, DocumentId, Identity, LedgerEvent,
    RecordedEvent,
};
use sealdoc_perms::{ConfidentialBackend, EncryptedInput, InputProof};
use sealdoc_store::{GrantResult, InsertResult, Store, UpdateResult};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::error::{LedgerError, Result};

/// Configuration for the Ledger.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Address that confidential inputs and decrypt authorizations must name.
    pub contract: ContractAddress,
    /// Notifications buffered per subscriber before it starts lagging.
    pub event_capacity: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            contract: ContractAddress::local(),
            event_capacity: 256,
        }
    }
}

/// The document ledger.
///
/// Cheap to clone; clones share state.
pub struct Ledger<S: Store, C: ConfidentialBackend> {
    inner: Arc<LedgerInner<S, C>>,
}

struct LedgerInner<S: Store, C: ConfidentialBackend> {
    store: S,
    confidential: C,
    config: LedgerConfig,
    /// Single-writer discipline for state transitions.
    write_lock: Mutex<()>,
    events: broadcast::Sender<RecordedEvent>,
}

impl<S: Store, C: ConfidentialBackend> Clone for Ledger<S, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, C> Ledger<S, C>
where
    S: Store + 'static,
    C: ConfidentialBackend + 'static,
{
    /// Create a ledger over a store and a confidentiality subsystem.
    pub fn new(store: S, confidential: C, config: LedgerConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            inner: Arc::new(LedgerInner {
                store,
                confidential,
                config,
                write_lock: Mutex::new(()),
                events,
            }),
        }
    }

    /// The contract address this ledger is deployed at.
    pub fn contract(&self) -> ContractAddress {
        self.inner.config.contract
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.inner.store
    }

    /// Get the confidentiality subsystem.
    pub fn confidential(&self) -> &C {
        &self.inner.confidential
    }

    /// Identifier a document named `name` has or would have.
    pub fn compute_identifier(name: &str) -> DocumentId {
        compute_identifier(name)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // State Transitions
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a document owned by `caller`.
    ///
    /// Admits the confidential secret, grants the caller decrypt and edit
    /// rights, appends the identifier to the registry and emits
    /// `DocumentCreated`.
    pub async fn create(
        &self,
        caller: &Identity,
        name: &str,
        input: &EncryptedInput,
        proof: &InputProof,
    ) -> Result<DocumentId> {
        if name.is_empty() {
            return Err(LedgerError::InvalidName);
        }

        let inner = Arc::clone(&self.inner);
        let (caller, name, input, proof) = (*caller, name.to_owned(), input.clone(), *proof);
        commit(async move { inner.create(caller, name, input, proof).await }).await
    }

    /// Replace a document's body. Returns the new version.
    pub async fn update_body(&self, caller: &Identity, id: &DocumentId, body: &str) -> Result<u64> {
        let inner = Arc::clone(&self.inner);
        let (caller, id, body) = (*caller, *id, body.to_owned());
        commit(async move { inner.update_body(caller, id, body).await }).await
    }

    /// Make `grantee` an editor of the document. Only the owner may call this.
    ///
    /// Granting to an identity that is already an editor succeeds without
    /// emitting a second notification.
    pub async fn grant_access(&self, caller: &Identity, id: &DocumentId, grantee: &Identity) -> Result<()> {
        if grantee.is_zero() {
            return Err(LedgerError::InvalidAddress);
        }

        let inner = Arc::clone(&self.inner);
        let (caller, id, grantee) = (*caller, *id, *grantee);
        commit(async move { inner.grant_access(caller, id, grantee).await }).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Whether `identity` may edit the document. False for unknown documents.
    pub async fn is_editor(&self, id: &DocumentId, identity: &Identity) -> Result<bool> {
        Ok(self.inner.store.is_editor(id, identity).await?)
    }

    /// All editors of a document, owner first.
    pub async fn editors(&self, id: &DocumentId) -> Result<Vec<Identity>> {
        Ok(self.inner.store.editors(id).await?)
    }

    /// Get a document, including its confidential handle.
    pub async fn get(&self, id: &DocumentId) -> Result<Document> {
        self.inner
            .store
            .get_document(id)
            .await?
            .ok_or(LedgerError::NotFound(*id))
    }

    /// Number of documents ever created.
    pub async fn count(&self) -> Result<u64> {
        Ok(self.inner.store.count().await?)
    }

    /// Identifiers in creation order. Out-of-range windows are clamped.
    pub async fn list_ids(&self, offset: u64, limit: u64) -> Result<Vec<DocumentId>> {
        Ok(self.inner.store.list_ids(offset, limit).await?)
    }

    /// Full documents in creation order. Out-of-range windows are clamped.
    pub async fn list_documents(&self, offset: u64, limit: u64) -> Result<Vec<Document>> {
        Ok(self.inner.store.list_documents(offset, limit).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Notifications
    // ─────────────────────────────────────────────────────────────────────────

    /// Recorded notifications with `seq > after_seq`, oldest first.
    pub async fn events(&self, after_seq: u64, limit: u64) -> Result<Vec<RecordedEvent>> {
        Ok(self.inner.store.events(after_seq, limit).await?)
    }

    /// Receive notifications committed from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<RecordedEvent> {
        self.inner.events.subscribe()
    }
}

/// Run a state transition to completion regardless of the caller.
async fn commit<T, F>(transition: F) -> Result<T>
where
    F: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(transition)
        .await
        .map_err(|e| LedgerError::Interrupted(e.to_string()))?
}

impl<S: Store, C: ConfidentialBackend> LedgerInner<S, C> {
    async fn create(
        &self,
        caller: Identity,
        name: String,
        input: EncryptedInput,
        proof: InputProof,
    ) -> Result<DocumentId> {
        let id = compute_identifier(&name);
        let _guard = self.write_lock.lock().await;

        if self.store.get_document(&id).await?.is_some() {
            debug!(%id, %caller, "create rejected: identifier taken");
            return Err(LedgerError::AlreadyExists(id));
        }

        let contract = self.config.contract;
        let handle = match self.confidential.admit(&input, &proof, &contract, &caller).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!(%id, %caller, error = %e, "confidential input rejected");
                return Err(e.into());
            }
        };
        self.confidential.allow(&handle, &caller).await?;

        let doc = Document::new(name.clone(), handle, caller, now_millis());
        let event = LedgerEvent::DocumentCreated {
            id,
            owner: caller,
            name,
        };

        match self.store.create_document(&doc, &event).await? {
            InsertResult::Inserted(recorded) => {
                info!(%id, owner = %caller, name = %doc.name, "document created");
                self.publish(recorded);
                Ok(id)
            }
            InsertResult::AlreadyExists => Err(LedgerError::AlreadyExists(id)),
        }
    }

    async fn update_body(&self, caller: Identity, id: DocumentId, body: String) -> Result<u64> {
        let _guard = self.write_lock.lock().await;

        let doc = self
            .store
            .get_document(&id)
            .await?
            .ok_or(LedgerError::NotFound(id))?;

        if !self.store.is_editor(&id, &caller).await? {
            warn!(%id, %caller, "update rejected: not an editor");
            return Err(LedgerError::NotEditor { id, caller });
        }

        let version = doc.version + 1;
        let event = LedgerEvent::DocumentUpdated {
            id,
            editor: caller,
            version,
        };

        match self
            .store
            .update_body(&id, &body, now_millis(), doc.version, &event)
            .await?
        {
            UpdateResult::Updated(recorded) => {
                info!(%id, editor = %caller, version, "document updated");
                self.publish(recorded);
                Ok(version)
            }
            UpdateResult::NotFound => Err(LedgerError::NotFound(id)),
            UpdateResult::VersionMismatch { current } => {
                Err(LedgerError::ConcurrentUpdate { id, current })
            }
        }
    }

    async fn grant_access(&self, caller: Identity, id: DocumentId, grantee: Identity) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let doc = self
            .store
            .get_document(&id)
            .await?
            .ok_or(LedgerError::NotFound(id))?;

        if doc.owner != caller {
            warn!(%id, %caller, "grant rejected: not the owner");
            return Err(LedgerError::NotOwner { id, caller });
        }

        // The editor row commits before the access list is extended. A grant
        // whose `allow` fails is finished by retrying it.
        if self.store.is_editor(&id, &grantee).await? {
            self.confidential.allow(&doc.key_handle, &grantee).await?;
            debug!(%id, %grantee, "grant is a no-op: already an editor");
            return Ok(());
        }

        let event = LedgerEvent::AccessGranted {
            id,
            owner: caller,
            grantee,
        };
        match self.store.add_editor(&id, &grantee, now_millis(), &event).await? {
            GrantResult::Granted(recorded) => self.publish(recorded),
            GrantResult::AlreadyEditor => {}
            GrantResult::NotFound => return Err(LedgerError::NotFound(id)),
        }

        self.confidential.allow(&doc.key_handle, &grantee).await?;
        info!(%id, %grantee, "access granted");
        Ok(())
    }

    fn publish(&self, recorded: RecordedEvent) {
        // Having no live subscribers is not an error; the event is already
        // in the audit trail.
        let _ = self.events.send(recorded);
    }
}
