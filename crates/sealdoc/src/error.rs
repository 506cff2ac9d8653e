//! Error types for the ledger and the document client.

use std::time::Duration;

use sealdoc_core::{DocumentId, Identity};
use sealdoc_perms::{CipherError, PermsError};
use sealdoc_store::StoreError;
use thiserror::Error;

/// Errors that can occur during ledger operations.
///
/// Every variant is a deterministic function of ledger state and input,
/// except `Store`, `Confidential` and `Interrupted`, which come from the
/// layers underneath.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Document names must be non-empty.
    #[error("document name must not be empty")]
    InvalidName,

    /// The null identity cannot be granted access.
    #[error("invalid address: the null identity cannot be granted access")]
    InvalidAddress,

    /// A document already occupies this identifier.
    #[error("document already exists: {0}")]
    AlreadyExists(DocumentId),

    /// No document with this identifier.
    #[error("document not found: {0}")]
    NotFound(DocumentId),

    /// The caller may not edit this document.
    #[error("{caller} is not an editor of document {id}")]
    NotEditor { id: DocumentId, caller: Identity },

    /// Only the owner may grant access.
    #[error("{caller} is not the owner of document {id}")]
    NotOwner { id: DocumentId, caller: Identity },

    /// Another writer sharing the same store updated the document first.
    #[error("document {id} changed concurrently (now at version {current})")]
    ConcurrentUpdate { id: DocumentId, current: u64 },

    /// Confidentiality subsystem error.
    #[error("confidential error: {0}")]
    Confidential(#[from] PermsError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// The task applying a state transition panicked.
    #[error("ledger task interrupted: {0}")]
    Interrupted(String),
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors surfaced by [`DocumentClient`](crate::DocumentClient).
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The stored body could not be decrypted.
    #[error(transparent)]
    Cipher(#[from] CipherError),

    /// Secret recovery was refused or failed.
    #[error(transparent)]
    Confidential(#[from] PermsError),

    /// A ledger or subsystem call did not finish in time.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}
