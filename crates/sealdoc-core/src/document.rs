//! The document record kept by the ledger.

use serde::{Deserialize, Serialize};

use crate::crypto::Identity;
use crate::types::{DocumentId, KeyHandle, Timestamp};

/// Compute the identifier of a document from its filename.
///
/// Pure and deterministic: a plain Blake3 digest of the name bytes, so any
/// client can compute it without talking to the ledger.
pub fn compute_identifier(name: &str) -> DocumentId {
    DocumentId(*blake3::hash(name.as_bytes()).as_bytes())
}

/// A document as stored by the ledger.
///
/// `body` is an opaque payload produced by the client cipher. The secret that
/// protects it is only referenced through `key_handle`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Identifier, always `compute_identifier(&name)`.
    pub id: DocumentId,

    /// Display name. Immutable after creation.
    pub name: String,

    /// Encrypted body, empty until the first update.
    pub body: String,

    /// Handle to the confidential secret.
    pub key_handle: KeyHandle,

    /// Creator of the document. Immutable.
    pub owner: Identity,

    /// Assigned by the ledger at creation.
    pub created_at: Timestamp,

    /// Assigned by the ledger at creation and on each update.
    pub updated_at: Timestamp,

    /// Number of successful body updates since creation.
    pub version: u64,
}

impl Document {
    /// A freshly created document: empty body, version 0.
    pub fn new(name: impl Into<String>, key_handle: KeyHandle, owner: Identity, now: Timestamp) -> Self {
        let name = name.into();
        Self {
            id: compute_identifier(&name),
            name,
            body: String::new(),
            key_handle,
            owner,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Whether the body has never been written.
    pub fn is_blank(&self) -> bool {
        self.body.is_empty()
    }

    /// Replace the body wholesale and advance the version.
    pub fn apply_update(&mut self, body: impl Into<String>, now: Timestamp) {
        self.body = body.into();
        self.updated_at = now;
        self.version += 1;
    }
}
