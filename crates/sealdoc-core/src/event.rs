//! Notifications emitted by the document ledger.
//!
//! Every committed state transition produces exactly one event. Events are
//! persisted as an audit trail and broadcast to live subscribers.

use serde::{Deserialize, Serialize};

use crate::crypto::Identity;
use crate::error::{CoreError, Result};
use crate::types::{DocumentId, Timestamp};

/// A ledger notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    /// A document was created.
    DocumentCreated {
        id: DocumentId,
        owner: Identity,
        name: String,
    },

    /// A document body was replaced.
    DocumentUpdated {
        id: DocumentId,
        editor: Identity,
        version: u64,
    },

    /// The owner granted edit and decrypt rights to `grantee`.
    AccessGranted {
        id: DocumentId,
        owner: Identity,
        grantee: Identity,
    },
}

impl LedgerEvent {
    /// The document this event concerns.
    pub fn document_id(&self) -> &DocumentId {
        match self {
            LedgerEvent::DocumentCreated { id, .. }
            | LedgerEvent::DocumentUpdated { id, .. }
            | LedgerEvent::AccessGranted { id, .. } => id,
        }
    }

    /// Stable numeric tag, used as an index column by stores.
    pub fn kind_tag(&self) -> u8 {
        match self {
            LedgerEvent::DocumentCreated { .. } => 1,
            LedgerEvent::DocumentUpdated { .. } => 2,
            LedgerEvent::AccessGranted { .. } => 3,
        }
    }

    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf).expect("CBOR serialization failed");
        buf
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| CoreError::DecodingError(e.to_string()))
    }
}

/// An event together with its position in the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedEvent {
    /// 1-based position in the audit trail.
    pub seq: u64,

    /// When the ledger committed the event.
    pub recorded_at: Timestamp,

    pub event: LedgerEvent,
}
