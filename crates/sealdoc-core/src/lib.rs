//! # sealdoc Core
//!
//! Pure primitives for sealdoc: document records, identities, confidential
//! handles, and the notifications emitted by the document ledger.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`DocumentId`] - Identifier derived from a document's filename (Blake3)
//! - [`Document`] - The ledger's record of a document
//! - [`Identity`] - An authenticated caller (Ed25519 public key)
//! - [`KeyHandle`] - Opaque reference to a confidentially stored secret
//! - [`ContractAddress`] - Address of a deployed ledger program
//! - [`LedgerEvent`] - Creation, update, and grant notifications
//!
//! ## Identifiers
//!
//! Document identifiers depend only on the filename. Two owners creating
//! `report.pdf` compete for the same identifier and the first one wins:
//!
//! ```rust
//! use sealdoc_core::compute_identifier;
//!
//! assert_eq!(compute_identifier("report.pdf"), compute_identifier("report.pdf"));
//! assert_ne!(compute_identifier("report.pdf"), compute_identifier("report.txt"));
//! ```

pub mod crypto;
pub mod document;
pub mod error;
pub mod event;
pub mod types;

pub use crypto::{Identity, Keypair, Signature};
pub use document::{compute_identifier, Document};
pub use error::{CoreError, Result};
pub use event::{LedgerEvent, RecordedEvent};
pub use types::{now_millis, ContractAddress, DocumentId, KeyHandle, Timestamp};
