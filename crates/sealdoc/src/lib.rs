//! # sealdoc
//!
//! An access-controlled document ledger whose bodies are encrypted on the
//! caller's side, keyed by a secret that only permitted identities can
//! recover from a confidentiality subsystem.
//!
//! ## Overview
//!
//! - **Ledger**: owns document records, editor lists and the creation-order
//!   registry; enforces who may create, update and grant
//! - **Client Cipher**: derives a key from the 10-digit secret and
//!   encrypts or decrypts bodies; the ledger only stores the payload string
//! - **Confidential secret**: the ledger keeps a handle, never the cleartext;
//!   editors recover it with a short-lived signed authorization
//!
//! ## Key Concepts
//!
//! - **Identifier**: Blake3 of the filename. Identical names collide and the
//!   first creator wins.
//! - **Editor**: may update the body and recover the secret. The owner is an
//!   editor from creation; only the owner may add more. Nobody is removed.
//! - **Version**: number of successful body updates since creation.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sealdoc::{ClientConfig, DocumentClient, Ledger, LedgerConfig};
//! use sealdoc::core::Keypair;
//! use sealdoc::perms::MemoryConfidential;
//! use sealdoc::store::SqliteStore;
//!
//! async fn example() {
//!     let store = SqliteStore::open("ledger.db").unwrap();
//!     let ledger = Ledger::new(store, MemoryConfidential::default(), LedgerConfig::default());
//!
//!     let alice = DocumentClient::new(Keypair::generate(), ledger.clone(), ClientConfig::default());
//!     let bob = Keypair::generate();
//!
//!     let (id, _secret) = alice.create_with_random_secret("plans.md").await.unwrap();
//!     alice.write(&id, "first draft").await.unwrap();
//!     alice.share(&id, &bob.identity()).await.unwrap();
//!
//!     assert!(ledger.is_editor(&id, &bob.identity()).await.unwrap());
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `sealdoc::core` - Identifiers, identities, documents, events
//! - `sealdoc::store` - Storage abstraction and SQLite
//! - `sealdoc::perms` - Client cipher and confidentiality subsystem

pub mod client;
pub mod error;
pub mod ledger;

// Re-export component crates
pub use sealdoc_core as core;
pub use sealdoc_perms as perms;
pub use sealdoc_store as store;

// Re-export main types for convenience
pub use client::{ClientConfig, DocumentClient};
pub use error::{ClientError, LedgerError, Result};
pub use ledger::{Ledger, LedgerConfig};

// Re-export commonly used types
pub use sealdoc_core::{
    compute_identifier, ContractAddress, Document, DocumentId, Identity, KeyHandle, Keypair,
    LedgerEvent, RecordedEvent,
};
pub use sealdoc_perms::{decrypt_body, derive_key, encrypt_body, generate_secret, CipherError};
