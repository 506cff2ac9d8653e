//! # sealdoc Store
//!
//! Storage abstraction for the sealdoc ledger. Provides a trait-based
//! interface for document, editor, registry and audit-trail persistence with
//! SQLite and in-memory implementations.
//!
//! ## Key Types
//!
//! - [`Store`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`InsertResult`], [`UpdateResult`], [`GrantResult`] - Mutation outcomes
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sealdoc_store::{SqliteStore, Store};
//!
//! async fn example() {
//!     // Open a SQLite database
//!     let store = SqliteStore::open("ledger.db").unwrap();
//!
//!     // Or use an in-memory database for testing
//!     let store = SqliteStore::open_memory().unwrap();
//!
//!     let first_page = store.list_ids(0, 20).await.unwrap();
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Atomic mutations**: a create, update or grant writes its audit event
//!   in the same transaction, so a failed or cancelled call leaves no trace
//! - **Append-only**: documents, editors and registry entries are never deleted
//! - **Optimistic updates**: `update_body` is a compare-and-set on `version`

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{GrantResult, InsertResult, Store, UpdateResult};
