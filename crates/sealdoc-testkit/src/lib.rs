//! # sealdoc Testkit
//!
//! Testing utilities for sealdoc.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Known identifier and key derivations for cross-client verification
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: A ready ledger and deterministic parties
//!
//! ## Golden Vectors
//!
//! ```rust
//! use sealdoc_testkit::vectors::verify_all_vectors;
//!
//! for (name, matches, actual) in verify_all_vectors() {
//!     assert!(matches, "{name}: {actual}");
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use sealdoc_testkit::generators::DocumentParams;
//!
//! proptest! {
//!     #[test]
//!     fn identifier_is_deterministic(params: DocumentParams) {
//!         prop_assert_eq!(
//!             sealdoc::compute_identifier(&params.name),
//!             sealdoc::compute_identifier(&params.name)
//!         );
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use sealdoc_testkit::fixtures::TestLedger;
//!
//! async fn example() {
//!     let fixture = TestLedger::new();
//!     let alice = fixture.party(1);
//!     let (id, _secret) = alice.client.create_with_random_secret("notes.txt").await.unwrap();
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{init_test_logging, multi_party, Party, TestLedger};
pub use generators::DocumentParams;
pub use vectors::{identifier_vectors, key_vectors, verify_all_vectors, vectors_json};
