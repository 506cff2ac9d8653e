//! # sealdoc Permissions
//!
//! Client-side body encryption and the confidential secret boundary.
//!
//! ## Overview
//!
//! A document's body is encrypted on the caller's side with a key derived from
//! a 10-digit secret. The secret itself lives in a confidentiality subsystem:
//! the ledger only holds an opaque [`KeyHandle`](sealdoc_core::KeyHandle) and
//! an access list over it.
//!
//! ## Key Concepts
//!
//! - **Client Cipher**: [`derive_key`], [`encrypt_body`], [`decrypt_body`]
//! - **Payload**: the `v1:<nonce>:<ciphertext>` string stored as the body
//! - **ConfidentialBackend**: admit an attested input, extend its access
//!   list, decrypt it for a permitted identity
//! - **DecryptAuthorization**: short-lived, signed, scoped to specific
//!   handles and contracts
//!
//! ## Usage
//!
//! ```rust
//! use sealdoc_perms::{decrypt_body, encrypt_body, CipherError};
//!
//! let payload = encrypt_body(1_234_567_890, "meeting notes").unwrap();
//! assert_eq!(decrypt_body(1_234_567_890, &payload).unwrap(), "meeting notes");
//! assert_eq!(
//!     decrypt_body(1_234_567_891, &payload),
//!     Err(CipherError::AuthenticationFailed)
//! );
//! ```

pub mod authorization;
pub mod confidential;
pub mod crypto;
pub mod envelope;
pub mod error;

pub use authorization::{DecryptAuthorization, MS_PER_DAY};
pub use confidential::{
    ConfidentialBackend, ConfidentialConfig, EncryptedInput, InputEncryptor, InputProof,
    MemoryConfidential,
};
pub use crypto::{derive_key, generate_secret, EncryptionKey, EncryptionNonce, SECRET_MAX, SECRET_MIN};
pub use envelope::{decrypt_body, encrypt_body, BodyPayload, PAYLOAD_TAG};
pub use error::{CipherError, PermsError, Result};
