//! Error types for the permissions module.

use thiserror::Error;

/// Errors from the client cipher.
///
/// A payload that does not parse is reported as `MalformedPayload`; a payload
/// that parses but fails authentication (wrong secret, tampering, truncation)
/// is reported as `AuthenticationFailed`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    /// The payload is not in the recognized `v1:<nonce>:<ciphertext>` format.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// AEAD authentication failed.
    #[error("authentication failed: wrong secret or corrupted payload")]
    AuthenticationFailed,

    /// Encryption failed.
    #[error("encryption error: {0}")]
    Encryption(String),
}

/// Errors from the confidentiality subsystem.
#[derive(Debug, Error)]
pub enum PermsError {
    /// The input proof did not verify.
    #[error("invalid input proof: {0}")]
    InvalidProof(String),

    /// The encrypted input could not be opened by the subsystem.
    #[error("input decryption failed")]
    InputDecryption,

    /// No value is stored behind this handle.
    #[error("unknown handle: {0}")]
    UnknownHandle(String),

    /// The requester is not on the handle's access list.
    #[error("access denied: {identity} may not decrypt {handle}")]
    AccessDenied { handle: String, identity: String },

    /// The decrypt authorization signature does not match its requester.
    #[error("invalid authorization signature")]
    InvalidSignature,

    /// The decrypt authorization window has passed.
    #[error("authorization expired at {0}")]
    AuthorizationExpired(i64),

    /// The decrypt authorization window has not started.
    #[error("authorization not valid before {0}")]
    AuthorizationNotYetValid(i64),

    /// The decrypt authorization spans more days than allowed.
    #[error("authorization lasts {requested} days, maximum is {max}")]
    AuthorizationTooLong { requested: u32, max: u32 },

    /// The decrypt authorization does not cover this handle or contract.
    #[error("authorization out of scope: {0}")]
    OutOfScope(String),

    /// A writer panicked while holding the subsystem's state lock.
    #[error("confidential state lock poisoned")]
    Poisoned,

    /// Cipher error.
    #[error("cipher error: {0}")]
    Cipher(#[from] CipherError),

    /// Core error.
    #[error("core error: {0}")]
    Core(#[from] sealdoc_core::CoreError),
}

/// Result type for confidentiality subsystem operations.
pub type Result<T> = std::result::Result<T, PermsError>;
