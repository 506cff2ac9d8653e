//! Symmetric primitives for the client cipher.
//!
//! Provides secret-to-key derivation and ChaCha20-Poly1305 authenticated
//! encryption.

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Nonce,
};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::error::CipherError;

/// Blake3 key-derivation context for document body keys.
const BODY_KEY_CONTEXT: &str = "sealdoc 2024-06 document body key v1";

/// Smallest 10-digit secret.
pub const SECRET_MIN: u64 = 1_000_000_000;

/// Largest 10-digit secret.
pub const SECRET_MAX: u64 = 9_999_999_999;

/// Draw a uniformly random 10-digit document secret.
pub fn generate_secret() -> u64 {
    rand::thread_rng().gen_range(SECRET_MIN..=SECRET_MAX)
}

/// Derive the body encryption key for a document secret.
///
/// The key material is the secret's canonical decimal string.
pub fn derive_key(secret: u64) -> EncryptionKey {
    EncryptionKey(blake3::derive_key(
        BODY_KEY_CONTEXT,
        secret.to_string().as_bytes(),
    ))
}

/// A 256-bit symmetric encryption key for ChaCha20-Poly1305.
#[derive(Clone)]
pub struct EncryptionKey([u8; 32]);

impl EncryptionKey {
    /// Generate a new random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Encrypt data with this key.
    pub fn encrypt(&self, plaintext: &[u8], nonce: &EncryptionNonce) -> Result<Vec<u8>, CipherError> {
        self.encrypt_with_aad(plaintext, &[], nonce)
    }

    /// Decrypt data with this key.
    pub fn decrypt(&self, ciphertext: &[u8], nonce: &EncryptionNonce) -> Result<Vec<u8>, CipherError> {
        self.decrypt_with_aad(ciphertext, &[], nonce)
    }

    /// Encrypt data, binding it to associated data that is not encrypted.
    pub fn encrypt_with_aad(
        &self,
        plaintext: &[u8],
        aad: &[u8],
        nonce: &EncryptionNonce,
    ) -> Result<Vec<u8>, CipherError> {
        let cipher = ChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|e| CipherError::Encryption(e.to_string()))?;

        cipher
            .encrypt(Nonce::from_slice(&nonce.0), Payload { msg: plaintext, aad })
            .map_err(|e| CipherError::Encryption(e.to_string()))
    }

    /// Decrypt data that was bound to `aad` at encryption time.
    pub fn decrypt_with_aad(
        &self,
        ciphertext: &[u8],
        aad: &[u8],
        nonce: &EncryptionNonce,
    ) -> Result<Vec<u8>, CipherError> {
        let cipher = ChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|_| CipherError::AuthenticationFailed)?;

        cipher
            .decrypt(Nonce::from_slice(&nonce.0), Payload { msg: ciphertext, aad })
            .map_err(|_| CipherError::AuthenticationFailed)
    }
}

/// A 96-bit nonce for ChaCha20-Poly1305.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionNonce(pub [u8; 12]);

impl EncryptionNonce {
    /// Number of bytes in a nonce.
    pub const LEN: usize = 12;

    /// Generate a new random nonce.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 12];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }
}
