//! Encrypted body payloads.
//!
//! A document body is stored on the ledger as a single string:
//!
//! ```text
//! v1:<base64(nonce)>:<base64(ciphertext || tag)>
//! ```
//!
//! The empty string is reserved for a document that has never been written.

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::crypto::{derive_key, EncryptionKey, EncryptionNonce};
use crate::error::CipherError;

/// Format tag of the current payload layout.
pub const PAYLOAD_TAG: &str = "v1";

const SEPARATOR: char = ':';

/// A parsed body payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyPayload {
    /// Nonce used for encryption (unique per encryption).
    pub nonce: EncryptionNonce,

    /// The encrypted body (includes authentication tag).
    pub ciphertext: Vec<u8>,
}

impl BodyPayload {
    /// Encrypt plaintext under `key` with a fresh nonce.
    pub fn seal(plaintext: &[u8], key: &EncryptionKey) -> Result<Self, CipherError> {
        let nonce = EncryptionNonce::generate();
        let ciphertext = key.encrypt(plaintext, &nonce)?;
        Ok(Self { nonce, ciphertext })
    }

    /// Decrypt with `key`.
    pub fn open(&self, key: &EncryptionKey) -> Result<Vec<u8>, CipherError> {
        key.decrypt(&self.ciphertext, &self.nonce)
    }

    /// Serialize to the colon-delimited string form.
    pub fn encode(&self) -> String {
        format!(
            "{PAYLOAD_TAG}{SEPARATOR}{}{SEPARATOR}{}",
            STANDARD.encode(self.nonce.as_bytes()),
            STANDARD.encode(&self.ciphertext)
        )
    }

    /// Parse the colon-delimited string form.
    ///
    /// Checks structure only; authenticity is checked by [`BodyPayload::open`].
    pub fn parse(s: &str) -> Result<Self, CipherError> {
        let parts: Vec<&str> = s.split(SEPARATOR).collect();
        let [tag, nonce, ciphertext] = parts.as_slice() else {
            return Err(CipherError::MalformedPayload(format!(
                "expected 3 components, got {}",
                parts.len()
            )));
        };

        if *tag != PAYLOAD_TAG {
            return Err(CipherError::MalformedPayload(format!(
                "unrecognized format tag {tag:?}"
            )));
        }

        let nonce_bytes = STANDARD
            .decode(nonce)
            .map_err(|e| CipherError::MalformedPayload(format!("nonce: {e}")))?;
        let nonce: [u8; EncryptionNonce::LEN] = nonce_bytes.try_into().map_err(|b: Vec<u8>| {
            CipherError::MalformedPayload(format!(
                "nonce must be {} bytes, got {}",
                EncryptionNonce::LEN,
                b.len()
            ))
        })?;

        let ciphertext = STANDARD
            .decode(ciphertext)
            .map_err(|e| CipherError::MalformedPayload(format!("ciphertext: {e}")))?;

        Ok(Self {
            nonce: EncryptionNonce::from_bytes(nonce),
            ciphertext,
        })
    }
}

impl fmt::Display for BodyPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for BodyPayload {
    type Err = CipherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Encrypt a document body under the key derived from `secret`.
///
/// Every call uses a fresh nonce, so encrypting the same body twice yields
/// different payloads.
pub fn encrypt_body(secret: u64, plaintext: &str) -> Result<String, CipherError> {
    let payload = BodyPayload::seal(plaintext.as_bytes(), &derive_key(secret))?;
    Ok(payload.encode())
}

/// Decrypt a document body produced by [`encrypt_body`].
///
/// The empty payload decrypts to the empty body without touching the cipher.
pub fn decrypt_body(secret: u64, payload: &str) -> Result<String, CipherError> {
    if payload.is_empty() {
        return Ok(String::new());
    }

    let parsed = BodyPayload::parse(payload)?;
    let plaintext = parsed.open(&derive_key(secret))?;

    String::from_utf8(plaintext)
        .map_err(|_| CipherError::MalformedPayload("body is not valid UTF-8".into()))
}
