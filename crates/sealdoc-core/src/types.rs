//! Strong type definitions for sealdoc.
//!
//! All identifiers are newtypes to prevent misuse at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::Identity;
use crate::error::Result;

/// Unix time in milliseconds, assigned by the ledger.
pub type Timestamp = i64;

/// Current wall-clock time as a [`Timestamp`].
pub fn now_millis() -> Timestamp {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as Timestamp)
        .unwrap_or(0)
}

macro_rules! hash_newtype {
    ($name:ident, $debug:literal) => {
        impl $name {
            /// Create from raw bytes.
            pub const fn from_bytes(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            /// Get the raw bytes.
            pub const fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            /// Convert to hex string.
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            /// Parse from hex string.
            pub fn from_hex(s: &str) -> Result<Self> {
                let bytes = hex::decode(s)?;
                let arr: [u8; 32] = bytes
                    .try_into()
                    .map_err(|_| hex::FromHexError::InvalidStringLength)?;
                Ok(Self(arr))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $debug, &self.to_hex()[..16])
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", &self.to_hex()[..16])
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl From<[u8; 32]> for $name {
            fn from(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }
        }

        impl TryFrom<&[u8]> for $name {
            type Error = std::array::TryFromSliceError;

            fn try_from(slice: &[u8]) -> std::result::Result<Self, Self::Error> {
                let arr: [u8; 32] = slice.try_into()?;
                Ok(Self(arr))
            }
        }
    };
}

/// A 32-byte document identifier, computed as Blake3(filename).
///
/// The identifier does not depend on the owner, so identical filenames always
/// map to the same document.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(pub [u8; 32]);

hash_newtype!(DocumentId, "DocumentId");

/// Opaque reference to a value held by the confidentiality subsystem.
///
/// The ledger stores handles, never the cleartext behind them.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyHandle(pub [u8; 32]);

hash_newtype!(KeyHandle, "KeyHandle");

/// Address of a deployed ledger program.
///
/// Decrypt authorizations and input proofs are scoped to contract addresses.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContractAddress(pub [u8; 32]);

hash_newtype!(ContractAddress, "Contract");

impl ContractAddress {
    /// Derive the address of a ledger deployed by `deployer` under `label`.
    pub fn derive(deployer: &Identity, label: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"sealdoc-contract-v1:");
        hasher.update(deployer.as_bytes());
        hasher.update(b":");
        hasher.update(label.as_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    /// The ledger a caller gets when none is configured.
    pub fn local() -> Self {
        Self::derive(&Identity::ZERO, "local")
    }
}
