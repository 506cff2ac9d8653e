//! The confidentiality subsystem boundary.
//!
//! Document secrets never exist in ledger state. A caller encrypts the secret
//! for the subsystem, the subsystem attests the encryption, and the ledger
//! admits the input in exchange for an opaque [`KeyHandle`]. Who may later
//! recover the cleartext is tracked per handle, and recovery itself requires a
//! signed [`DecryptAuthorization`].
//!
//! [`MemoryConfidential`] is an in-process implementation used by tests and
//! local deployments. The attestation is an Ed25519 signature by the
//! subsystem's attestor; input ciphertexts are ChaCha20-Poly1305 under the
//! subsystem's input key, bound to the target contract and submitter.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use sealdoc_core::{ContractAddress, Identity, KeyHandle, Keypair, Signature, Timestamp};
use tracing::{debug, warn};

use crate::authorization::DecryptAuthorization;
use crate::crypto::{EncryptionKey, EncryptionNonce};
use crate::error::{PermsError, Result};

const PROOF_DOMAIN: &[u8] = b"sealdoc-input-proof-v1";
const HANDLE_DOMAIN: &[u8] = b"sealdoc-handle-v1";

/// A secret encrypted for the subsystem, bound to one contract and submitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedInput {
    pub ciphertext: Bytes,
    pub nonce: EncryptionNonce,
    pub contract: ContractAddress,
    pub submitter: Identity,
}

impl EncryptedInput {
    /// Associated data the ciphertext is bound to.
    fn binding(contract: &ContractAddress, submitter: &Identity) -> [u8; 64] {
        let mut aad = [0u8; 64];
        aad[..32].copy_from_slice(contract.as_bytes());
        aad[32..].copy_from_slice(submitter.as_bytes());
        aad
    }

    /// The digest an attestor signs to vouch for this input.
    pub fn attestation_message(&self) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(PROOF_DOMAIN);
        hasher.update(&self.ciphertext);
        hasher.update(self.nonce.as_bytes());
        hasher.update(self.contract.as_bytes());
        hasher.update(self.submitter.as_bytes());
        *hasher.finalize().as_bytes()
    }

    /// The handle this input is admitted under.
    pub fn handle(&self) -> KeyHandle {
        let mut hasher = blake3::Hasher::new();
        hasher.update(HANDLE_DOMAIN);
        hasher.update(&self.ciphertext);
        hasher.update(self.nonce.as_bytes());
        hasher.update(self.contract.as_bytes());
        KeyHandle::from_bytes(*hasher.finalize().as_bytes())
    }
}

/// Attestation that an [`EncryptedInput`] was produced correctly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputProof {
    pub attestor: Identity,
    pub signature: Signature,
}

/// Ledger-facing operations of the confidentiality subsystem.
#[async_trait]
pub trait ConfidentialBackend: Send + Sync {
    /// Validate an encrypted input against its proof and store the value.
    ///
    /// Fails unless the input is bound to `contract` and `submitter`.
    async fn admit(
        &self,
        input: &EncryptedInput,
        proof: &InputProof,
        contract: &ContractAddress,
        submitter: &Identity,
    ) -> Result<KeyHandle>;

    /// Add `identity` to the handle's access list. Idempotent.
    async fn allow(&self, handle: &KeyHandle, identity: &Identity) -> Result<()>;

    /// Whether `identity` may recover the handle's cleartext.
    ///
    /// Unknown handles report `false`.
    async fn is_allowed(&self, handle: &KeyHandle, identity: &Identity) -> Result<bool>;

    /// Off-ledger decrypt of a handle on behalf of `authorization.requester`.
    async fn user_decrypt(
        &self,
        handle: &KeyHandle,
        contract: &ContractAddress,
        authorization: &DecryptAuthorization,
        now: Timestamp,
    ) -> Result<u64>;
}

/// Caller-facing side: encrypt a secret for a specific ledger.
pub trait InputEncryptor: Send + Sync {
    fn encrypt_input(
        &self,
        value: u64,
        contract: &ContractAddress,
        submitter: &Identity,
    ) -> Result<(EncryptedInput, InputProof)>;
}

/// Configuration for the confidentiality subsystem.
#[derive(Debug, Clone)]
pub struct ConfidentialConfig {
    /// Longest validity window accepted on a decrypt authorization.
    pub max_authorization_days: u32,
}

impl Default for ConfidentialConfig {
    fn default() -> Self {
        Self {
            max_authorization_days: 10,
        }
    }
}

struct StoredValue {
    value: u64,
    contract: ContractAddress,
}

#[derive(Default)]
struct Inner {
    values: HashMap<KeyHandle, StoredValue>,
    acl: HashMap<KeyHandle, HashSet<Identity>>,
}

/// In-process confidentiality subsystem.
pub struct MemoryConfidential {
    config: ConfidentialConfig,
    input_key: EncryptionKey,
    attestor: Keypair,
    inner: RwLock<Inner>,
}

impl MemoryConfidential {
    /// Create a subsystem with fresh random keys.
    pub fn new(config: ConfidentialConfig) -> Self {
        Self::with_keys(config, EncryptionKey::generate(), Keypair::generate())
    }

    /// Create a subsystem with fixed keys.
    pub fn with_keys(config: ConfidentialConfig, input_key: EncryptionKey, attestor: Keypair) -> Self {
        Self {
            config,
            input_key,
            attestor,
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Identity whose signatures this subsystem accepts as input proofs.
    pub fn attestor(&self) -> Identity {
        self.attestor.identity()
    }

    pub fn config(&self) -> &ConfidentialConfig {
        &self.config
    }

    fn lock_poisoned() -> PermsError {
        PermsError::Poisoned
    }
}

impl Default for MemoryConfidential {
    fn default() -> Self {
        Self::new(ConfidentialConfig::default())
    }
}

impl InputEncryptor for MemoryConfidential {
    fn encrypt_input(
        &self,
        value: u64,
        contract: &ContractAddress,
        submitter: &Identity,
    ) -> Result<(EncryptedInput, InputProof)> {
        let nonce = EncryptionNonce::generate();
        let aad = EncryptedInput::binding(contract, submitter);
        let ciphertext = self
            .input_key
            .encrypt_with_aad(&value.to_be_bytes(), &aad, &nonce)?;

        let input = EncryptedInput {
            ciphertext: Bytes::from(ciphertext),
            nonce,
            contract: *contract,
            submitter: *submitter,
        };
        let proof = InputProof {
            attestor: self.attestor.identity(),
            signature: self.attestor.sign(&input.attestation_message()),
        };

        Ok((input, proof))
    }
}

#[async_trait]
impl ConfidentialBackend for MemoryConfidential {
    async fn admit(
        &self,
        input: &EncryptedInput,
        proof: &InputProof,
        contract: &ContractAddress,
        submitter: &Identity,
    ) -> Result<KeyHandle> {
        if proof.attestor != self.attestor.identity() {
            warn!(attestor = %proof.attestor, "input proof from unknown attestor");
            return Err(PermsError::InvalidProof("unknown attestor".into()));
        }
        if input.contract != *contract {
            return Err(PermsError::InvalidProof(format!(
                "input bound to contract {}",
                input.contract
            )));
        }
        if input.submitter != *submitter {
            return Err(PermsError::InvalidProof(format!(
                "input bound to submitter {}",
                input.submitter
            )));
        }
        proof
            .attestor
            .verify(&input.attestation_message(), &proof.signature)
            .map_err(|_| PermsError::InvalidProof("attestation signature mismatch".into()))?;

        let aad = EncryptedInput::binding(contract, submitter);
        let plaintext = self
            .input_key
            .decrypt_with_aad(&input.ciphertext, &aad, &input.nonce)
            .map_err(|_| PermsError::InputDecryption)?;
        let bytes: [u8; 8] = plaintext
            .try_into()
            .map_err(|_| PermsError::InputDecryption)?;
        let value = u64::from_be_bytes(bytes);

        let handle = input.handle();
        let mut inner = self.inner.write().map_err(|_| Self::lock_poisoned())?;
        inner.values.insert(
            handle,
            StoredValue {
                value,
                contract: *contract,
            },
        );
        inner.acl.entry(handle).or_default();

        debug!(%handle, %contract, "admitted confidential input");
        Ok(handle)
    }

    async fn allow(&self, handle: &KeyHandle, identity: &Identity) -> Result<()> {
        let mut inner = self.inner.write().map_err(|_| Self::lock_poisoned())?;
        if !inner.values.contains_key(handle) {
            return Err(PermsError::UnknownHandle(handle.to_hex()));
        }
        inner.acl.entry(*handle).or_default().insert(*identity);
        Ok(())
    }

    async fn is_allowed(&self, handle: &KeyHandle, identity: &Identity) -> Result<bool> {
        let inner = self.inner.read().map_err(|_| Self::lock_poisoned())?;
        Ok(inner
            .acl
            .get(handle)
            .is_some_and(|allowed| allowed.contains(identity)))
    }

    async fn user_decrypt(
        &self,
        handle: &KeyHandle,
        contract: &ContractAddress,
        authorization: &DecryptAuthorization,
        now: Timestamp,
    ) -> Result<u64> {
        authorization.check(handle, contract, now, self.config.max_authorization_days)?;

        let inner = self.inner.read().map_err(|_| Self::lock_poisoned())?;
        let stored = inner
            .values
            .get(handle)
            .ok_or_else(|| PermsError::UnknownHandle(handle.to_hex()))?;

        if stored.contract != *contract {
            return Err(PermsError::OutOfScope(format!(
                "handle {handle} belongs to contract {}",
                stored.contract
            )));
        }

        let requester = authorization.requester;
        let allowed = inner
            .acl
            .get(handle)
            .is_some_and(|allowed| allowed.contains(&requester));
        if !allowed {
            warn!(%handle, %requester, "decrypt requested by identity not on access list");
            return Err(PermsError::AccessDenied {
                handle: handle.to_hex(),
                identity: requester.to_hex(),
            });
        }

        debug!(%handle, %requester, "user decrypt");
        Ok(stored.value)
    }
}
