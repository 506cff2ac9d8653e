//! Signed, time-boxed decrypt authorizations.
//!
//! Recovering a secret's cleartext never relies on a standing credential.
//! The requester signs a short-lived authorization naming the handles and
//! contracts it covers, and the confidentiality subsystem checks it on every
//! decrypt request.

use sealdoc_core::{ContractAddress, Identity, KeyHandle, Keypair, Signature, Timestamp};

use crate::error::{PermsError, Result};

/// Milliseconds in one day.
pub const MS_PER_DAY: i64 = 86_400_000;

const AUTHORIZATION_DOMAIN: &[u8] = b"sealdoc-decrypt-authorization-v1";

/// A requester's signed permission to decrypt specific handles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptAuthorization {
    /// Who is asking. Must be on each handle's access list.
    pub requester: Identity,

    /// Handles this authorization may be used for.
    pub handles: Vec<KeyHandle>,

    /// Contracts whose handles this authorization may be used for.
    pub contracts: Vec<ContractAddress>,

    /// Start of the validity window (Unix milliseconds).
    pub start_ms: Timestamp,

    /// Length of the validity window in whole days.
    pub duration_days: u32,

    /// Requester's signature over all of the above.
    pub signature: Signature,
}

impl DecryptAuthorization {
    /// Create and sign an authorization with `keypair` as the requester.
    pub fn sign(
        keypair: &Keypair,
        handles: Vec<KeyHandle>,
        contracts: Vec<ContractAddress>,
        start_ms: Timestamp,
        duration_days: u32,
    ) -> Self {
        let mut auth = Self {
            requester: keypair.identity(),
            handles,
            contracts,
            start_ms,
            duration_days,
            signature: Signature::ZERO,
        };
        auth.signature = keypair.sign(&auth.signing_message());
        auth
    }

    /// The exact bytes covered by the signature.
    pub fn signing_message(&self) -> Vec<u8> {
        let mut msg = Vec::with_capacity(
            AUTHORIZATION_DOMAIN.len() + 32 * (1 + self.handles.len() + self.contracts.len()) + 20,
        );
        msg.extend_from_slice(AUTHORIZATION_DOMAIN);
        msg.extend_from_slice(self.requester.as_bytes());

        msg.extend_from_slice(&(self.handles.len() as u32).to_be_bytes());
        for handle in &self.handles {
            msg.extend_from_slice(handle.as_bytes());
        }

        msg.extend_from_slice(&(self.contracts.len() as u32).to_be_bytes());
        for contract in &self.contracts {
            msg.extend_from_slice(contract.as_bytes());
        }

        msg.extend_from_slice(&self.start_ms.to_be_bytes());
        msg.extend_from_slice(&self.duration_days.to_be_bytes());
        msg
    }

    /// End of the validity window (exclusive).
    pub fn expires_at(&self) -> Timestamp {
        self.start_ms
            .saturating_add(i64::from(self.duration_days).saturating_mul(MS_PER_DAY))
    }

    /// Verify that the requester signed this authorization.
    pub fn verify_signature(&self) -> Result<()> {
        self.requester
            .verify(&self.signing_message(), &self.signature)
            .map_err(|_| PermsError::InvalidSignature)
    }

    /// Check that this authorization permits decrypting `handle`, owned by
    /// `contract`, at time `now`.
    ///
    /// Access-list membership is checked separately by the subsystem.
    pub fn check(
        &self,
        handle: &KeyHandle,
        contract: &ContractAddress,
        now: Timestamp,
        max_days: u32,
    ) -> Result<()> {
        self.verify_signature()?;

        if self.duration_days > max_days {
            return Err(PermsError::AuthorizationTooLong {
                requested: self.duration_days,
                max: max_days,
            });
        }
        if now < self.start_ms {
            return Err(PermsError::AuthorizationNotYetValid(self.start_ms));
        }
        if now >= self.expires_at() {
            return Err(PermsError::AuthorizationExpired(self.expires_at()));
        }
        if !self.contracts.contains(contract) {
            return Err(PermsError::OutOfScope(format!("contract {contract}")));
        }
        if !self.handles.contains(handle) {
            return Err(PermsError::OutOfScope(format!("handle {handle}")));
        }

        Ok(())
    }
}
