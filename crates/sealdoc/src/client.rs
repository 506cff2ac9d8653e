//! Caller-side document flow.
//!
//! [`DocumentClient`] acts for one identity. It encrypts the secret for the
//! confidentiality subsystem on create, recovers the secret through a signed
//! decrypt authorization, and runs the client cipher over document bodies.
//! The ledger only ever sees encrypted payloads.

use std::future::Future;
use std::time::Duration;

use sealdoc_core::{now_millis, Document, DocumentId, Identity, Keypair};
use sealdoc_perms::{
    decrypt_body, encrypt_body, generate_secret, ConfidentialBackend, DecryptAuthorization,
    InputEncryptor,
};
use sealdoc_store::Store;
use tracing::debug;

use crate::error::{ClientError, LedgerError};
use crate::ledger::Ledger;

/// Configuration for a [`DocumentClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Upper bound on each ledger or subsystem round trip.
    pub request_timeout: Duration,
    /// Validity window of the decrypt authorizations this client signs.
    pub authorization_days: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            authorization_days: 1,
        }
    }
}

/// One caller's view of the ledger.
pub struct DocumentClient<S, C>
where
    S: Store + 'static,
    C: ConfidentialBackend + InputEncryptor + 'static,
{
    keypair: Keypair,
    ledger: Ledger<S, C>,
    config: ClientConfig,
}

impl<S, C> DocumentClient<S, C>
where
    S: Store + 'static,
    C: ConfidentialBackend + InputEncryptor + 'static,
{
    pub fn new(keypair: Keypair, ledger: Ledger<S, C>, config: ClientConfig) -> Self {
        Self {
            keypair,
            ledger,
            config,
        }
    }

    /// The identity this client acts as.
    pub fn identity(&self) -> Identity {
        self.keypair.identity()
    }

    pub fn ledger(&self) -> &Ledger<S, C> {
        &self.ledger
    }

    /// Create a document protected by `secret`.
    pub async fn create(&self, name: &str, secret: u64) -> Result<DocumentId, ClientError> {
        let caller = self.identity();
        let (input, proof) =
            self.ledger
                .confidential()
                .encrypt_input(secret, &self.ledger.contract(), &caller)?;

        let id = self
            .timed(self.ledger.create(&caller, name, &input, &proof))
            .await?;
        debug!(%id, name, "created document");
        Ok(id)
    }

    /// Create a document protected by a fresh random secret.
    ///
    /// Returns the identifier and the secret.
    pub async fn create_with_random_secret(&self, name: &str) -> Result<(DocumentId, u64), ClientError> {
        let secret = generate_secret();
        let id = self.create(name, secret).await?;
        Ok((id, secret))
    }

    /// Recover the document's secret. Requires editor rights.
    pub async fn reveal_secret(&self, id: &DocumentId) -> Result<u64, ClientError> {
        let doc = self.timed(self.ledger.get(id)).await?;
        self.secret_for(&doc).await
    }

    /// Decrypt the current body. A never-written document reads as "".
    pub async fn read(&self, id: &DocumentId) -> Result<String, ClientError> {
        let doc = self.timed(self.ledger.get(id)).await?;
        self.require_editor(&doc).await?;

        if doc.is_blank() {
            return Ok(String::new());
        }

        let secret = self.secret_for(&doc).await?;
        Ok(decrypt_body(secret, &doc.body)?)
    }

    /// Encrypt `plaintext` and replace the body with it.
    ///
    /// Returns the new version.
    pub async fn write(&self, id: &DocumentId, plaintext: &str) -> Result<u64, ClientError> {
        let doc = self.timed(self.ledger.get(id)).await?;
        self.require_editor(&doc).await?;

        let secret = self.secret_for(&doc).await?;
        let payload = encrypt_body(secret, plaintext)?;

        let version = self
            .timed(self.ledger.update_body(&self.identity(), id, &payload))
            .await?;
        debug!(%id, version, "wrote document");
        Ok(version)
    }

    /// Give `grantee` edit and decrypt rights. Owner only.
    pub async fn share(&self, id: &DocumentId, grantee: &Identity) -> Result<(), ClientError> {
        self.timed(self.ledger.grant_access(&self.identity(), id, grantee))
            .await
    }

    async fn require_editor(&self, doc: &Document) -> Result<(), ClientError> {
        let caller = self.identity();
        if self.timed(self.ledger.is_editor(&doc.id, &caller)).await? {
            Ok(())
        } else {
            Err(LedgerError::NotEditor { id: doc.id, caller }.into())
        }
    }

    async fn secret_for(&self, doc: &Document) -> Result<u64, ClientError> {
        let contract = self.ledger.contract();
        let now = now_millis();
        let authorization = DecryptAuthorization::sign(
            &self.keypair,
            vec![doc.key_handle],
            vec![contract],
            now,
            self.config.authorization_days,
        );

        self.timed(self.ledger.confidential().user_decrypt(
            &doc.key_handle,
            &contract,
            &authorization,
            now,
        ))
        .await
    }

    async fn timed<T, E>(&self, fut: impl Future<Output = Result<T, E>>) -> Result<T, ClientError>
    where
        ClientError: From<E>,
    {
        let limit = self.config.request_timeout;
        match tokio::time::timeout(limit, fut).await {
            Ok(result) => result.map_err(ClientError::from),
            Err(_) => Err(ClientError::Timeout(limit)),
        }
    }
}
