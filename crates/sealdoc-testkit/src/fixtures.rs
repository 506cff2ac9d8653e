//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use sealdoc::{ClientConfig, DocumentClient, Ledger, LedgerConfig};
use sealdoc_core::{DocumentId, Identity, Keypair};
use sealdoc_perms::{InputEncryptor, MemoryConfidential};
use sealdoc_store::{MemoryStore, SqliteStore, Store};

/// Install a `tracing` subscriber for the current test binary.
///
/// Honors `RUST_LOG`; defaults to `warn`. Safe to call from every test.
pub fn init_test_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// A ledger backed by the in-process confidentiality subsystem.
pub struct TestLedger<S: Store + 'static> {
    pub ledger: Ledger<S, MemoryConfidential>,
}

impl TestLedger<MemoryStore> {
    /// A ledger over an in-memory store.
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new())
    }
}

impl Default for TestLedger<MemoryStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl TestLedger<SqliteStore> {
    /// A ledger over an in-memory SQLite database.
    pub fn sqlite() -> Self {
        let store = SqliteStore::open_memory().expect("in-memory sqlite should open");
        Self::with_store(store)
    }
}

impl<S: Store + 'static> TestLedger<S> {
    /// A ledger over `store` with default configuration.
    pub fn with_store(store: S) -> Self {
        init_test_logging();
        Self {
            ledger: Ledger::new(store, MemoryConfidential::default(), LedgerConfig::default()),
        }
    }

    /// A party with a deterministic keypair derived from `index`.
    pub fn party(&self, index: u8) -> Party<S> {
        let mut seed = [0u8; 32];
        seed[0] = index;
        seed[31] = 0x5d;
        self.party_with(Keypair::from_seed(&seed), ClientConfig::default())
    }

    /// A party with an explicit keypair and client configuration.
    pub fn party_with(&self, keypair: Keypair, config: ClientConfig) -> Party<S> {
        Party {
            keypair: keypair.clone(),
            client: DocumentClient::new(keypair, self.ledger.clone(), config),
        }
    }

    /// Create a document directly on the ledger, as `owner`, under `secret`.
    pub async fn create_as(
        &self,
        owner: &Keypair,
        name: &str,
        secret: u64,
    ) -> sealdoc::Result<DocumentId> {
        let caller = owner.identity();
        let (input, proof) =
            self.ledger
                .confidential()
                .encrypt_input(secret, &self.ledger.contract(), &caller)?;
        self.ledger.create(&caller, name, &input, &proof).await
    }
}

/// One participant: a keypair and a client acting for it.
pub struct Party<S: Store + 'static> {
    pub keypair: Keypair,
    pub client: DocumentClient<S, MemoryConfidential>,
}

impl<S: Store + 'static> Party<S> {
    pub fn identity(&self) -> Identity {
        self.keypair.identity()
    }
}

/// Create multiple parties for multi-party tests.
pub fn multi_party<S: Store + 'static>(ledger: &TestLedger<S>, count: usize) -> Vec<Party<S>> {
    (0..count).map(|i| ledger.party(i as u8)).collect()
}
