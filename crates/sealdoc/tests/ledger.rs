//! Ledger behavior, checked against both store backends.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use proptest::prelude::*;
use sealdoc::core::{ContractAddress, Document, KeyHandle, Keypair, RecordedEvent, Timestamp};
use sealdoc::perms::{
    ConfidentialBackend, DecryptAuthorization, EncryptedInput, InputEncryptor, InputProof,
    MemoryConfidential, PermsError,
};
use sealdoc::store::{GrantResult, InsertResult, MemoryStore, Store, StoreError, UpdateResult};
use sealdoc::{
    compute_identifier, DocumentId, Identity, Ledger, LedgerConfig, LedgerError, LedgerEvent,
};
use sealdoc_testkit::generators::document_name;
use sealdoc_testkit::{multi_party, TestLedger};

const SECRET: u64 = 3_141_592_653;

type MemoryLedger = sealdoc::Ledger<sealdoc::store::MemoryStore, sealdoc::perms::MemoryConfidential>;

async fn duplicate_create_keeps_first<S: Store + 'static>(t: TestLedger<S>) -> Result<()> {
    let [first, second] = <[_; 2]>::try_from(multi_party(&t, 2)).ok().unwrap();

    let id = t.create_as(&first.keypair, "report.pdf", SECRET).await?;
    let original = t.ledger.get(&id).await?;

    let err = t
        .create_as(&second.keypair, "report.pdf", SECRET + 1)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::AlreadyExists(dup) if dup == id));

    // The same owner cannot recreate it either.
    assert!(matches!(
        t.create_as(&first.keypair, "report.pdf", SECRET).await,
        Err(LedgerError::AlreadyExists(_))
    ));

    let after = t.ledger.get(&id).await?;
    assert_eq!(after.owner, first.identity());
    assert_eq!(after.created_at, original.created_at);
    assert_eq!(after.key_handle, original.key_handle);
    assert!(!t.ledger.is_editor(&id, &second.identity()).await?);
    assert_eq!(t.ledger.count().await?, 1);
    Ok(())
}

async fn new_document_is_blank<S: Store + 'static>(t: TestLedger<S>) -> Result<()> {
    let owner = t.party(1);
    let id = t.create_as(&owner.keypair, "blank.txt", SECRET).await?;

    let doc = t.ledger.get(&id).await?;
    assert_eq!(doc.id, compute_identifier("blank.txt"));
    assert_eq!(doc.name, "blank.txt");
    assert_eq!(doc.version, 0);
    assert_eq!(doc.body, "");
    assert_eq!(doc.created_at, doc.updated_at);
    Ok(())
}

async fn version_counts_updates<S: Store + 'static>(t: TestLedger<S>) -> Result<()> {
    let owner = t.party(1);
    let id = t.create_as(&owner.keypair, "counter.txt", SECRET).await?;

    for n in 1..=5u64 {
        let version = t
            .ledger
            .update_body(&owner.identity(), &id, &format!("body {n}"))
            .await?;
        assert_eq!(version, n);
    }

    let doc = t.ledger.get(&id).await?;
    assert_eq!(doc.version, 5);
    assert_eq!(doc.body, "body 5");
    assert!(doc.updated_at >= doc.created_at);
    Ok(())
}

async fn owner_is_editor_at_creation<S: Store + 'static>(t: TestLedger<S>) -> Result<()> {
    let owner = t.party(1);
    let id = t.create_as(&owner.keypair, "mine.txt", SECRET).await?;

    assert!(t.ledger.is_editor(&id, &owner.identity()).await?);
    assert_eq!(t.ledger.editors(&id).await?, vec![owner.identity()]);
    Ok(())
}

async fn grant_enables_editing<S: Store + 'static>(t: TestLedger<S>) -> Result<()> {
    let [owner, grantee, stranger] = <[_; 3]>::try_from(multi_party(&t, 3)).ok().unwrap();
    let id = t.create_as(&owner.keypair, "team.txt", SECRET).await?;

    assert!(matches!(
        t.ledger.update_body(&stranger.identity(), &id, "nope").await,
        Err(LedgerError::NotEditor { caller, .. }) if caller == stranger.identity()
    ));
    assert!(!t.ledger.is_editor(&id, &grantee.identity()).await?);

    t.ledger
        .grant_access(&owner.identity(), &id, &grantee.identity())
        .await?;
    assert!(t.ledger.is_editor(&id, &grantee.identity()).await?);
    assert_eq!(
        t.ledger.update_body(&grantee.identity(), &id, "from grantee").await?,
        1
    );

    assert!(matches!(
        t.ledger.update_body(&stranger.identity(), &id, "still nope").await,
        Err(LedgerError::NotEditor { .. })
    ));

    let doc = t.ledger.get(&id).await?;
    assert_eq!(doc.body, "from grantee");
    assert_eq!(doc.version, 1);
    Ok(())
}

async fn only_owner_grants<S: Store + 'static>(t: TestLedger<S>) -> Result<()> {
    let [owner, editor, stranger] = <[_; 3]>::try_from(multi_party(&t, 3)).ok().unwrap();
    let id = t.create_as(&owner.keypair, "owned.txt", SECRET).await?;
    t.ledger
        .grant_access(&owner.identity(), &id, &editor.identity())
        .await?;

    // Edit rights do not include granting.
    assert!(matches!(
        t.ledger.grant_access(&editor.identity(), &id, &stranger.identity()).await,
        Err(LedgerError::NotOwner { caller, .. }) if caller == editor.identity()
    ));
    assert!(matches!(
        t.ledger.grant_access(&stranger.identity(), &id, &stranger.identity()).await,
        Err(LedgerError::NotOwner { .. })
    ));
    assert!(!t.ledger.is_editor(&id, &stranger.identity()).await?);
    Ok(())
}

async fn grant_is_idempotent<S: Store + 'static>(t: TestLedger<S>) -> Result<()> {
    let [owner, grantee] = <[_; 2]>::try_from(multi_party(&t, 2)).ok().unwrap();
    let id = t.create_as(&owner.keypair, "twice.txt", SECRET).await?;

    t.ledger.grant_access(&owner.identity(), &id, &grantee.identity()).await?;
    t.ledger.grant_access(&owner.identity(), &id, &grantee.identity()).await?;
    t.ledger.grant_access(&owner.identity(), &id, &owner.identity()).await?;

    assert_eq!(
        t.ledger.editors(&id).await?,
        vec![owner.identity(), grantee.identity()]
    );

    let kinds: Vec<_> = t
        .ledger
        .events(0, 100)
        .await?
        .into_iter()
        .map(|e| e.event.kind_tag())
        .collect();
    assert_eq!(kinds, vec![1, 3]);
    Ok(())
}

async fn validation_errors<S: Store + 'static>(t: TestLedger<S>) -> Result<()> {
    let owner = t.party(1);

    assert!(matches!(
        t.create_as(&owner.keypair, "", SECRET).await,
        Err(LedgerError::InvalidName)
    ));

    let id = t.create_as(&owner.keypair, "valid.txt", SECRET).await?;
    assert!(matches!(
        t.ledger.grant_access(&owner.identity(), &id, &Identity::ZERO).await,
        Err(LedgerError::InvalidAddress)
    ));
    assert_eq!(t.ledger.editors(&id).await?.len(), 1);
    Ok(())
}

async fn unknown_documents<S: Store + 'static>(t: TestLedger<S>) -> Result<()> {
    let owner = t.party(1);
    let missing = compute_identifier("never-created.txt");

    assert!(matches!(t.ledger.get(&missing).await, Err(LedgerError::NotFound(id)) if id == missing));
    assert!(matches!(
        t.ledger.update_body(&owner.identity(), &missing, "x").await,
        Err(LedgerError::NotFound(_))
    ));
    assert!(matches!(
        t.ledger.grant_access(&owner.identity(), &missing, &t.party(2).identity()).await,
        Err(LedgerError::NotFound(_))
    ));
    assert!(!t.ledger.is_editor(&missing, &owner.identity()).await?);
    Ok(())
}

async fn pagination_clamps<S: Store + 'static>(t: TestLedger<S>) -> Result<()> {
    let owner = t.party(1);
    let mut ids: Vec<DocumentId> = Vec::new();
    for i in 0..7 {
        ids.push(t.create_as(&owner.keypair, &format!("page-{i}.txt"), SECRET).await?);
    }
    let count = t.ledger.count().await?;
    assert_eq!(count, 7);

    assert_eq!(t.ledger.list_ids(0, 3).await?, ids[0..3]);
    assert_eq!(t.ledger.list_ids(3, 3).await?, ids[3..6]);
    assert_eq!(t.ledger.list_ids(5, 100).await?, ids[5..7]);
    assert_eq!(t.ledger.list_ids(0, count).await?, ids);
    assert!(t.ledger.list_ids(count, 1).await?.is_empty());
    assert!(t.ledger.list_ids(count + 10, 10).await?.is_empty());
    assert!(t.ledger.list_ids(2, 0).await?.is_empty());

    let docs = t.ledger.list_documents(6, 10).await?;
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].name, "page-6.txt");
    Ok(())
}

async fn audit_trail_records_transitions<S: Store + 'static>(t: TestLedger<S>) -> Result<()> {
    let [owner, grantee] = <[_; 2]>::try_from(multi_party(&t, 2)).ok().unwrap();
    let mut live = t.ledger.subscribe();

    let id = t.create_as(&owner.keypair, "audited.txt", SECRET).await?;
    t.ledger.update_body(&owner.identity(), &id, "v1:a:b").await?;
    t.ledger.grant_access(&owner.identity(), &id, &grantee.identity()).await?;

    // Rejected calls leave no trace.
    let _ = t.ledger.update_body(&t.party(9).identity(), &id, "x").await;
    let _ = t.create_as(&grantee.keypair, "audited.txt", SECRET).await;

    let events = t.ledger.events(0, 100).await?;
    let expected = vec![
        LedgerEvent::DocumentCreated {
            id,
            owner: owner.identity(),
            name: "audited.txt".into(),
        },
        LedgerEvent::DocumentUpdated {
            id,
            editor: owner.identity(),
            version: 1,
        },
        LedgerEvent::AccessGranted {
            id,
            owner: owner.identity(),
            grantee: grantee.identity(),
        },
    ];
    assert_eq!(events.iter().map(|e| e.event.clone()).collect::<Vec<_>>(), expected);
    assert_eq!(events.iter().map(|e| e.seq).collect::<Vec<_>>(), vec![1, 2, 3]);

    assert_eq!(t.ledger.events(2, 100).await?.len(), 1);

    for want in &events {
        assert_eq!(&live.recv().await?, want);
    }
    Ok(())
}

macro_rules! for_each_store {
    ($($name:ident),* $(,)?) => {
        mod memory {
            $(
                #[tokio::test]
                async fn $name() -> anyhow::Result<()> {
                    super::$name(super::TestLedger::new()).await
                }
            )*
        }

        mod sqlite {
            $(
                #[tokio::test]
                async fn $name() -> anyhow::Result<()> {
                    super::$name(super::TestLedger::sqlite()).await
                }
            )*
        }
    };
}

for_each_store!(
    duplicate_create_keeps_first,
    new_document_is_blank,
    version_counts_updates,
    owner_is_editor_at_creation,
    grant_enables_editing,
    only_owner_grants,
    grant_is_idempotent,
    validation_errors,
    unknown_documents,
    pagination_clamps,
    audit_trail_records_transitions,
);

// ─────────────────────────────────────────────────────────────────────────────
// Concurrency
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_of_one_name_admit_exactly_one() -> Result<()> {
    let t = TestLedger::sqlite();
    let parties = multi_party(&t, 8);

    let mut tasks = Vec::new();
    for party in &parties {
        let ledger = t.ledger.clone();
        let keypair = party.keypair.clone();
        tasks.push(tokio::spawn(async move {
            let fixture = TestLedger { ledger };
            fixture.create_as(&keypair, "contested.txt", SECRET).await
        }));
    }

    let mut winners = Vec::new();
    for task in tasks {
        match task.await? {
            Ok(id) => winners.push(id),
            Err(LedgerError::AlreadyExists(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(winners.len(), 1);
    assert_eq!(t.ledger.count().await?, 1);
    assert_eq!(t.ledger.events(0, 100).await?.len(), 1);

    let doc = t.ledger.get(&winners[0]).await?;
    assert!(parties.iter().any(|p| p.identity() == doc.owner));
    assert_eq!(t.ledger.editors(&doc.id).await?, vec![doc.owner]);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_updates_each_get_a_version() -> Result<()> {
    let t = TestLedger::new();
    let [owner, editor] = <[_; 2]>::try_from(multi_party(&t, 2)).ok().unwrap();
    let id = t.create_as(&owner.keypair, "busy.txt", SECRET).await?;
    t.ledger.grant_access(&owner.identity(), &id, &editor.identity()).await?;

    let mut tasks = Vec::new();
    for i in 0..20 {
        let ledger = t.ledger.clone();
        let who = if i % 2 == 0 { owner.identity() } else { editor.identity() };
        tasks.push(tokio::spawn(async move {
            ledger.update_body(&who, &id, &format!("write {i}")).await
        }));
    }

    let mut versions = HashSet::new();
    for task in tasks {
        versions.insert(task.await??);
    }

    assert_eq!(versions, (1..=20).collect::<HashSet<u64>>());
    assert_eq!(t.ledger.get(&id).await?.version, 20);
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Partial failures during a grant
// ─────────────────────────────────────────────────────────────────────────────

/// An in-memory store whose editor writes can be made to fail.
#[derive(Default)]
struct FailingGrants {
    inner: MemoryStore,
    fail: AtomicBool,
}

#[async_trait]
impl Store for FailingGrants {
    async fn create_document(
        &self,
        doc: &Document,
        event: &LedgerEvent,
    ) -> sealdoc::store::Result<InsertResult> {
        self.inner.create_document(doc, event).await
    }

    async fn get_document(&self, id: &DocumentId) -> sealdoc::store::Result<Option<Document>> {
        self.inner.get_document(id).await
    }

    async fn update_body(
        &self,
        id: &DocumentId,
        body: &str,
        updated_at: Timestamp,
        expected_version: u64,
        event: &LedgerEvent,
    ) -> sealdoc::store::Result<UpdateResult> {
        self.inner
            .update_body(id, body, updated_at, expected_version, event)
            .await
    }

    async fn add_editor(
        &self,
        id: &DocumentId,
        identity: &Identity,
        granted_at: Timestamp,
        event: &LedgerEvent,
    ) -> sealdoc::store::Result<GrantResult> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::InvalidData("editor table unavailable".into()));
        }
        self.inner.add_editor(id, identity, granted_at, event).await
    }

    async fn is_editor(&self, id: &DocumentId, identity: &Identity) -> sealdoc::store::Result<bool> {
        self.inner.is_editor(id, identity).await
    }

    async fn editors(&self, id: &DocumentId) -> sealdoc::store::Result<Vec<Identity>> {
        self.inner.editors(id).await
    }

    async fn count(&self) -> sealdoc::store::Result<u64> {
        self.inner.count().await
    }

    async fn list_ids(&self, offset: u64, limit: u64) -> sealdoc::store::Result<Vec<DocumentId>> {
        self.inner.list_ids(offset, limit).await
    }

    async fn list_documents(
        &self,
        offset: u64,
        limit: u64,
    ) -> sealdoc::store::Result<Vec<Document>> {
        self.inner.list_documents(offset, limit).await
    }

    async fn events(
        &self,
        after_seq: u64,
        limit: u64,
    ) -> sealdoc::store::Result<Vec<RecordedEvent>> {
        self.inner.events(after_seq, limit).await
    }
}

/// A confidentiality subsystem whose access-list writes can be made to fail.
#[derive(Default)]
struct FailingAllow {
    inner: MemoryConfidential,
    fail: AtomicBool,
}

#[async_trait]
impl ConfidentialBackend for FailingAllow {
    async fn admit(
        &self,
        input: &EncryptedInput,
        proof: &InputProof,
        contract: &ContractAddress,
        submitter: &Identity,
    ) -> sealdoc::perms::Result<KeyHandle> {
        self.inner.admit(input, proof, contract, submitter).await
    }

    async fn allow(&self, handle: &KeyHandle, identity: &Identity) -> sealdoc::perms::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PermsError::UnknownHandle(handle.to_string()));
        }
        self.inner.allow(handle, identity).await
    }

    async fn is_allowed(
        &self,
        handle: &KeyHandle,
        identity: &Identity,
    ) -> sealdoc::perms::Result<bool> {
        self.inner.is_allowed(handle, identity).await
    }

    async fn user_decrypt(
        &self,
        handle: &KeyHandle,
        contract: &ContractAddress,
        authorization: &DecryptAuthorization,
        now: Timestamp,
    ) -> sealdoc::perms::Result<u64> {
        self.inner.user_decrypt(handle, contract, authorization, now).await
    }
}

impl InputEncryptor for FailingAllow {
    fn encrypt_input(
        &self,
        value: u64,
        contract: &ContractAddress,
        submitter: &Identity,
    ) -> sealdoc::perms::Result<(EncryptedInput, InputProof)> {
        self.inner.encrypt_input(value, contract, submitter)
    }
}

async fn grant_events<S: Store + 'static, C: ConfidentialBackend + 'static>(
    ledger: &Ledger<S, C>,
) -> Result<usize> {
    Ok(ledger
        .events(0, 100)
        .await?
        .iter()
        .filter(|r| matches!(r.event, LedgerEvent::AccessGranted { .. }))
        .count())
}

#[tokio::test]
async fn failed_editor_write_leaves_access_list_untouched() -> Result<()> {
    let t = TestLedger::with_store(FailingGrants::default());
    let [owner, grantee] = <[_; 2]>::try_from(multi_party(&t, 2)).ok().unwrap();
    let id = t.create_as(&owner.keypair, "guarded.txt", SECRET).await?;
    let handle = t.ledger.get(&id).await?.key_handle;

    t.ledger.store().fail.store(true, Ordering::SeqCst);
    assert!(matches!(
        t.ledger.grant_access(&owner.identity(), &id, &grantee.identity()).await,
        Err(LedgerError::Store(StoreError::InvalidData(_)))
    ));

    assert!(!t.ledger.is_editor(&id, &grantee.identity()).await?);
    assert!(!t.ledger.confidential().is_allowed(&handle, &grantee.identity()).await?);
    assert!(grantee.client.reveal_secret(&id).await.is_err());
    assert_eq!(grant_events(&t.ledger).await?, 0);

    t.ledger.store().fail.store(false, Ordering::SeqCst);
    t.ledger.grant_access(&owner.identity(), &id, &grantee.identity()).await?;
    assert!(t.ledger.is_editor(&id, &grantee.identity()).await?);
    assert_eq!(grantee.client.reveal_secret(&id).await?, SECRET);
    Ok(())
}

#[tokio::test]
async fn retried_grant_completes_access_list() -> Result<()> {
    sealdoc_testkit::init_test_logging();
    let ledger = Ledger::new(MemoryStore::new(), FailingAllow::default(), LedgerConfig::default());
    let owner = Keypair::from_seed(&[0x01; 32]);
    let grantee = Keypair::from_seed(&[0x02; 32]).identity();

    let caller = owner.identity();
    let (input, proof) = ledger
        .confidential()
        .encrypt_input(SECRET, &ledger.contract(), &caller)?;
    let id = ledger.create(&caller, "split.txt", &input, &proof).await?;
    let handle = ledger.get(&id).await?.key_handle;

    ledger.confidential().fail.store(true, Ordering::SeqCst);
    assert!(matches!(
        ledger.grant_access(&caller, &id, &grantee).await,
        Err(LedgerError::Confidential(_))
    ));
    assert!(ledger.is_editor(&id, &grantee).await?);
    assert!(!ledger.confidential().is_allowed(&handle, &grantee).await?);

    ledger.confidential().fail.store(false, Ordering::SeqCst);
    ledger.grant_access(&caller, &id, &grantee).await?;

    assert!(ledger.confidential().is_allowed(&handle, &grantee).await?);
    assert_eq!(grant_events(&ledger).await?, 1);
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Identifiers
// ─────────────────────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn identifier_depends_only_on_name(name in document_name()) {
        let id = compute_identifier(&name);
        prop_assert_eq!(id, compute_identifier(&name.clone()));
        prop_assert_eq!(id, MemoryLedger::compute_identifier(&name));
    }

    #[test]
    fn distinct_names_do_not_collide(a in document_name(), b in document_name()) {
        prop_assume!(a != b);
        prop_assert_ne!(compute_identifier(&a), compute_identifier(&b));
    }
}
