//! End-to-end relay behaviour against in-memory chains.

use std::sync::Arc;
use std::time::Duration;

use omniverse_relay::chain::{
    ChainDescriptor, ChainRegistry, Failure, MemoryChain, MemoryNetwork,
};
use omniverse_relay::keyring::{FileKeyringStore, Keyring, KeyringStore, MemoryKeyringStore};
use omniverse_relay::sync::SyncError;
use omniverse_relay::{Address, Relay, RelayConfig, RelayError, SyncPhase, TokenId};
use omniverse_testkit::{init_tracing, test_keys};

const GOERLI_CONTRACT: Address = Address::from_bytes([0x01; 20]);
const BSC_CONTRACT: Address = Address::from_bytes([0x02; 20]);

struct Harness<K: KeyringStore> {
    relay: Relay<K, Arc<MemoryNetwork>>,
    goerli: Arc<MemoryChain>,
    bsc: Arc<MemoryChain>,
}

fn registry() -> ChainRegistry {
    ChainRegistry::from_descriptors([
        ChainDescriptor::new("goerli", 1, "mem://goerli", GOERLI_CONTRACT),
        ChainDescriptor::new("bsc", 2, "mem://bsc", BSC_CONTRACT).with_cooldown(10),
    ])
    .unwrap()
}

async fn harness_with<K: KeyringStore>(store: K, config: RelayConfig) -> Harness<K> {
    init_tracing();
    let owner = test_keys(2)[0].public_key();
    let network = MemoryNetwork::new();
    let registry = registry();
    let goerli = network.add_chain(registry.get("goerli").unwrap().clone(), owner);
    let bsc = network.add_chain(registry.get("bsc").unwrap().clone(), owner);

    let relay = Relay::new(registry, store, network, config).unwrap();
    let members = relay.registry_members();
    for name in ["goerli", "bsc"] {
        relay
            .session(name)
            .await
            .unwrap()
            .initialize("ipfs://skywalker/", members.clone())
            .await
            .unwrap();
    }
    Harness { relay, goerli, bsc }
}

async fn harness() -> Harness<MemoryKeyringStore> {
    let store = MemoryKeyringStore::with_keyring(Keyring::new(test_keys(2), 0).unwrap());
    harness_with(store, RelayConfig::default()).await
}

#[tokio::test]
async fn test_initialize_sets_contract_state() {
    let h = harness().await;
    let bsc = h.relay.session("bsc").await.unwrap();

    assert_eq!(bsc.cooling_down_time().await.unwrap(), 10);
    assert_eq!(bsc.members().await.unwrap(), h.relay.registry_members());
    assert_eq!(h.bsc.base_uri(), "ipfs://skywalker/");
    assert_eq!(bsc.contract_owner().await.unwrap(), test_keys(2)[0].address());
}

#[tokio::test]
async fn test_sequential_builds_use_consecutive_nonces() {
    let h = harness().await;
    let session = h.relay.session("goerli").await.unwrap();
    let me = session.public_key().fragment();

    let first = session.mint(me, 1u64).await.unwrap();
    let second = session.mint(me, 2u64).await.unwrap();

    assert_eq!(first.nonce(), 0);
    assert_eq!(second.nonce(), 1);
    assert_eq!(first.chain_id(), 1);
    assert_eq!(first.initiating_contract(), &GOERLI_CONTRACT);
    assert_eq!(session.nonce(&session.public_key()).await.unwrap(), 2);
}

#[tokio::test]
async fn test_rejected_submission_does_not_advance_nonce() {
    let h = harness().await;
    let session = h.relay.session("goerli").await.unwrap();
    let me = session.public_key().fragment();

    session.mint(me, 1u64).await.unwrap();
    h.goerli
        .fail_submission(1, Failure::Revert("simulated revert".into()));

    let err = session.mint(me, 2u64).await.unwrap_err();
    match &err {
        RelayError::SubmissionRejected {
            chain,
            nonce,
            operation,
            reason,
            ..
        } => {
            assert_eq!(chain, "goerli");
            assert_eq!(*nonce, Some(1));
            assert_eq!(*operation, "mint");
            assert_eq!(reason, "simulated revert");
        }
        other => panic!("expected rejection, got {other:?}"),
    }
    assert!(!err.is_retryable());

    // The next build reads the nonce again and reuses 1.
    let retried = session.mint(me, 2u64).await.unwrap();
    assert_eq!(retried.nonce(), 1);
}

#[tokio::test]
async fn test_encoding_overflow_is_caught_before_submission() {
    let h = harness().await;
    let session = h.relay.session("goerli").await.unwrap();

    let err = session.mint(vec![0u8; 19], 1u64).await.unwrap_err();
    assert!(matches!(
        err,
        RelayError::EncodingOverflow {
            width: 20,
            actual: 19,
            ..
        }
    ));

    let too_big = TokenId::from_be_bytes(&[0xff; 33]);
    let err = session
        .mint(session.public_key().fragment(), too_big)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RelayError::EncodingOverflow {
            width: 32,
            actual: 33,
            ..
        }
    ));

    assert!(h.goerli.submissions().is_empty());
}

#[tokio::test]
async fn test_transfer_burn_and_queries() {
    let h = harness().await;
    let session = h.relay.session("goerli").await.unwrap();
    let me = session.public_key();
    let bob = test_keys(2)[1].address();

    session.mint(me.fragment(), 7u64).await.unwrap();
    session.mint(me.fragment(), 8u64).await.unwrap();
    session.transfer(bob, 7u64).await.unwrap();

    assert_eq!(session.omniverse_owner_of(7u64).await.unwrap(), bob);
    assert_eq!(session.owner_of(7u64).await.unwrap(), bob);
    assert_eq!(session.omniverse_balance_of(&me).await.unwrap(), 1);
    assert_eq!(session.balance_of(&bob).await.unwrap(), 1);

    // Token 7 is no longer ours to burn.
    let err = session.burn(me.fragment(), 7u64).await.unwrap_err();
    assert!(matches!(err, RelayError::SubmissionRejected { ref reason, .. } if reason == "not token owner"));

    session.burn(me.fragment(), 8u64).await.unwrap();
    assert_eq!(session.omniverse_balance_of(&me).await.unwrap(), 0);

    let overview = session.account_overview(&me).await.unwrap();
    assert_eq!(overview.nonce, 4);
    assert_eq!(overview.omniverse_balance, 0);
    assert_eq!(overview.delayed_tx_count, 0);
    assert_eq!(overview.cooling_down_time, 0);
}

#[tokio::test(start_paused = true)]
async fn test_sync_then_delayed_execution() {
    let h = harness().await;
    let goerli = h.relay.session("goerli").await.unwrap();
    let account = goerli.public_key();
    for token in 0..3u64 {
        goerli.mint(account.fragment(), token).await.unwrap();
    }

    let report = h.relay.sync("goerli", "bsc", &account).await.unwrap();
    assert_eq!(report.phase, SyncPhase::Completed);
    assert_eq!(report.relayed, vec![0, 1, 2]);
    assert_eq!(h.bsc.accepted_nonces(), vec![0, 1, 2]);

    let bsc = h.relay.session("bsc").await.unwrap();
    assert_eq!(bsc.omniverse_owner_of(2u64).await.unwrap(), account.fragment());
    assert_eq!(bsc.delayed_tx_count().await.unwrap(), 3);
    assert_eq!(bsc.executable_delayed_tx().await.unwrap(), None);
    assert!(matches!(
        bsc.trigger_execution().await,
        Err(RelayError::SubmissionRejected { .. })
    ));

    tokio::time::advance(Duration::from_secs(10)).await;

    let ready = bsc.executable_delayed_tx().await.unwrap().unwrap();
    assert_eq!(ready.nonce, 0);
    assert_eq!(ready.sender, account);
    bsc.trigger_execution().await.unwrap();
    assert_eq!(bsc.owner_of(0u64).await.unwrap(), account.fragment());
    assert_eq!(bsc.delayed_tx_count().await.unwrap(), 2);

    assert!(h
        .relay
        .verify_convergence("goerli", "bsc", &account)
        .await
        .unwrap()
        .is_converged());
}

#[tokio::test]
async fn test_sync_twice_is_idempotent() {
    let h = harness().await;
    let goerli = h.relay.session("goerli").await.unwrap();
    let account = goerli.public_key();
    goerli.mint(account.fragment(), 1u64).await.unwrap();

    h.relay.sync("goerli", "bsc", &account).await.unwrap();
    let report = h.relay.sync("goerli", "bsc", &account).await.unwrap();

    assert_eq!(report.phase, SyncPhase::AlreadySynced);
    assert_eq!(h.bsc.submissions().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_syncs_do_not_interleave() {
    let h = harness().await;
    let goerli = h.relay.session("goerli").await.unwrap();
    let account = goerli.public_key();
    for token in 0..4u64 {
        goerli.mint(account.fragment(), token).await.unwrap();
    }
    h.bsc.set_latency(Some(Duration::from_millis(50)));

    let (a, b) = tokio::join!(
        h.relay.sync("goerli", "bsc", &account),
        h.relay.sync("goerli", "bsc", &account),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a.relayed.len() + b.relayed.len(), 4);
    assert!(h.bsc.submissions().iter().all(|s| s.accepted));
    assert_eq!(h.bsc.accepted_nonces(), vec![0, 1, 2, 3]);
}

#[tokio::test]
async fn test_sync_halt_surfaces_resume_point() {
    let h = harness().await;
    let goerli = h.relay.session("goerli").await.unwrap();
    let account = goerli.public_key();
    for token in 0..3u64 {
        goerli.mint(account.fragment(), token).await.unwrap();
    }
    h.bsc
        .fail_submission(1, Failure::Transient("connection reset".into()));

    let err = h.relay.sync("goerli", "bsc", &account).await.unwrap_err();
    assert!(err.is_retryable());
    match err {
        RelayError::Sync(SyncError::Halted { nonce, relayed, .. }) => {
            assert_eq!(nonce, 1);
            assert_eq!(relayed, vec![0]);
        }
        other => panic!("expected halted sync, got {other:?}"),
    }

    let report = h.relay.sync("goerli", "bsc", &account).await.unwrap();
    assert_eq!(report.start_nonce, 1);
    assert_eq!(report.relayed, vec![1, 2]);
}

#[tokio::test(start_paused = true)]
async fn test_slow_chain_is_transient_failure() {
    let store = MemoryKeyringStore::with_keyring(Keyring::new(test_keys(2), 0).unwrap());
    let config = RelayConfig {
        call_timeout: Duration::from_secs(5),
        ..RelayConfig::default()
    };
    let h = harness_with(store, config).await;
    h.goerli.set_latency(Some(Duration::from_secs(60)));

    let session = h.relay.session("goerli").await.unwrap();
    let err = session
        .mint(session.public_key().fragment(), 1u64)
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::TransientNetworkFailure { .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_key_switch_affects_new_sessions_only() {
    let h = harness().await;
    let before = h.relay.session("goerli").await.unwrap();

    h.relay.switch_key(1).unwrap();
    let after = h.relay.session("goerli").await.unwrap();

    assert_eq!(before.public_key(), test_keys(2)[0].public_key());
    assert_eq!(after.public_key(), test_keys(2)[1].public_key());

    // The second key does not own the contract.
    let err = after
        .mint(after.public_key().fragment(), 1u64)
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::SubmissionRejected { ref reason, .. } if reason == "only owner can mint"));
}

#[tokio::test]
async fn test_key_switch_persists_to_file() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join(".secret.json");
    FileKeyringStore::new(&path).save(&Keyring::new(test_keys(2), 0)?)?;

    let h = harness_with(FileKeyringStore::new(&path), RelayConfig::default()).await;
    assert!(matches!(
        h.relay.switch_key(2),
        Err(RelayError::IndexOutOfRange { index: 2, len: 2 })
    ));
    h.relay.switch_key(1)?;

    let reloaded = FileKeyringStore::new(&path).load()?;
    assert_eq!(reloaded.active_index(), 1);
    assert_eq!(reloaded.public_key(), test_keys(2)[1].public_key());
    Ok(())
}

#[tokio::test]
async fn test_unknown_chain_name() {
    let h = harness().await;
    assert!(matches!(
        h.relay.session("polygon").await,
        Err(RelayError::ConfigNotFound(ref name)) if name == "polygon"
    ));
}
