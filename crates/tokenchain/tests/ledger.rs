//! Ledger integration tests: appends, ingest and concurrency.

use std::sync::Arc;

use tokenchain::core::{BlockOptions, CoreError, KeyRing};
use tokenchain::{IngestResult, Ledger, LedgerConfig, LedgerError};
use tokenchain_testkit::{multi_party_fixtures, shared_ring, TestFixture};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

fn ledger_for(fixture: &TestFixture) -> Ledger {
    Ledger::new(LedgerConfig::default(), Arc::new(fixture.ring.clone()))
        .with_signer(Arc::new(fixture.did.clone()))
}

#[tokio::test]
async fn test_append_builds_chain() {
    init_tracing();
    let fx = TestFixture::with_seed([1; 32]);
    let ledger = ledger_for(&fx);

    let first = ledger.append(&fx.genesis(&["T1"])).await.unwrap();
    let second = ledger.append(&fx.transfer(&["T1"])).await.unwrap();

    assert_eq!(ledger.height("T1").await, 2);
    assert_eq!(
        second.previous_block_id("T1").unwrap(),
        first.block_id("T1").unwrap()
    );
    assert_eq!(ledger.head("T1").await.unwrap().hash().unwrap(), second.hash().unwrap());
    second.verify_signature(&fx.ring).unwrap();
}

#[tokio::test]
async fn test_multi_token_append() {
    let fx = TestFixture::with_seed([2; 32]);
    let ledger = ledger_for(&fx);

    ledger.append(&fx.genesis(&["T1"])).await.unwrap();
    let block = ledger.append(&fx.transfer(&["T1", "T2"])).await.unwrap();

    assert_eq!(block.block_number("T1").unwrap(), 1);
    assert_eq!(block.block_number("T2").unwrap(), 0);
    assert_eq!(block.previous_block_id("T2").unwrap(), "");
    assert_eq!(ledger.tokens().await, vec!["T1", "T2"]);
}

#[tokio::test]
async fn test_append_without_signer() {
    let fx = TestFixture::new();
    let ledger = Ledger::new(LedgerConfig::default(), Arc::new(fx.ring.clone()));
    let err = ledger.append(&fx.transfer(&["T1"])).await.unwrap_err();
    assert!(matches!(err, LedgerError::NoSigner));
    assert_eq!(ledger.height("T1").await, 0);
}

#[tokio::test]
async fn test_append_rejects_empty_tokens() {
    let fx = TestFixture::new();
    let ledger = ledger_for(&fx);
    let err = ledger.append(&fx.transfer(&[])).await.unwrap_err();
    assert!(matches!(err, LedgerError::Core(CoreError::InvalidInput(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_appends_serialise() {
    init_tracing();
    let fx = TestFixture::with_seed([3; 32]);
    let ledger = Arc::new(ledger_for(&fx));
    ledger.append(&fx.genesis(&["T1"])).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..16 {
        let ledger = Arc::clone(&ledger);
        let mut record = fx.transfer(&["T1"]);
        record.comment = format!("transfer {i}");
        handles.push(tokio::spawn(async move { ledger.append(&record).await }));
    }
    for h in handles {
        h.await.unwrap().unwrap();
    }

    let chain = ledger.chain("T1").await.unwrap();
    assert_eq!(chain.len(), 17);
    for (n, pair) in chain.windows(2).enumerate() {
        assert_eq!(pair[1].block_number("T1").unwrap(), n as u64 + 1);
        assert_eq!(
            pair[1].previous_block_id("T1").unwrap(),
            pair[0].block_id("T1").unwrap()
        );
    }
}

#[tokio::test]
async fn test_ingest_replicates_chain() {
    let fx = TestFixture::with_seed([4; 32]);
    let source = ledger_for(&fx);
    let replica = Ledger::new(LedgerConfig::default(), Arc::new(fx.ring.clone()));

    source.append(&fx.genesis(&["T1"])).await.unwrap();
    source.append(&fx.transfer(&["T1"])).await.unwrap();

    for block in source.chain("T1").await.unwrap() {
        let result = replica.ingest(block.bytes().to_vec()).await.unwrap();
        assert_eq!(
            result,
            IngestResult::Accepted {
                hash: block.hash().unwrap().to_string()
            }
        );
    }
    assert_eq!(replica.height("T1").await, 2);

    let head = source.head("T1").await.unwrap();
    assert_eq!(
        replica.ingest(head.into_bytes()).await.unwrap(),
        IngestResult::Duplicate
    );
}

#[tokio::test]
async fn test_ingest_rejects_gap() {
    let fx = TestFixture::with_seed([5; 32]);
    let source = ledger_for(&fx);
    let replica = Ledger::new(LedgerConfig::default(), Arc::new(fx.ring.clone()));

    source.append(&fx.genesis(&["T1"])).await.unwrap();
    let second = source.append(&fx.transfer(&["T1"])).await.unwrap();

    let err = replica.ingest(second.into_bytes()).await.unwrap_err();
    assert!(matches!(err, LedgerError::NotNextBlock { token, .. } if token == "T1"));
}

#[tokio::test]
async fn test_ingest_detects_conflict() {
    let fx = TestFixture::with_seed([6; 32]);
    let a = ledger_for(&fx);
    let b = ledger_for(&fx);

    let genesis = a.append(&fx.genesis(&["T1"])).await.unwrap();
    b.ingest(genesis.bytes().to_vec()).await.unwrap();

    let mut left = fx.transfer(&["T1"]);
    left.receiver_did = "didB".into();
    let mut right = fx.transfer(&["T1"]);
    right.receiver_did = "didC".into();
    a.append(&left).await.unwrap();
    let fork = b.append(&right).await.unwrap();

    let existing = a.head("T1").await.unwrap();
    assert_eq!(
        a.ingest(fork.into_bytes()).await.unwrap(),
        IngestResult::Conflict {
            token: "T1".into(),
            existing: existing.hash().unwrap().to_string(),
        }
    );
    assert_eq!(a.height("T1").await, 2);
}

#[tokio::test]
async fn test_ingest_rejects_unknown_signer() {
    let parties = multi_party_fixtures(2);
    let source = ledger_for(&parties[0]);
    let stranger = Ledger::new(LedgerConfig::default(), Arc::new(parties[1].ring.clone()));

    let block = source.append(&parties[0].transfer(&["T1"])).await.unwrap();
    let err = stranger.ingest(block.into_bytes()).await.unwrap_err();
    assert!(matches!(err, LedgerError::Core(CoreError::Crypto(_))));
}

#[tokio::test]
async fn test_ingest_unsigned_when_allowed() {
    let fx = TestFixture::new();
    let config = LedgerConfig {
        sign_blocks: false,
        require_block_signature: false,
        ..Default::default()
    };
    let source = Ledger::new(config.clone(), Arc::new(KeyRing::default()));
    let block = source.append(&fx.transfer(&["T1"])).await.unwrap();
    assert!(block.signers().is_err());

    let strict = Ledger::new(LedgerConfig::default(), Arc::new(fx.ring.clone()));
    let err = strict.ingest(block.bytes().to_vec()).await.unwrap_err();
    assert!(matches!(
        err,
        LedgerError::Core(CoreError::MissingSignature(_))
    ));

    let lenient = Ledger::new(config, Arc::new(KeyRing::default()));
    assert!(matches!(
        lenient.ingest(block.into_bytes()).await.unwrap(),
        IngestResult::Accepted { .. }
    ));
}

#[tokio::test]
async fn test_quorum_signed_block_ingests() {
    let parties = multi_party_fixtures(3);
    let ring = shared_ring(&parties);
    let ledger = Ledger::new(LedgerConfig::default(), Arc::new(ring));

    let mut block = tokenchain::core::build_next(
        &Default::default(),
        &parties[0].transfer(&["T1"]),
    )
    .unwrap();
    for p in &parties {
        block.update_signature(&p.did).unwrap();
    }
    let decoded = tokenchain::Block::from_bytes(block.into_bytes(), BlockOptions::default()).unwrap();
    assert_eq!(decoded.signers().unwrap().len(), 3);
    ledger.ingest(decoded.into_bytes()).await.unwrap();
    assert_eq!(ledger.height("T1").await, 1);
}

#[tokio::test]
async fn test_dump_and_missing_token() {
    let fx = TestFixture::with_seed([7; 32]);
    let ledger = ledger_for(&fx);
    ledger.append(&fx.genesis(&["T1"])).await.unwrap();

    let dump = ledger.dump("T1").await.unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&dump).unwrap();
    let first = &parsed.as_array().unwrap()[0];
    assert_eq!(first["transactionType"], "05");
    assert_eq!(first["owner"], fx.did_str());

    assert!(matches!(
        ledger.dump("T9").await,
        Err(LedgerError::TokenNotFound(t)) if t == "T9"
    ));
}
