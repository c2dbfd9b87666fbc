//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::collections::HashMap;

use tokenchain_core::keys::trans_type;
use tokenchain_core::{
    build_next, Block, DidSigner, Ed25519Did, GenesisBlock, GenesisTokenInfo, KeyRing, Result,
    TokenChainRecord, TransToken,
};

/// A test fixture with a DID and a key ring that knows it.
pub struct TestFixture {
    pub did: Ed25519Did,
    pub ring: KeyRing,
}

impl TestFixture {
    /// Create a new test fixture with a random key.
    pub fn new() -> Self {
        Self::from_did(Ed25519Did::generate())
    }

    /// Create with a deterministic key from seed.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self::from_did(Ed25519Did::from_seed(&seed))
    }

    fn from_did(did: Ed25519Did) -> Self {
        let ring = [did.clone()].into_iter().collect();
        Self { did, ring }
    }

    pub fn did_str(&self) -> &str {
        self.did.did()
    }

    /// A transfer owned by this fixture touching `tokens`.
    pub fn transfer(&self, tokens: &[&str]) -> TokenChainRecord {
        TokenChainRecord {
            transaction_type: trans_type::TOKEN_TRANSFERRED.into(),
            owner: self.did_str().to_string(),
            sender_did: self.did_str().to_string(),
            comment: "test".into(),
            tokens: tokens.iter().map(|t| TransToken::new(*t, 0)).collect(),
            ..Default::default()
        }
    }

    /// A genesis record minting `tokens` at level 1.
    pub fn genesis(&self, tokens: &[&str]) -> TokenChainRecord {
        let info = tokens
            .iter()
            .enumerate()
            .map(|(i, t)| GenesisTokenInfo {
                token: (*t).to_string(),
                token_level: 1,
                token_number: i as i64,
                ..Default::default()
            })
            .collect();
        TokenChainRecord {
            transaction_type: trans_type::TOKEN_GENERATED.into(),
            owner: self.did_str().to_string(),
            genesis: Some(GenesisBlock {
                genesis_type: "1".into(),
                info,
            }),
            token_value: 1.0,
            ..self.transfer(tokens)
        }
    }

    /// Build the next block for `record` and sign it with this fixture.
    pub fn signed_block(
        &self,
        heads: &HashMap<String, Block>,
        record: &TokenChainRecord,
    ) -> Result<Block> {
        let mut block = build_next(heads, record)?;
        block.update_signature(&self.did)?;
        Ok(block)
    }

    /// Build `len` signed blocks on one token, returning them in order.
    pub fn chain(&self, token: &str, len: usize) -> Result<Vec<Block>> {
        let mut heads = HashMap::new();
        let mut blocks = Vec::with_capacity(len);
        for i in 0..len {
            let record = if i == 0 {
                self.genesis(&[token])
            } else {
                self.transfer(&[token])
            };
            let block = self.signed_block(&heads, &record)?;
            heads.insert(token.to_string(), block.clone());
            blocks.push(block);
        }
        Ok(blocks)
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Create multiple test fixtures for multi-party tests.
pub fn multi_party_fixtures(count: usize) -> Vec<TestFixture> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[0] = i as u8;
            TestFixture::with_seed(seed)
        })
        .collect()
}

/// A key ring holding every fixture's DID.
pub fn shared_ring(fixtures: &[TestFixture]) -> KeyRing {
    fixtures.iter().map(|f| f.did.clone()).collect()
}

/// A small legacy chain in its JSON file form.
pub fn legacy_chain_json(owners: &[&str]) -> String {
    let blocks: Vec<serde_json::Value> = owners
        .iter()
        .enumerate()
        .map(|(i, owner)| {
            serde_json::json!({
                "owner": owner,
                "comment": format!("block {i}"),
                "hash": format!("h{i}"),
                "pvtShareBits": "01",
                "stakedToken": "QmStake",
            })
        })
        .collect();
    serde_json::Value::Array(blocks).to_string()
}
