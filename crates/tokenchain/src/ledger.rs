//! The Ledger: in-memory token chain heads with serialised appends.
//!
//! Building a block reads the head of every token it touches. Two builds
//! from the same heads would compute the same block numbers, so every
//! append and ingest runs under one write lock covering all chains.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use tokenchain_core::dump::dump_chain;
use tokenchain_core::{
    build_next, Block, BlockOptions, CoreError, DidSigner, DidVerifier, TokenChainRecord,
};

use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};

/// Result of ingesting a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestResult {
    /// The block extended every chain it names.
    Accepted { hash: String },
    /// The block was already present in every chain it names.
    Duplicate,
    /// A different block already occupies this position on `token`.
    Conflict { token: String, existing: String },
}

/// Token chains held in memory, indexed by token id.
pub struct Ledger {
    config: LedgerConfig,
    signer: Option<Arc<dyn DidSigner + Send + Sync>>,
    verifier: Arc<dyn DidVerifier + Send + Sync>,
    chains: RwLock<HashMap<String, Vec<Block>>>,
}

impl Ledger {
    /// Create a ledger that verifies signatures with `verifier`.
    pub fn new(config: LedgerConfig, verifier: Arc<dyn DidVerifier + Send + Sync>) -> Self {
        Self {
            config,
            signer: None,
            verifier,
            chains: RwLock::new(HashMap::new()),
        }
    }

    /// Sign locally built blocks as `signer`.
    pub fn with_signer(mut self, signer: Arc<dyn DidSigner + Send + Sync>) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Append Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Build the next block for every token in `record` and append it.
    pub async fn append(&self, record: &TokenChainRecord) -> Result<Block> {
        let mut chains = self.chains.write().await;

        let heads: HashMap<String, Block> = record
            .tokens
            .iter()
            .filter_map(|t| {
                let head = chains.get(&t.token)?.last()?;
                Some((t.token.clone(), head.clone()))
            })
            .collect();

        let mut block = build_next(&heads, record).map_err(|e| {
            warn!(error = %e, tokens = record.tokens.len(), "rejected block build");
            e
        })?;

        if self.config.sign_blocks {
            let signer = self.signer.as_ref().ok_or(LedgerError::NoSigner)?;
            block.update_signature(&**signer)?;
        }

        let tokens = block.trans_tokens()?;
        for token in &tokens {
            chains.entry(token.clone()).or_default().push(block.clone());
        }
        debug!(hash = block.hash()?, tokens = tokens.len(), "appended block");
        Ok(block)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Ingest Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Ingest a block received from elsewhere.
    ///
    /// The block must extend the current head of every chain it names.
    pub async fn ingest(&self, bytes: Vec<u8>) -> Result<IngestResult> {
        let options = BlockOptions {
            no_signature: !self.config.require_block_signature,
        };
        let block = Block::from_bytes(bytes, options)?;

        if self.config.verify_on_ingest {
            match block.signers() {
                Ok(_) => block.verify_signature(&*self.verifier)?,
                Err(e) if self.config.require_block_signature => return Err(e.into()),
                Err(_) => {}
            }
        }

        let tokens = block.trans_tokens()?;
        if tokens.is_empty() {
            return Err(CoreError::InvalidInput("block names no tokens".into()).into());
        }
        let hash = block.hash()?.to_string();

        let mut chains = self.chains.write().await;
        let mut fresh = Vec::new();
        for token in &tokens {
            let number = block.block_number(token)?;
            let chain = chains.get(token).map(Vec::as_slice).unwrap_or_default();

            if let Some(existing) = usize::try_from(number).ok().and_then(|n| chain.get(n)) {
                let existing = existing.hash()?;
                if existing == hash {
                    continue;
                }
                warn!(%token, block_number = number, "conflicting block");
                return Ok(IngestResult::Conflict {
                    token: token.clone(),
                    existing: existing.to_string(),
                });
            }

            let expected_prev = match chain.last() {
                Some(head) => head.block_id(token)?,
                None => String::new(),
            };
            let prev = block.previous_block_id(token)?;
            if number != chain.len() as u64 || prev != expected_prev {
                warn!(%token, block_number = number, "block does not extend head");
                return Err(LedgerError::NotNextBlock {
                    token: token.clone(),
                    expected: format!("{} after '{expected_prev}'", chain.len()),
                    got: format!("{number} after '{prev}'"),
                });
            }
            fresh.push(token.clone());
        }

        if fresh.is_empty() {
            return Ok(IngestResult::Duplicate);
        }
        for token in fresh {
            chains.entry(token).or_default().push(block.clone());
        }
        debug!(%hash, tokens = tokens.len(), "ingested block");
        Ok(IngestResult::Accepted { hash })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Query Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Current head block of `token`'s chain.
    pub async fn head(&self, token: &str) -> Option<Block> {
        self.chains.read().await.get(token)?.last().cloned()
    }

    /// Number of blocks in `token`'s chain.
    pub async fn height(&self, token: &str) -> usize {
        self.chains.read().await.get(token).map_or(0, Vec::len)
    }

    pub async fn chain(&self, token: &str) -> Result<Vec<Block>> {
        self.chains
            .read()
            .await
            .get(token)
            .cloned()
            .ok_or_else(|| LedgerError::TokenNotFound(token.to_string()))
    }

    /// All tokens with a chain, sorted.
    pub async fn tokens(&self) -> Vec<String> {
        let mut tokens: Vec<String> = self.chains.read().await.keys().cloned().collect();
        tokens.sort();
        tokens
    }

    /// JSON dump of `token`'s chain with expanded keys.
    pub async fn dump(&self, token: &str) -> Result<String> {
        let chain = self.chain(token).await?;
        Ok(dump_chain(&chain, &self.config.dump)?)
    }
}
