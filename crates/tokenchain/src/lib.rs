//! # Token Chain
//!
//! In-memory multi-chain token ledger built on [`tokenchain_core`].
//!
//! ## Overview
//!
//! Every token owns a hash-linked chain of blocks. A single block may
//! advance several token chains at once, carrying a block number and a
//! previous block id for each. The [`Ledger`] holds the chain heads and
//! serialises appends so that two builders never race from the same head.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokenchain::{Ledger, LedgerConfig};
//! use tokenchain::core::{Ed25519Did, KeyRing, TokenChainRecord, TransToken};
//!
//! async fn example() {
//!     let me = Ed25519Did::generate();
//!     let ring: KeyRing = [me.clone()].into_iter().collect();
//!
//!     let ledger = Ledger::new(LedgerConfig::default(), Arc::new(ring))
//!         .with_signer(Arc::new(me));
//!
//!     let record = TokenChainRecord {
//!         transaction_type: "02".into(),
//!         owner: "did:owner".into(),
//!         tokens: vec![TransToken::new("QmToken", 0)],
//!         ..Default::default()
//!     };
//!     let block = ledger.append(&record).await.unwrap();
//!     println!("{}", block.block_id("QmToken").unwrap());
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `tokenchain::core` - Codec, block engine and record types

pub mod config;
pub mod error;
pub mod ledger;

pub use tokenchain_core as core;

pub use config::LedgerConfig;
pub use error::{LedgerError, Result};
pub use ledger::{IngestResult, Ledger};

pub use tokenchain_core::{
    Block, BlockOptions, ContractBlock, CoreError, DidSigner, DidVerifier, DumpConfig, RacUnit,
    Record, TokenChainRecord, TransToken, Value,
};
