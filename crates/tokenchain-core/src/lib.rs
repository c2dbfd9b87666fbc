//! # Token Chain Core
//!
//! Pure primitives for multi-chain token ledgers: the canonical block
//! codec, hash-linked token chain blocks, smart-contract blocks and RAC
//! asset units.
//!
//! This crate contains no I/O beyond reading legacy chain files, no
//! storage and no networking. Signing is consumed through the traits in
//! [`crypto`].
//!
//! ## Key Types
//!
//! - [`Block`] - One block of one or more token chains
//! - [`TokenChainRecord`] - Semantic input for a new block
//! - [`ContractBlock`] - Smart-contract chain block with share/key signatures
//! - [`RacUnit`] - Self-signed asset unit
//! - [`Value`] / [`Record`] - The untyped record model
//!
//! ## Wire format
//!
//! Every record family is wrapped in the same envelope: canonical content
//! bytes plus separately encoded signature slots. The block hash is the
//! SHA3-256 of the content bytes. See [`canonical`].

pub mod block;
pub mod builder;
pub mod canonical;
pub mod contract;
pub mod crypto;
pub mod dump;
mod envelope;
pub mod error;
pub mod expand;
pub mod keys;
pub mod legacy;
pub mod rac;
pub mod record;
pub mod value;

pub use block::{Block, BlockOptions};
pub use builder::{build_next, next_position};
pub use canonical::{decode_record, encode_record, hash_hex, sha3_256};
pub use contract::{ContractBlock, ContractRecord, ContractType, PledgeMode, TokenInfo, TransInfo};
pub use crypto::{DidSigner, DidVerifier, Ed25519Did, KeyRing, ShareSigner, ShareVerifier};
pub use dump::DumpConfig;
pub use error::{CoreError, Result};
pub use expand::{expand, KeyTable};
pub use legacy::LegacyChain;
pub use rac::{create_series, PartInfo, RacKind, RacSpec, RacUnit};
pub use record::{
    ChainPosition, CreditSignature, GenesisBlock, GenesisTokenInfo, InitiatorSignature,
    PledgeDetail, TokenChainRecord, TransToken,
};
pub use value::{Record, RecordExt, Value};
