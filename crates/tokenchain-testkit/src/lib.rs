//! # Token Chain Testkit
//!
//! Testing utilities for token chains.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Canonical bytes and hashes that every encoder must reproduce
//! - **Generators**: Proptest strategies for records and transfers
//! - **Fixtures**: Deterministic DIDs and sample records
//!
//! ## Golden Vectors
//!
//! ```rust
//! use tokenchain_testkit::vectors::verify_all_vectors;
//!
//! verify_all_vectors().unwrap();
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use tokenchain_testkit::generators::{TransferParams, record_from_params};
//!
//! proptest! {
//!     #[test]
//!     fn hash_is_deterministic(params: TransferParams) {
//!         let a = record_from_params(&params);
//!         let b = record_from_params(&params);
//!         prop_assert_eq!(a, b);
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use std::collections::HashMap;
//! use tokenchain_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::with_seed([7; 32]);
//! let block = fixture.signed_block(&HashMap::new(), &fixture.transfer(&["T1"])).unwrap();
//! assert_eq!(block.block_number("T1").unwrap(), 0);
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{multi_party_fixtures, shared_ring, TestFixture};
