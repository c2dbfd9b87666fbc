//! Proptest generators for property-based testing.

use proptest::prelude::*;

use tokenchain_core::keys::trans_type;
use tokenchain_core::{DidSigner, Ed25519Did, Record, TokenChainRecord, TransToken, Value};

/// Generate a deterministic DID from a random seed.
pub fn did() -> impl Strategy<Value = Ed25519Did> {
    any::<[u8; 32]>().prop_map(|seed| Ed25519Did::from_seed(&seed))
}

/// Generate a token id in the content-address style.
pub fn token_id() -> impl Strategy<Value = String> {
    "Qm[a-zA-Z0-9]{12}"
}

/// Generate 1-4 distinct token ids.
pub fn token_ids() -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set(token_id(), 1..=4).prop_map(|s| s.into_iter().collect())
}

/// Generate a numeric record key.
pub fn record_key() -> impl Strategy<Value = String> {
    (1u32..=99).prop_map(|k| k.to_string())
}

/// Generate a scalar value.
pub fn leaf_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        (-1.0e6f64..1.0e6).prop_map(Value::Float),
        "[ -~]{0,24}".prop_map(Value::from),
        prop::collection::vec(any::<u8>(), 0..48).prop_map(Value::Bytes),
    ]
}

/// Generate a value nested up to three levels.
pub fn value() -> impl Strategy<Value = Value> {
    leaf_value().prop_recursive(3, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::List),
            prop::collection::btree_map(record_key(), inner, 0..6).prop_map(Value::Map),
        ]
    })
}

/// Generate a non-empty record with numeric keys.
pub fn record() -> impl Strategy<Value = Record> {
    prop::collection::btree_map(record_key(), value(), 1..10)
}

/// Transaction types a transfer may carry.
pub fn transaction_type() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just(trans_type::TOKEN_TRANSFERRED),
        Just(trans_type::TOKEN_PLEDGED),
        Just(trans_type::TOKEN_UNPLEDGED),
        Just(trans_type::TOKEN_COMMITTED),
        Just(trans_type::TOKEN_BURNT),
    ]
}

/// Parameters for generating a transfer record.
#[derive(Debug, Clone)]
pub struct TransferParams {
    pub owner: Ed25519Did,
    pub transaction_type: &'static str,
    pub tokens: Vec<String>,
    pub comment: String,
    pub token_value: f64,
    pub epoch: i64,
}

impl Arbitrary for TransferParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            did(),
            transaction_type(),
            token_ids(),
            "[a-z ]{0,32}",
            0.0f64..1000.0,
            0i64..=2_000_000_000,
        )
            .prop_map(|(owner, tt, tokens, comment, value, epoch)| TransferParams {
                owner,
                transaction_type: tt,
                tokens,
                comment,
                token_value: value,
                epoch,
            })
            .boxed()
    }
}

/// Build a transfer record from parameters.
pub fn record_from_params(params: &TransferParams) -> TokenChainRecord {
    TokenChainRecord {
        transaction_type: params.transaction_type.to_string(),
        owner: params.owner.did().to_string(),
        comment: params.comment.clone(),
        tokens: params
            .tokens
            .iter()
            .map(|t| TransToken::new(t.clone(), 0))
            .collect(),
        token_value: params.token_value,
        epoch: params.epoch,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tokenchain_core::{build_next, decode_record, encode_record, Block, BlockOptions};

    proptest! {
        #[test]
        fn generated_records_round_trip(r in record()) {
            prop_assert_eq!(decode_record(&encode_record(&r).unwrap()).unwrap(), r);
        }

        #[test]
        fn transfer_blocks_decode(params: TransferParams) {
            let block = build_next(&HashMap::new(), &record_from_params(&params)).unwrap();
            let decoded = Block::from_bytes(
                block.bytes().to_vec(),
                BlockOptions { no_signature: true },
            ).unwrap();
            prop_assert_eq!(decoded.trans_tokens().unwrap(), params.tokens.clone());
            prop_assert_eq!(decoded.hash().unwrap(), block.hash().unwrap());
            for t in &params.tokens {
                prop_assert_eq!(decoded.block_number(t).unwrap(), 0);
            }
        }

        #[test]
        fn same_params_same_hash(params: TransferParams) {
            let a = build_next(&HashMap::new(), &record_from_params(&params)).unwrap();
            let b = build_next(&HashMap::new(), &record_from_params(&params)).unwrap();
            prop_assert_eq!(a.hash().unwrap(), b.hash().unwrap());
        }
    }
}
