//! Property tests for the codec and block engine.

use std::collections::HashMap;

use proptest::prelude::*;

use tokenchain_core::keys::token;
use tokenchain_core::{
    build_next, decode_record, encode_record, Block, BlockOptions, Record, TokenChainRecord,
    TransToken, Value,
};

fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        any::<u64>().prop_map(Value::from),
        (-1.0e9f64..1.0e9).prop_map(Value::Float),
        "[a-zA-Z0-9 ]{0,16}".prop_map(Value::from),
        prop::collection::vec(any::<u8>(), 0..32).prop_map(Value::Bytes),
    ]
}

fn value() -> impl Strategy<Value = Value> {
    leaf().prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::List),
            prop::collection::btree_map("[0-9]{1,3}", inner, 0..6).prop_map(Value::Map),
        ]
    })
}

fn record() -> impl Strategy<Value = Record> {
    prop::collection::btree_map("[1-9][0-9]?", value(), 1..8)
}

fn token_ids() -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set("Qm[a-f0-9]{8}", 1..4).prop_map(|s| s.into_iter().collect())
}

proptest! {
    #[test]
    fn codec_round_trips(r in record()) {
        let bytes = encode_record(&r).unwrap();
        prop_assert_eq!(decode_record(&bytes).unwrap(), r);
    }

    #[test]
    fn encoding_ignores_insertion_order(r in record()) {
        let mut reversed = Record::new();
        for (k, v) in r.iter().rev() {
            reversed.insert(k.clone(), v.clone());
        }
        prop_assert_eq!(encode_record(&r).unwrap(), encode_record(&reversed).unwrap());
    }

    #[test]
    fn hash_excludes_hash_and_signature(r in record(), sig in "[a-f0-9]{8}") {
        let mut plain = r.clone();
        plain.remove(token::BLOCK_HASH);
        plain.remove(token::SIGNATURE);
        prop_assume!(!plain.is_empty());

        let a = Block::from_record(plain.clone()).unwrap();
        let mut decorated = plain;
        decorated.insert(token::BLOCK_HASH.into(), Value::from("stale"));
        let mut sigs = Record::new();
        sigs.insert("didX".into(), Value::from(sig));
        decorated.insert(token::SIGNATURE.into(), Value::Map(sigs));
        let b = Block::from_record(decorated).unwrap();

        prop_assert_eq!(a.hash().unwrap(), b.hash().unwrap());
    }

    #[test]
    fn block_round_trips(r in record()) {
        let mut r = r;
        r.remove(token::BLOCK_HASH);
        r.remove(token::SIGNATURE);
        prop_assume!(!r.is_empty());

        let block = Block::from_record(r).unwrap();
        let decoded = Block::from_bytes(
            block.bytes().to_vec(),
            BlockOptions { no_signature: true },
        ).unwrap();
        prop_assert_eq!(decoded.record(), block.record());
    }

    #[test]
    fn every_token_advances_by_one(tokens in token_ids(), rounds in 1usize..4) {
        let rec = TokenChainRecord {
            transaction_type: "02".into(),
            owner: "didA".into(),
            tokens: tokens.iter().map(|t| TransToken::new(t.clone(), 0)).collect(),
            ..Default::default()
        };
        let mut heads: HashMap<String, Block> = HashMap::new();
        for round in 0..rounds {
            let block = build_next(&heads, &rec).unwrap();
            for t in &tokens {
                prop_assert_eq!(block.block_number(t).unwrap(), round as u64);
                let prev = block.previous_block_id(t).unwrap();
                match heads.get(t) {
                    Some(head) => prop_assert_eq!(prev, head.block_id(t).unwrap()),
                    None => prop_assert_eq!(prev, ""),
                }
            }
            for t in &tokens {
                heads.insert(t.clone(), block.clone());
            }
        }
    }
}
