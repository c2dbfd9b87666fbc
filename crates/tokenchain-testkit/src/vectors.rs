//! Golden test vectors for deterministic verification.
//!
//! These vectors pin the canonical encoding and the content hash. Any
//! encoder that disagrees on a single byte produces different block ids
//! and cannot share chains.

use std::collections::HashMap;

use tokenchain_core::keys::trans_type;
use tokenchain_core::{
    build_next, encode_record, hash_hex, LegacyChain, Record, TokenChainRecord, TransToken, Value,
};

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Builds the record under test.
    pub record: fn() -> Record,
    /// Expected canonical content bytes (hex).
    pub expected_bytes: &'static str,
    /// Expected block hash (hex SHA3-256 of the content bytes).
    pub expected_hash: &'static str,
}

/// SHA3-256 of the empty input.
pub const EMPTY_SHA3: &str = "a7ffc6f8bf1ed76651c14756a061d662f580ff4de43b49fa82d80a4b80f8434a";

fn rec(entries: Vec<(&str, Value)>) -> Record {
    entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

fn token_map(token: &str, v: Value) -> Value {
    Value::Map(rec(vec![(token, v)]))
}

/// The first block of token "T1": a plain transfer with no prior head.
pub fn genesis_transfer() -> TokenChainRecord {
    TokenChainRecord {
        transaction_type: trans_type::TOKEN_TRANSFERRED.into(),
        owner: "didA".into(),
        comment: "test".into(),
        tokens: vec![TransToken::new("T1", 0)],
        ..Default::default()
    }
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "empty record",
            record: Record::new,
            expected_bytes: "a0",
            expected_hash: "2aa6a21781ffb452966498ae5ad467cb2fad3b93144a6294237bc034cda48a23",
        },
        GoldenVector {
            name: "single transaction type",
            record: || rec(vec![("1", Value::from("02"))]),
            expected_bytes: "a16131623032",
            expected_hash: "fcfe5985df76bc260e3fbe951c18f2f9129fb5a167a0f07c889a3f6f69486383",
        },
        GoldenVector {
            name: "shorter keys sort first",
            record: || {
                rec(vec![
                    ("10", Value::from(1i64)),
                    ("9", Value::from(2i64)),
                    ("1", Value::from("x")),
                ])
            },
            expected_bytes: "a36131617861390262313001",
            expected_hash: "04b1d08993f1a935ebaf2c6ac50077a1f72eca760c2b9d0bb492b84eb303b64a",
        },
        GoldenVector {
            name: "negative and wide integers",
            record: || {
                rec(vec![
                    ("1", Value::from(-1i64)),
                    ("2", Value::from(1000i64)),
                    ("3", Value::from(-500i64)),
                    ("4", Value::from(4_294_967_296i64)),
                ])
            },
            expected_bytes: "a461312061321903e861333901f361341b0000000100000000",
            expected_hash: "eca1d639a04ecdd5ddc98475103169c00132f019e26b4f5b43e9c1742a76579a",
        },
        GoldenVector {
            name: "first transfer of T1",
            record: || {
                rec(vec![
                    ("1", Value::from("02")),
                    ("6", Value::from("didA")),
                    ("9", Value::from("test")),
                    ("3", token_map("T1", token_map("1", Value::from(0i64)))),
                    ("21", token_map("T1", Value::from("0"))),
                    ("20", token_map("T1", Value::from(""))),
                    ("24", Value::List(Vec::new())),
                ])
            },
            expected_bytes: "a761316230326133a1625431a16131006136646469644161396474657374\
                             623230a162543160623231a1625431613062323480",
            expected_hash: "787a82c4e9a588e05273bf8d0ddb181462270722ddab520eb0f4af3054d60635",
        },
    ]
}

/// Legacy chain JSON with its expected chain hash.
pub const LEGACY_CHAIN: (&str, &str) = (
    r#"[{"owner":"didA","hash":"h0","comment":"c"},{"owner":"didB","hash":"h1","pvtShareBits":"x"}]"#,
    "e7de939904d7ac0575f79e8256a084df023830b804364dd9619f049777ce6057",
);

/// Check every vector. Returns the name and actual hash of the first mismatch.
pub fn verify_all_vectors() -> Result<(), (String, String)> {
    for v in all_vectors() {
        let bytes = encode_record(&(v.record)()).map_err(|e| (v.name.to_string(), e.to_string()))?;
        let hash = hash_hex(&bytes);
        if hex::encode(&bytes) != v.expected_bytes || hash != v.expected_hash {
            return Err((v.name.to_string(), hash));
        }
    }

    let block = build_next(&HashMap::new(), &genesis_transfer())
        .map_err(|e| ("genesis transfer".to_string(), e.to_string()))?;
    let expected = format!("0-{}", all_vectors()[4].expected_hash);
    match block.block_id("T1") {
        Ok(id) if id == expected => {}
        Ok(id) => return Err(("genesis transfer".to_string(), id)),
        Err(e) => return Err(("genesis transfer".to_string(), e.to_string())),
    }

    let (json, expected) = LEGACY_CHAIN;
    let hash = LegacyChain::from_json_str(json)
        .and_then(|c| c.chain_hash())
        .map_err(|e| ("legacy chain".to_string(), e.to_string()))?;
    if hash != expected {
        return Err(("legacy chain".to_string(), hash));
    }
    Ok(())
}
