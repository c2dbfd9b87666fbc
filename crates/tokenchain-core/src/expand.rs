//! Human-readable key expansion for decoded records.
//!
//! Wire keys are short numbers that are reused at different depths, so a
//! name is looked up by `(path, key)` where `path` joins the numeric
//! ancestor keys with `-` (`"2-2"` is genesis info). Non-numeric keys such
//! as token ids and DIDs do not extend the path. Keys without a name are
//! kept as they are.
//!
//! Expansion is for display only and never feeds back into hashing.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::keys::{
    contract, contract_trans, genesis, genesis_info, part_info, pledge, rac, token, token_info,
    trans_token,
};
use crate::value::{Record, Value};

/// A `(path, key) → name` table for one record family.
#[derive(Debug, Default)]
pub struct KeyTable {
    names: HashMap<(String, String), &'static str>,
}

impl KeyTable {
    fn with(entries: &[(&str, &[(&str, &'static str)])]) -> Self {
        let mut names = HashMap::new();
        for (path, keys) in entries {
            for (key, name) in *keys {
                names.insert((path.to_string(), key.to_string()), *name);
            }
        }
        Self { names }
    }

    /// Name for `key` at `path`, if any.
    pub fn name(&self, path: &str, key: &str) -> Option<&'static str> {
        self.names.get(&(path.to_string(), key.to_string())).copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names for token chain blocks.
    pub fn token_chain() -> &'static KeyTable {
        static TABLE: OnceLock<KeyTable> = OnceLock::new();
        TABLE.get_or_init(|| {
            let trans = [
                (trans_token::TOKEN_TYPE, "tokenType"),
                (trans_token::UNPLEDGED_ID, "unpledgedId"),
                (trans_token::COMMITTED_DID, "committedDid"),
            ];
            let committed_path = format!(
                "{}-{}-{}",
                token::GENESIS_BLOCK,
                genesis::INFO,
                genesis_info::COMMITTED_TOKENS
            );
            let info_path = format!("{}-{}", token::GENESIS_BLOCK, genesis::INFO);
            KeyTable::with(&[
                (
                    "",
                    &[
                        (token::TRANS_TYPE, "transactionType"),
                        (token::GENESIS_BLOCK, "genesisBlock"),
                        (token::TRANS_TOKENS, "transTokens"),
                        (token::SMART_CONTRACT, "smartContract"),
                        (token::SUB_CHAIN_DETAIL, "subChainDetail"),
                        (token::OWNER, "owner"),
                        (token::SENDER_DID, "senderDid"),
                        (token::RECEIVER_DID, "receiverDid"),
                        (token::COMMENT, "comment"),
                        (token::TID, "tid"),
                        (token::WHOLE_TOKENS, "wholeTokens"),
                        (token::WHOLE_TOKENS_ID, "wholeTokensId"),
                        (token::PART_TOKENS, "partTokens"),
                        (token::PART_TOKENS_ID, "partTokensId"),
                        (token::QUORUM_SIGNATURE, "quorumSignature"),
                        (token::PLEDGE_TOKEN, "pledgeToken"),
                        (token::TOKENS_PLEDGED_FOR, "tokensPledgedFor"),
                        (token::TOKENS_PLEDGED_WITH, "tokensPledgedWith"),
                        (token::TOKENS_PLEDGE_MAP, "tokensPledgeMap"),
                        (token::PREVIOUS_BLOCK_ID, "previousBlockId"),
                        (token::BLOCK_NUMBER, "blockNumber"),
                        (token::SMART_CONTRACT_DATA, "smartContractData"),
                        (token::TOKEN_VALUE, "tokenValue"),
                        (token::CHILD_TOKENS, "childTokens"),
                        (token::INITIATOR_SIGNATURE, "initiatorSignature"),
                        (token::NFT_DATA, "nftData"),
                        (token::EPOCH, "epoch"),
                        (token::PLEDGE_DETAILS, "pledgeDetails"),
                        (token::REF_ID, "refId"),
                        (token::DEPLOYER_DID, "deployerDid"),
                        (token::EXECUTOR_DID, "executorDid"),
                        (token::BLOCK_HASH, "blockHash"),
                        (token::SIGNATURE, "signature"),
                    ],
                ),
                (
                    token::GENESIS_BLOCK,
                    &[(genesis::TYPE, "genesisType"), (genesis::INFO, "genesisInfo")],
                ),
                (
                    &info_path,
                    &[
                        (genesis_info::TOKEN_LEVEL, "tokenLevel"),
                        (genesis_info::TOKEN_NUMBER, "tokenNumber"),
                        (genesis_info::MIGRATED_BLOCK_ID, "migratedBlockId"),
                        (genesis_info::PREVIOUS_ID, "previousId"),
                        (genesis_info::PARENT_ID, "parentId"),
                        (genesis_info::GRAND_PARENT_ID, "grandParentId"),
                        (genesis_info::COMMITTED_TOKENS, "committedTokens"),
                        (genesis_info::SMART_CONTRACT_VALUE, "smartContractValue"),
                    ],
                ),
                (&committed_path, &trans),
                (token::TRANS_TOKENS, &trans),
                (
                    token::PLEDGE_DETAILS,
                    &[
                        (pledge::TOKEN, "token"),
                        (pledge::TOKEN_TYPE, "tokenType"),
                        (pledge::TOKEN_BLOCK_ID, "tokenBlockId"),
                    ],
                ),
            ])
        })
    }

    /// Names for smart-contract blocks.
    pub fn contract() -> &'static KeyTable {
        static TABLE: OnceLock<KeyTable> = OnceLock::new();
        TABLE.get_or_init(|| {
            let info = [
                (token_info::TOKEN_TYPE, "tokenType"),
                (token_info::OWNER_DID, "ownerDid"),
                (token_info::BLOCK_ID, "blockId"),
                (token_info::TOKEN_VALUE, "tokenValue"),
            ];
            let at = |k: &str| format!("{}-{}", contract::TRANS_INFO, k);
            let (trans_path, exchange_path, batch_path, committed_path) = (
                at(contract_trans::TRANS_TOKENS),
                at(contract_trans::EXCHANGE_TOKENS),
                at(contract_trans::BATCH_TRANS_TOKENS),
                at(contract_trans::COMMITTED_TOKENS),
            );
            KeyTable::with(&[
                (
                    "",
                    &[
                        (contract::TYPE, "contractType"),
                        (contract::PLEDGE_MODE, "pledgeMode"),
                        (contract::TRANS_INFO, "transInfo"),
                        (contract::TOTAL_VALUE, "totalValue"),
                        (contract::KEY_SIGNATURE, "keySignature"),
                        (contract::BLOCK_HASH, "blockHash"),
                        (contract::SHARE_SIGNATURE, "shareSignature"),
                    ],
                ),
                (
                    contract::TRANS_INFO,
                    &[
                        (contract_trans::SENDER_DID, "senderDid"),
                        (contract_trans::RECEIVER_DID, "receiverDid"),
                        (contract_trans::COMMENT, "comment"),
                        (contract_trans::TRANS_TOKENS, "transTokens"),
                        (contract_trans::EXCHANGE_TOKENS, "exchangeTokens"),
                        (contract_trans::BATCH_TRANS_TOKENS, "batchTransTokens"),
                        (contract_trans::WHOLE_TOKENS, "wholeTokens"),
                        (contract_trans::PART_TOKENS, "partTokens"),
                        (contract_trans::COMMITTED_TOKENS, "committedTokens"),
                        (contract_trans::DEPLOYER_DID, "deployerDid"),
                        (contract_trans::EXECUTOR_DID, "executorDid"),
                        (contract_trans::SMART_CONTRACT_DATA, "smartContractData"),
                    ],
                ),
                (&trans_path, &info),
                (&exchange_path, &info),
                (&batch_path, &info),
                (&committed_path, &info),
            ])
        })
    }

    /// Names for RAC units.
    pub fn rac() -> &'static KeyTable {
        static TABLE: OnceLock<KeyTable> = OnceLock::new();
        TABLE.get_or_init(|| {
            KeyTable::with(&[
                (
                    "",
                    &[
                        (rac::TYPE, "type"),
                        (rac::CREATOR_DID, "creatorDid"),
                        (rac::TOTAL_SUPPLY, "totalSupply"),
                        (rac::TOKEN_COUNT, "tokenCount"),
                        (rac::CREATOR_INPUT, "creatorInput"),
                        (rac::CONTENT_HASH, "contentHash"),
                        (rac::CONTENT_URL, "url"),
                        (rac::VERSION, "version"),
                        (rac::PART_INFO, "partInfo"),
                        (rac::BLOCK_HASH, "hash"),
                        (rac::SIGNATURE, "pvtKeySign"),
                    ],
                ),
                (
                    rac::PART_INFO,
                    &[
                        (part_info::PARENT_TOKEN, "parentToken"),
                        (part_info::PART_VALUE, "value"),
                    ],
                ),
            ])
        })
    }
}

fn is_numeric(key: &str) -> bool {
    !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit())
}

fn child_path(path: &str, key: &str) -> String {
    if !is_numeric(key) {
        path.to_string()
    } else if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}-{key}")
    }
}

/// Rewrite every key of `record` (recursively) to its symbolic name.
pub fn expand(record: &Record, table: &KeyTable) -> Record {
    expand_map("", record, table)
}

fn expand_map(path: &str, m: &Record, table: &KeyTable) -> Record {
    m.iter()
        .map(|(k, v)| {
            let name = table.name(path, k).map(str::to_string).unwrap_or_else(|| k.clone());
            (name, expand_value(&child_path(path, k), v, table))
        })
        .collect()
}

fn expand_value(path: &str, v: &Value, table: &KeyTable) -> Value {
    match v {
        Value::Map(m) => Value::Map(expand_map(path, m, table)),
        Value::List(items) => {
            Value::List(items.iter().map(|i| expand_value(path, i, table)).collect())
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, Value)]) -> Value {
        Value::Map(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn test_reused_keys_resolve_by_depth() {
        let info = map(&[("1", Value::from(1i64)), ("2", Value::from(7i64))]);
        let genesis = map(&[
            ("1", Value::from("0")),
            ("2", map(&[("T1", info)])),
        ]);
        let mut r = Record::new();
        r.insert("1".into(), Value::from("02"));
        r.insert("2".into(), genesis);
        r.insert("77".into(), Value::from("kept"));

        let out = expand(&r, KeyTable::token_chain());
        assert_eq!(out["transactionType"], Value::from("02"));
        assert_eq!(out["77"], Value::from("kept"));
        let g = out["genesisBlock"].as_map().unwrap();
        assert_eq!(g["genesisType"], Value::from("0"));
        let t1 = g["genesisInfo"].as_map().unwrap()["T1"].as_map().unwrap();
        assert_eq!(t1["tokenLevel"], Value::from(1i64));
        assert_eq!(t1["tokenNumber"], Value::from(7i64));
    }

    #[test]
    fn test_lists_are_walked() {
        let entry = map(&[("1", Value::from("P1")), ("3", Value::from("2-ab"))]);
        let mut r = Record::new();
        r.insert(
            "28".into(),
            map(&[("did1", Value::List(vec![entry]))]),
        );
        let out = expand(&r, KeyTable::token_chain());
        let list = out["pledgeDetails"].as_map().unwrap()["did1"].as_list().unwrap();
        let e = list[0].as_map().unwrap();
        assert_eq!(e["token"], Value::from("P1"));
        assert_eq!(e["tokenBlockId"], Value::from("2-ab"));
    }

    #[test]
    fn test_contract_token_info() {
        let tokens = map(&[("T1", map(&[("2", Value::from("didA"))]))]);
        let mut r = Record::new();
        r.insert("3".into(), map(&[("4", tokens)]));
        let out = expand(&r, KeyTable::contract());
        let ti = out["transInfo"].as_map().unwrap();
        let t1 = ti["transTokens"].as_map().unwrap()["T1"].as_map().unwrap();
        assert_eq!(t1["ownerDid"], Value::from("didA"));
    }

    #[test]
    fn test_tables_are_shared() {
        assert!(std::ptr::eq(KeyTable::rac(), KeyTable::rac()));
        assert!(!KeyTable::token_chain().is_empty());
    }
}
