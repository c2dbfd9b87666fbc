//! Semantic views of token chain block content.
//!
//! [`TokenChainRecord`] is what transaction logic fills in; it is lowered
//! to a wire [`Record`] by [`TokenChainRecord::to_record`] once the chain
//! position of every participating token is known (see
//! [`crate::builder`]).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::keys::{credit, genesis, genesis_info, pledge, token, trans_token};
use crate::value::{Record, RecordExt, Value};

/// Token values are stored rounded to this many decimal places.
pub const TOKEN_VALUE_PRECISION: u32 = 3;

/// Round half away from zero to `places` decimal places.
pub fn round_to_precision(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

/// Position of a token's next block within its own chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainPosition {
    pub block_number: u64,
    /// `"{n}-{hash}"` of the previous block, empty for genesis.
    pub previous_block_id: String,
}

impl ChainPosition {
    /// Position of the first block of a token that has no chain yet.
    pub fn genesis() -> Self {
        Self {
            block_number: 0,
            previous_block_id: String::new(),
        }
    }

    pub fn is_genesis(&self) -> bool {
        self.block_number == 0 && self.previous_block_id.is_empty()
    }
}

/// A token taking part in a transaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransToken {
    pub token: String,
    pub token_type: i64,
    pub unpledged_id: String,
    pub committed_did: String,
}

impl TransToken {
    pub fn new(token: impl Into<String>, token_type: i64) -> Self {
        Self {
            token: token.into(),
            token_type,
            ..Default::default()
        }
    }

    fn to_value(&self) -> Result<Value> {
        if self.token.is_empty() {
            return Err(CoreError::InvalidInput("transaction token without id".into()));
        }
        let mut m = Record::new();
        m.insert(trans_token::TOKEN_TYPE.into(), Value::from(self.token_type));
        if !self.unpledged_id.is_empty() {
            m.insert(trans_token::UNPLEDGED_ID.into(), Value::from(&self.unpledged_id));
        }
        if !self.committed_did.is_empty() {
            m.insert(trans_token::COMMITTED_DID.into(), Value::from(&self.committed_did));
        }
        Ok(Value::Map(m))
    }
}

/// A quorum member's credit signature.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreditSignature {
    pub signature: String,
    #[serde(rename = "priv_signature")]
    pub priv_signature: String,
    pub did: String,
    pub hash: String,
    /// "0" for PKI signatures, "1" for NLSS share signatures.
    #[serde(rename = "sign_type")]
    pub sign_type: String,
}

impl CreditSignature {
    pub(crate) fn to_value(&self) -> Value {
        let mut m = Record::new();
        m.insert(credit::SIGNATURE.into(), Value::from(&self.signature));
        m.insert(credit::PRIV_SIGNATURE.into(), Value::from(&self.priv_signature));
        m.insert(credit::DID.into(), Value::from(&self.did));
        m.insert(credit::HASH.into(), Value::from(&self.hash));
        m.insert(credit::SIGN_TYPE.into(), Value::from(&self.sign_type));
        Value::Map(m)
    }

    /// Parse one quorum signature entry.
    ///
    /// Older chains store each entry as a JSON string instead of a map.
    pub(crate) fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Text(json) => {
                let mut sig: CreditSignature = serde_json::from_str(json)
                    .map_err(|e| CoreError::DecodingError(format!("quorum signature: {e}")))?;
                if sig.sign_type.is_empty() {
                    sig.sign_type = "0".into();
                }
                Ok(sig)
            }
            Value::Map(m) => Ok(Self {
                signature: m.text_or_empty(credit::SIGNATURE)?,
                priv_signature: m.text_or_empty(credit::PRIV_SIGNATURE)?,
                did: m.text_or_empty(credit::DID)?,
                hash: m.text_or_empty(credit::HASH)?,
                sign_type: match m.get(credit::SIGN_TYPE) {
                    Some(Value::Integer(i)) => i.to_string(),
                    _ => m.text_or_empty(credit::SIGN_TYPE)?,
                },
            }),
            other => Err(CoreError::invalid_type(
                format!("quorum signature ({})", other.kind()),
                "map or JSON text",
            )),
        }
    }
}

/// The transaction initiator's signature.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitiatorSignature {
    pub nlss_share: String,
    pub private_sign: String,
    pub did: String,
    pub hash: String,
    pub sign_type: i64,
}

impl InitiatorSignature {
    pub(crate) fn to_value(&self) -> Value {
        let mut m = Record::new();
        m.insert(credit::NLSS_SHARE.into(), Value::from(&self.nlss_share));
        m.insert(credit::PRIV_SIGNATURE.into(), Value::from(&self.private_sign));
        m.insert(credit::INITIATOR_DID.into(), Value::from(&self.did));
        m.insert(credit::HASH.into(), Value::from(&self.hash));
        m.insert(credit::SIGN_TYPE.into(), Value::from(self.sign_type));
        Value::Map(m)
    }

    pub(crate) fn from_record(m: &Record) -> Result<Self> {
        Ok(Self {
            nlss_share: m.text_or_empty(credit::NLSS_SHARE)?,
            private_sign: m.text_or_empty(credit::PRIV_SIGNATURE)?,
            did: m.text_or_empty(credit::INITIATOR_DID)?,
            hash: m.text_or_empty(credit::HASH)?,
            sign_type: m.int(credit::SIGN_TYPE)?.unwrap_or_default(),
        })
    }
}

/// A token pledged by a quorum member for this transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PledgeDetail {
    pub did: String,
    pub token: String,
    pub token_type: i64,
    pub token_block_id: String,
}

/// Per-token genesis information.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenesisTokenInfo {
    pub token: String,
    pub token_level: i64,
    pub token_number: i64,
    pub migrated_block_id: String,
    pub previous_id: String,
    pub parent_id: String,
    pub grand_parent_ids: Vec<String>,
    pub committed_tokens: Vec<TransToken>,
    pub smart_contract_value: f64,
}

impl GenesisTokenInfo {
    fn to_value(&self) -> Result<Value> {
        let mut m = Record::new();
        m.insert(genesis_info::TOKEN_LEVEL.into(), Value::from(self.token_level));
        m.insert(genesis_info::TOKEN_NUMBER.into(), Value::from(self.token_number));
        if !self.migrated_block_id.is_empty() {
            m.insert(
                genesis_info::MIGRATED_BLOCK_ID.into(),
                Value::from(&self.migrated_block_id),
            );
        }
        if !self.previous_id.is_empty() {
            m.insert(genesis_info::PREVIOUS_ID.into(), Value::from(&self.previous_id));
        }
        if !self.parent_id.is_empty() {
            m.insert(genesis_info::PARENT_ID.into(), Value::from(&self.parent_id));
        }
        if !self.grand_parent_ids.is_empty() {
            m.insert(
                genesis_info::GRAND_PARENT_ID.into(),
                Value::text_list(&self.grand_parent_ids),
            );
        }
        let mut committed = Record::new();
        for t in &self.committed_tokens {
            committed.insert(t.token.clone(), t.to_value()?);
        }
        m.insert(genesis_info::COMMITTED_TOKENS.into(), Value::Map(committed));
        if self.smart_contract_value != 0.0 {
            m.insert(
                genesis_info::SMART_CONTRACT_VALUE.into(),
                Value::from(self.smart_contract_value),
            );
        }
        Ok(Value::Map(m))
    }
}

/// Genesis block carried by the first block of newly created tokens.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenesisBlock {
    pub genesis_type: String,
    pub info: Vec<GenesisTokenInfo>,
}

impl GenesisBlock {
    fn to_value(&self) -> Result<Value> {
        if self.info.is_empty() {
            return Err(CoreError::InvalidInput("genesis block without token info".into()));
        }
        let mut infos = Record::new();
        for gi in &self.info {
            if gi.token.is_empty() {
                return Err(CoreError::InvalidInput("genesis info without token id".into()));
            }
            infos.insert(gi.token.clone(), gi.to_value()?);
        }
        let mut m = Record::new();
        m.insert(genesis::TYPE.into(), Value::from(&self.genesis_type));
        m.insert(genesis::INFO.into(), Value::Map(infos));
        Ok(Value::Map(m))
    }
}

/// Everything transaction logic supplies for a new token chain block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenChainRecord {
    pub transaction_type: String,
    pub owner: String,
    pub sender_did: String,
    pub receiver_did: String,
    pub deployer_did: String,
    pub executor_did: String,
    pub comment: String,
    pub tid: String,
    pub ref_id: String,
    /// Tokens whose chains this block advances.
    pub tokens: Vec<TransToken>,
    pub whole_tokens: Vec<String>,
    pub whole_tokens_id: Vec<String>,
    pub part_tokens: Vec<String>,
    pub part_tokens_id: Vec<String>,
    pub quorum_signatures: Vec<CreditSignature>,
    pub pledge_token: String,
    pub tokens_pledged_for: Vec<String>,
    pub tokens_pledged_with: Vec<String>,
    pub tokens_pledge_map: BTreeMap<String, Vec<String>>,
    pub pledge_details: Vec<PledgeDetail>,
    pub genesis: Option<GenesisBlock>,
    pub sub_chain_detail: Option<Vec<u8>>,
    pub smart_contract: Option<Vec<u8>>,
    pub smart_contract_data: String,
    pub nft_data: String,
    pub token_value: f64,
    pub child_tokens: Vec<String>,
    pub initiator_signature: Option<InitiatorSignature>,
    pub epoch: i64,
}

fn put_text(m: &mut Record, key: &str, value: &str) {
    if !value.is_empty() {
        m.insert(key.to_string(), Value::from(value));
    }
}

fn put_list(m: &mut Record, key: &str, values: &[String]) {
    if !values.is_empty() {
        m.insert(key.to_string(), Value::text_list(values));
    }
}

impl TokenChainRecord {
    /// Lower to a wire record.
    ///
    /// `positions` must hold the chain position of every token in
    /// [`TokenChainRecord::tokens`].
    pub fn to_record(&self, positions: &BTreeMap<String, ChainPosition>) -> Result<Record> {
        if self.tokens.is_empty() {
            return Err(CoreError::InvalidInput("transaction has no tokens".into()));
        }

        let mut m = Record::new();
        m.insert(token::TRANS_TYPE.into(), Value::from(&self.transaction_type));
        m.insert(token::OWNER.into(), Value::from(&self.owner));
        put_text(&mut m, token::SENDER_DID, &self.sender_did);
        put_text(&mut m, token::RECEIVER_DID, &self.receiver_did);
        put_text(&mut m, token::DEPLOYER_DID, &self.deployer_did);
        put_text(&mut m, token::EXECUTOR_DID, &self.executor_did);
        put_text(&mut m, token::COMMENT, &self.comment);
        put_text(&mut m, token::TID, &self.tid);
        put_text(&mut m, token::REF_ID, &self.ref_id);

        if let Some(g) = &self.genesis {
            m.insert(token::GENESIS_BLOCK.into(), g.to_value()?);
        }

        let mut details = Record::new();
        let mut numbers = Record::new();
        let mut previous = Record::new();
        for tt in &self.tokens {
            let pos = positions.get(&tt.token).ok_or_else(|| {
                CoreError::InvalidInput(format!("no chain position for token {}", tt.token))
            })?;
            details.insert(tt.token.clone(), tt.to_value()?);
            numbers.insert(tt.token.clone(), Value::from(pos.block_number.to_string()));
            previous.insert(tt.token.clone(), Value::from(&pos.previous_block_id));
        }
        m.insert(token::TRANS_TOKENS.into(), Value::Map(details));
        m.insert(token::BLOCK_NUMBER.into(), Value::Map(numbers));
        m.insert(token::PREVIOUS_BLOCK_ID.into(), Value::Map(previous));

        put_list(&mut m, token::WHOLE_TOKENS, &self.whole_tokens);
        put_list(&mut m, token::WHOLE_TOKENS_ID, &self.whole_tokens_id);
        put_list(&mut m, token::PART_TOKENS, &self.part_tokens);
        put_list(&mut m, token::PART_TOKENS_ID, &self.part_tokens_id);

        if !self.quorum_signatures.is_empty() {
            m.insert(
                token::QUORUM_SIGNATURE.into(),
                Value::List(self.quorum_signatures.iter().map(CreditSignature::to_value).collect()),
            );
        }

        put_text(&mut m, token::PLEDGE_TOKEN, &self.pledge_token);
        put_list(&mut m, token::TOKENS_PLEDGED_FOR, &self.tokens_pledged_for);
        put_list(&mut m, token::TOKENS_PLEDGED_WITH, &self.tokens_pledged_with);
        if !self.tokens_pledge_map.is_empty() {
            let pm = self
                .tokens_pledge_map
                .iter()
                .map(|(k, v)| (k.clone(), Value::text_list(v)))
                .collect();
            m.insert(token::TOKENS_PLEDGE_MAP.into(), Value::Map(pm));
        }
        if let Some(pd) = pledge_details_value(&self.pledge_details) {
            m.insert(token::PLEDGE_DETAILS.into(), pd);
        }

        if let Some(sc) = &self.smart_contract {
            m.insert(token::SMART_CONTRACT.into(), Value::Bytes(sc.clone()));
        }
        if let Some(sub) = &self.sub_chain_detail {
            m.insert(token::SUB_CHAIN_DETAIL.into(), Value::Bytes(sub.clone()));
        }
        put_text(&mut m, token::SMART_CONTRACT_DATA, &self.smart_contract_data);
        put_text(&mut m, token::NFT_DATA, &self.nft_data);
        if let Some(is) = &self.initiator_signature {
            m.insert(token::INITIATOR_SIGNATURE.into(), is.to_value());
        }

        let value = round_to_precision(self.token_value, TOKEN_VALUE_PRECISION);
        if value > 0.0 {
            m.insert(token::TOKEN_VALUE.into(), Value::from(value));
        }
        m.insert(token::CHILD_TOKENS.into(), Value::text_list(&self.child_tokens));
        if self.epoch != 0 {
            m.insert(token::EPOCH.into(), Value::from(self.epoch));
        }
        Ok(m)
    }
}

/// Group pledge details by pledging DID.
fn pledge_details_value(details: &[PledgeDetail]) -> Option<Value> {
    if details.is_empty() {
        return None;
    }
    let mut by_did: BTreeMap<String, Vec<Value>> = BTreeMap::new();
    for pd in details {
        let mut e = Record::new();
        e.insert(pledge::TOKEN.into(), Value::from(&pd.token));
        e.insert(pledge::TOKEN_TYPE.into(), Value::from(pd.token_type));
        e.insert(pledge::TOKEN_BLOCK_ID.into(), Value::from(&pd.token_block_id));
        by_did.entry(pd.did.clone()).or_default().push(Value::Map(e));
    }
    Some(Value::Map(
        by_did.into_iter().map(|(k, v)| (k, Value::List(v))).collect(),
    ))
}

/// Inverse of [`pledge_details_value`].
pub(crate) fn pledge_details_from_record(m: &Record) -> Result<Vec<PledgeDetail>> {
    let mut out = Vec::new();
    for (did, entries) in m {
        let entries = entries
            .as_list()
            .ok_or_else(|| CoreError::invalid_type(format!("pledge details of {did}"), "list"))?;
        for e in entries {
            let e = e
                .as_map()
                .ok_or_else(|| CoreError::invalid_type(format!("pledge detail of {did}"), "map"))?;
            out.push(PledgeDetail {
                did: did.clone(),
                token: e.text_or_empty(pledge::TOKEN)?,
                token_type: e.int(pledge::TOKEN_TYPE)?.unwrap_or_default(),
                token_block_id: e.text_or_empty(pledge::TOKEN_BLOCK_ID)?,
            });
        }
    }
    Ok(out)
}
