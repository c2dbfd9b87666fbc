//! Smart-contract chain blocks.
//!
//! Same envelope discipline as [`crate::block`], but with two signature
//! slots instead of one signer map: a share signature (wire `2`) and a key
//! signature (wire `3`), each a DID → hex signature map. Both slots are
//! required when decoding and absent on a freshly created contract.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::crypto::{DidSigner, ShareSigner, ShareVerifier};
use crate::envelope::{self, Layout, Slot, SlotForm};
use crate::error::{CoreError, Result};
use crate::keys::{contract as key, contract_trans as trans, envelope as wire, token_info};
use crate::value::{Record, RecordExt, Value};

const SLOTS: &[Slot] = &[
    Slot {
        name: "share signature",
        record_key: key::SHARE_SIGNATURE,
        wire_key: wire::SIGNATURE,
        form: SlotForm::Cbor,
    },
    Slot {
        name: "key signature",
        record_key: key::KEY_SIGNATURE,
        wire_key: wire::KEY_SIGNATURE,
        form: SlotForm::Cbor,
    },
];

const LAYOUT: Layout = Layout {
    hash_key: key::BLOCK_HASH,
    slots: SLOTS,
};

/// Kind of smart contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractType {
    RbtDirect = 0,
    DidMigrate = 1,
    DataToken = 2,
    DataTokenCommit = 3,
    NftSale = 4,
    SmartContractDeploy = 5,
}

impl ContractType {
    pub fn code(self) -> i64 {
        self as i64
    }

    pub fn from_code(code: i64) -> Result<Self> {
        Ok(match code {
            0 => Self::RbtDirect,
            1 => Self::DidMigrate,
            2 => Self::DataToken,
            3 => Self::DataTokenCommit,
            4 => Self::NftSale,
            5 => Self::SmartContractDeploy,
            other => return Err(CoreError::UnsupportedType(other)),
        })
    }
}

/// How quorum members pledge for the transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PledgeMode {
    /// Proof-of-work pledging; the default when a block carries no mode.
    #[default]
    Pow = 0,
    Periodic = 1,
    NoPledge = 2,
}

impl PledgeMode {
    pub fn code(self) -> i64 {
        self as i64
    }

    pub fn from_code(code: i64) -> Result<Self> {
        Ok(match code {
            0 => Self::Pow,
            1 => Self::Periodic,
            2 => Self::NoPledge,
            other => return Err(CoreError::UnsupportedType(other)),
        })
    }
}

/// A token moved or referenced by a contract.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenInfo {
    pub token: String,
    pub token_type: i64,
    pub token_value: f64,
    pub owner_did: String,
    pub block_id: String,
}

impl TokenInfo {
    fn to_value(&self) -> Value {
        let mut m = Record::new();
        m.insert(token_info::TOKEN_TYPE.into(), Value::from(self.token_type));
        m.insert(token_info::TOKEN_VALUE.into(), Value::from(self.token_value));
        if !self.owner_did.is_empty() {
            m.insert(token_info::OWNER_DID.into(), Value::from(&self.owner_did));
        }
        if !self.block_id.is_empty() {
            m.insert(token_info::BLOCK_ID.into(), Value::from(&self.block_id));
        }
        Value::Map(m)
    }

    fn from_entry(token: &str, value: &Value) -> Result<Self> {
        let m = value
            .as_map()
            .ok_or_else(|| CoreError::invalid_type(format!("token info of {token}"), "map"))?;
        Ok(Self {
            token: token.to_string(),
            token_type: m.int(token_info::TOKEN_TYPE)?.unwrap_or_default(),
            token_value: m.float(token_info::TOKEN_VALUE)?.unwrap_or_default(),
            owner_did: m.text_or_empty(token_info::OWNER_DID)?,
            block_id: m.text_or_empty(token_info::BLOCK_ID)?,
        })
    }
}

fn token_map(tokens: &[TokenInfo]) -> Value {
    Value::Map(
        tokens
            .iter()
            .map(|t| (t.token.clone(), t.to_value()))
            .collect(),
    )
}

fn tokens_from_map(m: &Record) -> Result<Vec<TokenInfo>> {
    m.iter().map(|(k, v)| TokenInfo::from_entry(k, v)).collect()
}

/// Transaction details carried by a contract.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransInfo {
    pub sender_did: String,
    pub receiver_did: String,
    pub comment: String,
    pub trans_tokens: Vec<TokenInfo>,
    pub exchange_tokens: Vec<TokenInfo>,
    /// Only used when `trans_tokens` is empty.
    pub batch_trans_tokens: BTreeMap<String, Vec<TokenInfo>>,
    pub whole_tokens: Vec<String>,
    pub part_tokens: Vec<String>,
    pub committed_tokens: Vec<TokenInfo>,
    pub deployer_did: String,
    pub executor_did: String,
    pub smart_contract_data: String,
}

impl TransInfo {
    fn to_value(&self) -> Result<Value> {
        let mut m = Record::new();
        let mut text = |k: &str, v: &str| {
            if !v.is_empty() {
                m.insert(k.to_string(), Value::from(v));
            }
        };
        text(trans::SENDER_DID, &self.sender_did);
        text(trans::RECEIVER_DID, &self.receiver_did);
        text(trans::COMMENT, &self.comment);
        text(trans::DEPLOYER_DID, &self.deployer_did);
        text(trans::EXECUTOR_DID, &self.executor_did);
        text(trans::SMART_CONTRACT_DATA, &self.smart_contract_data);

        let all = self
            .trans_tokens
            .iter()
            .chain(&self.exchange_tokens)
            .chain(&self.committed_tokens)
            .chain(self.batch_trans_tokens.values().flatten());
        for t in all {
            if t.token.is_empty() {
                return Err(CoreError::InvalidInput("contract token info without id".into()));
            }
        }

        if !self.trans_tokens.is_empty() {
            m.insert(trans::TRANS_TOKENS.into(), token_map(&self.trans_tokens));
        } else if !self.batch_trans_tokens.is_empty() {
            let batches = self
                .batch_trans_tokens
                .iter()
                .map(|(k, v)| (k.clone(), token_map(v)))
                .collect();
            m.insert(trans::BATCH_TRANS_TOKENS.into(), Value::Map(batches));
        }
        if !self.exchange_tokens.is_empty() {
            m.insert(trans::EXCHANGE_TOKENS.into(), token_map(&self.exchange_tokens));
        }
        if !self.committed_tokens.is_empty() {
            m.insert(trans::COMMITTED_TOKENS.into(), token_map(&self.committed_tokens));
        }
        if !self.whole_tokens.is_empty() {
            m.insert(trans::WHOLE_TOKENS.into(), Value::text_list(&self.whole_tokens));
        }
        if !self.part_tokens.is_empty() {
            m.insert(trans::PART_TOKENS.into(), Value::text_list(&self.part_tokens));
        }
        Ok(Value::Map(m))
    }
}

/// Input for a new contract block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractRecord {
    pub contract_type: ContractType,
    #[serde(default)]
    pub pledge_mode: PledgeMode,
    pub trans_info: TransInfo,
    #[serde(default)]
    pub total_value: f64,
}

impl ContractRecord {
    pub fn to_record(&self) -> Result<Record> {
        let mut m = Record::new();
        m.insert(key::TYPE.into(), Value::from(self.contract_type.code()));
        m.insert(key::PLEDGE_MODE.into(), Value::from(self.pledge_mode.code()));
        m.insert(key::TRANS_INFO.into(), self.trans_info.to_value()?);
        m.insert(key::TOTAL_VALUE.into(), Value::from(self.total_value));
        Ok(m)
    }
}

/// One block of a smart-contract chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractBlock {
    bytes: Vec<u8>,
    record: Record,
}

impl ContractBlock {
    /// Create an unsigned contract block.
    pub fn create(contract: &ContractRecord) -> Result<Self> {
        Self::from_record(contract.to_record()?)
    }

    /// Decode a contract block; both signature slots must be present.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        if bytes.is_empty() {
            return Err(CoreError::InvalidInput("empty contract bytes".into()));
        }
        let record = envelope::open(&bytes, &LAYOUT, true)?;
        let block = Self { bytes, record };
        block.type_code()?;
        Ok(block)
    }

    pub fn from_record(mut record: Record) -> Result<Self> {
        if record.is_empty() {
            return Err(CoreError::InvalidInput("empty contract record".into()));
        }
        if let Some(mode) = record.int(key::PLEDGE_MODE)? {
            PledgeMode::from_code(mode)?;
        }
        let bytes = envelope::seal(&mut record, &LAYOUT)?;
        let block = Self { bytes, record };
        block.type_code()?;
        Ok(block)
    }

    fn encode(&mut self) -> Result<()> {
        self.bytes = envelope::seal(&mut self.record, &LAYOUT)?;
        Ok(())
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn hash(&self) -> Result<&str> {
        self.record
            .text(key::BLOCK_HASH)?
            .filter(|h| !h.is_empty())
            .ok_or(CoreError::HashUnavailable)
    }

    pub fn calculate_block_hash(&self) -> Result<String> {
        envelope::content_hash(&self.bytes)
    }

    /// Raw contract type code; 0 when absent.
    pub fn type_code(&self) -> Result<i64> {
        Ok(self.record.int(key::TYPE)?.unwrap_or_default())
    }

    pub fn contract_type(&self) -> Result<ContractType> {
        ContractType::from_code(self.type_code()?)
    }

    /// Pledge mode, proof-of-work when absent.
    pub fn pledge_mode(&self) -> Result<PledgeMode> {
        match self.record.int(key::PLEDGE_MODE)? {
            Some(code) => PledgeMode::from_code(code),
            None => Ok(PledgeMode::Pow),
        }
    }

    pub fn total_value(&self) -> Result<f64> {
        Ok(self.record.float(key::TOTAL_VALUE)?.unwrap_or_default())
    }

    fn trans_info(&self) -> Result<Option<&Record>> {
        self.record.map(key::TRANS_INFO)
    }

    fn trans_text(&self, k: &str) -> Result<String> {
        match self.trans_info()? {
            Some(ti) => ti.text_or_empty(k),
            None => Ok(String::new()),
        }
    }

    pub fn sender_did(&self) -> Result<String> {
        self.trans_text(trans::SENDER_DID)
    }

    pub fn receiver_did(&self) -> Result<String> {
        self.trans_text(trans::RECEIVER_DID)
    }

    pub fn deployer_did(&self) -> Result<String> {
        self.trans_text(trans::DEPLOYER_DID)
    }

    pub fn executor_did(&self) -> Result<String> {
        self.trans_text(trans::EXECUTOR_DID)
    }

    pub fn comment(&self) -> Result<String> {
        self.trans_text(trans::COMMENT)
    }

    pub fn smart_contract_data(&self) -> Result<String> {
        self.trans_text(trans::SMART_CONTRACT_DATA)
    }

    fn trans_tokens_at(&self, k: &str) -> Result<Vec<TokenInfo>> {
        match self.trans_info()? {
            Some(ti) => match ti.map(k)? {
                Some(m) => tokens_from_map(m),
                None => Ok(Vec::new()),
            },
            None => Ok(Vec::new()),
        }
    }

    pub fn trans_tokens_info(&self) -> Result<Vec<TokenInfo>> {
        self.trans_tokens_at(trans::TRANS_TOKENS)
    }

    pub fn exchange_tokens_info(&self) -> Result<Vec<TokenInfo>> {
        self.trans_tokens_at(trans::EXCHANGE_TOKENS)
    }

    pub fn committed_tokens_info(&self) -> Result<Vec<TokenInfo>> {
        self.trans_tokens_at(trans::COMMITTED_TOKENS)
    }

    pub fn batch_trans_tokens_info(&self) -> Result<BTreeMap<String, Vec<TokenInfo>>> {
        let Some(ti) = self.trans_info()? else {
            return Ok(BTreeMap::new());
        };
        let Some(batches) = ti.map(trans::BATCH_TRANS_TOKENS)? else {
            return Ok(BTreeMap::new());
        };
        batches
            .iter()
            .map(|(batch, v)| {
                let m = v
                    .as_map()
                    .ok_or_else(|| CoreError::invalid_type(format!("batch {batch}"), "map"))?;
                Ok((batch.clone(), tokens_from_map(m)?))
            })
            .collect()
    }

    fn trans_list(&self, k: &str) -> Result<Vec<String>> {
        match self.trans_info()? {
            Some(ti) => Ok(ti.string_list(k)?.unwrap_or_default()),
            None => Ok(Vec::new()),
        }
    }

    pub fn whole_tokens(&self) -> Result<Vec<String>> {
        self.trans_list(trans::WHOLE_TOKENS)
    }

    pub fn part_tokens(&self) -> Result<Vec<String>> {
        self.trans_list(trans::PART_TOKENS)
    }

    /// `(hash, share_signature, key_signature)` for `did`.
    pub fn hash_and_signatures(&self, did: &str) -> Result<(String, String, String)> {
        let hash = self
            .record
            .text(key::BLOCK_HASH)?
            .ok_or_else(|| CoreError::missing("contract hash"))?
            .to_string();
        let slot = |k: &str, name: &'static str| -> Result<String> {
            let sigs = self.record.map(k)?.ok_or(CoreError::MissingSignature(name))?;
            sigs.text(did)?
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .ok_or_else(|| CoreError::missing(format!("{name} of {did}")))
        };
        let share = slot(key::SHARE_SIGNATURE, "share signature")?;
        let pvt = slot(key::KEY_SIGNATURE, "key signature")?;
        Ok((hash, share, pvt))
    }

    /// Add or replace `signer`'s share and key signatures.
    pub fn update_signature(&mut self, signer: &dyn ShareSigner) -> Result<()> {
        let hash = self.hash()?.to_string();
        let (share, pvt) = signer.share_sign(&hash)?;
        let did = signer.did().to_string();
        for (k, sig) in [(key::SHARE_SIGNATURE, share), (key::KEY_SIGNATURE, pvt)] {
            let entry = self
                .record
                .entry(k.to_string())
                .or_insert_with(|| Value::Map(Record::new()));
            entry
                .as_map_mut()
                .ok_or_else(|| CoreError::invalid_type(k, "map"))?
                .insert(did.clone(), Value::Text(hex::encode(sig)));
        }
        self.encode()
    }

    /// Verify `did`'s share and key signatures against the hash.
    pub fn verify_signature(&self, did: &str, verifier: &dyn ShareVerifier) -> Result<()> {
        let (hash, share, pvt) = self.hash_and_signatures(did)?;
        let malformed = |_| CoreError::SignatureInvalid(format!("{did}: malformed signature"));
        let share = hex::decode(share).map_err(malformed)?;
        let pvt = hex::decode(pvt).map_err(malformed)?;
        if verifier.share_verify(did, &hash, &share, &pvt)? {
            Ok(())
        } else {
            Err(CoreError::SignatureInvalid(did.to_string()))
        }
    }
}
