//! Token chain blocks.
//!
//! A [`Block`] always holds both forms of itself: the wire bytes and the
//! decoded record (with the hash at `98` and the signer map at `99` merged
//! in). Construction takes exactly one of the two and derives the other.

use std::collections::BTreeMap;

use crate::crypto::{DidSigner, DidVerifier};
use crate::envelope::{self, Layout, Slot, SlotForm};
use crate::error::{CoreError, Result};
use crate::keys::{genesis, genesis_info, token, trans_token};
use crate::record::{
    pledge_details_from_record, round_to_precision, CreditSignature, InitiatorSignature,
    PledgeDetail, TOKEN_VALUE_PRECISION,
};
use crate::value::{Record, RecordExt, Value};

const SLOTS: &[Slot] = &[Slot {
    name: "block signature",
    record_key: token::SIGNATURE,
    wire_key: crate::keys::envelope::SIGNATURE,
    form: SlotForm::Cbor,
}];

const LAYOUT: Layout = Layout {
    hash_key: token::BLOCK_HASH,
    slots: SLOTS,
};

/// Options for building a block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockOptions {
    /// Accept wire bytes that carry no signature slot.
    pub no_signature: bool,
}

/// One block of a token chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    bytes: Vec<u8>,
    record: Record,
    options: BlockOptions,
}

impl Block {
    /// Build from exactly one of wire bytes or a record.
    pub fn build(
        bytes: Option<Vec<u8>>,
        record: Option<Record>,
        options: BlockOptions,
    ) -> Result<Self> {
        match (bytes, record) {
            (Some(_), Some(_)) => Err(CoreError::InvalidInput(
                "both block bytes and block record supplied".into(),
            )),
            (None, None) => Err(CoreError::InvalidInput(
                "neither block bytes nor block record supplied".into(),
            )),
            (Some(bytes), None) => Self::from_bytes(bytes, options),
            (None, Some(record)) => {
                let mut block = Self::from_record(record)?;
                block.options = options;
                Ok(block)
            }
        }
    }

    /// Decode a block from wire bytes.
    pub fn from_bytes(bytes: Vec<u8>, options: BlockOptions) -> Result<Self> {
        if bytes.is_empty() {
            return Err(CoreError::InvalidInput("empty block bytes".into()));
        }
        let record = envelope::open(&bytes, &LAYOUT, !options.no_signature)?;
        Ok(Self {
            bytes,
            record,
            options,
        })
    }

    /// Encode a block from a record. Any hash already in the record is
    /// recomputed.
    pub fn from_record(record: Record) -> Result<Self> {
        if record.is_empty() {
            return Err(CoreError::InvalidInput("empty block record".into()));
        }
        let mut block = Self {
            bytes: Vec::new(),
            record,
            options: BlockOptions::default(),
        };
        block.encode()?;
        Ok(block)
    }

    fn encode(&mut self) -> Result<()> {
        self.bytes = envelope::seal(&mut self.record, &LAYOUT)?;
        Ok(())
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// The decoded record including hash and signer map.
    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn options(&self) -> BlockOptions {
        self.options
    }

    /// Hex SHA3-256 of the content bytes.
    pub fn hash(&self) -> Result<&str> {
        self.record
            .text(token::BLOCK_HASH)?
            .filter(|h| !h.is_empty())
            .ok_or(CoreError::HashUnavailable)
    }

    /// Recompute the hash directly from the wire envelope.
    pub fn calculate_block_hash(&self) -> Result<String> {
        envelope::content_hash(&self.bytes)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Chain position
    // ─────────────────────────────────────────────────────────────────────

    fn per_token<'a>(&'a self, key: &str, tok: &str, what: &str) -> Result<&'a Value> {
        self.record
            .map(key)?
            .and_then(|m| m.get(tok))
            .ok_or_else(|| CoreError::missing(format!("{what} for token {tok}")))
    }

    /// Block number of this block within `tok`'s chain.
    pub fn block_number(&self, tok: &str) -> Result<u64> {
        let v = self.per_token(token::BLOCK_NUMBER, tok, "block number")?;
        v.as_u64()
            .ok_or_else(|| CoreError::invalid_type(format!("block number of {tok}"), "integer"))
    }

    /// `"{block_number}-{hash}"`.
    pub fn block_id(&self, tok: &str) -> Result<String> {
        let number = self.block_number(tok)?;
        let hash = self
            .record
            .text(token::BLOCK_HASH)?
            .ok_or_else(|| CoreError::missing("block hash"))?;
        Ok(format!("{number}-{hash}"))
    }

    /// Id of the previous block in `tok`'s chain; empty for genesis.
    pub fn previous_block_id(&self, tok: &str) -> Result<String> {
        let v = self.per_token(token::PREVIOUS_BLOCK_ID, tok, "previous block id")?;
        v.as_str().map(str::to_string).ok_or_else(|| {
            CoreError::invalid_type(format!("previous block id of {tok}"), "text")
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Signatures
    // ─────────────────────────────────────────────────────────────────────

    fn signature_map(&self) -> Result<Option<&Record>> {
        self.record.map(token::SIGNATURE)
    }

    /// DIDs that have signed this block.
    pub fn signers(&self) -> Result<Vec<String>> {
        match self.signature_map()? {
            Some(m) if !m.is_empty() => Ok(m.keys().cloned().collect()),
            _ => Err(CoreError::MissingSignature("block signature")),
        }
    }

    /// The hash and `did`'s signature over it.
    pub fn hash_and_signature(&self, did: &str) -> Result<(String, String)> {
        let hash = self
            .record
            .text(token::BLOCK_HASH)?
            .ok_or_else(|| CoreError::missing("block hash"))?
            .to_string();
        let sigs = self
            .signature_map()?
            .ok_or(CoreError::MissingSignature("block signature"))?;
        let sig = sigs
            .text(did)?
            .ok_or_else(|| CoreError::missing(format!("signature of {did}")))?;
        Ok((hash, sig.to_string()))
    }

    /// Sign the hash as `signer` and return the hex signature.
    ///
    /// The signed message is the ASCII of the hex hash, not the raw digest.
    pub fn sign(&self, signer: &dyn DidSigner) -> Result<String> {
        let hash = self.hash()?;
        let sig = signer.pvt_sign(hash.as_bytes())?;
        Ok(hex::encode(sig))
    }

    /// Sign and record the signature, replacing only `signer`'s own entry.
    pub fn update_signature(&mut self, signer: &dyn DidSigner) -> Result<()> {
        let sig = self.sign(signer)?;
        self.replace_signature(signer.did(), &sig)
    }

    /// Insert or overwrite `did`'s signature and re-encode.
    pub fn replace_signature(&mut self, did: &str, signature: &str) -> Result<()> {
        let entry = self
            .record
            .entry(token::SIGNATURE.to_string())
            .or_insert_with(|| Value::Map(Record::new()));
        let sigs = entry
            .as_map_mut()
            .ok_or_else(|| CoreError::invalid_type(token::SIGNATURE, "map"))?;
        sigs.insert(did.to_string(), Value::from(signature));
        self.encode()
    }

    /// Verify every signer's signature against the current hash.
    pub fn verify_signature(&self, verifier: &dyn DidVerifier) -> Result<()> {
        for did in self.signers()? {
            self.verify_signature_of(&did, verifier)?;
        }
        Ok(())
    }

    /// Verify one signer's signature against the current hash.
    pub fn verify_signature_of(&self, did: &str, verifier: &dyn DidVerifier) -> Result<()> {
        let (hash, sig) = self.hash_and_signature(did)?;
        let sig = hex::decode(&sig)
            .map_err(|_| CoreError::SignatureInvalid(format!("{did}: malformed signature")))?;
        if verifier.pvt_verify(did, hash.as_bytes(), &sig)? {
            Ok(())
        } else {
            Err(CoreError::SignatureInvalid(did.to_string()))
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Transaction fields
    // ─────────────────────────────────────────────────────────────────────

    pub fn transaction_type(&self) -> Result<String> {
        self.record.text_or_empty(token::TRANS_TYPE)
    }

    pub fn owner(&self) -> Result<String> {
        self.record.text_or_empty(token::OWNER)
    }

    pub fn sender_did(&self) -> Result<String> {
        self.record.text_or_empty(token::SENDER_DID)
    }

    pub fn receiver_did(&self) -> Result<String> {
        self.record.text_or_empty(token::RECEIVER_DID)
    }

    pub fn deployer_did(&self) -> Result<String> {
        self.record.text_or_empty(token::DEPLOYER_DID)
    }

    pub fn executor_did(&self) -> Result<String> {
        self.record.text_or_empty(token::EXECUTOR_DID)
    }

    pub fn tid(&self) -> Result<String> {
        self.record.text_or_empty(token::TID)
    }

    pub fn comment(&self) -> Result<String> {
        self.record.text_or_empty(token::COMMENT)
    }

    pub fn ref_id(&self) -> Result<String> {
        self.record.text_or_empty(token::REF_ID)
    }

    pub fn smart_contract_data(&self) -> Result<String> {
        self.record.text_or_empty(token::SMART_CONTRACT_DATA)
    }

    pub fn nft_data(&self) -> Result<String> {
        self.record.text_or_empty(token::NFT_DATA)
    }

    pub fn pledge_token(&self) -> Result<String> {
        self.record.text_or_empty(token::PLEDGE_TOKEN)
    }

    pub fn smart_contract(&self) -> Result<Option<&[u8]>> {
        self.record.bytes(token::SMART_CONTRACT)
    }

    /// Embedded sub-chain detail, if any.
    pub fn sub_chain_detail(&self) -> Result<Option<&[u8]>> {
        self.record.bytes(token::SUB_CHAIN_DETAIL)
    }

    /// Token value rounded to the stored precision; 0 when absent.
    pub fn token_value(&self) -> Result<f64> {
        Ok(self
            .record
            .float(token::TOKEN_VALUE)?
            .map(|v| round_to_precision(v, TOKEN_VALUE_PRECISION))
            .unwrap_or_default())
    }

    pub fn epoch(&self) -> Result<i64> {
        Ok(self.record.int(token::EPOCH)?.unwrap_or_default())
    }

    fn list_or_empty(&self, key: &str) -> Result<Vec<String>> {
        Ok(self.record.string_list(key)?.unwrap_or_default())
    }

    pub fn child_tokens(&self) -> Result<Vec<String>> {
        self.list_or_empty(token::CHILD_TOKENS)
    }

    pub fn whole_tokens(&self) -> Result<Vec<String>> {
        self.list_or_empty(token::WHOLE_TOKENS)
    }

    pub fn whole_tokens_id(&self) -> Result<Vec<String>> {
        self.list_or_empty(token::WHOLE_TOKENS_ID)
    }

    pub fn part_tokens(&self) -> Result<Vec<String>> {
        self.list_or_empty(token::PART_TOKENS)
    }

    pub fn part_tokens_id(&self) -> Result<Vec<String>> {
        self.list_or_empty(token::PART_TOKENS_ID)
    }

    pub fn tokens_pledged_for(&self) -> Result<Vec<String>> {
        self.list_or_empty(token::TOKENS_PLEDGED_FOR)
    }

    pub fn tokens_pledged_with(&self) -> Result<Vec<String>> {
        self.list_or_empty(token::TOKENS_PLEDGED_WITH)
    }

    /// Pledged token → tokens it covers. Empty when absent.
    pub fn tokens_pledge_map(&self) -> Result<BTreeMap<String, Vec<String>>> {
        let Some(pm) = self.record.map(token::TOKENS_PLEDGE_MAP)? else {
            return Ok(BTreeMap::new());
        };
        pm.keys()
            .map(|k| Ok((k.clone(), pm.string_list(k)?.unwrap_or_default())))
            .collect()
    }

    /// Tokens whose chains this block advances.
    pub fn trans_tokens(&self) -> Result<Vec<String>> {
        Ok(self
            .record
            .map(token::TRANS_TOKENS)?
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default())
    }

    pub fn is_multi_token(&self) -> Result<bool> {
        Ok(self.trans_tokens()?.len() > 1)
    }

    fn trans_token_detail(&self, tok: &str) -> Result<&Record> {
        self.record
            .map(token::TRANS_TOKENS)?
            .and_then(|m| m.get(tok))
            .ok_or_else(|| CoreError::missing(format!("transaction token {tok}")))?
            .as_map()
            .ok_or_else(|| CoreError::invalid_type(format!("transaction token {tok}"), "map"))
    }

    pub fn token_type(&self, tok: &str) -> Result<i64> {
        Ok(self
            .trans_token_detail(tok)?
            .int(trans_token::TOKEN_TYPE)?
            .unwrap_or_default())
    }

    pub fn unpledged_id(&self, tok: &str) -> Result<String> {
        self.trans_token_detail(tok)?
            .text_or_empty(trans_token::UNPLEDGED_ID)
    }

    pub fn committed_did(&self, tok: &str) -> Result<String> {
        self.trans_token_detail(tok)?
            .text_or_empty(trans_token::COMMITTED_DID)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Genesis
    // ─────────────────────────────────────────────────────────────────────

    pub fn is_genesis(&self) -> bool {
        self.record.contains_key(token::GENESIS_BLOCK)
    }

    pub fn genesis_type(&self) -> Result<String> {
        match self.record.map(token::GENESIS_BLOCK)? {
            Some(g) => g.text_or_empty(genesis::TYPE),
            None => Err(CoreError::missing("genesis block")),
        }
    }

    fn genesis_info(&self, tok: &str) -> Result<&Record> {
        let g = self
            .record
            .map(token::GENESIS_BLOCK)?
            .ok_or_else(|| CoreError::missing("genesis block"))?;
        g.map(genesis::INFO)?
            .and_then(|info| info.get(tok))
            .ok_or_else(|| CoreError::missing(format!("genesis info for token {tok}")))?
            .as_map()
            .ok_or_else(|| CoreError::invalid_type(format!("genesis info for {tok}"), "map"))
    }

    /// `(token_level, token_number)` from the genesis info.
    pub fn token_level_and_number(&self, tok: &str) -> Result<(i64, i64)> {
        let info = self.genesis_info(tok)?;
        let level = info
            .int(genesis_info::TOKEN_LEVEL)?
            .ok_or_else(|| CoreError::missing(format!("token level of {tok}")))?;
        let number = info
            .int(genesis_info::TOKEN_NUMBER)?
            .ok_or_else(|| CoreError::missing(format!("token number of {tok}")))?;
        Ok((level, number))
    }

    /// `(parent_id, grand_parent_ids)` from the genesis info.
    pub fn parent_details(&self, tok: &str) -> Result<(String, Vec<String>)> {
        let info = self.genesis_info(tok)?;
        Ok((
            info.text_or_empty(genesis_info::PARENT_ID)?,
            info.string_list(genesis_info::GRAND_PARENT_ID)?
                .unwrap_or_default(),
        ))
    }

    pub fn migrated_block_id(&self, tok: &str) -> Result<String> {
        self.genesis_info(tok)?
            .text_or_empty(genesis_info::MIGRATED_BLOCK_ID)
    }

    /// Tokens committed in the genesis of `tok`.
    pub fn committed_tokens(&self, tok: &str) -> Result<Vec<String>> {
        Ok(self
            .genesis_info(tok)?
            .map(genesis_info::COMMITTED_TOKENS)?
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default())
    }

    pub fn smart_contract_value(&self, tok: &str) -> Result<f64> {
        Ok(self
            .genesis_info(tok)?
            .float(genesis_info::SMART_CONTRACT_VALUE)?
            .unwrap_or_default())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Consensus bookkeeping
    // ─────────────────────────────────────────────────────────────────────

    /// Quorum credit signatures, in either map or legacy JSON-string form.
    pub fn quorum_signatures(&self) -> Result<Vec<CreditSignature>> {
        match self.record.list(token::QUORUM_SIGNATURE)? {
            Some(items) => items.iter().map(CreditSignature::from_value).collect(),
            None => Ok(Vec::new()),
        }
    }

    pub fn initiator_signature(&self) -> Result<Option<InitiatorSignature>> {
        self.record
            .map(token::INITIATOR_SIGNATURE)?
            .map(InitiatorSignature::from_record)
            .transpose()
    }

    pub fn pledge_details(&self) -> Result<Vec<PledgeDetail>> {
        match self.record.map(token::PLEDGE_DETAILS)? {
            Some(m) => pledge_details_from_record(m),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::{encode_record, hash_hex};
    use crate::crypto::{Ed25519Did, KeyRing};

    fn record() -> Record {
        let mut r = Record::new();
        r.insert(token::TRANS_TYPE.into(), Value::from("02"));
        r.insert(token::OWNER.into(), Value::from("didA"));
        r.insert(token::COMMENT.into(), Value::from("test"));
        let mut numbers = Record::new();
        numbers.insert("T1".into(), Value::from("0"));
        let mut prev = Record::new();
        prev.insert("T1".into(), Value::from(""));
        let mut details = Record::new();
        let mut d = Record::new();
        d.insert(trans_token::TOKEN_TYPE.into(), Value::from(0i64));
        details.insert("T1".into(), Value::Map(d));
        r.insert(token::BLOCK_NUMBER.into(), Value::Map(numbers));
        r.insert(token::PREVIOUS_BLOCK_ID.into(), Value::Map(prev));
        r.insert(token::TRANS_TOKENS.into(), Value::Map(details));
        r
    }

    #[test]
    fn test_build_requires_exactly_one_input() {
        let opts = BlockOptions::default();
        assert!(matches!(
            Block::build(None, None, opts),
            Err(CoreError::InvalidInput(_))
        ));
        assert!(matches!(
            Block::build(Some(vec![1]), Some(record()), opts),
            Err(CoreError::InvalidInput(_))
        ));
        assert!(matches!(
            Block::from_bytes(Vec::new(), opts),
            Err(CoreError::InvalidInput(_))
        ));
        assert!(matches!(
            Block::from_record(Record::new()),
            Err(CoreError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_out_of_range_integer_rejected() {
        let mut r = record();
        r.insert("27".into(), Value::Integer(u64::MAX as i128 + 7));
        assert!(matches!(
            Block::from_record(r),
            Err(CoreError::EncodingError(_))
        ));
    }

    #[test]
    fn test_genesis_block_id() {
        let b = Block::from_record(record()).unwrap();
        let content = encode_record(&record()).unwrap();
        let expected = hash_hex(&content);

        assert_eq!(b.hash().unwrap(), expected);
        assert_eq!(b.block_number("T1").unwrap(), 0);
        assert_eq!(b.previous_block_id("T1").unwrap(), "");
        assert_eq!(b.block_id("T1").unwrap(), format!("0-{expected}"));
        assert_eq!(b.calculate_block_hash().unwrap(), expected);
    }

    #[test]
    fn test_unsigned_decode_needs_option() {
        let b = Block::from_record(record()).unwrap();
        let bytes = b.bytes().to_vec();
        assert!(matches!(
            Block::from_bytes(bytes.clone(), BlockOptions::default()),
            Err(CoreError::MissingSignature(_))
        ));
        let decoded = Block::from_bytes(bytes, BlockOptions { no_signature: true }).unwrap();
        assert_eq!(decoded.record(), b.record());
    }

    #[test]
    fn test_missing_token_fields() {
        let b = Block::from_record(record()).unwrap();
        assert!(matches!(
            b.block_number("T9"),
            Err(CoreError::MissingField(_))
        ));
        assert!(matches!(
            b.previous_block_id("T9"),
            Err(CoreError::MissingField(_))
        ));
        assert!(matches!(b.signers(), Err(CoreError::MissingSignature(_))));
    }

    #[test]
    fn test_sign_and_verify() {
        let alice = Ed25519Did::from_seed(&[1; 32]);
        let bob = Ed25519Did::from_seed(&[2; 32]);
        let ring: KeyRing = [alice.clone(), bob.clone()].into_iter().collect();

        let mut b = Block::from_record(record()).unwrap();
        let hash = b.hash().unwrap().to_string();
        b.update_signature(&alice).unwrap();
        b.update_signature(&bob).unwrap();

        assert_eq!(b.hash().unwrap(), hash);
        assert_eq!(b.signers().unwrap().len(), 2);
        b.verify_signature(&ring).unwrap();

        let decoded = Block::from_bytes(b.bytes().to_vec(), BlockOptions::default()).unwrap();
        decoded.verify_signature(&ring).unwrap();
        assert_eq!(decoded.hash_and_signature(alice.did()).unwrap().0, hash);
    }

    #[test]
    fn test_replace_signature_keeps_other_signers() {
        let alice = Ed25519Did::from_seed(&[1; 32]);
        let bob = Ed25519Did::from_seed(&[2; 32]);
        let ring: KeyRing = [alice.clone(), bob.clone()].into_iter().collect();

        let mut b = Block::from_record(record()).unwrap();
        b.update_signature(&alice).unwrap();
        b.update_signature(&bob).unwrap();
        b.replace_signature(bob.did(), &"00".repeat(64)).unwrap();

        assert_eq!(b.signers().unwrap().len(), 2);
        b.verify_signature_of(alice.did(), &ring).unwrap();
        assert!(matches!(
            b.verify_signature_of(bob.did(), &ring),
            Err(CoreError::SignatureInvalid(_))
        ));
        assert!(b.verify_signature(&ring).is_err());
    }

    #[test]
    fn test_token_level_integer_widths() {
        let mut r = record();
        let mut info = Record::new();
        info.insert(genesis_info::TOKEN_LEVEL.into(), Value::from(1u8));
        info.insert(genesis_info::TOKEN_NUMBER.into(), Value::from(42u64));
        let mut infos = Record::new();
        infos.insert("T1".into(), Value::Map(info));
        let mut g = Record::new();
        g.insert(genesis::TYPE.into(), Value::from("1"));
        g.insert(genesis::INFO.into(), Value::Map(infos));
        r.insert(token::GENESIS_BLOCK.into(), Value::Map(g));

        let b = Block::from_record(r).unwrap();
        assert_eq!(b.token_level_and_number("T1").unwrap(), (1, 42));
        assert!(b.token_level_and_number("T2").is_err());
    }

    #[test]
    fn test_token_level_non_numeric() {
        let mut r = record();
        let mut info = Record::new();
        info.insert(genesis_info::TOKEN_LEVEL.into(), Value::Bytes(vec![1]));
        info.insert(genesis_info::TOKEN_NUMBER.into(), Value::from(1i64));
        let mut infos = Record::new();
        infos.insert("T1".into(), Value::Map(info));
        let mut g = Record::new();
        g.insert(genesis::INFO.into(), Value::Map(infos));
        r.insert(token::GENESIS_BLOCK.into(), Value::Map(g));

        let b = Block::from_record(r).unwrap();
        assert!(matches!(
            b.token_level_and_number("T1"),
            Err(CoreError::InvalidType { .. })
        ));
    }

    #[test]
    fn test_sign_without_hash() {
        let b = Block {
            bytes: Vec::new(),
            record: record(),
            options: BlockOptions::default(),
        };
        let alice = Ed25519Did::from_seed(&[1; 32]);
        assert!(matches!(b.sign(&alice), Err(CoreError::HashUnavailable)));
    }
}
