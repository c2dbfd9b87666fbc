//! RAC unit records: individually hashed and self-signed asset units.
//!
//! A series of N units shares its descriptive metadata; each unit carries
//! its own sequence number and is signed by the creator over its own hash.
//! Units of a series are not chained to each other.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::crypto::{DidSigner, DidVerifier};
use crate::envelope::{self, Layout, Slot, SlotForm};
use crate::error::{CoreError, Result};
use crate::keys::{envelope as wire, part_info, rac as key};
use crate::value::{Record, RecordExt, Value};

/// Version stamped on every unit.
pub const RAC_VERSION: i64 = 1;

const SLOTS: &[Slot] = &[Slot {
    name: "signature",
    record_key: key::SIGNATURE,
    wire_key: wire::SIGNATURE,
    form: SlotForm::HexBytes,
}];

const LAYOUT: Layout = Layout {
    hash_key: key::BLOCK_HASH,
    slots: SLOTS,
};

/// RAC type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RacKind {
    TestToken = 0,
    /// Retired NFT format. Still recognised, never created.
    LegacyNft = 1,
    Nft = 2,
}

impl RacKind {
    pub fn code(self) -> i64 {
        self as i64
    }

    pub fn from_code(code: i64) -> Result<Self> {
        Ok(match code {
            0 => Self::TestToken,
            1 => Self::LegacyNft,
            2 => Self::Nft,
            other => return Err(CoreError::UnsupportedType(other)),
        })
    }

    pub fn is_supported(self) -> bool {
        !matches!(self, Self::LegacyNft)
    }
}

/// Fraction of a parent token held by a unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartInfo {
    pub parent_token: String,
    pub part_value: f64,
}

/// Parameters shared by every unit of a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RacSpec {
    pub kind: RacKind,
    pub total_supply: u64,
    #[serde(default)]
    pub creator_input: String,
    /// Content id → content hash.
    #[serde(default)]
    pub content_hashes: BTreeMap<String, String>,
    /// Content id → URL.
    #[serde(default)]
    pub content_urls: BTreeMap<String, String>,
    #[serde(default)]
    pub part_info: Option<PartInfo>,
}

fn text_map(m: &BTreeMap<String, String>) -> Value {
    Value::Map(
        m.iter()
            .map(|(k, v)| (k.clone(), Value::from(v)))
            .collect(),
    )
}

/// Build and self-sign `spec.total_supply` units.
pub fn create_series(spec: &RacSpec, signer: &dyn DidSigner) -> Result<Vec<RacUnit>> {
    if !spec.kind.is_supported() {
        return Err(CoreError::UnsupportedType(spec.kind.code()));
    }
    let mut base = Record::new();
    base.insert(key::TYPE.into(), Value::from(spec.kind.code()));
    base.insert(key::CREATOR_DID.into(), Value::from(signer.did()));
    base.insert(key::TOTAL_SUPPLY.into(), Value::from(spec.total_supply));
    base.insert(key::CREATOR_INPUT.into(), Value::from(&spec.creator_input));
    base.insert(key::CONTENT_HASH.into(), text_map(&spec.content_hashes));
    base.insert(key::CONTENT_URL.into(), text_map(&spec.content_urls));
    base.insert(key::VERSION.into(), Value::from(RAC_VERSION));
    if let Some(pi) = &spec.part_info {
        let mut m = Record::new();
        m.insert(part_info::PARENT_TOKEN.into(), Value::from(&pi.parent_token));
        m.insert(part_info::PART_VALUE.into(), Value::from(pi.part_value));
        base.insert(key::PART_INFO.into(), Value::Map(m));
    }

    (0..spec.total_supply)
        .map(|seq| {
            let mut record = base.clone();
            record.insert(key::TOKEN_COUNT.into(), Value::from(seq));
            let mut unit = RacUnit::from_record(record)?;
            unit.sign(signer)?;
            Ok(unit)
        })
        .collect()
}

/// One RAC unit.
#[derive(Debug, Clone, PartialEq)]
pub struct RacUnit {
    bytes: Vec<u8>,
    record: Record,
}

impl RacUnit {
    /// Decode a signed unit.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        if bytes.is_empty() {
            return Err(CoreError::InvalidInput("empty rac bytes".into()));
        }
        let record = envelope::open(&bytes, &LAYOUT, true)?;
        Ok(Self { bytes, record })
    }

    pub fn from_record(mut record: Record) -> Result<Self> {
        if record.is_empty() {
            return Err(CoreError::InvalidInput("empty rac record".into()));
        }
        let bytes = envelope::seal(&mut record, &LAYOUT)?;
        Ok(Self { bytes, record })
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

    /// `(hash, signature)`.
    pub fn hash_signature(&self) -> Result<(String, String)> {
        let hash = self.hash()?.to_string();
        let sig = self
            .record
            .text(key::SIGNATURE)?
            .ok_or(CoreError::MissingSignature("signature"))?;
        Ok((hash, sig.to_string()))
    }

    /// Store a hex signature and re-encode.
    pub fn update_signature(&mut self, signature: &str) -> Result<()> {
        hex::decode(signature)
            .map_err(|e| CoreError::InvalidInput(format!("rac signature: {e}")))?;
        self.record
            .insert(key::SIGNATURE.into(), Value::from(signature));
        self.bytes = envelope::seal(&mut self.record, &LAYOUT)?;
        Ok(())
    }

    /// Sign the hash as `signer` and store the signature.
    pub fn sign(&mut self, signer: &dyn DidSigner) -> Result<()> {
        let sig = signer.pvt_sign(self.hash()?.as_bytes())?;
        self.update_signature(&hex::encode(sig))
    }

    /// Check the stored signature against the recomputed hash, as the
    /// creator DID.
    pub fn verify_signature(&self, verifier: &dyn DidVerifier) -> Result<()> {
        let did = self.creator_did()?;
        let (_, sig) = self.hash_signature()?;
        let hash = envelope::content_hash(&self.bytes)?;
        let sig = hex::decode(sig)
            .map_err(|_| CoreError::SignatureInvalid(format!("{did}: malformed signature")))?;
        if verifier.pvt_verify(&did, hash.as_bytes(), &sig)? {
            Ok(())
        } else {
            Err(CoreError::SignatureInvalid(did))
        }
    }

    pub fn kind(&self) -> Result<RacKind> {
        let code = self
            .record
            .int(key::TYPE)?
            .ok_or_else(|| CoreError::missing("rac type"))?;
        RacKind::from_code(code)
    }

    pub fn creator_did(&self) -> Result<String> {
        self.record
            .text(key::CREATOR_DID)?
            .map(str::to_string)
            .ok_or_else(|| CoreError::missing("creator did"))
    }

    pub fn total_supply(&self) -> Result<u64> {
        let v = self
            .record
            .get(key::TOTAL_SUPPLY)
            .ok_or_else(|| CoreError::missing("total supply"))?;
        v.as_u64()
            .ok_or_else(|| CoreError::invalid_type(key::TOTAL_SUPPLY, "unsigned integer"))
    }

    /// Position of this unit within its series.
    pub fn sequence_number(&self) -> Result<u64> {
        let v = self
            .record
            .get(key::TOKEN_COUNT)
            .ok_or_else(|| CoreError::missing("token count"))?;
        v.as_u64()
            .ok_or_else(|| CoreError::invalid_type(key::TOKEN_COUNT, "unsigned integer"))
    }

    pub fn creator_input(&self) -> Result<String> {
        self.record.text_or_empty(key::CREATOR_INPUT)
    }

    pub fn version(&self) -> Result<i64> {
        Ok(self.record.int(key::VERSION)?.unwrap_or_default())
    }

    fn text_map_at(&self, k: &str) -> Result<BTreeMap<String, String>> {
        let Some(m) = self.record.map(k)? else {
            return Ok(BTreeMap::new());
        };
        m.keys()
            .map(|id| Ok((id.clone(), m.text_or_empty(id)?)))
            .collect()
    }

    pub fn content_hashes(&self) -> Result<BTreeMap<String, String>> {
        self.text_map_at(key::CONTENT_HASH)
    }

    pub fn content_urls(&self) -> Result<BTreeMap<String, String>> {
        self.text_map_at(key::CONTENT_URL)
    }

    pub fn part_info(&self) -> Result<Option<PartInfo>> {
        let Some(m) = self.record.map(key::PART_INFO)? else {
            return Ok(None);
        };
        Ok(Some(PartInfo {
            parent_token: m.text_or_empty(part_info::PARENT_TOKEN)?,
            part_value: m.float(part_info::PART_VALUE)?.unwrap_or_default(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{Ed25519Did, KeyRing};

    fn spec(kind: RacKind, n: u64) -> RacSpec {
        RacSpec {
            kind,
            total_supply: n,
            creator_input: "series".into(),
            content_hashes: [("c1".to_string(), "Qm1".to_string())].into(),
            content_urls: [("c1".to_string(), "https://x/1".to_string())].into(),
            part_info: None,
        }
    }

    #[test]
    fn test_series_fan_out() {
        let creator = Ed25519Did::from_seed(&[9; 32]);
        let ring: KeyRing = [creator.clone()].into_iter().collect();

        let units = create_series(&spec(RacKind::Nft, 4), &creator).unwrap();
        assert_eq!(units.len(), 4);
        for (i, u) in units.iter().enumerate() {
            assert_eq!(u.sequence_number().unwrap(), i as u64);
            assert_eq!(u.total_supply().unwrap(), 4);
            assert_eq!(u.creator_did().unwrap(), creator.did());
            assert_eq!(u.version().unwrap(), RAC_VERSION);
            assert_eq!(u.content_hashes().unwrap()["c1"], "Qm1");
            u.verify_signature(&ring).unwrap();
        }
        let mut hashes: Vec<_> = units.iter().map(|u| u.hash().unwrap().to_string()).collect();
        hashes.sort();
        hashes.dedup();
        assert_eq!(hashes.len(), 4);
    }

    #[test]
    fn test_reserved_kind_unsupported() {
        let creator = Ed25519Did::from_seed(&[9; 32]);
        assert!(matches!(
            create_series(&spec(RacKind::LegacyNft, 1), &creator),
            Err(CoreError::UnsupportedType(1))
        ));
        for code in [3, 7, -1] {
            assert!(matches!(
                RacKind::from_code(code),
                Err(CoreError::UnsupportedType(c)) if c == code
            ));
        }
    }

    #[test]
    fn test_decode_roundtrip_and_tamper() {
        let creator = Ed25519Did::from_seed(&[9; 32]);
        let ring: KeyRing = [creator.clone()].into_iter().collect();
        let units = create_series(&spec(RacKind::TestToken, 1), &creator).unwrap();

        let decoded = RacUnit::from_bytes(units[0].bytes().to_vec()).unwrap();
        assert_eq!(decoded.record(), units[0].record());
        decoded.verify_signature(&ring).unwrap();

        let mut forged = decoded.clone();
        forged.update_signature(&"11".repeat(64)).unwrap();
        assert!(matches!(
            forged.verify_signature(&ring),
            Err(CoreError::SignatureInvalid(_))
        ));
    }

    #[test]
    fn test_unsigned_unit_rejected_on_decode() {
        let mut r = Record::new();
        r.insert(key::TYPE.into(), Value::from(0i64));
        let unit = RacUnit::from_record(r).unwrap();
        assert!(matches!(
            RacUnit::from_bytes(unit.bytes().to_vec()),
            Err(CoreError::MissingSignature("signature"))
        ));
    }

    #[test]
    fn test_part_info() {
        let creator = Ed25519Did::from_seed(&[9; 32]);
        let mut s = spec(RacKind::Nft, 1);
        s.part_info = Some(PartInfo {
            parent_token: "P1".into(),
            part_value: 0.5,
        });
        let units = create_series(&s, &creator).unwrap();
        assert_eq!(units[0].part_info().unwrap(), s.part_info);
    }
}
