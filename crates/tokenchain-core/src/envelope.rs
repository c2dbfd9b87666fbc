//! The two-level wire envelope shared by every record family.
//!
//! ```text
//! envelope = { "1": content_bytes, "2"?: slot_bytes, "3"?: slot_bytes }
//! content  = canonical(record minus hash and signature slots)
//! hash     = hex(sha3_256(content))
//! ```
//!
//! Sealing strips the hash and every signature slot from the record before
//! encoding, so the hash is never part of the bytes it is computed over and
//! signatures can be added later without changing the hash.

use crate::canonical::{decode_record, decode_value, encode_record, encode_value, hash_hex};
use crate::error::{CoreError, Result};
use crate::keys::envelope as wire;
use crate::value::{Record, RecordExt, Value};

/// How a signature slot is carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotForm {
    /// The slot value (usually a DID → signature map) is canonically
    /// encoded into a byte string.
    Cbor,
    /// The slot value is a hex signature string carried as raw bytes.
    HexBytes,
}

/// One signature slot: where it lives in the record and on the wire.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Slot {
    pub name: &'static str,
    pub record_key: &'static str,
    pub wire_key: &'static str,
    pub form: SlotForm,
}

/// Record family layout.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Layout {
    pub hash_key: &'static str,
    pub slots: &'static [Slot],
}

impl Layout {
    fn is_excluded(&self, key: &str) -> bool {
        key == self.hash_key || self.slots.iter().any(|s| s.record_key == key)
    }
}

/// Encode `record` into envelope bytes and (re)write its hash field.
///
/// Idempotent with respect to a hash already present in the record.
pub(crate) fn seal(record: &mut Record, layout: &Layout) -> Result<Vec<u8>> {
    let mut envelope = Record::new();
    for slot in layout.slots {
        if let Some(v) = record.get(slot.record_key) {
            envelope.insert(slot.wire_key.to_string(), Value::Bytes(slot_to_wire(slot, v)?));
        }
    }

    let content_record: Record = record
        .iter()
        .filter(|(k, _)| !layout.is_excluded(k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let content = encode_record(&content_record)?;
    record.insert(layout.hash_key.to_string(), Value::Text(hash_hex(&content)));

    envelope.insert(wire::CONTENT.to_string(), Value::Bytes(content));
    encode_record(&envelope)
}

/// Decode envelope bytes into a record with its hash and slots merged in.
///
/// When `require_slots` is set, every slot of the layout must be present.
pub(crate) fn open(bytes: &[u8], layout: &Layout, require_slots: bool) -> Result<Record> {
    let envelope = decode_record(bytes)?;

    if require_slots {
        if let Some(slot) = layout
            .slots
            .iter()
            .find(|s| !envelope.contains_key(s.wire_key))
        {
            return Err(CoreError::MissingSignature(slot.name));
        }
    }

    let content = envelope
        .bytes(wire::CONTENT)?
        .ok_or(CoreError::MissingContent)?;
    let hash = hash_hex(content);
    let mut record = decode_record(content)?;

    for slot in layout.slots {
        if let Some(raw) = envelope.bytes(slot.wire_key)? {
            record.insert(slot.record_key.to_string(), slot_from_wire(slot, raw)?);
        }
    }
    record.insert(layout.hash_key.to_string(), Value::Text(hash));
    Ok(record)
}

/// Recompute the content hash straight from envelope bytes.
pub(crate) fn content_hash(bytes: &[u8]) -> Result<String> {
    let envelope = decode_record(bytes)?;
    let content = envelope
        .bytes(wire::CONTENT)?
        .ok_or(CoreError::MissingContent)?;
    Ok(hash_hex(content))
}

fn slot_to_wire(slot: &Slot, value: &Value) -> Result<Vec<u8>> {
    match slot.form {
        SlotForm::Cbor => encode_value(value),
        SlotForm::HexBytes => {
            let s = value
                .as_str()
                .ok_or_else(|| CoreError::invalid_type(slot.record_key, "hex text"))?;
            hex::decode(s).map_err(|e| CoreError::EncodingError(format!("{}: {e}", slot.name)))
        }
    }
}

fn slot_from_wire(slot: &Slot, raw: &[u8]) -> Result<Value> {
    match slot.form {
        SlotForm::Cbor => decode_value(raw),
        SlotForm::HexBytes => Ok(Value::Text(hex::encode(raw))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SLOTS: &[Slot] = &[Slot {
        name: "signature",
        record_key: "99",
        wire_key: "2",
        form: SlotForm::Cbor,
    }];
    const LAYOUT: Layout = Layout {
        hash_key: "98",
        slots: SLOTS,
    };

    fn sample() -> Record {
        let mut r = Record::new();
        r.insert("1".into(), Value::from("02"));
        r.insert("6".into(), Value::from("didA"));
        r
    }

    #[test]
    fn test_hash_excludes_hash_and_slots() {
        let mut plain = sample();
        let bytes_plain = seal(&mut plain, &LAYOUT).unwrap();
        let hash_plain = plain.text("98").unwrap().unwrap().to_string();

        let mut signed = sample();
        let mut sigs = Record::new();
        sigs.insert("didA".into(), Value::from("abcd"));
        signed.insert("99".into(), Value::Map(sigs));
        signed.insert("98".into(), Value::from("stale"));
        let bytes_signed = seal(&mut signed, &LAYOUT).unwrap();

        assert_eq!(signed.text("98").unwrap().unwrap(), hash_plain);
        assert_ne!(bytes_plain, bytes_signed);
        assert_eq!(content_hash(&bytes_signed).unwrap(), hash_plain);
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let mut r = sample();
        let mut sigs = Record::new();
        sigs.insert("didA".into(), Value::from("abcd"));
        r.insert("99".into(), Value::Map(sigs));
        let bytes = seal(&mut r, &LAYOUT).unwrap();
        assert_eq!(open(&bytes, &LAYOUT, true).unwrap(), r);
    }

    #[test]
    fn test_open_requires_slots() {
        let mut r = sample();
        let bytes = seal(&mut r, &LAYOUT).unwrap();
        assert!(matches!(
            open(&bytes, &LAYOUT, true),
            Err(CoreError::MissingSignature("signature"))
        ));
        assert_eq!(open(&bytes, &LAYOUT, false).unwrap(), r);
    }

    #[test]
    fn test_open_missing_content() {
        let mut env = Record::new();
        env.insert("2".into(), Value::Bytes(encode_record(&Record::new()).unwrap()));
        let bytes = encode_record(&env).unwrap();
        assert!(matches!(
            open(&bytes, &LAYOUT, true),
            Err(CoreError::MissingContent)
        ));
    }
}
