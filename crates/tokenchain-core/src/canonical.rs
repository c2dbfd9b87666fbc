//! Canonical CBOR encoding for deterministic serialization.
//!
//! This module implements RFC 8949 Core Deterministic Encoding over
//! [`Value`]:
//! - Map keys sorted by encoded byte comparison (shorter text keys first)
//! - Integers use smallest valid encoding
//! - Floats use the shortest width that preserves the value exactly
//! - Definite lengths only
//!
//! The canonical encoding is critical: identical field sets produce
//! identical bytes, and therefore identical block hashes, regardless of
//! the order in which fields were inserted.

use ciborium::value::Value as CborValue;
use sha3::{Digest, Sha3_256};

use crate::error::{CoreError, Result};
use crate::value::{Record, Value};

/// Encode a record to canonical CBOR bytes.
///
/// Fails with [`CoreError::EncodingError`] if an integer falls outside the
/// CBOR range `-2^64..2^64`.
pub fn encode_record(record: &Record) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_map_canonical(&mut buf, record.iter())?;
    Ok(buf)
}

/// Encode any value to canonical CBOR bytes.
pub fn encode_value(value: &Value) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_value_to(&mut buf, value)?;
    Ok(buf)
}

/// Decode canonical bytes back into a record.
///
/// The top-level item must be a map. Trailing bytes are rejected.
pub fn decode_record(bytes: &[u8]) -> Result<Record> {
    match decode_value(bytes)? {
        Value::Map(m) => Ok(m),
        other => Err(CoreError::DecodingError(format!(
            "expected map, found {}",
            other.kind()
        ))),
    }
}

/// Decode a single CBOR item into a [`Value`].
pub fn decode_value(bytes: &[u8]) -> Result<Value> {
    let mut cursor = std::io::Cursor::new(bytes);
    let raw: CborValue =
        ciborium::from_reader(&mut cursor).map_err(|e| CoreError::DecodingError(e.to_string()))?;
    if cursor.position() as usize != bytes.len() {
        return Err(CoreError::DecodingError("trailing bytes after item".into()));
    }
    from_cbor(raw)
}

/// SHA3-256 digest of the given bytes.
pub fn sha3_256(data: &[u8]) -> [u8; 32] {
    let mut h = Sha3_256::new();
    h.update(data);
    let out = h.finalize();
    let mut r = [0u8; 32];
    r.copy_from_slice(&out);
    r
}

/// SHA3-256 digest rendered as lowercase hex (the stored hash form).
pub fn hash_hex(data: &[u8]) -> String {
    hex::encode(sha3_256(data))
}

/// Convert a decoded ciborium value into the closed value model.
fn from_cbor(raw: CborValue) -> Result<Value> {
    Ok(match raw {
        CborValue::Integer(i) => Value::Integer(i128::from(i)),
        CborValue::Bytes(b) => Value::Bytes(b),
        CborValue::Float(f) => Value::Float(f),
        CborValue::Text(s) => Value::Text(s),
        CborValue::Bool(b) => Value::Bool(b),
        CborValue::Null => Value::Null,
        CborValue::Array(items) => Value::List(
            items
                .into_iter()
                .map(from_cbor)
                .collect::<Result<Vec<_>>>()?,
        ),
        CborValue::Map(entries) => {
            let mut record = Record::new();
            for (k, v) in entries {
                let key = match k {
                    CborValue::Text(s) => s,
                    _ => {
                        return Err(CoreError::invalid_type("map key", "text"));
                    }
                };
                if record.insert(key.clone(), from_cbor(v)?).is_some() {
                    return Err(CoreError::DecodingError(format!("duplicate map key {key}")));
                }
            }
            Value::Map(record)
        }
        CborValue::Tag(tag, _) => {
            return Err(CoreError::DecodingError(format!("unsupported tag {tag}")));
        }
        _ => return Err(CoreError::DecodingError("unsupported CBOR item".into())),
    })
}

/// Recursively encode a value.
fn encode_value_to(buf: &mut Vec<u8>, value: &Value) -> Result<()> {
    match value {
        Value::Integer(i) => encode_integer(buf, *i)?,
        Value::Bytes(b) => encode_bytes(buf, b),
        Value::Text(s) => encode_text(buf, s),
        Value::List(items) => {
            encode_uint(buf, 4, items.len() as u64);
            for item in items {
                encode_value_to(buf, item)?;
            }
        }
        Value::Map(m) => encode_map_canonical(buf, m.iter())?,
        Value::Bool(b) => buf.push(if *b { 0xf5 } else { 0xf4 }),
        Value::Null => buf.push(0xf6),
        Value::Float(f) => encode_float(buf, *f),
    }
    Ok(())
}

/// Encode a CBOR integer (major types 0 and 1).
fn encode_integer(buf: &mut Vec<u8>, n: i128) -> Result<()> {
    let out_of_range = || CoreError::EncodingError(format!("integer {n} outside CBOR range"));
    if n >= 0 {
        let v = u64::try_from(n).map_err(|_| out_of_range())?;
        encode_uint(buf, 0, v);
    } else {
        // CBOR encodes -1 as 0, -2 as 1, etc.
        let abs = u64::try_from(-1 - n).map_err(|_| out_of_range())?;
        encode_uint(buf, 1, abs);
    }
    Ok(())
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Encode a byte string (major type 2).
fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_uint(buf, 2, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

/// Encode a text string (major type 3).
fn encode_text(buf: &mut Vec<u8>, s: &str) {
    encode_uint(buf, 3, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

/// Encode a float in the shortest exact width (major type 7).
fn encode_float(buf: &mut Vec<u8>, f: f64) {
    if let Some(half) = f16_bits(f) {
        buf.push(0xf9);
        buf.extend_from_slice(&half.to_be_bytes());
    } else if (f as f32) as f64 == f {
        buf.push(0xfa);
        buf.extend_from_slice(&(f as f32).to_bits().to_be_bytes());
    } else {
        buf.push(0xfb);
        buf.extend_from_slice(&f.to_bits().to_be_bytes());
    }
}

/// Half-precision bit pattern of `f` if it is exactly representable.
///
/// NaN always maps to the canonical quiet NaN `0x7e00`.
fn f16_bits(f: f64) -> Option<u16> {
    if f.is_nan() {
        return Some(0x7e00);
    }
    let sign: u16 = if f.is_sign_negative() { 0x8000 } else { 0 };
    if f == 0.0 {
        return Some(sign);
    }
    if f.is_infinite() {
        return Some(sign | 0x7c00);
    }
    let single = f as f32;
    if single as f64 != f {
        return None;
    }
    let bits = single.to_bits();
    let exp = ((bits >> 23) & 0xff) as i32 - 127;
    let mant = bits & 0x7f_ffff;

    if exp > 15 {
        None
    } else if exp >= -14 {
        // Normal half: 10 mantissa bits survive.
        if mant & 0x1fff != 0 {
            return None;
        }
        Some(sign | (((exp + 15) as u16) << 10) | (mant >> 13) as u16)
    } else if exp >= -24 {
        // Subnormal half: value = m * 2^-24 with m < 1024.
        let full = mant | 0x80_0000;
        let shift = (-(exp + 1)) as u32;
        if full & ((1u32 << shift) - 1) != 0 {
            return None;
        }
        Some(sign | (full >> shift) as u16)
    } else {
        None
    }
}

/// Encode a map canonically (major type 5).
///
/// Keys are sorted by their encoded byte comparison.
fn encode_map_canonical<'a>(
    buf: &mut Vec<u8>,
    entries: impl Iterator<Item = (&'a String, &'a Value)>,
) -> Result<()> {
    // Encode all keys first to sort by encoded bytes
    let mut pairs: Vec<(Vec<u8>, &Value)> = entries
        .map(|(k, v)| {
            let mut key_buf = Vec::with_capacity(k.len() + 1);
            encode_text(&mut key_buf, k);
            (key_buf, v)
        })
        .collect();

    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, pairs.len() as u64);
    for (key_bytes, value) in pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value_to(buf, value)?;
    }
    Ok(())
}
