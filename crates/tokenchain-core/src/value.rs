//! The record value model.
//!
//! Records are schema-less maps from short numeric-string keys to values.
//! [`Value`] is a closed sum type over every shape the wire format can
//! carry; all reads go through checked accessors that report
//! [`CoreError::InvalidType`] instead of panicking on malformed input.
//!
//! There is exactly one map representation ([`Record`]); the wire decoder
//! rejects non-text map keys rather than keeping a second map flavour.

use std::collections::BTreeMap;

use crate::error::{CoreError, Result};

/// A decoded record: short string keys to values.
///
/// `BTreeMap` gives a stable iteration order for diagnostics. Canonical
/// byte ordering is applied by the encoder, not by this map.
pub type Record = BTreeMap<String, Value>;

/// A single record value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    /// Every wire integer width (int8..int64, uint64) lands here.
    Integer(i128),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Map(Record),
}

impl Value {
    /// Name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Record> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut Record> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Coerce to a signed 64-bit integer.
    ///
    /// Accepts any wire integer width, integral floats and decimal text.
    /// Returns `None` for genuinely non-numeric values or out-of-range
    /// numbers.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => i64::try_from(*i).ok(),
            Value::Float(f) if f.fract() == 0.0 && f.is_finite() => {
                if *f >= i64::MIN as f64 && *f <= i64::MAX as f64 {
                    Some(*f as i64)
                } else {
                    None
                }
            }
            Value::Text(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
    }

    /// Coerce to an unsigned 64-bit integer (same rules as [`Value::as_i64`]).
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Integer(i) => u64::try_from(*i).ok(),
            Value::Text(s) => s.trim().parse::<u64>().ok(),
            other => other.as_i64().and_then(|i| u64::try_from(i).ok()),
        }
    }

    /// Coerce to a float. Integers are widened.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Build a list of text values.
    pub fn text_list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Value::List(items.into_iter().map(|s| Value::Text(s.into())).collect())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::Text(s.clone())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(l: Vec<Value>) -> Self {
        Value::List(l)
    }
}

impl From<Record> for Value {
    fn from(m: Record) -> Self {
        Value::Map(m)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(i: $t) -> Self {
                    Value::Integer(i as i128)
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32, u64, usize);

/// Checked field access on a [`Record`].
///
/// Every accessor distinguishes "absent" (`Ok(None)`) from "present with the
/// wrong shape" (`Err(InvalidType)`).
pub trait RecordExt {
    fn text(&self, key: &str) -> Result<Option<&str>>;
    fn bytes(&self, key: &str) -> Result<Option<&[u8]>>;
    fn map(&self, key: &str) -> Result<Option<&Record>>;
    fn list(&self, key: &str) -> Result<Option<&[Value]>>;
    fn int(&self, key: &str) -> Result<Option<i64>>;
    fn float(&self, key: &str) -> Result<Option<f64>>;

    /// Read a list of strings, accepting any list whose items are all text.
    fn string_list(&self, key: &str) -> Result<Option<Vec<String>>>;

    /// Text field, empty string when absent.
    fn text_or_empty(&self, key: &str) -> Result<String> {
        Ok(self.text(key)?.unwrap_or_default().to_string())
    }
}

impl RecordExt for Record {
    fn text(&self, key: &str) -> Result<Option<&str>> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => v
                .as_str()
                .map(Some)
                .ok_or_else(|| CoreError::invalid_type(key, "text")),
        }
    }

    fn bytes(&self, key: &str) -> Result<Option<&[u8]>> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => v
                .as_bytes()
                .map(Some)
                .ok_or_else(|| CoreError::invalid_type(key, "bytes")),
        }
    }

    fn map(&self, key: &str) -> Result<Option<&Record>> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => v
                .as_map()
                .map(Some)
                .ok_or_else(|| CoreError::invalid_type(key, "map")),
        }
    }

    fn list(&self, key: &str) -> Result<Option<&[Value]>> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => v
                .as_list()
                .map(Some)
                .ok_or_else(|| CoreError::invalid_type(key, "list")),
        }
    }

    fn int(&self, key: &str) -> Result<Option<i64>> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => v
                .as_i64()
                .map(Some)
                .ok_or_else(|| CoreError::invalid_type(key, "integer")),
        }
    }

    fn float(&self, key: &str) -> Result<Option<f64>> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => v
                .as_f64()
                .map(Some)
                .ok_or_else(|| CoreError::invalid_type(key, "float")),
        }
    }

    fn string_list(&self, key: &str) -> Result<Option<Vec<String>>> {
        let Some(items) = self.list(key)? else {
            return Ok(None);
        };
        items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| CoreError::invalid_type(key, "list of text"))
            })
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_widths_coerce() {
        assert_eq!(Value::from(7u8).as_i64(), Some(7));
        assert_eq!(Value::from(-7i8).as_i64(), Some(-7));
        assert_eq!(Value::from(u64::MAX).as_u64(), Some(u64::MAX));
        assert_eq!(Value::from(u64::MAX).as_i64(), None);
        assert_eq!(Value::Float(3.0).as_i64(), Some(3));
        assert_eq!(Value::Float(3.5).as_i64(), None);
        assert_eq!(Value::from("12").as_u64(), Some(12));
        assert_eq!(Value::Bytes(vec![1]).as_i64(), None);
    }

    #[test]
    fn test_record_ext_absent_vs_wrong_type() {
        let mut r = Record::new();
        r.insert("1".into(), Value::from("hello"));
        r.insert("2".into(), Value::from(5u32));

        assert_eq!(r.text("1").unwrap(), Some("hello"));
        assert_eq!(r.text("3").unwrap(), None);
        assert!(matches!(
            r.text("2"),
            Err(CoreError::InvalidType { .. })
        ));
        assert_eq!(r.int("2").unwrap(), Some(5));
        assert!(r.int("1").is_err());
    }

    #[test]
    fn test_string_list_normalizes_generic_list() {
        let mut r = Record::new();
        r.insert("11".into(), Value::text_list(["a", "b"]));
        r.insert(
            "12".into(),
            Value::List(vec![Value::from("a"), Value::from(1u8)]),
        );

        assert_eq!(
            r.string_list("11").unwrap(),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert!(r.string_list("12").is_err());
        assert_eq!(r.string_list("13").unwrap(), None);
    }

    #[test]
    fn test_null_reads_as_absent() {
        let mut r = Record::new();
        r.insert("9".into(), Value::Null);
        assert_eq!(r.text("9").unwrap(), None);
        assert_eq!(r.text_or_empty("9").unwrap(), "");
    }
}
