//! JSON dumps of expanded records for inspection and export.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value as Json};

use crate::block::Block;
use crate::contract::ContractBlock;
use crate::error::{CoreError, Result};
use crate::expand::{expand, KeyTable};
use crate::rac::RacUnit;
use crate::value::{Record, Value};

/// Dump formatting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DumpConfig {
    /// Fixed decimal places written for value fields.
    pub value_precision: u32,
    /// Expanded field names treated as token values.
    pub value_fields: Vec<String>,
    pub pretty: bool,
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self {
            value_precision: 5,
            value_fields: ["tokenValue", "smartContractValue", "totalValue", "value"]
                .into_iter()
                .map(String::from)
                .collect(),
            pretty: true,
        }
    }
}

impl DumpConfig {
    fn is_value_field(&self, name: &str) -> bool {
        self.value_fields.iter().any(|f| f == name)
    }
}

fn float(f: f64) -> Json {
    Number::from_f64(f).map(Json::Number).unwrap_or(Json::Null)
}

/// A float written with exactly `precision` decimals, e.g. `1.00000`.
fn fixed(f: f64, precision: u32) -> Json {
    format!("{f:.prec$}", prec = precision as usize)
        .parse::<Number>()
        .map(Json::Number)
        .unwrap_or(Json::Null)
}

fn to_json(field: Option<&str>, v: &Value, cfg: &DumpConfig) -> Json {
    match v {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Integer(i) => match (i64::try_from(*i), u64::try_from(*i)) {
            (Ok(n), _) => Json::from(n),
            (_, Ok(n)) => Json::from(n),
            _ => Json::String(i.to_string()),
        },
        Value::Float(f) => match field {
            Some(name) if cfg.is_value_field(name) => fixed(*f, cfg.value_precision),
            _ => float(*f),
        },
        Value::Text(s) => Json::String(s.clone()),
        Value::Bytes(b) => Json::String(hex::encode(b)),
        Value::List(items) => Json::Array(items.iter().map(|i| to_json(field, i, cfg)).collect()),
        Value::Map(m) => Json::Object(
            m.iter()
                .map(|(k, v)| (k.clone(), to_json(Some(k), v, cfg)))
                .collect::<Map<_, _>>(),
        ),
    }
}

/// Expand `record` with `table` and convert it to JSON.
pub fn record_json(record: &Record, table: &KeyTable, cfg: &DumpConfig) -> Json {
    to_json(None, &Value::Map(expand(record, table)), cfg)
}

pub fn block_json(block: &Block, cfg: &DumpConfig) -> Json {
    record_json(block.record(), KeyTable::token_chain(), cfg)
}

pub fn contract_json(block: &ContractBlock, cfg: &DumpConfig) -> Json {
    record_json(block.record(), KeyTable::contract(), cfg)
}

pub fn rac_json(unit: &RacUnit, cfg: &DumpConfig) -> Json {
    record_json(unit.record(), KeyTable::rac(), cfg)
}

/// Render a whole token chain as a JSON array.
pub fn dump_chain(blocks: &[Block], cfg: &DumpConfig) -> Result<String> {
    let arr = Json::Array(blocks.iter().map(|b| block_json(b, cfg)).collect());
    render(&arr, cfg)
}

pub fn render(json: &Json, cfg: &DumpConfig) -> Result<String> {
    let out = if cfg.pretty {
        serde_json::to_string_pretty(json)
    } else {
        serde_json::to_string(json)
    };
    out.map_err(|e| CoreError::EncodingError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::token;

    #[test]
    fn test_value_fields_rounded_bytes_hex() {
        let mut r = Record::new();
        r.insert(token::TOKEN_VALUE.into(), Value::from(1.123456789));
        r.insert(token::SMART_CONTRACT.into(), Value::Bytes(vec![0xde, 0xad]));
        r.insert("50".into(), Value::from(0.123456789));

        let j = record_json(&r, KeyTable::token_chain(), &DumpConfig::default());
        assert_eq!(j["tokenValue"].to_string(), "1.12346");
        assert_eq!(j["smartContract"], serde_json::json!("dead"));
        assert_eq!(j["50"], serde_json::json!(0.123456789));
    }

    #[test]
    fn test_keys_sorted() {
        let mut r = Record::new();
        r.insert(token::OWNER.into(), Value::from("didA"));
        r.insert(token::COMMENT.into(), Value::from("c"));
        let cfg = DumpConfig {
            pretty: false,
            ..Default::default()
        };
        let out = render(&record_json(&r, KeyTable::token_chain(), &cfg), &cfg).unwrap();
        assert_eq!(out, r#"{"comment":"c","owner":"didA"}"#);
    }

    #[test]
    fn test_value_fields_fixed_decimals() {
        let mut r = Record::new();
        r.insert(token::TOKEN_VALUE.into(), Value::from(1.0));
        r.insert(token::COMMENT.into(), Value::from("c"));
        let cfg = DumpConfig {
            pretty: false,
            ..Default::default()
        };
        let out = render(&record_json(&r, KeyTable::token_chain(), &cfg), &cfg).unwrap();
        assert_eq!(out, r#"{"comment":"c","tokenValue":1.00000}"#);

        let mut r = Record::new();
        r.insert(token::TOKEN_VALUE.into(), Value::from(f64::NAN));
        let j = record_json(&r, KeyTable::token_chain(), &cfg);
        assert!(j["tokenValue"].is_null());
    }
}
