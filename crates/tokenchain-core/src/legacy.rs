//! Read-only access to pre-canonical token chains.
//!
//! Old chains are a JSON array of blocks with named keys. They are only
//! read during migration, never written. Their chain hash is computed over
//! a hand-ordered JSON-like rendering rather than canonical bytes.

use std::path::Path;

use serde_json::{Map, Value as Json};

use crate::canonical::hash_hex;
use crate::error::{CoreError, Result};

/// Key order used when rendering a legacy chain for hashing. Keys not in
/// this list are left out.
pub const LEGACY_HASH_KEYS: &[&str] = &[
    "owner",
    "tokensPledgedWith",
    "tokensPledgedFor",
    "receiver",
    "sender",
    "senderSign",
    "comment",
    "distributedObject",
    "tid",
    "pledgeToken",
    "hash",
    "group",
    "pvtShareBits",
];

const STAKED_TOKEN: &str = "stakedToken";

/// A legacy token chain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LegacyChain {
    blocks: Vec<Map<String, Json>>,
}

impl LegacyChain {
    pub fn from_json_str(s: &str) -> Result<Self> {
        let blocks: Vec<Map<String, Json>> = serde_json::from_str(s)
            .map_err(|e| CoreError::DecodingError(format!("legacy chain: {e}")))?;
        Ok(Self { blocks })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .map_err(|e| CoreError::DecodingError(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&s)
    }

    pub fn blocks(&self) -> &[Map<String, Json>] {
        &self.blocks
    }

    pub fn height(&self) -> usize {
        self.blocks.len()
    }

    /// Token staked when the chain was mined, from the first block.
    pub fn staked_token(&self) -> Option<&str> {
        self.blocks.first()?.get(STAKED_TOKEN)?.as_str()
    }

    /// The string the legacy chain hash is computed over.
    ///
    /// The last block's `hash` and `pvtShareBits` are excluded. Empty chains
    /// render as an empty string.
    pub fn chain_hash_input(&self) -> Result<String> {
        let Some((last, rest)) = self.blocks.split_last() else {
            return Ok(String::new());
        };
        let mut last = last.clone();
        last.remove("hash");
        last.remove("pvtShareBits");

        let mut out = String::from("[");
        for (i, block) in rest.iter().chain(std::iter::once(&last)).enumerate() {
            if i > 0 {
                out.push(',');
            }
            render_object(&mut out, block)?;
        }
        out.push(']');
        Ok(out)
    }

    /// Hex SHA3-256 of [`LegacyChain::chain_hash_input`].
    pub fn chain_hash(&self) -> Result<String> {
        Ok(hash_hex(self.chain_hash_input()?.as_bytes()))
    }
}

fn render_object(out: &mut String, m: &Map<String, Json>) -> Result<()> {
    out.push('{');
    let mut first = true;
    for key in LEGACY_HASH_KEYS {
        let Some(v) = m.get(*key) else { continue };
        if !first {
            out.push(',');
        }
        first = false;
        out.push('"');
        out.push_str(key);
        out.push_str("\":");
        render(out, v)?;
    }
    out.push('}');
    Ok(())
}

// Strings are emitted verbatim without escaping.
fn render(out: &mut String, v: &Json) -> Result<()> {
    match v {
        Json::String(s) => {
            out.push('"');
            out.push_str(s);
            out.push('"');
        }
        Json::Object(m) => render_object(out, m)?,
        Json::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                render(out, item)?;
            }
            out.push(']');
        }
        other => {
            return Err(CoreError::EncodingError(format!(
                "legacy chain hash: unsupported value {other}"
            )))
        }
    }
    Ok(())
}
