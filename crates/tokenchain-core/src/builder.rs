//! Multi-chain block construction.
//!
//! One transaction advances every token it touches in a single block. The
//! builder reads each token's current head, derives the next chain
//! position, and only then builds. If any head cannot be read nothing is
//! built, so a transaction never advances some chains and not others.
//!
//! Reading heads and appending the result must happen under the caller's
//! per-token lock. Two builds from the same head produce the same block
//! number.

use std::collections::{BTreeMap, HashMap};

use crate::block::Block;
use crate::error::{CoreError, Result};
use crate::record::{ChainPosition, TokenChainRecord};

/// Chain position following `head` in `token`'s chain.
///
/// `None` means the token has no chain yet and yields the genesis position.
pub fn next_position(head: Option<&Block>, token: &str) -> Result<ChainPosition> {
    let Some(head) = head else {
        return Ok(ChainPosition::genesis());
    };
    let read = |e: CoreError| CoreError::ChainReadError {
        token: token.to_string(),
        reason: e.to_string(),
    };
    let number = head.block_number(token).map_err(read)?;
    let previous_block_id = head.block_id(token).map_err(read)?;
    let block_number = number.checked_add(1).ok_or_else(|| CoreError::ChainReadError {
        token: token.to_string(),
        reason: "block number overflow".into(),
    })?;
    Ok(ChainPosition {
        block_number,
        previous_block_id,
    })
}

/// Build the next block for every token in `record`.
///
/// `heads` maps a token to its current head block; tokens missing from the
/// map are treated as never having had a chain.
pub fn build_next(heads: &HashMap<String, Block>, record: &TokenChainRecord) -> Result<Block> {
    if record.tokens.is_empty() {
        return Err(CoreError::InvalidInput("transaction has no tokens".into()));
    }
    let positions = record
        .tokens
        .iter()
        .map(|t| Ok((t.token.clone(), next_position(heads.get(&t.token), &t.token)?)))
        .collect::<Result<BTreeMap<_, _>>>()?;
    Block::from_record(record.to_record(&positions)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::TransToken;

    fn transfer(tokens: &[&str]) -> TokenChainRecord {
        TokenChainRecord {
            transaction_type: "02".into(),
            owner: "didA".into(),
            comment: "test".into(),
            tokens: tokens.iter().map(|t| TransToken::new(*t, 0)).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_genesis_when_no_head() {
        let b = build_next(&HashMap::new(), &transfer(&["T1"])).unwrap();
        assert_eq!(b.block_number("T1").unwrap(), 0);
        assert_eq!(b.previous_block_id("T1").unwrap(), "");
    }

    #[test]
    fn test_next_links_to_head() {
        let genesis = build_next(&HashMap::new(), &transfer(&["T1"])).unwrap();
        let mut heads = HashMap::new();
        heads.insert("T1".to_string(), genesis.clone());

        let next = build_next(&heads, &transfer(&["T1"])).unwrap();
        assert_eq!(next.block_number("T1").unwrap(), 1);
        assert_eq!(
            next.previous_block_id("T1").unwrap(),
            genesis.block_id("T1").unwrap()
        );
    }

    #[test]
    fn test_mixed_heads() {
        let genesis = build_next(&HashMap::new(), &transfer(&["T1"])).unwrap();
        let mut heads = HashMap::new();
        heads.insert("T1".to_string(), genesis);

        let b = build_next(&heads, &transfer(&["T1", "T2"])).unwrap();
        assert_eq!(b.block_number("T1").unwrap(), 1);
        assert_eq!(b.block_number("T2").unwrap(), 0);
        assert!(b.is_multi_token().unwrap());
    }

    #[test]
    fn test_unreadable_head_fails_whole_build() {
        // T1's head is T2's block, so it has no position for T1.
        let other = build_next(&HashMap::new(), &transfer(&["T2"])).unwrap();
        let mut heads = HashMap::new();
        heads.insert("T1".to_string(), other);

        let err = build_next(&heads, &transfer(&["T2", "T1"])).unwrap_err();
        assert!(matches!(err, CoreError::ChainReadError { ref token, .. } if token == "T1"));
    }

    #[test]
    fn test_no_tokens() {
        assert!(matches!(
            build_next(&HashMap::new(), &TokenChainRecord::default()),
            Err(CoreError::InvalidInput(_))
        ));
    }
}
