//! Wire key constants for every record family.
//!
//! Keys are short decimal strings so records stay compact on the wire. In
//! every family the hash lives at `98` and the (primary) signature at `99`,
//! the two highest reserved keys, so they can be stripped before hashing.

/// Token chain block record (top level).
pub mod token {
    pub const TRANS_TYPE: &str = "1";
    pub const GENESIS_BLOCK: &str = "2";
    pub const TRANS_TOKENS: &str = "3";
    pub const SMART_CONTRACT: &str = "4";
    pub const SUB_CHAIN_DETAIL: &str = "5";
    pub const OWNER: &str = "6";
    pub const SENDER_DID: &str = "7";
    pub const RECEIVER_DID: &str = "8";
    pub const COMMENT: &str = "9";
    pub const TID: &str = "10";
    pub const WHOLE_TOKENS: &str = "11";
    pub const WHOLE_TOKENS_ID: &str = "12";
    pub const PART_TOKENS: &str = "13";
    pub const PART_TOKENS_ID: &str = "14";
    pub const QUORUM_SIGNATURE: &str = "15";
    pub const PLEDGE_TOKEN: &str = "16";
    pub const TOKENS_PLEDGED_FOR: &str = "17";
    pub const TOKENS_PLEDGED_WITH: &str = "18";
    pub const TOKENS_PLEDGE_MAP: &str = "19";
    pub const PREVIOUS_BLOCK_ID: &str = "20";
    pub const BLOCK_NUMBER: &str = "21";
    pub const SMART_CONTRACT_DATA: &str = "22";
    pub const TOKEN_VALUE: &str = "23";
    pub const CHILD_TOKENS: &str = "24";
    pub const INITIATOR_SIGNATURE: &str = "25";
    pub const NFT_DATA: &str = "26";
    pub const EPOCH: &str = "27";
    pub const PLEDGE_DETAILS: &str = "28";
    pub const REF_ID: &str = "29";
    pub const DEPLOYER_DID: &str = "30";
    pub const EXECUTOR_DID: &str = "31";
    pub const BLOCK_HASH: &str = "98";
    pub const SIGNATURE: &str = "99";
}

/// Genesis block sub-record (`token::GENESIS_BLOCK`).
pub mod genesis {
    pub const TYPE: &str = "1";
    pub const INFO: &str = "2";
}

/// Per-token genesis info (`genesis::INFO` → token → this map).
pub mod genesis_info {
    pub const TOKEN_LEVEL: &str = "1";
    pub const TOKEN_NUMBER: &str = "2";
    pub const MIGRATED_BLOCK_ID: &str = "3";
    pub const PREVIOUS_ID: &str = "4";
    pub const PARENT_ID: &str = "5";
    pub const GRAND_PARENT_ID: &str = "6";
    pub const COMMITTED_TOKENS: &str = "7";
    pub const SMART_CONTRACT_VALUE: &str = "8";
}

/// Per-token transaction details (`token::TRANS_TOKENS` → token → this map).
pub mod trans_token {
    pub const TOKEN_TYPE: &str = "1";
    pub const UNPLEDGED_ID: &str = "2";
    pub const COMMITTED_DID: &str = "3";
}

/// One pledge detail entry (`token::PLEDGE_DETAILS` → DID → list of these).
pub mod pledge {
    pub const TOKEN: &str = "1";
    pub const TOKEN_TYPE: &str = "2";
    pub const TOKEN_BLOCK_ID: &str = "3";
}

/// Quorum and initiator signature entries (text keys, as produced by the
/// consensus layer).
pub mod credit {
    pub const SIGNATURE: &str = "signature";
    pub const PRIV_SIGNATURE: &str = "priv_signature";
    pub const DID: &str = "did";
    pub const HASH: &str = "hash";
    pub const SIGN_TYPE: &str = "sign_type";
    pub const NLSS_SHARE: &str = "nlss_share_signature";
    pub const INITIATOR_DID: &str = "InitiatorDID";
}

/// Smart-contract block record.
pub mod contract {
    pub const TYPE: &str = "1";
    pub const PLEDGE_MODE: &str = "2";
    pub const TRANS_INFO: &str = "3";
    pub const TOTAL_VALUE: &str = "4";
    pub const KEY_SIGNATURE: &str = "97";
    pub const BLOCK_HASH: &str = "98";
    pub const SHARE_SIGNATURE: &str = "99";
}

/// Smart-contract transaction info (`contract::TRANS_INFO`).
pub mod contract_trans {
    pub const SENDER_DID: &str = "1";
    pub const RECEIVER_DID: &str = "2";
    pub const COMMENT: &str = "3";
    pub const TRANS_TOKENS: &str = "4";
    pub const EXCHANGE_TOKENS: &str = "5";
    pub const BATCH_TRANS_TOKENS: &str = "6";
    pub const WHOLE_TOKENS: &str = "7";
    pub const PART_TOKENS: &str = "8";
    pub const COMMITTED_TOKENS: &str = "9";
    pub const DEPLOYER_DID: &str = "10";
    pub const EXECUTOR_DID: &str = "11";
    pub const SMART_CONTRACT_DATA: &str = "12";
}

/// Token info entry inside contract token maps.
pub mod token_info {
    pub const TOKEN_TYPE: &str = "1";
    pub const OWNER_DID: &str = "2";
    pub const BLOCK_ID: &str = "3";
    pub const TOKEN_VALUE: &str = "4";
}

/// RAC unit record.
pub mod rac {
    pub const TYPE: &str = "1";
    pub const CREATOR_DID: &str = "2";
    pub const TOTAL_SUPPLY: &str = "3";
    pub const TOKEN_COUNT: &str = "4";
    pub const CREATOR_INPUT: &str = "5";
    pub const CONTENT_HASH: &str = "6";
    pub const CONTENT_URL: &str = "7";
    pub const VERSION: &str = "8";
    pub const PART_INFO: &str = "9";
    pub const BLOCK_HASH: &str = "98";
    pub const SIGNATURE: &str = "99";
}

/// RAC part info sub-record (`rac::PART_INFO`).
pub mod part_info {
    pub const PARENT_TOKEN: &str = "1";
    pub const PART_VALUE: &str = "2";
}

/// Wire envelope keys.
pub mod envelope {
    pub const CONTENT: &str = "1";
    pub const SIGNATURE: &str = "2";
    pub const KEY_SIGNATURE: &str = "3";
}

/// Transaction type codes stored under `token::TRANS_TYPE`.
pub mod trans_type {
    pub const TOKEN_MINTED: &str = "01";
    pub const TOKEN_TRANSFERRED: &str = "02";
    pub const TOKEN_MIGRATED: &str = "03";
    pub const TOKEN_PLEDGED: &str = "04";
    pub const TOKEN_GENERATED: &str = "05";
    pub const TOKEN_UNPLEDGED: &str = "06";
    pub const TOKEN_COMMITTED: &str = "07";
    pub const TOKEN_BURNT: &str = "08";
    pub const TOKEN_DEPLOYED: &str = "09";
    pub const TOKEN_EXECUTED: &str = "10";
    pub const TOKEN_CONTRACT_COMMITTED: &str = "11";
    pub const TOKEN_PINNED_AS_SERVICE: &str = "12";
    pub const TOKEN_BURNT_FOR_FT: &str = "13";
}
