//! Sample sequencers and epochs

use serde_json::{json, Value};

pub const CHAIN_ID: &str = "andromeda";
pub const SEQUENCER_ADDRESS: &str = "0x81fc9d26d6b234f9cc6a84bcfefc679cb64a227a";
pub const OTHER_ADDRESS: &str = "0x1111111111111111111111111111111111111111";

/// Epoch as the indexer returns it: hex id, decimal block numbers
pub fn indexer_epoch(id: u64, start_block: u64, end_block: u64) -> Value {
    json!({
        "id": format!("{:#x}", id),
        "startBlock": start_block.to_string(),
        "endBlock": end_block.to_string(),
        "signer": SEQUENCER_ADDRESS,
        "transaction": format!("0xtx{}", id),
        "recommited": false,
        "block": (1000 + id).to_string(),
        "blockTimestamp": "1700000000"
    })
}

pub fn validator(id: u64, signer: &str, jailed: bool) -> Value {
    json!({
        "ID": id,
        "signer": signer,
        "jailed": jailed,
        "power": 100
    })
}
