use serde::{Deserialize, Serialize};

/// One committee assignment as returned by the sequencer-set indexer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Epoch {
    pub id: String,
    #[serde(default)]
    pub start_block: String,
    #[serde(default)]
    pub end_block: String,
    // the indexer schema spells it this way
    #[serde(rename = "recommited", default)]
    pub recommitted: bool,
    #[serde(default)]
    pub signer: String,
    #[serde(default)]
    pub block: String,
    #[serde(default)]
    pub block_timestamp: String,
    #[serde(default)]
    pub transaction: String,
}

/// Most recent epochs for one sequencer, newest first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochSnapshot {
    #[serde(rename = "epoches", default)]
    pub epochs: Vec<Epoch>,
    #[serde(default)]
    pub is_now: bool,
}

impl EpochSnapshot {
    pub fn new(epochs: Vec<Epoch>, current_height: Option<u64>) -> Self {
        let is_now = match (epochs.first(), current_height) {
            (Some(latest), Some(height)) => latest.covers(height),
            _ => false,
        };
        Self { epochs, is_now }
    }

    pub fn latest(&self) -> Option<&Epoch> {
        self.epochs.first()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.epochs.iter().any(|e| e.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        self.epochs.iter().map(|e| e.id.clone()).collect()
    }
}

impl Epoch {
    /// Strictly inside the block range
    pub fn covers(&self, height: u64) -> bool {
        match (parse_block_number(&self.start_block), parse_block_number(&self.end_block)) {
            (Some(start), Some(end)) => start < height && height < end,
            _ => false,
        }
    }
}

/// Block numbers come as decimal or `0x` hex strings.
pub fn parse_block_number(value: &str) -> Option<u64> {
    let value = value.trim();
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

/// Indexer ids are hex (with or without `0x`); rewritten to decimal for display.
pub fn decimal_epoch_id(id: &str) -> Option<String> {
    let hex = id.replace("0x", "").replace("0X", "");
    u64::from_str_radix(&hex, 16).ok().map(|n| n.to_string())
}
