//! Websocket subscription frames and the per-height status they resolve to

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const NEW_BLOCK_EVENT: &str = "tendermint/event/NewBlock";
pub const VOTE_EVENT: &str = "tendermint/event/Vote";

const PREVOTE_TYPE: i32 = 1;
const PRECOMMIT_TYPE: i32 = 2;

/// Final (or in-flight) state of a sequencer at one height. Ordered by severity
/// of participation: a higher value means the sequencer got further.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StatusType {
    Missed = 0,
    Prevote = 1,
    Precommit = 2,
    Signed = 3,
    Proposed = 4,
}

impl StatusType {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn is_miss(self) -> bool {
        self < StatusType::Signed
    }
}

/// Trimmed down subscription reply
#[derive(Debug, Deserialize)]
pub struct WsReply {
    #[serde(default)]
    pub id: serde_json::Value,
    #[serde(default)]
    pub result: Option<WsResult>,
}

#[derive(Debug, Deserialize)]
pub struct WsResult {
    #[serde(default)]
    pub query: String,
    pub data: Option<WsData>,
}

#[derive(Debug, Deserialize)]
pub struct WsData {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RawBlock {
    block: RawBlockBody,
}

#[derive(Debug, Deserialize)]
struct RawBlockBody {
    header: RawHeader,
    #[serde(default)]
    last_commit: Option<RawCommit>,
}

#[derive(Debug, Deserialize)]
struct RawHeader {
    height: String,
    #[serde(default)]
    proposer_address: String,
}

#[derive(Debug, Deserialize)]
struct RawCommit {
    #[serde(default)]
    signatures: Vec<RawSignature>,
}

#[derive(Debug, Deserialize)]
struct RawSignature {
    #[serde(default)]
    validator_address: String,
}

#[derive(Debug, Deserialize)]
struct RawVote {
    #[serde(rename = "Vote")]
    vote: RawVoteBody,
}

#[derive(Debug, Deserialize)]
struct RawVoteBody {
    #[serde(rename = "type")]
    kind: i32,
    height: String,
    validator_address: String,
}

/// Block-stream event: the authoritative record for one height
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizedBlock {
    pub height: i64,
    pub proposer: String,
    pub signers: HashSet<String>,
}

impl FinalizedBlock {
    /// Status of a wire address in this block
    pub fn status_of(&self, address: &str) -> StatusType {
        if self.proposer == address {
            StatusType::Proposed
        } else if self.signers.contains(address) {
            StatusType::Signed
        } else {
            StatusType::Missed
        }
    }
}

/// Vote-stream event: a preliminary observation
#[derive(Debug, Clone, PartialEq)]
pub struct VoteObservation {
    pub height: i64,
    pub validator: String,
    pub status: StatusType,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Block(FinalizedBlock),
    Vote(VoteObservation),
}

/// Decodes one websocket text frame.
///
/// Subscription acks, unrelated event types and votes of other kinds yield
/// `Ok(None)`; a recognised event that does not decode is an error.
pub fn parse_frame(text: &str) -> Result<Option<StreamEvent>> {
    let reply: WsReply = serde_json::from_str(text).map_err(|e| anyhow!("not a subscription reply: {}", e))?;
    let Some(data) = reply.result.and_then(|r| r.data) else {
        return Ok(None);
    };

    match data.kind.as_str() {
        NEW_BLOCK_EVENT => {
            let raw: RawBlock = serde_json::from_value(data.value).map_err(|e| anyhow!("could not decode block: {}", e))?;
            let height = parse_height(&raw.block.header.height)?;
            let signers = raw
                .block
                .last_commit
                .map(|c| c.signatures.into_iter().map(|s| s.validator_address).filter(|a| !a.is_empty()).collect())
                .unwrap_or_default();
            Ok(Some(StreamEvent::Block(FinalizedBlock {
                height,
                proposer: raw.block.header.proposer_address,
                signers,
            })))
        }
        VOTE_EVENT => {
            let raw: RawVote = serde_json::from_value(data.value).map_err(|e| anyhow!("could not decode vote: {}", e))?;
            let status = match raw.vote.kind {
                PREVOTE_TYPE => StatusType::Prevote,
                PRECOMMIT_TYPE => StatusType::Precommit,
                _ => return Ok(None),
            };
            Ok(Some(StreamEvent::Vote(VoteObservation {
                height: parse_height(&raw.vote.height)?,
                validator: raw.vote.validator_address,
                status,
            })))
        }
        _ => Ok(None),
    }
}

fn parse_height(value: &str) -> Result<i64> {
    value.parse::<i64>().map_err(|e| anyhow!("invalid height '{}': {}", value, e))
}
