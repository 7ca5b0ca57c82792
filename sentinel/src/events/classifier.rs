//! Merges the vote and block streams into one status per (sequencer, height)

use std::collections::{BTreeMap, HashMap};

use super::types::{FinalizedBlock, StatusType, VoteObservation};
use crate::sequencer::SequencerId;

/// Final classification of one sequencer at one height
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Finalization {
    pub id: SequencerId,
    pub height: i64,
    pub status: StatusType,
}

/// Addresses are upper-case hex without `0x`, as they appear on the wire.
pub fn wire_address(address: &str) -> String {
    address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .unwrap_or(address)
        .to_uppercase()
}

pub struct Classifier {
    targets: Vec<(SequencerId, String)>,
    /// Running maximum of vote observations for heights not yet finalized
    pending: HashMap<SequencerId, BTreeMap<i64, StatusType>>,
}

impl Classifier {
    pub fn new(targets: Vec<(SequencerId, String)>) -> Self {
        Self {
            targets: targets
                .into_iter()
                .map(|(id, address)| (id, wire_address(&address)))
                .collect(),
            pending: HashMap::new(),
        }
    }

    pub fn observe_vote(&mut self, vote: &VoteObservation) {
        for (id, address) in &self.targets {
            if *address != vote.validator {
                continue;
            }
            let entry = self
                .pending
                .entry(*id)
                .or_default()
                .entry(vote.height)
                .or_insert(vote.status);
            if vote.status > *entry {
                *entry = vote.status;
            }
        }
    }

    /// Concludes `block.height` for every tracked sequencer.
    ///
    /// The block decides signed or proposed outright. When it reports a miss,
    /// the running maximum tags it as a prevote or precommit miss.
    pub fn finalize(&mut self, block: &FinalizedBlock) -> Vec<Finalization> {
        let mut results = Vec::with_capacity(self.targets.len());

        for (id, address) in &self.targets {
            let observed = self
                .pending
                .get(id)
                .and_then(|heights| heights.get(&block.height))
                .copied();

            let status = match block.status_of(address) {
                StatusType::Missed => observed.unwrap_or(StatusType::Missed),
                decided => decided,
            };

            if let Some(heights) = self.pending.get_mut(id) {
                *heights = heights.split_off(&(block.height + 1));
            }

            results.push(Finalization {
                id: *id,
                height: block.height,
                status,
            });
        }

        results
    }

    pub fn pending_heights(&self) -> usize {
        self.pending.values().map(BTreeMap::len).sum()
    }
}
