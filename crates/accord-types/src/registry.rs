//! Records kept in the keyed registries next to account state

use crate::payload::Proposal;
use accord_crypto::PublicKey;
use accord_primitives::{Address, BlockHeight};
use serde::{Deserialize, Serialize};

/// A paid entry in the name registry
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameEntry {
    /// Registered name
    pub name: String,
    /// Account allowed to update or delete the entry while it is live
    pub owner: Address,
    /// Stored data
    pub data: String,
    /// First height at which the entry is expired
    pub expires: BlockHeight,
}

impl NameEntry {
    /// True once `height` reaches the expiry height
    pub fn is_expired(&self, height: BlockHeight) -> bool {
        self.expires <= height
    }
}

/// Lifecycle of a proposal
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalState {
    /// Collecting votes
    #[default]
    Proposed,
    /// Batch ran to completion
    Executed,
    /// Batch ran and a step failed
    Failed,
}

impl ProposalState {
    /// Executed or failed ballots accept no further votes
    pub fn is_final(self) -> bool {
        !matches!(self, ProposalState::Proposed)
    }
}

/// A weighted vote
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    /// Voter
    pub address: Address,
    /// Weight; only positive weights count towards execution
    pub voting_weight: i64,
}

/// A proposal together with its votes
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    /// Proposal being voted on
    pub proposal: Proposal,
    /// At most one vote per address, in first-vote order
    pub votes: Vec<Vote>,
    /// Lifecycle state
    pub state: ProposalState,
}

impl Ballot {
    /// Fresh ballot with no votes
    pub fn new(proposal: Proposal) -> Self {
        Self {
            proposal,
            votes: Vec::new(),
            state: ProposalState::Proposed,
        }
    }

    /// Register a vote, replacing an earlier vote from the same address
    pub fn vote(&mut self, address: Address, voting_weight: i64) {
        match self.votes.iter_mut().find(|v| v.address == address) {
            Some(existing) => existing.voting_weight = voting_weight,
            None => self.votes.push(Vote {
                address,
                voting_weight,
            }),
        }
    }

    /// Votes with positive weight
    pub fn positive_votes(&self) -> usize {
        self.votes.iter().filter(|v| v.voting_weight > 0).count()
    }
}

/// Network identity registered by a validator
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeIdentity {
    /// Human readable name
    pub moniker: String,
    /// Dialable network address
    pub network_address: String,
    /// Node (p2p) key identifier
    pub node_id: Address,
    /// Consensus key of the validator running the node
    pub validator_public_key: PublicKey,
}

/// A validator and its voting power
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    /// Consensus key
    pub public_key: PublicKey,
    /// Voting power; zero means not in the set
    pub power: u64,
}

impl Validator {
    /// Address derived from the consensus key
    pub fn address(&self) -> Address {
        self.public_key.address()
    }
}
