//! Execution records and events

use crate::error::Exception;
use accord_primitives::{Address, BlockHeight, H256};
use accord_types::{AccountUpdate, NameEntry, PayloadType, PermAction};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Something a transaction did, recorded for downstream indexing
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum Event {
    /// Account signed as an input
    Input {
        /// Input account
        address: Address,
    },
    /// Account credited as an output
    Output {
        /// Output account
        address: Address,
    },
    /// Contract call or creation
    Call {
        /// Calling account
        caller: Address,
        /// Called or created contract
        callee: Address,
        /// Value moved
        value: u64,
        /// Gas consumed
        gas_used: u64,
        /// True for contract creation
        create: bool,
    },
    /// Permission change
    Permission {
        /// Moderator
        sender: Address,
        /// Change applied
        action: PermAction,
    },
    /// One governance account update, with its failure if any
    GovernAccount {
        /// Requested update
        update: AccountUpdate,
        /// Failure that left this update unapplied
        exception: Option<Exception>,
    },
    /// Name registry change
    Name {
        /// Entry after the change, or the deleted entry
        entry: NameEntry,
        /// True if the entry was deleted
        removed: bool,
    },
    /// Non-fatal failure
    Exception(Exception),
}

/// Return data of a contract call
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallResult {
    /// Bytes returned by the VM
    pub return_data: Bytes,
    /// Gas consumed
    pub gas_used: u64,
}

/// Record of one executed transaction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxExecution {
    /// Hash of the executed payload
    pub tx_hash: H256,
    /// Height of the enclosing block
    pub height: BlockHeight,
    /// Payload kind
    pub payload_type: PayloadType,
    /// Events in emission order
    pub events: Vec<Event>,
    /// Call result, for call transactions that reached the VM
    pub result: Option<CallResult>,
    /// First non-fatal failure
    pub exception: Option<Exception>,
    /// Records of batch steps run by this transaction
    pub executions: Vec<TxExecution>,
}

impl TxExecution {
    /// Empty record
    pub fn new(tx_hash: H256, height: BlockHeight, payload_type: PayloadType) -> Self {
        Self {
            tx_hash,
            height,
            payload_type,
            events: Vec::new(),
            result: None,
            exception: None,
            executions: Vec::new(),
        }
    }

    /// Append an event
    pub fn push_event(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Record an input event
    pub fn input(&mut self, address: Address) {
        self.push_event(Event::Input { address });
    }

    /// Record an output event
    pub fn output(&mut self, address: Address) {
        self.push_event(Event::Output { address });
    }

    /// Record a non-fatal failure; the first one becomes the record's exception
    pub fn push_error(&mut self, exception: Exception) {
        if self.exception.is_none() {
            self.exception = Some(exception.clone());
        }
        self.push_event(Event::Exception(exception));
    }

    /// Record the result of a VM call
    pub fn return_value(&mut self, return_data: Bytes, gas_used: u64) {
        self.result = Some(CallResult {
            return_data,
            gas_used,
        });
    }

    /// True if a non-fatal failure was recorded
    pub fn is_exceptional(&self) -> bool {
        self.exception.is_some()
    }

    /// Events of one variant, for tests and indexers
    pub fn events_matching(&self, pred: impl Fn(&Event) -> bool) -> Vec<&Event> {
        self.events.iter().filter(|e| pred(e)).collect()
    }
}
