//! Transaction payloads
//!
//! The payload set is closed: [`Payload`] has one variant per transaction
//! kind and every consumer matches it exhaustively.

use crate::permission::{BasePermissions, PermAction};
use accord_crypto::{sha256, PublicKey};
use accord_primitives::{Address, H256};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Funds and sequence contributed by one signer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    /// Signing account
    pub address: Address,
    /// Amount debited (meaning depends on the payload kind)
    pub amount: u64,
    /// Must equal the account's current sequence plus one
    pub sequence: u64,
}

/// Funds credited to one recipient
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    /// Recipient
    pub address: Address,
    /// Amount credited
    pub amount: u64,
}

/// Multi-input, multi-output value transfer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendTx {
    /// Senders
    pub inputs: Vec<TxInput>,
    /// Recipients
    pub outputs: Vec<TxOutput>,
}

/// Contract creation (no address) or invocation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallTx {
    /// Caller; `amount` is value plus fee
    pub input: TxInput,
    /// Callee, or `None` to create a contract
    pub address: Option<Address>,
    /// Gas available to the VM
    pub gas_limit: u64,
    /// Fee taken from `input.amount`
    pub fee: u64,
    /// Call data, or init code on create
    pub data: Bytes,
    /// Create a WASM contract instead of an EVM one
    #[serde(default)]
    pub wasm: bool,
}

/// Name registry write
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameTx {
    /// Payer; `amount` is value plus fee
    pub input: TxInput,
    /// Registered name
    pub name: String,
    /// Stored data
    pub data: String,
    /// Fee taken from `input.amount`
    pub fee: u64,
}

/// Permission moderation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermsTx {
    /// Moderator
    pub input: TxInput,
    /// Requested change
    pub action: PermAction,
}

/// Convert balance into validator power
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BondTx {
    /// Validator account; `amount` is the power added
    pub input: TxInput,
}

/// Convert validator power back into balance
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnbondTx {
    /// Validator account
    pub input: TxInput,
    /// Recipient; an `amount` of zero releases all power
    pub output: TxOutput,
}

/// Privileged overwrite of one account
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountUpdate {
    /// Target; derived from `public_key` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    /// Key to attach to the target
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<PublicKey>,
    /// New balance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<u64>,
    /// New validator power
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power: Option<u64>,
    /// New EVM code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<Bytes>,
    /// New base permissions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<BasePermissions>,
    /// Replacement role set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
}

/// Governance transaction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovTx {
    /// Root signers
    pub inputs: Vec<TxInput>,
    /// Independent account updates
    pub updates: Vec<AccountUpdate>,
}

/// Ordered sub-transactions executed together once a proposal passes
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchTx {
    /// Steps in execution order
    pub txs: Vec<Payload>,
}

/// A named batch put to a vote
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    /// Short title
    pub name: String,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// Steps run on execution
    pub batch: BatchTx,
}

impl Proposal {
    /// Identifier: SHA-256 of the canonical JSON encoding
    pub fn hash(&self) -> H256 {
        sha256(&canonical_bytes(self))
    }
}

/// Propose a batch or vote on an existing proposal
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalTx {
    /// Voter
    pub input: TxInput,
    /// Weight of this vote
    pub voting_weight: i64,
    /// Existing proposal to vote on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposal_hash: Option<H256>,
    /// New proposal (voting for it at the same time)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposal: Option<Proposal>,
}

/// Register a validator's node identity
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifyTx {
    /// Validator account
    pub input: TxInput,
    /// Identity to register
    pub node: crate::registry::NodeIdentity,
}

/// Payload kind tag
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadType {
    /// [`SendTx`]
    Send,
    /// [`CallTx`]
    Call,
    /// [`NameTx`]
    Name,
    /// [`PermsTx`]
    Permissions,
    /// [`BondTx`]
    Bond,
    /// [`UnbondTx`]
    Unbond,
    /// [`GovTx`]
    Governance,
    /// [`ProposalTx`]
    Proposal,
    /// [`IdentifyTx`]
    Identify,
}

impl fmt::Display for PayloadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PayloadType::Send => "SendTx",
            PayloadType::Call => "CallTx",
            PayloadType::Name => "NameTx",
            PayloadType::Permissions => "PermsTx",
            PayloadType::Bond => "BondTx",
            PayloadType::Unbond => "UnbondTx",
            PayloadType::Governance => "GovTx",
            PayloadType::Proposal => "ProposalTx",
            PayloadType::Identify => "IdentifyTx",
        };
        f.write_str(s)
    }
}

/// Transaction payload
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "tx", rename_all = "lowercase")]
pub enum Payload {
    /// Value transfer
    Send(SendTx),
    /// Contract call or creation
    Call(CallTx),
    /// Name registry write
    Name(NameTx),
    /// Permission moderation
    Permissions(PermsTx),
    /// Bond
    Bond(BondTx),
    /// Unbond
    Unbond(UnbondTx),
    /// Governance
    Governance(GovTx),
    /// Proposal or vote
    Proposal(ProposalTx),
    /// Node identity registration
    Identify(IdentifyTx),
}

impl Payload {
    /// Kind tag
    pub fn payload_type(&self) -> PayloadType {
        match self {
            Payload::Send(_) => PayloadType::Send,
            Payload::Call(_) => PayloadType::Call,
            Payload::Name(_) => PayloadType::Name,
            Payload::Permissions(_) => PayloadType::Permissions,
            Payload::Bond(_) => PayloadType::Bond,
            Payload::Unbond(_) => PayloadType::Unbond,
            Payload::Governance(_) => PayloadType::Governance,
            Payload::Proposal(_) => PayloadType::Proposal,
            Payload::Identify(_) => PayloadType::Identify,
        }
    }

    /// Signing inputs in declaration order
    pub fn inputs(&self) -> Vec<&TxInput> {
        match self {
            Payload::Send(tx) => tx.inputs.iter().collect(),
            Payload::Governance(tx) => tx.inputs.iter().collect(),
            Payload::Call(CallTx { input, .. })
            | Payload::Name(NameTx { input, .. })
            | Payload::Permissions(PermsTx { input, .. })
            | Payload::Bond(BondTx { input })
            | Payload::Unbond(UnbondTx { input, .. })
            | Payload::Proposal(ProposalTx { input, .. })
            | Payload::Identify(IdentifyTx { input, .. }) => vec![input],
        }
    }

    /// Transaction hash: SHA-256 of the canonical JSON encoding.
    ///
    /// Signatures are checked upstream and are not part of the payload, so
    /// two identical payloads share a hash; the sequence number in every
    /// input keeps them apart on chain.
    pub fn hash(&self) -> H256 {
        sha256(&canonical_bytes(self))
    }
}

macro_rules! impl_from_tx {
    ($($tx:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$tx> for Payload {
                fn from(tx: $tx) -> Self {
                    Payload::$variant(tx)
                }
            }
        )*
    };
}

impl_from_tx! {
    SendTx => Send,
    CallTx => Call,
    NameTx => Name,
    PermsTx => Permissions,
    BondTx => Bond,
    UnbondTx => Unbond,
    GovTx => Governance,
    ProposalTx => Proposal,
    IdentifyTx => Identify,
}

fn canonical_bytes<T: Serialize>(value: &T) -> Vec<u8> {
    // serde_json only fails on non-string map keys or a failing Serialize
    // impl. Payloads hold neither: derived impls over strings, integers and
    // hex-encoded bytes.
    serde_json::to_vec(value).expect("payloads always serialize to JSON")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(seed: u8, amount: u64, sequence: u64) -> TxInput {
        TxInput {
            address: Address::from_bytes([seed; 20]),
            amount,
            sequence,
        }
    }

    #[test]
    fn test_payload_type_and_inputs() {
        let send: Payload = SendTx {
            inputs: vec![input(1, 5, 1), input(2, 5, 1)],
            outputs: vec![TxOutput {
                address: Address::from_bytes([3; 20]),
                amount: 10,
            }],
        }
        .into();
        assert_eq!(send.payload_type(), PayloadType::Send);
        assert_eq!(send.inputs().len(), 2);

        let bond: Payload = BondTx { input: input(1, 5, 2) }.into();
        assert_eq!(bond.payload_type().to_string(), "BondTx");
        assert_eq!(bond.inputs()[0].sequence, 2);
    }

    #[test]
    fn test_hash_depends_on_sequence() {
        let a: Payload = BondTx { input: input(1, 5, 1) }.into();
        let b: Payload = BondTx { input: input(1, 5, 2) }.into();
        assert_eq!(a.hash(), a.clone().hash());
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn test_every_kind_has_a_distinct_hash() {
        use crate::permission::PermFlag;

        let payloads: Vec<Payload> = vec![
            BondTx { input: input(1, 5, 1) }.into(),
            CallTx {
                input: input(1, 5, 1),
                address: None,
                gas_limit: 100,
                fee: 1,
                data: Bytes::from_static(&[0x60, 0x00]),
                wasm: false,
            }
            .into(),
            NameTx {
                input: input(1, 5, 1),
                name: "n".into(),
                data: "d".into(),
                fee: 0,
            }
            .into(),
            PermsTx {
                input: input(1, 5, 1),
                action: PermAction::SetGlobal {
                    permission: PermFlag::SEND,
                    value: true,
                },
            }
            .into(),
            GovTx {
                inputs: vec![input(1, 5, 1)],
                updates: vec![AccountUpdate {
                    code: Some(Bytes::from_static(&[1, 2])),
                    permissions: Some(BasePermissions::ZERO),
                    ..AccountUpdate::default()
                }],
            }
            .into(),
        ];

        let empty = sha256(&[]);
        let mut hashes: Vec<H256> = payloads.iter().map(Payload::hash).collect();
        for (payload, hash) in payloads.iter().zip(&hashes) {
            let bytes = canonical_bytes(payload);
            assert!(serde_json::from_slice::<serde_json::Value>(&bytes).is_ok());
            assert_ne!(*hash, empty);
        }
        hashes.sort();
        hashes.dedup();
        assert_eq!(hashes.len(), payloads.len());
    }

    #[test]
    fn test_nested_batch_serde_roundtrip() {
        let proposal = Proposal {
            name: "mint".into(),
            description: "top up the treasury".into(),
            batch: BatchTx {
                txs: vec![SendTx {
                    inputs: vec![input(1, 1, 1)],
                    outputs: vec![TxOutput {
                        address: Address::from_bytes([9; 20]),
                        amount: 1,
                    }],
                }
                .into()],
            },
        };
        let tx: Payload = ProposalTx {
            input: input(2, 0, 1),
            voting_weight: 1,
            proposal_hash: None,
            proposal: Some(proposal.clone()),
        }
        .into();

        let json = serde_json::to_string(&tx).unwrap();
        let back: Payload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tx);
        assert_eq!(back.hash(), tx.hash());
        assert_ne!(proposal.hash(), H256::ZERO);
    }
}
