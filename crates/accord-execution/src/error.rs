//! Execution error types
//!
//! Every rejection maps to a stable [`ErrorCode`]. Codes are what execution
//! records carry, so their numbers must never be reused or reordered.

use accord_primitives::{Address, H256};
use accord_storage::StorageError;
use accord_types::PermFlag;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stable numeric error codes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum ErrorCode {
    /// Unclassified failure
    Generic = 1,
    /// Account does not exist or address is malformed
    InvalidAddress = 2,
    /// Address repeated within one transaction
    DuplicateAddress = 3,
    /// Input sequence is not account sequence plus one
    InvalidSequence = 4,
    /// Balance too low
    InsufficientFunds = 5,
    /// Inputs exceed outputs
    Overpayment = 6,
    /// Outputs exceed inputs
    Underpayment = 7,
    /// Nothing transferred
    ZeroPayment = 8,
    /// Required permission not granted
    PermissionDenied = 9,
    /// Name or data fails length or charset rules
    InvalidString = 10,
    /// Proposal missing, malformed or inconsistent
    InvalidProposal = 11,
    /// Batch input sequence no longer matches state
    ExpiredProposal = 12,
    /// Ballot already executed or failed
    ProposalExecuted = 13,
    /// Destination is a reserved address
    ReservedAddress = 14,
    /// Mutation of a read-only cache
    IllegalWrite = 15,
    /// Mutation of an account removed in the same generation
    AlreadyRemoved = 16,
    /// Permission action not allowed in a transaction
    InvalidPermissionAction = 17,
    /// Role already present or absent
    RoleConflict = 18,
    /// No validator power to release
    NothingBonded = 19,
    /// Account has no public key
    MissingPublicKey = 20,
    /// Arithmetic overflow
    IntegerOverflow = 21,
    /// Registration shorter than the minimum period
    NameRegistrationPeriod = 22,
    /// Callee has no code
    NonContract = 23,
    /// Node identity does not match the signer
    InvalidIdentity = 24,
    /// Execution reverted by the VM
    ExecutionReverted = 25,
    /// VM ran out of gas
    InsufficientGas = 26,
    /// Backend failure
    Storage = 27,
    /// Invariant violation inside the executor
    Internal = 28,
}

impl ErrorCode {
    /// Wire number
    pub fn number(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A failure recorded on an execution record instead of aborting it
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exception {
    /// Stable code
    pub code: ErrorCode,
    /// Human readable detail
    pub message: String,
}

impl Exception {
    /// Create an exception
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.code, self.code.number(), self.message)
    }
}

impl From<&ExecutionError> for Exception {
    fn from(err: &ExecutionError) -> Self {
        Exception::new(err.code(), err.to_string())
    }
}

/// Transaction execution errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    /// Account missing or address unusable
    #[error("invalid address {0}")]
    InvalidAddress(Address),

    /// Address appears twice
    #[error("duplicate address {0}")]
    DuplicateAddress(Address),

    /// Sequence mismatch
    #[error("invalid sequence for {address}: expected {expected}, got {got}")]
    InvalidSequence {
        /// Input account
        address: Address,
        /// Account sequence plus one
        expected: u64,
        /// Sequence carried by the input
        got: u64,
    },

    /// Balance too low
    #[error("insufficient funds in {address}: balance {balance}, required {required}")]
    InsufficientFunds {
        /// Debited account
        address: Address,
        /// Available balance
        balance: u64,
        /// Requested amount
        required: u64,
    },

    /// Inputs exceed outputs
    #[error("overpayment: inputs {inputs} exceed outputs {outputs}")]
    Overpayment {
        /// Input total
        inputs: u64,
        /// Output total
        outputs: u64,
    },

    /// Outputs exceed inputs
    #[error("underpayment: outputs {outputs} exceed inputs {inputs}")]
    Underpayment {
        /// Input total
        inputs: u64,
        /// Output total
        outputs: u64,
    },

    /// Nothing transferred
    #[error("zero payment")]
    ZeroPayment,

    /// Missing permission
    #[error("account {address} does not have permission {permission}")]
    PermissionDenied {
        /// Account checked
        address: Address,
        /// Flag required
        permission: PermFlag,
    },

    /// Name or data rejected
    #[error("invalid string: {0}")]
    InvalidString(String),

    /// Proposal missing or malformed
    #[error("invalid proposal: {0}")]
    InvalidProposal(String),

    /// Batch input out of date
    #[error("expired proposal: {0}")]
    ExpiredProposal(String),

    /// Ballot already finished
    #[error("proposal {0} has already been executed")]
    ProposalExecuted(H256),

    /// Destination reserved
    #[error("address {0} is reserved")]
    ReservedAddress(Address),

    /// Permission action not allowed
    #[error("invalid permission action: {0}")]
    InvalidPermissionAction(String),

    /// Role add/remove conflict
    #[error("role conflict on {address}: {role}")]
    RoleConflict {
        /// Target account
        address: Address,
        /// Role named
        role: String,
    },

    /// No power bonded
    #[error("nothing bonded by {0}")]
    NothingBonded(Address),

    /// Public key unknown
    #[error("account {0} has no public key")]
    MissingPublicKey(Address),

    /// Arithmetic overflow
    #[error("integer overflow")]
    IntegerOverflow,

    /// Name registration too short
    #[error("registration of {expires_in} blocks is below the minimum of {minimum}")]
    NameRegistrationPeriod {
        /// Blocks paid for
        expires_in: u64,
        /// Minimum allowed
        minimum: u64,
    },

    /// Node identity rejected
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    /// Storage failure, including read-only and removed-account violations
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl ExecutionError {
    /// Stable code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            ExecutionError::InvalidAddress(_) => ErrorCode::InvalidAddress,
            ExecutionError::DuplicateAddress(_) => ErrorCode::DuplicateAddress,
            ExecutionError::InvalidSequence { .. } => ErrorCode::InvalidSequence,
            ExecutionError::InsufficientFunds { .. } => ErrorCode::InsufficientFunds,
            ExecutionError::Overpayment { .. } => ErrorCode::Overpayment,
            ExecutionError::Underpayment { .. } => ErrorCode::Underpayment,
            ExecutionError::ZeroPayment => ErrorCode::ZeroPayment,
            ExecutionError::PermissionDenied { .. } => ErrorCode::PermissionDenied,
            ExecutionError::InvalidString(_) => ErrorCode::InvalidString,
            ExecutionError::InvalidProposal(_) => ErrorCode::InvalidProposal,
            ExecutionError::ExpiredProposal(_) => ErrorCode::ExpiredProposal,
            ExecutionError::ProposalExecuted(_) => ErrorCode::ProposalExecuted,
            ExecutionError::ReservedAddress(_) => ErrorCode::ReservedAddress,
            ExecutionError::InvalidPermissionAction(_) => ErrorCode::InvalidPermissionAction,
            ExecutionError::RoleConflict { .. } => ErrorCode::RoleConflict,
            ExecutionError::NothingBonded(_) => ErrorCode::NothingBonded,
            ExecutionError::MissingPublicKey(_) => ErrorCode::MissingPublicKey,
            ExecutionError::IntegerOverflow => ErrorCode::IntegerOverflow,
            ExecutionError::NameRegistrationPeriod { .. } => ErrorCode::NameRegistrationPeriod,
            ExecutionError::InvalidIdentity(_) => ErrorCode::InvalidIdentity,
            ExecutionError::Storage(StorageError::IllegalWrite(_)) => ErrorCode::IllegalWrite,
            ExecutionError::Storage(StorageError::AlreadyRemoved(_)) => ErrorCode::AlreadyRemoved,
            ExecutionError::Storage(StorageError::Backend(_)) => ErrorCode::Storage,
            ExecutionError::Internal(_) => ErrorCode::Internal,
        }
    }
}

/// Result type for execution operations
pub type ExecutionResult<T> = Result<T, ExecutionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_errors_keep_their_codes() {
        let err: ExecutionError = StorageError::IllegalWrite("query".into()).into();
        assert_eq!(err.code(), ErrorCode::IllegalWrite);
        let err: ExecutionError = StorageError::AlreadyRemoved(Address::ZERO).into();
        assert_eq!(err.code(), ErrorCode::AlreadyRemoved);
        let err: ExecutionError = StorageError::Backend("disk".into()).into();
        assert_eq!(err.code(), ErrorCode::Storage);
    }

    #[test]
    fn test_code_numbers_are_stable() {
        assert_eq!(ErrorCode::Generic.number(), 1);
        assert_eq!(ErrorCode::InsufficientFunds.number(), 5);
        assert_eq!(ErrorCode::ProposalExecuted.number(), 13);
        assert_eq!(ErrorCode::Internal.number(), 28);
    }

    #[test]
    fn test_exception_from_error() {
        let err = ExecutionError::ZeroPayment;
        let exception = Exception::from(&err);
        assert_eq!(exception.code, ErrorCode::ZeroPayment);
        assert_eq!(exception.to_string(), "ZeroPayment (8): zero payment");
    }
}
