//! Contract VM seam
//!
//! Interpreters live outside this crate. A call hands the VM a call-frame
//! [`StateCache`] as its working set; the frame is synced into the
//! transaction only when the VM returns successfully.

use crate::error::Exception;
use accord_primitives::{Address, BlockHeight, H256};
use accord_storage::StateCache;
use bytes::Bytes;

/// Code to run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Code<'c> {
    /// EVM bytecode
    Evm(&'c [u8]),
    /// WASM module
    Wasm(&'c [u8]),
}

impl Code<'_> {
    /// Raw bytes
    pub fn bytes(&self) -> &[u8] {
        match self {
            Code::Evm(code) | Code::Wasm(code) => code,
        }
    }
}

/// Block and transaction the call runs in
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallContext {
    /// Block height
    pub height: BlockHeight,
    /// Hash of the enclosing transaction
    pub tx_hash: H256,
    /// Signer of the enclosing transaction
    pub origin: Address,
}

/// Parameters of one call frame
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallParams {
    /// Immediate caller
    pub caller: Address,
    /// Account whose code runs
    pub callee: Address,
    /// Call data; empty on create
    pub input: Bytes,
    /// Value already moved from caller to callee in the frame
    pub value: u64,
    /// Gas remaining; the VM decrements it
    pub gas: u64,
    /// Run `code` as init code and return the deployed code
    pub create: bool,
}

/// An external contract interpreter
pub trait VirtualMachine: Send + Sync {
    /// Run `code` against `frame`.
    ///
    /// Returns the output bytes (the deployed code on create) or the
    /// exception that aborted the call. Writes made to `frame` are discarded
    /// on exception.
    fn call(
        &self,
        frame: &StateCache<'_>,
        ctx: &CallContext,
        code: Code<'_>,
        params: &mut CallParams,
    ) -> Result<Bytes, Exception>;
}
