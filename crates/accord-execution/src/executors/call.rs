//! Contract creation and invocation

use super::{Context, Executor};
use crate::error::{ErrorCode, Exception, ExecutionError, ExecutionResult};
use crate::execution::{Event, TxExecution};
use crate::params::ExecutionMode;
use crate::shared::{credit, debit, prepare_inputs};
use crate::vm::{CallContext, CallParams, Code};
use accord_crypto::contract_address;
use accord_primitives::Address;
use accord_storage::{StateCache, StateReader, StateWriter};
use accord_types::{Account, CallTx, PermFlag};
use bytes::Bytes;
use std::slice;

/// Executes [`CallTx`]
#[derive(Debug, Default, Clone, Copy)]
pub struct CallExecutor;

impl Executor<CallTx> for CallExecutor {
    fn execute(&self, ctx: &Context<'_>, txe: &mut TxExecution, tx: &CallTx) -> ExecutionResult<()> {
        let required = match tx.address {
            None => PermFlag::CREATE_CONTRACT,
            Some(_) => PermFlag::CALL,
        };
        let mut caller = prepare_inputs(ctx, slice::from_ref(&tx.input), required)?.remove(0);

        if tx.fee > tx.input.amount {
            return Err(ExecutionError::InsufficientFunds {
                address: caller.address,
                balance: tx.input.amount,
                required: tx.fee,
            });
        }
        let value = tx.input.amount - tx.fee;
        if let Some(callee) = tx.address {
            if ctx.params.is_reserved(&callee) {
                return Err(ExecutionError::ReservedAddress(callee));
            }
        }

        // Fee and sequence persist whatever the VM does
        debit(&mut caller, tx.fee)?;
        let caller_address = caller.address;
        txe.input(caller_address);

        if ctx.params.mode == ExecutionMode::Check {
            // No VM in check mode; reserve the value so the next check sees it spent
            debit(&mut caller, value)?;
            ctx.ledger.state.update_account(caller)?;
            return Ok(());
        }
        ctx.ledger.state.update_account(caller)?;

        match tx.address {
            None => self.create(ctx, txe, tx, caller_address, value),
            Some(callee) => self.call(ctx, txe, tx, caller_address, callee, value),
        }
    }
}

impl CallExecutor {
    fn create(
        &self,
        ctx: &Context<'_>,
        txe: &mut TxExecution,
        tx: &CallTx,
        caller: Address,
        value: u64,
    ) -> ExecutionResult<()> {
        let contract = contract_address(&caller, &ctx.tx_hash);
        if ctx.ledger.state.get_account(&contract)?.is_some() {
            return Err(ExecutionError::InvalidAddress(contract));
        }

        let frame = StateCache::new(&ctx.ledger.state).named("create");
        frame.update_account(Account::new(contract))?;
        transfer(&frame, caller, contract, value)?;

        let code = if tx.wasm {
            Code::Wasm(&tx.data)
        } else {
            Code::Evm(&tx.data)
        };
        let mut params = CallParams {
            caller,
            callee: contract,
            input: Bytes::new(),
            value,
            gas: tx.gas_limit.min(ctx.params.max_call_gas),
            create: true,
        };
        let gas_limit = params.gas;
        let result = ctx.vm.call(&frame, &call_context(ctx, caller), code, &mut params);
        let gas_used = gas_limit.saturating_sub(params.gas);

        match result {
            Ok(deployed) => {
                let mut account = frame
                    .get_account(&contract)?
                    .ok_or_else(|| ExecutionError::Internal(format!("contract {} vanished", contract)))?;
                if tx.wasm {
                    account.wasm_code = deployed.clone();
                } else {
                    account.evm_code = deployed.clone();
                }
                frame.update_account(account)?;
                frame.sync(&ctx.ledger.state)?;
                txe.return_value(Bytes::copy_from_slice(contract.as_bytes()), gas_used);
                txe.push_event(Event::Call {
                    caller,
                    callee: contract,
                    value,
                    gas_used,
                    create: true,
                });
                tracing::debug!(%caller, %contract, code_len = deployed.len(), "contract created");
            }
            Err(exception) => {
                tracing::info!(%caller, %exception, "contract creation failed");
                txe.return_value(Bytes::new(), gas_used);
                txe.push_error(exception);
            }
        }
        Ok(())
    }

    fn call(
        &self,
        ctx: &Context<'_>,
        txe: &mut TxExecution,
        tx: &CallTx,
        caller: Address,
        callee: Address,
        value: u64,
    ) -> ExecutionResult<()> {
        let account = match ctx.ledger.state.get_account(&callee)? {
            Some(account) if account.has_code() => account,
            Some(_) => {
                tracing::info!(%callee, "call to account without code");
                txe.push_error(Exception::new(
                    ErrorCode::NonContract,
                    format!("account {} has no code", callee),
                ));
                return Ok(());
            }
            None => {
                tracing::info!(%callee, "call to missing account");
                txe.push_error(Exception::new(
                    ErrorCode::InvalidAddress,
                    format!("account {} does not exist", callee),
                ));
                return Ok(());
            }
        };

        let frame = StateCache::new(&ctx.ledger.state).named("call");
        transfer(&frame, caller, callee, value)?;

        let code = if account.evm_code.is_empty() {
            Code::Wasm(&account.wasm_code)
        } else {
            Code::Evm(&account.evm_code)
        };
        let mut params = CallParams {
            caller,
            callee,
            input: tx.data.clone(),
            value,
            gas: tx.gas_limit.min(ctx.params.max_call_gas),
            create: false,
        };
        let gas_limit = params.gas;
        let result = ctx.vm.call(&frame, &call_context(ctx, caller), code, &mut params);
        let gas_used = gas_limit.saturating_sub(params.gas);

        match result {
            Ok(output) => {
                frame.sync(&ctx.ledger.state)?;
                txe.return_value(output, gas_used);
                txe.push_event(Event::Call {
                    caller,
                    callee,
                    value,
                    gas_used,
                    create: false,
                });
                tracing::debug!(%caller, %callee, gas_used, "call succeeded");
            }
            Err(exception) => {
                tracing::info!(%caller, %callee, %exception, "call failed");
                txe.return_value(Bytes::new(), gas_used);
                txe.push_error(exception);
            }
        }
        Ok(())
    }
}

fn call_context(ctx: &Context<'_>, origin: Address) -> CallContext {
    CallContext {
        height: ctx.height,
        tx_hash: ctx.tx_hash,
        origin,
    }
}

/// Move `value` inside a call frame
fn transfer(frame: &StateCache<'_>, from: Address, to: Address, value: u64) -> ExecutionResult<()> {
    if value == 0 {
        return Ok(());
    }
    let mut sender = frame
        .get_account(&from)?
        .ok_or(ExecutionError::InvalidAddress(from))?;
    debit(&mut sender, value)?;
    frame.update_account(sender)?;

    let mut recipient = frame
        .get_account(&to)?
        .ok_or(ExecutionError::InvalidAddress(to))?;
    credit(&mut recipient, value)?;
    frame.update_account(recipient)?;
    Ok(())
}
