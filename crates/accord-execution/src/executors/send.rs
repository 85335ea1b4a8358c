//! Value transfer

use super::{Context, Executor};
use crate::error::{ExecutionError, ExecutionResult};
use crate::execution::TxExecution;
use crate::shared::{checked_total, credit, debit, get_or_make_output, prepare_inputs, write_accounts};
use accord_types::{PermFlag, SendTx};
use std::collections::BTreeSet;

/// Executes [`SendTx`]
#[derive(Debug, Default, Clone, Copy)]
pub struct SendExecutor;

impl Executor<SendTx> for SendExecutor {
    fn execute(&self, ctx: &Context<'_>, txe: &mut TxExecution, tx: &SendTx) -> ExecutionResult<()> {
        let mut inputs = prepare_inputs(ctx, &tx.inputs, PermFlag::SEND)?;

        let mut seen: BTreeSet<_> = tx.inputs.iter().map(|i| i.address).collect();
        for output in &tx.outputs {
            if !seen.insert(output.address) {
                return Err(ExecutionError::DuplicateAddress(output.address));
            }
        }

        let in_total = checked_total(tx.inputs.iter().map(|i| i.amount))?;
        let out_total = checked_total(tx.outputs.iter().map(|o| o.amount))?;
        if in_total > out_total {
            return Err(ExecutionError::Overpayment {
                inputs: in_total,
                outputs: out_total,
            });
        }
        if in_total < out_total {
            return Err(ExecutionError::Underpayment {
                inputs: in_total,
                outputs: out_total,
            });
        }
        if out_total == 0 {
            return Err(ExecutionError::ZeroPayment);
        }

        let state = &ctx.ledger.state;
        let mut outputs = Vec::with_capacity(tx.outputs.len());
        for output in &tx.outputs {
            outputs.push(get_or_make_output(state, &inputs, &ctx.global, output.address)?);
        }

        for (account, input) in inputs.iter_mut().zip(&tx.inputs) {
            debit(account, input.amount)?;
        }
        for (account, output) in outputs.iter_mut().zip(&tx.outputs) {
            credit(account, output.amount)?;
        }

        for input in &tx.inputs {
            txe.input(input.address);
        }
        for output in &tx.outputs {
            txe.output(output.address);
        }
        write_accounts(state, inputs.into_iter().chain(outputs))?;

        tracing::debug!(inputs = tx.inputs.len(), outputs = tx.outputs.len(), amount = in_total, "send accepted");
        Ok(())
    }
}

