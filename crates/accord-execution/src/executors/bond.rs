//! Moving balance into and out of validator power

use super::{Context, Executor};
use crate::error::{ExecutionError, ExecutionResult};
use crate::execution::TxExecution;
use crate::shared::{credit, debit, get_or_make_output, prepare_inputs};
use crate::validators::ValidatorSet;
use accord_storage::StateWriter;
use accord_types::{BondTx, PermFlag, UnbondTx};
use std::slice;

/// Executes [`BondTx`]
#[derive(Debug, Default, Clone, Copy)]
pub struct BondExecutor;

impl Executor<BondTx> for BondExecutor {
    fn execute(&self, ctx: &Context<'_>, txe: &mut TxExecution, tx: &BondTx) -> ExecutionResult<()> {
        let mut account = prepare_inputs(ctx, slice::from_ref(&tx.input), PermFlag::BOND)?.remove(0);
        let public_key = account
            .public_key
            .clone()
            .ok_or(ExecutionError::MissingPublicKey(account.address))?;
        if tx.input.amount == 0 {
            return Err(ExecutionError::ZeroPayment);
        }

        debit(&mut account, tx.input.amount)?;
        let address = account.address;
        ctx.ledger.state.update_account(account)?;
        let power = ctx
            .ledger
            .validators
            .alter_power(&public_key, i128::from(tx.input.amount))?;

        tracing::info!(account = %address, validator = %public_key.address(), amount = tx.input.amount, power, "bonded");
        txe.input(address);
        Ok(())
    }
}

/// Executes [`UnbondTx`]
#[derive(Debug, Default, Clone, Copy)]
pub struct UnbondExecutor;

impl Executor<UnbondTx> for UnbondExecutor {
    fn execute(&self, ctx: &Context<'_>, txe: &mut TxExecution, tx: &UnbondTx) -> ExecutionResult<()> {
        let accounts = prepare_inputs(ctx, slice::from_ref(&tx.input), PermFlag::BOND)?;
        let account = &accounts[0];
        let public_key = account
            .public_key
            .clone()
            .ok_or(ExecutionError::MissingPublicKey(account.address))?;
        let validator = public_key.address();
        let power = ctx.ledger.validators.power(&validator)?;
        if power == 0 {
            return Err(ExecutionError::NothingBonded(validator));
        }

        let amount = match tx.output.amount {
            0 => power,
            amount if amount > power => {
                return Err(ExecutionError::InsufficientFunds {
                    address: validator,
                    balance: power,
                    required: amount,
                })
            }
            amount => amount,
        };

        let state = &ctx.ledger.state;
        let input_address = account.address;
        let same_account = tx.output.address == input_address;
        let mut recipient = if same_account {
            account.clone()
        } else {
            get_or_make_output(state, &accounts, &ctx.global, tx.output.address)?
        };
        if !same_account {
            state.update_account(account.clone())?;
        }
        credit(&mut recipient, amount)?;
        state.update_account(recipient)?;
        let remaining = ctx
            .ledger
            .validators
            .alter_power(&public_key, -i128::from(amount))?;

        tracing::info!(account = %input_address, %validator, amount, remaining, "unbonded");
        txe.input(input_address);
        txe.output(tx.output.address);
        Ok(())
    }
}

