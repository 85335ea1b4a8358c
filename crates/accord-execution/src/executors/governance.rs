//! Privileged account updates

use super::{Context, Executor};
use crate::error::{Exception, ExecutionError, ExecutionResult};
use crate::execution::{Event, TxExecution};
use crate::ledger::LedgerCache;
use crate::shared::{prepare_inputs, write_accounts};
use crate::validators::ValidatorSet;
use accord_primitives::Address;
use accord_storage::{StateReader, StateWriter};
use accord_types::{Account, AccountUpdate, GovTx, PermFlag};

/// Executes [`GovTx`]
///
/// Every update runs in its own generation over the transaction caches, so
/// a failing update leaves nothing behind while its siblings still apply.
#[derive(Debug, Default, Clone, Copy)]
pub struct GovernanceExecutor;

impl Executor<GovTx> for GovernanceExecutor {
    fn execute(&self, ctx: &Context<'_>, txe: &mut TxExecution, tx: &GovTx) -> ExecutionResult<()> {
        let inputs = prepare_inputs(ctx, &tx.inputs, PermFlag::ROOT)?;
        write_accounts(&ctx.ledger.state, inputs)?;
        for input in &tx.inputs {
            txe.input(input.address);
        }

        for update in &tx.updates {
            let layer = LedgerCache::new(ctx.ledger.readers()).named("govern");
            let applied = apply_update(&layer, update).and_then(|address| {
                layer.sync(ctx.ledger.writers())?;
                Ok(address)
            });
            let exception = match applied {
                Ok(address) => {
                    tracing::info!(%address, "governance update applied");
                    None
                }
                Err(err) => {
                    tracing::warn!(error = %err, "governance update rejected");
                    Some(Exception::from(&err))
                }
            };
            txe.push_event(Event::GovernAccount {
                update: update.clone(),
                exception,
            });
        }
        Ok(())
    }
}

/// Target address of an update
fn update_address(update: &AccountUpdate) -> ExecutionResult<Address> {
    match (update.address, &update.public_key) {
        (Some(address), Some(key)) if key.address() != address => {
            Err(ExecutionError::InvalidAddress(address))
        }
        (Some(address), _) => Ok(address),
        (None, Some(key)) => Ok(key.address()),
        (None, None) => Err(ExecutionError::InvalidAddress(Address::ZERO)),
    }
}

fn apply_update(layer: &LedgerCache<'_>, update: &AccountUpdate) -> ExecutionResult<Address> {
    let address = update_address(update)?;
    let mut account = layer
        .state
        .get_account(&address)?
        .unwrap_or_else(|| Account::new(address));

    if let Some(key) = &update.public_key {
        account.public_key = Some(key.clone());
    }
    if let Some(balance) = update.balance {
        account.balance = balance;
    }
    if let Some(code) = &update.code {
        account.evm_code = code.clone();
    }
    if let Some(base) = update.permissions {
        account.permissions.base = base;
    }
    if let Some(roles) = &update.roles {
        account.permissions.roles.clear();
        for role in roles {
            account.permissions.add_role(role);
        }
    }
    if let Some(power) = update.power {
        let key = account
            .public_key
            .clone()
            .ok_or(ExecutionError::MissingPublicKey(address))?;
        let current = layer.validators.power(&key.address())?;
        layer
            .validators
            .alter_power(&key, i128::from(power) - i128::from(current))?;
    }

    layer.state.update_account(account)?;
    Ok(address)
}
