//! Name registry writes

use super::{Context, Executor};
use crate::error::{ExecutionError, ExecutionResult};
use crate::execution::{Event, TxExecution};
use crate::params::NameParams;
use crate::shared::{debit, prepare_inputs};
use accord_storage::{RegistryReader, RegistryWriter, StateWriter};
use accord_types::{NameEntry, NameTx, PermFlag};
use std::slice;

/// Executes [`NameTx`]
#[derive(Debug, Default, Clone, Copy)]
pub struct NameExecutor;

impl Executor<NameTx> for NameExecutor {
    fn execute(&self, ctx: &Context<'_>, txe: &mut TxExecution, tx: &NameTx) -> ExecutionResult<()> {
        let names = &ctx.params.names;
        validate_strings(names, tx)?;
        let mut payer = prepare_inputs(ctx, slice::from_ref(&tx.input), PermFlag::NAME)?.remove(0);
        if tx.fee > tx.input.amount {
            return Err(ExecutionError::InsufficientFunds {
                address: payer.address,
                balance: tx.input.amount,
                required: tx.fee,
            });
        }

        let value = tx.input.amount - tx.fee;
        let cost_per_block = names
            .cost_per_block(&tx.data)
            .ok_or(ExecutionError::IntegerOverflow)?;
        if cost_per_block == 0 {
            return Err(ExecutionError::Internal("name cost multipliers must be positive".into()));
        }
        let expires_in = value / cost_per_block;
        let height = ctx.height;
        let sender = tx.input.address;

        let (entry, removed) = match ctx.ledger.names.get(&tx.name)? {
            Some(mut entry) => {
                let expired = entry.is_expired(height);
                if !expired && entry.owner != sender {
                    tracing::info!(name = %tx.name, owner = %entry.owner, %sender, "name owned by another account");
                    return Err(ExecutionError::PermissionDenied {
                        address: sender,
                        permission: PermFlag::NAME,
                    });
                }

                if value == 0 && tx.data.is_empty() {
                    ctx.ledger.names.remove(&entry.name)?;
                    tracing::trace!(name = %entry.name, "name entry removed");
                    (entry, true)
                } else {
                    let expires_in = if expired {
                        entry.owner = sender;
                        expires_in
                    } else {
                        let remaining = (entry.expires - height)
                            .checked_mul(base_cost(&entry.data))
                            .and_then(|credit| credit.checked_add(value))
                            .ok_or(ExecutionError::IntegerOverflow)?;
                        remaining / cost_per_block
                    };
                    ensure_period(names, expires_in)?;
                    entry.expires = expiry(height, expires_in)?;
                    entry.data = tx.data.clone();
                    ctx.ledger.names.update(entry.name.clone(), entry.clone())?;
                    tracing::trace!(name = %entry.name, expires_in, expired, "name entry updated");
                    (entry, false)
                }
            }
            None => {
                ensure_period(names, expires_in)?;
                let entry = NameEntry {
                    name: tx.name.clone(),
                    owner: sender,
                    data: tx.data.clone(),
                    expires: expiry(height, expires_in)?,
                };
                ctx.ledger.names.update(entry.name.clone(), entry.clone())?;
                tracing::trace!(name = %entry.name, expires_in, "name entry created");
                (entry, false)
            }
        };

        debit(&mut payer, tx.fee)?;
        debit(&mut payer, value)?;
        ctx.ledger.state.update_account(payer)?;

        txe.input(sender);
        txe.push_event(Event::Name { entry, removed });
        Ok(())
    }
}

/// Unscaled per-block cost of keeping `data`
fn base_cost(data: &str) -> u64 {
    data.len() as u64 + 32
}

fn expiry(height: u64, expires_in: u64) -> ExecutionResult<u64> {
    height.checked_add(expires_in).ok_or(ExecutionError::IntegerOverflow)
}

fn ensure_period(names: &NameParams, expires_in: u64) -> ExecutionResult<()> {
    if expires_in < names.min_registration_period {
        return Err(ExecutionError::NameRegistrationPeriod {
            expires_in,
            minimum: names.min_registration_period,
        });
    }
    Ok(())
}

fn validate_strings(names: &NameParams, tx: &NameTx) -> ExecutionResult<()> {
    if tx.name.is_empty() {
        return Err(ExecutionError::InvalidString("name must not be empty".into()));
    }
    if tx.name.len() > names.max_name_length {
        return Err(ExecutionError::InvalidString(format!(
            "name is longer than {} bytes",
            names.max_name_length
        )));
    }
    if tx.data.len() > names.max_data_length {
        return Err(ExecutionError::InvalidString(format!(
            "data is longer than {} bytes",
            names.max_data_length
        )));
    }
    if !tx.name.chars().all(is_name_char) {
        return Err(ExecutionError::InvalidString(format!(
            "invalid characters in name {:?}",
            tx.name
        )));
    }
    if !tx.data.chars().all(is_data_char) {
        return Err(ExecutionError::InvalidString("invalid characters in data".into()));
    }
    Ok(())
}

pub(super) fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '/' | '-' | '@')
}

/// Printable ASCII and whitespace, without escapes
fn is_data_char(c: char) -> bool {
    (c.is_ascii_graphic() && c != '\\') || matches!(c, ' ' | '\t' | '\n' | '\r')
}
