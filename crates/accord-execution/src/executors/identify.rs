//! Validator node identity registration

use super::{Context, Executor};
use crate::error::{ExecutionError, ExecutionResult};
use crate::execution::TxExecution;
use crate::shared::prepare_inputs;
use crate::validators::ValidatorSet;
use accord_storage::{RegistryWriter, StateWriter};
use accord_types::{IdentifyTx, PermFlag};
use std::slice;

/// Executes [`IdentifyTx`]
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentifyExecutor;

impl Executor<IdentifyTx> for IdentifyExecutor {
    fn execute(&self, ctx: &Context<'_>, txe: &mut TxExecution, tx: &IdentifyTx) -> ExecutionResult<()> {
        let account = prepare_inputs(ctx, slice::from_ref(&tx.input), PermFlag::IDENTIFY)?.remove(0);
        let public_key = account
            .public_key
            .clone()
            .ok_or(ExecutionError::MissingPublicKey(account.address))?;
        if public_key != tx.node.validator_public_key {
            return Err(ExecutionError::InvalidIdentity(format!(
                "node validator key {} does not belong to {}",
                tx.node.validator_public_key, account.address
            )));
        }
        let validator = public_key.address();
        if ctx.ledger.validators.power(&validator)? == 0 {
            return Err(ExecutionError::InvalidIdentity(format!(
                "{} is not a validator",
                validator
            )));
        }
        if tx.node.moniker.is_empty() || tx.node.network_address.is_empty() {
            return Err(ExecutionError::InvalidIdentity(
                "moniker and network address must not be empty".into(),
            ));
        }

        let address = account.address;
        ctx.ledger.state.update_account(account)?;
        ctx.ledger.nodes.update(validator, tx.node.clone())?;

        tracing::info!(%validator, node = %tx.node.node_id, moniker = %tx.node.moniker, "node identified");
        txe.input(address);
        Ok(())
    }
}
