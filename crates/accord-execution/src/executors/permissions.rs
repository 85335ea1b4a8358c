//! Permission moderation

use super::{Context, Executor};
use crate::error::{ExecutionError, ExecutionResult};
use crate::execution::{Event, TxExecution};
use crate::shared::{debit, prepare_inputs};
use accord_primitives::Address;
use accord_storage::{StateReader, StateWriter};
use accord_types::{
    Account, AccountPermissions, PermAction, PermFlag, PermissionError, PermsTx,
    GLOBAL_PERMISSIONS_ADDRESS,
};
use std::slice;

/// Executes [`PermsTx`]
#[derive(Debug, Default, Clone, Copy)]
pub struct PermissionsExecutor;

impl Executor<PermsTx> for PermissionsExecutor {
    fn execute(&self, ctx: &Context<'_>, txe: &mut TxExecution, tx: &PermsTx) -> ExecutionResult<()> {
        if tx.action.is_query() {
            return Err(ExecutionError::InvalidPermissionAction(format!(
                "{} can only be evaluated by a contract",
                tx.action
            )));
        }
        if let Some(flag) = action_flag(&tx.action) {
            if !flag.is_single() {
                return Err(ExecutionError::InvalidPermissionAction(format!(
                    "{} does not name exactly one flag",
                    tx.action
                )));
            }
        }

        let mut sender =
            prepare_inputs(ctx, slice::from_ref(&tx.input), tx.action.moderator_flag())?.remove(0);
        debit(&mut sender, tx.input.amount)?;
        let sender_address = sender.address;
        let state = &ctx.ledger.state;
        // The sender may be its own target, so it is written before the target is read
        state.update_account(sender)?;

        match &tx.action {
            PermAction::SetBase {
                target,
                permission,
                value,
            } => update_target(ctx, *target, |perms| set_flag(perms, *permission, *value))?,
            PermAction::UnsetBase { target, permission } => update_target(ctx, *target, |perms| {
                perms.base.unset(*permission).map_err(invalid_action)
            })?,
            PermAction::SetGlobal { permission, value } => {
                if state.get_account(&GLOBAL_PERMISSIONS_ADDRESS)?.is_none() {
                    let global = Account::new(GLOBAL_PERMISSIONS_ADDRESS).with_permissions(AccountPermissions {
                        base: ctx.params.default_permissions,
                        roles: Vec::new(),
                    });
                    state.update_account(global)?;
                }
                update_target(ctx, GLOBAL_PERMISSIONS_ADDRESS, |perms| {
                    set_flag(perms, *permission, *value)
                })?
            }
            PermAction::AddRole { target, role } => update_target(ctx, *target, |perms| {
                if perms.add_role(role) {
                    Ok(())
                } else {
                    Err(ExecutionError::RoleConflict {
                        address: *target,
                        role: role.clone(),
                    })
                }
            })?,
            PermAction::RemoveRole { target, role } => update_target(ctx, *target, |perms| {
                if perms.remove_role(role) {
                    Ok(())
                } else {
                    Err(ExecutionError::RoleConflict {
                        address: *target,
                        role: role.clone(),
                    })
                }
            })?,
            PermAction::HasBase { .. } | PermAction::HasRole { .. } => {
                return Err(ExecutionError::Internal("query action reached the executor".into()));
            }
        }

        tracing::debug!(sender = %sender_address, action = %tx.action, "permissions changed");
        txe.input(sender_address);
        txe.push_event(Event::Permission {
            sender: sender_address,
            action: tx.action.clone(),
        });
        Ok(())
    }
}

fn action_flag(action: &PermAction) -> Option<PermFlag> {
    match action {
        PermAction::HasBase { permission, .. }
        | PermAction::SetBase { permission, .. }
        | PermAction::UnsetBase { permission, .. }
        | PermAction::SetGlobal { permission, .. } => Some(*permission),
        PermAction::HasRole { .. } | PermAction::AddRole { .. } | PermAction::RemoveRole { .. } => None,
    }
}

fn set_flag(perms: &mut AccountPermissions, flag: PermFlag, value: bool) -> ExecutionResult<()> {
    perms.base.set(flag, value).map_err(invalid_action)
}

fn invalid_action(err: PermissionError) -> ExecutionError {
    ExecutionError::InvalidPermissionAction(err.to_string())
}

/// Read-modify-write of the permissions of `target`
fn update_target(
    ctx: &Context<'_>,
    target: Address,
    change: impl FnOnce(&mut AccountPermissions) -> ExecutionResult<()>,
) -> ExecutionResult<()> {
    let state = &ctx.ledger.state;
    let mut account = state
        .get_account(&target)?
        .ok_or(ExecutionError::InvalidAddress(target))?;
    change(&mut account.permissions)?;
    state.update_account(account)?;
    Ok(())
}
