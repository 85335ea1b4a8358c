//! Input and output handling shared by the executors

use crate::error::{ExecutionError, ExecutionResult};
use crate::executors::Context;
use crate::permissions::{ensure_permission, first_without};
use accord_primitives::Address;
use accord_storage::{StateReader, StateWriter};
use accord_types::{Account, BalanceError, BasePermissions, PermFlag, TxInput};
use std::collections::BTreeSet;

/// Resolve input accounts in input order.
///
/// Fails on repeated addresses and on accounts that do not exist.
pub fn get_inputs(state: &dyn StateReader, inputs: &[TxInput]) -> ExecutionResult<Vec<Account>> {
    let mut seen = BTreeSet::new();
    let mut accounts = Vec::with_capacity(inputs.len());
    for input in inputs {
        if !seen.insert(input.address) {
            return Err(ExecutionError::DuplicateAddress(input.address));
        }
        let account = state
            .get_account(&input.address)?
            .ok_or(ExecutionError::InvalidAddress(input.address))?;
        accounts.push(account);
    }
    Ok(accounts)
}

/// Sequence and funds checks for one input
pub fn validate_input(account: &Account, input: &TxInput) -> ExecutionResult<()> {
    let expected = account
        .sequence
        .checked_add(1)
        .ok_or(ExecutionError::IntegerOverflow)?;
    if input.sequence != expected {
        return Err(ExecutionError::InvalidSequence {
            address: input.address,
            expected,
            got: input.sequence,
        });
    }
    if account.balance < input.amount {
        return Err(ExecutionError::InsufficientFunds {
            address: input.address,
            balance: account.balance,
            required: input.amount,
        });
    }
    Ok(())
}

/// The common preamble: resolve inputs, check sequence, funds, the input
/// permission and `required`, then advance each sequence by one.
///
/// Returned accounts are not yet written back.
pub fn prepare_inputs(
    ctx: &Context<'_>,
    inputs: &[TxInput],
    required: PermFlag,
) -> ExecutionResult<Vec<Account>> {
    let mut accounts = get_inputs(&ctx.ledger.state, inputs)?;
    for (account, input) in accounts.iter_mut().zip(inputs) {
        validate_input(account, input)?;
        ensure_permission(account, &ctx.global, PermFlag::INPUT)?;
        ensure_permission(account, &ctx.global, required)?;
        account.sequence += 1;
    }
    Ok(accounts)
}

/// Existing account at `address`, or a new empty one if every input may
/// create accounts
pub fn get_or_make_output(
    state: &dyn StateReader,
    inputs: &[Account],
    global: &BasePermissions,
    address: Address,
) -> ExecutionResult<Account> {
    if let Some(account) = state.get_account(&address)? {
        return Ok(account);
    }
    if let Some(denied) = first_without(inputs, global, PermFlag::CREATE_ACCOUNT) {
        return Err(ExecutionError::PermissionDenied {
            address: denied.address,
            permission: PermFlag::CREATE_ACCOUNT,
        });
    }
    tracing::debug!(%address, "creating account");
    Ok(Account::new(address))
}

/// Debit with a typed error
pub fn debit(account: &mut Account, amount: u64) -> ExecutionResult<()> {
    account.debit(amount).map_err(|err| balance_error(account.address, err))
}

/// Credit with a typed error
pub fn credit(account: &mut Account, amount: u64) -> ExecutionResult<()> {
    account.credit(amount).map_err(|err| balance_error(account.address, err))
}

fn balance_error(address: Address, err: BalanceError) -> ExecutionError {
    match err {
        BalanceError::Insufficient { balance, amount } => ExecutionError::InsufficientFunds {
            address,
            balance,
            required: amount,
        },
        BalanceError::Overflow => ExecutionError::IntegerOverflow,
    }
}

/// Write accounts back in order
pub fn write_accounts(
    state: &dyn StateWriter,
    accounts: impl IntoIterator<Item = Account>,
) -> ExecutionResult<()> {
    for account in accounts {
        state.update_account(account)?;
    }
    Ok(())
}

/// Sum amounts, failing on overflow
pub fn checked_total(amounts: impl IntoIterator<Item = u64>) -> ExecutionResult<u64> {
    amounts
        .into_iter()
        .try_fold(0u64, |acc, amount| acc.checked_add(amount))
        .ok_or(ExecutionError::IntegerOverflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use accord_storage::MemoryState;
    use accord_types::AccountPermissions;

    fn addr(b: u8) -> Address {
        Address::from_bytes([b; 20])
    }

    fn input(b: u8, amount: u64, sequence: u64) -> TxInput {
        TxInput {
            address: addr(b),
            amount,
            sequence,
        }
    }

    #[test]
    fn test_get_inputs_rejects_duplicates_and_missing() {
        let state = MemoryState::with_accounts([Account::new(addr(1))]);
        assert_eq!(
            get_inputs(&state, &[input(1, 0, 1), input(1, 0, 1)]),
            Err(ExecutionError::DuplicateAddress(addr(1)))
        );
        assert_eq!(
            get_inputs(&state, &[input(2, 0, 1)]),
            Err(ExecutionError::InvalidAddress(addr(2)))
        );
    }

    #[test]
    fn test_validate_input() {
        let mut account = Account::new(addr(1)).with_balance(10);
        account.sequence = 4;
        assert!(validate_input(&account, &input(1, 10, 5)).is_ok());
        assert!(matches!(
            validate_input(&account, &input(1, 10, 4)),
            Err(ExecutionError::InvalidSequence { expected: 5, got: 4, .. })
        ));
        assert!(matches!(
            validate_input(&account, &input(1, 11, 5)),
            Err(ExecutionError::InsufficientFunds { balance: 10, required: 11, .. })
        ));
    }

    #[test]
    fn test_get_or_make_output() {
        let state = MemoryState::with_accounts([Account::new(addr(1)).with_balance(3)]);
        let creator =
            Account::new(addr(7)).with_permissions(AccountPermissions::granting(PermFlag::CREATE_ACCOUNT));
        let plain = Account::new(addr(8)).with_permissions(AccountPermissions::granting(PermFlag::SEND));
        let global = BasePermissions::ZERO;

        assert_eq!(
            get_or_make_output(&state, &[plain.clone()], &global, addr(1)).unwrap().balance,
            3
        );
        let made = get_or_make_output(&state, &[creator.clone()], &global, addr(2)).unwrap();
        assert_eq!(made, Account::new(addr(2)));
        assert!(matches!(
            get_or_make_output(&state, &[creator, plain], &global, addr(2)),
            Err(ExecutionError::PermissionDenied { permission: PermFlag::CREATE_ACCOUNT, .. })
        ));
    }

    #[test]
    fn test_checked_total() {
        assert_eq!(checked_total([1, 2, 3]), Ok(6));
        assert_eq!(checked_total([u64::MAX, 1]), Err(ExecutionError::IntegerOverflow));
    }
}
