//! Permission checks against the effective (account over global) policy

use crate::error::{ExecutionError, ExecutionResult};
use accord_types::{Account, BasePermissions, PermFlag};

/// Whether `account` holds `flag`, falling back to `global` for unset bits.
///
/// Composite or out-of-range flags are never granted.
pub fn has_permission(account: &Account, global: &BasePermissions, flag: PermFlag) -> bool {
    if !flag.is_single() {
        tracing::debug!(flag = flag.bits(), "permission check on invalid flag");
        return false;
    }
    account
        .permissions
        .base
        .compose(global)
        .get(flag)
        .unwrap_or(false)
}

/// [`has_permission`] as a typed error
pub fn ensure_permission(
    account: &Account,
    global: &BasePermissions,
    flag: PermFlag,
) -> ExecutionResult<()> {
    if has_permission(account, global, flag) {
        Ok(())
    } else {
        Err(ExecutionError::PermissionDenied {
            address: account.address,
            permission: flag,
        })
    }
}

/// First account lacking `flag`, if any
pub fn first_without<'a>(
    accounts: &'a [Account],
    global: &BasePermissions,
    flag: PermFlag,
) -> Option<&'a Account> {
    accounts
        .iter()
        .find(|account| !has_permission(account, global, flag))
}

#[cfg(test)]
mod tests {
    use super::*;
    use accord_primitives::Address;
    use accord_types::AccountPermissions;

    fn account(perms: AccountPermissions) -> Account {
        Account::new(Address::from_bytes([1; 20])).with_permissions(perms)
    }

    #[test]
    fn test_unset_bits_fall_back_to_global() {
        let global = BasePermissions::granting(PermFlag::SEND);
        let acc = account(AccountPermissions::zero());
        assert!(has_permission(&acc, &global, PermFlag::SEND));
        assert!(!has_permission(&acc, &global, PermFlag::CALL));
    }

    #[test]
    fn test_account_bits_override_global() {
        let global = BasePermissions::granting(PermFlag::SEND);
        let mut perms = AccountPermissions::zero();
        perms.base.set(PermFlag::SEND, false).unwrap();
        perms.base.set(PermFlag::ROOT, true).unwrap();
        let acc = account(perms);

        assert!(!has_permission(&acc, &global, PermFlag::SEND));
        assert!(has_permission(&acc, &global, PermFlag::ROOT));
        assert!(matches!(
            ensure_permission(&acc, &global, PermFlag::SEND),
            Err(ExecutionError::PermissionDenied { permission: PermFlag::SEND, .. })
        ));
    }

    #[test]
    fn test_invalid_flags_never_granted() {
        let global = BasePermissions::granting(PermFlag::ALL);
        let acc = account(AccountPermissions::zero());
        assert!(!has_permission(&acc, &global, PermFlag::SEND | PermFlag::CALL));
        assert!(!has_permission(&acc, &global, PermFlag::NONE));
    }

    #[test]
    fn test_unset_everywhere_is_denied() {
        let acc = account(AccountPermissions::zero());
        assert!(!has_permission(&acc, &BasePermissions::ZERO, PermFlag::SEND));
    }

    #[test]
    fn test_first_without() {
        let global = BasePermissions::ZERO;
        let allowed = account(AccountPermissions::granting(PermFlag::CREATE_ACCOUNT));
        let mut denied = account(AccountPermissions::zero());
        denied.address = Address::from_bytes([2; 20]);
        let accounts = vec![allowed, denied];
        assert_eq!(
            first_without(&accounts, &global, PermFlag::CREATE_ACCOUNT).map(|a| a.address),
            Some(Address::from_bytes([2; 20]))
        );
    }
}
