//! Account permission model
//!
//! Every account carries a [`BasePermissions`] bitset that records, per
//! flag, both whether the flag is *set* on the account and its value. Unset
//! flags fall back to the global default policy through
//! [`BasePermissions::compose`]. Roles are free-form strings kept alongside.

use accord_primitives::Address;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, Not};
use thiserror::Error;

/// Permission errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermissionError {
    /// Flag is zero, composite, or outside the defined range
    #[error("invalid permission flag {0:#b}")]
    InvalidFlag(u64),

    /// Flag has no value on this bitset
    #[error("permission {0} is not set")]
    Unset(PermFlag),

    /// String does not name a permission
    #[error("unknown permission name: {0}")]
    UnknownName(String),
}

/// A permission bit, or a union of bits
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermFlag(u64);

impl PermFlag {
    /// Super-user; required for governance transactions
    pub const ROOT: PermFlag = PermFlag(1 << 0);
    /// Issue SendTx
    pub const SEND: PermFlag = PermFlag(1 << 1);
    /// Issue CallTx against existing code
    pub const CALL: PermFlag = PermFlag(1 << 2);
    /// Create contracts with a CallTx to no address
    pub const CREATE_CONTRACT: PermFlag = PermFlag(1 << 3);
    /// Fund accounts that do not exist yet
    pub const CREATE_ACCOUNT: PermFlag = PermFlag(1 << 4);
    /// Bond and unbond validator power
    pub const BOND: PermFlag = PermFlag(1 << 5);
    /// Use the name registry
    pub const NAME: PermFlag = PermFlag(1 << 6);
    /// Propose and vote on batches
    pub const PROPOSAL: PermFlag = PermFlag(1 << 7);
    /// Act as a transaction input
    pub const INPUT: PermFlag = PermFlag(1 << 8);
    /// Appear as an input of a proposed batch
    pub const BATCH: PermFlag = PermFlag(1 << 9);
    /// Register a node identity
    pub const IDENTIFY: PermFlag = PermFlag(1 << 10);
    /// Moderator: query a base permission
    pub const HAS_BASE: PermFlag = PermFlag(1 << 11);
    /// Moderator: set a base permission
    pub const SET_BASE: PermFlag = PermFlag(1 << 12);
    /// Moderator: unset a base permission
    pub const UNSET_BASE: PermFlag = PermFlag(1 << 13);
    /// Moderator: change the global default policy
    pub const SET_GLOBAL: PermFlag = PermFlag(1 << 14);
    /// Moderator: query a role
    pub const HAS_ROLE: PermFlag = PermFlag(1 << 15);
    /// Moderator: add a role
    pub const ADD_ROLE: PermFlag = PermFlag(1 << 16);
    /// Moderator: remove a role
    pub const REMOVE_ROLE: PermFlag = PermFlag(1 << 17);

    /// Number of defined flags
    pub const COUNT: u32 = 18;

    /// Union of every defined flag
    pub const ALL: PermFlag = PermFlag((1 << Self::COUNT) - 1);

    /// Empty set
    pub const NONE: PermFlag = PermFlag(0);

    /// Flags granted by the stock global policy
    pub const DEFAULT: PermFlag = PermFlag(
        Self::SEND.0
            | Self::CALL.0
            | Self::CREATE_CONTRACT.0
            | Self::CREATE_ACCOUNT.0
            | Self::BOND.0
            | Self::NAME.0
            | Self::PROPOSAL.0
            | Self::INPUT.0
            | Self::BATCH.0
            | Self::IDENTIFY.0
            | Self::HAS_BASE.0
            | Self::HAS_ROLE.0,
    );

    const NAMES: [(PermFlag, &'static str); 18] = [
        (Self::ROOT, "root"),
        (Self::SEND, "send"),
        (Self::CALL, "call"),
        (Self::CREATE_CONTRACT, "createContract"),
        (Self::CREATE_ACCOUNT, "createAccount"),
        (Self::BOND, "bond"),
        (Self::NAME, "name"),
        (Self::PROPOSAL, "proposal"),
        (Self::INPUT, "input"),
        (Self::BATCH, "batch"),
        (Self::IDENTIFY, "identify"),
        (Self::HAS_BASE, "hasBase"),
        (Self::SET_BASE, "setBase"),
        (Self::UNSET_BASE, "unsetBase"),
        (Self::SET_GLOBAL, "setGlobal"),
        (Self::HAS_ROLE, "hasRole"),
        (Self::ADD_ROLE, "addRole"),
        (Self::REMOVE_ROLE, "removeRole"),
    ];

    /// Raw bits
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Build from raw bits, rejecting bits outside [`PermFlag::ALL`]
    pub fn from_bits(bits: u64) -> Result<Self, PermissionError> {
        if bits & !Self::ALL.0 != 0 {
            return Err(PermissionError::InvalidFlag(bits));
        }
        Ok(PermFlag(bits))
    }

    /// True for exactly one defined bit
    pub fn is_single(self) -> bool {
        self.0 != 0 && self.0 & (self.0 - 1) == 0 && self.0 <= Self::ALL.0
    }

    /// True if every bit of `other` is in `self`
    pub fn contains(self, other: PermFlag) -> bool {
        self.0 & other.0 == other.0
    }

    /// Canonical name of a single flag
    pub fn name(self) -> Option<&'static str> {
        if self == Self::ALL {
            return Some("all");
        }
        Self::NAMES
            .iter()
            .find(|(flag, _)| *flag == self)
            .map(|(_, name)| *name)
    }

    /// Parse a flag name; camelCase, lowercase and snake_case are accepted
    pub fn from_name(name: &str) -> Result<Self, PermissionError> {
        let folded: String = name
            .chars()
            .filter(|c| *c != '_')
            .flat_map(char::to_lowercase)
            .collect();
        if folded == "all" {
            return Ok(Self::ALL);
        }
        Self::NAMES
            .iter()
            .find(|(_, n)| n.to_lowercase() == folded)
            .map(|(flag, _)| *flag)
            .ok_or_else(|| PermissionError::UnknownName(name.to_string()))
    }

    /// Union of the named flags
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, PermissionError> {
        names
            .iter()
            .try_fold(Self::NONE, |acc, n| Ok(acc | Self::from_name(n.as_ref())?))
    }
}

impl BitOr for PermFlag {
    type Output = PermFlag;
    fn bitor(self, rhs: PermFlag) -> PermFlag {
        PermFlag(self.0 | rhs.0)
    }
}

impl BitAnd for PermFlag {
    type Output = PermFlag;
    fn bitand(self, rhs: PermFlag) -> PermFlag {
        PermFlag(self.0 & rhs.0)
    }
}

impl Not for PermFlag {
    type Output = PermFlag;
    fn not(self) -> PermFlag {
        PermFlag(!self.0 & Self::ALL.0)
    }
}

impl fmt::Debug for PermFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "PermFlag({})", name),
            None => write!(f, "PermFlag({:#b})", self.0),
        }
    }
}

impl fmt::Display for PermFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "{:#b}", self.0),
        }
    }
}

/// Per-account permission bits plus a mask of which bits are set
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BasePermissions {
    /// Permission values; only meaningful where `set_bit` is 1
    pub perms: PermFlag,
    /// Which flags carry a value on this account
    pub set_bit: PermFlag,
}

impl BasePermissions {
    /// Nothing set; every lookup falls through to the global policy
    pub const ZERO: BasePermissions = BasePermissions {
        perms: PermFlag::NONE,
        set_bit: PermFlag::NONE,
    };

    /// Grant exactly `flags` and deny every other flag
    pub fn granting(flags: PermFlag) -> Self {
        Self {
            perms: flags,
            set_bit: PermFlag::ALL,
        }
    }

    /// Value of a single flag
    pub fn get(&self, flag: PermFlag) -> Result<bool, PermissionError> {
        if !flag.is_single() {
            return Err(PermissionError::InvalidFlag(flag.bits()));
        }
        if !self.set_bit.contains(flag) {
            return Err(PermissionError::Unset(flag));
        }
        Ok(self.perms.contains(flag))
    }

    /// Give a single flag a value
    pub fn set(&mut self, flag: PermFlag, value: bool) -> Result<(), PermissionError> {
        if !flag.is_single() {
            return Err(PermissionError::InvalidFlag(flag.bits()));
        }
        self.set_bit = self.set_bit | flag;
        self.perms = if value {
            self.perms | flag
        } else {
            self.perms & !flag
        };
        Ok(())
    }

    /// Remove a single flag's value so it falls through to the global policy
    pub fn unset(&mut self, flag: PermFlag) -> Result<(), PermissionError> {
        if !flag.is_single() {
            return Err(PermissionError::InvalidFlag(flag.bits()));
        }
        self.set_bit = self.set_bit & !flag;
        self.perms = self.perms & !flag;
        Ok(())
    }

    /// True when `flag` carries a value here
    pub fn is_set(&self, flag: PermFlag) -> bool {
        self.set_bit.contains(flag)
    }

    /// Overlay `self` on `fallback`: set bits win, unset bits defer
    pub fn compose(&self, fallback: &BasePermissions) -> BasePermissions {
        BasePermissions {
            perms: (self.perms & self.set_bit) | (fallback.perms & !self.set_bit),
            set_bit: self.set_bit | fallback.set_bit,
        }
    }
}

/// Base permissions and roles of one account
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccountPermissions {
    /// Base flags
    pub base: BasePermissions,
    /// Roles in insertion order, without duplicates
    #[serde(default)]
    pub roles: Vec<String>,
}

impl AccountPermissions {
    /// No base values and no roles
    pub fn zero() -> Self {
        Self::default()
    }

    /// Grant exactly `flags`
    pub fn granting(flags: PermFlag) -> Self {
        Self {
            base: BasePermissions::granting(flags),
            roles: Vec::new(),
        }
    }

    /// Stock global policy
    pub fn default_global() -> Self {
        Self::granting(PermFlag::DEFAULT)
    }

    /// Membership test
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Returns false if the role was already present
    pub fn add_role(&mut self, role: &str) -> bool {
        if self.has_role(role) {
            return false;
        }
        self.roles.push(role.to_string());
        true
    }

    /// Returns false if the role was absent
    pub fn remove_role(&mut self, role: &str) -> bool {
        match self.roles.iter().position(|r| r == role) {
            Some(idx) => {
                self.roles.remove(idx);
                true
            }
            None => false,
        }
    }
}

/// A permission-moderation action carried by a permissions transaction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum PermAction {
    /// Query a base flag (contract-only)
    HasBase {
        /// Account queried
        target: Address,
        /// Flag queried
        permission: PermFlag,
    },
    /// Give a base flag a value on the target
    SetBase {
        /// Account modified
        target: Address,
        /// Flag modified
        permission: PermFlag,
        /// New value
        value: bool,
    },
    /// Clear a base flag on the target
    UnsetBase {
        /// Account modified
        target: Address,
        /// Flag cleared
        permission: PermFlag,
    },
    /// Give a flag a value in the global policy
    SetGlobal {
        /// Flag modified
        permission: PermFlag,
        /// New value
        value: bool,
    },
    /// Query a role (contract-only)
    HasRole {
        /// Account queried
        target: Address,
        /// Role queried
        role: String,
    },
    /// Add a role to the target
    AddRole {
        /// Account modified
        target: Address,
        /// Role added
        role: String,
    },
    /// Remove a role from the target
    RemoveRole {
        /// Account modified
        target: Address,
        /// Role removed
        role: String,
    },
}

impl PermAction {
    /// Moderator flag the sender must hold to perform this action
    pub fn moderator_flag(&self) -> PermFlag {
        match self {
            PermAction::HasBase { .. } => PermFlag::HAS_BASE,
            PermAction::SetBase { .. } => PermFlag::SET_BASE,
            PermAction::UnsetBase { .. } => PermFlag::UNSET_BASE,
            PermAction::SetGlobal { .. } => PermFlag::SET_GLOBAL,
            PermAction::HasRole { .. } => PermFlag::HAS_ROLE,
            PermAction::AddRole { .. } => PermFlag::ADD_ROLE,
            PermAction::RemoveRole { .. } => PermFlag::REMOVE_ROLE,
        }
    }

    /// Query actions never change state
    pub fn is_query(&self) -> bool {
        matches!(self, PermAction::HasBase { .. } | PermAction::HasRole { .. })
    }
}

impl fmt::Display for PermAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermAction::HasBase { target, permission } => {
                write!(f, "hasBase({}, {})", target, permission)
            }
            PermAction::SetBase { target, permission, value } => {
                write!(f, "setBase({}, {}, {})", target, permission, value)
            }
            PermAction::UnsetBase { target, permission } => {
                write!(f, "unsetBase({}, {})", target, permission)
            }
            PermAction::SetGlobal { permission, value } => {
                write!(f, "setGlobal({}, {})", permission, value)
            }
            PermAction::HasRole { target, role } => write!(f, "hasRole({}, {})", target, role),
            PermAction::AddRole { target, role } => write!(f, "addRole({}, {})", target, role),
            PermAction::RemoveRole { target, role } => {
                write!(f, "removeRole({}, {})", target, role)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_unset_flag_errors() {
        let perms = BasePermissions::ZERO;
        assert_eq!(
            perms.get(PermFlag::SEND),
            Err(PermissionError::Unset(PermFlag::SEND))
        );
    }

    #[test]
    fn test_set_and_unset() {
        let mut perms = BasePermissions::ZERO;
        perms.set(PermFlag::CALL, true).unwrap();
        assert_eq!(perms.get(PermFlag::CALL), Ok(true));
        perms.set(PermFlag::CALL, false).unwrap();
        assert_eq!(perms.get(PermFlag::CALL), Ok(false));
        perms.unset(PermFlag::CALL).unwrap();
        assert!(!perms.is_set(PermFlag::CALL));
    }

    #[test]
    fn test_composite_flag_rejected() {
        let mut perms = BasePermissions::ZERO;
        let composite = PermFlag::SEND | PermFlag::CALL;
        assert!(perms.set(composite, true).is_err());
        assert!(perms.get(composite).is_err());
        assert!(PermFlag::from_bits(1 << 40).is_err());
    }

    #[test]
    fn test_compose_prefers_account_bits() {
        let global = BasePermissions::granting(PermFlag::SEND | PermFlag::CALL);
        let mut account = BasePermissions::ZERO;
        account.set(PermFlag::SEND, false).unwrap();
        account.set(PermFlag::ROOT, true).unwrap();

        let effective = account.compose(&global);
        assert_eq!(effective.get(PermFlag::SEND), Ok(false));
        assert_eq!(effective.get(PermFlag::CALL), Ok(true));
        assert_eq!(effective.get(PermFlag::ROOT), Ok(true));
        assert_eq!(effective.get(PermFlag::NAME), Ok(false));
    }

    #[test]
    fn test_names_roundtrip() {
        for (flag, name) in PermFlag::NAMES {
            assert_eq!(PermFlag::from_name(name).unwrap(), flag);
            assert_eq!(flag.name(), Some(name));
        }
        assert_eq!(
            PermFlag::from_name("create_account").unwrap(),
            PermFlag::CREATE_ACCOUNT
        );
        assert_eq!(PermFlag::from_name("all").unwrap(), PermFlag::ALL);
        assert!(PermFlag::from_name("fly").is_err());
    }

    #[test]
    fn test_roles_are_an_ordered_set() {
        let mut perms = AccountPermissions::zero();
        assert!(perms.add_role("admin"));
        assert!(perms.add_role("auditor"));
        assert!(!perms.add_role("admin"));
        assert_eq!(perms.roles, vec!["admin", "auditor"]);
        assert!(perms.remove_role("admin"));
        assert!(!perms.remove_role("admin"));
        assert_eq!(perms.roles, vec!["auditor"]);
    }

    #[test]
    fn test_moderator_flags() {
        let target = Address::ZERO;
        let action = PermAction::SetBase {
            target,
            permission: PermFlag::SEND,
            value: true,
        };
        assert_eq!(action.moderator_flag(), PermFlag::SET_BASE);
        assert!(!action.is_query());
        assert!(PermAction::HasRole { target, role: "x".into() }.is_query());
    }
}
