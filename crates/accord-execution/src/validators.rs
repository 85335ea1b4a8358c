//! Validator power bookkeeping

use crate::error::{ExecutionError, ExecutionResult};
use accord_crypto::PublicKey;
use accord_primitives::Address;
use accord_storage::{RegistryCache, RegistryReader, RegistryWriter};
use accord_types::Validator;
use std::ops::ControlFlow;

/// Validator set consumed by the bond, unbond, governance and proposal executors
pub trait ValidatorSet: Send + Sync {
    /// Current power of the validator at `address`; zero if not a validator
    fn power(&self, address: &Address) -> ExecutionResult<u64>;

    /// Change the power of `public_key` by `delta`, returning the new power.
    ///
    /// Fails rather than letting power go negative or overflow.
    fn alter_power(&self, public_key: &PublicKey, delta: i128) -> ExecutionResult<u64>;

    /// Number of validators with non-zero power
    fn validator_count(&self) -> ExecutionResult<usize>;
}

impl ValidatorSet for RegistryCache<'_, Address, Validator> {
    fn power(&self, address: &Address) -> ExecutionResult<u64> {
        Ok(self.get(address)?.map(|v| v.power).unwrap_or(0))
    }

    fn alter_power(&self, public_key: &PublicKey, delta: i128) -> ExecutionResult<u64> {
        let address = public_key.address();
        let current = self.power(&address)?;
        let next = i128::from(current)
            .checked_add(delta)
            .ok_or(ExecutionError::IntegerOverflow)?;
        if next < 0 {
            return Err(ExecutionError::NothingBonded(address));
        }
        let power = u64::try_from(next).map_err(|_| ExecutionError::IntegerOverflow)?;
        if power == 0 {
            self.remove(&address)?;
        } else {
            self.update(
                address,
                Validator {
                    public_key: public_key.clone(),
                    power,
                },
            )?;
        }
        tracing::debug!(validator = %address, from = current, to = power, "validator power changed");
        Ok(power)
    }

    fn validator_count(&self) -> ExecutionResult<usize> {
        let mut count = 0usize;
        self.iterate(&mut |_, v| {
            if v.power > 0 {
                count += 1;
            }
            ControlFlow::Continue(())
        })?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accord_storage::MemoryRegistry;
    use k256::ecdsa::SigningKey;

    fn key(seed: u8) -> PublicKey {
        PublicKey::from(*SigningKey::from_slice(&[seed; 32]).unwrap().verifying_key())
    }

    #[test]
    fn test_alter_power_up_and_down() {
        let backend = MemoryRegistry::new();
        let validators = RegistryCache::new(&backend);
        let k = key(1);

        assert_eq!(validators.alter_power(&k, 10).unwrap(), 10);
        assert_eq!(validators.alter_power(&k, -4).unwrap(), 6);
        assert_eq!(validators.power(&k.address()).unwrap(), 6);
        assert_eq!(validators.validator_count().unwrap(), 1);

        assert!(matches!(
            validators.alter_power(&k, -7),
            Err(ExecutionError::NothingBonded(_))
        ));
        assert_eq!(validators.alter_power(&k, -6).unwrap(), 0);
        assert_eq!(validators.validator_count().unwrap(), 0);
    }

    #[test]
    fn test_count_includes_backend() {
        let backend = MemoryRegistry::new();
        backend
            .update(
                key(1).address(),
                Validator {
                    public_key: key(1),
                    power: 5,
                },
            )
            .unwrap();
        let validators = RegistryCache::new(&backend);
        validators.alter_power(&key(2), 1).unwrap();
        assert_eq!(validators.validator_count().unwrap(), 2);
    }

    #[test]
    fn test_overflow_rejected() {
        let backend = MemoryRegistry::new();
        let validators = RegistryCache::new(&backend);
        validators.alter_power(&key(1), u64::MAX as i128).unwrap();
        assert_eq!(
            validators.alter_power(&key(1), 1),
            Err(ExecutionError::IntegerOverflow)
        );
    }
}
