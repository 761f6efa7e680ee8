//! In-memory settings repository.

use std::collections::HashMap;

use doublemove_core::{SettingKey, SettingValue};

use super::{SettingsRepository, StorageError};

/// Process-local settings map.  Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: HashMap<SettingKey, SettingValue>,
    read_only: bool,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a stored value, as if written by a previous run.
    pub fn with(mut self, value: SettingValue) -> Self {
        self.values.insert(value.key(), value);
        self
    }

    /// Makes every subsequent [`store`](SettingsRepository::store) fail.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }
}

impl SettingsRepository for MemorySettings {
    fn load(&self, key: SettingKey) -> Option<SettingValue> {
        self.values.get(&key).cloned()
    }

    fn store(&mut self, value: &SettingValue) -> Result<(), StorageError> {
        if self.read_only {
            return Err(StorageError::ReadOnly);
        }
        self.values.insert(value.key(), value.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_returns_none_when_never_stored() {
        let repo = MemorySettings::new();
        assert_eq!(repo.load(SettingKey::KeyMapping), None);
    }

    #[test]
    fn test_store_then_load_returns_value() {
        let mut repo = MemorySettings::new();
        repo.store(&SettingValue::DoubleMovementEnabled(true)).unwrap();
        assert_eq!(
            repo.load(SettingKey::DoubleMovementEnabled),
            Some(SettingValue::DoubleMovementEnabled(true))
        );
    }

    #[test]
    fn test_read_only_store_rejects_writes() {
        let mut repo = MemorySettings::new().read_only();
        let result = repo.store(&SettingValue::DoubleMovementEnabled(true));
        assert!(matches!(result, Err(StorageError::ReadOnly)));
        assert_eq!(repo.load(SettingKey::DoubleMovementEnabled), None);
    }
}
