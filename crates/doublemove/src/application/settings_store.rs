//! Settings Store: the single source of truth for persisted settings.
//!
//! Reads never fail: a field that was never written, or whose stored value no
//! longer passes validation, reads as its schema default.  Writes are
//! validated first and only reported successful once the repository says the
//! value is durable.  A rejected write leaves the stored value untouched.
//!
//! The store itself does not notify anyone; the orchestrator runs the
//! observer fan-out after every successful [`SettingsStore::set`].

use std::path::PathBuf;

use doublemove_core::{
    Accelerator, AngleConfig, KeyMapping, SettingKey, SettingValue, ValidationError,
};
use thiserror::Error;
use tracing::{debug, warn};

// ── Repository port ───────────────────────────────────────────────────────────

/// Error type for durable settings writes.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing settings at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The value could not be encoded for storage.
    #[error("failed to serialize setting {key}: {reason}")]
    Serialize { key: SettingKey, reason: String },

    /// The store refuses writes.
    #[error("settings store is read-only")]
    ReadOnly,
}

/// Durable key-value store for settings values.
///
/// Implemented by `infrastructure::storage`.
pub trait SettingsRepository: Send {
    /// Returns the stored value for `key`, or `None` if absent or unreadable.
    fn load(&self, key: SettingKey) -> Option<SettingValue>;

    /// Persists `value` under its key.
    ///
    /// Must not return `Ok` until the write is durable.
    fn store(&mut self, value: &SettingValue) -> Result<(), StorageError>;
}

// ── Store ─────────────────────────────────────────────────────────────────────

/// Error type for settings writes.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("failed to persist setting: {0}")]
    Storage(#[from] StorageError),
}

/// Typed access to the settings schema over a [`SettingsRepository`].
pub struct SettingsStore {
    repository: Box<dyn SettingsRepository>,
}

impl SettingsStore {
    pub fn new(repository: Box<dyn SettingsRepository>) -> Self {
        Self { repository }
    }

    /// Returns the stored value for `key`, or its default.
    pub fn get(&self, key: SettingKey) -> SettingValue {
        match self.repository.load(key) {
            Some(value) if value.key() != key => {
                warn!(%key, stored = %value.key(), "repository returned a value for another field");
                key.default_value()
            }
            Some(value) => match value.validate() {
                Ok(()) => value,
                Err(e) => {
                    warn!(%key, "stored value is invalid, using default: {e}");
                    key.default_value()
                }
            },
            None => key.default_value(),
        }
    }

    /// Validates and durably stores `value`.
    ///
    /// Returns the committed value so the caller can fan it out.
    ///
    /// # Errors
    ///
    /// [`SettingsError::Validation`] if the value breaks its field's
    /// constraints, [`SettingsError::Storage`] if the write did not complete.
    /// In both cases the previously stored value is unchanged.
    pub fn set(&mut self, value: SettingValue) -> Result<SettingValue, SettingsError> {
        value.validate()?;
        self.repository.store(&value)?;
        debug!(key = %value.key(), "setting committed");
        Ok(value)
    }

    /// Encodes the current value of the field called `name` for the UI.
    ///
    /// # Errors
    ///
    /// [`ValidationError::UnknownSetting`] if no field has that name.
    pub fn get_by_name(&self, name: &str) -> Result<serde_json::Value, ValidationError> {
        let key: SettingKey = name.parse()?;
        Ok(self.get(key).to_json())
    }

    // ── Typed accessors ───────────────────────────────────────────────────────

    pub fn double_movement_enabled(&self) -> bool {
        match self.get(SettingKey::DoubleMovementEnabled) {
            SettingValue::DoubleMovementEnabled(enabled) => enabled,
            _ => false,
        }
    }

    pub fn key_mapping(&self) -> KeyMapping {
        match self.get(SettingKey::KeyMapping) {
            SettingValue::KeyMapping(mapping) => mapping,
            _ => KeyMapping::default(),
        }
    }

    pub fn strafing_angles(&self) -> AngleConfig {
        match self.get(SettingKey::LeftJoystickStrafingAngles) {
            SettingValue::LeftJoystickStrafingAngles(angles) => angles,
            _ => AngleConfig::default(),
        }
    }

    pub fn toggle_accelerator(&self) -> Accelerator {
        match self.get(SettingKey::EnabledToggleAccelerator) {
            SettingValue::EnabledToggleAccelerator(accel) => accel,
            _ => Accelerator::recommended(),
        }
    }
}

impl std::fmt::Debug for SettingsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsStore").finish_non_exhaustive()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::memory::MemorySettings;
    use doublemove_core::KeyCode;
    use serde_json::json;

    fn store() -> SettingsStore {
        SettingsStore::new(Box::new(MemorySettings::new()))
    }

    #[test]
    fn test_get_before_any_set_returns_default() {
        let store = store();
        for key in SettingKey::ALL {
            assert_eq!(store.get(key), key.default_value());
        }
    }

    #[test]
    fn test_get_after_set_returns_value() {
        // Arrange
        let mut store = store();
        let angles = AngleConfig {
            use_left_right_angle: true,
            up_diagonal_angle: 50.0,
            left_right_angle: 70.0,
        };

        // Act
        store
            .set(SettingValue::LeftJoystickStrafingAngles(angles))
            .unwrap();

        // Assert
        assert_eq!(store.strafing_angles(), angles);
    }

    #[test]
    fn test_invalid_value_is_rejected_and_store_unchanged() {
        // Arrange
        let mut store = store();
        let bad = AngleConfig {
            up_diagonal_angle: 80.0,
            ..AngleConfig::default()
        };

        // Act
        let result = store.set(SettingValue::LeftJoystickStrafingAngles(bad));

        // Assert
        assert!(matches!(
            result,
            Err(SettingsError::Validation(ValidationError::AngleOutOfRange { .. }))
        ));
        assert_eq!(store.strafing_angles(), AngleConfig::default());
    }

    #[test]
    fn test_storage_failure_is_reported() {
        let mut store = SettingsStore::new(Box::new(MemorySettings::new().read_only()));

        let result = store.set(SettingValue::DoubleMovementEnabled(true));

        assert!(matches!(result, Err(SettingsError::Storage(StorageError::ReadOnly))));
        assert!(!store.double_movement_enabled());
    }

    #[test]
    fn test_invalid_stored_value_reads_as_default() {
        // Arrange: bypass validation by seeding the repository directly
        let mut mapping = KeyMapping::default();
        mapping.left_joystick.up = Some(KeyCode::new(0x07));
        let repo = MemorySettings::new().with(SettingValue::KeyMapping(mapping));

        // Act
        let store = SettingsStore::new(Box::new(repo));

        // Assert
        assert_eq!(store.key_mapping(), KeyMapping::default());
    }

    #[test]
    fn test_get_by_name_encodes_json() {
        let mut store = store();
        store.set(SettingValue::DoubleMovementEnabled(true)).unwrap();

        assert_eq!(store.get_by_name("doubleMovementEnabled"), Ok(json!(true)));
        assert_eq!(
            store.get_by_name("enabledToggleAccelerator"),
            Ok(json!([17, 16, 88]))
        );
    }

    #[test]
    fn test_get_by_name_rejects_unknown_field() {
        let store = store();
        assert!(matches!(
            store.get_by_name("theme"),
            Err(ValidationError::UnknownSetting(_))
        ));
    }

    #[test]
    fn test_composite_set_replaces_whole_value() {
        // Arrange
        let mut store = store();
        let mut mapping = KeyMapping::default();
        mapping.left_joystick.down = None;

        // Act
        store.set(SettingValue::KeyMapping(mapping.clone())).unwrap();

        // Assert
        assert_eq!(store.key_mapping(), mapping);
        assert_eq!(store.key_mapping().left_joystick.down, None);
    }
}
