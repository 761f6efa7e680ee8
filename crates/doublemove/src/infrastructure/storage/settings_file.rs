//! TOML-backed settings persistence.
//!
//! Settings live in one file in the platform-appropriate config directory:
//! - Windows:  `%APPDATA%\DoubleMovement\settings.toml`
//! - Linux:    `~/.config/doublemove/settings.toml`
//! - macOS:    `~/Library/Application Support/DoubleMovement/settings.toml`
//!
//! The file is a flat document keyed by setting name:
//!
//! ```toml
//! doubleMovementEnabled = true
//! enabledToggleAccelerator = [17, 16, 88]
//!
//! [keyMapping.leftJoystick]
//! up = 87
//! down = 83
//!
//! [leftJoystickStrafingAngles]
//! useLeftRightAngle = false
//! upDiagonalAngle = 45.0
//! leftRightAngle = 90.0
//! ```
//!
//! Each field is decoded on its own, so one damaged entry only costs that
//! entry its value; the rest of the file is still honoured.  Unrecognised
//! keys are preserved across writes.
//!
//! # Durability
//!
//! [`TomlSettingsFile::store`] writes the whole document to a sibling
//! `settings.toml.tmp` and renames it over the real file.  The rename is
//! atomic on every supported platform, so a crash mid-write leaves either the
//! old or the new document, never a truncated one.

use std::io::Write;
use std::path::{Path, PathBuf};

use doublemove_core::{SettingKey, SettingValue};
use tracing::{debug, warn};

use super::{SettingsRepository, StorageError};

/// File name of the settings document inside the config directory.
pub const SETTINGS_FILE_NAME: &str = "settings.toml";

/// Determines the platform-appropriate directory for the settings file.
///
/// # Errors
///
/// Returns [`StorageError::NoPlatformConfigDir`] when the platform config
/// base directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, StorageError> {
    platform_config_dir().ok_or(StorageError::NoPlatformConfigDir)
}

/// Settings repository backed by a TOML file.
#[derive(Debug)]
pub struct TomlSettingsFile {
    path: PathBuf,
    document: toml::Table,
}

impl TomlSettingsFile {
    /// Opens the settings file in the platform config directory.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NoPlatformConfigDir`] if the directory cannot
    /// be determined.
    pub fn open_default() -> Result<Self, StorageError> {
        Ok(Self::open_in(config_dir()?))
    }

    /// Opens `settings.toml` inside `dir`.
    pub fn open_in(dir: impl AsRef<Path>) -> Self {
        Self::open(dir.as_ref().join(SETTINGS_FILE_NAME))
    }

    /// Opens the settings file at `path`.
    ///
    /// A missing file is an empty document.  An unreadable or malformed file
    /// is logged and treated as empty; it is replaced on the next write.
    pub fn open(path: PathBuf) -> Self {
        let document = match std::fs::read_to_string(&path) {
            Ok(content) => match content.parse::<toml::Table>() {
                Ok(table) => table,
                Err(e) => {
                    warn!(path = %path.display(), "settings file is not valid TOML, using defaults: {e}");
                    toml::Table::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no settings file yet");
                toml::Table::new()
            }
            Err(e) => {
                warn!(path = %path.display(), "cannot read settings file, using defaults: {e}");
                toml::Table::new()
            }
        };
        Self { path, document }
    }

    /// Full path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_document(&self, key: SettingKey, document: &toml::Table) -> Result<(), StorageError> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir).map_err(io_error(dir))?;
        }

        let content = toml::to_string(document).map_err(|e| StorageError::Serialize {
            key,
            reason: e.to_string(),
        })?;

        let tmp = self.path.with_extension("toml.tmp");
        {
            let mut file = std::fs::File::create(&tmp).map_err(io_error(&tmp))?;
            file.write_all(content.as_bytes()).map_err(io_error(&tmp))?;
            file.sync_all().map_err(io_error(&tmp))?;
        }
        std::fs::rename(&tmp, &self.path).map_err(io_error(&self.path))
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StorageError {
    let path = path.to_path_buf();
    move |source| StorageError::Io { path, source }
}

impl SettingsRepository for TomlSettingsFile {
    fn load(&self, key: SettingKey) -> Option<SettingValue> {
        let raw = self.document.get(key.name())?.clone();
        match decode(key, raw) {
            Ok(value) => Some(value),
            Err(reason) => {
                warn!(%key, path = %self.path.display(), "ignoring stored value: {reason}");
                None
            }
        }
    }

    fn store(&mut self, value: &SettingValue) -> Result<(), StorageError> {
        let key = value.key();
        let encoded = encode(value).map_err(|e| StorageError::Serialize {
            key,
            reason: e.to_string(),
        })?;

        let mut next = self.document.clone();
        next.insert(key.name().to_string(), encoded);
        self.write_document(key, &next)?;

        // Only adopt the new document once it is on disk.
        self.document = next;
        debug!(%key, path = %self.path.display(), "setting persisted");
        Ok(())
    }
}

fn encode(value: &SettingValue) -> Result<toml::Value, toml::ser::Error> {
    match value {
        SettingValue::DoubleMovementEnabled(v) => toml::Value::try_from(v),
        SettingValue::KeyMapping(v) => toml::Value::try_from(v),
        SettingValue::LeftJoystickStrafingAngles(v) => toml::Value::try_from(v),
        SettingValue::EnabledToggleAccelerator(v) => toml::Value::try_from(v),
    }
}

fn decode(key: SettingKey, raw: toml::Value) -> Result<SettingValue, String> {
    let value = match key {
        SettingKey::DoubleMovementEnabled => {
            SettingValue::DoubleMovementEnabled(raw.try_into().map_err(|e| format!("{e}"))?)
        }
        SettingKey::KeyMapping => {
            SettingValue::KeyMapping(raw.try_into().map_err(|e| format!("{e}"))?)
        }
        SettingKey::LeftJoystickStrafingAngles => {
            SettingValue::LeftJoystickStrafingAngles(raw.try_into().map_err(|e| format!("{e}"))?)
        }
        SettingKey::EnabledToggleAccelerator => {
            SettingValue::EnabledToggleAccelerator(raw.try_into().map_err(|e| format!("{e}"))?)
        }
    };
    value.validate().map_err(|e| e.to_string())?;
    Ok(value)
}

/// Resolves the platform config base directory including the app subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        // %APPDATA% e.g. C:\Users\<user>\AppData\Roaming
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("DoubleMovement"))
    }

    #[cfg(target_os = "linux")]
    {
        // XDG_CONFIG_HOME or ~/.config
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("doublemove"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("DoubleMovement")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use doublemove_core::{Accelerator, AngleConfig, KeyCode, KeyMapping};
    use uuid::Uuid;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("doublemove_test_{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_missing_file_loads_nothing() {
        // Arrange
        let dir = temp_dir();

        // Act
        let repo = TomlSettingsFile::open_in(&dir);

        // Assert
        for key in SettingKey::ALL {
            assert_eq!(repo.load(key), None);
        }
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_store_then_reopen_returns_every_field() {
        // Arrange
        let dir = temp_dir();
        let mut mapping = KeyMapping::default();
        mapping.right_joystick.up = Some(KeyCode::new(0x26));
        let values = [
            SettingValue::DoubleMovementEnabled(true),
            SettingValue::KeyMapping(mapping),
            SettingValue::LeftJoystickStrafingAngles(AngleConfig {
                use_left_right_angle: true,
                up_diagonal_angle: 60.0,
                left_right_angle: 75.5,
            }),
            SettingValue::EnabledToggleAccelerator("Alt+F1".parse::<Accelerator>().unwrap()),
        ];

        // Act
        let mut repo = TomlSettingsFile::open_in(&dir);
        for value in &values {
            repo.store(value).unwrap();
        }
        let reopened = TomlSettingsFile::open_in(&dir);

        // Assert
        for value in values {
            assert_eq!(reopened.load(value.key()), Some(value));
        }
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_store_leaves_no_temp_file_behind() {
        let dir = temp_dir();
        let mut repo = TomlSettingsFile::open_in(&dir);

        repo.store(&SettingValue::DoubleMovementEnabled(true)).unwrap();

        assert!(dir.join(SETTINGS_FILE_NAME).exists());
        assert!(!dir.join("settings.toml.tmp").exists());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_store_creates_missing_directory() {
        let dir = temp_dir().join("nested").join("deeper");
        let mut repo = TomlSettingsFile::open_in(&dir);

        repo.store(&SettingValue::DoubleMovementEnabled(false)).unwrap();

        assert!(dir.join(SETTINGS_FILE_NAME).exists());
        std::fs::remove_dir_all(dir.parent().unwrap().parent().unwrap()).ok();
    }

    #[test]
    fn test_corrupt_file_is_treated_as_empty_and_replaced() {
        // Arrange
        let dir = temp_dir();
        std::fs::write(dir.join(SETTINGS_FILE_NAME), "[[[ not valid toml").unwrap();

        // Act
        let mut repo = TomlSettingsFile::open_in(&dir);
        let before = repo.load(SettingKey::DoubleMovementEnabled);
        repo.store(&SettingValue::DoubleMovementEnabled(true)).unwrap();
        let reopened = TomlSettingsFile::open_in(&dir);

        // Assert
        assert_eq!(before, None);
        assert_eq!(
            reopened.load(SettingKey::DoubleMovementEnabled),
            Some(SettingValue::DoubleMovementEnabled(true))
        );
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_invalid_field_is_ignored_without_losing_others() {
        // Arrange: the accelerator has two final keys; the angle is out of range.
        let dir = temp_dir();
        std::fs::write(
            dir.join(SETTINGS_FILE_NAME),
            r#"
doubleMovementEnabled = true
enabledToggleAccelerator = [65, 66]

[leftJoystickStrafingAngles]
useLeftRightAngle = false
upDiagonalAngle = 10.0
leftRightAngle = 90.0
"#,
        )
        .unwrap();

        // Act
        let repo = TomlSettingsFile::open_in(&dir);

        // Assert
        assert_eq!(
            repo.load(SettingKey::DoubleMovementEnabled),
            Some(SettingValue::DoubleMovementEnabled(true))
        );
        assert_eq!(repo.load(SettingKey::EnabledToggleAccelerator), None);
        assert_eq!(repo.load(SettingKey::LeftJoystickStrafingAngles), None);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unknown_keys_survive_a_write() {
        let dir = temp_dir();
        std::fs::write(dir.join(SETTINGS_FILE_NAME), "windowBounds = \"800x600\"\n").unwrap();

        let mut repo = TomlSettingsFile::open_in(&dir);
        repo.store(&SettingValue::DoubleMovementEnabled(true)).unwrap();

        let text = std::fs::read_to_string(dir.join(SETTINGS_FILE_NAME)).unwrap();
        assert!(text.contains("windowBounds"));
        assert!(text.contains("doubleMovementEnabled = true"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_accelerator_is_stored_as_key_code_array() {
        let dir = temp_dir();
        let mut repo = TomlSettingsFile::open_in(&dir);

        repo.store(&SettingValue::EnabledToggleAccelerator(Accelerator::recommended()))
            .unwrap();

        let text = std::fs::read_to_string(dir.join(SETTINGS_FILE_NAME)).unwrap();
        assert!(text.contains("enabledToggleAccelerator = [17, 16, 88]"), "got {text}");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_platform_config_dir_ends_with_app_directory() {
        // May return None in a stripped environment; that is acceptable.
        if let Some(dir) = platform_config_dir() {
            let last = dir.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            assert!(last == "doublemove" || last == "DoubleMovement", "got {dir:?}");
        }
    }
}
