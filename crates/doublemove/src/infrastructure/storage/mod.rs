//! Storage infrastructure: durable settings persistence.
//!
//! The application layer only sees `SettingsRepository`, a key-value view
//! of the settings schema.  Two implementations live here:
//!
//! - `settings_file` – TOML file in the platform config directory, written
//!   atomically (temp file + rename) before a write is reported as done.
//! - `memory` – process-local map, used by tests and `--memory-store`.
//!
//! Defaults are not the repository's concern: a missing or unreadable value
//! is reported as `None` and the Settings Store substitutes the schema default.

pub mod memory;
pub mod settings_file;

pub use crate::application::settings_store::{SettingsRepository, StorageError};
