//! # doublemove-core
//!
//! Shared model for the Double Movement host: the settings schema, the
//! accelerator (global hotkey) value type, and the virtual-key code table.
//!
//! This crate has no dependencies on OS APIs, UI frameworks, or storage.
//! The host crate (`doublemove`) builds the orchestration layer on top of it.
//!
//! - **`keymap`** – [`KeyCode`] plus names and classification for every
//!   virtual-key code (modifier, accelerator-eligible, display name).
//! - **`domain`** – [`Accelerator`] and the settings schema
//!   ([`SettingKey`], [`SettingValue`], [`KeyMapping`], [`AngleConfig`]).

pub mod domain;
pub mod keymap;

pub use domain::accelerator::{format_in_progress, Accelerator, AcceleratorError};
pub use domain::settings::{
    AngleConfig, JoystickMapping, KeyMapping, SettingKey, SettingValue, ValidationError,
};
pub use keymap::KeyCode;
