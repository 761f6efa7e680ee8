//! Domain types shared by every part of the host.
//!
//! - **`accelerator`** – the normalized hotkey combination and its rendering.
//! - **`settings`** – the fixed settings schema, defaults, and validation.

pub mod accelerator;
pub mod settings;
