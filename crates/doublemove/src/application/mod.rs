//! Application layer: the configuration and service orchestration logic.
//!
//! Nothing in here talks to the OS, the file system or the network.  Every
//! outside collaborator sits behind a trait defined next to the code that
//! uses it, and the concrete adapters live in `infrastructure`.
//!
//! # Sub-modules
//!
//! - **`settings_store`**      – typed, validated, durable settings with
//!   defaults; defines the `SettingsRepository` port.
//! - **`service_lifecycle`**   – starts and stops the native service to match
//!   `doubleMovementEnabled`, with generation-tagged error reporting.
//! - **`observer_sync`**       – the fan-out that keeps UI subscribers, the
//!   tray and the global hotkey consistent after every write.
//! - **`accelerator_capture`** – Idle/Recording state machine that turns raw
//!   key presses into a new toggle hotkey.
//! - **`tray_reflector`**      – pure tray menu model and action mapping.
//! - **`orchestrator`**        – owns all of the above and processes
//!   `HostEvent`s one at a time.

pub mod accelerator_capture;
pub mod observer_sync;
pub mod orchestrator;
pub mod service_lifecycle;
pub mod settings_store;
pub mod tray_reflector;
