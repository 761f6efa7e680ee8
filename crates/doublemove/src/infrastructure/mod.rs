//! Infrastructure layer for the Double Movement host.
//!
//! Contains the adapters behind the application layer's traits: settings
//! storage, the global hotkey table, the raw key listener, the native
//! service stand-in, headless tray/notifier/window adapters, the
//! single-instance lock, and the settings-window command bridge.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `doublemove_core`.  The only reverse edge is the host event loop handing
//! [`ui_bridge::UiRequest`]s to `ui_bridge::dispatch`.

pub mod desktop;
pub mod hotkey;
pub mod input_capture;
pub mod native_service;
pub mod single_instance;
pub mod storage;
pub mod ui_bridge;
