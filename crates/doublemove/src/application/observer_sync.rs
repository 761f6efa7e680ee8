//! Observer Synchronizer: keeps the UI, the tray and the global hotkey in
//! line with the Settings Store.
//!
//! After every successful write, [`ObserverSynchronizer::on_setting_changed`]
//! runs the fan-out in a fixed order:
//!
//! 1. broadcast the new value to every registered UI subscriber;
//! 2. rebuild and render the tray menu;
//! 3. for `doubleMovementEnabled`, reconcile the service;
//! 4. for `enabledToggleAccelerator`, unregister the old hotkey and register
//!    the new one.
//!
//! A failing observer is logged and skipped; it never stops the others and
//! never undoes the write.  A failed service start is handed back to the
//! caller, which owns the error-handling policy.

use doublemove_core::{Accelerator, SettingValue};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::service_lifecycle::{ServiceError, ServiceLifecycle};
use crate::application::settings_store::SettingsStore;
use crate::application::tray_reflector::{build_menu, TrayView};

/// Identifies a registered UI subscriber.
pub type SubscriberId = Uuid;

/// Notification pushed to the settings window.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// A settings field now holds `value`.
    SettingChanged {
        name: &'static str,
        value: serde_json::Value,
    },
    /// The accelerator capture changed state.
    CaptureChanged { recording: bool, display: String },
}

/// The subscriber can no longer receive events and should be dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("UI subscriber is gone")]
pub struct SubscriberGone;

/// A settings window (or anything else) listening for [`UiEvent`]s.
pub trait UiSubscriber: Send {
    fn notify(&mut self, event: &UiEvent) -> Result<(), SubscriberGone>;
}

/// Error type for global hotkey registration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HotkeyError {
    #[error("{0} is already registered by another application")]
    Conflict(String),
    #[error("a hotkey ({0}) is already registered; unregister it first")]
    SlotOccupied(String),
    #[error("hotkey registration failed: {0}")]
    Os(String),
}

/// OS global-shortcut registration.  Holds at most one hotkey.
#[cfg_attr(test, mockall::automock)]
pub trait HotkeyRegistrar: Send {
    fn register(&mut self, accelerator: &Accelerator) -> Result<(), HotkeyError>;
    fn unregister(&mut self);
}

// ── Synchronizer ──────────────────────────────────────────────────────────────

/// Owns the observers that mirror the settings.
pub struct ObserverSynchronizer {
    subscribers: Vec<(SubscriberId, Box<dyn UiSubscriber>)>,
    tray: Box<dyn TrayView>,
    hotkeys: Box<dyn HotkeyRegistrar>,
    bound: Option<Accelerator>,
}

impl ObserverSynchronizer {
    pub fn new(tray: Box<dyn TrayView>, hotkeys: Box<dyn HotkeyRegistrar>) -> Self {
        Self {
            subscribers: Vec::new(),
            tray,
            hotkeys,
            bound: None,
        }
    }

    // ── UI subscribers ────────────────────────────────────────────────────────

    /// Registers a UI subscriber.  Returns the id to unsubscribe with.
    pub fn subscribe(&mut self, subscriber: Box<dyn UiSubscriber>) -> SubscriberId {
        let id = Uuid::new_v4();
        self.subscribers.push((id, subscriber));
        debug!(%id, "UI subscriber attached");
        id
    }

    /// Removes a UI subscriber and hands it back, or `None` if `id` is not
    /// registered (never was, or was pruned as gone).
    pub fn unsubscribe(&mut self, id: SubscriberId) -> Option<Box<dyn UiSubscriber>> {
        let index = self.subscribers.iter().position(|(sid, _)| *sid == id)?;
        let (_, subscriber) = self.subscribers.remove(index);
        debug!(%id, "UI subscriber detached");
        Some(subscriber)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Sends `event` to every subscriber, pruning the ones that are gone.
    pub fn broadcast(&mut self, event: &UiEvent) {
        self.subscribers.retain_mut(|(id, subscriber)| match subscriber.notify(event) {
            Ok(()) => true,
            Err(SubscriberGone) => {
                debug!(%id, "pruning UI subscriber");
                false
            }
        });
    }

    // ── Tray ──────────────────────────────────────────────────────────────────

    pub fn refresh_tray(&mut self, double_movement_enabled: bool) {
        self.tray.render(&build_menu(double_movement_enabled));
    }

    // ── Hotkey ────────────────────────────────────────────────────────────────

    /// The hotkey currently registered with the OS, if any.
    pub fn bound_hotkey(&self) -> Option<&Accelerator> {
        self.bound.as_ref()
    }

    /// Replaces the registered hotkey with `accelerator`.
    ///
    /// The previous binding is always released first.  On failure the hotkey
    /// is left unbound.  An empty accelerator just unbinds.
    ///
    /// # Errors
    ///
    /// The registrar's [`HotkeyError`], already logged.
    pub fn rebind_hotkey(&mut self, accelerator: &Accelerator) -> Result<(), HotkeyError> {
        self.release_hotkey();
        if accelerator.is_empty() {
            info!("toggle hotkey cleared");
            return Ok(());
        }
        match self.hotkeys.register(accelerator) {
            Ok(()) => {
                self.bound = Some(accelerator.clone());
                Ok(())
            }
            Err(e) => {
                warn!(hotkey = %accelerator, "toggle hotkey left unbound: {e}");
                Err(e)
            }
        }
    }

    /// Unregisters the current hotkey, if any.
    pub fn release_hotkey(&mut self) {
        if self.bound.take().is_some() {
            self.hotkeys.unregister();
        }
    }

    // ── Fan-out ───────────────────────────────────────────────────────────────

    /// Propagates a committed settings value to every observer.
    ///
    /// # Errors
    ///
    /// The [`ServiceError`] of a start triggered by this change.  Every other
    /// observer has still run.
    pub fn on_setting_changed(
        &mut self,
        value: &SettingValue,
        store: &SettingsStore,
        lifecycle: &mut ServiceLifecycle,
    ) -> Result<(), ServiceError> {
        let key = value.key();
        self.broadcast(&UiEvent::SettingChanged {
            name: key.name(),
            value: value.to_json(),
        });

        self.refresh_tray(store.double_movement_enabled());

        let mut outcome = Ok(());
        match value {
            SettingValue::DoubleMovementEnabled(enabled) => {
                outcome = lifecycle.reconcile(*enabled);
            }
            SettingValue::EnabledToggleAccelerator(accelerator) => {
                // Failure is logged and leaves the hotkey unbound.
                let _ = self.rebind_hotkey(accelerator);
            }
            SettingValue::KeyMapping(_) | SettingValue::LeftJoystickStrafingAngles(_) => {}
        }
        debug!(%key, "observers synchronized");
        outcome
    }
}

impl std::fmt::Debug for ObserverSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverSynchronizer")
            .field("subscribers", &self.subscribers.len())
            .field("bound", &self.bound)
            .finish_non_exhaustive()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
