//! The Orchestrator: one explicitly owned instance that holds every piece of
//! host state.
//!
//! # Event model
//!
//! Everything that can change state arrives as a [`HostEvent`] on a single
//! unbounded channel: tray clicks, the global hotkey, settings-window
//! commands, raw keys for the capture, native service errors, and a second
//! launch asking for the window.  One loop owns the orchestrator and calls
//! [`Orchestrator::handle_event`] for each event in turn, so there is no
//! shared mutable state and no locking in this layer.
//!
//! # Writes and fan-out
//!
//! [`Orchestrator::set`] validates, persists, then runs the observer fan-out
//! to completion before returning.  Writes the host makes on its own behalf
//! while a fan-out is running (the forced disable after a service failure)
//! are queued and applied once the current fan-out has finished, so each
//! write's fan-out is complete before the next one starts.
//!
//! # Settings window subscription
//!
//! The settings window's own [`UiSubscriber`] only receives events while the
//! window is visible.  Hiding the window detaches it from the observers and
//! parks it; showing the window (tray, second launch) attaches it again.

use std::collections::VecDeque;

use doublemove_core::{Accelerator, SettingKey, SettingValue};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::application::accelerator_capture::{
    AcceleratorCapture, CaptureError, CaptureStep, KeyListener, RawKeyEvent,
};
use crate::application::observer_sync::{
    HotkeyRegistrar, ObserverSynchronizer, SubscriberId, UiEvent, UiSubscriber,
};
use crate::application::service_lifecycle::{
    failure_message, NativeService, Notifier, ServiceError, ServiceLifecycle, ServiceState,
    SERVICE_ERROR_TITLE,
};
use crate::application::settings_store::{SettingsError, SettingsRepository, SettingsStore};
use crate::application::tray_reflector::{self, TrayAction, TrayResponse, TrayView};
use crate::infrastructure::ui_bridge::{self, UiRequest};

/// Sending half of the host event channel.
pub type HostEventSender = mpsc::UnboundedSender<HostEvent>;
/// Receiving half of the host event channel.
pub type HostEventReceiver = mpsc::UnboundedReceiver<HostEvent>;

/// Creates the host event channel.
pub fn host_channel() -> (HostEventSender, HostEventReceiver) {
    mpsc::unbounded_channel()
}

/// Everything the event loop can be asked to do.
#[derive(Debug)]
pub enum HostEvent {
    /// The user interacted with the tray icon or menu.
    Tray(TrayAction),
    /// The global toggle hotkey was pressed.
    HotkeyPressed,
    /// A raw key event for the accelerator capture.
    Key(RawKeyEvent),
    /// The native service reported an error.
    ServiceFailed { generation: u64, error: ServiceError },
    /// A settings-window command, optionally expecting a reply.
    Ui(UiRequest),
    /// Another launch of the application asked this one to show itself.
    SecondInstance,
    /// Exit the event loop.
    Shutdown,
}

/// Whether the event loop should keep running after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// The settings window.
pub trait WindowControl: Send {
    /// Shows and focuses the window.
    fn show(&mut self);
    fn hide(&mut self);
}

/// The collaborators an [`Orchestrator`] is built from.
pub struct HostPorts {
    pub repository: Box<dyn SettingsRepository>,
    pub service: Box<dyn NativeService>,
    pub tray: Box<dyn TrayView>,
    pub hotkeys: Box<dyn HotkeyRegistrar>,
    pub key_listener: Box<dyn KeyListener>,
    pub notifier: Box<dyn Notifier>,
    pub window: Box<dyn WindowControl>,
}

/// Where the settings window's subscriber currently lives.
enum WindowSubscriber {
    Attached(SubscriberId),
    Parked(Box<dyn UiSubscriber>),
}

// ── Orchestrator ──────────────────────────────────────────────────────────────

/// Owns the Settings Store, the service lifecycle, the observers and the
/// capture session.
pub struct Orchestrator {
    store: SettingsStore,
    lifecycle: ServiceLifecycle,
    observers: ObserverSynchronizer,
    capture: AcceleratorCapture,
    notifier: Box<dyn Notifier>,
    window: Box<dyn WindowControl>,
    window_visible: bool,
    window_subscriber: Option<WindowSubscriber>,
    pending: VecDeque<SettingValue>,
}

impl Orchestrator {
    /// Builds the orchestrator.  `events` is handed to the native service so
    /// it can report errors back into the loop.
    pub fn new(ports: HostPorts, events: HostEventSender) -> Self {
        Self {
            store: SettingsStore::new(ports.repository),
            lifecycle: ServiceLifecycle::new(ports.service, events),
            observers: ObserverSynchronizer::new(ports.tray, ports.hotkeys),
            capture: AcceleratorCapture::new(ports.key_listener),
            notifier: ports.notifier,
            window: ports.window,
            window_visible: false,
            window_subscriber: None,
            pending: VecDeque::new(),
        }
    }

    /// Brings the observers and the service in line with the stored settings.
    pub fn start(&mut self) {
        let enabled = self.store.double_movement_enabled();
        self.observers.refresh_tray(enabled);

        let accelerator = self.store.toggle_accelerator();
        // Failure is logged and leaves the hotkey unbound.
        let _ = self.observers.rebind_hotkey(&accelerator);

        if let Err(e) = self.lifecycle.reconcile(enabled) {
            self.on_service_failure(e);
        }
        self.drain_pending();
        info!(enabled, hotkey = %accelerator, "host started");
    }

    /// Releases the hotkey and stops the service.
    pub fn shutdown(&mut self) {
        self.capture.cancel();
        self.observers.release_hotkey();
        self.lifecycle.shutdown();
        info!("host shut down");
    }

    /// Processes one event.
    pub fn handle_event(&mut self, event: HostEvent) -> Flow {
        match event {
            HostEvent::Tray(action) => return self.on_tray_action(action),
            HostEvent::HotkeyPressed => self.on_hotkey_pressed(),
            HostEvent::Key(key) => self.on_key_event(key),
            HostEvent::ServiceFailed { generation, error } => {
                self.on_service_error(generation, error)
            }
            HostEvent::Ui(request) => return ui_bridge::dispatch(self, request),
            HostEvent::SecondInstance => {
                info!("another instance was launched; showing window");
                self.show_window();
            }
            HostEvent::Shutdown => return Flow::Exit,
        }
        Flow::Continue
    }

    // ── Settings ──────────────────────────────────────────────────────────────

    /// Reads a setting (stored value or default).
    pub fn get(&self, key: SettingKey) -> SettingValue {
        self.store.get(key)
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.store
    }

    /// Validates, persists and fans out `value`.
    ///
    /// # Errors
    ///
    /// [`SettingsError`] if the value was rejected or could not be persisted;
    /// observers are not notified in that case.
    pub fn set(&mut self, value: SettingValue) -> Result<(), SettingsError> {
        let committed = self.store.set(value)?;
        self.fan_out(committed);
        self.drain_pending();
        Ok(())
    }

    /// Decodes and sets the field called `name` from settings-window JSON.
    ///
    /// # Errors
    ///
    /// [`SettingsError::Validation`] for an unknown name or a mistyped or
    /// out-of-range value.
    pub fn set_by_name(&mut self, name: &str, json: serde_json::Value) -> Result<(), SettingsError> {
        let key: SettingKey = name.parse()?;
        let value = SettingValue::from_json(key, json)?;
        self.set(value)
    }

    /// Restores the schema default of `key`.
    ///
    /// # Errors
    ///
    /// [`SettingsError::Storage`] if the default could not be persisted.
    pub fn reset(&mut self, key: SettingKey) -> Result<(), SettingsError> {
        info!(%key, "resetting to recommended value");
        self.set(key.default_value())
    }

    /// Flips `doubleMovementEnabled`.
    ///
    /// # Errors
    ///
    /// [`SettingsError::Storage`] if the new value could not be persisted.
    pub fn toggle_double_movement(&mut self) -> Result<(), SettingsError> {
        let enabled = self.store.double_movement_enabled();
        self.set(SettingValue::DoubleMovementEnabled(!enabled))
    }

    fn fan_out(&mut self, value: SettingValue) {
        let result = self
            .observers
            .on_setting_changed(&value, &self.store, &mut self.lifecycle);
        if let Err(e) = result {
            self.on_service_failure(e);
        }
    }

    fn drain_pending(&mut self) {
        while let Some(value) = self.pending.pop_front() {
            match self.store.set(value) {
                Ok(committed) => self.fan_out(committed),
                Err(e) => error!("queued settings write failed: {e}"),
            }
        }
    }

    // ── Service errors ────────────────────────────────────────────────────────

    fn on_service_error(&mut self, generation: u64, error: ServiceError) {
        if !self.lifecycle.is_current(generation) {
            debug!(generation, current = self.lifecycle.generation(), "discarding stale service error: {error}");
            return;
        }
        self.on_service_failure(error);
        self.drain_pending();
    }

    /// Logs, notifies, and queues the forced disable.
    fn on_service_failure(&mut self, error: ServiceError) {
        error!("double movement service error: {error}");
        self.notifier
            .show_error(SERVICE_ERROR_TITLE, &failure_message(&error));
        self.pending
            .push_back(SettingValue::DoubleMovementEnabled(false));
    }

    pub fn service_state(&self) -> ServiceState {
        self.lifecycle.state()
    }

    // ── Tray and hotkey ───────────────────────────────────────────────────────

    fn on_tray_action(&mut self, action: TrayAction) -> Flow {
        let enabled = self.store.double_movement_enabled();
        match tray_reflector::on_action(action, enabled) {
            TrayResponse::Set(value) => {
                if let Err(e) = self.set(value) {
                    warn!("tray toggle failed: {e}");
                }
                Flow::Continue
            }
            TrayResponse::ShowWindow => {
                self.show_window();
                Flow::Continue
            }
            TrayResponse::Quit => Flow::Exit,
        }
    }

    fn on_hotkey_pressed(&mut self) {
        if self.capture.is_recording() {
            debug!("ignoring toggle hotkey while capturing a new one");
            return;
        }
        if let Err(e) = self.toggle_double_movement() {
            warn!("hotkey toggle failed: {e}");
        }
    }

    /// The hotkey currently registered with the OS, if any.
    pub fn bound_hotkey(&self) -> Option<&Accelerator> {
        self.observers.bound_hotkey()
    }

    // ── Capture ───────────────────────────────────────────────────────────────

    /// Starts recording a new toggle hotkey.
    ///
    /// # Errors
    ///
    /// [`CaptureError`] if raw key events could not be subscribed to.
    pub fn begin_capture(&mut self) -> Result<(), CaptureError> {
        self.capture.begin()?;
        self.broadcast_capture();
        Ok(())
    }

    /// Abandons a recording in progress.
    pub fn cancel_capture(&mut self) {
        if self.capture.cancel() {
            self.broadcast_capture();
        }
    }

    pub fn capture(&self) -> &AcceleratorCapture {
        &self.capture
    }

    fn on_key_event(&mut self, event: RawKeyEvent) {
        match self.capture.handle(event) {
            CaptureStep::Completed(accelerator) => {
                // Committed first so the idle display shows the new hotkey.
                if let Err(e) = self.set(SettingValue::EnabledToggleAccelerator(accelerator)) {
                    warn!("captured hotkey not saved: {e}");
                }
                self.broadcast_capture();
            }
            CaptureStep::Updated => self.broadcast_capture(),
            CaptureStep::Ignored | CaptureStep::NotRecording => {}
        }
    }

    fn broadcast_capture(&mut self) {
        let event = UiEvent::CaptureChanged {
            recording: self.capture.is_recording(),
            display: self
                .capture
                .in_progress_display()
                .unwrap_or_else(|| self.store.toggle_accelerator().display()),
        };
        self.observers.broadcast(&event);
    }

    // ── Window and UI ─────────────────────────────────────────────────────────

    /// Shows the settings window and attaches its subscriber.
    pub fn show_window(&mut self) {
        self.window.show();
        self.window_visible = true;
        self.window_subscriber = match self.window_subscriber.take() {
            Some(WindowSubscriber::Parked(subscriber)) => {
                Some(WindowSubscriber::Attached(self.observers.subscribe(subscriber)))
            }
            other => other,
        };
    }

    /// Hides the settings window and parks its subscriber.
    pub fn hide_window(&mut self) {
        self.window.hide();
        self.window_visible = false;
        self.window_subscriber = match self.window_subscriber.take() {
            // `None` here means the subscriber was pruned as gone.
            Some(WindowSubscriber::Attached(id)) => {
                self.observers.unsubscribe(id).map(WindowSubscriber::Parked)
            }
            other => other,
        };
    }

    pub fn is_window_visible(&self) -> bool {
        self.window_visible
    }

    /// Hands over the settings window's subscriber, replacing any previous
    /// one.  It is attached now if the window is visible, otherwise on the
    /// next [`show_window`](Self::show_window).
    pub fn attach_window_ui(&mut self, subscriber: Box<dyn UiSubscriber>) {
        if let Some(WindowSubscriber::Attached(id)) = self.window_subscriber.take() {
            self.observers.unsubscribe(id);
        }
        self.window_subscriber = Some(if self.window_visible {
            WindowSubscriber::Attached(self.observers.subscribe(subscriber))
        } else {
            WindowSubscriber::Parked(subscriber)
        });
    }

    /// Registers a subscriber that receives events regardless of window
    /// visibility.
    pub fn subscribe_ui(&mut self, subscriber: Box<dyn UiSubscriber>) -> SubscriberId {
        self.observers.subscribe(subscriber)
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("service", &self.lifecycle.state())
            .field("observers", &self.observers)
            .field("capture", &self.capture)
            .field("window_visible", &self.window_visible)
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
