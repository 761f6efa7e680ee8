//! Raw keyboard input for the host.
//!
//! Key events come from one source (the console in the headless build, a
//! low-level keyboard hook in a desktop shell) and go to one of two places:
//!
//! - while an accelerator capture is recording, to the orchestrator as
//!   [`HostEvent::Key`] so the capture session sees every press and release;
//! - otherwise, to the global hotkey table, which turns a matching combination
//!   into [`HostEvent::HotkeyPressed`].
//!
//! The capture session decides when it wants raw keys through the
//! [`KeyListener`] trait; [`GatedKeyListener`] implements it as a shared flag
//! that [`KeyRouter`] reads on every event.
//!
//! # Testability
//!
//! Tests substitute [`mock::MockKeyListener`], which counts attach/detach
//! calls and can be told to fail.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::application::orchestrator::HostEvent;
use crate::infrastructure::hotkey::SharedHotkeyTable;

pub mod mock;

pub use crate::application::accelerator_capture::{CaptureError, KeyListener, RawKeyEvent};

// ── Gated listener ────────────────────────────────────────────────────────────

/// [`KeyListener`] backed by a flag shared with a [`KeyRouter`].
#[derive(Debug, Default)]
pub struct GatedKeyListener {
    gate: Arc<AtomicBool>,
}

impl GatedKeyListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a router that honours this listener's gate.
    pub fn router(&self, hotkeys: SharedHotkeyTable) -> KeyRouter {
        KeyRouter {
            gate: Arc::clone(&self.gate),
            hotkeys,
        }
    }
}

impl KeyListener for GatedKeyListener {
    fn attach(&mut self) -> Result<(), CaptureError> {
        self.gate.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn detach(&mut self) {
        self.gate.store(false, Ordering::SeqCst);
    }

    fn is_attached(&self) -> bool {
        self.gate.load(Ordering::SeqCst)
    }
}

/// Decides where each raw key event goes.
#[derive(Debug, Clone)]
pub struct KeyRouter {
    gate: Arc<AtomicBool>,
    hotkeys: SharedHotkeyTable,
}

impl KeyRouter {
    /// Returns the host event for `event`, if any.
    ///
    /// The hotkey table always sees the event so its held-key set stays
    /// accurate, but it never fires while the capture is listening.
    pub fn route(&self, event: RawKeyEvent) -> Option<HostEvent> {
        let triggered = self.hotkeys.feed(event);
        if self.gate.load(Ordering::SeqCst) {
            Some(HostEvent::Key(event))
        } else if triggered {
            Some(HostEvent::HotkeyPressed)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::observer_sync::HotkeyRegistrar;
    use doublemove_core::{Accelerator, KeyCode};

    fn router_with_recommended_hotkey() -> (GatedKeyListener, KeyRouter) {
        let mut table = SharedHotkeyTable::new();
        table.register(&Accelerator::recommended()).unwrap();
        let listener = GatedKeyListener::new();
        let router = listener.router(table);
        (listener, router)
    }

    #[test]
    fn test_gated_listener_toggles_attached_flag() {
        let mut listener = GatedKeyListener::new();
        assert!(!listener.is_attached());

        listener.attach().unwrap();
        assert!(listener.is_attached());

        listener.detach();
        listener.detach();
        assert!(!listener.is_attached());
    }

    #[test]
    fn test_router_fires_hotkey_when_detached() {
        // Arrange
        let (_listener, router) = router_with_recommended_hotkey();

        // Act
        router.route(RawKeyEvent::KeyDown(KeyCode::CTRL));
        router.route(RawKeyEvent::KeyDown(KeyCode::SHIFT));
        let event = router.route(RawKeyEvent::KeyDown(KeyCode::X));

        // Assert
        assert!(matches!(event, Some(HostEvent::HotkeyPressed)));
    }

    #[test]
    fn test_router_forwards_keys_to_capture_when_attached() {
        // Arrange
        let (mut listener, router) = router_with_recommended_hotkey();
        listener.attach().unwrap();

        // Act
        router.route(RawKeyEvent::KeyDown(KeyCode::CTRL));
        router.route(RawKeyEvent::KeyDown(KeyCode::SHIFT));
        let event = router.route(RawKeyEvent::KeyDown(KeyCode::X));

        // Assert: the capture sees the key, the hotkey does not fire
        assert!(matches!(event, Some(HostEvent::Key(RawKeyEvent::KeyDown(k))) if k == KeyCode::X));
    }

    #[test]
    fn test_router_drops_unbound_keys_when_detached() {
        let (_listener, router) = router_with_recommended_hotkey();
        assert!(router.route(RawKeyEvent::KeyDown(KeyCode::A)).is_none());
        assert!(router.route(RawKeyEvent::FocusLost).is_none());
    }
}
