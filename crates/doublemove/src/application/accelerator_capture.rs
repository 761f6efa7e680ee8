//! Accelerator Capture: records a new toggle hotkey from raw key presses.
//!
//! ```text
//!            begin()                     non-modifier key-down
//!   Idle ─────────────▶ Recording ─────────────────────────────▶ Idle
//!    ▲                    │   ▲                                (commit)
//!    │   cancel() /       │   │ modifier key-down: append
//!    └── focus lost ──────┘   │ key-up: remove
//!                             └─ ineligible / repeated key: ignore
//! ```
//!
//! Keys are kept in press order while recording, so the in-progress display
//! shows what the user actually pressed.  The committed [`Accelerator`] is
//! normalized (modifiers in canonical order, final key last).
//!
//! The raw key listener is attached only while recording and is detached on
//! every way out of that state.

use doublemove_core::{format_in_progress, Accelerator, KeyCode};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Placeholder shown in the hotkey field while recording.
pub const RECORDING_PLACEHOLDER: &str = "Start pressing a key";
/// Placeholder shown in the hotkey field otherwise.
pub const IDLE_PLACEHOLDER: &str = "Click to set";

// ── Raw key port ──────────────────────────────────────────────────────────────

/// A raw keyboard event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawKeyEvent {
    /// A key was pressed down.  Auto-repeat produces repeated `KeyDown`s.
    KeyDown(KeyCode),
    /// A key was released.
    KeyUp(KeyCode),
    /// The window receiving key events lost focus.
    FocusLost,
}

/// Error type for key listener operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("failed to subscribe to keyboard events: {0}")]
    SubscribeFailed(String),
}

/// A key the capture refused.  Logged; the session carries on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CaptureInputError {
    #[error("key {0} cannot be used in a hotkey")]
    IneligibleKey(KeyCode),
}

/// Subscription to raw key events on behalf of the capture.
///
/// Implemented by `infrastructure::input_capture`.
pub trait KeyListener: Send {
    /// Starts delivering raw key events to the orchestrator.
    fn attach(&mut self) -> Result<(), CaptureError>;
    /// Stops delivering raw key events.  Idempotent.
    fn detach(&mut self);
    /// `true` while attached.
    fn is_attached(&self) -> bool;
}

// ── State machine ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum CaptureState {
    Idle,
    Recording { pressed: Vec<KeyCode> },
}

/// Result of feeding one key event to the capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureStep {
    /// No recording in progress; the event was not consumed.
    NotRecording,
    /// The event changed nothing.
    Ignored,
    /// The in-progress sequence changed.
    Updated,
    /// A final key completed the sequence.  The capture is idle again.
    Completed(Accelerator),
}

/// The capture session.
pub struct AcceleratorCapture {
    state: CaptureState,
    listener: Box<dyn KeyListener>,
}

impl AcceleratorCapture {
    pub fn new(listener: Box<dyn KeyListener>) -> Self {
        Self {
            state: CaptureState::Idle,
            listener,
        }
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.state, CaptureState::Recording { .. })
    }

    /// Starts recording, discarding any sequence already in progress.
    ///
    /// # Errors
    ///
    /// [`CaptureError`] if the key listener could not be attached; the
    /// capture stays idle.
    pub fn begin(&mut self) -> Result<(), CaptureError> {
        if !self.is_recording() {
            self.listener.attach()?;
        }
        self.state = CaptureState::Recording { pressed: Vec::new() };
        info!("hotkey capture started");
        Ok(())
    }

    /// Abandons the recording.  Returns `false` if nothing was recording.
    pub fn cancel(&mut self) -> bool {
        if !self.is_recording() {
            return false;
        }
        self.finish();
        info!("hotkey capture cancelled");
        true
    }

    /// Feeds one raw key event.
    pub fn handle(&mut self, event: RawKeyEvent) -> CaptureStep {
        match event {
            RawKeyEvent::KeyDown(key) => self.key_down(key),
            RawKeyEvent::KeyUp(key) => self.key_up(key),
            RawKeyEvent::FocusLost => {
                if self.cancel() {
                    CaptureStep::Updated
                } else {
                    CaptureStep::NotRecording
                }
            }
        }
    }

    pub fn key_down(&mut self, key: KeyCode) -> CaptureStep {
        let CaptureState::Recording { pressed } = &mut self.state else {
            return CaptureStep::NotRecording;
        };

        let key = key.normalized();
        if !key.is_accelerator_eligible() {
            debug!("{}", CaptureInputError::IneligibleKey(key));
            return CaptureStep::Ignored;
        }
        if pressed.contains(&key) {
            return CaptureStep::Ignored;
        }
        pressed.push(key);

        if key.is_modifier() {
            return CaptureStep::Updated;
        }

        let result = Accelerator::from_keys(pressed.iter().copied());
        self.finish();
        match result {
            Ok(accelerator) => {
                info!(hotkey = %accelerator, "hotkey captured");
                CaptureStep::Completed(accelerator)
            }
            Err(e) => {
                // Unreachable in practice: only modifiers precede the final key.
                warn!("captured sequence rejected: {e}");
                CaptureStep::Updated
            }
        }
    }

    pub fn key_up(&mut self, key: KeyCode) -> CaptureStep {
        let CaptureState::Recording { pressed } = &mut self.state else {
            return CaptureStep::NotRecording;
        };
        let key = key.normalized();
        let before = pressed.len();
        pressed.retain(|k| *k != key);
        if pressed.len() == before {
            CaptureStep::Ignored
        } else {
            CaptureStep::Updated
        }
    }

    /// The in-progress sequence, e.g. `"Ctrl+Shift+..."`, or `None` when idle.
    pub fn in_progress_display(&self) -> Option<String> {
        match &self.state {
            CaptureState::Recording { pressed } => Some(format_in_progress(pressed)),
            CaptureState::Idle => None,
        }
    }

    pub fn placeholder(&self) -> &'static str {
        if self.is_recording() {
            RECORDING_PLACEHOLDER
        } else {
            IDLE_PLACEHOLDER
        }
    }

    fn finish(&mut self) {
        self.listener.detach();
        self.state = CaptureState::Idle;
    }
}

impl Drop for AcceleratorCapture {
    fn drop(&mut self) {
        if self.is_recording() {
            self.listener.detach();
        }
    }
}

impl std::fmt::Debug for AcceleratorCapture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcceleratorCapture")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
