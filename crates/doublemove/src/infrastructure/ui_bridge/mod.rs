//! Settings-window command bridge.
//!
//! Every operation the settings window can invoke is a function here that
//! takes the [`Orchestrator`] and returns a [`CommandResult`].  A window
//! shell (or the console in `main.rs`) wraps a [`UiCommand`] in a
//! [`UiRequest`], sends it down the host event channel, and optionally waits
//! on the reply.
//!
//! # `CommandResult<T>` wrapper
//!
//! All commands return `CommandResult<T>` rather than `Result<T, E>`.  Every
//! response has the same shape, `{ success, data, error }`, so the window can
//! always read `result.success` without special-casing failures.
//!
//! # Commands
//!
//! | command           | data                                   |
//! |-------------------|----------------------------------------|
//! | `store_get`       | the field's current value              |
//! | `store_set`       | the field's value after the write      |
//! | `store_reset`     | the field's default                    |
//! | `get_version`     | the host version string                |
//! | `window_close`    | `null`; exits the host                 |
//! | `window_minimize` | `null`; hides the window               |
//! | `capture_begin`   | [`CaptureStatusDto`]                   |
//! | `capture_cancel`  | [`CaptureStatusDto`]                   |
//! | `capture_status`  | [`CaptureStatusDto`]                   |

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use doublemove_core::SettingKey;

use crate::application::observer_sync::{SubscriberGone, UiEvent, UiSubscriber};
use crate::application::orchestrator::{Flow, Orchestrator};

pub mod console;

/// Version reported by `get_version`.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// ── Wire types ────────────────────────────────────────────────────────────────

/// A command from the settings window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum UiCommand {
    StoreGet { name: String },
    StoreSet { name: String, value: Value },
    StoreReset { name: String },
    GetVersion,
    WindowClose,
    WindowMinimize,
    CaptureBegin,
    CaptureCancel,
    CaptureStatus,
}

/// A [`UiCommand`] in flight, with an optional reply channel.
#[derive(Debug)]
pub struct UiRequest {
    pub command: UiCommand,
    pub reply: Option<oneshot::Sender<CommandResult<Value>>>,
}

impl UiRequest {
    /// Creates a request and the receiver its result will arrive on.
    pub fn new(command: UiCommand) -> (Self, oneshot::Receiver<CommandResult<Value>>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                command,
                reply: Some(tx),
            },
            rx,
        )
    }

    /// Creates a request whose result is discarded.
    pub fn without_reply(command: UiCommand) -> Self {
        Self {
            command,
            reply: None,
        }
    }
}

/// Unified response wrapper used by every command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResult<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> CommandResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }

    /// Erases the payload type for the reply channel.
    pub fn into_json(self) -> CommandResult<Value> {
        CommandResult {
            success: self.success,
            data: self.data.and_then(|d| serde_json::to_value(d).ok()),
            error: self.error,
        }
    }
}

/// Accelerator capture state as shown in the hotkey field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureStatusDto {
    pub recording: bool,
    /// In-progress sequence while recording, committed hotkey otherwise.
    pub display: String,
    pub placeholder: String,
}

// ── Commands ──────────────────────────────────────────────────────────────────

/// Returns the current value of the setting called `name`.
pub fn store_get(orch: &Orchestrator, name: &str) -> CommandResult<Value> {
    match orch.settings().get_by_name(name) {
        Ok(value) => CommandResult::ok(value),
        Err(e) => CommandResult::err(e.to_string()),
    }
}

/// Writes the setting called `name`.
pub fn store_set(orch: &mut Orchestrator, name: &str, value: Value) -> CommandResult<Value> {
    match orch.set_by_name(name, value) {
        Ok(()) => store_get(orch, name),
        Err(e) => CommandResult::err(e.to_string()),
    }
}

/// Restores the default of the setting called `name`.
pub fn store_reset(orch: &mut Orchestrator, name: &str) -> CommandResult<Value> {
    let key = match name.parse::<SettingKey>() {
        Ok(key) => key,
        Err(e) => return CommandResult::err(e.to_string()),
    };
    match orch.reset(key) {
        Ok(()) => store_get(orch, name),
        Err(e) => CommandResult::err(e.to_string()),
    }
}

pub fn get_version() -> CommandResult<String> {
    CommandResult::ok(APP_VERSION.to_string())
}

pub fn capture_status(orch: &Orchestrator) -> CommandResult<CaptureStatusDto> {
    let capture = orch.capture();
    let display = capture
        .in_progress_display()
        .unwrap_or_else(|| orch.settings().toggle_accelerator().display());
    CommandResult::ok(CaptureStatusDto {
        recording: capture.is_recording(),
        display,
        placeholder: capture.placeholder().to_string(),
    })
}

pub fn capture_begin(orch: &mut Orchestrator) -> CommandResult<CaptureStatusDto> {
    match orch.begin_capture() {
        Ok(()) => capture_status(orch),
        Err(e) => CommandResult::err(e.to_string()),
    }
}

pub fn capture_cancel(orch: &mut Orchestrator) -> CommandResult<CaptureStatusDto> {
    orch.cancel_capture();
    capture_status(orch)
}

/// Runs `command` and reports whether the host should keep going.
pub fn execute(orch: &mut Orchestrator, command: UiCommand) -> (CommandResult<Value>, Flow) {
    debug!(?command, "UI command");
    let result = match command {
        UiCommand::StoreGet { name } => store_get(orch, &name),
        UiCommand::StoreSet { name, value } => store_set(orch, &name, value),
        UiCommand::StoreReset { name } => store_reset(orch, &name),
        UiCommand::GetVersion => get_version().into_json(),
        UiCommand::WindowClose => return (CommandResult::ok(Value::Null), Flow::Exit),
        UiCommand::WindowMinimize => {
            orch.hide_window();
            CommandResult::ok(Value::Null)
        }
        UiCommand::CaptureBegin => capture_begin(orch).into_json(),
        UiCommand::CaptureCancel => capture_cancel(orch).into_json(),
        UiCommand::CaptureStatus => capture_status(orch).into_json(),
    };
    (result, Flow::Continue)
}

/// Runs a request and delivers its reply, if one is awaited.
pub fn dispatch(orch: &mut Orchestrator, request: UiRequest) -> Flow {
    let (result, flow) = execute(orch, request.command);
    if let Some(reply) = request.reply {
        if reply.send(result).is_err() {
            debug!("UI command reply dropped; requester went away");
        }
    }
    flow
}

// ── Subscribers ───────────────────────────────────────────────────────────────

/// Forwards [`UiEvent`]s into a channel.  Gone once the receiver is dropped.
#[derive(Debug, Clone)]
pub struct ChannelSubscriber {
    tx: mpsc::UnboundedSender<UiEvent>,
}

impl ChannelSubscriber {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<UiEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl UiSubscriber for ChannelSubscriber {
    fn notify(&mut self, event: &UiEvent) -> Result<(), SubscriberGone> {
        self.tx.send(event.clone()).map_err(|_| SubscriberGone)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_command_result_ok_has_data_and_no_error() {
        let r = CommandResult::ok(42u32);
        assert!(r.success);
        assert_eq!(r.data, Some(42));
        assert!(r.error.is_none());
    }

    #[test]
    fn test_command_result_err_has_message_and_no_data() {
        let r: CommandResult<u32> = CommandResult::err("bad");
        assert!(!r.success);
        assert!(r.data.is_none());
        assert_eq!(r.error.as_deref(), Some("bad"));
    }

    #[test]
    fn test_command_result_serializes_uniform_shape() {
        let json = serde_json::to_value(CommandResult::ok("1.0".to_string())).unwrap();
        assert_eq!(json, json!({"success": true, "data": "1.0", "error": null}));
    }

    #[test]
    fn test_into_json_keeps_payload() {
        let r = get_version().into_json();
        assert_eq!(r.data, Some(json!(APP_VERSION)));
    }

    #[test]
    fn test_ui_command_deserializes_from_tagged_json() {
        let cmd: UiCommand = serde_json::from_value(json!({
            "command": "store_set",
            "name": "doubleMovementEnabled",
            "value": true
        }))
        .unwrap();
        assert_eq!(
            cmd,
            UiCommand::StoreSet {
                name: "doubleMovementEnabled".to_string(),
                value: json!(true)
            }
        );
    }

    #[test]
    fn test_capture_status_dto_uses_camel_case() {
        let json = serde_json::to_value(CaptureStatusDto {
            recording: true,
            display: "Ctrl+...".to_string(),
            placeholder: "Start pressing a key".to_string(),
        })
        .unwrap();
        assert_eq!(json["recording"], json!(true));
        assert_eq!(json["placeholder"], json!("Start pressing a key"));
    }

    #[test]
    fn test_channel_subscriber_is_gone_after_receiver_drop() {
        let (mut sub, rx) = ChannelSubscriber::new();
        let event = UiEvent::CaptureChanged {
            recording: false,
            display: String::new(),
        };
        assert!(sub.notify(&event).is_ok());

        drop(rx);

        assert_eq!(sub.notify(&event), Err(SubscriberGone));
    }
}
