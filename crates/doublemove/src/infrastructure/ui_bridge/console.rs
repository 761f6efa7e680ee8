//! Line-oriented console that drives the host without a window.
//!
//! Each stdin line is one command:
//!
//! ```text
//! get <name>                 store_get
//! set <name> <json|text>     store_set (bare text is sent as a JSON string)
//! reset <name>               store_reset
//! version                    get_version
//! close | minimize           window_close / window_minimize
//! capture [cancel|status]    capture_begin / capture_cancel / capture_status
//! tray <show|toggle|quit|dblclick>
//! hotkey                     press the registered toggle hotkey
//! down <key> | up <key>      raw key events (name such as Ctrl, or 0x11)
//! blur                       settings window loses focus
//! fail <message>             make the running service report an error
//! fail start <message>       make the next service start fail
//! help | quit
//! ```

use doublemove_core::KeyCode;
use serde_json::Value;
use thiserror::Error;

use crate::application::accelerator_capture::RawKeyEvent;
use crate::application::tray_reflector::{TrayAction, TrayItemId};

use super::UiCommand;

/// Help text printed by the `help` command.
pub const HELP: &str = "\
commands:
  get <name> | set <name> <value> | reset <name>
  version | close | minimize
  capture [cancel|status]
  tray <show|toggle|quit|dblclick> | hotkey
  down <key> | up <key> | blur
  fail <message> | fail start <message>
  help | quit
settings: doubleMovementEnabled keyMapping leftJoystickStrafingAngles enabledToggleAccelerator";

/// A parsed console line.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Ui(UiCommand),
    Tray(TrayAction),
    Hotkey,
    Key(RawKeyEvent),
    InjectFailure(String),
    FailNextStart(String),
    Help,
    Quit,
}

/// Why a console line was not understood.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsoleError {
    #[error("unknown command {0:?}; type `help`")]
    UnknownCommand(String),
    #[error("`{0}` needs an argument")]
    MissingArgument(&'static str),
    #[error("unknown key {0:?}")]
    UnknownKey(String),
    #[error("unknown tray action {0:?}")]
    UnknownTrayAction(String),
}

/// Parses one console line.  Blank lines parse to `None`.
pub fn parse_line(line: &str) -> Result<Option<ConsoleCommand>, ConsoleError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "get" => ConsoleCommand::Ui(UiCommand::StoreGet {
            name: required(rest, "get")?.to_string(),
        }),
        "set" => {
            let (name, value) = required(rest, "set")?
                .split_once(char::is_whitespace)
                .ok_or(ConsoleError::MissingArgument("set"))?;
            ConsoleCommand::Ui(UiCommand::StoreSet {
                name: name.to_string(),
                value: parse_value(value.trim()),
            })
        }
        "reset" => ConsoleCommand::Ui(UiCommand::StoreReset {
            name: required(rest, "reset")?.to_string(),
        }),
        "version" => ConsoleCommand::Ui(UiCommand::GetVersion),
        "close" => ConsoleCommand::Ui(UiCommand::WindowClose),
        "minimize" => ConsoleCommand::Ui(UiCommand::WindowMinimize),
        "capture" => match rest {
            "" | "begin" => ConsoleCommand::Ui(UiCommand::CaptureBegin),
            "cancel" => ConsoleCommand::Ui(UiCommand::CaptureCancel),
            "status" => ConsoleCommand::Ui(UiCommand::CaptureStatus),
            other => return Err(ConsoleError::UnknownCommand(format!("capture {other}"))),
        },
        "tray" => ConsoleCommand::Tray(parse_tray(required(rest, "tray")?)?),
        "hotkey" => ConsoleCommand::Hotkey,
        "down" => ConsoleCommand::Key(RawKeyEvent::KeyDown(parse_key(required(rest, "down")?)?)),
        "up" => ConsoleCommand::Key(RawKeyEvent::KeyUp(parse_key(required(rest, "up")?)?)),
        "blur" => ConsoleCommand::Key(RawKeyEvent::FocusLost),
        "fail" => match rest.split_once(char::is_whitespace) {
            Some(("start", message)) => ConsoleCommand::FailNextStart(failure_text(message.trim())),
            _ if rest == "start" => ConsoleCommand::FailNextStart(failure_text("")),
            _ => ConsoleCommand::InjectFailure(failure_text(rest)),
        },
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        other => return Err(ConsoleError::UnknownCommand(other.to_string())),
    };
    Ok(Some(command))
}

fn required<'a>(rest: &'a str, command: &'static str) -> Result<&'a str, ConsoleError> {
    if rest.is_empty() {
        Err(ConsoleError::MissingArgument(command))
    } else {
        Ok(rest)
    }
}

fn failure_text(message: &str) -> String {
    if message.is_empty() {
        "injected failure".to_string()
    } else {
        message.to_string()
    }
}

fn parse_value(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn parse_tray(text: &str) -> Result<TrayAction, ConsoleError> {
    match text.to_ascii_lowercase().as_str() {
        "show" => Ok(TrayAction::MenuItem(TrayItemId::ShowWindow)),
        "toggle" => Ok(TrayAction::MenuItem(TrayItemId::ToggleDoubleMovement)),
        "quit" => Ok(TrayAction::MenuItem(TrayItemId::Quit)),
        "dblclick" | "doubleclick" => Ok(TrayAction::IconDoubleClicked),
        _ => Err(ConsoleError::UnknownTrayAction(text.to_string())),
    }
}

fn parse_key(text: &str) -> Result<KeyCode, ConsoleError> {
    let hex = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"));
    if let Some(hex) = hex {
        return u8::from_str_radix(hex, 16)
            .map(KeyCode::new)
            .map_err(|_| ConsoleError::UnknownKey(text.to_string()));
    }
    KeyCode::from_name(text).ok_or_else(|| ConsoleError::UnknownKey(text.to_string()))
}
