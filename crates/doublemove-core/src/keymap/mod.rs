//! Key codes and their classification.
//!
//! [`KeyCode`] wraps a virtual-key code (see [`virtual_key`]).  Everything the
//! host reasons about keys goes through this type: whether a key is a
//! modifier, whether it may appear in an accelerator, and how it is named.

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod virtual_key;

/// A keyboard key identified by its virtual-key code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyCode(u8);

impl KeyCode {
    pub const BACKSPACE: KeyCode = KeyCode(0x08);
    pub const TAB: KeyCode = KeyCode(0x09);
    pub const ENTER: KeyCode = KeyCode(0x0D);
    pub const SHIFT: KeyCode = KeyCode(0x10);
    pub const CTRL: KeyCode = KeyCode(0x11);
    pub const ALT: KeyCode = KeyCode(0x12);
    pub const PAUSE: KeyCode = KeyCode(0x13);
    pub const ESCAPE: KeyCode = KeyCode(0x1B);
    pub const SPACE: KeyCode = KeyCode(0x20);
    pub const A: KeyCode = KeyCode(0x41);
    pub const B: KeyCode = KeyCode(0x42);
    pub const D: KeyCode = KeyCode(0x44);
    pub const S: KeyCode = KeyCode(0x53);
    pub const W: KeyCode = KeyCode(0x57);
    pub const X: KeyCode = KeyCode(0x58);
    pub const Y: KeyCode = KeyCode(0x59);
    pub const META: KeyCode = KeyCode(0x5B);
    pub const F1: KeyCode = KeyCode(0x70);

    /// Wraps a raw virtual-key code.  Any value is accepted; use
    /// [`is_known`](Self::is_known) to check it names a keyboard key.
    pub const fn new(code: u8) -> Self {
        Self(code)
    }

    /// Returns the raw virtual-key code.
    pub const fn code(self) -> u8 {
        self.0
    }

    /// Folds side-specific modifier codes into their generic code.
    ///
    /// Low-level keyboard hooks report `VK_LCONTROL`/`VK_RCONTROL` where the
    /// settings window reports `VK_CONTROL`; accelerators only store the
    /// generic form.
    pub const fn normalized(self) -> Self {
        match self.0 {
            0xA0 | 0xA1 => Self::SHIFT,
            0xA2 | 0xA3 => Self::CTRL,
            0xA4 | 0xA5 => Self::ALT,
            0x5C => Self::META,
            _ => self,
        }
    }

    /// `true` for Ctrl, Alt, Shift and Meta (either side).
    pub const fn is_modifier(self) -> bool {
        self.modifier_rank().is_some()
    }

    /// Position of a modifier in canonical accelerator order
    /// (Ctrl, Alt, Shift, Meta).  `None` for non-modifiers.
    pub const fn modifier_rank(self) -> Option<u8> {
        match self.normalized().0 {
            0x11 => Some(0),
            0x12 => Some(1),
            0x10 => Some(2),
            0x5B => Some(3),
            _ => None,
        }
    }

    /// `true` if the code names a keyboard key.
    pub fn is_known(self) -> bool {
        virtual_key::lookup(self.0).is_some()
    }

    /// `true` if the key may be part of a global-shortcut accelerator.
    pub fn is_accelerator_eligible(self) -> bool {
        self.shortcut_name().is_some()
    }

    /// Human-readable key name, e.g. `"Ctrl"` or `"X"`.
    pub fn name(self) -> Option<&'static str> {
        virtual_key::lookup(self.0).map(|k| k.display)
    }

    /// Global-shortcut token, e.g. `"CommandOrControl"` or `"X"`.
    pub fn shortcut_name(self) -> Option<&'static str> {
        virtual_key::lookup(self.0).and_then(|k| k.shortcut)
    }

    /// Resolves a display name back to a key code.
    ///
    /// Matching is ASCII case-insensitive and accepts a few common aliases
    /// (`Control`, `Cmd`, `Win`, `Option`, `Esc`, `Return`).
    pub fn from_name(name: &str) -> Option<Self> {
        let trimmed = name.trim();
        let canonical = match trimmed.to_ascii_lowercase().as_str() {
            "control" | "commandorcontrol" | "cmdorctrl" => "Ctrl",
            "cmd" | "command" | "super" | "win" | "windows" => "Meta",
            "option" | "opt" => "Alt",
            "esc" => "Escape",
            "return" => "Enter",
            _ => trimmed,
        };
        virtual_key::find_by_display(canonical).map(Self)
    }
}

impl From<u8> for KeyCode {
    fn from(code: u8) -> Self {
        Self(code)
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "0x{:02X}", self.0),
        }
    }
}
