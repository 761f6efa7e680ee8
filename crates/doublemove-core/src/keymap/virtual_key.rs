//! Virtual-key code name table.
//!
//! Key codes follow the Windows Virtual-Key numbering (winuser.h), which is
//! also the numbering browsers report in `KeyboardEvent.keyCode`.  Every code
//! the settings window or a low-level keyboard hook can deliver lands in the
//! same 0x00–0xFF space, so one table serves both sources.
//!
//! Each entry carries two names:
//!
//! - `display` – what the settings window shows (`"Ctrl"`, `"X"`, `"F5"`).
//! - `shortcut` – the token a global shortcut registrar understands
//!   (`"CommandOrControl"`, `"X"`, `"F5"`).  Keys without a shortcut token
//!   cannot be part of an accelerator.
//!
//! Reference: https://learn.microsoft.com/windows/win32/inputdev/virtual-key-codes

/// Names attached to one virtual-key code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyName {
    /// Human-readable name used when rendering accelerators and key binds.
    pub display: &'static str,
    /// Global-shortcut token, `None` when the key is not accelerator-eligible.
    pub shortcut: Option<&'static str>,
}

const fn key(display: &'static str, shortcut: &'static str) -> Option<KeyName> {
    Some(KeyName {
        display,
        shortcut: Some(shortcut),
    })
}

const fn display_only(display: &'static str) -> Option<KeyName> {
    Some(KeyName {
        display,
        shortcut: None,
    })
}

/// Looks up the names for a raw virtual-key code.
///
/// Returns `None` for codes that are not keyboard keys (mouse buttons,
/// IME controls, reserved values).
pub fn lookup(code: u8) -> Option<KeyName> {
    KEY_NAME_TABLE[code as usize]
}

/// Finds the code whose display name matches `name` (ASCII case-insensitive).
///
/// Generic modifier codes win over their side-specific variants because they
/// appear first in the table.
pub fn find_by_display(name: &str) -> Option<u8> {
    KEY_NAME_TABLE.iter().enumerate().find_map(|(code, entry)| match entry {
        Some(k) if k.display.eq_ignore_ascii_case(name) => Some(code as u8),
        _ => None,
    })
}

/// Complete name table indexed by virtual-key code.
const KEY_NAME_TABLE: [Option<KeyName>; 256] = {
    let mut t: [Option<KeyName>; 256] = [None; 256];

    // ── Editing / whitespace ──────────────────────────────────────────────────
    t[0x08] = key("Backspace", "Backspace"); // VK_BACK
    t[0x09] = key("Tab", "Tab"); // VK_TAB
    t[0x0D] = key("Enter", "Return"); // VK_RETURN
    t[0x1B] = key("Escape", "Escape"); // VK_ESCAPE
    t[0x20] = key("Space", "Space"); // VK_SPACE

    // ── Generic modifiers ─────────────────────────────────────────────────────
    t[0x10] = key("Shift", "Shift"); // VK_SHIFT
    t[0x11] = key("Ctrl", "CommandOrControl"); // VK_CONTROL
    t[0x12] = key("Alt", "Alt"); // VK_MENU
    t[0x5B] = key("Meta", "Super"); // VK_LWIN

    // ── Lock keys ─────────────────────────────────────────────────────────────
    t[0x13] = display_only("Pause"); // VK_PAUSE
    t[0x14] = key("CapsLock", "Capslock"); // VK_CAPITAL
    t[0x90] = key("NumLock", "Numlock"); // VK_NUMLOCK
    t[0x91] = key("ScrollLock", "Scrolllock"); // VK_SCROLL

    // ── Navigation cluster ────────────────────────────────────────────────────
    t[0x21] = key("PageUp", "PageUp"); // VK_PRIOR
    t[0x22] = key("PageDown", "PageDown"); // VK_NEXT
    t[0x23] = key("End", "End");
    t[0x24] = key("Home", "Home");
    t[0x25] = key("Left", "Left");
    t[0x26] = key("Up", "Up");
    t[0x27] = key("Right", "Right");
    t[0x28] = key("Down", "Down");
    t[0x2C] = key("PrintScreen", "PrintScreen"); // VK_SNAPSHOT
    t[0x2D] = key("Insert", "Insert");
    t[0x2E] = key("Delete", "Delete");

    // ── Digit row (VK_0=0x30 … VK_9=0x39) ─────────────────────────────────────
    t[0x30] = key("0", "0");
    t[0x31] = key("1", "1");
    t[0x32] = key("2", "2");
    t[0x33] = key("3", "3");
    t[0x34] = key("4", "4");
    t[0x35] = key("5", "5");
    t[0x36] = key("6", "6");
    t[0x37] = key("7", "7");
    t[0x38] = key("8", "8");
    t[0x39] = key("9", "9");

    // ── Letters (VK_A=0x41 … VK_Z=0x5A) ──────────────────────────────────────
    t[0x41] = key("A", "A");
    t[0x42] = key("B", "B");
    t[0x43] = key("C", "C");
    t[0x44] = key("D", "D");
    t[0x45] = key("E", "E");
    t[0x46] = key("F", "F");
    t[0x47] = key("G", "G");
    t[0x48] = key("H", "H");
    t[0x49] = key("I", "I");
    t[0x4A] = key("J", "J");
    t[0x4B] = key("K", "K");
    t[0x4C] = key("L", "L");
    t[0x4D] = key("M", "M");
    t[0x4E] = key("N", "N");
    t[0x4F] = key("O", "O");
    t[0x50] = key("P", "P");
    t[0x51] = key("Q", "Q");
    t[0x52] = key("R", "R");
    t[0x53] = key("S", "S");
    t[0x54] = key("T", "T");
    t[0x55] = key("U", "U");
    t[0x56] = key("V", "V");
    t[0x57] = key("W", "W");
    t[0x58] = key("X", "X");
    t[0x59] = key("Y", "Y");
    t[0x5A] = key("Z", "Z");

    t[0x5D] = display_only("ContextMenu"); // VK_APPS

    // ── Numpad ────────────────────────────────────────────────────────────────
    t[0x60] = key("Num0", "num0");
    t[0x61] = key("Num1", "num1");
    t[0x62] = key("Num2", "num2");
    t[0x63] = key("Num3", "num3");
    t[0x64] = key("Num4", "num4");
    t[0x65] = key("Num5", "num5");
    t[0x66] = key("Num6", "num6");
    t[0x67] = key("Num7", "num7");
    t[0x68] = key("Num8", "num8");
    t[0x69] = key("Num9", "num9");
    t[0x6A] = key("NumMultiply", "nummult");
    t[0x6B] = key("NumAdd", "numadd");
    t[0x6D] = key("NumSubtract", "numsub");
    t[0x6E] = key("NumDecimal", "numdec");
    t[0x6F] = key("NumDivide", "numdiv");

    // ── Function keys (VK_F1=0x70 … VK_F24=0x87) ─────────────────────────────
    t[0x70] = key("F1", "F1");
    t[0x71] = key("F2", "F2");
    t[0x72] = key("F3", "F3");
    t[0x73] = key("F4", "F4");
    t[0x74] = key("F5", "F5");
    t[0x75] = key("F6", "F6");
    t[0x76] = key("F7", "F7");
    t[0x77] = key("F8", "F8");
    t[0x78] = key("F9", "F9");
    t[0x79] = key("F10", "F10");
    t[0x7A] = key("F11", "F11");
    t[0x7B] = key("F12", "F12");
    t[0x7C] = key("F13", "F13");
    t[0x7D] = key("F14", "F14");
    t[0x7E] = key("F15", "F15");
    t[0x7F] = key("F16", "F16");
    t[0x80] = key("F17", "F17");
    t[0x81] = key("F18", "F18");
    t[0x82] = key("F19", "F19");
    t[0x83] = key("F20", "F20");
    t[0x84] = key("F21", "F21");
    t[0x85] = key("F22", "F22");
    t[0x86] = key("F23", "F23");
    t[0x87] = key("F24", "F24");

    // ── Side-specific modifiers (low-level hooks) ─────────────────────────────
    // Named like their generic counterparts; `KeyCode::normalized` folds them.
    t[0xA0] = key("Shift", "Shift"); // VK_LSHIFT
    t[0xA1] = key("Shift", "Shift"); // VK_RSHIFT
    t[0xA2] = key("Ctrl", "CommandOrControl"); // VK_LCONTROL
    t[0xA3] = key("Ctrl", "CommandOrControl"); // VK_RCONTROL
    t[0xA4] = key("Alt", "Alt"); // VK_LMENU
    t[0xA5] = key("Alt", "Alt"); // VK_RMENU
    t[0x5C] = key("Meta", "Super"); // VK_RWIN

    // ── Media ─────────────────────────────────────────────────────────────────
    t[0xAD] = key("VolumeMute", "VolumeMute");
    t[0xAE] = key("VolumeDown", "VolumeDown");
    t[0xAF] = key("VolumeUp", "VolumeUp");
    t[0xB0] = key("MediaNextTrack", "MediaNextTrack");
    t[0xB1] = key("MediaPreviousTrack", "MediaPreviousTrack");
    t[0xB2] = key("MediaStop", "MediaStop");
    t[0xB3] = key("MediaPlayPause", "MediaPlayPause");

    // ── Punctuation (US layout legends) ───────────────────────────────────────
    t[0xBA] = key(";", ";"); // VK_OEM_1
    t[0xBB] = key("=", "="); // VK_OEM_PLUS
    t[0xBC] = key(",", ","); // VK_OEM_COMMA
    t[0xBD] = key("-", "-"); // VK_OEM_MINUS
    t[0xBE] = key(".", "."); // VK_OEM_PERIOD
    t[0xBF] = key("/", "/"); // VK_OEM_2
    t[0xC0] = key("`", "`"); // VK_OEM_3
    t[0xDB] = key("[", "["); // VK_OEM_4
    t[0xDC] = key("\\", "\\"); // VK_OEM_5
    t[0xDD] = key("]", "]"); // VK_OEM_6
    t[0xDE] = key("'", "'"); // VK_OEM_7

    t
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letters_and_digits_are_named_and_eligible() {
        for code in (0x41u8..=0x5A).chain(0x30..=0x39) {
            let name = lookup(code).unwrap_or_else(|| panic!("0x{code:02X} must be named"));
            assert!(name.shortcut.is_some(), "0x{code:02X} must be eligible");
        }
    }

    #[test]
    fn test_non_keyboard_codes_are_unnamed() {
        // Mouse buttons and undefined codes
        for code in [0x00u8, 0x01, 0x02, 0x04, 0x05, 0x06, 0x0A, 0xFF] {
            assert_eq!(lookup(code), None, "0x{code:02X} must not be named");
        }
    }

    #[test]
    fn test_pause_is_named_but_not_eligible() {
        let pause = lookup(0x13).expect("Pause is a keyboard key");
        assert_eq!(pause.display, "Pause");
        assert_eq!(pause.shortcut, None);
    }

    #[test]
    fn test_find_by_display_prefers_generic_modifier_codes() {
        assert_eq!(find_by_display("ctrl"), Some(0x11));
        assert_eq!(find_by_display("Shift"), Some(0x10));
        assert_eq!(find_by_display("ALT"), Some(0x12));
        assert_eq!(find_by_display("meta"), Some(0x5B));
    }

    #[test]
    fn test_find_by_display_unknown_name_returns_none() {
        assert_eq!(find_by_display("Hyper"), None);
    }

    #[test]
    fn test_lookup_never_panics_for_any_u8() {
        for code in 0u8..=255 {
            let _ = lookup(code);
        }
    }
}
