//! Tray/Menu Reflector.
//!
//! The tray menu is a pure function of the settings: [`build_menu`] is called
//! again after every change and the whole menu is re-rendered, never patched.
//! [`on_action`] maps a user interaction back to what the host should do.

use doublemove_core::SettingValue;

/// Tooltip shown on the tray icon.
pub const TRAY_TOOLTIP: &str = "Double Movement";

/// Identifies an actionable tray menu entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayItemId {
    ShowWindow,
    ToggleDoubleMovement,
    Quit,
}

/// One entry of the tray context menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrayMenuItem {
    Action { id: TrayItemId, label: &'static str },
    Checkbox { id: TrayItemId, label: &'static str, checked: bool },
    Separator,
}

/// The full tray state: tooltip plus context menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrayMenu {
    pub tooltip: &'static str,
    pub items: Vec<TrayMenuItem>,
}

impl TrayMenu {
    /// Checked state of the checkbox `id`, or `None` if it is not a checkbox.
    pub fn is_checked(&self, id: TrayItemId) -> Option<bool> {
        self.items.iter().find_map(|item| match item {
            TrayMenuItem::Checkbox { id: item_id, checked, .. } if *item_id == id => Some(*checked),
            _ => None,
        })
    }
}

/// Something the tray can display.
pub trait TrayView: Send {
    fn render(&mut self, menu: &TrayMenu);
}

/// Builds the tray menu for the current enabled state.
pub fn build_menu(double_movement_enabled: bool) -> TrayMenu {
    TrayMenu {
        tooltip: TRAY_TOOLTIP,
        items: vec![
            TrayMenuItem::Action {
                id: TrayItemId::ShowWindow,
                label: "Show Window",
            },
            TrayMenuItem::Checkbox {
                id: TrayItemId::ToggleDoubleMovement,
                label: "Toggle Double Movement",
                checked: double_movement_enabled,
            },
            TrayMenuItem::Separator,
            TrayMenuItem::Action {
                id: TrayItemId::Quit,
                label: "Quit",
            },
        ],
    }
}

// ── Actions ───────────────────────────────────────────────────────────────────

/// A user interaction with the tray icon or its menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayAction {
    MenuItem(TrayItemId),
    IconDoubleClicked,
}

/// What the host should do in response to a [`TrayAction`].
#[derive(Debug, Clone, PartialEq)]
pub enum TrayResponse {
    Set(SettingValue),
    ShowWindow,
    Quit,
}

/// Maps `action` to a host response, given the current enabled state.
pub fn on_action(action: TrayAction, double_movement_enabled: bool) -> TrayResponse {
    match action {
        TrayAction::MenuItem(TrayItemId::ToggleDoubleMovement) => {
            TrayResponse::Set(SettingValue::DoubleMovementEnabled(!double_movement_enabled))
        }
        TrayAction::MenuItem(TrayItemId::ShowWindow) | TrayAction::IconDoubleClicked => {
            TrayResponse::ShowWindow
        }
        TrayAction::MenuItem(TrayItemId::Quit) => TrayResponse::Quit,
    }
}
