//! Headless desktop adapters: tray, notifications and window as log output.
//!
//! A windowed shell replaces these with real tray/dialog/window bindings.
//! The headless build renders each of them through `tracing`, which keeps
//! the host fully usable from the console and makes the behaviour visible
//! in the log.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tracing::{error, info};

use crate::application::orchestrator::WindowControl;
use crate::application::service_lifecycle::Notifier;
use crate::application::tray_reflector::{TrayMenu, TrayMenuItem, TrayView};

/// Renders the tray menu as one log line.
#[derive(Debug, Default)]
pub struct LogTray {
    last: Option<TrayMenu>,
}

impl LogTray {
    pub fn new() -> Self {
        Self::default()
    }
}

/// One-line text form of a tray menu, e.g.
/// `Show Window | [x] Toggle Double Movement | --- | Quit`.
pub fn describe_menu(menu: &TrayMenu) -> String {
    menu.items
        .iter()
        .map(|item| match item {
            TrayMenuItem::Action { label, .. } => (*label).to_string(),
            TrayMenuItem::Checkbox { label, checked, .. } => {
                format!("[{}] {label}", if *checked { "x" } else { " " })
            }
            TrayMenuItem::Separator => "---".to_string(),
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

impl TrayView for LogTray {
    fn render(&mut self, menu: &TrayMenu) {
        if self.last.as_ref() == Some(menu) {
            return;
        }
        info!(tooltip = menu.tooltip, "tray: {}", describe_menu(menu));
        self.last = Some(menu.clone());
    }
}

/// Logs error notifications at `error` level.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn show_error(&mut self, title: &str, body: &str) {
        error!(title, "{body}");
    }
}

/// Tracks window visibility and logs changes.
#[derive(Debug, Clone, Default)]
pub struct LogWindow {
    visible: Arc<AtomicBool>,
}

impl LogWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }
}

impl WindowControl for LogWindow {
    fn show(&mut self) {
        self.visible.store(true, Ordering::SeqCst);
        info!("window: shown and focused");
    }

    fn hide(&mut self) {
        if self.visible.swap(false, Ordering::SeqCst) {
            info!("window: hidden");
        }
    }
}
