//! Process-wide global hotkey table.
//!
//! Stands in for the OS global-shortcut registrar.  There is one hotkey slot:
//! registering while something is bound fails, so callers must unregister
//! first.  Combinations listed as reserved behave as if another application
//! had already claimed them.
//!
//! The table also tracks which keys are currently held so it can tell when a
//! key-down completes the bound combination.  Auto-repeat of the final key
//! does not fire the hotkey a second time.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use doublemove_core::{Accelerator, KeyCode};
use tracing::{debug, info};

use crate::application::observer_sync::{HotkeyError, HotkeyRegistrar};
use crate::infrastructure::input_capture::RawKeyEvent;

#[derive(Debug, Default)]
struct HotkeyTable {
    bound: Option<Accelerator>,
    reserved: Vec<Accelerator>,
    held: Vec<KeyCode>,
}

/// Cloneable handle to the hotkey table.
///
/// One clone is owned by the orchestrator as its [`HotkeyRegistrar`]; another
/// is fed raw key events by the key router.
#[derive(Debug, Clone, Default)]
pub struct SharedHotkeyTable {
    inner: Arc<Mutex<HotkeyTable>>,
}

impl SharedHotkeyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table in which `reserved` combinations cannot be registered.
    pub fn with_reserved(reserved: impl IntoIterator<Item = Accelerator>) -> Self {
        let table = HotkeyTable {
            reserved: reserved.into_iter().collect(),
            ..HotkeyTable::default()
        };
        Self {
            inner: Arc::new(Mutex::new(table)),
        }
    }

    /// The currently registered combination, if any.
    pub fn bound(&self) -> Option<Accelerator> {
        self.lock().bound.clone()
    }

    /// Updates held-key state with `event`.
    ///
    /// Returns `true` when the event is the key-down that completes the bound
    /// combination.
    pub fn feed(&self, event: RawKeyEvent) -> bool {
        let mut table = self.lock();
        match event {
            RawKeyEvent::KeyDown(key) => {
                let key = key.normalized();
                if table.held.contains(&key) {
                    return false;
                }
                let triggered = table
                    .bound
                    .as_ref()
                    .is_some_and(|accel| accel.is_triggered_by(&table.held, key));
                table.held.push(key);
                if triggered {
                    debug!(key = %key, "global hotkey triggered");
                }
                triggered
            }
            RawKeyEvent::KeyUp(key) => {
                let key = key.normalized();
                table.held.retain(|k| *k != key);
                false
            }
            RawKeyEvent::FocusLost => false,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HotkeyTable> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl HotkeyRegistrar for SharedHotkeyTable {
    fn register(&mut self, accelerator: &Accelerator) -> Result<(), HotkeyError> {
        let mut table = self.lock();
        if let Some(current) = &table.bound {
            return Err(HotkeyError::SlotOccupied(current.shortcut_string()));
        }
        if table.reserved.contains(accelerator) {
            return Err(HotkeyError::Conflict(accelerator.shortcut_string()));
        }
        info!(shortcut = %accelerator.shortcut_string(), "global hotkey registered");
        table.bound = Some(accelerator.clone());
        Ok(())
    }

    fn unregister(&mut self) {
        if let Some(previous) = self.lock().bound.take() {
            info!(shortcut = %previous.shortcut_string(), "global hotkey unregistered");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(table: &SharedHotkeyTable, keys: &[KeyCode]) -> bool {
        keys.iter()
            .map(|k| table.feed(RawKeyEvent::KeyDown(*k)))
            .last()
            .unwrap_or(false)
    }

    #[test]
    fn test_register_then_matching_keys_trigger() {
        // Arrange
        let mut table = SharedHotkeyTable::new();
        table.register(&Accelerator::recommended()).unwrap();

        // Act
        let triggered = press(&table, &[KeyCode::SHIFT, KeyCode::CTRL, KeyCode::X]);

        // Assert: modifier press order is irrelevant
        assert!(triggered);
    }

    #[test]
    fn test_side_specific_modifiers_trigger_generic_binding() {
        let mut table = SharedHotkeyTable::new();
        table.register(&Accelerator::recommended()).unwrap();

        let triggered = press(&table, &[KeyCode::new(0xA3), KeyCode::new(0xA0), KeyCode::X]);

        assert!(triggered);
    }

    #[test]
    fn test_extra_modifier_does_not_trigger() {
        let mut table = SharedHotkeyTable::new();
        table.register(&Accelerator::recommended()).unwrap();

        let triggered = press(&table, &[KeyCode::CTRL, KeyCode::ALT, KeyCode::SHIFT, KeyCode::X]);

        assert!(!triggered);
    }

    #[test]
    fn test_auto_repeat_does_not_retrigger() {
        let mut table = SharedHotkeyTable::new();
        table.register(&Accelerator::recommended()).unwrap();
        assert!(press(&table, &[KeyCode::CTRL, KeyCode::SHIFT, KeyCode::X]));

        assert!(!table.feed(RawKeyEvent::KeyDown(KeyCode::X)));

        table.feed(RawKeyEvent::KeyUp(KeyCode::X));
        assert!(table.feed(RawKeyEvent::KeyDown(KeyCode::X)));
    }

    #[test]
    fn test_unregistered_table_never_triggers() {
        let mut table = SharedHotkeyTable::new();
        table.register(&Accelerator::recommended()).unwrap();
        table.unregister();

        assert!(!press(&table, &[KeyCode::CTRL, KeyCode::SHIFT, KeyCode::X]));
        assert_eq!(table.bound(), None);
    }

    #[test]
    fn test_register_twice_without_unregister_fails() {
        let mut table = SharedHotkeyTable::new();
        table.register(&Accelerator::recommended()).unwrap();

        let result = table.register(&"Alt+F1".parse().unwrap());

        assert!(matches!(result, Err(HotkeyError::SlotOccupied(_))));
        assert_eq!(table.bound(), Some(Accelerator::recommended()));
    }

    #[test]
    fn test_reserved_combination_conflicts() {
        let mut table = SharedHotkeyTable::with_reserved([Accelerator::recommended()]);

        let result = table.register(&Accelerator::recommended());

        assert_eq!(
            result,
            Err(HotkeyError::Conflict("CommandOrControl+Shift+X".to_string()))
        );
        assert_eq!(table.bound(), None);
    }

    #[test]
    fn test_clones_share_registration() {
        let mut registrar = SharedHotkeyTable::new();
        let listener = registrar.clone();

        registrar.register(&Accelerator::recommended()).unwrap();

        assert!(press(&listener, &[KeyCode::CTRL, KeyCode::SHIFT, KeyCode::X]));
    }
}
