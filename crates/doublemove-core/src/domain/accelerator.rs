//! The [`Accelerator`] value type: a global hotkey combination.
//!
//! An accelerator is zero or more modifier keys followed by exactly one
//! final (non-modifier) key, or nothing at all (hotkey unbound).  The
//! constructor enforces that shape, so holding an `Accelerator` is proof the
//! combination is well formed:
//!
//! - every key is accelerator-eligible,
//! - no key appears twice (side-specific modifiers count as their generic key),
//! - there is never more than one final key, and it always comes last.
//!
//! Modifiers are stored in canonical order (Ctrl, Alt, Shift, Meta) so the
//! display text is stable regardless of the order the user pressed them in.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::keymap::KeyCode;

/// Reasons a key sequence cannot form an accelerator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AcceleratorError {
    #[error("key {0} cannot be used in a hotkey")]
    IneligibleKey(KeyCode),
    #[error("key {0} appears more than once")]
    DuplicateKey(KeyCode),
    #[error("hotkey has two final keys ({first} and {second})")]
    MultipleFinalKeys { first: KeyCode, second: KeyCode },
    #[error("hotkey has modifiers but no final key")]
    MissingFinalKey,
    #[error("unknown key name {0:?}")]
    UnknownKeyName(String),
}

/// A normalized hotkey: canonical-order modifiers plus one final key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<KeyCode>", into = "Vec<KeyCode>")]
pub struct Accelerator {
    keys: Vec<KeyCode>,
}

impl Accelerator {
    /// The unbound accelerator.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The recommended toggle combination, `Ctrl+Shift+X`.
    pub fn recommended() -> Self {
        Self {
            keys: vec![KeyCode::CTRL, KeyCode::SHIFT, KeyCode::X],
        }
    }

    /// Builds an accelerator from keys in any order, normalizing it.
    ///
    /// # Errors
    ///
    /// Returns an [`AcceleratorError`] if a key is ineligible or repeated, if
    /// two final keys are present, or if modifiers are given without a final
    /// key.
    pub fn from_keys<I>(keys: I) -> Result<Self, AcceleratorError>
    where
        I: IntoIterator<Item = KeyCode>,
    {
        let mut modifiers: Vec<KeyCode> = Vec::new();
        let mut final_key: Option<KeyCode> = None;

        for raw in keys {
            let key = raw.normalized();
            if !key.is_accelerator_eligible() {
                return Err(AcceleratorError::IneligibleKey(raw));
            }
            if key.is_modifier() {
                if modifiers.contains(&key) {
                    return Err(AcceleratorError::DuplicateKey(key));
                }
                modifiers.push(key);
            } else {
                match final_key {
                    Some(first) if first == key => return Err(AcceleratorError::DuplicateKey(key)),
                    Some(first) => {
                        return Err(AcceleratorError::MultipleFinalKeys { first, second: key })
                    }
                    None => final_key = Some(key),
                }
            }
        }

        let Some(final_key) = final_key else {
            return if modifiers.is_empty() {
                Ok(Self::empty())
            } else {
                Err(AcceleratorError::MissingFinalKey)
            };
        };

        modifiers.sort_by_key(|k| k.modifier_rank());
        modifiers.push(final_key);
        Ok(Self { keys: modifiers })
    }

    /// All keys in canonical order (modifiers first, final key last).
    pub fn keys(&self) -> &[KeyCode] {
        &self.keys
    }

    /// `true` when no hotkey is bound.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The modifier keys, in canonical order.
    pub fn modifiers(&self) -> &[KeyCode] {
        match self.keys.split_last() {
            Some((_, modifiers)) => modifiers,
            None => &[],
        }
    }

    /// The single non-modifier key, if bound.
    pub fn final_key(&self) -> Option<KeyCode> {
        self.keys.last().copied()
    }

    /// Renders the accelerator for display, e.g. `"Ctrl+Shift+X"`.
    pub fn display(&self) -> String {
        join_names(&self.keys, |k| k.to_string())
    }

    /// Renders the accelerator as a global-shortcut string, e.g.
    /// `"CommandOrControl+Shift+X"`.
    pub fn shortcut_string(&self) -> String {
        join_names(&self.keys, |k| k.shortcut_name().unwrap_or_default().to_string())
    }

    /// Returns `true` if pressing `pressed` while `held` keys are down
    /// completes this accelerator.
    ///
    /// Modifier order does not matter; non-modifier keys in `held` are ignored.
    pub fn is_triggered_by(&self, held: &[KeyCode], pressed: KeyCode) -> bool {
        let Some(final_key) = self.final_key() else {
            return false;
        };
        if pressed.normalized() != final_key {
            return false;
        }

        let mut held_modifiers: Vec<KeyCode> = held
            .iter()
            .map(|k| k.normalized())
            .filter(|k| k.is_modifier())
            .collect();
        held_modifiers.sort_by_key(|k| k.modifier_rank());
        held_modifiers.dedup();

        held_modifiers == self.modifiers()
    }
}

/// Renders an in-progress key sequence, appending `+...` when keys are held.
///
/// Used while a new accelerator is being recorded: the sequence is shown in
/// press order with a trailing marker to signal more keys may follow.
pub fn format_in_progress(keys: &[KeyCode]) -> String {
    if keys.is_empty() {
        return String::new();
    }
    let mut text = join_names(keys, |k| k.to_string());
    text.push_str("+...");
    text
}

fn join_names(keys: &[KeyCode], name: impl Fn(KeyCode) -> String) -> String {
    keys.iter().map(|k| name(*k)).collect::<Vec<_>>().join("+")
}

impl fmt::Display for Accelerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl FromStr for Accelerator {
    type Err = AcceleratorError;

    /// Parses display text such as `"Ctrl+Shift+X"`.  An empty string parses
    /// to the unbound accelerator.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Ok(Self::empty());
        }
        let keys = s
            .split('+')
            .map(|part| {
                KeyCode::from_name(part)
                    .ok_or_else(|| AcceleratorError::UnknownKeyName(part.trim().to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_keys(keys)
    }
}

impl TryFrom<Vec<KeyCode>> for Accelerator {
    type Error = AcceleratorError;

    fn try_from(keys: Vec<KeyCode>) -> Result<Self, Self::Error> {
        Self::from_keys(keys)
    }
}

impl From<Accelerator> for Vec<KeyCode> {
    fn from(accelerator: Accelerator) -> Self {
        accelerator.keys
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
