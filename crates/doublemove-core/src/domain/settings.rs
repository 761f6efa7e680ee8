//! The persisted settings schema.
//!
//! The schema is a fixed set of named fields ([`SettingKey`]).  Each field has
//! a typed value ([`SettingValue`]) and a compile-time default, so a reader
//! can always obtain a value even when nothing was ever stored.
//!
//! Field names on the wire (the settings window channel) are camelCase:
//!
//! | name                         | type           | default                       |
//! |------------------------------|----------------|-------------------------------|
//! | `doubleMovementEnabled`      | `bool`         | `false`                       |
//! | `keyMapping`                 | [`KeyMapping`] | left stick W/S/A/D            |
//! | `leftJoystickStrafingAngles` | [`AngleConfig`]| no single-key strafe, 45°/90° |
//! | `enabledToggleAccelerator`   | [`Accelerator`]| `Ctrl+Shift+X`                |
//!
//! Validation lives here so every writer (settings window, tray, capture,
//! error recovery) is held to the same constraints.

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::accelerator::{Accelerator, AcceleratorError};
use crate::keymap::KeyCode;

/// Allowed range for [`AngleConfig::up_diagonal_angle`], in degrees.
pub const UP_DIAGONAL_ANGLE_RANGE: RangeInclusive<f64> = 45.0..=71.0;
/// Allowed range for [`AngleConfig::left_right_angle`], in degrees.
pub const LEFT_RIGHT_ANGLE_RANGE: RangeInclusive<f64> = 15.0..=90.0;

const DEFAULT_UP_DIAGONAL_ANGLE: f64 = 45.0;
const DEFAULT_LEFT_RIGHT_ANGLE: f64 = 90.0;

/// A settings value failed its schema constraint.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("unknown setting {0:?}")]
    UnknownSetting(String),
    #[error("invalid value for {key}: {reason}")]
    WrongType { key: SettingKey, reason: String },
    #[error("{field} must be within {min}..={max}, got {value}")]
    AngleOutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("key mapping {slot} uses unknown key code {code}")]
    UnknownKeyCode { slot: String, code: u8 },
    #[error("invalid toggle hotkey: {0}")]
    Accelerator(#[from] AcceleratorError),
}

// ── Keys ──────────────────────────────────────────────────────────────────────

/// Names of the settings fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    DoubleMovementEnabled,
    KeyMapping,
    LeftJoystickStrafingAngles,
    EnabledToggleAccelerator,
}

impl SettingKey {
    /// Every field, in schema order.
    pub const ALL: [SettingKey; 4] = [
        SettingKey::DoubleMovementEnabled,
        SettingKey::KeyMapping,
        SettingKey::LeftJoystickStrafingAngles,
        SettingKey::EnabledToggleAccelerator,
    ];

    /// The wire name of the field.
    pub const fn name(self) -> &'static str {
        match self {
            SettingKey::DoubleMovementEnabled => "doubleMovementEnabled",
            SettingKey::KeyMapping => "keyMapping",
            SettingKey::LeftJoystickStrafingAngles => "leftJoystickStrafingAngles",
            SettingKey::EnabledToggleAccelerator => "enabledToggleAccelerator",
        }
    }

    /// The schema default for this field.
    pub fn default_value(self) -> SettingValue {
        match self {
            SettingKey::DoubleMovementEnabled => SettingValue::DoubleMovementEnabled(false),
            SettingKey::KeyMapping => SettingValue::KeyMapping(KeyMapping::default()),
            SettingKey::LeftJoystickStrafingAngles => {
                SettingValue::LeftJoystickStrafingAngles(AngleConfig::default())
            }
            SettingKey::EnabledToggleAccelerator => {
                SettingValue::EnabledToggleAccelerator(Accelerator::recommended())
            }
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SettingKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SettingKey::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| ValidationError::UnknownSetting(s.to_string()))
    }
}

// ── Values ────────────────────────────────────────────────────────────────────

/// A typed value for one settings field.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    DoubleMovementEnabled(bool),
    KeyMapping(KeyMapping),
    LeftJoystickStrafingAngles(AngleConfig),
    EnabledToggleAccelerator(Accelerator),
}

impl SettingValue {
    /// The field this value belongs to.
    pub fn key(&self) -> SettingKey {
        match self {
            SettingValue::DoubleMovementEnabled(_) => SettingKey::DoubleMovementEnabled,
            SettingValue::KeyMapping(_) => SettingKey::KeyMapping,
            SettingValue::LeftJoystickStrafingAngles(_) => SettingKey::LeftJoystickStrafingAngles,
            SettingValue::EnabledToggleAccelerator(_) => SettingKey::EnabledToggleAccelerator,
        }
    }

    /// Checks the value against its field's constraints.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            SettingValue::DoubleMovementEnabled(_) => Ok(()),
            SettingValue::KeyMapping(mapping) => mapping.validate(),
            SettingValue::LeftJoystickStrafingAngles(angles) => angles.validate(),
            // Shape is enforced by `Accelerator::from_keys`.
            SettingValue::EnabledToggleAccelerator(_) => Ok(()),
        }
    }

    /// Decodes a settings-window value for `key`, validating it.
    ///
    /// # Errors
    ///
    /// [`ValidationError::WrongType`] if the JSON does not match the field's
    /// type, or any constraint violation from [`validate`](Self::validate).
    pub fn from_json(key: SettingKey, json: serde_json::Value) -> Result<Self, ValidationError> {
        let wrong_type = |e: serde_json::Error| ValidationError::WrongType {
            key,
            reason: e.to_string(),
        };
        let value = match key {
            SettingKey::DoubleMovementEnabled => {
                SettingValue::DoubleMovementEnabled(serde_json::from_value(json).map_err(wrong_type)?)
            }
            SettingKey::KeyMapping => {
                SettingValue::KeyMapping(serde_json::from_value(json).map_err(wrong_type)?)
            }
            SettingKey::LeftJoystickStrafingAngles => SettingValue::LeftJoystickStrafingAngles(
                serde_json::from_value(json).map_err(wrong_type)?,
            ),
            // Accepts either the stored key-code array or display text.
            SettingKey::EnabledToggleAccelerator => match json {
                serde_json::Value::String(text) => {
                    SettingValue::EnabledToggleAccelerator(text.parse::<Accelerator>()?)
                }
                other => SettingValue::EnabledToggleAccelerator(
                    serde_json::from_value(other).map_err(wrong_type)?,
                ),
            },
        };
        value.validate()?;
        Ok(value)
    }

    /// Encodes the value for the settings window.
    pub fn to_json(&self) -> serde_json::Value {
        let encoded = match self {
            SettingValue::DoubleMovementEnabled(v) => serde_json::to_value(v),
            SettingValue::KeyMapping(v) => serde_json::to_value(v),
            SettingValue::LeftJoystickStrafingAngles(v) => serde_json::to_value(v),
            SettingValue::EnabledToggleAccelerator(v) => serde_json::to_value(v),
        };
        // None of the schema types contain maps with non-string keys or
        // non-finite floats that survived validation.
        encoded.unwrap_or(serde_json::Value::Null)
    }
}

// ── Key mapping ───────────────────────────────────────────────────────────────

/// Keys bound to the four directions of one virtual joystick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoystickMapping {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub up: Option<KeyCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub down: Option<KeyCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<KeyCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<KeyCode>,
}

impl JoystickMapping {
    fn slots(&self) -> [(&'static str, Option<KeyCode>); 4] {
        [
            ("up", self.up),
            ("down", self.down),
            ("left", self.left),
            ("right", self.right),
        ]
    }
}

/// Mapping from logical joystick directions to keyboard keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyMapping {
    #[serde(default)]
    pub left_joystick: JoystickMapping,
    #[serde(default)]
    pub right_joystick: JoystickMapping,
}

impl Default for KeyMapping {
    /// The recommended mapping: WASD drives the left stick, the right stick
    /// is left unbound.
    fn default() -> Self {
        Self {
            left_joystick: JoystickMapping {
                up: Some(KeyCode::W),
                down: Some(KeyCode::S),
                left: Some(KeyCode::A),
                right: Some(KeyCode::D),
            },
            right_joystick: JoystickMapping::default(),
        }
    }
}

impl KeyMapping {
    /// Rejects any bound key code that does not name a keyboard key.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let sticks = [
            ("leftJoystick", &self.left_joystick),
            ("rightJoystick", &self.right_joystick),
        ];
        for (stick, mapping) in sticks {
            for (direction, key) in mapping.slots() {
                if let Some(key) = key {
                    if !key.is_known() {
                        return Err(ValidationError::UnknownKeyCode {
                            slot: format!("{stick}.{direction}"),
                            code: key.code(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

// ── Strafing angles ───────────────────────────────────────────────────────────

/// Strafing angle configuration for the left joystick, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AngleConfig {
    /// When `true`, pressing only Left or Right strafes at `left_right_angle`.
    pub use_left_right_angle: bool,
    /// Angle used when Forward and a side key are held together.
    pub up_diagonal_angle: f64,
    /// Angle used for single-key strafing.
    pub left_right_angle: f64,
}

impl Default for AngleConfig {
    fn default() -> Self {
        Self {
            use_left_right_angle: false,
            up_diagonal_angle: DEFAULT_UP_DIAGONAL_ANGLE,
            left_right_angle: DEFAULT_LEFT_RIGHT_ANGLE,
        }
    }
}

impl AngleConfig {
    /// Both angles must be finite and inside their control's range.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_angle("upDiagonalAngle", self.up_diagonal_angle, &UP_DIAGONAL_ANGLE_RANGE)?;
        check_angle("leftRightAngle", self.left_right_angle, &LEFT_RIGHT_ANGLE_RANGE)
    }
}

fn check_angle(
    field: &'static str,
    value: f64,
    range: &RangeInclusive<f64>,
) -> Result<(), ValidationError> {
    if value.is_finite() && range.contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::AngleOutOfRange {
            field,
            value,
            min: *range.start(),
            max: *range.end(),
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_setting_key_names_round_trip_through_from_str() {
        for key in SettingKey::ALL {
            assert_eq!(key.name().parse::<SettingKey>(), Ok(key));
        }
    }

    #[test]
    fn test_unknown_setting_name_is_rejected() {
        assert_eq!(
            "theme".parse::<SettingKey>(),
            Err(ValidationError::UnknownSetting("theme".to_string()))
        );
    }

    #[test]
    fn test_defaults_match_schema() {
        assert_eq!(
            SettingKey::DoubleMovementEnabled.default_value(),
            SettingValue::DoubleMovementEnabled(false)
        );
        assert_eq!(
            SettingKey::EnabledToggleAccelerator.default_value(),
            SettingValue::EnabledToggleAccelerator(Accelerator::recommended())
        );
        let SettingValue::LeftJoystickStrafingAngles(angles) =
            SettingKey::LeftJoystickStrafingAngles.default_value()
        else {
            panic!("wrong variant");
        };
        assert!(!angles.use_left_right_angle);
        assert!(angles.validate().is_ok());
    }

    #[test]
    fn test_every_default_passes_validation() {
        for key in SettingKey::ALL {
            assert!(key.default_value().validate().is_ok(), "{key} default invalid");
        }
    }

    #[test]
    fn test_default_key_mapping_is_wasd_on_left_stick() {
        let mapping = KeyMapping::default();
        assert_eq!(mapping.left_joystick.up, Some(KeyCode::W));
        assert_eq!(mapping.left_joystick.down, Some(KeyCode::S));
        assert_eq!(mapping.left_joystick.left, Some(KeyCode::A));
        assert_eq!(mapping.left_joystick.right, Some(KeyCode::D));
        assert_eq!(mapping.right_joystick, JoystickMapping::default());
    }

    #[test]
    fn test_key_mapping_rejects_unknown_code() {
        let mut mapping = KeyMapping::default();
        mapping.right_joystick.left = Some(KeyCode::new(0x07));

        let err = mapping.validate().unwrap_err();

        assert_eq!(
            err,
            ValidationError::UnknownKeyCode {
                slot: "rightJoystick.left".to_string(),
                code: 0x07
            }
        );
    }

    #[test]
    fn test_angle_below_range_is_rejected() {
        let angles = AngleConfig {
            up_diagonal_angle: 30.0,
            ..AngleConfig::default()
        };
        assert!(matches!(
            angles.validate(),
            Err(ValidationError::AngleOutOfRange { field: "upDiagonalAngle", .. })
        ));
    }

    #[test]
    fn test_nan_angle_is_rejected() {
        let angles = AngleConfig {
            left_right_angle: f64::NAN,
            ..AngleConfig::default()
        };
        assert!(angles.validate().is_err());
    }

    #[test]
    fn test_range_bounds_are_inclusive() {
        let angles = AngleConfig {
            use_left_right_angle: true,
            up_diagonal_angle: 71.0,
            left_right_angle: 15.0,
        };
        assert!(angles.validate().is_ok());
    }

    #[test]
    fn test_from_json_decodes_camel_case_angle_config() {
        let value = SettingValue::from_json(
            SettingKey::LeftJoystickStrafingAngles,
            json!({"useLeftRightAngle": true, "upDiagonalAngle": 60.0, "leftRightAngle": 80.0}),
        )
        .expect("valid angles");

        assert_eq!(
            value,
            SettingValue::LeftJoystickStrafingAngles(AngleConfig {
                use_left_right_angle: true,
                up_diagonal_angle: 60.0,
                left_right_angle: 80.0,
            })
        );
    }

    #[test]
    fn test_from_json_wrong_type_is_rejected() {
        let err = SettingValue::from_json(SettingKey::DoubleMovementEnabled, json!("yes"))
            .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::WrongType { key: SettingKey::DoubleMovementEnabled, .. }
        ));
    }

    #[test]
    fn test_from_json_key_mapping_accepts_missing_slots() {
        let value = SettingValue::from_json(
            SettingKey::KeyMapping,
            json!({"leftJoystick": {"up": 87}}),
        )
        .unwrap();

        let SettingValue::KeyMapping(mapping) = value else {
            panic!("wrong variant");
        };
        assert_eq!(mapping.left_joystick.up, Some(KeyCode::W));
        assert_eq!(mapping.left_joystick.down, None);
    }

    #[test]
    fn test_to_json_omits_unset_key_slots() {
        let json = SettingKey::KeyMapping.default_value().to_json();
        assert_eq!(
            json,
            json!({"leftJoystick": {"up": 87, "down": 83, "left": 65, "right": 68}, "rightJoystick": {}})
        );
    }

    #[test]
    fn test_accelerator_value_round_trips_through_json() {
        let original = SettingValue::EnabledToggleAccelerator("Alt+F1".parse().unwrap());
        let decoded =
            SettingValue::from_json(SettingKey::EnabledToggleAccelerator, original.to_json())
                .unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_from_json_accepts_accelerator_display_text() {
        let value =
            SettingValue::from_json(SettingKey::EnabledToggleAccelerator, json!("Shift+Ctrl+X"))
                .unwrap();
        assert_eq!(value, SettingValue::EnabledToggleAccelerator(Accelerator::recommended()));
    }

    #[test]
    fn test_from_json_rejects_accelerator_text_with_two_final_keys() {
        let err = SettingValue::from_json(SettingKey::EnabledToggleAccelerator, json!("Ctrl+A+B"))
            .unwrap_err();
        assert!(matches!(err, ValidationError::Accelerator(_)));
    }

    #[test]
    fn test_key_mapping_serializes_to_toml_without_unset_slots() {
        let text = toml::to_string(&KeyMapping::default()).expect("serialize");
        assert!(text.contains("[leftJoystick]"));
        assert!(text.contains("up = 87"));
        let restored: KeyMapping = toml::from_str(&text).expect("deserialize");
        assert_eq!(restored, KeyMapping::default());
    }
}
