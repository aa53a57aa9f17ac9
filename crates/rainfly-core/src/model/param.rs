// ── Param domain types ──
//
// A `Param` is a single controllable/readable attribute of a device.
// Values are a tagged union validated against the wire `data_type` at
// construction -- a mismatched value is a hard decode error, never a
// silently skipped write.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;

/// A validated parameter value.
///
/// The wire carries values as untyped JSON next to a `data_type` tag;
/// [`ParamValue::from_wire`] is the only way to pair the two.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    /// Validate a raw JSON value against its declared `data_type`.
    ///
    /// An `int` slot accepts an integral JSON number; a `float` slot
    /// accepts any JSON number. Everything else must match exactly.
    pub fn from_wire(param: &str, data_type: &str, raw: &Value) -> Result<Self, CoreError> {
        let mismatch = || CoreError::InvalidParamValue {
            param: param.to_owned(),
            expected: data_type.to_owned(),
            got: type_name(raw).to_owned(),
        };

        match data_type.to_ascii_lowercase().as_str() {
            "bool" => raw.as_bool().map(Self::Bool).ok_or_else(mismatch),
            "int" => raw.as_i64().map(Self::Int).ok_or_else(mismatch),
            "float" => raw.as_f64().map(Self::Float).ok_or_else(mismatch),
            // String-typed and unrecognized data types carry text.
            _ => raw
                .as_str()
                .map(|s| Self::Text(s.to_owned()))
                .ok_or_else(mismatch),
        }
    }

    /// Infer a value from untyped JSON (action fragments carry no
    /// `data_type` alongside the value).
    pub fn from_json(raw: &Value) -> Option<Self> {
        match raw {
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float)),
            Value::String(s) => Some(Self::Text(s.clone())),
            _ => None,
        }
    }

    /// The canonical `data_type` tag for this value.
    pub fn data_type(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "string",
        }
    }

    /// Render as a JSON value for wire payloads.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Bool(b) => Value::from(*b),
            Self::Int(i) => Value::from(*i),
            Self::Float(f) => Value::from(*f),
            Self::Text(s) => Value::from(s.clone()),
        }
    }
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_i64() || n.is_u64() => "int",
        Value::Number(_) => "float",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// UI rendering hint for a param.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UiKind {
    Toggle,
    Slider,
    Dropdown,
    Trigger,
    Hue,
    #[default]
    Generic,
}

impl UiKind {
    /// Map the wire `ui_type` string to a hint kind.
    pub fn from_wire(ui_type: Option<&str>) -> Self {
        match ui_type {
            Some(s) if s.ends_with(".toggle") => Self::Toggle,
            Some(s) if s.ends_with(".slider") => Self::Slider,
            Some(s) if s.ends_with(".dropdown") => Self::Dropdown,
            Some(s) if s.ends_with(".trigger") => Self::Trigger,
            Some(s) if s.contains(".hue") => Self::Hue,
            _ => Self::Generic,
        }
    }
}

/// Numeric bounds for slider-style params.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: Option<f64>,
}

/// A single controllable/readable attribute of a device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(default)]
    pub value: Option<ParamValue>,
    #[serde(default)]
    pub data_type: Option<String>,
    /// Semantic wire type (e.g. a power or name param).
    #[serde(default)]
    pub param_type: Option<String>,
    #[serde(default)]
    pub ui_kind: UiKind,
    #[serde(default)]
    pub properties: Vec<String>,
    #[serde(default)]
    pub bounds: Option<Bounds>,
    #[serde(default)]
    pub valid_strs: Option<Vec<String>>,
    /// Whether this param may be captured into a schedule or scene.
    #[serde(default)]
    pub service_eligible: bool,
    /// Selection state within the current edit session. Never persisted.
    #[serde(skip)]
    pub selected: bool,
}

impl Param {
    /// Minimal param carried inside a decoded schedule/scene action
    /// fragment: just a name and an inferred value.
    pub fn action_param(name: impl Into<String>, value: &Value) -> Self {
        let value = ParamValue::from_json(value);
        Self {
            name: name.into(),
            data_type: value.as_ref().map(|v| v.data_type().to_owned()),
            value,
            param_type: None,
            ui_kind: UiKind::Generic,
            properties: Vec::new(),
            bounds: None,
            valid_strs: None,
            service_eligible: false,
            selected: false,
        }
    }

    pub fn is_writable(&self) -> bool {
        self.properties.iter().any(|p| p == "write")
    }

    /// True for the param that carries the user-visible device name.
    pub fn is_name_param(&self) -> bool {
        self.param_type.as_deref().is_some_and(|t| t.ends_with(".name"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_wire_validates_data_type() {
        assert_eq!(
            ParamValue::from_wire("Power", "bool", &json!(true)).unwrap(),
            ParamValue::Bool(true)
        );
        assert_eq!(
            ParamValue::from_wire("Brightness", "int", &json!(42)).unwrap(),
            ParamValue::Int(42)
        );
        assert_eq!(
            ParamValue::from_wire("Speed", "float", &json!(1.5)).unwrap(),
            ParamValue::Float(1.5)
        );
        assert_eq!(
            ParamValue::from_wire("Mode", "string", &json!("warm")).unwrap(),
            ParamValue::Text("warm".into())
        );
    }

    #[test]
    fn from_wire_rejects_mismatches() {
        assert!(ParamValue::from_wire("Power", "bool", &json!(1)).is_err());
        assert!(ParamValue::from_wire("Brightness", "int", &json!("5")).is_err());
        assert!(ParamValue::from_wire("Mode", "string", &json!(false)).is_err());
    }

    #[test]
    fn float_slot_accepts_integral_numbers() {
        assert_eq!(
            ParamValue::from_wire("Speed", "float", &json!(3)).unwrap(),
            ParamValue::Float(3.0)
        );
    }

    #[test]
    fn untagged_round_trip_keeps_variant() {
        let v = ParamValue::Int(7);
        let s = serde_json::to_string(&v).unwrap();
        let back: ParamValue = serde_json::from_str(&s).unwrap();
        assert_eq!(back, v);
    }

    #[test]
    fn ui_kind_from_wire_strings() {
        assert_eq!(UiKind::from_wire(Some("esp.ui.toggle")), UiKind::Toggle);
        assert_eq!(UiKind::from_wire(Some("esp.ui.slider")), UiKind::Slider);
        assert_eq!(UiKind::from_wire(Some("esp.ui.hue-circle")), UiKind::Hue);
        assert_eq!(UiKind::from_wire(None), UiKind::Generic);
    }
}
