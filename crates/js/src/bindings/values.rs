use serde::ser::SerializeMap as _;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Opaque handle to a callable owned by the script engine.
///
/// The host never calls it directly; it hands the handle back to the engine
/// through `JsEngine::call_function` when a timer fires.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct JsFunctionRef(pub u64);

/// An engine-agnostic representation of JavaScript values.
///
/// Deserialization is untagged so command payloads can carry plain JSON
/// values. `Undefined` and `Function` are never decoded and serialize as
/// `null`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum JSValue {
    /// The `null` value.
    Null,
    /// A boolean primitive.
    Boolean(bool),
    /// A number (IEEE 754 double precision).
    Number(f64),
    /// A string value (UTF-8).
    String(String),
    /// A plain object of named values.
    Object(BTreeMap<String, JSValue>),
    /// The `undefined` value.
    #[serde(skip_deserializing)]
    Undefined,
    /// A function handed over by the engine.
    #[serde(skip_deserializing)]
    Function(JsFunctionRef),
}

impl Serialize for JSValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null | Self::Undefined | Self::Function(_) => serializer.serialize_unit(),
            Self::Boolean(value) => serializer.serialize_bool(*value),
            Self::Number(value) => serializer.serialize_f64(*value),
            Self::String(value) => serializer.serialize_str(value),
            Self::Object(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

impl JSValue {
    /// Borrow the string payload, if this is a string.
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    /// The numeric payload, if this is a number.
    #[inline]
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// The entries of a plain object.
    #[inline]
    pub const fn as_object(&self) -> Option<&BTreeMap<String, Self>> {
        match self {
            Self::Object(entries) => Some(entries),
            _ => None,
        }
    }

    /// Whether this is `undefined`.
    #[inline]
    pub const fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// `String(value)` semantics for primitives.
    pub fn to_display_string(&self) -> String {
        match self {
            Self::Undefined => String::from("undefined"),
            Self::Null => String::from("null"),
            Self::Boolean(value) => value.to_string(),
            Self::Number(value) => value.to_string(),
            Self::String(value) => value.clone(),
            Self::Object(_) => String::from("[object Object]"),
            Self::Function(_) => String::from("function () { [native code] }"),
        }
    }
}

impl From<&str> for JSValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for JSValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<f64> for JSValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for JSValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

/// Error type used by host callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JSError {
    /// A type error (for example, wrong argument types).
    TypeError(String),
    /// An internal error not exposed to user code in detail.
    InternalError(String),
    /// A DOM exception, already formatted as `<name>: <message>`.
    DomException(String),
}

impl Display for JSError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::TypeError(message) => write!(f, "TypeError: {message}"),
            Self::InternalError(message) => write!(f, "InternalError: {message}"),
            Self::DomException(message) => write!(f, "DOMException: {message}"),
        }
    }
}

impl Error for JSError {}

/// Log severity levels understood by the host logger.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_only_values_serialize_as_null() {
        assert_eq!(serde_json::to_string(&JSValue::Undefined).expect("undefined"), "null");
        assert_eq!(serde_json::to_string(&JSValue::Function(JsFunctionRef(4))).expect("function"), "null");
        let decoded: JSValue = serde_json::from_str("null").expect("decode");
        assert_eq!(decoded, JSValue::Null);
    }

    #[test]
    fn objects_round_trip() {
        let decoded: JSValue = serde_json::from_str(r#"{"id":"main","tabIndex":2,"hidden":false}"#).expect("decode");
        let entries = decoded.as_object().expect("object");
        assert_eq!(entries.get("id"), Some(&JSValue::from("main")));
        assert_eq!(entries.get("tabIndex"), Some(&JSValue::Number(2.0)));
        assert_eq!(decoded.to_display_string(), "[object Object]");

        let encoded = serde_json::to_value(&decoded).expect("encode");
        assert_eq!(encoded, serde_json::json!({"id": "main", "tabIndex": 2.0, "hidden": false}));
    }
}
