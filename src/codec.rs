//! Typed values and their plaintext byte form.
//!
//! A stored value is a `Value` decided at write time.  Its `ValueType`
//! travels with the record so reads decode it back exhaustively instead
//! of guessing from the bytes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{KeyStoreError, Result};

/// The declared type of a stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Number,
    Json,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Number => "number",
            ValueType::Json => "json",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueType {
    type Err = KeyStoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "string" => Ok(ValueType::String),
            "number" => Ok(ValueType::Number),
            "json" => Ok(ValueType::Json),
            other => Err(KeyStoreError::Validation(format!(
                "unknown value type '{other}' (expected string, number or json)"
            ))),
        }
    }
}

/// An application value as handed to and returned from the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Number(f64),
    Json(serde_json::Value),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::String(_) => ValueType::String,
            Value::Number(_) => ValueType::Number,
            Value::Json(_) => ValueType::Json,
        }
    }

    /// Build a typed value from text, e.g. a command-line argument.
    ///
    /// Input errors here are `Validation` errors, not `Codec` errors:
    /// nothing has been stored yet.
    pub fn parse(value_type: ValueType, text: &str) -> Result<Self> {
        match value_type {
            ValueType::String => Ok(Value::String(text.to_string())),
            ValueType::Number => {
                let n = text.trim().parse::<f64>().map_err(|e| {
                    KeyStoreError::Validation(format!("'{text}' is not a number: {e}"))
                })?;
                Ok(Value::Number(n))
            }
            ValueType::Json => serde_json::from_str(text)
                .map(Value::Json)
                .map_err(|e| KeyStoreError::Validation(format!("invalid JSON: {e}"))),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            Value::Number(n) => write!(f, "{n}"),
            Value::Json(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

/// Serialize a value to the plaintext bytes the cipher consumes.
///
/// Numbers use Rust's shortest round-trip decimal form, so
/// `decode(encode(n)) == n` for every finite `f64`.
pub fn encode(value: &Value) -> Result<Vec<u8>> {
    match value {
        Value::String(s) => Ok(s.as_bytes().to_vec()),
        Value::Number(n) => {
            if !n.is_finite() {
                return Err(KeyStoreError::Validation(format!(
                    "number values must be finite (got {n})"
                )));
            }
            Ok(n.to_string().into_bytes())
        }
        Value::Json(v) => serde_json::to_vec(v)
            .map_err(|e| KeyStoreError::SerializationError(format!("json value: {e}"))),
    }
}

/// Decode plaintext bytes according to the declared type.
pub fn decode(value_type: ValueType, plaintext: Vec<u8>) -> Result<Value> {
    match value_type {
        ValueType::String => String::from_utf8(plaintext)
            .map(Value::String)
            .map_err(|_| KeyStoreError::Codec("string value is not valid UTF-8".into())),
        ValueType::Number => {
            let text = std::str::from_utf8(&plaintext)
                .map_err(|_| KeyStoreError::Codec("number value is not valid UTF-8".into()))?;
            match text.parse::<f64>() {
                Ok(n) if n.is_finite() => Ok(Value::Number(n)),
                _ => Err(KeyStoreError::Codec(format!(
                    "'{text}' is not a valid number literal"
                ))),
            }
        }
        ValueType::Json => serde_json::from_slice(&plaintext)
            .map(Value::Json)
            .map_err(|e| KeyStoreError::Codec(format!("json value does not parse: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn representative_values_roundtrip() {
        for value in [
            Value::from("hello"),
            Value::from(42.5),
            Value::from(json!({"a": [1, 2, 3]})),
        ] {
            let bytes = encode(&value).unwrap();
            assert_eq!(decode(value.value_type(), bytes).unwrap(), value);
        }
    }

    #[test]
    fn awkward_numbers_roundtrip() {
        for n in [0.1, -0.0, 1e300, f64::MIN_POSITIVE, f64::MAX, 1.0 / 3.0] {
            let bytes = encode(&Value::Number(n)).unwrap();
            assert_eq!(decode(ValueType::Number, bytes).unwrap(), Value::Number(n));
        }
    }

    #[test]
    fn non_finite_numbers_are_rejected_on_write() {
        assert!(matches!(
            encode(&Value::Number(f64::NAN)),
            Err(KeyStoreError::Validation(_))
        ));
        assert!(encode(&Value::Number(f64::INFINITY)).is_err());
    }

    #[test]
    fn string_is_stored_verbatim() {
        let bytes = encode(&Value::from("ünïcödé 🔑")).unwrap();
        assert_eq!(bytes, "ünïcödé 🔑".as_bytes());
    }

    #[test]
    fn mismatched_number_is_a_codec_error() {
        let result = decode(ValueType::Number, b"not-a-number".to_vec());
        assert!(matches!(result, Err(KeyStoreError::Codec(_))));

        let result = decode(ValueType::Number, b"NaN".to_vec());
        assert!(matches!(result, Err(KeyStoreError::Codec(_))));
    }

    #[test]
    fn mismatched_json_is_a_codec_error() {
        let result = decode(ValueType::Json, b"{broken".to_vec());
        assert!(matches!(result, Err(KeyStoreError::Codec(_))));
    }

    #[test]
    fn invalid_utf8_string_is_a_codec_error() {
        let result = decode(ValueType::String, vec![0xff, 0xfe]);
        assert!(matches!(result, Err(KeyStoreError::Codec(_))));
    }

    #[test]
    fn json_array_order_survives() {
        let value = Value::Json(json!({"list": [3, 1, 2], "nested": {"x": null}}));
        let decoded = decode(ValueType::Json, encode(&value).unwrap()).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn parse_builds_typed_values() {
        assert_eq!(
            Value::parse(ValueType::Number, " 42.5 ").unwrap(),
            Value::Number(42.5)
        );
        assert_eq!(
            Value::parse(ValueType::Json, r#"{"a":1}"#).unwrap(),
            Value::Json(json!({"a": 1}))
        );
        assert!(matches!(
            Value::parse(ValueType::Number, "abc"),
            Err(KeyStoreError::Validation(_))
        ));
    }

    #[test]
    fn value_type_parses_and_displays() {
        for ty in [ValueType::String, ValueType::Number, ValueType::Json] {
            assert_eq!(ty.as_str().parse::<ValueType>().unwrap(), ty);
        }
        assert!("blob".parse::<ValueType>().is_err());
        assert_eq!(
            serde_json::to_string(&ValueType::Json).unwrap(),
            "\"json\""
        );
    }
}
