//! Loose JSON field coercion.
//!
//! Request bodies are accepted the way browser forms tend to send them: numbers
//! may arrive as strings and ids as numbers. A field is *supplied* when it is
//! present, not `null` and, for text, not empty.

use serde_json::Value;

use crate::errors::ModelError;

/// Longest key the store accepts, in bytes.
pub const MAX_KEY_LEN: usize = 768;

/// Coerce a text field. `null` and `""` count as not supplied.
pub fn text(field: &str, value: &Value) -> Result<Option<String>, ModelError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Array(_) | Value::Object(_) => {
            Err(ModelError::validation(format!("{field} deve ser um texto")))
        }
    }
}

/// Coerce an integer field like `parseInt`: integers as-is, floats truncated,
/// strings by their leading (optionally signed) digits.
pub fn integer(field: &str, value: &Value) -> Result<Option<i64>, ModelError> {
    let invalid = || ModelError::validation(format!("{field} deve ser um número inteiro"));
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(Some(i));
            }
            match n.as_f64() {
                Some(f) if f.is_finite() && f.abs() < i64::MAX as f64 => Ok(Some(f.trunc() as i64)),
                _ => Err(invalid()),
            }
        }
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => leading_integer(s).map(Some).ok_or_else(invalid),
        _ => Err(invalid()),
    }
}

fn leading_integer(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (sign, rest) = match s.as_bytes().first() {
        Some(b'-') => (-1, &s[1..]),
        Some(b'+') => (1, &s[1..]),
        _ => (1, s),
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    rest[..digits].parse::<i64>().ok().map(|n| sign * n)
}

/// Coerce a record key (`id`, `cidadeId`) and check it is a legal store key.
pub fn key(field: &str, value: &Value) -> Result<Option<String>, ModelError> {
    let Some(k) = text(field, value)? else { return Ok(None) };
    validate_key(&k)?;
    Ok(Some(k))
}

/// Keys become path segments, so they must not contain path or query syntax.
pub fn validate_key(key: &str) -> Result<(), ModelError> {
    let bad_char = |c: char| matches!(c, '.' | '$' | '#' | '[' | ']' | '/') || c.is_control();
    if key.is_empty() || key.len() > MAX_KEY_LEN || key.chars().any(bad_char) {
        return Err(ModelError::validation("ID inválido"));
    }
    Ok(())
}

/// Serde adapters for reading stored records written by other clients, which
/// may keep ids as numbers and integers as floats or numeric strings.
pub mod stored {
    use serde::{de::Error, Deserialize, Deserializer};
    use serde_json::Value;

    pub fn key<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        match Value::deserialize(d)? {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(D::Error::custom(format!("expected string or number, got {other}"))),
        }
    }

    pub fn opt_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let value = Value::deserialize(d)?;
        super::text("", &value).map_err(|_| D::Error::custom(format!("expected text, got {value}")))
    }

    pub fn int<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        opt_int(d)?.ok_or_else(|| D::Error::custom("expected an integer"))
    }

    pub fn opt_int<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        let value = Value::deserialize(d)?;
        super::integer("", &value).map_err(|_| D::Error::custom(format!("expected an integer, got {value}")))
    }
}
