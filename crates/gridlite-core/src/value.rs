/// Scalar values exchanged with the storage engine
///
/// Mirrors SQLite's storage classes. Values flow unchanged from the
/// result set into records and from filter clauses into bound parameters.
use serde::{Serialize, Serializer};
use std::fmt;

/// A single scalar as produced or consumed by SQLite
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    /// Converts a JSON scalar into a text value for TEXT/BLOB comparisons.
    ///
    /// Numbers and booleans are rendered the way the grid displays them;
    /// `null`, arrays and objects have no text form.
    pub fn text_from_json(value: &serde_json::Value) -> Option<String> {
        match value {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            serde_json::Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Converts a JSON scalar into a numeric value.
    ///
    /// Accepts JSON numbers and strings holding a number, since the grid's
    /// search form submits numeric input as strings.
    pub fn number_from_json(value: &serde_json::Value) -> Option<Value> {
        match value {
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Value::Integer(i))
                } else {
                    n.as_f64().map(Value::Real)
                }
            }
            serde_json::Value::String(s) => {
                let s = s.trim();
                if let Ok(i) = s.parse::<i64>() {
                    Some(Value::Integer(i))
                } else {
                    s.parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite())
                        .map(Value::Real)
                }
            }
            _ => None,
        }
    }

    /// Converts any JSON scalar into a value suitable for an UPDATE.
    pub fn from_json(value: &serde_json::Value) -> Option<Value> {
        match value {
            serde_json::Value::Null => Some(Value::Null),
            serde_json::Value::Bool(b) => Some(Value::Integer(i64::from(*b))),
            serde_json::Value::Number(_) => Self::number_from_json(value),
            serde_json::Value::String(s) => Some(Value::Text(s.clone())),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
        }
    }

    /// Returns the integer payload, if any.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Real(f) => serializer.serialize_f64(*f),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Blob(b) => serializer.serialize_str(&String::from_utf8_lossy(b)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(fl) => write!(f, "{}", fl),
            Value::Text(s) => write!(f, "{}", s),
            Value::Blob(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Real(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_number_from_json_accepts_numeric_strings() {
        assert_eq!(Value::number_from_json(&json!(42)), Some(Value::Integer(42)));
        assert_eq!(Value::number_from_json(&json!("42")), Some(Value::Integer(42)));
        assert_eq!(Value::number_from_json(&json!(" 2.5 ")), Some(Value::Real(2.5)));
        assert_eq!(Value::number_from_json(&json!("abc")), None);
        assert_eq!(Value::number_from_json(&json!("NaN")), None);
        assert_eq!(Value::number_from_json(&json!(null)), None);
    }

    #[test]
    fn test_text_from_json() {
        assert_eq!(Value::text_from_json(&json!("Jo")), Some("Jo".to_string()));
        assert_eq!(Value::text_from_json(&json!(7)), Some("7".to_string()));
        assert_eq!(Value::text_from_json(&json!(["a"])), None);
    }

    #[test]
    fn test_serialize_scalars() {
        let values = vec![
            Value::Null,
            Value::Integer(3),
            Value::Text("Doe".into()),
            Value::Blob(b"raw".to_vec()),
        ];
        let json = serde_json::to_value(&values).unwrap();
        assert_eq!(json, json!([null, 3, "Doe", "raw"]));
    }
}
