use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ProviderError;

/**
 * Scalar type of the values stored in one feature table
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    #[serde(rename = "")]
    Nil,
    #[serde(rename = "int")]
    Int,
    #[serde(rename = "int32")]
    Int32,
    #[serde(rename = "int64")]
    Int64,
    #[serde(rename = "float32")]
    Float32,
    #[serde(rename = "float64")]
    Float64,
    #[serde(rename = "string")]
    String,
    #[serde(rename = "bool")]
    Bool,
    #[serde(rename = "time")]
    Timestamp,
}

impl ValueType {
    pub fn scalar(&self) -> &'static str {
        match self {
            ValueType::Nil => "",
            ValueType::Int => "int",
            ValueType::Int32 => "int32",
            ValueType::Int64 => "int64",
            ValueType::Float32 => "float32",
            ValueType::Float64 => "float64",
            ValueType::String => "string",
            ValueType::Bool => "bool",
            ValueType::Timestamp => "time",
        }
    }

    /**
     * Decode a value stored as its string form by a schemaless backend
     */
    pub fn decode(&self, raw: &str) -> Result<Value, ProviderError> {
        let fail = |reason: String| ProviderError::ValueDecode {
            value: raw.to_string(),
            value_type: *self,
            reason,
        };
        match self {
            ValueType::Nil | ValueType::String => Ok(Value::String(raw.to_string())),
            ValueType::Int => raw
                .parse()
                .map(Value::Int)
                .map_err(|e: std::num::ParseIntError| fail(e.to_string())),
            ValueType::Int32 => raw
                .parse()
                .map(Value::Int32)
                .map_err(|e: std::num::ParseIntError| fail(e.to_string())),
            ValueType::Int64 => raw
                .parse()
                .map(Value::Int64)
                .map_err(|e: std::num::ParseIntError| fail(e.to_string())),
            ValueType::Float32 => raw
                .parse()
                .map(Value::Float32)
                .map_err(|e: std::num::ParseFloatError| fail(e.to_string())),
            ValueType::Float64 => raw
                .parse()
                .map(Value::Float64)
                .map_err(|e: std::num::ParseFloatError| fail(e.to_string())),
            ValueType::Bool => parse_bool(raw)
                .map(Value::Bool)
                .ok_or_else(|| fail("invalid syntax".to_string())),
            ValueType::Timestamp => DateTime::parse_from_rfc3339(raw)
                .map(|t| Value::Timestamp(t.with_timezone(&Utc)))
                .map_err(|e| fail(e.to_string())),
        }
    }
}

impl Default for ValueType {
    fn default() -> Self {
        Self::Nil
    }
}

impl Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.scalar())
    }
}

impl FromStr for ValueType {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "" => ValueType::Nil,
            "int" => ValueType::Int,
            "int32" => ValueType::Int32,
            "int64" => ValueType::Int64,
            "float32" => ValueType::Float32,
            "float64" => ValueType::Float64,
            "string" => ValueType::String,
            "bool" => ValueType::Bool,
            "time" => ValueType::Timestamp,
            _ => {
                return Err(ProviderError::InvalidDefinition(format!(
                    "unknown value type '{}'",
                    s
                )))
            }
        })
    }
}

/// Accepts `1`, `t`, `true` and their `0` / `f` / `false` counterparts in any common casing
fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Nil,
    Int(i64),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    String(String),
    Bool(bool),
    Timestamp(DateTime<Utc>),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Nil => ValueType::Nil,
            Value::Int(_) => ValueType::Int,
            Value::Int32(_) => ValueType::Int32,
            Value::Int64(_) => ValueType::Int64,
            Value::Float32(_) => ValueType::Float32,
            Value::Float64(_) => ValueType::Float64,
            Value::String(_) => ValueType::String,
            Value::Bool(_) => ValueType::Bool,
            Value::Timestamp(_) => ValueType::Timestamp,
        }
    }

    /**
     * String form written to backends that only store strings
     */
    pub fn to_stored_string(&self) -> String {
        match self {
            Value::Nil => String::new(),
            Value::Int(v) => v.to_string(),
            Value::Int32(v) => v.to_string(),
            Value::Int64(v) => v.to_string(),
            Value::Float32(v) => v.to_string(),
            Value::Float64(v) => v.to_string(),
            Value::String(v) => v.clone(),
            Value::Bool(v) => v.to_string(),
            Value::Timestamp(v) => v.to_rfc3339(),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::Nil
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
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn decode_stored_strings() {
        assert_eq!(ValueType::Int.decode("42").unwrap(), Value::Int(42));
        assert_eq!(ValueType::Int64.decode("-7").unwrap(), Value::Int64(-7));
        assert_eq!(ValueType::Float32.decode("1.5").unwrap(), Value::Float32(1.5));
        assert_eq!(ValueType::Float64.decode("0.25").unwrap(), Value::Float64(0.25));
        assert_eq!(ValueType::Bool.decode("true").unwrap(), Value::Bool(true));
        assert_eq!(ValueType::Bool.decode("F").unwrap(), Value::Bool(false));
        assert_eq!(ValueType::String.decode("abc").unwrap(), Value::from("abc"));
        assert_eq!(ValueType::Nil.decode("abc").unwrap(), Value::from("abc"));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            ValueType::Int.decode("abc"),
            Err(ProviderError::ValueDecode { .. })
        ));
        assert!(ValueType::Float64.decode("").is_err());
        assert!(ValueType::Bool.decode("yes").is_err());
    }

    #[test]
    fn stored_string_is_decodable() {
        let ts = Utc.timestamp_opt(1_650_000_000, 0).unwrap();
        for v in [
            Value::Int(3),
            Value::Int32(-3),
            Value::Float32(2.75),
            Value::Float64(-0.125),
            Value::Bool(false),
            Value::from("x y"),
            Value::Timestamp(ts),
        ] {
            let raw = v.to_stored_string();
            assert_eq!(v.value_type().decode(&raw).unwrap(), v);
        }
    }

    #[test]
    fn scalar_names() {
        assert_eq!("float32".parse::<ValueType>().unwrap(), ValueType::Float32);
        assert_eq!(ValueType::Timestamp.scalar(), "time");
        assert!("decimal".parse::<ValueType>().is_err());
    }
}
