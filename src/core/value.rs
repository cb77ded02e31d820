use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use crate::core::{DbError, Result};

/// Logical type tag of a dynamic field.
///
/// The set is closed: new tags require a new storage column in
/// [`ValueColumn`](crate::core::ValueColumn).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    Text,
    Number,
    Decimal,
}

impl FieldType {
    pub const ALL: [FieldType; 3] = [FieldType::Text, FieldType::Number, FieldType::Decimal];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::Number => "Number",
            Self::Decimal => "Decimal",
        }
    }

    /// Parse a tag, rejecting anything outside the closed set.
    pub fn parse(tag: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.as_str().eq_ignore_ascii_case(tag.trim()))
            .ok_or_else(|| DbError::UnknownFieldType(tag.to_string()))
    }
}

impl FromStr for FieldType {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed dynamic attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Text(String),
    Number(i64),
    Decimal(f64),
}

impl Value {
    pub fn field_type(&self) -> FieldType {
        match self {
            Self::Text(_) => FieldType::Text,
            Self::Number(_) => FieldType::Number,
            Self::Decimal(_) => FieldType::Decimal,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Decimal(f) => Some(*f),
            _ => None,
        }
    }

    /// Coerce a JSON input (e.g. form data) into a value of `field_type`.
    ///
    /// Strings are parsed for numeric types. Returns `None` when the input
    /// cannot represent the type.
    pub fn from_json(field_type: FieldType, json: &serde_json::Value) -> Option<Value> {
        match (field_type, json) {
            (FieldType::Text, serde_json::Value::String(s)) => Some(Self::Text(s.clone())),
            (FieldType::Text, serde_json::Value::Number(n)) => Some(Self::Text(n.to_string())),
            (FieldType::Number, serde_json::Value::Number(n)) => n.as_i64().map(Self::Number),
            (FieldType::Number, serde_json::Value::String(s)) => s.trim().parse().ok().map(Self::Number),
            (FieldType::Decimal, serde_json::Value::Number(n)) => n.as_f64().map(Self::Decimal),
            (FieldType::Decimal, serde_json::Value::String(s)) => s.trim().parse().ok().map(Self::Decimal),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Text(s) => serde_json::Value::String(s.clone()),
            Self::Number(i) => serde_json::Value::from(*i),
            // NaN and infinities have no JSON form
            Self::Decimal(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{}", s),
            Self::Number(i) => write!(f, "{}", i),
            Self::Decimal(d) => write!(f, "{}", d),
        }
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Number(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Decimal(value)
    }
}
