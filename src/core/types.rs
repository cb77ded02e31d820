use std::fmt;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use super::{DbError, FieldType, Result, Value};

// ============================================================================
// Identifiers
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ValueId(pub u64);

/// Identity of an owning record, assigned by its persistence layer on save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(pub i64);

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Value Column Mapping
// ============================================================================

/// Physical storage slot of a value row. One per [`FieldType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueColumn {
    ValString,
    ValInt,
    ValFloat,
}

impl ValueColumn {
    pub fn for_type(field_type: FieldType) -> Self {
        match field_type {
            FieldType::Text => Self::ValString,
            FieldType::Number => Self::ValInt,
            FieldType::Decimal => Self::ValFloat,
        }
    }

    /// Map a raw type tag to its column, failing with `UnknownFieldType`.
    pub fn for_tag(tag: &str) -> Result<Self> {
        FieldType::parse(tag).map(Self::for_type)
    }

    pub fn column_name(&self) -> &'static str {
        match self {
            Self::ValString => "val_string",
            Self::ValInt => "val_int",
            Self::ValFloat => "val_float",
        }
    }
}

// ============================================================================
// Rows
// ============================================================================

/// A declared dynamic attribute of one model type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub id: FieldId,
    pub model_type: String,
    pub field_name: String,
    pub value_type: FieldType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FieldDefinition {
    pub fn column(&self) -> ValueColumn {
        ValueColumn::for_type(self.value_type)
    }

    /// Reject values whose type differs from the declared one.
    pub fn check_value(&self, value: &Value) -> Result<()> {
        if value.field_type() != self.value_type {
            return Err(DbError::TypeMismatch {
                field: format!("{}.{}", self.model_type, self.field_name),
                expected: self.value_type,
                got: value.field_type().to_string(),
            });
        }
        Ok(())
    }
}

/// Insert payload for `field_definitions`.
#[derive(Debug, Clone)]
pub struct NewFieldDefinition {
    pub model_type: String,
    pub field_name: String,
    pub value_type: FieldType,
}

/// One persisted value of one field for one record.
///
/// Exactly one of the three slots is populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValueRow {
    pub id: ValueId,
    pub field_id: FieldId,
    pub record_id: RecordId,
    pub val_string: Option<String>,
    pub val_int: Option<i64>,
    pub val_float: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FieldValueRow {
    pub fn value(&self) -> Option<Value> {
        if let Some(s) = &self.val_string {
            return Some(Value::Text(s.clone()));
        }
        if let Some(i) = self.val_int {
            return Some(Value::Number(i));
        }
        self.val_float.map(Value::Decimal)
    }

    /// Read the slot for `column` only.
    pub fn value_in(&self, column: ValueColumn) -> Option<Value> {
        match column {
            ValueColumn::ValString => self.val_string.clone().map(Value::Text),
            ValueColumn::ValInt => self.val_int.map(Value::Number),
            ValueColumn::ValFloat => self.val_float.map(Value::Decimal),
        }
    }

    pub(crate) fn set_value(&mut self, value: Value) {
        self.val_string = None;
        self.val_int = None;
        self.val_float = None;
        match value {
            Value::Text(s) => self.val_string = Some(s),
            Value::Number(i) => self.val_int = Some(i),
            Value::Decimal(f) => self.val_float = Some(f),
        }
    }
}

/// Insert payload for `field_values`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFieldValue {
    pub field_id: FieldId,
    pub record_id: RecordId,
    pub value: Value,
}
