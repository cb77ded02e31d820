use thiserror::Error;
use crate::core::FieldType;

/// Failures raised by a backing store.
///
/// These are surfaced to callers unchanged through [`DbError::Persistence`].
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Row not found: {0}")]
    NotFound(String),

    #[error("Lock error: {0}")]
    LockError(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Field '{field_name}' already exists for model '{model_type}'")]
    DuplicateField {
        model_type: String,
        field_name: String,
    },

    #[error("Unknown field type '{0}'. Valid types are: Text, Number, Decimal")]
    UnknownFieldType(String),

    #[error("Unknown attribute '{name}' for model '{model_type}'")]
    UnknownAttribute {
        model_type: String,
        name: String,
    },

    #[error("Type mismatch on field '{field}': expected {expected}, got {got}")]
    TypeMismatch {
        field: String,
        expected: FieldType,
        got: String,
    },

    #[error("Native record error: {0}")]
    Native(String),

    #[error(transparent)]
    Persistence(#[from] StorageError),
}

impl DbError {
    pub fn unknown_attribute(model_type: &str, name: &str) -> Self {
        Self::UnknownAttribute {
            model_type: model_type.to_string(),
            name: name.to_string(),
        }
    }

    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }
}

pub type Result<T> = std::result::Result<T, DbError>;

pub type StorageResult<T> = std::result::Result<T, StorageError>;

impl<T> From<std::sync::PoisonError<T>> for StorageError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for DbError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::Persistence(StorageError::LockError(err.to_string()))
    }
}
