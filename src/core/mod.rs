pub mod error;
pub mod types;
pub mod value;

pub use error::{DbError, Result, StorageError, StorageResult};
pub use types::{
    FieldDefinition, FieldId, FieldValueRow, NewFieldDefinition, NewFieldValue, RecordId,
    ValueColumn, ValueId,
};
pub use value::{FieldType, Value};
