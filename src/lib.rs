// ============================================================================
// dynafield: runtime-declared attributes for fixed record types
// ============================================================================
//
// Field definitions live in `field_definitions`, per-record values in
// `field_values` (one typed slot per row). Records read and write dynamic
// attributes through the same calls used for native ones.

pub mod core;
pub mod storage;
pub mod cache;
pub mod registry;
pub mod values;
pub mod buffer;
pub mod record;
pub mod interceptor;
pub mod config;
pub mod facade;

// Re-export main types for convenience
pub use facade::Dynamo;
pub use config::DynamoConfig;
pub use core::{
    DbError, FieldDefinition, FieldId, FieldType, FieldValueRow, RecordId, Result, StorageError,
    Value, ValueColumn,
};
pub use cache::{FieldCache, FieldSet, InvalidationHook};
pub use registry::FieldRegistry;
pub use values::ValueStore;
pub use buffer::{FlushReport, PendingWrite, WriteBuffer};
pub use record::{DynamicRecord, Record, RecordPersistence};
pub use interceptor::{Attribute, AttributeInterceptor};
pub use storage::{InMemoryStorage, StatementStats, StorageEngine};
