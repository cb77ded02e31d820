use crate::core::{
    FieldDefinition, FieldId, FieldValueRow, NewFieldDefinition, NewFieldValue, RecordId,
    StorageResult, Value, ValueId,
};

/// Storage engine trait - the seam between the dynamic-attribute core and the
/// two backing tables (`field_definitions`, `field_values`).
///
/// Every method is a synchronous point operation. Implementations must make
/// each individual insert/update/delete atomic.
pub trait StorageEngine: Send + Sync {
    // ------------------------------------------------------------------
    // field_definitions
    // ------------------------------------------------------------------

    /// Insert a definition. Must fail with a constraint violation when the
    /// `(model_type, field_name)` pair already exists.
    fn insert_definition(&self, definition: NewFieldDefinition) -> StorageResult<FieldDefinition>;

    fn find_definition(&self, model_type: &str, field_name: &str) -> StorageResult<Option<FieldDefinition>>;

    /// All definitions of a model type, in insertion order.
    fn definitions_for(&self, model_type: &str) -> StorageResult<Vec<FieldDefinition>>;

    fn delete_definition(&self, id: FieldId) -> StorageResult<bool>;

    // ------------------------------------------------------------------
    // field_values
    // ------------------------------------------------------------------

    fn find_value(&self, field_id: FieldId, record_id: RecordId) -> StorageResult<Option<FieldValueRow>>;

    /// Values of `record_id` restricted to the given fields.
    fn values_for_record(&self, record_id: RecordId, field_ids: &[FieldId]) -> StorageResult<Vec<FieldValueRow>>;

    /// Insert one value. Must fail with a constraint violation when the
    /// `(field_id, record_id)` pair exists or `field_id` has no definition.
    fn insert_value(&self, value: NewFieldValue) -> StorageResult<FieldValueRow>;

    /// Insert many rows as one statement. Either every row is inserted or none.
    fn insert_values(&self, values: Vec<NewFieldValue>) -> StorageResult<usize>;

    /// Whether `insert_values` is atomic. Callers fall back to one insert per
    /// row when it is not.
    fn supports_atomic_bulk_insert(&self) -> bool {
        true
    }

    fn update_value(&self, id: ValueId, value: Value) -> StorageResult<bool>;

    /// Delete the values of `record_id` restricted to the given fields.
    fn delete_values_for_record(&self, record_id: RecordId, field_ids: &[FieldId]) -> StorageResult<usize>;

    fn delete_values_for_field(&self, field_id: FieldId) -> StorageResult<usize>;
}
