//! Value Store: per-record typed values in `field_values`.

use crate::cache::FieldSet;
use crate::core::{
    FieldDefinition, FieldId, FieldValueRow, NewFieldValue, RecordId, Result, Value, ValueId,
};
use crate::storage::StorageEngine;
use std::collections::HashMap;

#[derive(Clone, Copy)]
pub struct ValueStore<'a> {
    engine: &'a dyn StorageEngine,
}

impl<'a> ValueStore<'a> {
    pub fn new(engine: &'a dyn StorageEngine) -> Self {
        Self { engine }
    }

    /// Value of `definition` for a record. A record without identity has no
    /// values and is never looked up.
    pub fn get_value(&self, definition: &FieldDefinition, record_id: Option<RecordId>) -> Result<Option<Value>> {
        let Some(record_id) = record_id else {
            return Ok(None);
        };
        let row = self.engine.find_value(definition.id, record_id)?;
        Ok(row.and_then(|row| row.value_in(definition.column())))
    }

    /// Upsert a single value.
    pub fn set_value(&self, definition: &FieldDefinition, record_id: RecordId, value: Value) -> Result<()> {
        definition.check_value(&value)?;
        match self.engine.find_value(definition.id, record_id)? {
            Some(row) => {
                self.engine.update_value(row.id, value)?;
            }
            None => {
                self.engine.insert_value(NewFieldValue {
                    field_id: definition.id,
                    record_id,
                    value,
                })?;
            }
        }
        Ok(())
    }

    /// Every value of a record for the fields in `fields`, in one read.
    pub fn values_for_record(&self, fields: &FieldSet, record_id: RecordId) -> Result<HashMap<FieldId, Value>> {
        let rows = self.engine.values_for_record(record_id, &fields.field_ids())?;
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let definition = fields.get_by_id(row.field_id)?;
                let value = row.value_in(definition.column())?;
                Some((row.field_id, value))
            })
            .collect())
    }

    pub(crate) fn existing_rows(&self, record_id: RecordId, field_ids: &[FieldId]) -> Result<Vec<FieldValueRow>> {
        Ok(self.engine.values_for_record(record_id, field_ids)?)
    }

    pub(crate) fn update_row(&self, id: ValueId, value: Value) -> Result<()> {
        self.engine.update_value(id, value)?;
        Ok(())
    }

    /// Insert rows, as one bulk statement when `bulk` is set, more than one
    /// row is pending and the engine guarantees atomic bulk inserts.
    /// Returns whether the bulk path was taken.
    pub(crate) fn insert_rows(&self, rows: Vec<NewFieldValue>, bulk: bool) -> Result<bool> {
        if bulk && rows.len() > 1 && self.engine.supports_atomic_bulk_insert() {
            self.engine.insert_values(rows)?;
            return Ok(true);
        }
        for row in rows {
            self.engine.insert_value(row)?;
        }
        Ok(false)
    }

    /// Remove all values of a record for the fields of its model type.
    pub fn delete_values_for_record(&self, fields: &FieldSet, record_id: RecordId) -> Result<usize> {
        Ok(self.engine.delete_values_for_record(record_id, &fields.field_ids())?)
    }

    pub fn delete_values_for_field(&self, definition: &FieldDefinition) -> Result<usize> {
        Ok(self.engine.delete_values_for_field(definition.id)?)
    }
}
