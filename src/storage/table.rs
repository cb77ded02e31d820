use crate::core::{
    FieldDefinition, FieldId, FieldValueRow, NewFieldDefinition, NewFieldValue, RecordId,
    StorageError, StorageResult, Value, ValueId,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

// ============================================================================
// field_definitions
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefinitionTable {
    rows: BTreeMap<FieldId, FieldDefinition>,
    next_id: u64,
    /// model_type -> ids, insertion ordered by id
    by_model: HashMap<String, BTreeSet<FieldId>>,
}

impl DefinitionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, new: NewFieldDefinition) -> StorageResult<FieldDefinition> {
        if self.find(&new.model_type, &new.field_name).is_some() {
            return Err(StorageError::ConstraintViolation(format!(
                "Unique constraint violation: field_definitions (model_type, field_name) = ('{}', '{}')",
                new.model_type, new.field_name
            )));
        }

        self.next_id += 1;
        let id = FieldId(self.next_id);
        let now = Utc::now();
        let row = FieldDefinition {
            id,
            model_type: new.model_type,
            field_name: new.field_name,
            value_type: new.value_type,
            created_at: now,
            updated_at: now,
        };

        self.by_model
            .entry(row.model_type.clone())
            .or_default()
            .insert(id);
        self.rows.insert(id, row.clone());
        Ok(row)
    }

    pub fn get(&self, id: FieldId) -> Option<&FieldDefinition> {
        self.rows.get(&id)
    }

    pub fn find(&self, model_type: &str, field_name: &str) -> Option<&FieldDefinition> {
        self.by_model
            .get(model_type)?
            .iter()
            .filter_map(|id| self.rows.get(id))
            .find(|row| row.field_name == field_name)
    }

    pub fn for_model(&self, model_type: &str) -> Vec<FieldDefinition> {
        self.by_model
            .get(model_type)
            .map(|ids| ids.iter().filter_map(|id| self.rows.get(id).cloned()).collect())
            .unwrap_or_default()
    }

    pub fn delete(&mut self, id: FieldId) -> bool {
        let Some(row) = self.rows.remove(&id) else {
            return false;
        };
        if let Some(ids) = self.by_model.get_mut(&row.model_type) {
            ids.remove(&id);
            if ids.is_empty() {
                self.by_model.remove(&row.model_type);
            }
        }
        true
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

// ============================================================================
// field_values
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValueTable {
    rows: BTreeMap<ValueId, FieldValueRow>,
    next_id: u64,
    by_field: HashMap<FieldId, BTreeSet<ValueId>>,
    by_record: HashMap<RecordId, BTreeSet<ValueId>>,
}

impl ValueTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(&self, field_id: FieldId, record_id: RecordId) -> Option<&FieldValueRow> {
        // Walk the smaller of the two index postings
        let by_field = self.by_field.get(&field_id)?;
        let by_record = self.by_record.get(&record_id)?;
        let (probe, other) = if by_field.len() <= by_record.len() {
            (by_field, by_record)
        } else {
            (by_record, by_field)
        };
        probe
            .iter()
            .find(|id| other.contains(id))
            .and_then(|id| self.rows.get(id))
    }

    pub fn for_record(&self, record_id: RecordId, field_ids: &[FieldId]) -> Vec<FieldValueRow> {
        self.by_record
            .get(&record_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.rows.get(id))
                    .filter(|row| field_ids.contains(&row.field_id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Check that `new` can be inserted next to the current rows and `pending`.
    pub fn check_insert(&self, new: &NewFieldValue, pending: &[NewFieldValue]) -> StorageResult<()> {
        let duplicate_pending = pending
            .iter()
            .any(|p| p.field_id == new.field_id && p.record_id == new.record_id);
        if duplicate_pending || self.find(new.field_id, new.record_id).is_some() {
            return Err(StorageError::ConstraintViolation(format!(
                "Unique constraint violation: field_values (field_definition_id, owning_record_id) = ({}, {})",
                new.field_id, new.record_id
            )));
        }
        Ok(())
    }

    /// Insert without constraint checks. Callers run `check_insert` first.
    pub fn insert_unchecked(&mut self, new: NewFieldValue) -> FieldValueRow {
        self.next_id += 1;
        let id = ValueId(self.next_id);
        let now = Utc::now();
        let mut row = FieldValueRow {
            id,
            field_id: new.field_id,
            record_id: new.record_id,
            val_string: None,
            val_int: None,
            val_float: None,
            created_at: now,
            updated_at: now,
        };
        row.set_value(new.value);

        self.by_field.entry(row.field_id).or_default().insert(id);
        self.by_record.entry(row.record_id).or_default().insert(id);
        self.rows.insert(id, row.clone());
        row
    }

    pub fn insert(&mut self, new: NewFieldValue) -> StorageResult<FieldValueRow> {
        self.check_insert(&new, &[])?;
        Ok(self.insert_unchecked(new))
    }

    pub fn update(&mut self, id: ValueId, value: Value) -> bool {
        match self.rows.get_mut(&id) {
            Some(row) => {
                row.set_value(value);
                row.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    pub fn delete_where<F>(&mut self, ids: Vec<ValueId>, keep: F) -> usize
    where
        F: Fn(&FieldValueRow) -> bool,
    {
        let mut deleted = 0;
        for id in ids {
            let matches = self.rows.get(&id).is_some_and(|row| !keep(row));
            if matches && self.remove(id) {
                deleted += 1;
            }
        }
        deleted
    }

    pub fn ids_for_record(&self, record_id: RecordId) -> Vec<ValueId> {
        self.by_record
            .get(&record_id)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn ids_for_field(&self, field_id: FieldId) -> Vec<ValueId> {
        self.by_field
            .get(&field_id)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    fn remove(&mut self, id: ValueId) -> bool {
        let Some(row) = self.rows.remove(&id) else {
            return false;
        };
        if let Some(ids) = self.by_field.get_mut(&row.field_id) {
            ids.remove(&id);
            if ids.is_empty() {
                self.by_field.remove(&row.field_id);
            }
        }
        if let Some(ids) = self.by_record.get_mut(&row.record_id) {
            ids.remove(&id);
            if ids.is_empty() {
                self.by_record.remove(&row.record_id);
            }
        }
        true
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> impl Iterator<Item = &FieldValueRow> {
        self.rows.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FieldType;

    fn new_def(model: &str, name: &str) -> NewFieldDefinition {
        NewFieldDefinition {
            model_type: model.into(),
            field_name: name.into(),
            value_type: FieldType::Text,
        }
    }

    #[test]
    fn test_definition_unique_per_model() {
        let mut table = DefinitionTable::new();
        table.insert(new_def("Review", "rating")).unwrap();
        table.insert(new_def("Product", "rating")).unwrap();

        let err = table.insert(new_def("Review", "rating")).unwrap_err();
        assert!(matches!(err, StorageError::ConstraintViolation(_)));
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn test_definition_delete_updates_index() {
        let mut table = DefinitionTable::new();
        let a = table.insert(new_def("Review", "a")).unwrap();
        table.insert(new_def("Review", "b")).unwrap();

        assert!(table.delete(a.id));
        assert!(!table.delete(a.id));
        let names: Vec<_> = table.for_model("Review").into_iter().map(|d| d.field_name).collect();
        assert_eq!(names, vec!["b"]);
        assert!(table.find("Review", "a").is_none());
    }

    #[test]
    fn test_value_unique_per_field_and_record() {
        let mut table = ValueTable::new();
        let new = NewFieldValue {
            field_id: FieldId(1),
            record_id: RecordId(10),
            value: Value::Text("red".into()),
        };
        table.insert(new.clone()).unwrap();
        assert!(table.insert(new.clone()).is_err());
        assert!(table.check_insert(
            &NewFieldValue { record_id: RecordId(11), ..new.clone() },
            &[NewFieldValue { record_id: RecordId(11), ..new }]
        ).is_err());
    }

    #[test]
    fn test_value_delete_for_record_scoped_by_field() {
        let mut table = ValueTable::new();
        for field in [1, 2] {
            table
                .insert(NewFieldValue {
                    field_id: FieldId(field),
                    record_id: RecordId(7),
                    value: Value::Number(field as i64),
                })
                .unwrap();
        }

        let ids = table.ids_for_record(RecordId(7));
        let deleted = table.delete_where(ids, |row| row.field_id != FieldId(1));
        assert_eq!(deleted, 1);
        assert!(table.find(FieldId(1), RecordId(7)).is_none());
        assert!(table.find(FieldId(2), RecordId(7)).is_some());
    }
}
