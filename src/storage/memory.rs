use super::engine::StorageEngine;
use super::persistence::{SnapshotManager, StoreSnapshot};
use super::table::{DefinitionTable, ValueTable};
use crate::core::{
    FieldDefinition, FieldId, FieldValueRow, NewFieldDefinition, NewFieldValue, RecordId,
    StorageError, StorageResult, Value, ValueId,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Both backing tables, locked together.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tables {
    pub definitions: DefinitionTable,
    pub values: ValueTable,
}

impl Tables {
    /// Foreign key check: `field_values.field_definition_id` must reference
    /// an existing definition.
    fn check_field_exists(&self, field_id: FieldId) -> StorageResult<()> {
        if self.definitions.get(field_id).is_none() {
            return Err(StorageError::ConstraintViolation(format!(
                "Foreign key violation: field_values.field_definition_id = {} has no field_definitions row",
                field_id
            )));
        }
        Ok(())
    }
}

/// Per-kind statement counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatementStats {
    pub reads: u64,
    pub inserts: u64,
    pub bulk_inserts: u64,
    pub updates: u64,
    pub deletes: u64,
}

impl StatementStats {
    pub fn writes(&self) -> u64 {
        self.inserts + self.bulk_inserts + self.updates + self.deletes
    }
}

#[derive(Debug, Default)]
struct Counters {
    reads: AtomicU64,
    inserts: AtomicU64,
    bulk_inserts: AtomicU64,
    updates: AtomicU64,
    deletes: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// In-memory implementation of both backing tables.
///
/// One `RwLock` covers both tables so a bulk insert is applied as a single
/// atomic statement.
pub struct InMemoryStorage {
    tables: RwLock<Tables>,
    counters: Counters,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::from_tables(Tables::default())
    }

    pub fn from_tables(tables: Tables) -> Self {
        Self {
            tables: RwLock::new(tables),
            counters: Counters::default(),
        }
    }

    pub fn stats(&self) -> StatementStats {
        StatementStats {
            reads: self.counters.reads.load(Ordering::Relaxed),
            inserts: self.counters.inserts.load(Ordering::Relaxed),
            bulk_inserts: self.counters.bulk_inserts.load(Ordering::Relaxed),
            updates: self.counters.updates.load(Ordering::Relaxed),
            deletes: self.counters.deletes.load(Ordering::Relaxed),
        }
    }

    pub fn reset_stats(&self) {
        for counter in [
            &self.counters.reads,
            &self.counters.inserts,
            &self.counters.bulk_inserts,
            &self.counters.updates,
            &self.counters.deletes,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    pub fn definition_count(&self) -> StorageResult<usize> {
        Ok(self.tables.read()?.definitions.row_count())
    }

    pub fn value_count(&self) -> StorageResult<usize> {
        Ok(self.tables.read()?.values.row_count())
    }

    /// All value rows, for inspection.
    pub fn value_rows(&self) -> StorageResult<Vec<FieldValueRow>> {
        Ok(self.tables.read()?.values.rows().cloned().collect())
    }

    /// Write both tables to `path` atomically.
    pub fn save_snapshot<P: AsRef<Path>>(&self, path: P) -> StorageResult<()> {
        let tables = self.tables.read()?.clone();
        SnapshotManager::new(path).save(&StoreSnapshot::new(tables))
    }

    /// Load a store from `path`, or an empty store if the file does not exist.
    pub fn load_snapshot<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let tables = SnapshotManager::new(path)
            .load()?
            .map(|snapshot| snapshot.tables)
            .unwrap_or_default();
        Ok(Self::from_tables(tables))
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageEngine for InMemoryStorage {
    fn insert_definition(&self, definition: NewFieldDefinition) -> StorageResult<FieldDefinition> {
        Counters::bump(&self.counters.inserts);
        self.tables.write()?.definitions.insert(definition)
    }

    fn find_definition(&self, model_type: &str, field_name: &str) -> StorageResult<Option<FieldDefinition>> {
        Counters::bump(&self.counters.reads);
        Ok(self.tables.read()?.definitions.find(model_type, field_name).cloned())
    }

    fn definitions_for(&self, model_type: &str) -> StorageResult<Vec<FieldDefinition>> {
        Counters::bump(&self.counters.reads);
        Ok(self.tables.read()?.definitions.for_model(model_type))
    }

    fn delete_definition(&self, id: FieldId) -> StorageResult<bool> {
        Counters::bump(&self.counters.deletes);
        Ok(self.tables.write()?.definitions.delete(id))
    }

    fn find_value(&self, field_id: FieldId, record_id: RecordId) -> StorageResult<Option<FieldValueRow>> {
        Counters::bump(&self.counters.reads);
        Ok(self.tables.read()?.values.find(field_id, record_id).cloned())
    }

    fn values_for_record(&self, record_id: RecordId, field_ids: &[FieldId]) -> StorageResult<Vec<FieldValueRow>> {
        Counters::bump(&self.counters.reads);
        Ok(self.tables.read()?.values.for_record(record_id, field_ids))
    }

    fn insert_value(&self, value: NewFieldValue) -> StorageResult<FieldValueRow> {
        Counters::bump(&self.counters.inserts);
        let mut tables = self.tables.write()?;
        tables.check_field_exists(value.field_id)?;
        tables.values.insert(value)
    }

    fn insert_values(&self, values: Vec<NewFieldValue>) -> StorageResult<usize> {
        Counters::bump(&self.counters.bulk_inserts);
        let mut tables = self.tables.write()?;

        // Validate the whole batch before touching the table
        for (idx, value) in values.iter().enumerate() {
            tables.check_field_exists(value.field_id)?;
            tables.values.check_insert(value, &values[..idx])?;
        }

        let count = values.len();
        for value in values {
            tables.values.insert_unchecked(value);
        }
        Ok(count)
    }

    fn update_value(&self, id: ValueId, value: Value) -> StorageResult<bool> {
        Counters::bump(&self.counters.updates);
        Ok(self.tables.write()?.values.update(id, value))
    }

    fn delete_values_for_record(&self, record_id: RecordId, field_ids: &[FieldId]) -> StorageResult<usize> {
        Counters::bump(&self.counters.deletes);
        let mut tables = self.tables.write()?;
        let ids = tables.values.ids_for_record(record_id);
        Ok(tables.values.delete_where(ids, |row| !field_ids.contains(&row.field_id)))
    }

    fn delete_values_for_field(&self, field_id: FieldId) -> StorageResult<usize> {
        Counters::bump(&self.counters.deletes);
        let mut tables = self.tables.write()?;
        let ids = tables.values.ids_for_field(field_id);
        Ok(tables.values.delete_where(ids, |_| false))
    }
}
