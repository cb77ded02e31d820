#![allow(dead_code)]

use dynafield::core::{
    FieldDefinition, FieldId, FieldValueRow, NewFieldDefinition, NewFieldValue, StorageResult,
    ValueId,
};
use dynafield::{
    DbError, Dynamo, DynamoConfig, InMemoryStorage, Record, RecordId, RecordPersistence, Result,
    StorageEngine, StorageError, Value,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

// ============================================================================
// Native models
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Review {
    pub id: Option<RecordId>,
    pub title: String,
}

impl Review {
    pub fn new(title: &str) -> Self {
        Self { id: None, title: title.to_string() }
    }
}

impl Record for Review {
    fn model_type(&self) -> &str {
        "Review"
    }

    fn id(&self) -> Option<RecordId> {
        self.id
    }

    fn native_attributes(&self) -> Vec<String> {
        vec!["id".to_string(), "title".to_string()]
    }

    fn read_native(&self, name: &str) -> Option<serde_json::Value> {
        match name {
            "id" => self.id.map(|id| json!(id.0)),
            "title" => Some(json!(self.title)),
            _ => None,
        }
    }

    fn write_native(&mut self, name: &str, value: serde_json::Value) -> Result<()> {
        match name {
            "title" => {
                let title = value
                    .as_str()
                    .ok_or_else(|| DbError::Native("title must be a string".to_string()))?;
                self.title = title.to_string();
                Ok(())
            }
            _ => Err(DbError::Native(format!("'{}' is read-only", name))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: Option<RecordId>,
    pub name: String,
}

impl Product {
    pub fn new(name: &str) -> Self {
        Self { id: None, name: name.to_string() }
    }
}

impl Record for Product {
    fn model_type(&self) -> &str {
        "Product"
    }

    fn id(&self) -> Option<RecordId> {
        self.id
    }

    fn native_attributes(&self) -> Vec<String> {
        vec!["id".to_string(), "name".to_string()]
    }

    fn read_native(&self, name: &str) -> Option<serde_json::Value> {
        match name {
            "id" => self.id.map(|id| json!(id.0)),
            "name" => Some(json!(self.name)),
            _ => None,
        }
    }

    fn write_native(&mut self, name: &str, value: serde_json::Value) -> Result<()> {
        match name {
            "name" => {
                self.name = value.as_str().unwrap_or_default().to_string();
                Ok(())
            }
            _ => Err(DbError::Native(format!("'{}' is read-only", name))),
        }
    }
}

// ============================================================================
// Native persistence
// ============================================================================

pub trait Identified: Record + Clone {
    fn assign_id(&mut self, id: RecordId);
}

impl Identified for Review {
    fn assign_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }
}

impl Identified for Product {
    fn assign_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }
}

/// Table of native records, assigning ids on first save.
pub struct MemoryRecords<R> {
    rows: Mutex<BTreeMap<RecordId, R>>,
    next_id: AtomicI64,
}

impl<R: Identified> MemoryRecords<R> {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(BTreeMap::new()),
            next_id: AtomicI64::new(0),
        }
    }

    pub fn find(&self, id: RecordId) -> Option<R> {
        self.rows.lock().unwrap().get(&id).cloned()
    }
}

impl<R: Identified> RecordPersistence<R> for MemoryRecords<R> {
    fn save(&self, record: &mut R) -> Result<RecordId> {
        let id = match record.id() {
            Some(id) => id,
            None => {
                let id = RecordId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
                record.assign_id(id);
                id
            }
        };
        self.rows.lock().unwrap().insert(id, record.clone());
        Ok(id)
    }

    fn destroy(&self, record: &R) -> Result<()> {
        if let Some(id) = record.id() {
            self.rows.lock().unwrap().remove(&id);
        }
        Ok(())
    }
}

// ============================================================================
// Instrumented engines
// ============================================================================

/// Delegates to an in-memory store and fails selected statements on demand.
pub struct FaultyEngine {
    pub inner: Arc<InMemoryStorage>,
    pub fail_updates: AtomicBool,
    pub fail_bulk_inserts: AtomicBool,
    pub atomic_bulk: bool,
}

impl FaultyEngine {
    pub fn new(inner: Arc<InMemoryStorage>) -> Self {
        Self {
            inner,
            fail_updates: AtomicBool::new(false),
            fail_bulk_inserts: AtomicBool::new(false),
            atomic_bulk: true,
        }
    }

    pub fn without_atomic_bulk(mut self) -> Self {
        self.atomic_bulk = false;
        self
    }
}

impl StorageEngine for FaultyEngine {
    fn insert_definition(&self, definition: NewFieldDefinition) -> StorageResult<FieldDefinition> {
        self.inner.insert_definition(definition)
    }

    fn find_definition(&self, model_type: &str, field_name: &str) -> StorageResult<Option<FieldDefinition>> {
        self.inner.find_definition(model_type, field_name)
    }

    fn definitions_for(&self, model_type: &str) -> StorageResult<Vec<FieldDefinition>> {
        self.inner.definitions_for(model_type)
    }

    fn delete_definition(&self, id: FieldId) -> StorageResult<bool> {
        self.inner.delete_definition(id)
    }

    fn find_value(&self, field_id: FieldId, record_id: RecordId) -> StorageResult<Option<FieldValueRow>> {
        self.inner.find_value(field_id, record_id)
    }

    fn values_for_record(&self, record_id: RecordId, field_ids: &[FieldId]) -> StorageResult<Vec<FieldValueRow>> {
        self.inner.values_for_record(record_id, field_ids)
    }

    fn insert_value(&self, value: NewFieldValue) -> StorageResult<FieldValueRow> {
        self.inner.insert_value(value)
    }

    fn insert_values(&self, values: Vec<NewFieldValue>) -> StorageResult<usize> {
        if self.fail_bulk_inserts.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("bulk insert rejected".to_string()));
        }
        self.inner.insert_values(values)
    }

    fn supports_atomic_bulk_insert(&self) -> bool {
        self.atomic_bulk
    }

    fn update_value(&self, id: ValueId, value: Value) -> StorageResult<bool> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("update rejected".to_string()));
        }
        self.inner.update_value(id, value)
    }

    fn delete_values_for_record(&self, record_id: RecordId, field_ids: &[FieldId]) -> StorageResult<usize> {
        self.inner.delete_values_for_record(record_id, field_ids)
    }

    fn delete_values_for_field(&self, field_id: FieldId) -> StorageResult<usize> {
        self.inner.delete_values_for_field(field_id)
    }
}

// ============================================================================
// Setup
// ============================================================================

pub fn setup() -> (Dynamo, Arc<InMemoryStorage>) {
    let storage = Arc::new(InMemoryStorage::new());
    let dynamo = Dynamo::new(storage.clone(), DynamoConfig::new().store_name("test"));
    (dynamo, storage)
}
