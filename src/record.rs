//! Collaborator contracts for native records, and the per-instance wrapper
//! carrying a record's pending dynamic writes.

use crate::buffer::WriteBuffer;
use crate::core::{FieldDefinition, RecordId, Result, Value};
use std::collections::BTreeMap;

/// A record of some native model type.
pub trait Record {
    /// Name of the model type, the key of its dynamic field registry.
    fn model_type(&self) -> &str;

    /// Identity assigned by the persistence layer, `None` until first save.
    fn id(&self) -> Option<RecordId>;

    /// Names of the native (static schema) attributes.
    fn native_attributes(&self) -> Vec<String>;

    fn is_native(&self, name: &str) -> bool {
        self.native_attributes().iter().any(|attr| attr == name)
    }

    fn read_native(&self, name: &str) -> Option<serde_json::Value>;

    fn write_native(&mut self, name: &str, value: serde_json::Value) -> Result<()>;
}

/// Save/destroy lifecycle of native records.
pub trait RecordPersistence<R: Record> {
    /// Durably save `record`, assigning its identity on first save.
    fn save(&self, record: &mut R) -> Result<RecordId>;

    fn destroy(&self, record: &R) -> Result<()>;
}

/// A native record plus its dynamic-attribute state for one in-flight save.
#[derive(Debug, Clone)]
pub struct DynamicRecord<R> {
    record: R,
    pending: WriteBuffer,
    /// Last value assigned to each dynamic field on this instance.
    shadow: BTreeMap<String, Value>,
}

impl<R: Record> DynamicRecord<R> {
    pub fn new(record: R) -> Self {
        Self {
            record,
            pending: WriteBuffer::new(),
            shadow: BTreeMap::new(),
        }
    }

    pub fn record(&self) -> &R {
        &self.record
    }

    pub fn record_mut(&mut self) -> &mut R {
        &mut self.record
    }

    pub fn into_inner(self) -> R {
        self.record
    }

    pub fn model_type(&self) -> &str {
        self.record.model_type()
    }

    pub fn id(&self) -> Option<RecordId> {
        self.record.id()
    }

    pub fn is_new(&self) -> bool {
        self.record.id().is_none()
    }

    pub fn pending(&self) -> &WriteBuffer {
        &self.pending
    }

    pub(crate) fn pending_mut(&mut self) -> &mut WriteBuffer {
        &mut self.pending
    }

    pub fn has_pending_writes(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Value most recently assigned to a dynamic field on this instance,
    /// whether or not it has been persisted.
    pub fn shadow_value(&self, field_name: &str) -> Option<&Value> {
        self.shadow.get(field_name)
    }

    pub(crate) fn stage(&mut self, definition: FieldDefinition, value: Value) {
        self.shadow.insert(definition.field_name.clone(), value.clone());
        self.pending.push(definition, value);
    }
}

impl<R: PartialEq> PartialEq for DynamicRecord<R> {
    fn eq(&self, other: &Self) -> bool {
        self.record == other.record && self.shadow == other.shadow
    }
}
