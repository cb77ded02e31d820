//! Attribute Interception Layer
//!
//! Resolves an attribute name in two stages: the record's native attributes
//! first, then the cached dynamic field set of its model type. Reads of
//! dynamic fields go to the value store; writes are staged on the record and
//! persisted by its next flush.

use crate::core::{DbError, Result, Value};
use crate::record::{DynamicRecord, Record};
use crate::registry::FieldRegistry;
use crate::values::ValueStore;
use serde_json::Map;

/// Result of reading an attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    Native(Option<serde_json::Value>),
    Dynamic(Option<Value>),
}

impl Attribute {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Native(value) => value.clone().unwrap_or(serde_json::Value::Null),
            Self::Dynamic(value) => value.as_ref().map(Value::to_json).unwrap_or(serde_json::Value::Null),
        }
    }

    pub fn into_dynamic(self) -> Option<Value> {
        match self {
            Self::Dynamic(value) => value,
            Self::Native(_) => None,
        }
    }
}

#[derive(Clone, Copy)]
pub struct AttributeInterceptor<'a> {
    registry: FieldRegistry<'a>,
    store: ValueStore<'a>,
}

impl<'a> AttributeInterceptor<'a> {
    pub fn new(registry: FieldRegistry<'a>, store: ValueStore<'a>) -> Self {
        Self { registry, store }
    }

    pub fn get<R: Record>(&self, record: &DynamicRecord<R>, name: &str) -> Result<Attribute> {
        if record.record().is_native(name) {
            return Ok(Attribute::Native(record.record().read_native(name)));
        }
        self.get_dynamic(record, name).map(Attribute::Dynamic)
    }

    /// Read a dynamic field, bypassing the native lookup.
    ///
    /// Returns the persisted value only: `None` for a record without identity,
    /// and the stored value (not a buffered one) for a saved record with
    /// unflushed writes. Use [`DynamicRecord::shadow_value`] or
    /// [`dynamic_attributes`](Self::dynamic_attributes) to see staged values.
    pub fn get_dynamic<R: Record>(&self, record: &DynamicRecord<R>, name: &str) -> Result<Option<Value>> {
        let fields = self.registry.fields_for(record.model_type())?;
        let definition = fields
            .get(name)
            .ok_or_else(|| DbError::unknown_attribute(record.model_type(), name))?;
        self.store.get_value(definition, record.id())
    }

    pub fn set<R: Record>(&self, record: &mut DynamicRecord<R>, name: &str, value: Value) -> Result<()> {
        if record.record().is_native(name) {
            return record.record_mut().write_native(name, value.to_json());
        }
        self.set_dynamic(record, name, value)
    }

    /// Stage a dynamic write on the record. Nothing reaches the store until
    /// the record is saved.
    pub fn set_dynamic<R: Record>(&self, record: &mut DynamicRecord<R>, name: &str, value: Value) -> Result<()> {
        let fields = self.registry.fields_for(record.model_type())?;
        let definition = fields
            .get(name)
            .ok_or_else(|| DbError::unknown_attribute(record.model_type(), name))?;
        definition.check_value(&value)?;
        record.stage(definition.clone(), value);
        Ok(())
    }

    /// Assign many attributes from JSON input (e.g. submitted form data).
    /// Dynamic values are coerced to their field's type. Stops at the first
    /// failure; earlier assignments stay applied.
    pub fn assign_attributes<R, I, K>(&self, record: &mut DynamicRecord<R>, attributes: I) -> Result<()>
    where
        R: Record,
        I: IntoIterator<Item = (K, serde_json::Value)>,
        K: AsRef<str>,
    {
        for (name, json) in attributes {
            let name = name.as_ref();
            if record.record().is_native(name) {
                record.record_mut().write_native(name, json)?;
                continue;
            }

            let fields = self.registry.fields_for(record.model_type())?;
            let definition = fields
                .get(name)
                .ok_or_else(|| DbError::unknown_attribute(record.model_type(), name))?;
            let value = Value::from_json(definition.value_type, &json).ok_or_else(|| {
                DbError::TypeMismatch {
                    field: format!("{}.{}", definition.model_type, definition.field_name),
                    expected: definition.value_type,
                    got: json_type_name(&json),
                }
            })?;
            record.stage(definition.clone(), value);
        }
        Ok(())
    }

    /// Native attribute names followed by the dynamic ones.
    pub fn attribute_names<R: Record>(&self, record: &R) -> Result<Vec<String>> {
        let mut names = record.native_attributes();
        names.extend(self.registry.list_fields(record.model_type())?);
        Ok(names)
    }

    /// `(field_name, value)` for every dynamic field of the record's model
    /// type, in registration order. Unlike [`get_dynamic`](Self::get_dynamic),
    /// values staged on the instance win over persisted ones, so the result
    /// is what the record will hold after its next save.
    pub fn dynamic_attributes<R: Record>(&self, record: &DynamicRecord<R>) -> Result<Vec<(String, Option<Value>)>> {
        let fields = self.registry.fields_for(record.model_type())?;
        let mut persisted = match record.id() {
            Some(id) if !fields.is_empty() => self.store.values_for_record(&fields, id)?,
            _ => Default::default(),
        };

        Ok(fields
            .iter()
            .map(|definition| {
                let value = record
                    .pending()
                    .get(&definition.field_name)
                    .cloned()
                    .or_else(|| persisted.remove(&definition.id));
                (definition.field_name.clone(), value)
            })
            .collect())
    }

    /// Native and dynamic attributes as one JSON object.
    pub fn attributes_json<R: Record>(&self, record: &DynamicRecord<R>) -> Result<serde_json::Value> {
        let mut object = Map::new();
        for name in record.record().native_attributes() {
            let value = record.record().read_native(&name).unwrap_or(serde_json::Value::Null);
            object.insert(name, value);
        }
        for (name, value) in self.dynamic_attributes(record)? {
            object.insert(name, value.map(|v| v.to_json()).unwrap_or(serde_json::Value::Null));
        }
        Ok(serde_json::Value::Object(object))
    }
}

fn json_type_name(json: &serde_json::Value) -> String {
    let name = match json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    };
    name.to_string()
}
