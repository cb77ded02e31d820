//! Field Registry: CRUD over `field_definitions`.
//!
//! Every mutation invalidates the model type's cache entry before returning.

use crate::cache::{FieldCache, FieldSet};
use crate::core::{DbError, FieldDefinition, FieldType, NewFieldDefinition, Result, StorageError};
use crate::storage::StorageEngine;
use crate::values::ValueStore;
use log::{debug, warn};
use std::sync::Arc;

#[derive(Clone, Copy)]
pub struct FieldRegistry<'a> {
    engine: &'a dyn StorageEngine,
    cache: &'a FieldCache,
}

impl<'a> FieldRegistry<'a> {
    pub fn new(engine: &'a dyn StorageEngine, cache: &'a FieldCache) -> Self {
        Self { engine, cache }
    }

    pub fn add_field(&self, model_type: &str, field_name: &str, field_type: FieldType) -> Result<FieldDefinition> {
        debug!(
            "Adding dynamic field: model={} name={} type={}",
            model_type, field_name, field_type
        );

        if self.engine.find_definition(model_type, field_name)?.is_some() {
            return Err(duplicate(model_type, field_name));
        }

        let inserted = self.engine.insert_definition(NewFieldDefinition {
            model_type: model_type.to_string(),
            field_name: field_name.to_string(),
            value_type: field_type,
        });
        let definition = match inserted {
            Ok(definition) => definition,
            // Lost a race with a concurrent add of the same name
            Err(StorageError::ConstraintViolation(_)) => return Err(duplicate(model_type, field_name)),
            Err(e) => return Err(e.into()),
        };

        self.cache.invalidate(model_type);
        Ok(definition)
    }

    /// Same as [`add_field`](Self::add_field) with a raw type tag.
    pub fn add_field_by_tag(&self, model_type: &str, field_name: &str, tag: &str) -> Result<FieldDefinition> {
        let field_type = FieldType::parse(tag)?;
        self.add_field(model_type, field_name, field_type)
    }

    /// Remove a field and all its values. Removing a missing field is logged
    /// and reported as `Ok(false)`.
    pub fn remove_field(&self, model_type: &str, field_name: &str) -> Result<bool> {
        debug!("Removing dynamic field: model={} name={}", model_type, field_name);

        let Some(definition) = self.engine.find_definition(model_type, field_name)? else {
            warn!("Attempted to delete non-existing field: {}:{}", model_type, field_name);
            self.cache.invalidate(model_type);
            return Ok(false);
        };

        // Values first, so a failure cannot leave rows pointing at nothing
        let removed_values = ValueStore::new(self.engine).delete_values_for_field(&definition)?;
        self.engine.delete_definition(definition.id)?;
        self.cache.invalidate(model_type);

        debug!(
            "Removed field {}:{} with {} value(s)",
            model_type, field_name, removed_values
        );
        Ok(true)
    }

    /// Field names of `model_type` in registration order.
    pub fn list_fields(&self, model_type: &str) -> Result<Vec<String>> {
        Ok(self.fields_for(model_type)?.names())
    }

    /// Cached field set of `model_type`.
    pub fn fields_for(&self, model_type: &str) -> Result<Arc<FieldSet>> {
        self.cache
            .fields_for(model_type, |model| Ok(self.engine.definitions_for(model)?))
    }

    pub fn definition(&self, model_type: &str, field_name: &str) -> Result<Option<FieldDefinition>> {
        Ok(self.fields_for(model_type)?.get(field_name).cloned())
    }
}

fn duplicate(model_type: &str, field_name: &str) -> DbError {
    DbError::DuplicateField {
        model_type: model_type.to_string(),
        field_name: field_name.to_string(),
    }
}
