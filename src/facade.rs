use crate::buffer::FlushReport;
use crate::cache::{FieldCache, FieldSet};
use crate::config::DynamoConfig;
use crate::core::{DbError, FieldDefinition, FieldType, RecordId, Result, Value};
use crate::interceptor::{Attribute, AttributeInterceptor};
use crate::record::{DynamicRecord, Record, RecordPersistence};
use crate::registry::FieldRegistry;
use crate::storage::{InMemoryStorage, StorageEngine};
use crate::values::ValueStore;
use log::{debug, info};
use std::sync::Arc;

/// Entry point of the dynamic-attribute subsystem.
///
/// Owns the backing store handle and the field definition cache; the
/// registry, value store and interception layer are cheap views built on
/// demand over both. Build one per process (or per tenant) and share it.
///
/// # Examples
///
/// ```ignore
/// let dynamo = Dynamo::in_memory();
/// dynamo.add_field("Review", "rating", FieldType::Number)?;
///
/// let mut review = DynamicRecord::new(Review::new("Great"));
/// dynamo.set(&mut review, "rating", Value::Number(5))?;
/// dynamo.save(&reviews, &mut review)?;
/// ```
pub struct Dynamo {
    engine: Arc<dyn StorageEngine>,
    cache: Arc<FieldCache>,
    config: DynamoConfig,
}

impl Dynamo {
    pub fn new(engine: Arc<dyn StorageEngine>, config: DynamoConfig) -> Self {
        let cache = Arc::new(FieldCache::new(config.cache_capacity));
        Self::with_cache(engine, cache, config)
    }

    /// Use an existing cache, e.g. one that already has invalidation hooks.
    pub fn with_cache(engine: Arc<dyn StorageEngine>, cache: Arc<FieldCache>, config: DynamoConfig) -> Self {
        info!("Dynamic attributes ready on store '{}'", config.store_name);
        Self { engine, cache, config }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStorage::new()), DynamoConfig::default())
    }

    pub fn config(&self) -> &DynamoConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<FieldCache> {
        &self.cache
    }

    pub fn engine(&self) -> &Arc<dyn StorageEngine> {
        &self.engine
    }

    /// Point at another backing store. The whole cache is cleared, entries
    /// of the previous store would describe the wrong field sets.
    pub fn switch_engine(&mut self, engine: Arc<dyn StorageEngine>, store_name: &str) {
        info!(
            "Switching dynamic attribute store '{}' -> '{}'",
            self.config.store_name, store_name
        );
        self.engine = engine;
        self.config.store_name = store_name.to_string();
        self.cache.clear();
    }

    pub fn registry(&self) -> FieldRegistry<'_> {
        FieldRegistry::new(self.engine.as_ref(), &self.cache)
    }

    pub fn values(&self) -> ValueStore<'_> {
        ValueStore::new(self.engine.as_ref())
    }

    pub fn interceptor(&self) -> AttributeInterceptor<'_> {
        AttributeInterceptor::new(self.registry(), self.values())
    }

    // ========================================================================
    // Field registry
    // ========================================================================

    pub fn add_field(&self, model_type: &str, field_name: &str, field_type: FieldType) -> Result<FieldDefinition> {
        self.registry().add_field(model_type, field_name, field_type)
    }

    pub fn add_field_by_tag(&self, model_type: &str, field_name: &str, tag: &str) -> Result<FieldDefinition> {
        self.registry().add_field_by_tag(model_type, field_name, tag)
    }

    pub fn remove_field(&self, model_type: &str, field_name: &str) -> Result<bool> {
        self.registry().remove_field(model_type, field_name)
    }

    pub fn list_fields(&self, model_type: &str) -> Result<Vec<String>> {
        self.registry().list_fields(model_type)
    }

    pub fn fields_for(&self, model_type: &str) -> Result<Arc<FieldSet>> {
        self.registry().fields_for(model_type)
    }

    // ========================================================================
    // Attribute access
    // ========================================================================

    pub fn get<R: Record>(&self, record: &DynamicRecord<R>, name: &str) -> Result<Attribute> {
        self.interceptor().get(record, name)
    }

    pub fn set<R: Record>(&self, record: &mut DynamicRecord<R>, name: &str, value: impl Into<Value>) -> Result<()> {
        self.interceptor().set(record, name, value.into())
    }

    pub fn get_dynamic<R: Record>(&self, record: &DynamicRecord<R>, name: &str) -> Result<Option<Value>> {
        self.interceptor().get_dynamic(record, name)
    }

    pub fn set_dynamic<R: Record>(&self, record: &mut DynamicRecord<R>, name: &str, value: impl Into<Value>) -> Result<()> {
        self.interceptor().set_dynamic(record, name, value.into())
    }

    pub fn assign_attributes<R, I, K>(&self, record: &mut DynamicRecord<R>, attributes: I) -> Result<()>
    where
        R: Record,
        I: IntoIterator<Item = (K, serde_json::Value)>,
        K: AsRef<str>,
    {
        self.interceptor().assign_attributes(record, attributes)
    }

    pub fn attribute_names<R: Record>(&self, record: &R) -> Result<Vec<String>> {
        self.interceptor().attribute_names(record)
    }

    pub fn dynamic_attributes<R: Record>(&self, record: &DynamicRecord<R>) -> Result<Vec<(String, Option<Value>)>> {
        self.interceptor().dynamic_attributes(record)
    }

    pub fn attributes_json<R: Record>(&self, record: &DynamicRecord<R>) -> Result<serde_json::Value> {
        self.interceptor().attributes_json(record)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Save the native record, then flush its pending dynamic writes before
    /// returning.
    pub fn save<R, P>(&self, persistence: &P, record: &mut DynamicRecord<R>) -> Result<FlushReport>
    where
        R: Record,
        P: RecordPersistence<R> + ?Sized,
    {
        let id = persistence.save(record.record_mut())?;
        self.flush(record, id)
    }

    /// Post-save hook for persistence layers that drive their own save.
    pub fn after_save<R: Record>(&self, record: &mut DynamicRecord<R>) -> Result<FlushReport> {
        let id = record.id().ok_or_else(|| {
            DbError::Native(format!(
                "{} record has no identity after save",
                record.model_type()
            ))
        })?;
        self.flush(record, id)
    }

    fn flush<R: Record>(&self, record: &mut DynamicRecord<R>, id: RecordId) -> Result<FlushReport> {
        if !record.has_pending_writes() {
            return Ok(FlushReport::default());
        }
        // Resolved at flush time so writes to fields removed meanwhile are dropped
        let fields = self.fields_for(record.model_type())?;
        let store = self.values();
        record.pending_mut().flush(&store, &fields, id, self.config.bulk_insert)
    }

    /// Destroy the native record, then remove its dynamic values.
    pub fn destroy<R, P>(&self, persistence: &P, record: &DynamicRecord<R>) -> Result<usize>
    where
        R: Record,
        P: RecordPersistence<R> + ?Sized,
    {
        let id = record.id();
        persistence.destroy(record.record())?;
        match id {
            Some(id) => self.cleanup(record.model_type(), id),
            None => Ok(0),
        }
    }

    /// Post-destroy hook. `record` must still carry its identity.
    pub fn after_destroy<R: Record>(&self, record: &R) -> Result<usize> {
        match record.id() {
            Some(id) => self.cleanup(record.model_type(), id),
            None => Ok(0),
        }
    }

    fn cleanup(&self, model_type: &str, id: RecordId) -> Result<usize> {
        let fields = self.fields_for(model_type)?;
        if fields.is_empty() {
            return Ok(0);
        }
        let removed = self.values().delete_values_for_record(&fields, id)?;
        debug!("Removed {} dynamic value(s) of {} {}", removed, model_type, id);
        Ok(removed)
    }
}
