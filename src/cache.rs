//! Field Definition Cache
//!
//! One entry per model type holding the definitions registered for it. The
//! registry invalidates an entry on every add/remove; there is no expiry.

use crate::core::{FieldDefinition, FieldId, Result};
use log::debug;
use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Callback run on every invalidation. Receives the model type, or `None`
/// when the whole cache was cleared.
pub type InvalidationHook = Box<dyn Fn(Option<&str>) + Send + Sync>;

/// Name-to-definition lookup table for one model type.
#[derive(Debug, Clone)]
pub struct FieldSet {
    model_type: String,
    definitions: Vec<FieldDefinition>,
    by_name: HashMap<String, usize>,
    by_id: HashMap<FieldId, usize>,
}

impl FieldSet {
    pub fn new(model_type: impl Into<String>, definitions: Vec<FieldDefinition>) -> Self {
        let by_name = definitions
            .iter()
            .enumerate()
            .map(|(idx, def)| (def.field_name.clone(), idx))
            .collect();
        let by_id = definitions
            .iter()
            .enumerate()
            .map(|(idx, def)| (def.id, idx))
            .collect();
        Self {
            model_type: model_type.into(),
            definitions,
            by_name,
            by_id,
        }
    }

    pub fn model_type(&self) -> &str {
        &self.model_type
    }

    pub fn get(&self, field_name: &str) -> Option<&FieldDefinition> {
        self.by_name.get(field_name).map(|idx| &self.definitions[*idx])
    }

    pub fn get_by_id(&self, id: FieldId) -> Option<&FieldDefinition> {
        self.by_id.get(&id).map(|idx| &self.definitions[*idx])
    }

    pub fn contains(&self, field_name: &str) -> bool {
        self.by_name.contains_key(field_name)
    }

    /// Field names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.definitions.iter().map(|def| def.field_name.clone()).collect()
    }

    pub fn field_ids(&self) -> Vec<FieldId> {
        self.definitions.iter().map(|def| def.id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.definitions.iter()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

struct CacheState {
    entries: LruCache<String, Arc<FieldSet>>,
    /// Bumped on every invalidation. A load that raced with an invalidation
    /// is returned to its caller but never stored.
    generation: u64,
}

pub struct FieldCache {
    state: Mutex<CacheState>,
    hooks: RwLock<Vec<InvalidationHook>>,
}

impl FieldCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            state: Mutex::new(CacheState {
                entries: LruCache::new(capacity),
                generation: 0,
            }),
            hooks: RwLock::new(Vec::new()),
        }
    }

    fn state(&self) -> MutexGuard<'_, CacheState> {
        // The state is a plain map, a panic elsewhere cannot leave it torn
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Field set of `model_type`, populated through `load` on a miss.
    pub fn fields_for<F>(&self, model_type: &str, load: F) -> Result<Arc<FieldSet>>
    where
        F: FnOnce(&str) -> Result<Vec<FieldDefinition>>,
    {
        let generation = {
            let mut state = self.state();
            if let Some(hit) = state.entries.get(model_type) {
                return Ok(Arc::clone(hit));
            }
            state.generation
        };

        debug!("Field cache miss for model '{}'", model_type);
        let set = Arc::new(FieldSet::new(model_type, load(model_type)?));

        let mut state = self.state();
        if state.generation == generation {
            state.entries.put(model_type.to_string(), Arc::clone(&set));
        }
        Ok(set)
    }

    pub fn is_cached(&self, model_type: &str) -> bool {
        self.state().entries.contains(model_type)
    }

    pub fn invalidate(&self, model_type: &str) {
        {
            let mut state = self.state();
            state.generation += 1;
            if state.entries.pop(model_type).is_none() {
                debug!("Field cache invalidation for '{}' found no entry", model_type);
            }
        }
        self.run_hooks(Some(model_type));
    }

    /// Drop every entry. Required when switching to another backing store.
    pub fn clear(&self) {
        {
            let mut state = self.state();
            state.generation += 1;
            state.entries.clear();
        }
        debug!("Field cache cleared");
        self.run_hooks(None);
    }

    pub fn on_invalidate(&self, hook: InvalidationHook) {
        self.hooks
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(hook);
    }

    fn run_hooks(&self, model_type: Option<&str>) {
        let hooks = self.hooks.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        for hook in hooks.iter() {
            hook(model_type);
        }
    }
}

impl Default for FieldCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
