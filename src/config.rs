use crate::cache::DEFAULT_CACHE_CAPACITY;

/// Dynamic-attribute subsystem configuration
#[derive(Debug, Clone)]
pub struct DynamoConfig {
    /// Label of the logical backing store (tenant), used in logs
    pub store_name: String,

    /// Maximum number of model types kept in the field definition cache
    pub cache_capacity: usize,

    /// Flush pending inserts as one bulk statement when more than one is pending
    pub bulk_insert: bool,
}

impl DynamoConfig {
    pub fn new() -> Self {
        Self {
            store_name: "default".to_string(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            bulk_insert: true,
        }
    }

    /// Set the store name
    pub fn store_name(mut self, name: &str) -> Self {
        self.store_name = name.to_string();
        self
    }

    /// Set the cache capacity (at least one model type is always cached)
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity.max(1);
        self
    }

    /// Enable or disable bulk inserts on flush
    pub fn bulk_insert(mut self, enabled: bool) -> Self {
        self.bulk_insert = enabled;
        self
    }
}

impl Default for DynamoConfig {
    fn default() -> Self {
        Self::new()
    }
}
