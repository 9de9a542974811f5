//! Derived, droppable lookup caches.
//!
//! Nothing here is authoritative: every entry can be rebuilt from the
//! stored scope and instance structures, and any entry may be evicted at any
//! time without affecting results.

pub mod instances;
pub mod names;

pub use instances::InstanceCache;
pub use names::NameCache;

use crate::config::IndexConfig;

/// Caches shared by every session writing to, or reading from, one index.
#[derive(Debug)]
pub struct IndexCaches {
    pub names: NameCache,
    pub instances: InstanceCache,
}

impl IndexCaches {
    pub fn new(config: &IndexConfig) -> Self {
        Self {
            names: NameCache::new(config.name_cache_capacity),
            instances: InstanceCache::new(config.instance_cache_capacity),
        }
    }

    pub fn clear(&self) {
        self.names.clear();
        self.instances.clear();
    }
}
