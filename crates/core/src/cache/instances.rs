use crate::error::Result;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use symdex_api::RecordId;

/// Per-template map from canonical argument key to instance record.
#[derive(Debug)]
pub struct InstanceCache {
    capacity: usize,
    templates: DashMap<RecordId, Arc<DashMap<String, RecordId>>>,
    /// Bumped by every change to an instance list.
    generation: AtomicU64,
}

impl InstanceCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            templates: DashMap::new(),
            generation: AtomicU64::new(0),
        }
    }

    /// Instance map of `template`, built by `rebuild` when absent.
    ///
    /// A map whose rebuild overlapped a change to any instance list is
    /// returned but not kept.
    pub fn entries(
        &self,
        template: RecordId,
        rebuild: impl FnOnce() -> Result<HashMap<String, RecordId>>,
    ) -> Result<Arc<DashMap<String, RecordId>>> {
        if let Some(entry) = self.templates.get(&template) {
            return Ok(Arc::clone(entry.value()));
        }
        let generation = self.generation.load(Ordering::SeqCst);
        let map: Arc<DashMap<String, RecordId>> = Arc::new(rebuild()?.into_iter().collect());
        if self.generation.load(Ordering::SeqCst) != generation {
            return Ok(map);
        }
        if self.templates.len() >= self.capacity {
            self.templates.clear();
        }
        self.templates.insert(template, Arc::clone(&map));
        if self.generation.load(Ordering::SeqCst) != generation {
            self.templates
                .remove_if(&template, |_, kept| Arc::ptr_eq(kept, &map));
        }
        Ok(map)
    }

    /// Record a newly created instance if the template's map is resident.
    pub fn insert(&self, template: RecordId, key: String, instance: RecordId) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(entry) = self.templates.get(&template) {
            entry.value().insert(key, instance);
        }
    }

    pub fn invalidate(&self, template: RecordId) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.templates.remove(&template);
    }

    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.templates.clear();
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
