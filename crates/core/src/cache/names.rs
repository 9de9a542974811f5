use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use symdex_api::RecordId;

pub type NameMap = HashMap<Vec<u8>, Vec<RecordId>>;

/// Per-scope `name -> members` maps.
///
/// Entries are replaced wholesale, never patched: a mutation of a scope drops
/// its entry and the next lookup rebuilds it. A map rebuilt across a
/// mutation is handed back to its builder but not kept.
#[derive(Debug)]
pub struct NameCache {
    capacity: usize,
    scopes: DashMap<RecordId, Arc<NameMap>>,
    generation: AtomicU64,
}

impl NameCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            scopes: DashMap::new(),
            generation: AtomicU64::new(0),
        }
    }

    /// Read before scanning a scope; pass to [`insert`](Self::insert).
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn get(&self, scope: RecordId) -> Option<Arc<NameMap>> {
        self.scopes.get(&scope).map(|entry| Arc::clone(entry.value()))
    }

    /// Keep `map` for `scope` unless some scope was mutated since the
    /// builder read `generation`.
    pub fn insert(&self, scope: RecordId, generation: u64, map: NameMap) -> Arc<NameMap> {
        let map = Arc::new(map);
        if self.generation() != generation {
            return map;
        }
        if self.scopes.len() >= self.capacity && !self.scopes.contains_key(&scope) {
            self.scopes.clear();
        }
        self.scopes.insert(scope, Arc::clone(&map));
        // An invalidation may have slipped in between the check and the insert.
        if self.generation() != generation {
            self.scopes.remove_if(&scope, |_, kept| Arc::ptr_eq(kept, &map));
        }
        map
    }

    pub fn invalidate(&self, scope: RecordId) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.scopes.remove(&scope);
    }

    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.scopes.clear();
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(name: &str, rec: u32) -> NameMap {
        let mut map = NameMap::new();
        map.insert(name.as_bytes().to_vec(), vec![RecordId(rec)]);
        map
    }

    #[test]
    fn test_invalidate_drops_entry() {
        let cache = NameCache::new(8);
        cache.insert(RecordId(10), cache.generation(), single("x", 100));
        assert_eq!(cache.get(RecordId(10)).unwrap()[b"x".as_slice()], vec![RecordId(100)]);
        cache.invalidate(RecordId(10));
        assert!(cache.get(RecordId(10)).is_none());
    }

    #[test]
    fn test_overflow_evicts_everything() {
        let cache = NameCache::new(2);
        cache.insert(RecordId(1), cache.generation(), single("a", 11));
        cache.insert(RecordId(2), cache.generation(), single("b", 12));
        cache.insert(RecordId(3), cache.generation(), single("c", 13));
        assert_eq!(cache.len(), 1);
        assert!(cache.get(RecordId(3)).is_some());
        assert!(cache.get(RecordId(1)).is_none());
    }

    #[test]
    fn test_map_built_before_an_invalidation_is_not_kept() {
        let cache = NameCache::new(8);
        let generation = cache.generation();
        // A member is linked while the scan is running.
        cache.invalidate(RecordId(10));
        let map = cache.insert(RecordId(10), generation, single("x", 100));
        assert_eq!(map[b"x".as_slice()], vec![RecordId(100)]);
        assert!(cache.get(RecordId(10)).is_none());

        let map = cache.insert(RecordId(10), cache.generation(), single("y", 101));
        assert_eq!(map.len(), 1);
        assert!(cache.get(RecordId(10)).is_some());
    }
}
