//! Read-through lookup cache.
//!
//! Single items are keyed by canonical IRI; collection query results by the
//! filter's fingerprint. Query entries remember the IRI they were answered
//! for, so invalidating an IRI also drops every dependent query result.
//! The cache sits outside substrate transactions: it is updated after a
//! successful commit and repopulated on the next read-through, so a crash
//! between commit and cache update self-heals.

use std::collections::HashMap;
use std::sync::RwLock;

use trellis_types::{Iri, Item};

/// Concurrency-safe lookup cache, optionally a passthrough.
pub struct LookupCache {
    enabled: bool,
    inner: RwLock<CacheState>,
}

#[derive(Default)]
struct CacheState {
    items: HashMap<Iri, Item>,
    queries: HashMap<String, CachedQuery>,
}

struct CachedQuery {
    target: Option<Iri>,
    result: Item,
}

impl LookupCache {
    /// An active cache.
    pub fn new() -> Self {
        Self {
            enabled: true,
            inner: RwLock::new(CacheState::default()),
        }
    }

    /// A passthrough cache for test and development modes.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            inner: RwLock::new(CacheState::default()),
        }
    }

    /// Cached item at `iri`, if any.
    pub fn get_item(&self, iri: &Iri) -> Option<Item> {
        if !self.enabled {
            return None;
        }
        self.inner
            .read()
            .expect("lock poisoned")
            .items
            .get(iri)
            .cloned()
    }

    /// Remember `item` under its own identifier.
    pub fn put_item(&self, item: &Item) {
        if !self.enabled {
            return;
        }
        if let Some(iri) = item.id() {
            self.inner
                .write()
                .expect("lock poisoned")
                .items
                .insert(iri.clone(), item.clone());
        }
    }

    /// Cached query result for `fingerprint`, if any.
    pub fn get_query(&self, fingerprint: &str) -> Option<Item> {
        if !self.enabled {
            return None;
        }
        self.inner
            .read()
            .expect("lock poisoned")
            .queries
            .get(fingerprint)
            .map(|cached| cached.result.clone())
    }

    /// Remember a query result, tagged with the IRI it answers for.
    pub fn put_query(&self, fingerprint: String, target: Option<Iri>, result: &Item) {
        if !self.enabled {
            return;
        }
        self.inner.write().expect("lock poisoned").queries.insert(
            fingerprint,
            CachedQuery {
                target,
                result: result.clone(),
            },
        );
    }

    /// Drop the entry for `iri` and every query result answered for it.
    pub fn invalidate(&self, iri: &Iri) {
        if !self.enabled {
            return;
        }
        let mut state = self.inner.write().expect("lock poisoned");
        state.items.remove(iri);
        state
            .queries
            .retain(|_, cached| cached.target.as_ref() != Some(iri));
    }

    /// Number of cached entries across both keyspaces.
    pub fn len(&self) -> usize {
        let state = self.inner.read().expect("lock poisoned");
        state.items.len() + state.queries.len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for LookupCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LookupCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LookupCache")
            .field("enabled", &self.enabled)
            .field("entries", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_types::{Kind, Object};

    fn item(id: &str) -> Item {
        Item::from(Object::new(Iri::parse(id).unwrap(), Kind::Note))
    }

    #[test]
    fn item_roundtrip() {
        let cache = LookupCache::new();
        let note = item("https://example.com/objects/1");
        cache.put_item(&note);
        let iri = Iri::parse("https://example.com/objects/1").unwrap();
        assert_eq!(cache.get_item(&iri), Some(note));
    }

    #[test]
    fn disabled_cache_stores_nothing() {
        let cache = LookupCache::disabled();
        let note = item("https://example.com/objects/1");
        cache.put_item(&note);
        let iri = Iri::parse("https://example.com/objects/1").unwrap();
        assert_eq!(cache.get_item(&iri), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn invalidation_drops_item_and_dependent_queries() {
        let cache = LookupCache::new();
        let col = Iri::parse("https://example.com/users/alice/outbox").unwrap();
        let result = item("https://example.com/activities/1");
        cache.put_query("fp-1".into(), Some(col.clone()), &result);
        cache.put_query("fp-2".into(), None, &result);

        cache.invalidate(&col);
        assert_eq!(cache.get_query("fp-1"), None);
        assert!(cache.get_query("fp-2").is_some());
    }

    #[test]
    fn unrelated_invalidation_keeps_entries() {
        let cache = LookupCache::new();
        let note = item("https://example.com/objects/1");
        cache.put_item(&note);

        let other = Iri::parse("https://example.com/objects/2").unwrap();
        cache.invalidate(&other);
        assert!(!cache.is_empty());
    }
}
