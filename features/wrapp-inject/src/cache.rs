use std::collections::HashMap;

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::{producer::ProducerId, types::Instance};

/// Instances of singleton scoped producers, owned by a [crate::Registry]
///
/// Shared by every resolve call made through the registry, from any thread.
/// Entries are only added through [SingletonCache::publish] and never replaced,
/// so anything read from the cache is fully built, lazy slots included.
#[derive(Default)]
pub struct SingletonCache {
    entries: DashMap<ProducerId, Instance>,
    /// Serialises publishers, readers never take it
    publish: Mutex<()>,
}

impl SingletonCache {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &ProducerId) -> bool {
        self.entries.contains_key(id)
    }

    pub(crate) fn get(&self, id: &ProducerId) -> Option<Instance> {
        self.entries.get(id).map(|entry| entry.value().clone())
    }

    /// Stores every staged instance, or none of them
    ///
    /// Returns false without storing anything if any producer already has an entry,
    /// that is another resolve call published it first.
    pub(crate) fn publish<'c>(
        staged: impl IntoIterator<Item = (&'c Self, ProducerId, Instance)>,
    ) -> bool {
        let staged: Vec<_> = staged.into_iter().collect();
        if staged.is_empty() {
            return true;
        }

        let mut caches: Vec<&SingletonCache> = staged.iter().map(|(cache, ..)| *cache).collect();
        caches.sort_by_key(|cache| *cache as *const SingletonCache as usize);
        caches.dedup_by(|a, b| std::ptr::eq(*a, *b));
        // Locked in address order, a call may publish to an override registry too
        let _guards: Vec<_> = caches.iter().map(|cache| cache.publish.lock()).collect();

        if staged.iter().any(|(cache, id, _)| cache.contains(id)) {
            return false;
        }
        for (cache, id, instance) in staged {
            cache.entries.insert(id, instance);
        }
        true
    }
}

/// Instances of local scoped producers, owned by one top-level resolve call
#[derive(Default)]
pub(crate) struct LocalCache {
    entries: HashMap<ProducerId, Instance>,
}

impl LocalCache {
    pub(crate) fn get(&self, id: &ProducerId) -> Option<Instance> {
        self.entries.get(id).cloned()
    }

    pub(crate) fn insert(&mut self, id: ProducerId, instance: Instance) {
        self.entries.insert(id, instance);
    }
}
