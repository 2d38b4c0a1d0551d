// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A bounded, least-recently-used cache of decoded resources.

use khora_core::asset::{Asset, Resource};
use khora_core::loading::{JobKey, MemoryCache};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A central, in-memory cache of decoded resources keyed by request.
///
/// Every entry owns exactly one acquisition on its resource. The acquisition
/// is released when the entry is evicted, replaced, cleared, or when the
/// cache itself is dropped, and handed over to the caller by
/// [`remove`](Self::remove).
///
/// Releases always happen after the internal lock is dropped, because the
/// last release runs the resource's recycler.
pub struct LruResourceCache<K: JobKey, T: Asset> {
    entries: Mutex<LruCache<K, Resource<T>>>,
}

impl<K: JobKey, T: Asset> LruResourceCache<K, T> {
    /// Creates a cache holding at most `capacity` entries (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn entries(&self) -> MutexGuard<'_, LruCache<K, Resource<T>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the cached resource for `key` with one acquisition taken for
    /// the caller, and marks it as recently used.
    pub fn get(&self, key: &K) -> Option<Resource<T>> {
        let mut entries = self.entries();
        let resource = entries.get(key)?.clone();
        // The entry's own acquisition keeps the resource alive while we hold the lock.
        resource.acquire(1).ok()?;
        Some(resource)
    }

    /// Removes the entry for `key`, handing the cache's acquisition to the caller.
    pub fn remove(&self, key: &K) -> Option<Resource<T>> {
        self.entries().pop(key)
    }

    /// Returns `true` if `key` is cached, without touching its recency.
    pub fn contains(&self, key: &K) -> bool {
        self.entries().contains(key)
    }

    /// Releases and removes every entry.
    pub fn clear(&self) {
        let drained: Vec<Resource<T>> = {
            let mut entries = self.entries();
            let mut drained = Vec::with_capacity(entries.len());
            while let Some((_, resource)) = entries.pop_lru() {
                drained.push(resource);
            }
            drained
        };
        for resource in drained {
            release_entry(&resource);
        }
    }

    /// Returns the number of cached entries.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Returns the maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.entries().cap().get()
    }
}

impl<K: JobKey, T: Asset> MemoryCache<K, T> for LruResourceCache<K, T> {
    fn put(&self, key: K, resource: Resource<T>) {
        let displaced = self.entries().push(key, resource);
        if let Some((key, old)) = displaced {
            log::trace!("Memory cache released entry {key:?}.");
            release_entry(&old);
        }
    }
}

impl<K: JobKey, T: Asset> Drop for LruResourceCache<K, T> {
    fn drop(&mut self) {
        self.clear();
    }
}

fn release_entry<T: Asset>(resource: &Resource<T>) {
    if let Err(e) = resource.release() {
        log::warn!("Memory cache failed to release an entry: {e}");
    }
}
