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

use khora_core::asset::ResourceRecycler;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A bounded pool of payloads reclaimed from released resources.
///
/// Decoders [`take`](Self::take) a payload (a pixel buffer, say) instead of
/// allocating a new one. Resources built with this pool as their recycler
/// give their payload back when the last holder releases them. When the pool
/// is full, returned payloads are dropped.
pub struct ResourcePool<T> {
    capacity: usize,
    free: Mutex<Vec<T>>,
    recycled: AtomicU64,
    dropped: AtomicU64,
}

impl<T: Send> ResourcePool<T> {
    /// Creates a pool keeping at most `capacity` payloads.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            free: Mutex::new(Vec::with_capacity(capacity)),
            recycled: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    fn free(&self) -> MutexGuard<'_, Vec<T>> {
        self.free.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Takes the most recently returned payload, if any.
    pub fn take(&self) -> Option<T> {
        self.free().pop()
    }

    /// Returns the number of payloads waiting for reuse.
    pub fn len(&self) -> usize {
        self.free().len()
    }

    /// Returns `true` if no payload is waiting.
    pub fn is_empty(&self) -> bool {
        self.free().is_empty()
    }

    /// Returns the maximum number of pooled payloads.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total payloads accepted back into the pool.
    pub fn recycled_total(&self) -> u64 {
        self.recycled.load(Ordering::Relaxed)
    }

    /// Total payloads dropped because the pool was full.
    pub fn dropped_total(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Drops every pooled payload.
    pub fn clear(&self) {
        let drained = std::mem::take(&mut *self.free());
        log::debug!("Resource pool cleared ({} payloads).", drained.len());
    }
}

impl<T: Send> ResourceRecycler<T> for ResourcePool<T> {
    fn recycle(&self, value: T) {
        let rejected = {
            let mut free = self.free();
            if free.len() < self.capacity {
                free.push(value);
                None
            } else {
                Some(value)
            }
        };

        match rejected {
            None => {
                self.recycled.fetch_add(1, Ordering::Relaxed);
            }
            Some(value) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                drop(value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use khora_core::asset::Resource;
    use std::sync::Arc;

    #[test]
    fn test_released_resource_returns_to_the_pool() {
        let pool = Arc::new(ResourcePool::new(2));
        let resource = Resource::with_recycler(vec![0u8; 64], pool.clone());

        resource.acquire(1).unwrap();
        assert!(pool.is_empty());
        resource.release().unwrap();

        assert_eq!(pool.len(), 1);
        assert_eq!(pool.take().map(|buffer| buffer.len()), Some(64));
        assert_eq!(pool.recycled_total(), 1);
    }

    #[test]
    fn test_full_pool_drops_payloads() {
        let pool = ResourcePool::new(1);
        pool.recycle(vec![1u8]);
        pool.recycle(vec![2u8]);

        assert_eq!(pool.len(), 1);
        assert_eq!(pool.dropped_total(), 1);
        assert_eq!(pool.take(), Some(vec![1u8]));
        assert_eq!(pool.take(), None);
    }

    #[test]
    fn test_clear_empties_the_pool() {
        let pool = ResourcePool::new(4);
        pool.recycle(String::from("a"));
        pool.recycle(String::from("b"));
        pool.clear();
        assert!(pool.is_empty());
        assert_eq!(pool.capacity(), 4);
    }
}
