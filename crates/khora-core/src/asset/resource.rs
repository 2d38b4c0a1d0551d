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

use super::Asset;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Receives the payload of a [`Resource`] once its last holder released it.
///
/// Typically implemented by a pool that hands reclaimed buffers back to
/// decoders instead of allocating new ones.
pub trait ResourceRecycler<T>: Send + Sync {
    /// Takes ownership of a payload nobody references anymore.
    fn recycle(&self, value: T);
}

/// An error raised when the acquire/release contract of a [`Resource`] is broken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// `release` was called while no holder had acquired the resource.
    NotAcquired,
    /// The resource was already reclaimed; its payload must not be touched.
    Recycled,
    /// `recycle` was called while holders still reference the resource.
    StillAcquired {
        /// The number of outstanding acquisitions.
        count: usize,
    },
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::NotAcquired => write!(f, "Cannot release a resource that is not acquired"),
            ResourceError::Recycled => write!(f, "Resource has already been recycled"),
            ResourceError::StillAcquired { count } => {
                write!(f, "Cannot recycle a resource with {count} outstanding acquisitions")
            }
        }
    }
}

impl std::error::Error for ResourceError {}

struct ResourceInner<T> {
    count: AtomicUsize,
    recycled: AtomicBool,
    payload: Mutex<Option<T>>,
    recycler: Option<Arc<dyn ResourceRecycler<T>>>,
}

/// A thread-safe handle to a decoded asset with an explicit holder count.
///
/// Unlike a plain `Arc`, the lifetime of the payload is driven by
/// [`acquire`](Self::acquire) and [`release`](Self::release): every holder
/// (the load job, the memory cache, each consumer) takes its own acquisition
/// and releases it when done. When the count drops back to zero the payload is
/// handed to the recycler, exactly once, and the resource is dead.
///
/// Cloning a `Resource` only clones the handle. It does **not** acquire.
///
/// A freshly created resource has a count of zero and is not yet recycled.
pub struct Resource<T: Asset> {
    inner: Arc<ResourceInner<T>>,
}

impl<T: Asset> Resource<T> {
    /// Wraps a decoded value. The payload is simply dropped when reclaimed.
    pub fn new(value: T) -> Self {
        Self::build(value, None)
    }

    /// Wraps a decoded value whose payload goes back to `recycler` when the
    /// last holder releases it.
    pub fn with_recycler(value: T, recycler: Arc<dyn ResourceRecycler<T>>) -> Self {
        Self::build(value, Some(recycler))
    }

    fn build(value: T, recycler: Option<Arc<dyn ResourceRecycler<T>>>) -> Self {
        Self {
            inner: Arc::new(ResourceInner {
                count: AtomicUsize::new(0),
                recycled: AtomicBool::new(false),
                payload: Mutex::new(Some(value)),
                recycler,
            }),
        }
    }

    /// Adds `n` acquisitions. Acquiring zero is a no-op.
    ///
    /// Only a current holder, or the producer before handing the resource
    /// out, may acquire.
    pub fn acquire(&self, n: usize) -> Result<(), ResourceError> {
        if self.is_recycled() {
            return Err(ResourceError::Recycled);
        }
        if n > 0 {
            self.inner.count.fetch_add(n, Ordering::AcqRel);
        }
        Ok(())
    }

    /// Drops one acquisition, reclaiming the payload if it was the last one.
    pub fn release(&self) -> Result<(), ResourceError> {
        let mut current = self.inner.count.load(Ordering::Acquire);
        loop {
            if current == 0 {
                return Err(if self.is_recycled() {
                    ResourceError::Recycled
                } else {
                    ResourceError::NotAcquired
                });
            }
            match self.inner.count.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }

        if current == 1 {
            self.reclaim();
        }
        Ok(())
    }

    /// Reclaims a resource that was never handed out.
    ///
    /// This is how a producer disposes of a resource whose completion was
    /// ignored by a job that had already been cancelled.
    pub fn recycle(&self) -> Result<(), ResourceError> {
        let count = self.count();
        if count > 0 {
            return Err(ResourceError::StillAcquired { count });
        }
        if self.is_recycled() {
            return Err(ResourceError::Recycled);
        }
        self.reclaim();
        Ok(())
    }

    fn reclaim(&self) {
        if self.inner.recycled.swap(true, Ordering::AcqRel) {
            return;
        }
        let value = self
            .inner
            .payload
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        log::trace!("Resource reclaimed.");

        if let (Some(value), Some(recycler)) = (value, self.inner.recycler.as_ref()) {
            recycler.recycle(value);
        }
    }

    /// Returns the number of outstanding acquisitions.
    pub fn count(&self) -> usize {
        self.inner.count.load(Ordering::Acquire)
    }

    /// Returns `true` once the payload has been reclaimed.
    pub fn is_recycled(&self) -> bool {
        self.inner.recycled.load(Ordering::Acquire)
    }

    /// Runs `f` against the payload while it is still alive.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R, ResourceError> {
        let payload = self
            .inner
            .payload
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        payload.as_ref().map(f).ok_or(ResourceError::Recycled)
    }

    /// Returns `true` if both handles point to the same resource.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }
}

impl<T: Asset> Clone for Resource<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Asset> fmt::Debug for Resource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("count", &self.count())
            .field("recycled", &self.is_recycled())
            .finish()
    }
}
