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

//! The coalescing load job.

use khora_core::asset::{Asset, Resource};
use khora_core::loading::{
    Dispatcher, JobKey, JobListener, LoadError, MemoryCache, ResourceCallback,
};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// The lifecycle of an [`EngineJob`].
///
/// A job starts `Pending` and moves to exactly one of the two terminal
/// states. It never leaves a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Waiting for the decode to produce a result or a failure.
    Pending,
    /// A result or a failure was distributed.
    Complete,
    /// Cancelled before any result was distributed.
    Cancelled,
}

struct JobInner<T: Asset> {
    state: JobState,
    consumers: Vec<Arc<dyn ResourceCallback<T>>>,
}

/// Coalesces every request for one key into a single in-flight load.
///
/// Consumers [`register`](Self::register) while the job is pending. The
/// producer reports exactly one outcome through [`on_result`](Self::on_result)
/// or [`on_failure`](Self::on_failure); distribution then runs on the
/// dispatcher. A successful resource ends up acquired once per registered
/// consumer, plus once for the memory cache when the job is cacheable.
///
/// When the last consumer unregisters before completion, the job cancels
/// itself and its late outcome is ignored.
///
/// Collaborators are always invoked without the job's lock held, so they
/// may call back into the job.
pub struct EngineJob<K: JobKey, T: Asset> {
    key: K,
    cache: Arc<dyn MemoryCache<K, T>>,
    dispatcher: Arc<dyn Dispatcher>,
    listener: Arc<dyn JobListener<K>>,
    is_cacheable: bool,
    inner: Mutex<JobInner<T>>,
}

impl<K: JobKey, T: Asset> EngineJob<K, T> {
    /// Creates a pending job for `key` with no consumer.
    pub fn new(
        key: K,
        cache: Arc<dyn MemoryCache<K, T>>,
        dispatcher: Arc<dyn Dispatcher>,
        is_cacheable: bool,
        listener: Arc<dyn JobListener<K>>,
    ) -> Self {
        Self {
            key,
            cache,
            dispatcher,
            listener,
            is_cacheable,
            inner: Mutex::new(JobInner {
                state: JobState::Pending,
                consumers: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, JobInner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a consumer to be notified of the outcome.
    ///
    /// Returns `false` and leaves the job untouched if it already reached a
    /// terminal state. The caller must then start a new job.
    pub fn register(&self, consumer: Arc<dyn ResourceCallback<T>>) -> bool {
        let mut inner = self.lock();
        if inner.state != JobState::Pending {
            log::debug!("Refused registration on retired job {:?}.", self.key);
            return false;
        }
        inner.consumers.push(consumer);
        true
    }

    /// Removes a consumer. Does nothing if it was not registered.
    ///
    /// Removing the last consumer of a pending job cancels the job. Only the
    /// first registration of a consumer registered several times is removed.
    pub fn unregister(&self, consumer: &Arc<dyn ResourceCallback<T>>) {
        let cancelled = {
            let mut inner = self.lock();
            let Some(index) = inner
                .consumers
                .iter()
                .position(|registered| same_consumer(registered, consumer))
            else {
                return;
            };
            inner.consumers.remove(index);
            inner.consumers.is_empty() && Self::retire(&mut inner, JobState::Cancelled)
        };

        if cancelled {
            self.notify_cancelled();
        }
    }

    /// Cancels the job. Idempotent, and a no-op once the job completed.
    pub fn cancel(&self) {
        let cancelled = Self::retire(&mut self.lock(), JobState::Cancelled);
        if cancelled {
            self.notify_cancelled();
        }
    }

    /// Reports a successful decode. Distribution runs later on the dispatcher.
    ///
    /// If the job is no longer pending when the posted task runs, the outcome
    /// is ignored. No acquisition is taken on `resource`; if nobody else
    /// acquired it, it is [`recycle`](Resource::recycle)d.
    pub fn on_result(self: &Arc<Self>, resource: Resource<T>) {
        let job = Arc::clone(self);
        self.dispatcher
            .post(Box::new(move || job.distribute_result(resource)));
    }

    /// Reports a failed decode. Distribution runs later on the dispatcher.
    pub fn on_failure(self: &Arc<Self>, error: LoadError) {
        let job = Arc::clone(self);
        self.dispatcher
            .post(Box::new(move || job.distribute_failure(error)));
    }

    /// The key this job loads.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// The current lifecycle state.
    pub fn state(&self) -> JobState {
        self.lock().state
    }

    /// Returns `true` while no outcome was distributed and the job is not cancelled.
    pub fn is_pending(&self) -> bool {
        self.state() == JobState::Pending
    }

    /// Returns `true` once the job was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.state() == JobState::Cancelled
    }

    /// Returns `true` once an outcome was distributed.
    pub fn is_complete(&self) -> bool {
        self.state() == JobState::Complete
    }

    /// Whether a successful result is retained in the memory cache.
    pub fn is_cacheable(&self) -> bool {
        self.is_cacheable
    }

    /// The number of consumers currently registered.
    pub fn consumer_count(&self) -> usize {
        self.lock().consumers.len()
    }

    /// Moves a pending job to `to`. Returns `false` if it already retired.
    fn retire(inner: &mut JobInner<T>, to: JobState) -> bool {
        if inner.state != JobState::Pending {
            return false;
        }
        inner.state = to;
        true
    }

    /// Marks the job complete and takes the consumers to notify, in
    /// registration order.
    fn complete(&self) -> Option<Vec<Arc<dyn ResourceCallback<T>>>> {
        let mut inner = self.lock();
        if !Self::retire(&mut inner, JobState::Complete) {
            return None;
        }
        Some(std::mem::take(&mut inner.consumers))
    }

    fn notify_cancelled(&self) {
        log::debug!("Load job {:?} cancelled.", self.key);
        self.listener.on_job_cancelled(&self.key);
    }

    fn distribute_result(&self, resource: Resource<T>) {
        let Some(consumers) = self.complete() else {
            // Nobody holds an ignored result, so its payload goes straight back
            // to the recycler. A caller still holding it keeps it alive.
            if resource.count() == 0 {
                let _ = resource.recycle();
            }
            return;
        };

        // Hold the resource while the listener and the cache run, so neither
        // can drive its count to zero before the consumers have theirs.
        if let Err(e) = resource.acquire(1) {
            log::error!("Load job {:?} produced an unusable resource: {e}", self.key);
            self.listener.on_job_complete(&self.key);
            let error = LoadError::new(e);
            for consumer in &consumers {
                consumer.on_exception(&error);
            }
            return;
        }

        log::debug!(
            "Load job {:?} complete, delivering to {} consumer(s).",
            self.key,
            consumers.len()
        );
        self.listener.on_job_complete(&self.key);

        if self.is_cacheable {
            self.acquire_held(&resource, 1);
            self.cache.put(self.key.clone(), resource.clone());
        }
        self.acquire_held(&resource, consumers.len());
        for consumer in &consumers {
            consumer.on_resource_ready(resource.clone());
        }

        if let Err(e) = resource.release() {
            log::error!("Load job {:?} failed to drop its hold: {e}", self.key);
        }
    }

    /// Acquires on a resource the job already holds. Cannot fail while the
    /// transient hold is alive.
    fn acquire_held(&self, resource: &Resource<T>, n: usize) {
        if let Err(e) = resource.acquire(n) {
            log::error!("Load job {:?} failed to acquire a held resource: {e}", self.key);
            debug_assert!(false, "acquire failed under the transient hold: {e}");
        }
    }

    fn distribute_failure(&self, error: LoadError) {
        let Some(consumers) = self.complete() else {
            return;
        };

        log::debug!("Load job {:?} failed: {error}", self.key);
        self.listener.on_job_complete(&self.key);
        for consumer in &consumers {
            consumer.on_exception(&error);
        }
    }
}

impl<K: JobKey, T: Asset> fmt::Debug for EngineJob<K, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("EngineJob")
            .field("key", &self.key)
            .field("state", &inner.state)
            .field("consumers", &inner.consumers.len())
            .field("is_cacheable", &self.is_cacheable)
            .finish()
    }
}

/// Consumers are identified by the object they point to.
fn same_consumer<T: Asset>(
    a: &Arc<dyn ResourceCallback<T>>,
    b: &Arc<dyn ResourceCallback<T>>,
) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}
