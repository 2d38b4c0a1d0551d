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

//! The engine that owns the active jobs and starts new loads.

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::job::EngineJob;
use crate::metrics::LoadingMetrics;
use crate::worker::{panic_message, DecodeWorkers};
use khora_core::asset::{Asset, Resource};
use khora_core::loading::{Dispatcher, JobKey, JobListener, LoadError, ResourceCallback};
use khora_data::allocators::ResourcePool;
use khora_data::assets::LruResourceCache;
use khora_telemetry::{CounterHandle, MetricsRegistry};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// The outcome of [`LoadEngine::load`].
pub enum LoadStatus<K: JobKey, T: Asset> {
    /// The resource was in the memory cache. Delivery is already posted to
    /// the dispatcher and cannot be cancelled.
    Cached,
    /// The consumer is registered on an in-flight job.
    Pending(LoadHandle<K, T>),
}

impl<K: JobKey, T: Asset> LoadStatus<K, T> {
    /// Returns the handle of a pending load.
    pub fn handle(&self) -> Option<&LoadHandle<K, T>> {
        match self {
            LoadStatus::Cached => None,
            LoadStatus::Pending(handle) => Some(handle),
        }
    }

    /// Returns `true` if the request was served from the memory cache.
    pub fn is_cached(&self) -> bool {
        matches!(self, LoadStatus::Cached)
    }
}

/// Lets one consumer withdraw from the job it is waiting on.
pub struct LoadHandle<K: JobKey, T: Asset> {
    job: Arc<EngineJob<K, T>>,
    consumer: Arc<dyn ResourceCallback<T>>,
}

impl<K: JobKey, T: Asset> LoadHandle<K, T> {
    /// Unregisters the consumer. The job is cancelled if nobody else waits on it.
    pub fn cancel(&self) {
        self.job.unregister(&self.consumer);
    }

    /// The key being loaded.
    pub fn key(&self) -> &K {
        self.job.key()
    }

    /// The job the consumer is registered on.
    pub fn job(&self) -> &Arc<EngineJob<K, T>> {
        &self.job
    }
}

/// The set of in-flight jobs, one per key.
///
/// Jobs report their retirement here. An entry is only removed if the job
/// stored under the key is no longer pending, so a job that retires after
/// being replaced never evicts its successor.
struct ActiveJobs<K: JobKey, T: Asset> {
    jobs: Mutex<HashMap<K, Arc<EngineJob<K, T>>>>,
    metrics: Option<LoadingMetrics>,
}

impl<K: JobKey, T: Asset> ActiveJobs<K, T> {
    fn lock(&self) -> MutexGuard<'_, HashMap<K, Arc<EngineJob<K, T>>>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn retire(&self, key: &K) {
        let mut jobs = self.lock();
        if jobs.get(key).is_some_and(|job| !job.is_pending()) {
            jobs.remove(key);
        }
        if let Some(metrics) = &self.metrics {
            metrics.set_active_jobs(jobs.len());
        }
    }
}

impl<K: JobKey, T: Asset> JobListener<K> for ActiveJobs<K, T> {
    fn on_job_complete(&self, key: &K) {
        self.retire(key);
    }

    fn on_job_cancelled(&self, key: &K) {
        if let Some(metrics) = &self.metrics {
            LoadingMetrics::record(&metrics.cancelled);
        }
        self.retire(key);
    }
}

/// Starts loads, coalescing concurrent requests for the same key.
///
/// A request is served from the memory cache when possible, joins the
/// in-flight job for its key otherwise, and only starts a new decode when
/// neither exists. Decodes run on [`DecodeWorkers`]; every outcome is
/// delivered on the dispatcher.
pub struct LoadEngine<K: JobKey, T: Asset> {
    config: EngineConfig,
    active: Arc<ActiveJobs<K, T>>,
    cache: Arc<LruResourceCache<K, T>>,
    pool: Arc<ResourcePool<T>>,
    dispatcher: Arc<dyn Dispatcher>,
    workers: DecodeWorkers,
    metrics: Option<LoadingMetrics>,
    registry: Option<MetricsRegistry>,
}

impl<K: JobKey, T: Asset> LoadEngine<K, T> {
    /// Creates an engine delivering on `dispatcher`.
    ///
    /// When metrics are enabled, the engine records them in a registry of
    /// its own.
    pub fn new(config: EngineConfig, dispatcher: Arc<dyn Dispatcher>) -> Result<Self, EngineError> {
        let registry = config.metrics_enabled.then(MetricsRegistry::new);
        Self::build(config, dispatcher, registry)
    }

    /// Creates an engine recording its metrics in a shared registry.
    pub fn with_registry(
        config: EngineConfig,
        dispatcher: Arc<dyn Dispatcher>,
        registry: MetricsRegistry,
    ) -> Result<Self, EngineError> {
        Self::build(config, dispatcher, Some(registry))
    }

    fn build(
        config: EngineConfig,
        dispatcher: Arc<dyn Dispatcher>,
        registry: Option<MetricsRegistry>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let metrics = registry
            .as_ref()
            .map(LoadingMetrics::register)
            .transpose()?;
        let workers = DecodeWorkers::spawn(config.worker_threads, "khora-decode")?;

        log::info!(
            "Load engine ready: {} worker(s), cache capacity {}.",
            config.worker_threads,
            config.memory_cache_capacity
        );
        Ok(Self {
            active: Arc::new(ActiveJobs {
                jobs: Mutex::new(HashMap::new()),
                metrics: metrics.clone(),
            }),
            cache: Arc::new(LruResourceCache::new(config.memory_cache_capacity)),
            pool: Arc::new(ResourcePool::new(config.pool_capacity)),
            dispatcher,
            workers,
            metrics,
            registry,
            config,
        })
    }

    /// Requests the resource for `key` on behalf of `consumer`.
    ///
    /// `decode` only runs if no cached resource and no in-flight job exist
    /// for the key. It receives the engine's pool to reuse reclaimed
    /// payloads. An error or a panic in `decode` is delivered to every
    /// consumer of the job through [`ResourceCallback::on_exception`].
    ///
    /// When `cacheable` is `false`, the memory cache is neither read nor
    /// written by this request's job.
    pub fn load<F>(
        &self,
        key: K,
        consumer: Arc<dyn ResourceCallback<T>>,
        cacheable: bool,
        decode: F,
    ) -> Result<LoadStatus<K, T>, EngineError>
    where
        F: FnOnce(&ResourcePool<T>) -> anyhow::Result<T> + Send + 'static,
    {
        self.record(|m| &m.requests);

        if cacheable {
            if let Some(resource) = self.cache.get(&key) {
                log::trace!("Memory cache hit for {key:?}.");
                self.record(|m| &m.cache_hits);
                self.dispatcher
                    .post(Box::new(move || consumer.on_resource_ready(resource)));
                return Ok(LoadStatus::Cached);
            }
        }

        let mut jobs = self.active.lock();
        if let Some(job) = jobs.get(&key) {
            if job.register(consumer.clone()) {
                log::trace!("Joined in-flight job for {key:?}.");
                self.record(|m| &m.coalesced);
                return Ok(LoadStatus::Pending(LoadHandle {
                    job: job.clone(),
                    consumer,
                }));
            }
        }

        let job = Arc::new(EngineJob::new(
            key.clone(),
            self.cache.clone(),
            self.dispatcher.clone(),
            cacheable,
            self.active.clone(),
        ));
        job.register(consumer.clone());

        // Submitted under the registry lock: a fast decode cannot retire the
        // job before it is visible in the map.
        let decode_job = job.clone();
        let pool = self.pool.clone();
        let metrics = self.metrics.clone();
        self.workers.submit(Box::new(move || {
            run_decode(&decode_job, &pool, metrics.as_ref(), decode)
        }))?;

        jobs.insert(key, job.clone());
        if let Some(metrics) = &self.metrics {
            metrics.set_active_jobs(jobs.len());
        }
        drop(jobs);

        log::debug!("Started load job {:?}.", job.key());
        Ok(LoadStatus::Pending(LoadHandle { job, consumer }))
    }

    /// Returns `true` if a pending job exists for `key`.
    pub fn is_loading(&self, key: &K) -> bool {
        self.active.lock().get(key).is_some_and(|job| job.is_pending())
    }

    /// Returns the number of jobs in the active set.
    pub fn active_jobs(&self) -> usize {
        self.active.lock().len()
    }

    /// The memory cache successful cacheable loads are retained in.
    pub fn cache(&self) -> &LruResourceCache<K, T> {
        &self.cache
    }

    /// The pool reclaimed payloads return to.
    pub fn pool(&self) -> &Arc<ResourcePool<T>> {
        &self.pool
    }

    /// The configuration the engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The loading metrics, when enabled.
    pub fn metrics(&self) -> Option<&LoadingMetrics> {
        self.metrics.as_ref()
    }

    /// The registry the metrics are recorded in, when enabled.
    pub fn metrics_registry(&self) -> Option<&MetricsRegistry> {
        self.registry.as_ref()
    }

    /// Finishes the queued decodes and stops the workers.
    ///
    /// Outcomes of the finished decodes are still posted to the dispatcher.
    /// Further calls to [`load`](Self::load) that need a decode fail.
    pub fn shutdown(&self) {
        self.workers.shutdown();
    }

    fn record(&self, counter: impl FnOnce(&LoadingMetrics) -> &CounterHandle) {
        if let Some(metrics) = &self.metrics {
            LoadingMetrics::record(counter(metrics));
        }
    }
}

impl<K: JobKey, T: Asset> Drop for LoadEngine<K, T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_decode<K, T, F>(
    job: &Arc<EngineJob<K, T>>,
    pool: &Arc<ResourcePool<T>>,
    metrics: Option<&LoadingMetrics>,
    decode: F,
) where
    K: JobKey,
    T: Asset,
    F: FnOnce(&ResourcePool<T>) -> anyhow::Result<T>,
{
    if job.is_cancelled() {
        log::debug!("Skipping decode of cancelled job {:?}.", job.key());
        return;
    }

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| decode(pool.as_ref())));
    let error = match outcome {
        Ok(Ok(value)) => {
            if let Some(metrics) = metrics {
                LoadingMetrics::record(&metrics.decoded);
            }
            job.on_result(Resource::with_recycler(value, pool.clone()));
            return;
        }
        Ok(Err(error)) => LoadError::new(error),
        Err(payload) => LoadError::msg(format!(
            "decoder panicked: {}",
            panic_message(payload.as_ref())
        )),
    };

    log::warn!("Failed to load {:?}: {error}", job.key());
    if let Some(metrics) = metrics {
        LoadingMetrics::record(&metrics.failed);
    }
    job.on_failure(error);
}
