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

use anyhow::Result;
use khora_core::asset::{Fingerprint, Resource};
use khora_core::loading::{JobListener, LoadError, MemoryCache, ResourceCallback};
use khora_jobs::{EngineJob, JobState, ManualDispatcher};
use std::sync::{Arc, Mutex};
use std::thread;

// --- Test Setup: recording collaborators ---

#[derive(Default)]
struct RecordingListener {
    completed: Mutex<Vec<Fingerprint>>,
    cancelled: Mutex<Vec<Fingerprint>>,
}

impl JobListener<Fingerprint> for RecordingListener {
    fn on_job_complete(&self, key: &Fingerprint) {
        self.completed.lock().unwrap().push(*key);
    }

    fn on_job_cancelled(&self, key: &Fingerprint) {
        self.cancelled.lock().unwrap().push(*key);
    }
}

impl RecordingListener {
    fn retirements(&self) -> usize {
        self.completed.lock().unwrap().len() + self.cancelled.lock().unwrap().len()
    }
}

#[derive(Default)]
struct RecordingCache {
    puts: Mutex<Vec<(Fingerprint, Resource<Vec<u8>>)>>,
}

impl MemoryCache<Fingerprint, Vec<u8>> for RecordingCache {
    fn put(&self, key: Fingerprint, resource: Resource<Vec<u8>>) {
        self.puts.lock().unwrap().push((key, resource));
    }
}

/// Keeps what it receives so the test can inspect acquisitions.
#[derive(Default)]
struct HoldingConsumer {
    ready: Mutex<Vec<Resource<Vec<u8>>>>,
    errors: Mutex<Vec<LoadError>>,
}

impl ResourceCallback<Vec<u8>> for HoldingConsumer {
    fn on_resource_ready(&self, resource: Resource<Vec<u8>>) {
        self.ready.lock().unwrap().push(resource);
    }

    fn on_exception(&self, error: &LoadError) {
        self.errors.lock().unwrap().push(error.clone());
    }
}

impl HoldingConsumer {
    fn notifications(&self) -> usize {
        self.ready.lock().unwrap().len() + self.errors.lock().unwrap().len()
    }
}

struct Harness {
    key: Fingerprint,
    listener: Arc<RecordingListener>,
    cache: Arc<RecordingCache>,
    dispatcher: Arc<ManualDispatcher>,
    job: Arc<EngineJob<Fingerprint, Vec<u8>>>,
}

fn harness(is_cacheable: bool) -> Harness {
    let key = Fingerprint::new("textures/grass.png", 256, 256, "center_crop");
    let listener = Arc::new(RecordingListener::default());
    let cache = Arc::new(RecordingCache::default());
    let dispatcher = Arc::new(ManualDispatcher::new());
    let job = Arc::new(EngineJob::new(
        key,
        cache.clone(),
        dispatcher.clone(),
        is_cacheable,
        listener.clone(),
    ));
    Harness {
        key,
        listener,
        cache,
        dispatcher,
        job,
    }
}

fn register(job: &EngineJob<Fingerprint, Vec<u8>>) -> (Arc<HoldingConsumer>, Arc<dyn ResourceCallback<Vec<u8>>>) {
    let consumer = Arc::new(HoldingConsumer::default());
    let callback: Arc<dyn ResourceCallback<Vec<u8>>> = consumer.clone();
    assert!(job.register(callback.clone()));
    (consumer, callback)
}

// ---

#[test]
fn test_result_fans_out_to_cache_and_every_consumer() -> Result<()> {
    let h = harness(true);
    let consumers: Vec<_> = (0..3).map(|_| register(&h.job).0).collect();
    let resource = Resource::new(vec![7u8; 16]);

    h.job.on_result(resource.clone());
    h.dispatcher.run_pending();

    // The cache received exactly one put for the job's key.
    let puts = h.cache.puts.lock().unwrap();
    assert_eq!(puts.len(), 1);
    assert_eq!(puts[0].0, h.key);
    assert!(Resource::ptr_eq(&puts[0].1, &resource));

    // Every consumer received the same resource, once.
    for consumer in &consumers {
        let ready = consumer.ready.lock().unwrap();
        assert_eq!(ready.len(), 1);
        assert!(Resource::ptr_eq(&ready[0], &resource));
        assert!(consumer.errors.lock().unwrap().is_empty());
    }

    // Three consumers plus the cache; the transient hold is gone.
    assert_eq!(resource.count(), 4);
    assert_eq!(*h.listener.completed.lock().unwrap(), vec![h.key]);
    assert!(h.listener.cancelled.lock().unwrap().is_empty());
    assert_eq!(h.job.state(), JobState::Complete);
    Ok(())
}

#[test]
fn test_last_unregister_cancels_and_result_is_ignored() -> Result<()> {
    let h = harness(true);
    let (a, a_callback) = register(&h.job);
    let (b, b_callback) = register(&h.job);

    h.job.unregister(&a_callback);
    assert!(h.job.is_pending());
    assert!(h.listener.cancelled.lock().unwrap().is_empty());

    h.job.unregister(&b_callback);
    assert!(h.job.is_cancelled());
    assert_eq!(*h.listener.cancelled.lock().unwrap(), vec![h.key]);

    let resource = Resource::new(vec![1u8, 2, 3]);
    h.job.on_result(resource.clone());
    h.dispatcher.run_pending();

    assert!(h.cache.puts.lock().unwrap().is_empty());
    assert_eq!(a.notifications() + b.notifications(), 0);
    assert_eq!(h.listener.retirements(), 1);

    // The job took nothing and reclaimed the unheld payload.
    assert_eq!(resource.count(), 0);
    assert!(resource.is_recycled());
    Ok(())
}

#[test]
fn test_failure_then_cancel_notifies_once() -> Result<()> {
    let h = harness(false);
    let (consumer, _) = register(&h.job);

    h.job.on_failure(LoadError::msg("corrupt header"));
    h.dispatcher.run_pending();
    h.job.cancel();
    h.dispatcher.run_pending();

    let errors = consumer.errors.lock().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].to_string(), "corrupt header");
    assert!(consumer.ready.lock().unwrap().is_empty());

    assert_eq!(*h.listener.completed.lock().unwrap(), vec![h.key]);
    assert!(h.listener.cancelled.lock().unwrap().is_empty());
    assert_eq!(h.job.state(), JobState::Complete);
    Ok(())
}

#[test]
fn test_non_cacheable_result_skips_the_cache() -> Result<()> {
    let h = harness(false);
    let (consumer, _) = register(&h.job);
    let resource = Resource::new(vec![0u8; 4]);

    h.job.on_result(resource.clone());
    h.dispatcher.run_pending();

    assert!(h.cache.puts.lock().unwrap().is_empty());
    assert_eq!(resource.count(), 1);

    // The consumer's release is the last one.
    let delivered = consumer.ready.lock().unwrap().pop().unwrap();
    delivered.release()?;
    assert!(resource.is_recycled());
    Ok(())
}

#[test]
fn test_result_with_no_consumers_still_completes() -> Result<()> {
    let h = harness(true);
    let resource = Resource::new(vec![9u8]);

    h.job.on_result(resource.clone());
    h.dispatcher.run_pending();

    assert_eq!(h.cache.puts.lock().unwrap().len(), 1);
    assert_eq!(resource.count(), 1);
    assert_eq!(h.listener.retirements(), 1);
    Ok(())
}

#[test]
fn test_only_the_first_outcome_is_distributed() -> Result<()> {
    let h = harness(true);
    let (consumer, _) = register(&h.job);
    let first = Resource::new(vec![1u8]);
    let second = Resource::new(vec![2u8]);

    h.job.on_result(first.clone());
    h.job.on_result(second.clone());
    h.job.on_failure(LoadError::msg("late"));
    h.dispatcher.run_pending();

    assert_eq!(consumer.notifications(), 1);
    assert_eq!(first.count(), 2);
    assert_eq!(second.count(), 0);
    assert!(second.is_recycled());
    assert_eq!(h.cache.puts.lock().unwrap().len(), 1);
    assert_eq!(h.listener.retirements(), 1);
    Ok(())
}

#[test]
fn test_concurrent_registration_and_cancellation() -> Result<()> {
    let h = harness(false);
    let (keeper, _) = register(&h.job);

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let job = h.job.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    let consumer: Arc<dyn ResourceCallback<Vec<u8>>> =
                        Arc::new(HoldingConsumer::default());
                    job.register(consumer.clone());
                    job.unregister(&consumer);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    // The first consumer never left, so the job is still pending.
    assert!(h.job.is_pending());
    assert_eq!(h.job.consumer_count(), 1);
    assert_eq!(h.listener.retirements(), 0);

    let resource = Resource::new(vec![3u8]);
    h.job.on_result(resource.clone());
    h.dispatcher.run_pending();
    assert_eq!(keeper.notifications(), 1);
    assert_eq!(resource.count(), 1);
    Ok(())
}

/// Releases its acquisition as soon as it is handed the resource.
struct EagerReleaser;

impl ResourceCallback<Vec<u8>> for EagerReleaser {
    fn on_resource_ready(&self, resource: Resource<Vec<u8>>) {
        resource.release().unwrap();
    }

    fn on_exception(&self, _error: &LoadError) {}
}

/// Records whether the payload was still readable when it was delivered.
#[derive(Default)]
struct LivenessCheck {
    seen: Mutex<Vec<(usize, bool)>>,
}

impl ResourceCallback<Vec<u8>> for LivenessCheck {
    fn on_resource_ready(&self, resource: Resource<Vec<u8>>) {
        let len = resource.with(|bytes| bytes.len()).unwrap_or(0);
        self.seen.lock().unwrap().push((len, resource.is_recycled()));
        resource.release().unwrap();
    }

    fn on_exception(&self, _error: &LoadError) {}
}

/// A cache that gives its acquisition back immediately.
struct ReleasingCache;

impl MemoryCache<Fingerprint, Vec<u8>> for ReleasingCache {
    fn put(&self, _key: Fingerprint, resource: Resource<Vec<u8>>) {
        resource.release().unwrap();
    }
}

#[test]
fn test_payload_stays_alive_while_collaborators_release_early() -> Result<()> {
    let listener = Arc::new(RecordingListener::default());
    let dispatcher = Arc::new(ManualDispatcher::new());
    let job = Arc::new(EngineJob::new(
        Fingerprint::of_source("textures/sky.png"),
        Arc::new(ReleasingCache),
        dispatcher.clone(),
        true,
        listener.clone(),
    ));

    // The cache and the first consumer release before the last consumer runs.
    job.register(Arc::new(EagerReleaser));
    let checker = Arc::new(LivenessCheck::default());
    job.register(checker.clone());

    let resource = Resource::new(vec![5u8; 10]);
    job.on_result(resource.clone());
    dispatcher.run_pending();

    assert_eq!(*checker.seen.lock().unwrap(), vec![(10, false)]);
    // Every holder is gone once the transient hold is dropped.
    assert_eq!(resource.count(), 0);
    assert!(resource.is_recycled());
    assert_eq!(listener.retirements(), 1);
    Ok(())
}
