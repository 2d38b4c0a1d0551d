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

use khora_core::telemetry::MetricsResult;
use khora_telemetry::{CounterHandle, GaugeHandle, MetricsRegistry};

/// Namespace under which every loading metric is registered.
pub const LOADING_NAMESPACE: &str = "loading";

/// Counters describing the activity of a [`LoadEngine`](crate::LoadEngine).
#[derive(Debug, Clone)]
pub struct LoadingMetrics {
    /// Every call to `load`.
    pub requests: CounterHandle,
    /// Requests that joined an in-flight job.
    pub coalesced: CounterHandle,
    /// Requests served from the memory cache.
    pub cache_hits: CounterHandle,
    /// Decodes that produced a resource.
    pub decoded: CounterHandle,
    /// Decodes that returned an error or panicked.
    pub failed: CounterHandle,
    /// Jobs cancelled before completing.
    pub cancelled: CounterHandle,
    /// Jobs currently in the active set.
    pub active_jobs: GaugeHandle,
}

impl LoadingMetrics {
    /// Registers the loading metrics, or attaches to existing ones.
    pub fn register(registry: &MetricsRegistry) -> MetricsResult<Self> {
        let counter = |name: &str, description: &str| {
            registry.register_counter(LOADING_NAMESPACE, name, description)
        };
        Ok(Self {
            requests: counter("requests_total", "Load requests received")?,
            coalesced: counter("coalesced_total", "Requests joined to an in-flight job")?,
            cache_hits: counter("cache_hits_total", "Requests served from the memory cache")?,
            decoded: counter("decoded_total", "Successful decodes")?,
            failed: counter("failed_total", "Failed decodes")?,
            cancelled: counter("cancelled_total", "Jobs cancelled before completion")?,
            active_jobs: registry.register_gauge(
                LOADING_NAMESPACE,
                "active_jobs",
                "Jobs currently in flight",
                "jobs",
            )?,
        })
    }

    pub(crate) fn record(counter: &CounterHandle) {
        if let Err(e) = counter.increment() {
            log::warn!("Failed to record metric {}: {e}", counter.id());
        }
    }

    pub(crate) fn set_active_jobs(&self, count: usize) {
        if let Err(e) = self.active_jobs.set(count as f64) {
            log::warn!("Failed to record metric {}: {e}", self.active_jobs.id());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_is_shared_between_instances() {
        let registry = MetricsRegistry::new();
        let first = LoadingMetrics::register(&registry).unwrap();
        let second = LoadingMetrics::register(&registry).unwrap();

        LoadingMetrics::record(&first.requests);
        LoadingMetrics::record(&second.requests);

        assert_eq!(first.requests.get().unwrap(), 2);
        assert_eq!(registry.get_namespace_metrics(LOADING_NAMESPACE).len(), 7);
    }

    #[test]
    fn test_active_jobs_gauge() {
        let registry = MetricsRegistry::new();
        let metrics = LoadingMetrics::register(&registry).unwrap();
        metrics.set_active_jobs(3);
        assert_eq!(metrics.active_jobs.get().unwrap(), 3.0);
    }
}
