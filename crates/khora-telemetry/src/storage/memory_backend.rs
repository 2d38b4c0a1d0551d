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

use crate::storage::backend::MetricsBackend;
use khora_core::telemetry::{
    Metric, MetricId, MetricType, MetricValue, MetricsError, MetricsResult,
};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

/// In-memory metrics backend using `RwLock<HashMap>`.
///
/// Reads (snapshots, lookups) share the lock; every update takes the write
/// lock for the whole read-modify-write.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    storage: RwLock<HashMap<MetricId, Metric>>,
}

impl InMemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns copies of every metric in `namespace`, sorted by name.
    pub fn get_metrics_by_namespace(&self, namespace: &str) -> Vec<Metric> {
        let Ok(storage) = self.read() else {
            return Vec::new();
        };
        let mut metrics: Vec<Metric> = storage
            .values()
            .filter(|metric| metric.id.namespace == namespace)
            .cloned()
            .collect();
        metrics.sort_by(|a, b| a.id.cmp(&b.id));
        metrics
    }

    fn read(&self) -> MetricsResult<RwLockReadGuard<'_, HashMap<MetricId, Metric>>> {
        self.storage
            .read()
            .map_err(|_| MetricsError::StorageError("Failed to acquire read lock".to_string()))
    }

    fn write(&self) -> MetricsResult<RwLockWriteGuard<'_, HashMap<MetricId, Metric>>> {
        self.storage
            .write()
            .map_err(|_| MetricsError::StorageError("Failed to acquire write lock".to_string()))
    }

    fn update<R>(
        &self,
        id: &MetricId,
        expected: MetricType,
        f: impl FnOnce(&mut MetricValue) -> R,
    ) -> MetricsResult<R> {
        let mut storage = self.write()?;
        let metric = storage
            .get_mut(id)
            .ok_or_else(|| MetricsError::MetricNotFound(id.clone()))?;

        let found = metric.metric_type();
        if found != expected {
            return Err(MetricsError::TypeMismatch { expected, found });
        }

        let result = f(&mut metric.value);
        metric.last_updated = Instant::now();
        Ok(result)
    }
}

impl MetricsBackend for InMemoryBackend {
    fn register(&self, metric: Metric) -> MetricsResult<()> {
        let mut storage = self.write()?;
        match storage.get(&metric.id) {
            Some(existing) if existing.metric_type() == metric.metric_type() => Ok(()),
            Some(_) => Err(MetricsError::AlreadyRegistered(metric.id)),
            None => {
                storage.insert(metric.id.clone(), metric);
                Ok(())
            }
        }
    }

    fn get_metric(&self, id: &MetricId) -> MetricsResult<Metric> {
        self.read()?
            .get(id)
            .cloned()
            .ok_or_else(|| MetricsError::MetricNotFound(id.clone()))
    }

    fn contains_metric(&self, id: &MetricId) -> bool {
        self.read().map(|s| s.contains_key(id)).unwrap_or(false)
    }

    fn increment_counter(&self, id: &MetricId, delta: u64) -> MetricsResult<u64> {
        self.update(id, MetricType::Counter, |value| {
            let next = value.as_counter().unwrap_or(0).saturating_add(delta);
            *value = MetricValue::Counter(next);
            next
        })
    }

    fn set_gauge(&self, id: &MetricId, new_value: f64) -> MetricsResult<()> {
        self.update(id, MetricType::Gauge, |value| {
            *value = MetricValue::Gauge(new_value);
        })
    }

    fn add_gauge(&self, id: &MetricId, delta: f64) -> MetricsResult<f64> {
        self.update(id, MetricType::Gauge, |value| {
            let next = value.as_gauge().unwrap_or(0.0) + delta;
            *value = MetricValue::Gauge(next);
            next
        })
    }

    fn list_all_metrics(&self) -> Vec<Metric> {
        self.read()
            .map(|s| s.values().cloned().collect())
            .unwrap_or_default()
    }

    fn metric_count(&self) -> usize {
        self.read().map(|s| s.len()).unwrap_or(0)
    }

    fn clear_all(&self) -> MetricsResult<()> {
        self.write()?.clear();
        Ok(())
    }
}
