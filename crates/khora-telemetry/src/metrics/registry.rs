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

//! Registry for managing metrics.

use crate::storage::{backend::MetricsBackend, memory_backend::InMemoryBackend};
use khora_core::telemetry::{Metric, MetricId, MetricType, MetricsError, MetricsResult};
use std::sync::Arc;

/// Central registry for load metrics.
///
/// Registration returns a typed handle bound to the backend, so hot paths
/// update a metric without looking it up by name. The registry is cheap to
/// clone and every clone shares the same backend.
#[derive(Debug, Clone)]
pub struct MetricsRegistry {
    backend: Arc<dyn MetricsBackend>,
}

impl MetricsRegistry {
    /// Creates a registry with the default in-memory backend.
    pub fn new() -> Self {
        Self {
            backend: Arc::new(InMemoryBackend::new()),
        }
    }

    /// Creates a registry over a custom backend.
    pub fn with_backend(backend: Arc<dyn MetricsBackend>) -> Self {
        Self { backend }
    }

    /// Registers a counter, or returns a handle to the existing one.
    pub fn register_counter(
        &self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> MetricsResult<CounterHandle> {
        let id = MetricId::new(namespace, name);
        self.backend
            .register(Metric::new_counter(id.clone(), description))?;
        Ok(CounterHandle {
            id,
            backend: self.backend.clone(),
        })
    }

    /// Registers a gauge, or returns a handle to the existing one.
    pub fn register_gauge(
        &self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        unit: impl Into<String>,
    ) -> MetricsResult<GaugeHandle> {
        let id = MetricId::new(namespace, name);
        self.backend
            .register(Metric::new_gauge(id.clone(), description, unit))?;
        Ok(GaugeHandle {
            id,
            backend: self.backend.clone(),
        })
    }

    /// Get a metric by ID
    pub fn get_metric(&self, id: &MetricId) -> MetricsResult<Metric> {
        self.backend.get_metric(id)
    }

    /// Check if a metric exists
    pub fn contains_metric(&self, id: &MetricId) -> bool {
        self.backend.contains_metric(id)
    }

    /// Returns every metric of `namespace`, sorted by name.
    pub fn get_namespace_metrics(&self, namespace: &str) -> Vec<Metric> {
        let mut metrics: Vec<Metric> = self
            .backend
            .list_all_metrics()
            .into_iter()
            .filter(|m| m.id.namespace == namespace)
            .collect();
        metrics.sort_by(|a, b| a.id.cmp(&b.id));
        metrics
    }

    /// Get the total number of metrics
    pub fn metric_count(&self) -> usize {
        self.backend.metric_count()
    }

    /// Clear all metrics
    pub fn clear_all(&self) -> MetricsResult<()> {
        self.backend.clear_all()
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle for counter updates.
#[derive(Debug, Clone)]
pub struct CounterHandle {
    id: MetricId,
    backend: Arc<dyn MetricsBackend>,
}

impl CounterHandle {
    /// Increment the counter by 1
    pub fn increment(&self) -> MetricsResult<u64> {
        self.backend.increment_counter(&self.id, 1)
    }

    /// Increment the counter by a specific amount
    pub fn increment_by(&self, amount: u64) -> MetricsResult<u64> {
        self.backend.increment_counter(&self.id, amount)
    }

    /// Get the current counter value
    pub fn get(&self) -> MetricsResult<u64> {
        let metric = self.backend.get_metric(&self.id)?;
        metric
            .value
            .as_counter()
            .ok_or_else(|| MetricsError::TypeMismatch {
                expected: MetricType::Counter,
                found: metric.metric_type(),
            })
    }

    /// Get the metric ID
    pub fn id(&self) -> &MetricId {
        &self.id
    }
}

/// Handle for gauge updates.
#[derive(Debug, Clone)]
pub struct GaugeHandle {
    id: MetricId,
    backend: Arc<dyn MetricsBackend>,
}

impl GaugeHandle {
    /// Set the gauge to a specific value
    pub fn set(&self, value: f64) -> MetricsResult<()> {
        self.backend.set_gauge(&self.id, value)
    }

    /// Adds `delta` to the gauge and returns the new value.
    pub fn add(&self, delta: f64) -> MetricsResult<f64> {
        self.backend.add_gauge(&self.id, delta)
    }

    /// Subtracts `delta` from the gauge and returns the new value.
    pub fn sub(&self, delta: f64) -> MetricsResult<f64> {
        self.backend.add_gauge(&self.id, -delta)
    }

    /// Get the current gauge value
    pub fn get(&self) -> MetricsResult<f64> {
        let metric = self.backend.get_metric(&self.id)?;
        metric
            .value
            .as_gauge()
            .ok_or_else(|| MetricsError::TypeMismatch {
                expected: MetricType::Gauge,
                found: metric.metric_type(),
            })
    }

    /// Get the metric ID
    pub fn id(&self) -> &MetricId {
        &self.id
    }
}
