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

use khora_core::telemetry::{Metric, MetricId, MetricsResult};
use std::fmt::Debug;

/// Interface of a metrics storage backend.
///
/// Updates are expressed as whole operations (`increment_counter`,
/// `add_gauge`...) rather than read-modify-write sequences, so concurrent
/// updates from different threads never lose increments.
pub trait MetricsBackend: Send + Sync + Debug + 'static {
    /// Registers `metric` unless a metric with the same id and type exists,
    /// in which case the existing value is kept.
    fn register(&self, metric: Metric) -> MetricsResult<()>;

    /// Returns a copy of the metric stored under `id`.
    fn get_metric(&self, id: &MetricId) -> MetricsResult<Metric>;

    /// Returns `true` if a metric is stored under `id`.
    fn contains_metric(&self, id: &MetricId) -> bool;

    /// Adds `delta` to a counter and returns the new total.
    fn increment_counter(&self, id: &MetricId, delta: u64) -> MetricsResult<u64>;

    /// Overwrites the value of a gauge.
    fn set_gauge(&self, id: &MetricId, value: f64) -> MetricsResult<()>;

    /// Adds `delta` (possibly negative) to a gauge and returns the new value.
    fn add_gauge(&self, id: &MetricId, delta: f64) -> MetricsResult<f64>;

    /// Returns a copy of every stored metric.
    fn list_all_metrics(&self) -> Vec<Metric>;

    /// Returns the number of stored metrics.
    fn metric_count(&self) -> usize;

    /// Removes every metric.
    fn clear_all(&self) -> MetricsResult<()>;
}
