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

//! Abstract definitions for load metrics.

use std::fmt::{self, Display};
use std::time::Instant;

/// Identifies a metric by namespace and name, e.g. `loading:requests_total`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetricId {
    /// The subsystem reporting the metric (e.g., "loading").
    pub namespace: String,
    /// The metric name within the namespace.
    pub name: String,
}

impl MetricId {
    /// Creates a new `MetricId`.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.name)
    }
}

/// The kind of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    /// Monotonic total (e.g., requests served).
    Counter,
    /// Value that moves both ways (e.g., jobs currently in flight).
    Gauge,
}

/// The current value of a metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    /// Value of a counter.
    Counter(u64),
    /// Value of a gauge.
    Gauge(f64),
}

impl MetricValue {
    /// Returns the [`MetricType`] matching this value.
    pub fn metric_type(&self) -> MetricType {
        match self {
            MetricValue::Counter(_) => MetricType::Counter,
            MetricValue::Gauge(_) => MetricType::Gauge,
        }
    }

    /// Returns the value if this is a counter.
    pub fn as_counter(&self) -> Option<u64> {
        match self {
            MetricValue::Counter(v) => Some(*v),
            MetricValue::Gauge(_) => None,
        }
    }

    /// Returns the value if this is a gauge.
    pub fn as_gauge(&self) -> Option<f64> {
        match self {
            MetricValue::Gauge(v) => Some(*v),
            MetricValue::Counter(_) => None,
        }
    }
}

/// A stored metric: its value plus descriptive metadata.
#[derive(Debug, Clone)]
pub struct Metric {
    /// The metric's identifier.
    pub id: MetricId,
    /// What the metric measures.
    pub description: String,
    /// Unit of the value ("count" for counters).
    pub unit: String,
    /// The current value.
    pub value: MetricValue,
    /// When the value last changed.
    pub last_updated: Instant,
}

impl Metric {
    /// Creates a counter starting at zero.
    pub fn new_counter(id: MetricId, description: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
            unit: "count".to_string(),
            value: MetricValue::Counter(0),
            last_updated: Instant::now(),
        }
    }

    /// Creates a gauge starting at zero.
    pub fn new_gauge(id: MetricId, description: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
            unit: unit.into(),
            value: MetricValue::Gauge(0.0),
            last_updated: Instant::now(),
        }
    }

    /// Returns the type of the metric.
    pub fn metric_type(&self) -> MetricType {
        self.value.metric_type()
    }
}

/// A specialized `Result` type for metric operations.
pub type MetricsResult<T> = Result<T, MetricsError>;

/// An error that can occur within the metrics system.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricsError {
    /// No metric is registered under this id.
    MetricNotFound(MetricId),
    /// A metric with this id is already registered with another type.
    AlreadyRegistered(MetricId),
    /// The operation does not apply to the metric's type.
    TypeMismatch {
        /// The type the operation expected.
        expected: MetricType,
        /// The type actually stored.
        found: MetricType,
    },
    /// The storage backend failed.
    StorageError(String),
}

impl Display for MetricsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricsError::MetricNotFound(id) => write!(f, "Metric not found: {id}"),
            MetricsError::AlreadyRegistered(id) => {
                write!(f, "Metric already registered with another type: {id}")
            }
            MetricsError::TypeMismatch { expected, found } => {
                write!(f, "Type mismatch: expected {expected:?}, found {found:?}")
            }
            MetricsError::StorageError(msg) => write!(f, "Storage error: {msg}"),
        }
    }
}

impl std::error::Error for MetricsError {}
