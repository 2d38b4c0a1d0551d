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

use crate::dispatcher::DEFAULT_DISPATCHER_THREAD;
use crate::error::ConfigError;
use serde::Deserialize;
use std::path::Path;

/// Configuration for the [`LoadEngine`](crate::LoadEngine).
///
/// Every field is optional in a RON file; missing fields keep their default.
///
/// ```ron
/// (
///     worker_threads: 2,
///     memory_cache_capacity: 128,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of threads running decodes.
    pub worker_threads: usize,
    /// Maximum number of resources kept in the memory cache.
    pub memory_cache_capacity: usize,
    /// Maximum number of reclaimed payloads kept for reuse.
    /// Zero disables pooling.
    pub pool_capacity: usize,
    /// Name of the delivery thread, when the engine owns one.
    pub dispatcher_thread_name: String,
    /// Whether load counters are recorded.
    pub metrics_enabled: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_threads: std::thread::available_parallelism()
                .map(|n| n.get().min(4))
                .unwrap_or(2),
            memory_cache_capacity: 64,
            pool_capacity: 16,
            dispatcher_thread_name: DEFAULT_DISPATCHER_THREAD.to_string(),
            metrics_enabled: true,
        }
    }
}

impl EngineConfig {
    /// Parses and validates a configuration written in RON.
    pub fn from_ron_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates a RON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Loaded engine config from '{}'.", path.display());
        Self::from_ron_str(&source)
    }

    /// Rejects values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_threads == 0 {
            return Err(ConfigError::Zero {
                field: "worker_threads",
            });
        }
        if self.memory_cache_capacity == 0 {
            return Err(ConfigError::Zero {
                field: "memory_cache_capacity",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.worker_threads >= 1);
        assert_eq!(config.dispatcher_thread_name, DEFAULT_DISPATCHER_THREAD);
    }

    #[test]
    fn test_partial_ron_keeps_defaults() {
        let config = EngineConfig::from_ron_str("(worker_threads: 3, metrics_enabled: false)").unwrap();
        assert_eq!(config.worker_threads, 3);
        assert!(!config.metrics_enabled);
        assert_eq!(config.memory_cache_capacity, EngineConfig::default().memory_cache_capacity);
    }

    #[test]
    fn test_zero_workers_is_rejected() {
        let err = EngineConfig::from_ron_str("(worker_threads: 0)").unwrap_err();
        assert!(matches!(err, ConfigError::Zero { field: "worker_threads" }));
    }

    #[test]
    fn test_zero_cache_capacity_is_rejected() {
        let err = EngineConfig::from_ron_str("(memory_cache_capacity: 0)").unwrap_err();
        assert!(matches!(err, ConfigError::Zero { field: "memory_cache_capacity" }));
    }

    #[test]
    fn test_malformed_ron_is_a_parse_error() {
        let err = EngineConfig::from_ron_str("(worker_threads: \"many\")").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
