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

use khora_core::telemetry::MetricsError;
use std::path::PathBuf;
use thiserror::Error;

/// An error raised while reading or validating an [`EngineConfig`](crate::EngineConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file '{}': {source}", path.display())]
    Io {
        /// The file that was being read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The configuration is not valid RON.
    #[error("failed to parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),
    /// A field that must be positive is zero.
    #[error("'{field}' must be greater than zero")]
    Zero {
        /// The offending field.
        field: &'static str,
    },
}

/// An error raised by the [`LoadEngine`](crate::LoadEngine) or its threads.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine configuration was rejected.
    #[error("invalid engine configuration: {0}")]
    Config(#[from] ConfigError),
    /// A worker or dispatcher thread could not be started.
    #[error("failed to spawn thread '{name}': {source}")]
    Spawn {
        /// The name given to the thread.
        name: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Work was submitted after the named component was shut down.
    #[error("{0} has been shut down")]
    ShutDown(&'static str),
    /// The loading metrics could not be registered.
    #[error("failed to register loading metrics: {0}")]
    Metrics(#[from] MetricsError),
}
