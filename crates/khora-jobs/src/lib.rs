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

//! # Khora Jobs
//!
//! Coordinates asynchronous resource loads.
//!
//! - [`EngineJob`] coalesces every consumer of one key into a single load and
//!   distributes its outcome with exact acquire/release accounting.
//! - [`LoadEngine`] owns the active jobs, consults the memory cache, and runs
//!   decodes on [`DecodeWorkers`].
//! - [`ThreadDispatcher`] and [`ManualDispatcher`] are the contexts outcomes
//!   are delivered on.

#![warn(missing_docs)]

mod config;
mod dispatcher;
mod engine;
mod error;
mod job;
mod metrics;
mod worker;

pub use config::EngineConfig;
pub use dispatcher::{ManualDispatcher, ThreadDispatcher, DEFAULT_DISPATCHER_THREAD};
pub use engine::{LoadEngine, LoadHandle, LoadStatus};
pub use error::{ConfigError, EngineError};
pub use job::{EngineJob, JobState};
pub use metrics::{LoadingMetrics, LOADING_NAMESPACE};
pub use worker::DecodeWorkers;
