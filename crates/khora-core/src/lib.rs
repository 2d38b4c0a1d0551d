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

//! # Khora Core
//!
//! Foundational crate containing the keys, resource handles, and interface
//! contracts shared by every crate of the load coordination layer.
//!
//! Nothing in here knows how a resource is decoded, cached, or scheduled.
//! Those concerns live in `khora-data` and `khora-jobs`, which implement the
//! traits declared by [`loading`].

#![warn(missing_docs)]

pub mod asset;
pub mod loading;
pub mod telemetry;

pub use asset::{Asset, Fingerprint, Resource, ResourceError, ResourceRecycler};
pub use loading::{Dispatcher, JobKey, JobListener, LoadError, MemoryCache, ResourceCallback, Task};
