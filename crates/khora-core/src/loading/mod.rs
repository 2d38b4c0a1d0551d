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

//! Contracts between a load job and the collaborators around it.
//!
//! A load job coalesces every request for one key while the decode is in
//! flight. It talks to four collaborators, all declared here:
//! - [`ResourceCallback`]: a consumer waiting for the result.
//! - [`JobListener`]: the registry owning the job, told when the job retires.
//! - [`MemoryCache`]: where successful results may be retained for reuse.
//! - [`Dispatcher`]: the single serialized context on which results are delivered.

mod dispatcher;
mod error;

pub use dispatcher::*;
pub use error::*;

use crate::asset::{Asset, Resource};
use std::fmt::Debug;
use std::hash::Hash;

/// The requirements on a key identifying a load job.
///
/// Implemented automatically for every type that satisfies the bounds, such
/// as [`Fingerprint`](crate::asset::Fingerprint), `String`, or integer ids.
pub trait JobKey: Eq + Hash + Clone + Debug + Send + Sync + 'static {}

impl<K> JobKey for K where K: Eq + Hash + Clone + Debug + Send + Sync + 'static {}

/// A consumer waiting for the outcome of a load.
///
/// Exactly one of the two methods is called, at most once, on the dispatcher
/// context.
pub trait ResourceCallback<T: Asset>: Send + Sync {
    /// Called with a resource on which one acquisition was taken on behalf of
    /// this consumer. The consumer owns that acquisition and must `release`
    /// it when done.
    fn on_resource_ready(&self, resource: Resource<T>);

    /// Called when the load failed.
    fn on_exception(&self, error: &LoadError);
}

/// The owner of a set of active jobs, told when one of them retires.
///
/// Each job calls exactly one of these methods, exactly once.
pub trait JobListener<K: JobKey>: Send + Sync {
    /// The job for `key` produced a result or a failure.
    fn on_job_complete(&self, key: &K);

    /// The job for `key` was cancelled before completing.
    fn on_job_cancelled(&self, key: &K);
}

/// An in-memory cache that can retain successful resources.
pub trait MemoryCache<K: JobKey, T: Asset>: Send + Sync {
    /// Stores `resource` under `key`.
    ///
    /// The caller has already taken one acquisition on behalf of the cache;
    /// the cache owns it from now on and releases it on eviction, removal,
    /// or replacement.
    fn put(&self, key: K, resource: Resource<T>);
}
