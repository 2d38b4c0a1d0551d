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

/// A unit of work posted to a [`Dispatcher`].
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// A single serialized execution context.
///
/// Tasks posted to a dispatcher run one at a time, in posting order, possibly
/// later and on a different thread than the one that posted them. Load jobs
/// deliver every result through a dispatcher so that delivery never
/// interleaves with itself.
pub trait Dispatcher: Send + Sync {
    /// Schedules `task` to run on the dispatcher context.
    fn post(&self, task: Task);
}
