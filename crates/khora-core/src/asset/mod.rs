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

//! Primitive types for decoded assets.
//!
//! This module defines the "common language" for the artifacts that travel
//! through the load coordination layer:
//! - The [`Asset`] trait: a marker for every type a decode can produce.
//! - [`Fingerprint`]: the stable identifier of one exact load request.
//! - [`Resource`]: the reference-counted handle shared by every holder of a
//!   decoded asset, with an explicit `acquire`/`release` contract.

mod fingerprint;
mod resource;

pub use fingerprint::*;
pub use resource::*;

/// A marker trait for types that can be produced by a decode and shared
/// through a [`Resource`].
///
/// - `Send` + `Sync`: decoded assets are produced on worker threads and
///   delivered on the dispatcher thread.
/// - `'static`: the asset may outlive the request that produced it, for
///   instance while it sits in the memory cache.
///
/// # Examples
///
/// ```
/// use khora_core::asset::Asset;
///
/// struct Bitmap {
///     pixels: Vec<u8>,
/// }
///
/// impl Asset for Bitmap {}
/// ```
pub trait Asset: Send + Sync + 'static {}

impl Asset for Vec<u8> {}
impl Asset for String {}
