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

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Namespace used to derive every request fingerprint.
const FINGERPRINT_NAMESPACE: Uuid = Uuid::from_u128(0x6b686f72_615f_6c6f_6164_5f6a6f627321);

/// An opaque identifier for one exact load request.
///
/// Two requests with equal fingerprints are interchangeable: they decode the
/// same source at the same target size with the same transformation, so a
/// single in-flight decode can serve both.
///
/// The value is a name-based (version 5) UUID, so it is deterministic across
/// runs and processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(Uuid);

impl Fingerprint {
    /// Derives the fingerprint of a request from its components.
    ///
    /// # Arguments
    /// * `source` - Identifier of the raw data (path, URL, content id...).
    /// * `width` / `height` - The target dimensions of the decoded resource.
    /// * `transformation` - Identifier of the transformation applied after decode.
    pub fn new(source: &str, width: u32, height: u32, transformation: &str) -> Self {
        // Lengths prefix the variable-size parts so ("ab", "c") and ("a", "bc")
        // never collide.
        let mut name = Vec::with_capacity(source.len() + transformation.len() + 24);
        name.extend_from_slice(&(source.len() as u64).to_le_bytes());
        name.extend_from_slice(source.as_bytes());
        name.extend_from_slice(&width.to_le_bytes());
        name.extend_from_slice(&height.to_le_bytes());
        name.extend_from_slice(&(transformation.len() as u64).to_le_bytes());
        name.extend_from_slice(transformation.as_bytes());
        Self(Uuid::new_v5(&FINGERPRINT_NAMESPACE, &name))
    }

    /// Derives the fingerprint of an untransformed request for `source`
    /// at its original size.
    pub fn of_source(source: &str) -> Self {
        Self::new(source, 0, 0, "")
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}
