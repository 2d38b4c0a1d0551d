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

use std::fmt;
use std::sync::Arc;

/// The failure of a load, shared by every consumer of the job.
///
/// A single producer error fans out to many consumers, so the error is
/// reference-counted and cheap to clone. The original error, with its whole
/// context chain, stays reachable through [`inner`](Self::inner).
#[derive(Clone)]
pub struct LoadError {
    inner: Arc<anyhow::Error>,
}

impl LoadError {
    /// Wraps any error reported by a producer.
    pub fn new(error: impl Into<anyhow::Error>) -> Self {
        Self {
            inner: Arc::new(error.into()),
        }
    }

    /// Creates an error from a plain message.
    pub fn msg(message: impl fmt::Display + fmt::Debug + Send + Sync + 'static) -> Self {
        Self::new(anyhow::Error::msg(message))
    }

    /// Returns the underlying error.
    pub fn inner(&self) -> &anyhow::Error {
        &self.inner
    }

    /// Returns `true` if both values come from the same producer failure.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#}", self.inner)
    }
}

impl fmt::Debug for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.inner, f)
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner.source()
    }
}
