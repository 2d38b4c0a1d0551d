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

//! Logging bootstrap.
//!
//! Every crate logs through the `log` facade. Binaries call [`init`] once at
//! startup; `RUST_LOG` overrides the default filter.

use env_logger::{Builder, Env};

/// The filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "info";

/// Installs `env_logger` with [`DEFAULT_FILTER`].
///
/// Returns `false` if a logger was already installed (e.g. by another test).
pub fn init() -> bool {
    init_with_filter(DEFAULT_FILTER)
}

/// Installs `env_logger`, falling back to `default_filter` when `RUST_LOG`
/// is not set.
pub fn init_with_filter(default_filter: &str) -> bool {
    Builder::from_env(Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .try_init()
        .is_ok()
}
