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

//! Error types reported by the external capabilities.

use super::ResourceType;
use thiserror::Error;

/// A failure of the location-probing capability.
///
/// Probe failures are resolution misses: callers always recover from them by
/// falling back to an unqualified key, never by surfacing the error.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The key is unknown to the content catalog.
    #[error("no locations registered for key '{0}'")]
    UnknownKey(String),
    /// The probe itself could not complete.
    #[error("probe for key '{key}' failed: {reason}")]
    Failed {
        /// The key that was being probed.
        key: String,
        /// A description of the failure.
        reason: String,
    },
}

/// A failure of the materialization capability.
#[derive(Debug, Error)]
pub enum MaterializeError {
    /// No materializer is able to produce resources of this type.
    #[error("no materializer registered for resource type '{0}'")]
    UnsupportedType(ResourceType),
    /// The content at the physical path could not be turned into a resource.
    #[error("failed to materialize '{path}': {reason}")]
    Failed {
        /// The physical path that was read.
        path: String,
        /// A description of the failure.
        reason: String,
    },
}
