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

//! Provides the contracts for reporting faults and cache activity.
//!
//! This module defines the "what" of telemetry: the events the transfer layer
//! emits and the sink trait they are delivered through. `ava-telemetry`
//! provides the concrete sinks, and the host decides where events end up
//! (crash reporter, analytics, or just the log).

use std::fmt;

/// The direction of a content transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferOperation {
    /// Bytes moving from the local cache to remote storage.
    Upload,
    /// Bytes moving from remote storage to the local cache.
    Download,
}

impl fmt::Display for TransferOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferOperation::Upload => f.write_str("upload"),
            TransferOperation::Download => f.write_str("download"),
        }
    }
}

/// A telemetry event produced by the resource core.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryEvent {
    /// A network or I/O failure during a transfer, already converted into the
    /// operation's negative result.
    TransferFault {
        /// The direction of the failed transfer.
        operation: TransferOperation,
        /// The remote path or identifier involved.
        target: String,
        /// The rendered error chain.
        message: String,
    },
    /// A probe found nothing or failed, and the caller fell back to the
    /// unqualified key.
    ResolutionMiss {
        /// The key that was probed.
        key: String,
        /// Why the probe missed.
        reason: String,
    },
    /// An expiry sweep removed entries from the cache index.
    CacheSwept {
        /// The number of evicted entries.
        evicted: usize,
    },
}

/// A destination for [`TelemetryEvent`]s.
///
/// Reporting must never fail or block the caller: sinks swallow their own
/// delivery errors.
pub trait TelemetrySink: Send + Sync {
    /// Delivers one event.
    fn report(&self, event: TelemetryEvent);
}
