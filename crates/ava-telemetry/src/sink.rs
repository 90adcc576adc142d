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

//! Concrete [`TelemetrySink`] implementations.

use ava_core::telemetry::{TelemetryEvent, TelemetrySink};

/// A sink that writes every event to the log and nothing else.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl TelemetrySink for LogSink {
    fn report(&self, event: TelemetryEvent) {
        match event {
            TelemetryEvent::TransferFault {
                operation,
                target,
                message,
            } => log::error!("Transfer fault during {operation} of '{target}': {message}"),
            TelemetryEvent::ResolutionMiss { key, reason } => {
                log::debug!("Resolution of '{key}' missed: {reason}")
            }
            TelemetryEvent::CacheSwept { evicted } => {
                log::debug!("Cache sweep evicted {evicted} expired entries.")
            }
        }
    }
}

/// A sink that forwards events over an unbounded channel.
///
/// The host drains the receiving end and routes events to its crash reporter
/// or analytics pipeline. Events are also logged at trace level.
#[derive(Debug)]
pub struct ChannelSink {
    sender: flume::Sender<TelemetryEvent>,
    receiver: flume::Receiver<TelemetryEvent>,
}

impl ChannelSink {
    /// Creates a sink with an unbounded channel.
    pub fn new() -> Self {
        let (sender, receiver) = flume::unbounded();
        Self { sender, receiver }
    }

    /// Returns a clone of the sending end, for producers outside the sink.
    pub fn sender(&self) -> flume::Sender<TelemetryEvent> {
        self.sender.clone()
    }

    /// Returns the receiving end, for the owner of the sink.
    pub fn receiver(&self) -> &flume::Receiver<TelemetryEvent> {
        &self.receiver
    }

    /// Takes every event currently queued, without blocking.
    pub fn drain(&self) -> Vec<TelemetryEvent> {
        self.receiver.try_iter().collect()
    }
}

impl Default for ChannelSink {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetrySink for ChannelSink {
    fn report(&self, event: TelemetryEvent) {
        log::trace!("Forwarding telemetry event: {event:?}");

        if let Err(e) = self.sender.send(event) {
            log::error!("Failed to forward telemetry event: {e}. Receiver likely disconnected.");
        }
    }
}
