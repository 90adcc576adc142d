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

use super::Transport;
use crate::error::TransportError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use uuid::Uuid;

/// An in-process [`Transport`] for tests and offline tools.
///
/// Counts calls, can add a fixed latency to every call, and can be told to
/// fail puts or gets.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    latency: Option<Duration>,
    puts: AtomicUsize,
    gets: AtomicUsize,
    fail_puts: AtomicBool,
    fail_gets: AtomicBool,
}

impl MemoryTransport {
    /// Creates an empty transport with no latency.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every call by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Stores a payload directly, as if another client had uploaded it.
    pub fn seed(&self, identifier: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.objects().insert(identifier.into(), bytes.into());
    }

    /// Makes subsequent puts fail, or succeed again.
    pub fn set_fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    /// Makes subsequent gets fail, or succeed again.
    pub fn set_fail_gets(&self, fail: bool) {
        self.fail_gets.store(fail, Ordering::SeqCst);
    }

    /// The number of puts started so far.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// The number of gets started so far.
    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    /// Whether a payload is stored under `identifier`.
    pub fn contains(&self, identifier: &str) -> bool {
        self.objects().contains_key(identifier)
    }

    fn objects(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.objects.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn put(&self, remote_path: &str, bytes: &[u8]) -> Result<String, TransportError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(TransportError::Network {
                target: remote_path.to_string(),
                reason: "simulated put failure".to_string(),
            });
        }

        let identifier = format!("{remote_path}#{}", Uuid::new_v4().simple());
        self.objects().insert(identifier.clone(), bytes.to_vec());
        Ok(identifier)
    }

    async fn get(&self, identifier: &str) -> Result<Vec<u8>, TransportError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(TransportError::Network {
                target: identifier.to_string(),
                reason: "simulated get failure".to_string(),
            });
        }

        self.objects()
            .get(identifier)
            .cloned()
            .ok_or_else(|| TransportError::NotFound(identifier.to_string()))
    }
}
