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

//! Remote storage access.

#[cfg(feature = "http")]
mod http;
mod memory;

#[cfg(feature = "http")]
pub use http::HttpTransport;
pub use memory::MemoryTransport;

use crate::error::TransportError;
use async_trait::async_trait;

/// Moves opaque payloads to and from remote storage.
///
/// Implementations may run the network call on their own I/O threads, but
/// must resolve the returned futures on the caller's runtime.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Stores `bytes` under the logical `remote_path` and returns the
    /// distribution identifier the payload can later be fetched with.
    async fn put(&self, remote_path: &str, bytes: &[u8]) -> Result<String, TransportError>;

    /// Fetches the payload stored under `identifier`.
    async fn get(&self, identifier: &str) -> Result<Vec<u8>, TransportError>;
}
