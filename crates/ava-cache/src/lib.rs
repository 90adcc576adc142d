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

#![warn(missing_docs)]

//! A disk-backed cache for user-generated binary payloads.
//!
//! [`ContentCache`] moves opaque bytes to and from remote storage through a
//! [`Transport`], keeping an identifier-to-local-file index with expiry.
//! Uploads to the same remote path supersede each other, and concurrent
//! downloads to the same destination share a single transfer.

mod cache;
pub mod config;
pub mod error;
mod fs;
pub mod index;
pub mod transport;

pub use cache::{ContentCache, DownloadResult, UploadStatus};
pub use config::ContentCacheConfig;
pub use error::{CacheIndexError, ConfigError, TransferError, TransportError};
pub use index::{CacheEntry, CacheIndex, Expiry};
#[cfg(feature = "http")]
pub use transport::HttpTransport;
pub use transport::{MemoryTransport, Transport};
