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

//! Error types for the transfer layer.

use std::path::PathBuf;
use thiserror::Error;

/// A failure reported by a [`Transport`](crate::Transport).
#[derive(Debug, Error)]
pub enum TransportError {
    /// The remote answered with a non-success status.
    #[error("remote returned status {status} for '{target}'")]
    Status {
        /// The remote path or identifier.
        target: String,
        /// The status code.
        status: u16,
    },
    /// The request never completed.
    #[error("network failure for '{target}': {reason}")]
    Network {
        /// The remote path or identifier.
        target: String,
        /// A description of the failure.
        reason: String,
    },
    /// Nothing is stored under the identifier.
    #[error("no content stored under '{0}'")]
    NotFound(String),
}

/// A failed upload or download, as reported to the telemetry sink.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The transport failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// A local cache file could not be read or written.
    #[error("cache file I/O failed for '{}': {source}", path.display())]
    Io {
        /// The local file involved.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// A failure to persist or restore the cache index.
#[derive(Debug, Error)]
pub enum CacheIndexError {
    /// The index file could not be read or written.
    #[error("index file I/O failed for '{}': {source}", path.display())]
    Io {
        /// The index file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The index could not be encoded.
    #[error("failed to encode cache index: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    /// The index file is not a valid encoded index.
    #[error("failed to decode cache index: {0}")]
    Decode(#[from] bincode::error::DecodeError),
    /// The index decoded but left unread bytes behind.
    #[error("cache index has {0} trailing bytes")]
    TrailingBytes(usize),
}

/// A failure to load a [`ContentCacheConfig`](crate::ContentCacheConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("failed to read config '{}': {source}", path.display())]
    Io {
        /// The config file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The document is not valid TOML for the config.
    #[error("invalid cache config: {0}")]
    Parse(#[from] toml::de::Error),
}
