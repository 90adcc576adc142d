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

//! The persisted identifier-to-file index.

use crate::error::CacheIndexError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// When a cache entry stops being valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expiry {
    /// The entry stays valid until it is deleted.
    Never,
    /// The entry expires at this Unix time, in seconds.
    At(u64),
}

impl Expiry {
    /// Returns the expiry `ttl` after `now`, or [`Expiry::Never`] without a
    /// lifetime.
    pub fn after(ttl: Option<Duration>, now: u64) -> Self {
        match ttl {
            Some(ttl) => Expiry::At(now.saturating_add(ttl.as_secs())),
            None => Expiry::Never,
        }
    }

    /// Whether the entry is expired at `now`. An entry expires at its
    /// horizon, not one second after it.
    pub fn is_expired(&self, now: u64) -> bool {
        match self {
            Expiry::Never => false,
            Expiry::At(horizon) => *horizon <= now,
        }
    }
}

/// One cached payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Where the payload is stored locally.
    pub local_path: PathBuf,
    /// When the entry stops being valid.
    pub expiry: Expiry,
}

/// Maps remote distribution identifiers to cached local files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheIndex {
    entries: HashMap<String, CacheEntry>,
}

impl CacheIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `entry` under `identifier`, returning the entry it replaced.
    pub fn insert(&mut self, identifier: impl Into<String>, entry: CacheEntry) -> Option<CacheEntry> {
        self.entries.insert(identifier.into(), entry)
    }

    /// Returns the entry for `identifier`, expired or not.
    pub fn get(&self, identifier: &str) -> Option<&CacheEntry> {
        self.entries.get(identifier)
    }

    /// Returns the entry for `identifier` if it is still valid at `now`.
    pub fn lookup(&self, identifier: &str, now: u64) -> Option<&CacheEntry> {
        self.entries
            .get(identifier)
            .filter(|entry| !entry.expiry.is_expired(now))
    }

    /// Removes the entry for `identifier`.
    pub fn remove(&mut self, identifier: &str) -> Option<CacheEntry> {
        self.entries.remove(identifier)
    }

    /// Evicts every entry expired at `now` and returns how many went.
    pub fn sweep(&mut self, now: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.expiry.is_expired(now));
        before - self.entries.len()
    }

    /// The number of entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Encodes the index for the metadata file.
    pub fn encode(&self) -> Result<Vec<u8>, CacheIndexError> {
        Ok(bincode::serde::encode_to_vec(
            self,
            bincode::config::standard(),
        )?)
    }

    /// Decodes an index produced by [`CacheIndex::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Self, CacheIndexError> {
        let (index, read): (Self, usize) =
            bincode::serde::decode_from_slice(bytes, bincode::config::standard())?;
        if read != bytes.len() {
            return Err(CacheIndexError::TrailingBytes(bytes.len() - read));
        }
        Ok(index)
    }

    /// Reads the index at `path`. A missing or unreadable file yields an
    /// empty index, so a damaged cache never blocks start-up.
    pub async fn load(path: &Path) -> Self {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No cache index at '{}', starting empty.", path.display());
                return Self::default();
            }
            Err(source) => {
                let error = CacheIndexError::Io {
                    path: path.to_path_buf(),
                    source,
                };
                log::warn!("{error}. Starting with an empty cache.");
                return Self::default();
            }
        };

        match Self::decode(&bytes) {
            Ok(index) => {
                log::debug!(
                    "Loaded cache index '{}' with {} entries.",
                    path.display(),
                    index.len()
                );
                index
            }
            Err(e) => {
                log::warn!(
                    "Cache index '{}' is unreadable ({e}). Starting with an empty cache.",
                    path.display()
                );
                Self::default()
            }
        }
    }
}

/// The current Unix time in seconds.
pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}
