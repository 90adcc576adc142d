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

//! Configuration of the content cache.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_DOWNLOAD_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Where the cache lives and how long entries stay valid.
///
/// Every field has a default, so a TOML document only needs the keys it
/// wants to override:
///
/// ```toml
/// root_dir = "/var/cache/avatars"
/// download_ttl_secs = 86400
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentCacheConfig {
    /// The directory holding cached files and the index.
    pub root_dir: PathBuf,
    /// The index file name, relative to `root_dir`.
    pub index_file_name: String,
    /// Lifetime of uploaded entries. `None` never expires.
    pub upload_ttl_secs: Option<u64>,
    /// Lifetime of downloaded entries. `None` never expires.
    pub download_ttl_secs: Option<u64>,
    /// Minimum spacing between opportunistic expiry sweeps.
    pub sweep_interval_secs: u64,
}

impl Default for ContentCacheConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("./.ava_cache"),
            index_file_name: "cache_index.bin".to_string(),
            upload_ttl_secs: None,
            download_ttl_secs: Some(DEFAULT_DOWNLOAD_TTL_SECS),
            sweep_interval_secs: 300,
        }
    }
}

impl ContentCacheConfig {
    /// Parses a config from a TOML document.
    pub fn from_toml_str(document: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(document)?)
    }

    /// Loads a config from a TOML file. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(document) => Self::from_toml_str(&document),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!(
                    "No cache config at '{}', using defaults.",
                    path.display()
                );
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Returns a copy rooted at `root_dir`.
    pub fn with_root_dir(mut self, root_dir: impl Into<PathBuf>) -> Self {
        self.root_dir = root_dir.into();
        self
    }

    /// The full path of the index file.
    pub fn index_path(&self) -> PathBuf {
        self.root_dir.join(&self.index_file_name)
    }

    /// Lifetime of uploaded entries.
    pub fn upload_ttl(&self) -> Option<Duration> {
        self.upload_ttl_secs.map(Duration::from_secs)
    }

    /// Lifetime of downloaded entries.
    pub fn download_ttl(&self) -> Option<Duration> {
        self.download_ttl_secs.map(Duration::from_secs)
    }

    /// Minimum spacing between opportunistic sweeps.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_document_keeps_defaults() {
        let config = ContentCacheConfig::from_toml_str(
            r#"
            root_dir = "/tmp/avatars"
            upload_ttl_secs = 60
            "#,
        )
        .expect("Config should parse");

        assert_eq!(config.root_dir, PathBuf::from("/tmp/avatars"));
        assert_eq!(config.upload_ttl(), Some(Duration::from_secs(60)));
        assert_eq!(config.download_ttl(), Some(Duration::from_secs(DEFAULT_DOWNLOAD_TTL_SECS)));
        assert_eq!(config.index_path(), PathBuf::from("/tmp/avatars/cache_index.bin"));
    }

    #[test]
    fn test_invalid_document_is_an_error() {
        let result = ContentCacheConfig::from_toml_str("sweep_interval_secs = \"often\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config = ContentCacheConfig::load(dir.path().join("absent.toml"))
            .expect("Missing file should not be an error");
        assert_eq!(config, ContentCacheConfig::default());
    }

    #[test]
    fn test_load_reads_file() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("cache.toml");
        std::fs::write(&path, "index_file_name = \"idx.bin\"\nsweep_interval_secs = 0\n")
            .expect("Failed to write config");

        let config = ContentCacheConfig::load(&path).expect("Config should load");
        assert_eq!(config.index_file_name, "idx.bin");
        assert_eq!(config.sweep_interval(), Duration::ZERO);
    }
}
