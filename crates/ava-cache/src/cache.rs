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

use crate::config::ContentCacheConfig;
use crate::error::{CacheIndexError, TransferError};
use crate::fs::write_atomic;
use crate::index::{unix_now, CacheEntry, CacheIndex, Expiry};
use crate::transport::Transport;
use ava_core::telemetry::{TelemetryEvent, TelemetrySink, TransferOperation};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

const UPLOAD_DIR: &str = "uploads";
const DOWNLOAD_DIR: &str = "downloads";

/// The terminal state of an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadStatus {
    /// The payload is stored remotely and cached locally under this
    /// distribution identifier.
    Committed(String),
    /// A newer upload to the same remote path superseded this one.
    Canceled,
    /// The transfer failed. The fault went to the telemetry sink.
    Failed,
}

impl UploadStatus {
    /// The distribution identifier, for committed uploads.
    pub fn identifier(&self) -> Option<&str> {
        match self {
            UploadStatus::Committed(identifier) => Some(identifier.as_str()),
            UploadStatus::Canceled | UploadStatus::Failed => None,
        }
    }
}

/// The outcome of a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    /// Whether the payload is available locally.
    pub was_downloaded: bool,
    /// Where the payload is, when it is available.
    pub local_path: Option<PathBuf>,
}

impl DownloadResult {
    fn available(local_path: PathBuf) -> Self {
        Self {
            was_downloaded: true,
            local_path: Some(local_path),
        }
    }

    fn failed() -> Self {
        Self {
            was_downloaded: false,
            local_path: None,
        }
    }
}

type SharedDownload = Shared<BoxFuture<'static, DownloadResult>>;

struct UploadTicket {
    id: u64,
    token: CancellationToken,
}

struct Inner {
    config: ContentCacheConfig,
    transport: Arc<dyn Transport>,
    sink: Arc<dyn TelemetrySink>,
    index: Mutex<CacheIndex>,
    // Serializes index writes so an older snapshot never lands last.
    persist_lock: tokio::sync::Mutex<()>,
    uploads: Mutex<HashMap<String, UploadTicket>>,
    downloads: Mutex<HashMap<PathBuf, SharedDownload>>,
    next_ticket: AtomicU64,
    last_sweep: AtomicU64,
}

/// A disk-backed cache of remote payloads.
///
/// Cloning is cheap and every clone shares the same index and in-flight
/// transfers. Well-formed calls never return errors: failures are logged,
/// reported to the telemetry sink, and turned into the operation's negative
/// result.
#[derive(Clone)]
pub struct ContentCache {
    inner: Arc<Inner>,
}

impl ContentCache {
    /// Opens the cache rooted at `config.root_dir`.
    ///
    /// A missing or unreadable index starts the cache empty. Expired entries
    /// are swept before the cache is returned.
    ///
    /// # Errors
    /// Returns [`TransferError::Io`] if the root directory cannot be created.
    pub async fn open(
        config: ContentCacheConfig,
        transport: Arc<dyn Transport>,
        sink: Arc<dyn TelemetrySink>,
    ) -> Result<Self, TransferError> {
        tokio::fs::create_dir_all(&config.root_dir)
            .await
            .map_err(|source| TransferError::Io {
                path: config.root_dir.clone(),
                source,
            })?;

        let index = CacheIndex::load(&config.index_path()).await;

        let cache = Self {
            inner: Arc::new(Inner {
                config,
                transport,
                sink,
                index: Mutex::new(index),
                persist_lock: tokio::sync::Mutex::new(()),
                uploads: Mutex::new(HashMap::new()),
                downloads: Mutex::new(HashMap::new()),
                next_ticket: AtomicU64::new(0),
                last_sweep: AtomicU64::new(0),
            }),
        };

        cache.sweep_expired().await;
        log::info!(
            "Content cache opened at '{}' with {} entries.",
            cache.inner.config.root_dir.display(),
            cache.len()
        );

        Ok(cache)
    }

    /// The configuration the cache was opened with.
    pub fn config(&self) -> &ContentCacheConfig {
        &self.inner.config
    }

    /// Uploads `bytes` to `remote_path`.
    ///
    /// A newer upload to the same remote path cancels this one, which then
    /// resolves as [`UploadStatus::Canceled`]. On success the payload is
    /// written to a local cache file before the index learns about it.
    pub async fn upload(&self, remote_path: &str, bytes: &[u8]) -> UploadStatus {
        if remote_path.is_empty() {
            log::error!("upload called with an empty remote path.");
            return UploadStatus::Failed;
        }

        // Claim the ticket before the first await.
        let (ticket, token) = self.inner.begin_upload(remote_path);
        self.inner.maybe_sweep().await;

        let transfer = async {
            let identifier = self.inner.transport.put(remote_path, bytes).await?;
            let local_path = self.inner.write_upload(&identifier, bytes).await?;
            Ok::<_, TransferError>((identifier, local_path))
        };
        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            result = transfer => Some(result),
        };

        let status = match outcome {
            Some(Ok((identifier, local_path))) => {
                if self
                    .inner
                    .register_upload(remote_path, ticket, &identifier, local_path)
                {
                    self.inner.persist().await;
                    log::info!("Upload #{ticket} to '{remote_path}' committed as '{identifier}'.");
                    UploadStatus::Committed(identifier)
                } else {
                    log::info!("Upload #{ticket} to '{remote_path}' was superseded.");
                    UploadStatus::Canceled
                }
            }
            None => {
                log::info!("Upload #{ticket} to '{remote_path}' was superseded.");
                UploadStatus::Canceled
            }
            Some(Err(e)) => {
                self.inner
                    .report_fault(TransferOperation::Upload, remote_path, &e);
                UploadStatus::Failed
            }
        };

        self.inner.finish_upload(remote_path, ticket);
        status
    }

    /// Uploads the contents of a local file to `remote_path`.
    pub async fn upload_file(&self, remote_path: &str, path: impl AsRef<Path>) -> UploadStatus {
        let path = path.as_ref();
        match tokio::fs::read(path).await {
            Ok(bytes) => self.upload(remote_path, &bytes).await,
            Err(source) => {
                let error = TransferError::Io {
                    path: path.to_path_buf(),
                    source,
                };
                self.inner
                    .report_fault(TransferOperation::Upload, remote_path, &error);
                UploadStatus::Failed
            }
        }
    }

    /// Makes the payload stored under `identifier` available locally as
    /// `destination_name` inside the cache's download directory.
    ///
    /// A valid cache entry short-circuits without touching the network and
    /// returns the cached path. Concurrent calls for the same destination
    /// share one transfer and observe the same result.
    pub async fn download(&self, identifier: &str, destination_name: &str) -> DownloadResult {
        if identifier.is_empty() || destination_name.is_empty() {
            log::error!("download called with an empty identifier or destination.");
            return DownloadResult::failed();
        }

        if !is_plain_file_name(destination_name) {
            log::error!("download destination '{destination_name}' is not a plain file name.");
            return DownloadResult::failed();
        }

        self.inner.maybe_sweep().await;

        if let Some(cached) = self.inner.fresh_local_path(identifier).await {
            log::debug!("Cache hit for '{identifier}'.");
            return DownloadResult::available(cached);
        }

        let destination = self
            .inner
            .config
            .root_dir
            .join(DOWNLOAD_DIR)
            .join(destination_name);

        let pending = {
            let mut downloads = self.inner.downloads();
            match downloads.get(&destination) {
                Some(in_flight) => {
                    log::debug!("Joining in-flight download to '{}'.", destination.display());
                    in_flight.clone()
                }
                None => {
                    let fetch = self
                        .inner
                        .clone()
                        .fetch(identifier.to_string(), destination.clone())
                        .boxed()
                        .shared();
                    downloads.insert(destination, fetch.clone());
                    fetch
                }
            }
        };

        pending.await
    }

    /// Forgets `identifier`. The local file is left in place.
    ///
    /// Returns `true` if an entry was removed.
    pub async fn delete(&self, identifier: &str) -> bool {
        let removed = self.inner.index().remove(identifier).is_some();
        if removed {
            log::debug!("Removed cache entry '{identifier}'.");
            self.inner.persist().await;
        }
        removed
    }

    /// Evicts every expired entry and returns how many went.
    pub async fn sweep_expired(&self) -> usize {
        let now = unix_now();
        self.inner.last_sweep.store(now, Ordering::SeqCst);
        self.inner.sweep(now).await
    }

    /// The local file for `identifier`, if it is cached, unexpired, and
    /// still on disk.
    pub async fn local_path(&self, identifier: &str) -> Option<PathBuf> {
        self.inner.fresh_local_path(identifier).await
    }

    /// The number of index entries.
    pub fn len(&self) -> usize {
        self.inner.index().len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.index().is_empty()
    }
}

impl Inner {
    fn index(&self) -> MutexGuard<'_, CacheIndex> {
        self.index.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn uploads(&self) -> MutexGuard<'_, HashMap<String, UploadTicket>> {
        self.uploads.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn downloads(&self) -> MutexGuard<'_, HashMap<PathBuf, SharedDownload>> {
        self.downloads.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin_upload(&self, remote_path: &str) -> (u64, CancellationToken) {
        let id = self.next_ticket.fetch_add(1, Ordering::SeqCst);
        let token = CancellationToken::new();

        let previous = self.uploads().insert(
            remote_path.to_string(),
            UploadTicket {
                id,
                token: token.clone(),
            },
        );
        if let Some(previous) = previous {
            log::debug!(
                "Upload #{id} to '{remote_path}' supersedes upload #{}.",
                previous.id
            );
            previous.token.cancel();
        }

        (id, token)
    }

    fn finish_upload(&self, remote_path: &str, id: u64) {
        let mut uploads = self.uploads();
        if uploads.get(remote_path).is_some_and(|ticket| ticket.id == id) {
            uploads.remove(remote_path);
        }
    }

    async fn write_upload(&self, identifier: &str, bytes: &[u8]) -> Result<PathBuf, TransferError> {
        let file_name = Uuid::new_v5(&Uuid::NAMESPACE_URL, identifier.as_bytes()).simple();
        let local_path = self
            .config
            .root_dir
            .join(UPLOAD_DIR)
            .join(format!("{file_name}.bin"));

        write_atomic(&local_path, bytes)
            .await
            .map_err(|source| TransferError::Io {
                path: local_path.clone(),
                source,
            })?;
        Ok(local_path)
    }

    /// Records a finished upload, unless a newer upload to the same remote
    /// path has taken over its ticket.
    fn register_upload(
        &self,
        remote_path: &str,
        id: u64,
        identifier: &str,
        local_path: PathBuf,
    ) -> bool {
        let uploads = self.uploads();
        let current = uploads
            .get(remote_path)
            .is_some_and(|ticket| ticket.id == id && !ticket.token.is_cancelled());
        if !current {
            return false;
        }

        let entry = CacheEntry {
            local_path,
            expiry: Expiry::after(self.config.upload_ttl(), unix_now()),
        };
        self.index().insert(identifier, entry);
        true
    }

    async fn fetch(self: Arc<Self>, identifier: String, destination: PathBuf) -> DownloadResult {
        let outcome = self.fetch_into(&identifier, &destination).await;
        self.downloads().remove(&destination);

        match outcome {
            Ok(()) => {
                log::info!(
                    "Downloaded '{identifier}' to '{}'.",
                    destination.display()
                );
                DownloadResult::available(destination)
            }
            Err(e) => {
                self.report_fault(TransferOperation::Download, &identifier, &e);
                DownloadResult::failed()
            }
        }
    }

    async fn fetch_into(&self, identifier: &str, destination: &Path) -> Result<(), TransferError> {
        let bytes = self.transport.get(identifier).await?;

        write_atomic(destination, &bytes)
            .await
            .map_err(|source| TransferError::Io {
                path: destination.to_path_buf(),
                source,
            })?;

        self.register(
            identifier,
            destination.to_path_buf(),
            self.config.download_ttl(),
        )
        .await;
        Ok(())
    }

    async fn register(&self, identifier: &str, local_path: PathBuf, ttl: Option<Duration>) {
        let entry = CacheEntry {
            local_path,
            expiry: Expiry::after(ttl, unix_now()),
        };
        self.index().insert(identifier, entry);
        self.persist().await;
    }

    async fn fresh_local_path(&self, identifier: &str) -> Option<PathBuf> {
        let candidate = {
            let index = self.index();
            index.lookup(identifier, unix_now())?.local_path.clone()
        };

        match tokio::fs::metadata(&candidate).await {
            Ok(metadata) if metadata.is_file() => Some(candidate),
            _ => {
                log::debug!(
                    "Cache entry '{identifier}' points at missing file '{}'.",
                    candidate.display()
                );
                None
            }
        }
    }

    async fn maybe_sweep(&self) {
        let now = unix_now();
        let last = self.last_sweep.load(Ordering::SeqCst);
        if now.saturating_sub(last) < self.config.sweep_interval_secs {
            return;
        }
        // Only the caller that claims this interval sweeps.
        if self
            .last_sweep
            .compare_exchange(last, now, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        self.sweep(now).await;
    }

    async fn sweep(&self, now: u64) -> usize {
        let evicted = self.index().sweep(now);
        if evicted > 0 {
            log::info!("Evicted {evicted} expired cache entries.");
            self.sink.report(TelemetryEvent::CacheSwept { evicted });
            self.persist().await;
        }
        evicted
    }

    async fn persist(&self) {
        let _guard = self.persist_lock.lock().await;

        let path = self.config.index_path();
        let encoded = self.index().encode();
        let result = match encoded {
            Ok(bytes) => write_atomic(&path, &bytes)
                .await
                .map_err(|source| CacheIndexError::Io {
                    path: path.clone(),
                    source,
                }),
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            log::warn!("Failed to persist the cache index: {e}");
        }
    }

    fn report_fault(&self, operation: TransferOperation, target: &str, error: &TransferError) {
        log::error!("The {operation} of '{target}' failed: {error}");
        self.sink.report(TelemetryEvent::TransferFault {
            operation,
            target: target.to_string(),
            message: error.to_string(),
        });
    }
}

/// Download destinations must name a single file inside the download
/// directory.
fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
