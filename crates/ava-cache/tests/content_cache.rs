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

//! Upload, download, and expiry behavior of `ContentCache` over an
//! in-memory transport.

use ava_cache::{
    CacheEntry, CacheIndex, ContentCache, ContentCacheConfig, Expiry, MemoryTransport,
    UploadStatus,
};
use ava_core::telemetry::{TelemetryEvent, TransferOperation};
use ava_telemetry::ChannelSink;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

struct Harness {
    _dir: TempDir,
    config: ContentCacheConfig,
    transport: Arc<MemoryTransport>,
    sink: Arc<ChannelSink>,
    cache: ContentCache,
}

impl Harness {
    async fn new() -> Self {
        Self::with(MemoryTransport::new(), |config| config).await
    }

    async fn with(
        transport: MemoryTransport,
        configure: impl FnOnce(ContentCacheConfig) -> ContentCacheConfig,
    ) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config = configure(ContentCacheConfig::default().with_root_dir(dir.path().join("cache")));
        let transport = Arc::new(transport);
        let sink = Arc::new(ChannelSink::new());
        let cache = ContentCache::open(config.clone(), transport.clone(), sink.clone())
            .await
            .expect("Cache should open");

        Self {
            _dir: dir,
            config,
            transport,
            sink,
            cache,
        }
    }

    async fn reopen(&self) -> ContentCache {
        ContentCache::open(self.config.clone(), self.transport.clone(), self.sink.clone())
            .await
            .expect("Cache should reopen")
    }
}

fn read(path: &Path) -> Vec<u8> {
    std::fs::read(path).expect("Cached file should exist")
}

#[tokio::test]
async fn test_upload_then_download_returns_same_bytes() {
    let h = Harness::new().await;

    let status = h.cache.upload("ugc/outfit.bin", b"outfit bytes").await;
    let identifier = status.identifier().expect("Upload should commit").to_string();

    let result = h.cache.download(&identifier, "outfit.bin").await;
    assert!(result.was_downloaded);
    let local_path = result.local_path.expect("Download should have a path");
    assert_eq!(read(&local_path), b"outfit bytes");
    assert_eq!(h.transport.get_count(), 0, "An uploaded payload is a cache hit");

    // A second device shares the remote store but not the local cache.
    let other = Harness::new().await;
    other.transport.seed(identifier.clone(), b"outfit bytes".to_vec());
    let fetched = other.cache.download(&identifier, "outfit.bin").await;
    assert_eq!(read(&fetched.local_path.expect("Fetched path")), b"outfit bytes");
    assert_eq!(other.transport.get_count(), 1);
}

#[tokio::test]
async fn test_upload_file_reads_local_payload() {
    let h = Harness::new().await;
    let source = h.config.root_dir.join("source.bin");
    std::fs::write(&source, b"from disk").expect("Failed to write source");

    let status = h.cache.upload_file("ugc/disk.bin", &source).await;
    let identifier = status.identifier().expect("Upload should commit");
    let cached = h.cache.local_path(identifier).await.expect("Upload should be cached");
    assert_eq!(read(&cached), b"from disk");

    let missing = h.cache.upload_file("ugc/none.bin", h.config.root_dir.join("absent")).await;
    assert_eq!(missing, UploadStatus::Failed);
}

#[tokio::test]
async fn test_concurrent_downloads_share_one_fetch() {
    let h = Harness::with(
        MemoryTransport::new().with_latency(Duration::from_millis(50)),
        |config| config,
    )
    .await;
    h.transport.seed("remote-id", b"shared".to_vec());

    let (first, second) = tokio::join!(
        h.cache.download("remote-id", "shared.bin"),
        h.cache.download("remote-id", "shared.bin"),
    );

    assert_eq!(h.transport.get_count(), 1);
    assert_eq!(first, second);
    assert!(first.was_downloaded);

    // Now cached: no further network access.
    let third = h.cache.download("remote-id", "shared.bin").await;
    assert_eq!(third, first);
    assert_eq!(h.transport.get_count(), 1);
}

#[tokio::test]
async fn test_newer_upload_supersedes_in_flight_upload() {
    let h = Harness::with(
        MemoryTransport::new().with_latency(Duration::from_millis(50)),
        |config| config,
    )
    .await;

    let (first, second) = tokio::join!(
        h.cache.upload("ugc/avatar.bin", b"old"),
        h.cache.upload("ugc/avatar.bin", b"new"),
    );

    assert_eq!(first, UploadStatus::Canceled);
    let identifier = second.identifier().expect("Second upload should commit");
    assert!(h.transport.contains(identifier));
    let cached = h.cache.local_path(identifier).await.expect("Second upload cached");
    assert_eq!(read(&cached), b"new");
    assert_eq!(h.cache.len(), 1);
}

#[tokio::test]
async fn test_newer_upload_cancels_upload_that_is_writing_locally() {
    // With an instant transport the first upload is already past its remote
    // put and is writing its local copy when the second one starts.
    let h = Harness::new().await;

    let (first, second) = tokio::join!(
        h.cache.upload("ugc/avatar.bin", b"old"),
        h.cache.upload("ugc/avatar.bin", b"new"),
    );

    assert_eq!(first, UploadStatus::Canceled);
    let identifier = second.identifier().expect("Second upload should commit");
    let cached = h.cache.local_path(identifier).await.expect("Second upload cached");
    assert_eq!(read(&cached), b"new");
    assert_eq!(h.cache.len(), 1);
}

#[tokio::test]
async fn test_upload_that_starts_a_sweep_is_still_superseded() {
    let h = Harness::with(
        MemoryTransport::new().with_latency(Duration::from_millis(50)),
        |config| ContentCacheConfig {
            upload_ttl_secs: Some(0),
            sweep_interval_secs: 0,
            ..config
        },
    )
    .await;
    // Expires immediately, so the next upload evicts it and persists.
    h.cache.upload("ugc/seed.bin", b"seed").await;

    let (first, second) = tokio::join!(
        h.cache.upload("ugc/avatar.bin", b"old"),
        h.cache.upload("ugc/avatar.bin", b"new"),
    );

    assert_eq!(first, UploadStatus::Canceled);
    assert!(second.identifier().is_some(), "Later upload should win");
}

#[tokio::test]
async fn test_download_rejects_destinations_outside_the_download_dir() {
    let h = Harness::new().await;
    h.transport.seed("id", b"payload".to_vec());

    for destination in ["../escape.bin", "/abs.bin", "nested/file.bin", "."] {
        let result = h.cache.download("id", destination).await;
        assert!(!result.was_downloaded, "'{destination}' should be rejected");
        assert!(result.local_path.is_none());
    }
    assert_eq!(h.transport.get_count(), 0);
    assert!(!h.config.root_dir.join("escape.bin").exists());
}

#[tokio::test]
async fn test_uploads_to_different_paths_do_not_interfere() {
    let h = Harness::with(
        MemoryTransport::new().with_latency(Duration::from_millis(20)),
        |config| config,
    )
    .await;

    let (a, b) = tokio::join!(
        h.cache.upload("ugc/a.bin", b"a"),
        h.cache.upload("ugc/b.bin", b"b"),
    );

    assert!(a.identifier().is_some());
    assert!(b.identifier().is_some());
    assert_eq!(h.cache.len(), 2);
}

#[tokio::test]
async fn test_expired_entries_are_fetched_again() {
    let h = Harness::with(MemoryTransport::new(), |config| ContentCacheConfig {
        download_ttl_secs: Some(0),
        ..config
    })
    .await;
    h.transport.seed("short-lived", b"v1".to_vec());

    assert!(h.cache.download("short-lived", "short.bin").await.was_downloaded);
    assert!(h.cache.local_path("short-lived").await.is_none());

    let again = h.cache.download("short-lived", "short.bin").await;
    assert!(again.was_downloaded);
    assert_eq!(h.transport.get_count(), 2);

    assert_eq!(h.cache.sweep_expired().await, 1);
    assert!(h.cache.is_empty());
    assert!(h
        .sink
        .drain()
        .contains(&TelemetryEvent::CacheSwept { evicted: 1 }));
}

#[tokio::test]
async fn test_entry_with_missing_file_is_a_miss() {
    let h = Harness::new().await;
    h.transport.seed("id", b"payload".to_vec());

    let first = h.cache.download("id", "payload.bin").await;
    std::fs::remove_file(first.local_path.expect("Path")).expect("Failed to remove file");

    let second = h.cache.download("id", "payload.bin").await;
    assert!(second.was_downloaded);
    assert_eq!(h.transport.get_count(), 2);
}

#[tokio::test]
async fn test_transfer_faults_become_negative_results() {
    let h = Harness::new().await;
    h.transport.set_fail_puts(true);
    h.transport.set_fail_gets(true);

    assert_eq!(h.cache.upload("ugc/x.bin", b"x").await, UploadStatus::Failed);
    let download = h.cache.download("missing", "x.bin").await;
    assert!(!download.was_downloaded);
    assert!(download.local_path.is_none());

    let operations: Vec<TransferOperation> = h
        .sink
        .drain()
        .into_iter()
        .filter_map(|event| match event {
            TelemetryEvent::TransferFault { operation, .. } => Some(operation),
            _ => None,
        })
        .collect();
    assert_eq!(
        operations,
        vec![TransferOperation::Upload, TransferOperation::Download]
    );
}

#[tokio::test]
async fn test_empty_arguments_fail_fast() {
    let h = Harness::new().await;

    assert_eq!(h.cache.upload("", b"x").await, UploadStatus::Failed);
    assert!(!h.cache.download("", "a.bin").await.was_downloaded);
    assert!(!h.cache.download("id", "").await.was_downloaded);
    assert_eq!(h.transport.put_count() + h.transport.get_count(), 0);
}

#[tokio::test]
async fn test_delete_forgets_entry_but_keeps_file() {
    let h = Harness::new().await;
    let status = h.cache.upload("ugc/hat.bin", b"hat").await;
    let identifier = status.identifier().expect("Upload should commit");
    let local_path = h.cache.local_path(identifier).await.expect("Cached");

    assert!(h.cache.delete(identifier).await);
    assert!(!h.cache.delete(identifier).await);
    assert!(h.cache.local_path(identifier).await.is_none());
    assert!(local_path.exists());
}

#[tokio::test]
async fn test_index_survives_reopen() {
    let h = Harness::new().await;
    let status = h.cache.upload("ugc/shirt.bin", b"shirt").await;
    let identifier = status.identifier().expect("Upload should commit");

    let reopened = h.reopen().await;
    assert_eq!(reopened.len(), 1);
    let cached = reopened.local_path(identifier).await.expect("Entry should persist");
    assert_eq!(read(&cached), b"shirt");
}

#[tokio::test]
async fn test_corrupt_index_starts_empty() {
    let h = Harness::new().await;
    h.cache.upload("ugc/shirt.bin", b"shirt").await;
    std::fs::write(h.config.index_path(), b"\xff\xff\xff not an index").expect("Write failed");

    let reopened = h.reopen().await;
    assert!(reopened.is_empty());
}

#[tokio::test]
async fn test_open_sweeps_expired_entries() {
    let h = Harness::new().await;
    let mut index = CacheIndex::new();
    index.insert(
        "stale",
        CacheEntry {
            local_path: h.config.root_dir.join("stale.bin"),
            expiry: Expiry::At(1),
        },
    );
    index.insert(
        "pinned",
        CacheEntry {
            local_path: h.config.root_dir.join("pinned.bin"),
            expiry: Expiry::Never,
        },
    );
    std::fs::write(
        h.config.index_path(),
        index.encode().expect("Encode failed"),
    )
    .expect("Write failed");
    h.sink.drain();

    let reopened = h.reopen().await;

    assert_eq!(reopened.len(), 1);
    assert_eq!(
        h.sink.drain(),
        vec![TelemetryEvent::CacheSwept { evicted: 1 }]
    );
}
