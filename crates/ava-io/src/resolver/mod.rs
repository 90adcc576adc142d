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

//! Key resolution with version pinning and level-of-detail selection.

mod context;

pub use context::ResolutionContext;

use ava_core::asset::{
    merge_location_sets, LocationProbe, MergeMode, ProbeError, ResourceLocation, ResourceType,
};
use ava_core::telemetry::{TelemetryEvent, TelemetrySink};
use ava_telemetry::ScopedLogLevel;
use std::sync::Arc;

/// The outcome of [`VersionedResolver::resolve_versioned`].
#[derive(Debug, Default)]
pub struct ResolvedLoad {
    /// The probed location set, or `None` when the caller should fall back
    /// to an unqualified load of the key.
    pub locations: Option<Vec<Arc<ResourceLocation>>>,
    /// The pins to apply while materializing this load.
    pub context: ResolutionContext,
}

/// Resolves keys through a [`LocationProbe`].
///
/// Misses never surface as errors: they fall back to the unqualified key and
/// are reported to the telemetry sink, if one is attached.
pub struct VersionedResolver<P: LocationProbe> {
    probe: P,
    sink: Option<Arc<dyn TelemetrySink>>,
}

impl<P: LocationProbe> VersionedResolver<P> {
    /// Creates a resolver over `probe`.
    pub fn new(probe: P) -> Self {
        Self { probe, sink: None }
    }

    /// Reports resolution misses to `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// The underlying probe.
    pub fn probe(&self) -> &P {
        &self.probe
    }

    /// Probes `key` without silencing the log. Used by unqualified loads,
    /// where a miss is a real failure.
    pub async fn locate(
        &self,
        key: &str,
        resource_type: Option<&ResourceType>,
    ) -> Result<Vec<Arc<ResourceLocation>>, ProbeError> {
        self.probe.probe(key, resource_type).await
    }

    /// Returns `"{key}_{lod}"` when that key resolves to at least one
    /// location, and `key` otherwise. An empty `lod` returns `key` without
    /// probing.
    pub async fn resolve_lod_address(&self, key: &str, lod: &str) -> String {
        if lod.is_empty() {
            return key.to_string();
        }

        let qualified = format!("{key}_{lod}");
        match self.quiet_probe(&qualified, None).await {
            Some(_) => {
                log::debug!("Using LOD address '{qualified}' for '{key}'.");
                qualified
            }
            None => key.to_string(),
        }
    }

    /// Resolves `key` for a load at `version`.
    ///
    /// Without a version, or when the probe misses, the result carries no
    /// locations and an empty context. Otherwise the context pins the key
    /// and every dependency below the resolved locations to `version`.
    pub async fn resolve_versioned(
        &self,
        key: &str,
        version: Option<u32>,
        resource_type: &ResourceType,
    ) -> ResolvedLoad {
        let Some(version) = version else {
            return ResolvedLoad::default();
        };

        let Some(locations) = self.quiet_probe(key, Some(resource_type)).await else {
            log::warn!("Could not resolve '{key}' at version {version}; loading it unqualified.");
            return ResolvedLoad::default();
        };

        let mut context = ResolutionContext::new();
        context.pin(key, resource_type.clone(), version);
        for location in &locations {
            for dependency in location.all_dependencies() {
                context.pin(
                    dependency.primary_key(),
                    dependency.resource_type().clone(),
                    version,
                );
            }
        }

        log::debug!(
            "Pinned '{key}' and {} dependencies to version {version}.",
            context.pending_pins() - 1
        );

        ResolvedLoad {
            locations: Some(locations),
            context,
        }
    }

    /// Resolves each key and combines the location sets under `mode`.
    ///
    /// Keys that miss contribute an empty set. `UseFirst` and `None` stop
    /// probing at the first key that resolves.
    pub async fn probe_keys<K: AsRef<str>>(
        &self,
        keys: &[K],
        mode: MergeMode,
        resource_type: Option<&ResourceType>,
    ) -> Vec<Arc<ResourceLocation>> {
        let mut sets = Vec::with_capacity(keys.len());

        for key in keys {
            let set = self
                .quiet_probe(key.as_ref(), resource_type)
                .await
                .unwrap_or_default();
            let resolved = !set.is_empty();
            sets.push(set);

            if resolved && matches!(mode, MergeMode::None | MergeMode::UseFirst) {
                break;
            }
        }

        merge_location_sets(mode, sets)
    }

    async fn quiet_probe(
        &self,
        key: &str,
        resource_type: Option<&ResourceType>,
    ) -> Option<Vec<Arc<ResourceLocation>>> {
        let result = {
            let _quiet = ScopedLogLevel::quiet();
            self.probe.probe(key, resource_type).await
        };

        let reason = match result {
            Ok(locations) if !locations.is_empty() => return Some(locations),
            Ok(_) => "no locations".to_string(),
            Err(e) => e.to_string(),
        };

        log::debug!("Probe for '{key}' missed: {reason}");
        if let Some(sink) = &self.sink {
            sink.report(TelemetryEvent::ResolutionMiss {
                key: key.to_string(),
                reason,
            });
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ava_telemetry::ChannelSink;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeProbe {
        entries: HashMap<String, Vec<Arc<ResourceLocation>>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeProbe {
        fn with(mut self, key: &str, locations: Vec<ResourceLocation>) -> Self {
            self.entries
                .insert(key.to_string(), locations.into_iter().map(Arc::new).collect());
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LocationProbe for FakeProbe {
        async fn probe(
            &self,
            key: &str,
            _resource_type: Option<&ResourceType>,
        ) -> Result<Vec<Arc<ResourceLocation>>, ProbeError> {
            self.calls.lock().unwrap().push(key.to_string());
            self.entries
                .get(key)
                .cloned()
                .ok_or_else(|| ProbeError::UnknownKey(key.to_string()))
        }
    }

    fn bundle(key: &str) -> ResourceLocation {
        ResourceLocation::new(key, format!("bundles/{key}.bundle"), ResourceType::named("bundle"))
    }

    fn keys_of(locations: &[Arc<ResourceLocation>]) -> Vec<&str> {
        locations.iter().map(|l| l.primary_key()).collect()
    }

    #[tokio::test]
    async fn test_lod_address_falls_back_on_miss() {
        let resolver = VersionedResolver::new(FakeProbe::default().with("hat_low", vec![bundle("hat_low")]));

        assert_eq!(resolver.resolve_lod_address("hat", "low").await, "hat_low");
        assert_eq!(resolver.resolve_lod_address("hat", "high").await, "hat");
        assert_eq!(resolver.resolve_lod_address("hat", "").await, "hat");
        assert_eq!(resolver.probe().calls(), vec!["hat_low", "hat_high"]);
    }

    #[tokio::test]
    async fn test_lod_address_treats_empty_set_as_miss() {
        let resolver = VersionedResolver::new(FakeProbe::default().with("hat_low", vec![]));
        assert_eq!(resolver.resolve_lod_address("hat", "low").await, "hat");
    }

    #[tokio::test]
    async fn test_resolve_versioned_pins_root_and_dependencies() {
        let ty = ResourceType::named("bundle");
        let root = bundle("outfit")
            .with_dependency(bundle("fabric").with_dependency(bundle("shader")));
        let resolver = VersionedResolver::new(FakeProbe::default().with("outfit", vec![root]));

        let resolved = resolver.resolve_versioned("outfit", Some(3), &ty).await;

        assert_eq!(resolved.locations.as_deref().map(keys_of), Some(vec!["outfit"]));
        assert_eq!(resolved.context.pending_pins(), 3);
        assert_eq!(resolved.context.pinned_version("shader", &ty), Some(3));
    }

    #[tokio::test]
    async fn test_resolve_versioned_without_version_skips_probe() {
        let resolver = VersionedResolver::new(FakeProbe::default().with("outfit", vec![bundle("outfit")]));
        let resolved = resolver
            .resolve_versioned("outfit", None, &ResourceType::named("bundle"))
            .await;

        assert!(resolved.locations.is_none());
        assert_eq!(resolved.context.pending_pins(), 0);
        assert!(resolver.probe().calls().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_versioned_miss_reports_and_falls_back() {
        let sink = Arc::new(ChannelSink::new());
        let resolver = VersionedResolver::new(FakeProbe::default()).with_sink(sink.clone());

        let resolved = resolver
            .resolve_versioned("ghost", Some(2), &ResourceType::named("bundle"))
            .await;

        assert!(resolved.locations.is_none());
        assert_eq!(resolved.context.pending_pins(), 0);
        assert!(matches!(
            sink.drain().as_slice(),
            [TelemetryEvent::ResolutionMiss { key, .. }] if key == "ghost"
        ));
    }

    #[tokio::test]
    async fn test_probe_keys_merge_modes() {
        let probe = FakeProbe::default()
            .with("A", vec![bundle("a"), bundle("b")])
            .with("B", vec![bundle("b"), bundle("c")]);
        let resolver = VersionedResolver::new(probe);
        let keys = ["A", "B"];

        let first = resolver.probe_keys(&keys, MergeMode::UseFirst, None).await;
        let union = resolver.probe_keys(&keys, MergeMode::Union, None).await;
        let intersection = resolver.probe_keys(&keys, MergeMode::Intersection, None).await;

        assert_eq!(keys_of(&first), vec!["a", "b"]);
        assert_eq!(keys_of(&union), vec!["a", "b", "c"]);
        assert_eq!(keys_of(&intersection), vec!["b"]);
    }

    #[tokio::test]
    async fn test_probe_keys_use_first_stops_early() {
        let probe = FakeProbe::default()
            .with("A", vec![bundle("a")])
            .with("B", vec![bundle("b")]);
        let resolver = VersionedResolver::new(probe);

        let first = resolver.probe_keys(&["missing", "A", "B"], MergeMode::None, None).await;

        assert_eq!(keys_of(&first), vec!["a"]);
        assert_eq!(resolver.probe().calls(), vec!["missing", "A"]);
    }
}
