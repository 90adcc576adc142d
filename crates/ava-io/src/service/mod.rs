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

//! The asset service: the single entry point for loading resources by key.
//!
//! Every public operation completes with a usable result. Failures are
//! logged and turned into dead handles, so callers check `is_alive()` the
//! same way whether a load missed, failed, or never had a valid key.

mod options;

pub use options::{BatchOptions, LoadOptions};

use crate::resolver::{ResolutionContext, ResolvedLoad, VersionedResolver};
use anyhow::{anyhow, Context, Result};
use ava_core::asset::{
    Asset, ErasedRef, LocationProbe, MaterializeRequest, MaterializedResource, Materializer,
    MergeMode, Ref,
    ResourceLocation, ResourceType,
};
use futures::future::join_all;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// A per-item callback fired as each item of a batch materializes.
///
/// A panicking callback is caught and logged; the load carries on.
pub type ProgressCallback<'a, T> = &'a (dyn Fn(&T) + Send + Sync);

/// A materialized item together with the handles of the dependencies it
/// was built on.
struct Loaded<T> {
    item: T,
    dependencies: Vec<ErasedRef>,
}

impl<T: Asset> Loaded<T> {
    fn into_ref(self) -> Ref<T> {
        let primary = Ref::managed(self.item);
        if self.dependencies.is_empty() {
            primary
        } else {
            Ref::dependent(primary, self.dependencies)
        }
    }
}

/// Loads resources by key or location through a resolver and a materializer.
pub struct AssetService<P: LocationProbe, M: Materializer> {
    resolver: VersionedResolver<P>,
    materializer: M,
}

impl<P: LocationProbe, M: Materializer> AssetService<P, M> {
    /// Creates a service with a plain resolver over `probe`.
    pub fn new(probe: P, materializer: M) -> Self {
        Self::with_resolver(VersionedResolver::new(probe), materializer)
    }

    /// Creates a service around a configured resolver.
    pub fn with_resolver(resolver: VersionedResolver<P>, materializer: M) -> Self {
        Self {
            resolver,
            materializer,
        }
    }

    /// The resolver used for key lookups.
    pub fn resolver(&self) -> &VersionedResolver<P> {
        &self.resolver
    }

    /// The materializer used to build resources.
    pub fn materializer(&self) -> &M {
        &self.materializer
    }

    /// Loads the resource registered under `key`.
    ///
    /// A level of detail is applied first, then a version. Either falls back
    /// to the plain key when its variant does not resolve.
    pub async fn load_asset<T: Asset>(&self, key: &str, options: LoadOptions) -> Ref<T> {
        if key.is_empty() {
            log::error!("load_asset called with an empty key.");
            return Ref::dead();
        }

        match self.try_load_asset::<T>(key, &options).await {
            Ok(asset) => asset,
            Err(e) => {
                log::error!("Failed to load '{key}': {e:#}");
                Ref::dead()
            }
        }
    }

    /// Loads the resource at an already resolved location.
    pub async fn load_asset_at<T: Asset>(&self, location: Arc<ResourceLocation>) -> Ref<T> {
        let mut context = ResolutionContext::new();
        match self.materialize_location::<T>(&location, &mut context).await {
            Ok(loaded) => loaded.into_ref(),
            Err(e) => {
                log::error!("Failed to load '{}': {e:#}", location.primary_key());
                Ref::dead()
            }
        }
    }

    /// Loads every location the keys resolve to under the merge mode, as a
    /// single handle owning the whole list.
    pub async fn load_assets<T: Asset, K: AsRef<str>>(
        &self,
        keys: &[K],
        options: BatchOptions,
        callback: Option<ProgressCallback<'_, T>>,
    ) -> Ref<Vec<T>> {
        if keys.is_empty() {
            log::error!("load_assets called with no keys.");
            return Ref::dead();
        }

        let locations = self
            .resolver
            .probe_keys(keys, options.merge_mode, Some(&ResourceType::of::<T>()))
            .await;
        if locations.is_empty() {
            log::warn!(
                "{} keys resolved to no locations under {:?}.",
                keys.len(),
                options.merge_mode
            );
            return Ref::dead();
        }

        self.load_assets_at(&locations, options.release_dependencies_on_failure, callback)
            .await
    }

    /// Loads `locations` as a single handle owning the whole list.
    pub async fn load_assets_at<T: Asset>(
        &self,
        locations: &[Arc<ResourceLocation>],
        release_dependencies_on_failure: bool,
        callback: Option<ProgressCallback<'_, T>>,
    ) -> Ref<Vec<T>> {
        if locations.is_empty() {
            log::error!("load_assets_at called with no locations.");
            return Ref::dead();
        }

        let results = self.materialize_all::<T>(locations, callback).await;

        let mut items = Vec::with_capacity(results.len());
        let mut dependencies = Vec::new();
        let mut failures = 0usize;
        for (location, result) in locations.iter().zip(results) {
            match result {
                Ok(loaded) => {
                    items.push(loaded.item);
                    dependencies.extend(loaded.dependencies);
                }
                Err(e) => {
                    failures += 1;
                    log::error!("Failed to load '{}' in batch: {e:#}", location.primary_key());
                }
            }
        }

        if failures > 0 && release_dependencies_on_failure {
            log::warn!(
                "Releasing {} loaded items after {failures} batch failures.",
                items.len()
            );
            return Ref::dead();
        }

        Ref::dependent(Ref::managed(items), dependencies)
    }

    /// Loads every location the keys resolve to under `merge_mode`, as
    /// independently owned handles. Failed items are dead handles at their
    /// position in the list.
    pub async fn load_unpacked_assets<T: Asset, K: AsRef<str>>(
        &self,
        keys: &[K],
        merge_mode: MergeMode,
        callback: Option<ProgressCallback<'_, T>>,
    ) -> Vec<Ref<T>> {
        if keys.is_empty() {
            log::error!("load_unpacked_assets called with no keys.");
            return Vec::new();
        }

        let locations = self
            .resolver
            .probe_keys(keys, merge_mode, Some(&ResourceType::of::<T>()))
            .await;

        self.load_unpacked_assets_at(&locations, callback).await
    }

    /// Loads `locations` as independently owned handles.
    pub async fn load_unpacked_assets_at<T: Asset>(
        &self,
        locations: &[Arc<ResourceLocation>],
        callback: Option<ProgressCallback<'_, T>>,
    ) -> Vec<Ref<T>> {
        self.materialize_all::<T>(locations, callback)
            .await
            .into_iter()
            .zip(locations)
            .map(|(result, location)| match result {
                Ok(loaded) => loaded.into_ref(),
                Err(e) => {
                    log::error!("Failed to load '{}': {e:#}", location.primary_key());
                    Ref::dead()
                }
            })
            .collect()
    }

    async fn try_load_asset<T: Asset>(&self, key: &str, options: &LoadOptions) -> Result<Ref<T>> {
        let resource_type = ResourceType::of::<T>();

        let key = match options.lod.as_deref() {
            Some(lod) => self.resolver.resolve_lod_address(key, lod).await,
            None => key.to_string(),
        };

        let ResolvedLoad {
            locations,
            mut context,
        } = self
            .resolver
            .resolve_versioned(&key, options.version, &resource_type)
            .await;

        let locations = match locations {
            Some(locations) => locations,
            None => self
                .resolver
                .locate(&key, Some(&resource_type))
                .await
                .with_context(|| format!("Failed to locate '{key}'"))?,
        };

        let location = locations
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("'{key}' resolved to no locations"))?;

        let loaded = self.materialize_location::<T>(&location, &mut context).await?;

        if context.pending_pins() > 0 {
            log::debug!(
                "{} version pins for '{key}' were never consumed.",
                context.pending_pins()
            );
        }

        Ok(loaded.into_ref())
    }

    /// Materializes every dependency below `location`, then `location`
    /// itself, rewriting each physical path through `context`.
    async fn materialize_location<T: Asset>(
        &self,
        location: &Arc<ResourceLocation>,
        context: &mut ResolutionContext,
    ) -> Result<Loaded<T>> {
        let mut dependencies = Vec::new();

        for dependency in location.all_dependencies() {
            let request = MaterializeRequest {
                physical_path: context.rewrite_path(&dependency),
                location: dependency.clone(),
            };
            let resource = self
                .materializer
                .materialize(&request)
                .await
                .with_context(|| {
                    format!(
                        "Failed to materialize dependency '{}' of '{}'",
                        dependency.primary_key(),
                        location.primary_key()
                    )
                })?;
            // Dropping this vector on an early return releases what was
            // already loaded.
            dependencies.push(Ref::<MaterializedResource>::managed(resource).into_erased());
        }

        let request = MaterializeRequest {
            physical_path: context.rewrite_path(location),
            location: location.clone(),
        };
        let resource = self
            .materializer
            .materialize(&request)
            .await
            .with_context(|| format!("Failed to materialize '{}'", location.primary_key()))?;

        let item = resource.downcast::<T>().map_err(|_| {
            anyhow!(
                "'{}' did not materialize into a {}",
                location.primary_key(),
                ResourceType::of::<T>()
            )
        })?;

        Ok(Loaded {
            item: *item,
            dependencies,
        })
    }

    async fn materialize_all<T: Asset>(
        &self,
        locations: &[Arc<ResourceLocation>],
        callback: Option<ProgressCallback<'_, T>>,
    ) -> Vec<Result<Loaded<T>>> {
        let loads = locations.iter().map(|location| async move {
            let mut context = ResolutionContext::new();
            let loaded = self.materialize_location::<T>(location, &mut context).await?;
            notify_progress(callback, &loaded.item, location.primary_key());
            Ok::<_, anyhow::Error>(loaded)
        });

        join_all(loads).await
    }
}

fn notify_progress<T>(callback: Option<ProgressCallback<'_, T>>, item: &T, key: &str) {
    let Some(callback) = callback else {
        return;
    };

    if panic::catch_unwind(AssertUnwindSafe(|| callback(item))).is_err() {
        log::error!("Progress callback panicked for '{key}'. The load continues.");
    }
}
