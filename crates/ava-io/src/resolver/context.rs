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

use ava_core::asset::{ResourceLocation, ResourceType};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static FILE_VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_v\d+\.").expect("valid regex"));
static FOLDER_VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/v\d+/").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PinKey {
    key: String,
    resource_type: ResourceType,
}

/// The version pins of one load request.
///
/// A pin maps a `(key, resource type)` pair to a historical version. The
/// first physical-path rewrite for a matching location consumes it. Pins
/// live only as long as the request that created them, so concurrent loads
/// of the same key at different versions never see each other's pins.
#[derive(Debug, Clone, Default)]
pub struct ResolutionContext {
    pins: HashMap<PinKey, u32>,
}

impl ResolutionContext {
    /// Creates a context with no pins. Every path passes through unchanged.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pins `(key, resource_type)` to `version`, replacing any earlier pin.
    pub fn pin(&mut self, key: impl Into<String>, resource_type: ResourceType, version: u32) {
        self.pins.insert(
            PinKey {
                key: key.into(),
                resource_type,
            },
            version,
        );
    }

    /// Returns the version pinned for `(key, resource_type)`, if any.
    pub fn pinned_version(&self, key: &str, resource_type: &ResourceType) -> Option<u32> {
        self.pins
            .get(&PinKey {
                key: key.to_string(),
                resource_type: resource_type.clone(),
            })
            .copied()
    }

    /// The number of pins not yet consumed.
    pub fn pending_pins(&self) -> usize {
        self.pins.len()
    }

    /// Returns the physical path to read for `location`.
    ///
    /// When a pin matches the location's key and type it is removed, and the
    /// first `_v<N>.` marker in the path is replaced with the pinned version.
    /// Paths without a file marker fall back to the first `/v<N>/` folder
    /// marker. Paths with neither marker are returned unchanged.
    pub fn rewrite_path(&mut self, location: &ResourceLocation) -> String {
        let path = location.internal_id();
        let pin = PinKey {
            key: location.primary_key().to_string(),
            resource_type: location.resource_type().clone(),
        };

        let Some(version) = self.pins.remove(&pin) else {
            return path.to_string();
        };

        let rewritten = if FILE_VERSION_RE.is_match(path) {
            FILE_VERSION_RE.replace(path, format!("_v{version}."))
        } else {
            FOLDER_VERSION_RE.replace(path, format!("/v{version}/"))
        };

        if rewritten == path {
            log::debug!(
                "Version pin {version} for '{}' consumed, but '{path}' has no version marker.",
                pin.key
            );
        } else {
            log::trace!("Rewrote '{path}' to '{rewritten}'.");
        }

        rewritten.into_owned()
    }
}
