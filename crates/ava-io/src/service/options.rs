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

use ava_core::asset::MergeMode;

/// Options for a single-asset load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Load this historical version instead of the current one.
    pub version: Option<u32>,
    /// Prefer the `"{key}_{lod}"` variant when it exists.
    pub lod: Option<String>,
}

impl LoadOptions {
    /// Requests a historical version.
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }

    /// Requests a level-of-detail variant.
    pub fn with_lod(mut self, lod: impl Into<String>) -> Self {
        self.lod = Some(lod.into());
        self
    }
}

/// Options for a packed batch load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// How the per-key location sets are combined.
    pub merge_mode: MergeMode,
    /// When set, one failed item releases everything already loaded and the
    /// batch resolves to a dead handle. When clear, the handle holds the
    /// items that did load.
    pub release_dependencies_on_failure: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            merge_mode: MergeMode::None,
            release_dependencies_on_failure: true,
        }
    }
}

impl BatchOptions {
    /// Uses `merge_mode` to combine key sets.
    pub fn with_merge_mode(mut self, merge_mode: MergeMode) -> Self {
        self.merge_mode = merge_mode;
        self
    }

    /// Keeps the successfully loaded subset when an item fails.
    pub fn keep_partial(mut self) -> Self {
        self.release_dependencies_on_failure = false;
        self
    }
}
