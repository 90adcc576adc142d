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

//! Set algebra over resolved location sets.

use super::{LocationId, ResourceLocation};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// The policy used to combine the location sets resolved for several keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeMode {
    /// Same as [`MergeMode::UseFirst`].
    #[default]
    None,
    /// Use the locations of the first key that resolved to anything.
    UseFirst,
    /// Use every location resolved for any key.
    Union,
    /// Use only the locations resolved for every key.
    Intersection,
}

/// Combines per-key location sets according to `mode`.
///
/// Membership is decided by [`ResourceLocation::identity`], so two keys that
/// resolve to the same physical content contribute a single location. The
/// result keeps the order in which locations were first seen. A key that
/// resolved to nothing is passed as an empty set: it is skipped by
/// `UseFirst` and `Union`, and empties an `Intersection`.
pub fn merge_location_sets<I>(mode: MergeMode, sets: I) -> Vec<Arc<ResourceLocation>>
where
    I: IntoIterator<Item = Vec<Arc<ResourceLocation>>>,
{
    let mut sets = sets.into_iter();

    match mode {
        MergeMode::None | MergeMode::UseFirst => sets
            .find(|set| !set.is_empty())
            .map(distinct)
            .unwrap_or_default(),
        MergeMode::Union => distinct(sets.flatten()),
        MergeMode::Intersection => {
            let Some(first) = sets.next() else {
                return Vec::new();
            };
            let mut merged = distinct(first);
            for set in sets {
                let members: HashSet<LocationId> = set.iter().map(|l| l.identity()).collect();
                merged.retain(|location| members.contains(&location.identity()));
            }
            merged
        }
    }
}

fn distinct<I>(locations: I) -> Vec<Arc<ResourceLocation>>
where
    I: IntoIterator<Item = Arc<ResourceLocation>>,
{
    let mut seen = HashSet::new();
    locations
        .into_iter()
        .filter(|location| seen.insert(location.identity()))
        .collect()
}
