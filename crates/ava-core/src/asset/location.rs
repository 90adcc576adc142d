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

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// A string identifier for the kind of resource a location materializes into
/// (e.g., "texture", "mesh", or a Rust type name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceType(String);

impl ResourceType {
    /// Creates a resource type from an explicit name.
    pub fn named(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the resource type used for loads of the Rust type `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self(std::any::type_name::<T>().to_string())
    }

    /// Returns the type name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The resolvable identity of a location: two locations with the same
/// identity point at the same physical content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocationId {
    /// The physical locator the location resolves to.
    pub internal_id: String,
    /// The kind of resource stored there.
    pub resource_type: ResourceType,
}

/// A resolved, materializable reference to content.
///
/// A location carries the key it was requested under, the physical locator
/// (`internal_id`) the materializer reads from, its resource type, and the
/// locations of the content it depends on. Dependencies form a DAG rooted at
/// the requested key. Locations are shared behind `Arc` and never mutated
/// once resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLocation {
    primary_key: String,
    internal_id: String,
    resource_type: ResourceType,
    dependencies: Vec<Arc<ResourceLocation>>,
}

impl ResourceLocation {
    /// Creates a location without dependencies.
    pub fn new(
        primary_key: impl Into<String>,
        internal_id: impl Into<String>,
        resource_type: ResourceType,
    ) -> Self {
        Self {
            primary_key: primary_key.into(),
            internal_id: internal_id.into(),
            resource_type,
            dependencies: Vec::new(),
        }
    }

    /// Adds a dependency location. Used while building a location during
    /// resolution, before it is shared.
    pub fn with_dependency(mut self, dependency: impl Into<Arc<ResourceLocation>>) -> Self {
        self.dependencies.push(dependency.into());
        self
    }

    /// The key this location was resolved from.
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// The physical locator, before any path rewriting.
    pub fn internal_id(&self) -> &str {
        &self.internal_id
    }

    /// The kind of resource this location materializes into.
    pub fn resource_type(&self) -> &ResourceType {
        &self.resource_type
    }

    /// The direct dependencies of this location.
    pub fn dependencies(&self) -> &[Arc<ResourceLocation>] {
        &self.dependencies
    }

    /// Returns the identity used for set membership.
    pub fn identity(&self) -> LocationId {
        LocationId {
            internal_id: self.internal_id.clone(),
            resource_type: self.resource_type.clone(),
        }
    }

    /// Returns every location reachable below this one, depth-first, each
    /// identity at most once. The location itself is not included.
    pub fn all_dependencies(&self) -> Vec<Arc<ResourceLocation>> {
        let mut seen = HashSet::new();
        let mut ordered = Vec::new();
        let mut stack: Vec<&Arc<ResourceLocation>> = self.dependencies.iter().rev().collect();

        while let Some(location) = stack.pop() {
            if !seen.insert(location.identity()) {
                continue;
            }
            ordered.push(location.clone());
            stack.extend(location.dependencies.iter().rev());
        }

        ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(key: &str, path: &str) -> ResourceLocation {
        ResourceLocation::new(key, path, ResourceType::named("bundle"))
    }

    #[test]
    fn test_identity_ignores_primary_key() {
        let a = location("hair", "bundles/hair_v1.bundle");
        let b = location("hair_alias", "bundles/hair_v1.bundle");
        assert_eq!(a.identity(), b.identity());

        let texture = ResourceLocation::new(
            "hair",
            "bundles/hair_v1.bundle",
            ResourceType::named("texture"),
        );
        assert_ne!(a.identity(), texture.identity());
    }

    #[test]
    fn test_all_dependencies_walks_dag_once() {
        let shared = Arc::new(location("shader", "bundles/shader.bundle"));
        let material = Arc::new(
            location("material", "bundles/material.bundle").with_dependency(shared.clone()),
        );
        let root = location("hat", "bundles/hat.bundle")
            .with_dependency(material)
            .with_dependency(shared);

        let keys: Vec<_> = root
            .all_dependencies()
            .iter()
            .map(|l| l.primary_key().to_string())
            .collect();
        assert_eq!(keys, vec!["material", "shader"]);
    }

    #[test]
    fn test_resource_type_of_uses_type_name() {
        assert_eq!(ResourceType::of::<u32>().as_str(), "u32");
        assert_eq!(ResourceType::named("mesh").to_string(), "mesh");
    }
}
