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

//! Contracts for the host capabilities the resource core depends on.
//!
//! Neither capability is implemented here: probing belongs to the host's
//! content catalog and materialization to the engine that turns bytes into
//! renderable objects.

use super::{MaterializeError, ProbeError, ResourceLocation, ResourceType};
use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;

/// A resource produced by a [`Materializer`], before it is downcast to the
/// type the caller requested.
pub type MaterializedResource = Box<dyn Any + Send + Sync>;

/// Resolves keys into location sets without materializing any content.
#[async_trait]
pub trait LocationProbe: Send + Sync {
    /// Returns the locations registered under `key`, optionally restricted to
    /// one resource type. An empty set means the key resolved to nothing.
    async fn probe(
        &self,
        key: &str,
        resource_type: Option<&ResourceType>,
    ) -> Result<Vec<Arc<ResourceLocation>>, ProbeError>;
}

/// One materialization call: the location to load and the physical path to
/// read it from, after the rewrite hook has run.
#[derive(Debug, Clone)]
pub struct MaterializeRequest {
    /// The location being materialized.
    pub location: Arc<ResourceLocation>,
    /// The physical path to read, which may differ from
    /// `location.internal_id()` when a version was requested.
    pub physical_path: String,
}

/// Turns a location into a live resource.
#[async_trait]
pub trait Materializer: Send + Sync {
    /// Materializes the content at `request.physical_path`.
    async fn materialize(
        &self,
        request: &MaterializeRequest,
    ) -> Result<MaterializedResource, MaterializeError>;
}
