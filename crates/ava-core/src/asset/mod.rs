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

//! Provides the foundational traits and primitive types for Ava's resource system.
//!
//! This module defines the "common language" for every resource-related
//! operation. It contains the contracts that the resolver and the asset
//! service implement or consume, but it has no knowledge of how content is
//! probed, fetched, or turned into engine objects.
//!
//! The key components are:
//! - [`Ref`]: the owning handle with deterministic, idempotent release.
//! - [`ResourceLocation`]: a resolved, materializable reference to content.
//! - [`MergeMode`]: the set algebra used to combine per-key location sets.
//! - [`LocationProbe`] and [`Materializer`]: the external capabilities the
//!   core depends on but does not implement.

mod capability;
mod error;
mod handle;
mod location;
mod merge;

pub use capability::*;
pub use error::*;
pub use handle::*;
pub use location::*;
pub use merge::*;

/// A marker trait for types that can be owned by a [`Ref`].
///
/// The supertraits enforce the guarantees the loading pipeline relies on:
/// - `Send` + `Sync`: resources are produced on whichever task resumes a
///   materialization and may be shared between owners.
/// - `'static`: resources do not borrow from the loader that produced them.
///
/// Every type meeting those bounds is an asset, which lets collections such
/// as `Vec<T>` be owned collectively by a single packed `Ref`.
pub trait Asset: Send + Sync + 'static {}

impl<T: Send + Sync + 'static> Asset for T {}
