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

#![warn(missing_docs)]

//! Resolves keys into resource locations and materializes them into [`Ref`]s.
//!
//! [`VersionedResolver`] turns a key, plus an optional version or level of
//! detail, into a location set and a request-scoped [`ResolutionContext`].
//! [`AssetService`] drives the resolver and an external
//! [`Materializer`](ava_core::asset::Materializer) to produce owned handles.
//!
//! [`Ref`]: ava_core::Ref

pub mod resolver;
pub mod service;

pub use resolver::{ResolutionContext, ResolvedLoad, VersionedResolver};
pub use service::{AssetService, BatchOptions, LoadOptions, ProgressCallback};
