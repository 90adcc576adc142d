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

use super::Asset;
use std::fmt;
use std::sync::{Arc, Weak};

/// A resource with an explicit release method.
///
/// Resources owned through [`Ref::disposable`] have `dispose` invoked exactly
/// once, by whichever owner releases the resource last.
pub trait Dispose {
    /// Releases the resource.
    fn dispose(self);
}

type Release<T> = Box<dyn FnOnce(T) + Send + Sync>;

/// The shared storage behind every owner of a single resource.
struct Slot<T> {
    resource: T,
    release: Release<T>,
}

/// An owning handle to a loaded resource with deterministic, idempotent release.
///
/// A `Ref` owns zero or one live resource. A dead `Ref` (see [`Ref::dead`]) is
/// always valid to hold and to dispose. Additional owners of the same resource
/// are created with [`Ref::new_ref`] (or `clone`); the resource is released
/// exactly once, when its last owner is disposed or dropped.
///
/// A composite `Ref` built with [`Ref::dependent`] also owns the handles of the
/// resources its primary depends on. Disposing it releases the primary first
/// and then the dependencies, most recently acquired first.
pub struct Ref<T: Asset> {
    slot: Option<Arc<Slot<T>>>,
    dependencies: Vec<ErasedRef>,
}

impl<T: Asset> Ref<T> {
    /// Creates a dead handle. Disposing it is a no-op.
    pub fn dead() -> Self {
        Self {
            slot: None,
            dependencies: Vec::new(),
        }
    }

    /// Wraps a resource with a custom release action.
    ///
    /// Passing `None` yields a dead handle, so call sites can use the same
    /// `is_alive` check after a failed load as after a successful one.
    pub fn with_release<F>(resource: impl Into<Option<T>>, release: F) -> Self
    where
        F: FnOnce(T) + Send + Sync + 'static,
    {
        match resource.into() {
            Some(resource) => Self {
                slot: Some(Arc::new(Slot {
                    resource,
                    release: Box::new(release),
                })),
                dependencies: Vec::new(),
            },
            None => Self::dead(),
        }
    }

    /// Wraps an engine-managed resource. Releasing it drops the value, which
    /// runs the resource's own destroy logic.
    pub fn managed(resource: impl Into<Option<T>>) -> Self {
        Self::with_release(resource, drop::<T>)
    }

    /// Wraps a resource with an explicit release method.
    pub fn disposable(resource: impl Into<Option<T>>) -> Self
    where
        T: Dispose,
    {
        Self::with_release(resource, <T as Dispose>::dispose)
    }

    /// Composes `primary` with the handles of the resources it depends on.
    ///
    /// The composite's item is the primary's item. Any dependencies already
    /// owned by `primary` are kept and released after the new ones.
    ///
    /// A primary must not appear in its own dependency list. Doing so cannot
    /// cause a double release, but it ties the primary's lifetime to the
    /// dependency ordering instead of releasing it first.
    pub fn dependent<I>(mut primary: Ref<T>, dependencies: I) -> Self
    where
        I: IntoIterator<Item = ErasedRef>,
    {
        let slot = primary.slot.take();
        let mut owned = std::mem::take(&mut primary.dependencies);
        owned.extend(dependencies);
        Self {
            slot,
            dependencies: owned,
        }
    }

    /// Returns `true` while this handle still owns its resource.
    pub fn is_alive(&self) -> bool {
        self.slot.is_some()
    }

    /// Returns the owned resource, or `None` once the handle is dead.
    pub fn item(&self) -> Option<&T> {
        self.slot.as_deref().map(|slot| &slot.resource)
    }

    /// Creates an additional, independently disposable owner of the same
    /// resource and of the same dependencies.
    pub fn new_ref(&self) -> Self {
        Self {
            slot: self.slot.clone(),
            dependencies: self.dependencies.iter().map(ErasedRef::new_owner).collect(),
        }
    }

    /// Returns the number of live owners of the resource (0 for a dead handle).
    pub fn owner_count(&self) -> usize {
        self.slot.as_ref().map_or(0, Arc::strong_count)
    }

    /// Returns the number of dependency handles owned by this handle.
    pub fn dependency_count(&self) -> usize {
        self.dependencies.len()
    }

    /// Returns `true` if both handles own the same underlying resource.
    pub fn same_resource(&self, other: &Ref<T>) -> bool {
        match (&self.slot, &other.slot) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Creates a non-owning handle that becomes invalid once the resource
    /// has been released by its last owner.
    pub fn downgrade(&self) -> WeakRef<T> {
        WeakRef {
            slot: self.slot.as_ref().map(Arc::downgrade).unwrap_or_default(),
        }
    }

    /// Erases the resource type so the handle can be owned as a dependency of
    /// a composite of another type.
    pub fn into_erased(self) -> ErasedRef {
        ErasedRef(Box::new(self))
    }

    /// Releases this owner. Idempotent.
    ///
    /// The resource itself is released only if this was its last owner.
    /// Dependencies are then disposed, most recently acquired first.
    pub fn dispose(&mut self) {
        if let Some(slot) = self.slot.take() {
            if let Some(Slot { resource, release }) = Arc::into_inner(slot) {
                log::trace!("Releasing resource of type {}", std::any::type_name::<T>());
                release(resource);
            }
        }
        while let Some(mut dependency) = self.dependencies.pop() {
            dependency.dispose();
        }
    }
}

impl<T: Asset> Default for Ref<T> {
    fn default() -> Self {
        Self::dead()
    }
}

impl<T: Asset> Clone for Ref<T> {
    fn clone(&self) -> Self {
        self.new_ref()
    }
}

impl<T: Asset> Drop for Ref<T> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<T: Asset> fmt::Debug for Ref<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ref")
            .field("alive", &self.is_alive())
            .field("owners", &self.owner_count())
            .field("dependencies", &self.dependencies.len())
            .finish()
    }
}

/// A non-owning handle to a resource owned by one or more [`Ref`]s.
///
/// Once the last owner releases the resource, every `WeakRef` to it is
/// permanently invalid, which makes reads after release detectable.
pub struct WeakRef<T: Asset> {
    slot: Weak<Slot<T>>,
}

impl<T: Asset> WeakRef<T> {
    /// Returns `true` while the resource has not been released.
    pub fn is_valid(&self) -> bool {
        self.slot.strong_count() > 0
    }

    /// Creates a new owner of the resource, if it is still alive.
    ///
    /// The returned handle owns the resource only, not the dependencies of
    /// the handle this was downgraded from.
    pub fn upgrade(&self) -> Option<Ref<T>> {
        self.slot.upgrade().map(|slot| Ref {
            slot: Some(slot),
            dependencies: Vec::new(),
        })
    }
}

impl<T: Asset> Clone for WeakRef<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

impl<T: Asset> fmt::Debug for WeakRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakRef")
            .field("valid", &self.is_valid())
            .finish()
    }
}

/// Object-safe view of a `Ref<T>` used to own dependencies of any type.
trait ErasedOwner: Send + Sync {
    fn dispose(&mut self);
    fn is_alive(&self) -> bool;
    fn new_owner(&self) -> Box<dyn ErasedOwner>;
}

impl<T: Asset> ErasedOwner for Ref<T> {
    fn dispose(&mut self) {
        Ref::dispose(self);
    }

    fn is_alive(&self) -> bool {
        Ref::is_alive(self)
    }

    fn new_owner(&self) -> Box<dyn ErasedOwner> {
        Box::new(self.new_ref())
    }
}

/// A type-erased [`Ref`], owned as a dependency of a composite handle.
pub struct ErasedRef(Box<dyn ErasedOwner>);

impl ErasedRef {
    /// Returns `true` while the erased handle still owns its resource.
    pub fn is_alive(&self) -> bool {
        self.0.is_alive()
    }

    /// Releases this owner. Idempotent.
    pub fn dispose(&mut self) {
        self.0.dispose();
    }

    fn new_owner(&self) -> Self {
        Self(self.0.new_owner())
    }
}

impl<T: Asset> From<Ref<T>> for ErasedRef {
    fn from(handle: Ref<T>) -> Self {
        handle.into_erased()
    }
}

impl fmt::Debug for ErasedRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedRef")
            .field("alive", &self.is_alive())
            .finish()
    }
}
