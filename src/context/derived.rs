//! Information derived from a type once and shared afterwards.

use std::{
    fmt,
    sync::{Arc, OnceLock},
};

use crate::{module::TypeHandle, utils::cache::ConcurrentCache};

/// A value computed from a type on first request.
pub trait DerivedInfo: Send + Sync + Sized {
    /// Computes the value for `ty`.
    fn derive(ty: TypeHandle) -> Self;
}

/// Per-type cache of a [`DerivedInfo`]; the same `Arc` is returned for a type every time.
pub struct DerivedInfoCache<V> {
    cache: ConcurrentCache<TypeHandle, V>,
}

impl<V: DerivedInfo> DerivedInfoCache<V> {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        DerivedInfoCache {
            cache: ConcurrentCache::new(),
        }
    }

    /// The value for `ty`, derived on first request.
    pub fn get(&self, ty: TypeHandle) -> Arc<V> {
        self.cache.get_or_create(ty, |ty| V::derive(*ty))
    }

    /// The value for `ty` if already derived.
    #[must_use]
    pub fn try_get(&self, ty: TypeHandle) -> Option<Arc<V>> {
        self.cache.try_get(&ty)
    }

    /// Number of derived values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// True if nothing was derived yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

impl<V: DerivedInfo> Default for DerivedInfoCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for DerivedInfoCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedInfoCache")
            .field("entries", &self.cache.len())
            .finish()
    }
}

/// Shape of a delegate's `Invoke` method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvokeShape {
    /// Number of declared parameters
    pub parameter_count: u16,
    /// False for `void` delegates
    pub has_return: bool,
}

/// Facts about a delegate type.
#[derive(Debug)]
pub struct DelegateInfo {
    ty: TypeHandle,
    invoke: OnceLock<InvokeShape>,
}

impl DelegateInfo {
    /// The delegate type.
    #[must_use]
    pub fn delegate_type(&self) -> TypeHandle {
        self.ty
    }

    /// The `Invoke` shape, computed by `read` on the first call only.
    pub fn invoke_shape(&self, read: impl FnOnce(TypeHandle) -> InvokeShape) -> InvokeShape {
        *self.invoke.get_or_init(|| read(self.ty))
    }

    /// The `Invoke` shape if already computed.
    #[must_use]
    pub fn cached_invoke_shape(&self) -> Option<InvokeShape> {
        self.invoke.get().copied()
    }
}

impl DerivedInfo for DelegateInfo {
    fn derive(ty: TypeHandle) -> Self {
        DelegateInfo {
            ty,
            invoke: OnceLock::new(),
        }
    }
}
