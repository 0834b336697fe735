//! Scope wrappers controlling instance reuse
//!
//! A scope wraps a raw provider and decides when the inner provider is
//! invoked. Every wrapper reports the inner provider's dependency list
//! unchanged, so validation sees straight through it.

use crate::component::{Component, ComponentRef, Marker, ScopeMarker};
use crate::context::Context;
use crate::error::{DiError, DiResult};
use crate::provider::{ComponentProvider, SharedProvider};
use crate::service::Instance;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Caching policy of a binding. No scope means a new instance per lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// One instance for the lifetime of the context
    Singleton,
    /// Up to N instances, handed out round-robin
    Pooled(usize),
    /// Resolved through the [`ScopeTable`]
    Custom(ScopeMarker),
}

impl Scope {
    /// Custom scope identified by the type `K`
    pub fn custom<K: ?Sized + 'static>() -> Self {
        Scope::Custom(ScopeMarker::of::<K>())
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Singleton => write!(f, "Singleton"),
            Scope::Pooled(size) => write!(f, "Pooled({})", size),
            Scope::Custom(marker) => write!(f, "Custom({})", marker),
        }
    }
}

/// Wraps a raw provider into a scoped one
pub type ScopeFactory = Arc<dyn Fn(SharedProvider) -> SharedProvider + Send + Sync>;

/// Table of custom scopes, keyed by marker
#[derive(Clone, Default)]
pub struct ScopeTable {
    factories: FxHashMap<ScopeMarker, ScopeFactory>,
}

impl ScopeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the wrapper factory for a custom scope, replacing any previous one
    pub fn register<F>(&mut self, marker: ScopeMarker, factory: F) -> &mut Self
    where
        F: Fn(SharedProvider) -> SharedProvider + Send + Sync + 'static,
    {
        self.factories.insert(marker, Arc::new(factory));
        self
    }

    pub fn contains(&self, marker: &ScopeMarker) -> bool {
        self.factories.contains_key(marker)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Apply `scope` to `provider`; `None` leaves it unwrapped
    pub fn wrap(
        &self,
        component: &Component,
        provider: SharedProvider,
        scope: Option<&Scope>,
    ) -> DiResult<SharedProvider> {
        let wrapped: SharedProvider = match scope {
            None => provider,
            Some(Scope::Singleton) => Arc::new(SingletonProvider::new(provider)),
            Some(Scope::Pooled(0)) => {
                return Err(DiError::InvalidScope {
                    component: component.clone(),
                    reason: "pool size must be at least 1".to_string(),
                })
            }
            Some(Scope::Pooled(size)) => Arc::new(PooledProvider::new(provider, *size)),
            Some(Scope::Custom(marker)) => {
                let factory = self
                    .factories
                    .get(marker)
                    .ok_or_else(|| DiError::UnknownScope {
                        component: component.clone(),
                        scope: *marker,
                    })?;
                factory(provider)
            }
        };
        Ok(wrapped)
    }
}

impl fmt::Debug for ScopeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}

/// Caches the first instance produced by the inner provider.
///
/// The lock is held while the inner provider runs, so concurrent cold
/// lookups yield a single instance. A construction function that looks its
/// own singleton up again through the [`Context`] gets
/// [`DiError::ReentrantConstruction`] before it reaches the lock.
pub struct SingletonProvider {
    inner: SharedProvider,
    instance: Mutex<Option<Instance>>,
}

impl SingletonProvider {
    pub fn new(inner: SharedProvider) -> Self {
        Self {
            inner,
            instance: Mutex::new(None),
        }
    }
}

impl ComponentProvider for SingletonProvider {
    fn get(&self, context: &Context) -> DiResult<Instance> {
        let mut slot = self.instance.lock();
        if let Some(instance) = slot.as_ref() {
            return Ok(instance.clone());
        }

        let instance = self.inner.get(context)?;
        *slot = Some(instance.clone());
        trace!("Cached singleton instance");
        Ok(instance)
    }

    fn dependencies(&self) -> &[ComponentRef] {
        self.inner.dependencies()
    }

    fn produces(&self) -> Option<Marker> {
        self.inner.produces()
    }
}

struct Pool {
    instances: Vec<Instance>,
    next: usize,
}

/// Builds up to `size` instances lazily, then cycles through them
pub struct PooledProvider {
    inner: SharedProvider,
    size: usize,
    pool: Mutex<Pool>,
}

impl PooledProvider {
    pub fn new(inner: SharedProvider, size: usize) -> Self {
        Self {
            inner,
            size,
            pool: Mutex::new(Pool {
                instances: Vec::with_capacity(size),
                next: 0,
            }),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

impl ComponentProvider for PooledProvider {
    fn get(&self, context: &Context) -> DiResult<Instance> {
        let mut pool = self.pool.lock();

        if pool.instances.len() < self.size {
            let instance = self.inner.get(context)?;
            pool.instances.push(instance.clone());
            pool.next += 1;
            trace!("Pool grew to {} of {}", pool.instances.len(), self.size);
            return Ok(instance);
        }

        // Full pool: len == size, so the index is in bounds.
        let instance = pool.instances[pool.next % self.size].clone();
        pool.next = pool.next.wrapping_add(1);
        Ok(instance)
    }

    fn dependencies(&self) -> &[ComponentRef] {
        self.inner.dependencies()
    }

    fn produces(&self) -> Option<Marker> {
        self.inner.produces()
    }
}
