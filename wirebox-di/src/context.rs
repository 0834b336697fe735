//! The finalized, read-only lookup surface

use crate::component::{Component, ComponentRef, RefKind};
use crate::error::{DiError, DiResult};
use crate::provider::SharedProvider;
use crate::service::{downcast, Instance, Service};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

thread_local! {
    /// Components whose provider is running on this thread, tagged with the
    /// address of the context they belong to
    static UNDER_CONSTRUCTION: RefCell<Vec<(usize, Component)>> = RefCell::new(Vec::new());
}

/// Marks one component as under construction on the current thread until dropped
struct ConstructionGuard;

impl ConstructionGuard {
    fn enter(context: usize, component: &Component) -> DiResult<Self> {
        UNDER_CONSTRUCTION.with(|stack| {
            let mut stack = stack.borrow_mut();
            let repeated = stack
                .iter()
                .position(|(owner, pending)| *owner == context && pending == component);

            if let Some(start) = repeated {
                let components: Vec<Component> = stack[start..]
                    .iter()
                    .filter(|(owner, _)| *owner == context)
                    .map(|(_, pending)| pending.clone())
                    .collect();
                debug!("Re-entrant lookup of {}", component);
                return Err(DiError::ReentrantConstruction { components });
            }

            stack.push((context, component.clone()));
            Ok(ConstructionGuard)
        })
    }
}

impl Drop for ConstructionGuard {
    fn drop(&mut self) {
        let _ = UNDER_CONSTRUCTION.try_with(|stack| stack.borrow_mut().pop());
    }
}

pub(crate) struct ContextInner {
    providers: FxHashMap<Component, SharedProvider>,
    /// Registration order, for stable iteration
    order: Vec<Component>,
}

/// Validated, immutable mapping from components to providers.
///
/// A context only exists once validation has succeeded, so every dependency
/// declared by a bound provider is itself bound. Cloning is cheap; clones
/// share providers and their scope caches.
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Context {
    pub(crate) fn new(providers: FxHashMap<Component, SharedProvider>, order: Vec<Component>) -> Self {
        Self {
            inner: Arc::new(ContextInner { providers, order }),
        }
    }

    /// Look up a component.
    ///
    /// Returns `Ok(None)` when the component is not bound. A direct request
    /// invokes the provider now; a deferred request returns a [`Deferred`]
    /// factory that performs the direct lookup when invoked. Errors come from
    /// construction functions and from asking for the wrong `T`. A
    /// construction function that asks for a component still under
    /// construction on its own thread gets [`DiError::ReentrantConstruction`].
    pub fn get<T: Service>(&self, reference: &ComponentRef) -> DiResult<Option<Resolved<T>>> {
        let component = reference.component();
        let Some(provider) = self.inner.providers.get(component) else {
            trace!("No binding for {}", component);
            return Ok(None);
        };

        match reference.kind() {
            RefKind::Direct => {
                let instance = self.construct(component, provider)?;
                Ok(Some(Resolved::Instance(downcast(instance, component)?)))
            }
            RefKind::Deferred => Ok(Some(Resolved::Deferred(Deferred::new(
                Arc::downgrade(&self.inner),
                component.clone(),
            )))),
        }
    }

    /// Instance of the referenced component, constructed now.
    ///
    /// The reference kind is ignored. Meant for construction functions,
    /// whose declared dependencies are guaranteed to be bound.
    pub fn require<T: Service>(&self, reference: &ComponentRef) -> DiResult<Arc<T>> {
        self.instance(reference.component())
    }

    /// Factory for the referenced component
    pub fn deferred<T: Service>(&self, reference: &ComponentRef) -> DiResult<Deferred<T>> {
        let component = reference.component();
        if !self.contains(component) {
            return Err(DiError::Unresolved {
                component: component.clone(),
            });
        }
        Ok(Deferred::new(Arc::downgrade(&self.inner), component.clone()))
    }

    pub fn contains(&self, component: &Component) -> bool {
        self.inner.providers.contains_key(component)
    }

    /// Bound components in registration order
    pub fn components(&self) -> impl Iterator<Item = &Component> + '_ {
        self.inner.order.iter()
    }

    pub fn len(&self) -> usize {
        self.inner.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.order.is_empty()
    }

    fn instance<T: Service>(&self, component: &Component) -> DiResult<Arc<T>> {
        let provider = self
            .inner
            .providers
            .get(component)
            .ok_or_else(|| DiError::Unresolved {
                component: component.clone(),
            })?;
        downcast(self.construct(component, provider)?, component)
    }

    /// Run `provider` for `component`, refusing same-thread re-entry.
    ///
    /// Scope wrappers hold a lock while their inner provider runs, so a
    /// re-entrant lookup would otherwise never return.
    fn construct(&self, component: &Component, provider: &SharedProvider) -> DiResult<Instance> {
        let _guard = ConstructionGuard::enter(Arc::as_ptr(&self.inner) as usize, component)?;
        provider.get(self)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("components", &self.inner.order)
            .finish()
    }
}

/// Outcome of [`Context::get`], matching the reference kind
pub enum Resolved<T> {
    Instance(Arc<T>),
    Deferred(Deferred<T>),
}

impl<T: Service> Resolved<T> {
    pub fn into_instance(self) -> Option<Arc<T>> {
        match self {
            Resolved::Instance(instance) => Some(instance),
            Resolved::Deferred(_) => None,
        }
    }

    pub fn into_deferred(self) -> Option<Deferred<T>> {
        match self {
            Resolved::Deferred(deferred) => Some(deferred),
            Resolved::Instance(_) => None,
        }
    }

    /// Instance, invoking the factory if this is a deferred result
    pub fn resolve(self) -> DiResult<Arc<T>> {
        match self {
            Resolved::Instance(instance) => Ok(instance),
            Resolved::Deferred(deferred) => deferred.get(),
        }
    }
}

impl<T> fmt::Debug for Resolved<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolved::Instance(_) => f.write_str("Resolved::Instance(..)"),
            Resolved::Deferred(deferred) => write!(f, "Resolved::Deferred({})", deferred.component),
        }
    }
}

/// Zero-argument factory for a component.
///
/// Holds the context weakly, so instances that keep a `Deferred` around do
/// not keep their own context alive.
pub struct Deferred<T> {
    context: Weak<ContextInner>,
    component: Component,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Service> Deferred<T> {
    fn new(context: Weak<ContextInner>, component: Component) -> Self {
        Self {
            context,
            component,
            _marker: PhantomData,
        }
    }

    /// Perform the direct lookup now
    pub fn get(&self) -> DiResult<Arc<T>> {
        let inner = self.context.upgrade().ok_or_else(|| DiError::ContextDropped {
            component: self.component.clone(),
        })?;
        Context { inner }.instance(&self.component)
    }
}

impl<T> Deferred<T> {
    pub fn component(&self) -> &Component {
        &self.component
    }
}

impl<T> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
            component: self.component.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("component", &self.component)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ContextBuilder;
    use crate::component::Qualifier;

    #[derive(Debug, PartialEq)]
    struct Settings {
        verbose: bool,
    }

    fn settings_context() -> Context {
        let mut builder = ContextBuilder::new();
        builder
            .register_instance(Component::of::<Settings>(), Settings { verbose: true })
            .unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn test_direct_lookup() {
        let ctx = settings_context();
        let settings = ctx
            .get::<Settings>(&ComponentRef::of::<Settings>())
            .unwrap()
            .and_then(Resolved::into_instance)
            .unwrap();
        assert!(settings.verbose);
    }

    #[test]
    fn test_missing_component_is_none() {
        let ctx = settings_context();
        assert!(ctx.get::<String>(&ComponentRef::of::<String>()).unwrap().is_none());
        assert!(ctx
            .get::<Settings>(&ComponentRef::of::<Settings>().qualified(Qualifier::named("other")))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_deferred_lookup_returns_factory() {
        let ctx = settings_context();
        let deferred = ctx
            .get::<Settings>(&ComponentRef::deferred::<Settings>())
            .unwrap()
            .and_then(Resolved::into_deferred)
            .unwrap();

        assert_eq!(deferred.component(), &Component::of::<Settings>());
        assert!(deferred.get().unwrap().verbose);
    }

    #[test]
    fn test_deferred_after_context_dropped() {
        let ctx = settings_context();
        let deferred = ctx.deferred::<Settings>(&ComponentRef::of::<Settings>()).unwrap();
        drop(ctx);

        assert!(matches!(deferred.get(), Err(DiError::ContextDropped { .. })));
    }

    #[test]
    fn test_wrong_lookup_type() {
        let ctx = settings_context();
        let result = ctx.get::<String>(&ComponentRef::of::<Settings>());
        assert!(matches!(result, Err(DiError::TypeMismatch { .. })));
    }

    #[test]
    fn test_require_unbound() {
        let ctx = settings_context();
        let result = ctx.require::<String>(&ComponentRef::of::<String>());
        assert!(matches!(result, Err(DiError::Unresolved { .. })));
        assert!(matches!(
            ctx.deferred::<String>(&ComponentRef::of::<String>()),
            Err(DiError::Unresolved { .. })
        ));
    }

    #[test]
    fn test_context_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Context>();
        assert_send_sync::<Deferred<Settings>>();
    }
}
