//! Binding registry and context builder

use crate::component::{Component, Marker, Named, Qualifier, ScopeMarker};
use crate::context::Context;
use crate::error::{DiError, DiResult};
use crate::provider::{ComponentProvider, InstanceProvider, SharedProvider};
use crate::scope::{Scope, ScopeTable};
use crate::service::Service;
use crate::validator::Validator;
use rustc_hash::{FxHashMap, FxHashSet};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// One registration: a provider bound under one or more components
struct PendingBinding {
    components: Vec<Component>,
    provider: SharedProvider,
    scope: Option<Scope>,
}

/// Accumulates bindings and produces a validated [`Context`].
///
/// The builder is meant to be populated from a single thread during
/// start-up. Qualifiers are checked as bindings are registered; scopes and
/// the dependency graph are checked by [`ContextBuilder::build`].
pub struct ContextBuilder {
    bindings: Vec<PendingBinding>,
    bound: FxHashSet<Component>,
    qualifier_kinds: FxHashSet<Marker>,
    scopes: ScopeTable,
    allow_overrides: bool,
}

impl ContextBuilder {
    /// Create a new builder. [`Named`] is the only qualifier kind known up front.
    pub fn new() -> Self {
        let mut qualifier_kinds = FxHashSet::default();
        qualifier_kinds.insert(Marker::of::<Named>());

        Self {
            bindings: Vec::new(),
            bound: FxHashSet::default(),
            qualifier_kinds,
            scopes: ScopeTable::new(),
            allow_overrides: false,
        }
    }

    /// Use `scopes` as the custom scope table
    pub fn with_scopes(mut self, scopes: ScopeTable) -> Self {
        self.scopes = scopes;
        self
    }

    /// Let later bindings replace earlier ones instead of failing
    pub fn allow_overrides(&mut self, allow: bool) -> &mut Self {
        self.allow_overrides = allow;
        self
    }

    /// Declare `K` as a qualifier-capable kind
    pub fn register_qualifier<K: ?Sized + 'static>(&mut self) -> &mut Self {
        self.qualifier_kinds.insert(Marker::of::<K>());
        self
    }

    /// Register the wrapper factory for a custom scope
    pub fn register_scope<F>(&mut self, marker: ScopeMarker, factory: F) -> &mut Self
    where
        F: Fn(SharedProvider) -> SharedProvider + Send + Sync + 'static,
    {
        trace!("Registered scope {}", marker);
        self.scopes.register(marker, factory);
        self
    }

    /// Bind `component` to a pre-built value
    pub fn register_instance<T: Service>(&mut self, component: Component, value: T) -> DiResult<&mut Self> {
        self.add_binding(vec![component], Arc::new(InstanceProvider::new(value)), None)?;
        Ok(self)
    }

    /// Bind `component` to a provider, in the scope the provider declares
    pub fn register_provider<P>(&mut self, component: Component, provider: P) -> DiResult<&mut Self>
    where
        P: ComponentProvider + 'static,
    {
        let scope = provider.scope().copied();
        self.add_binding(vec![component], Arc::new(provider), scope)?;
        Ok(self)
    }

    /// Start a fluent binding for type `T`
    pub fn bind<T: Service>(&mut self) -> BindingBuilder<'_, T> {
        BindingBuilder {
            builder: self,
            qualifiers: Vec::new(),
            scope: None,
            _marker: PhantomData,
        }
    }

    /// Add the bindings of a module
    pub fn add_module<M: Module>(&mut self, module: &M) -> DiResult<&mut Self> {
        module.configure(self)?;
        Ok(self)
    }

    /// Wrap every binding in its scope, validate the graph and freeze it.
    ///
    /// A binding whose components were all re-bound later is dropped
    /// without being scope-wrapped.
    pub fn build(self) -> DiResult<Context> {
        let mut latest: FxHashMap<Component, usize> = FxHashMap::default();
        let mut order = Vec::with_capacity(self.bound.len());
        for (index, binding) in self.bindings.iter().enumerate() {
            for component in &binding.components {
                if latest.insert(component.clone(), index).is_none() {
                    order.push(component.clone());
                }
            }
        }

        let mut providers: FxHashMap<Component, SharedProvider> = FxHashMap::default();
        for (index, binding) in self.bindings.into_iter().enumerate() {
            let live: Vec<Component> = binding
                .components
                .into_iter()
                .filter(|component| latest.get(component) == Some(&index))
                .collect();
            let Some(first) = live.first() else {
                trace!("Skipping overridden binding #{}", index);
                continue;
            };

            let provider = self.scopes.wrap(first, binding.provider, binding.scope.as_ref())?;
            for component in live {
                providers.insert(component, provider.clone());
            }
        }

        let stats = Validator::new(&providers).validate(&order)?;
        debug!(
            "Built context with {} components ({} dependency edges checked)",
            order.len(),
            stats.edges
        );

        Ok(Context::new(providers, order))
    }

    pub(crate) fn add_binding(
        &mut self,
        components: Vec<Component>,
        provider: SharedProvider,
        scope: Option<Scope>,
    ) -> DiResult<()> {
        let produces = provider.produces();

        for (index, component) in components.iter().enumerate() {
            if let Some(produced) = produces {
                if produced.id() != component.type_id() {
                    return Err(DiError::TypeMismatch {
                        component: component.clone(),
                        actual: produced.name(),
                    });
                }
            }

            if let Some(qualifier) = component.qualifier() {
                if !self.qualifier_kinds.contains(&qualifier.kind()) {
                    return Err(DiError::IllegalBinding {
                        component: component.clone(),
                        qualifier: qualifier.clone(),
                    });
                }
            }

            let repeated = components[..index].contains(component);
            if repeated || self.bound.contains(component) {
                if !self.allow_overrides {
                    return Err(DiError::DuplicateBinding {
                        component: component.clone(),
                    });
                }
                warn!("Overriding binding for {}", component);
            }
        }

        for component in &components {
            trace!("Registered {}", component);
            self.bound.insert(component.clone());
        }
        self.bindings.push(PendingBinding {
            components,
            provider,
            scope,
        });
        Ok(())
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Fluent binding for one type, possibly under several qualifiers.
///
/// All qualifiers share the same scoped provider, so a singleton bound under
/// two qualifiers is one instance.
#[must_use = "a binding does nothing until `to_instance` or `to_provider` is called"]
pub struct BindingBuilder<'a, T> {
    builder: &'a mut ContextBuilder,
    qualifiers: Vec<Qualifier>,
    scope: Option<Scope>,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T: Service> BindingBuilder<'a, T> {
    /// Add a qualifier
    pub fn qualified(mut self, qualifier: Qualifier) -> Self {
        self.qualifiers.push(qualifier);
        self
    }

    /// Add a [`Named`] qualifier
    pub fn named(self, name: &str) -> Self {
        self.qualified(Qualifier::named(name))
    }

    /// Scope for this binding, overriding the one the provider declares
    pub fn in_scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Bind to a pre-built value
    pub fn to_instance(self, value: T) -> DiResult<&'a mut ContextBuilder> {
        let components = self.components();
        self.builder
            .add_binding(components, Arc::new(InstanceProvider::new(value)), self.scope)?;
        Ok(self.builder)
    }

    /// Bind to a provider
    pub fn to_provider<P>(self, provider: P) -> DiResult<&'a mut ContextBuilder>
    where
        P: ComponentProvider + 'static,
    {
        let components = self.components();
        let scope = self.scope.or_else(|| provider.scope().copied());
        self.builder.add_binding(components, Arc::new(provider), scope)?;
        Ok(self.builder)
    }

    fn components(&self) -> Vec<Component> {
        if self.qualifiers.is_empty() {
            return vec![Component::of::<T>()];
        }
        self.qualifiers
            .iter()
            .map(|qualifier| Component::of::<T>().qualified(qualifier.clone()))
            .collect()
    }
}

/// Trait for groups of bindings
pub trait Module {
    /// Register this module's bindings
    fn configure(&self, builder: &mut ContextBuilder) -> DiResult<()>;
}
