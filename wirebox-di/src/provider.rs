//! Component provider interfaces and the raw provider variants
//!
//! Scope wrappers live in [`crate::scope`]; everything here produces
//! instances without caching.

use crate::component::{ComponentRef, Marker};
use crate::context::Context;
use crate::error::DiResult;
use crate::scope::Scope;
use crate::service::{Instance, Service};
use std::fmt;
use std::sync::Arc;

/// Something that can produce instances of one component
pub trait ComponentProvider: Send + Sync {
    /// Produce an instance, resolving dependencies through `context`
    fn get(&self, context: &Context) -> DiResult<Instance>;

    /// Everything `get` may ask the context for
    fn dependencies(&self) -> &[ComponentRef] {
        &[]
    }

    /// Scope the provider declares for itself, if any
    fn scope(&self) -> Option<&Scope> {
        None
    }

    /// Type of the instances `get` returns, when the provider knows it.
    /// Bindings whose component type differs are rejected at registration.
    fn produces(&self) -> Option<Marker> {
        None
    }
}

/// Provider shared between the bindings that use it
pub type SharedProvider = Arc<dyn ComponentProvider>;

/// Construction function of an [`InjectionProvider`]
pub type ConstructFn = Arc<dyn Fn(&Context) -> DiResult<Instance> + Send + Sync>;

/// Provider for a pre-built value
pub struct InstanceProvider {
    instance: Instance,
    produces: Option<Marker>,
}

impl InstanceProvider {
    pub fn new<T: Service>(value: T) -> Self {
        Self {
            instance: Arc::new(value),
            produces: Some(Marker::of::<T>()),
        }
    }

    /// Provider for an already erased instance; its type is not checked
    pub fn from_instance(instance: Instance) -> Self {
        Self {
            instance,
            produces: None,
        }
    }
}

impl ComponentProvider for InstanceProvider {
    fn get(&self, _context: &Context) -> DiResult<Instance> {
        Ok(self.instance.clone())
    }

    fn produces(&self) -> Option<Marker> {
        self.produces
    }
}

impl fmt::Debug for InstanceProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceProvider")
            .field("produces", &self.produces)
            .finish_non_exhaustive()
    }
}

/// Provider described by a declared dependency list and a construction function.
///
/// This is what a discovery step hands to the container for each concrete
/// type: every [`ComponentRef`] the construction function will look up, plus
/// an optional scope taken from the type's own declaration. The construction
/// function must not look up anything it did not declare; undeclared lookups
/// escape validation.
///
/// ```
/// use wirebox_di::prelude::*;
/// use std::sync::Arc;
///
/// struct Config;
/// struct Server {
///     config: Arc<Config>,
/// }
///
/// let provider = InjectionProvider::new(|ctx: &Context| {
///     Ok(Server {
///         config: ctx.require(&ComponentRef::of::<Config>())?,
///     })
/// })
/// .depends_on(ComponentRef::of::<Config>())
/// .with_scope(Scope::Singleton);
///
/// assert_eq!(provider.dependencies().len(), 1);
/// assert_eq!(provider.produces().map(|t| t.short_name()), Some("Server"));
/// ```
#[derive(Clone)]
pub struct InjectionProvider {
    produces: Marker,
    dependencies: Vec<ComponentRef>,
    construct: ConstructFn,
    scope: Option<Scope>,
}

impl InjectionProvider {
    /// Create a provider from a construction function
    pub fn new<T, F>(construct: F) -> Self
    where
        T: Service,
        F: Fn(&Context) -> DiResult<T> + Send + Sync + 'static,
    {
        Self {
            produces: Marker::of::<T>(),
            dependencies: Vec::new(),
            construct: Arc::new(move |context: &Context| {
                construct(context).map(|value| Arc::new(value) as Instance)
            }),
            scope: None,
        }
    }

    /// Provider for a type with no dependencies
    pub fn from_default<T: Service + Default>() -> Self {
        Self::new(|_| Ok(T::default()))
    }

    /// Declare one more dependency
    pub fn depends_on(mut self, dependency: ComponentRef) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// Declare several dependencies, in order
    pub fn with_dependencies(mut self, dependencies: impl IntoIterator<Item = ComponentRef>) -> Self {
        self.dependencies.extend(dependencies);
        self
    }

    /// Scope declared by the component type itself
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }
}

impl ComponentProvider for InjectionProvider {
    fn get(&self, context: &Context) -> DiResult<Instance> {
        (self.construct)(context)
    }

    fn dependencies(&self) -> &[ComponentRef] {
        &self.dependencies
    }

    fn scope(&self) -> Option<&Scope> {
        self.scope.as_ref()
    }

    fn produces(&self) -> Option<Marker> {
        Some(self.produces)
    }
}

impl fmt::Debug for InjectionProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectionProvider")
            .field("produces", &self.produces)
            .field("dependencies", &self.dependencies)
            .field("scope", &self.scope)
            .finish()
    }
}
