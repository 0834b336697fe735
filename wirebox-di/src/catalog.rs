//! Named provider catalog for configuration-driven bindings

use crate::component::{Component, ScopeMarker};
use crate::provider::{InjectionProvider, InstanceProvider, SharedProvider};
use crate::service::Service;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// Creates a fresh raw provider for one binding
pub type ProviderFactory = Arc<dyn Fn() -> SharedProvider + Send + Sync>;

#[derive(Clone)]
struct CatalogEntry {
    component: Component,
    factory: ProviderFactory,
}

/// Maps names used in configuration files to providers and scopes.
///
/// A catalog is an ordinary value handed to
/// [`ContainerConfig::apply_to_builder`](crate::config::ContainerConfig::apply_to_builder);
/// there is no process-wide instance.
#[derive(Clone, Default)]
pub struct ProviderCatalog {
    entries: FxHashMap<String, CatalogEntry>,
    scopes: FxHashMap<String, ScopeMarker>,
}

impl ProviderCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider factory for type `T` under `name`
    pub fn register_provider<T, F>(&mut self, name: &str, factory: F) -> &mut Self
    where
        T: Service,
        F: Fn() -> InjectionProvider + Send + Sync + 'static,
    {
        self.entries.insert(
            name.to_string(),
            CatalogEntry {
                component: Component::of::<T>(),
                factory: Arc::new(move || Arc::new(factory()) as SharedProvider),
            },
        );
        self
    }

    /// Register a value of type `T` under `name`; each binding gets a clone
    pub fn register_instance<T>(&mut self, name: &str, value: T) -> &mut Self
    where
        T: Service + Clone,
    {
        self.entries.insert(
            name.to_string(),
            CatalogEntry {
                component: Component::of::<T>(),
                factory: Arc::new(move || Arc::new(InstanceProvider::new(value.clone())) as SharedProvider),
            },
        );
        self
    }

    /// Make a custom scope addressable by `name`
    pub fn register_scope(&mut self, name: &str, marker: ScopeMarker) -> &mut Self {
        self.scopes.insert(name.to_string(), marker);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub(crate) fn scope(&self, name: &str) -> Option<ScopeMarker> {
        self.scopes.get(name).copied()
    }

    /// Fresh provider for `name`, together with the component it produces
    pub fn create(&self, name: &str) -> Option<(Component, SharedProvider)> {
        self.entries
            .get(name)
            .map(|entry| (entry.component.clone(), (entry.factory)()))
    }
}

impl fmt::Debug for ProviderCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("ProviderCatalog")
            .field("components", &names)
            .field("scopes", &self.scopes)
            .finish()
    }
}
