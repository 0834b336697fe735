//! Configuration-based bindings
//!
//! Names in the file refer to a [`ProviderCatalog`]; scopes default to the
//! one the catalog's provider declares.
//!
//! ```
//! use wirebox_di::prelude::*;
//!
//! #[derive(Clone)]
//! struct Logger;
//! struct Connection;
//! struct Request;
//!
//! let mut catalog = ProviderCatalog::new();
//! catalog
//!     .register_instance("logger", Logger)
//!     .register_provider::<Connection, _>("connection", || {
//!         InjectionProvider::new(|_: &Context| Ok(Connection))
//!             .depends_on(ComponentRef::of::<Logger>())
//!     })
//!     .register_scope("request", wirebox_di::ScopeMarker::of::<Request>());
//!
//! let config = ContainerConfig::from_toml(r#"
//!     allow_overrides = false
//!
//!     [[bindings]]
//!     component = "logger"
//!     scope = "singleton"
//!
//!     [[bindings]]
//!     component = "connection"
//!     named = "replica"
//!     scope = { pooled = 4 }
//!
//!     [[bindings]]
//!     component = "connection"
//!     named = "session"
//!     scope = { custom = "request" }
//! "#)?;
//!
//! let mut builder = ContextBuilder::new();
//! builder.register_scope(wirebox_di::ScopeMarker::of::<Request>(), |inner| inner);
//! config.apply_to_builder(&catalog, &mut builder)?;
//!
//! let context = builder.build()?;
//! assert_eq!(context.len(), 3);
//! # Ok::<(), DiError>(())
//! ```

use crate::builder::ContextBuilder;
use crate::catalog::ProviderCatalog;
use crate::component::Qualifier;
use crate::error::{DiError, DiResult};
use crate::provider::ComponentProvider;
use crate::scope::Scope;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One binding entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindingConfig {
    /// Catalog name of the provider
    pub component: String,
    /// Optional [`Named`](crate::component::Named) qualifier
    #[serde(default)]
    pub named: Option<String>,
    /// Scope override; the provider's own scope applies when absent
    #[serde(default)]
    pub scope: Option<ScopeConfig>,
}

/// Scope configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeConfig {
    Singleton,
    Pooled(usize),
    /// Catalog name of a custom scope
    Custom(String),
}

impl ScopeConfig {
    fn resolve(&self, catalog: &ProviderCatalog) -> DiResult<Scope> {
        match self {
            ScopeConfig::Singleton => Ok(Scope::Singleton),
            ScopeConfig::Pooled(size) => Ok(Scope::Pooled(*size)),
            ScopeConfig::Custom(name) => catalog
                .scope(name)
                .map(Scope::Custom)
                .ok_or_else(|| DiError::Config(format!("Unknown scope: {}", name))),
        }
    }
}

/// Container configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerConfig {
    /// Let later bindings replace earlier ones
    #[serde(default)]
    pub allow_overrides: bool,
    /// Bindings, in registration order
    #[serde(default)]
    pub bindings: Vec<BindingConfig>,
}

impl ContainerConfig {
    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> DiResult<Self> {
        toml::from_str(toml_str)
            .map_err(|e| DiError::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Load configuration from JSON string
    pub fn from_json(json_str: &str) -> DiResult<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| DiError::Config(format!("Failed to parse JSON: {}", e)))
    }

    /// Register every configured binding on `builder`
    pub fn apply_to_builder(&self, catalog: &ProviderCatalog, builder: &mut ContextBuilder) -> DiResult<()> {
        if self.allow_overrides {
            builder.allow_overrides(true);
        }

        for binding in &self.bindings {
            let (mut component, provider) = catalog
                .create(&binding.component)
                .ok_or_else(|| DiError::Config(format!("Unknown component: {}", binding.component)))?;

            if let Some(name) = &binding.named {
                component = component.qualified(Qualifier::named(name.as_str()));
            }

            let scope = match &binding.scope {
                Some(scope) => Some(scope.resolve(catalog)?),
                None => provider.scope().copied(),
            };

            debug!("Configured binding for {}", component);
            builder.add_binding(vec![component], provider, scope)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_forms() {
        let config = ContainerConfig::from_toml(
            r#"
            [[bindings]]
            component = "a"
            scope = "singleton"

            [[bindings]]
            component = "b"
            scope = { pooled = 3 }

            [[bindings]]
            component = "c"
            scope = { custom = "request" }

            [[bindings]]
            component = "d"
            named = "primary"
            "#,
        )
        .unwrap();

        let scopes: Vec<_> = config.bindings.iter().map(|b| b.scope.clone()).collect();
        assert_eq!(
            scopes,
            vec![
                Some(ScopeConfig::Singleton),
                Some(ScopeConfig::Pooled(3)),
                Some(ScopeConfig::Custom("request".to_string())),
                None,
            ]
        );
        assert_eq!(config.bindings[3].named.as_deref(), Some("primary"));
        assert!(!config.allow_overrides);
    }

    #[test]
    fn test_invalid_toml() {
        let result = ContainerConfig::from_toml("[[bindings]]\nscope = 12");
        assert!(matches!(result, Err(DiError::Config(_))));
    }
}
