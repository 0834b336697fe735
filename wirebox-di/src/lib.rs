//! Dependency injection container with build-time graph validation
//!
//! Bindings are collected in a [`ContextBuilder`]. [`ContextBuilder::build`]
//! wraps each binding in its scope and checks that every declared dependency
//! is bound and that direct dependencies are acyclic, before anything is
//! constructed. The resulting [`Context`] is read-only and can be shared
//! between threads.
//!
//! ```
//! use wirebox_di::prelude::*;
//! use std::sync::Arc;
//!
//! struct Logger;
//! struct Repository {
//!     logger: Arc<Logger>,
//! }
//!
//! let mut builder = ContextBuilder::new();
//! builder.register_instance(Component::of::<Logger>(), Logger)?;
//! builder
//!     .bind::<Repository>()
//!     .in_scope(Scope::Singleton)
//!     .to_provider(
//!         InjectionProvider::new(|ctx: &Context| {
//!             Ok(Repository {
//!                 logger: ctx.require(&ComponentRef::of::<Logger>())?,
//!             })
//!         })
//!         .depends_on(ComponentRef::of::<Logger>()),
//!     )?;
//!
//! let context = builder.build()?;
//! let repository = context.require::<Repository>(&ComponentRef::of::<Repository>())?;
//! let again = context.require::<Repository>(&ComponentRef::of::<Repository>())?;
//! assert!(Arc::ptr_eq(&repository, &again));
//! # Ok::<(), DiError>(())
//! ```

pub mod builder;
pub mod component;
pub mod context;
pub mod error;
pub mod provider;
pub mod scope;
pub mod service;
mod validator;

#[cfg(feature = "config")]
pub mod catalog;

#[cfg(feature = "config")]
pub mod config;

pub use builder::{BindingBuilder, ContextBuilder, Module};
pub use component::{Component, ComponentRef, Marker, Named, Qualifier, RefKind, ScopeMarker};
pub use context::{Context, Deferred, Resolved};
pub use error::{DiError, DiResult};
pub use provider::{ComponentProvider, InjectionProvider, InstanceProvider, SharedProvider};
pub use scope::{PooledProvider, Scope, ScopeTable, SingletonProvider};
pub use service::{Instance, Service};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::{
        Component, ComponentProvider, ComponentRef, Context, ContextBuilder, Deferred, DiError,
        DiResult, InjectionProvider, Module, Qualifier, Resolved, Scope, Service,
    };

    #[cfg(feature = "config")]
    pub use crate::{catalog::ProviderCatalog, config::ContainerConfig};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_context() {
        let mut builder = ContextBuilder::new();
        builder
            .register_instance(Component::of::<String>(), "Hello, DI!".to_string())
            .unwrap();

        let context = builder.build().unwrap();
        let greeting = context.require::<String>(&ComponentRef::of::<String>()).unwrap();
        assert_eq!(greeting.as_str(), "Hello, DI!");
    }
}
