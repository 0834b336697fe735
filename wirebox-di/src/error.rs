//! Error types for the DI container

use crate::component::{Component, Qualifier, ScopeMarker};
use rustc_hash::FxHashSet;
use thiserror::Error;

/// Result type alias for DI operations
pub type DiResult<T> = Result<T, DiError>;

/// Errors that can occur while building or using a context
#[derive(Error, Debug)]
pub enum DiError {
    /// A registered component depends on something that was never bound
    #[error("{component} depends on {dependency}, which is not bound")]
    MissingDependency {
        component: Component,
        dependency: Component,
    },

    /// Direct dependencies form a cycle
    #[error("Circular dependency detected: {}", format_cycle(.components))]
    CyclicDependency {
        /// Components on the cycle, in traversal order
        components: Vec<Component>,
    },

    /// Qualifier kind was never declared as qualifier-capable
    #[error("Illegal binding for {component}: {qualifier} is not a registered qualifier kind")]
    IllegalBinding {
        component: Component,
        qualifier: Qualifier,
    },

    /// Custom scope marker has no registered wrapper
    #[error("Unknown scope {scope} on {component}")]
    UnknownScope {
        component: Component,
        scope: ScopeMarker,
    },

    /// Component was bound twice while overrides are disabled
    #[error("Component {component} is already bound")]
    DuplicateBinding { component: Component },

    /// Scope parameters are unusable
    #[error("Invalid scope on {component}: {reason}")]
    InvalidScope { component: Component, reason: String },

    /// Value, provider or lookup type does not match the component type
    #[error("Type mismatch for {component}: got {actual}")]
    TypeMismatch {
        component: Component,
        actual: &'static str,
    },

    /// Component required at runtime is not bound
    #[error("Component not bound: {component}")]
    Unresolved { component: Component },

    /// Deferred lookup outlived its context
    #[error("Context dropped before deferred lookup of {component}")]
    ContextDropped { component: Component },

    /// A component was requested again on the thread that is constructing it
    #[error("Component requested while under construction: {}", format_cycle(.components))]
    ReentrantConstruction {
        /// Components under construction, from the requested one onwards
        components: Vec<Component>,
    },

    /// A construction function reported a failure
    #[error("Failed to construct {component}: {reason}")]
    ConstructionFailed { component: Component, reason: String },

    /// Configuration error
    #[cfg(feature = "config")]
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DiError {
    /// Construction failure for the component of type `T`
    pub fn construction<T: ?Sized + 'static>(reason: impl Into<String>) -> Self {
        DiError::ConstructionFailed {
            component: Component::of::<T>(),
            reason: reason.into(),
        }
    }

    /// Components involved in a cycle, as a set
    pub fn components_involved(&self) -> Option<FxHashSet<Component>> {
        match self {
            DiError::CyclicDependency { components } => Some(components.iter().cloned().collect()),
            _ => None,
        }
    }
}

fn format_cycle(components: &[Component]) -> String {
    let mut path: Vec<String> = components.iter().map(ToString::to_string).collect();
    if let Some(first) = components.first() {
        path.push(first.to_string());
    }
    path.join(" -> ")
}
