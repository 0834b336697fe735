//! Component identities and lookup requests
//!
//! A [`Component`] is what the container can produce: a Rust type plus an
//! optional [`Qualifier`]. A [`ComponentRef`] is a request for a component,
//! tagged with how the requester wants it delivered.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Opaque identity derived from a Rust type.
///
/// Markers name qualifier kinds and custom scopes. Two markers are equal
/// iff they were created from the same type.
#[derive(Clone, Copy)]
pub struct Marker {
    id: TypeId,
    name: &'static str,
}

impl Marker {
    /// Marker for the type `K`
    pub fn of<K: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<K>(),
            name: std::any::type_name::<K>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Full type name of the marker type
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Last path segment of the marker type name
    pub fn short_name(&self) -> &'static str {
        short_type_name(self.name)
    }
}

impl PartialEq for Marker {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Marker {}

impl Hash for Marker {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Marker({})", self.short_name())
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Markers that identify a custom scope
pub type ScopeMarker = Marker;

/// Built-in qualifier kind carrying a string value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Named;

/// Discriminator between several bindings of the same type
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Qualifier {
    kind: Marker,
    value: Option<Arc<str>>,
}

impl Qualifier {
    /// Qualifier of the built-in [`Named`] kind
    pub fn named(value: impl Into<Arc<str>>) -> Self {
        Self {
            kind: Marker::of::<Named>(),
            value: Some(value.into()),
        }
    }

    /// Value-less qualifier of kind `K`
    pub fn marker<K: ?Sized + 'static>() -> Self {
        Self {
            kind: Marker::of::<K>(),
            value: None,
        }
    }

    /// Qualifier of kind `K` carrying a value
    pub fn with_value<K: ?Sized + 'static>(value: impl Into<Arc<str>>) -> Self {
        Self {
            kind: Marker::of::<K>(),
            value: Some(value.into()),
        }
    }

    pub fn kind(&self) -> Marker {
        self.kind
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }
}

impl fmt::Debug for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "@{}({:?})", self.kind, value),
            None => write!(f, "@{}", self.kind),
        }
    }
}

/// Identity of something the container can produce
#[derive(Clone)]
pub struct Component {
    type_id: TypeId,
    type_name: &'static str,
    qualifier: Option<Qualifier>,
}

impl Component {
    /// Unqualified component for type `T`
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            qualifier: None,
        }
    }

    /// Same type, with the given qualifier
    pub fn qualified(mut self, qualifier: Qualifier) -> Self {
        self.qualifier = Some(qualifier);
        self
    }

    /// Same type, without a qualifier
    pub fn unqualified(&self) -> Self {
        Self {
            type_id: self.type_id,
            type_name: self.type_name,
            qualifier: None,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn qualifier(&self) -> Option<&Qualifier> {
        self.qualifier.as_ref()
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.qualifier == other.qualifier
    }
}

impl Eq for Component {}

impl Hash for Component {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
        self.qualifier.hash(state);
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(qualifier) => write!(f, "{} {}", qualifier, short_type_name(self.type_name)),
            None => f.write_str(short_type_name(self.type_name)),
        }
    }
}

/// How a requester wants a dependency delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    /// Constructed now; participates in cycle detection
    Direct,
    /// Handed over as a factory and constructed on demand
    Deferred,
}

/// A request for a component
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComponentRef {
    component: Component,
    kind: RefKind,
}

impl ComponentRef {
    pub fn new(component: Component, kind: RefKind) -> Self {
        Self { component, kind }
    }

    /// Direct request for the unqualified component of type `T`
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::new(Component::of::<T>(), RefKind::Direct)
    }

    /// Deferred request for the unqualified component of type `T`
    pub fn deferred<T: ?Sized + 'static>() -> Self {
        Self::new(Component::of::<T>(), RefKind::Deferred)
    }

    /// Direct request for an arbitrary component
    pub fn direct(component: Component) -> Self {
        Self::new(component, RefKind::Direct)
    }

    /// Same request, targeting the qualified component
    pub fn qualified(mut self, qualifier: Qualifier) -> Self {
        self.component = self.component.qualified(qualifier);
        self
    }

    pub fn component(&self) -> &Component {
        &self.component
    }

    pub fn kind(&self) -> RefKind {
        self.kind
    }

    pub fn is_deferred(&self) -> bool {
        self.kind == RefKind::Deferred
    }
}

fn short_type_name(name: &'static str) -> &'static str {
    // Generic arguments may contain `::`, so only look before the first `<`.
    let head = name.split('<').next().unwrap_or(name);
    match head.rfind("::") {
        Some(pos) => &name[pos + 2..],
        None => name,
    }
}
