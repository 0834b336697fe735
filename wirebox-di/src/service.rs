//! Type-erased service instances

use crate::component::Component;
use crate::error::{DiError, DiResult};
use downcast_rs::{impl_downcast, DowncastSync};
use std::any::Any;
use std::sync::Arc;

/// Trait that all services must implement
pub trait Service: DowncastSync {}

impl_downcast!(sync Service);

/// Blanket implementation for all suitable types
impl<T: Any + Send + Sync> Service for T {}

/// Shared, type-erased instance as stored and handed out by providers
pub type Instance = Arc<dyn Service>;

/// Erase a concrete value into an [`Instance`]
pub fn instance<T: Service>(value: T) -> Instance {
    Arc::new(value)
}

/// Recover the concrete type of an instance produced for `component`
pub(crate) fn downcast<T: Service>(instance: Instance, component: &Component) -> DiResult<Arc<T>> {
    <dyn Service>::downcast_arc::<T>(instance).map_err(|_| DiError::TypeMismatch {
        component: component.clone(),
        actual: std::any::type_name::<T>(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Greeting(&'static str);

    #[test]
    fn test_downcast_roundtrip_keeps_identity() {
        let erased = instance(Greeting("hi"));
        let again = erased.clone();

        let typed = downcast::<Greeting>(erased, &Component::of::<Greeting>()).unwrap();
        let typed_again = downcast::<Greeting>(again, &Component::of::<Greeting>()).unwrap();

        assert_eq!(*typed, Greeting("hi"));
        assert!(Arc::ptr_eq(&typed, &typed_again));
    }

    #[test]
    fn test_downcast_to_wrong_type() {
        let erased = instance(Greeting("hi"));
        let result = downcast::<String>(erased, &Component::of::<Greeting>());
        assert!(matches!(result, Err(DiError::TypeMismatch { .. })));
    }
}
