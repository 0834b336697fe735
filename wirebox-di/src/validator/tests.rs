//! Tests for dependency graph validation

use super::*;
use crate::builder::ContextBuilder;
use crate::component::Qualifier;
use crate::context::Context;
use crate::provider::ComponentProvider;
use crate::scope::Scope;
use crate::service::{instance, Instance};
use std::sync::Arc;

struct A;
struct B;
struct C;
struct Root;
struct Missing;
struct Logger;
struct Dependency;
struct Skywalker;

/// Declares dependencies without a produced type, so it binds under any component
struct Declaring {
    dependencies: Vec<ComponentRef>,
}

impl ComponentProvider for Declaring {
    fn get(&self, _context: &Context) -> DiResult<Instance> {
        Ok(instance(()))
    }

    fn dependencies(&self) -> &[ComponentRef] {
        &self.dependencies
    }
}

fn declaring(dependencies: Vec<ComponentRef>) -> Declaring {
    Declaring { dependencies }
}

fn build(bindings: Vec<(Component, Vec<ComponentRef>)>) -> DiResult<Context> {
    let mut builder = ContextBuilder::new();
    builder.register_qualifier::<Skywalker>();
    for (component, dependencies) in bindings {
        builder.register_provider(component, declaring(dependencies))?;
    }
    builder.build()
}

fn cycle_members(err: DiError) -> FxHashSet<Component> {
    match err.components_involved() {
        Some(members) => members,
        None => panic!("Expected CyclicDependency, got {err}"),
    }
}

fn set(components: &[Component]) -> FxHashSet<Component> {
    components.iter().cloned().collect()
}

#[test]
fn test_two_cycle() {
    let err = build(vec![
        (Component::of::<A>(), vec![ComponentRef::of::<B>()]),
        (Component::of::<B>(), vec![ComponentRef::of::<A>()]),
    ])
    .unwrap_err();

    assert_eq!(
        cycle_members(err),
        set(&[Component::of::<A>(), Component::of::<B>()])
    );
}

#[test]
fn test_three_cycle() {
    let err = build(vec![
        (Component::of::<A>(), vec![ComponentRef::of::<B>()]),
        (Component::of::<B>(), vec![ComponentRef::of::<C>()]),
        (Component::of::<C>(), vec![ComponentRef::of::<A>()]),
    ])
    .unwrap_err();

    assert_eq!(
        cycle_members(err),
        set(&[Component::of::<A>(), Component::of::<B>(), Component::of::<C>()])
    );
}

#[test]
fn test_cycle_path_starts_at_repeated_component() {
    // Root -> A -> B -> A: Root is on the path but not on the cycle
    let err = build(vec![
        (Component::of::<Root>(), vec![ComponentRef::of::<A>()]),
        (Component::of::<A>(), vec![ComponentRef::of::<B>()]),
        (Component::of::<B>(), vec![ComponentRef::of::<A>()]),
    ])
    .unwrap_err();

    match err {
        DiError::CyclicDependency { components } => {
            assert_eq!(components, vec![Component::of::<A>(), Component::of::<B>()]);
        }
        other => panic!("Expected CyclicDependency, got {other}"),
    }
}

#[test]
fn test_self_dependency_is_a_cycle() {
    let err = build(vec![(Component::of::<A>(), vec![ComponentRef::of::<A>()])]).unwrap_err();
    assert_eq!(cycle_members(err), set(&[Component::of::<A>()]));
}

#[test]
fn test_missing_direct_dependency() {
    let err = build(vec![(Component::of::<A>(), vec![ComponentRef::of::<Missing>()])]).unwrap_err();

    match err {
        DiError::MissingDependency {
            component,
            dependency,
        } => {
            assert_eq!(component, Component::of::<A>());
            assert_eq!(dependency, Component::of::<Missing>());
        }
        other => panic!("Expected MissingDependency, got {other}"),
    }
}

#[test]
fn test_missing_deferred_dependency() {
    let err = build(vec![(Component::of::<A>(), vec![ComponentRef::deferred::<Missing>()])]).unwrap_err();

    assert!(matches!(
        err,
        DiError::MissingDependency { ref dependency, .. } if *dependency == Component::of::<Missing>()
    ));
}

#[test]
fn test_missing_dependency_behind_singleton_scope() {
    let mut builder = ContextBuilder::new();
    builder
        .bind::<()>()
        .in_scope(Scope::Singleton)
        .to_provider(declaring(vec![ComponentRef::of::<Missing>()]))
        .unwrap();

    assert!(matches!(
        builder.build(),
        Err(DiError::MissingDependency { .. })
    ));
}

#[test]
fn test_missing_qualified_dependency() {
    let owner = Component::of::<A>().qualified(Qualifier::named("Owner"));
    let wanted = Component::of::<Dependency>().qualified(Qualifier::marker::<Skywalker>());

    let err = build(vec![
        (Component::of::<Dependency>(), vec![]),
        (owner.clone(), vec![ComponentRef::direct(wanted.clone())]),
    ])
    .unwrap_err();

    match err {
        DiError::MissingDependency {
            component,
            dependency,
        } => {
            assert_eq!(component, owner);
            assert_eq!(dependency, wanted);
        }
        other => panic!("Expected MissingDependency, got {other}"),
    }
}

#[test]
fn test_deferred_back_edge_is_not_a_cycle() {
    let result = build(vec![
        (Component::of::<A>(), vec![ComponentRef::of::<B>()]),
        (Component::of::<B>(), vec![ComponentRef::deferred::<A>()]),
    ]);
    assert!(result.is_ok());
}

#[test]
fn test_deferred_self_reference_is_not_a_cycle() {
    let result = build(vec![(
        Component::of::<A>(),
        vec![ComponentRef::deferred::<A>()],
    )]);
    assert!(result.is_ok());
}

#[test]
fn test_same_type_with_different_qualifiers_is_not_a_cycle() {
    let chosen = Component::of::<Dependency>().qualified(Qualifier::named("ChosenOne"));
    let skywalker = Component::of::<Dependency>().qualified(Qualifier::marker::<Skywalker>());

    let result = build(vec![
        (chosen.clone(), vec![]),
        (skywalker.clone(), vec![ComponentRef::direct(chosen)]),
        (Component::of::<Dependency>(), vec![ComponentRef::direct(skywalker)]),
    ]);
    assert!(result.is_ok());
}

#[test]
fn test_first_offending_edge_wins() {
    // A's first dependency is missing; the A <-> B cycle is never reached
    let err = build(vec![
        (
            Component::of::<A>(),
            vec![ComponentRef::of::<Missing>(), ComponentRef::of::<B>()],
        ),
        (Component::of::<B>(), vec![ComponentRef::of::<A>()]),
    ])
    .unwrap_err();

    assert!(matches!(err, DiError::MissingDependency { .. }));
}

#[test]
fn test_shared_leaf_is_walked_once() {
    struct Layer<const N: usize>;

    let mut providers: FxHashMap<Component, SharedProvider> = FxHashMap::default();
    let mut order = Vec::new();

    let mut bind = |component: Component, provider: Declaring| {
        order.push(component.clone());
        providers.insert(component, Arc::new(provider));
    };

    bind(Component::of::<Logger>(), declaring(vec![]));
    bind(
        Component::of::<Layer<0>>(),
        declaring(vec![ComponentRef::of::<Logger>()]),
    );
    bind(
        Component::of::<Layer<1>>(),
        declaring(vec![ComponentRef::of::<Logger>(), ComponentRef::of::<Layer<0>>()]),
    );
    bind(
        Component::of::<Layer<2>>(),
        declaring(vec![ComponentRef::of::<Layer<1>>(), ComponentRef::of::<Logger>()]),
    );
    bind(
        Component::of::<Layer<3>>(),
        declaring(vec![
            ComponentRef::of::<Layer<2>>(),
            ComponentRef::of::<Layer<1>>(),
            ComponentRef::of::<Logger>(),
        ]),
    );

    let stats = Validator::new(&providers).validate(&order).unwrap();

    // Each dependency list is walked exactly once: 5 lists, 8 references
    assert_eq!(stats.components, 5);
    assert_eq!(stats.edges, 8);
}

#[test]
fn test_roots_are_validated_in_registration_order() {
    let mut providers: FxHashMap<Component, SharedProvider> = FxHashMap::default();
    providers.insert(
        Component::of::<A>(),
        Arc::new(declaring(vec![ComponentRef::of::<Missing>()])),
    );
    providers.insert(
        Component::of::<B>(),
        Arc::new(declaring(vec![ComponentRef::of::<C>()])),
    );

    let order = vec![Component::of::<B>(), Component::of::<A>()];
    match Validator::new(&providers).validate(&order).unwrap_err() {
        DiError::MissingDependency { component, .. } => assert_eq!(component, Component::of::<B>()),
        other => panic!("Expected MissingDependency, got {other}"),
    }
}
