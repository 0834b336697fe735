//! Build-time validation of the dependency graph
//!
//! Every bound component is a root. From each unverified root we walk the
//! declared dependencies depth-first with an explicit stack, which doubles as
//! the current path for cycle detection. Components whose whole subgraph has
//! been checked go into a shared verified set and are never walked again, so
//! each dependency list is visited at most once per build.
//!
//! Deferred references must point at bound components but add no edge: the
//! lookup happens after construction, so they cannot close a cycle.

use crate::component::{Component, ComponentRef};
use crate::error::{DiError, DiResult};
use crate::provider::SharedProvider;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

/// Counters collected during one validation run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ValidationStats {
    /// Components whose dependency list was walked
    pub components: usize,
    /// Dependency references examined
    pub edges: usize,
}

/// Position in one component's dependency list
struct Frame<'a> {
    component: &'a Component,
    dependencies: &'a [ComponentRef],
    next: usize,
}

pub(crate) struct Validator<'a> {
    providers: &'a FxHashMap<Component, SharedProvider>,
}

impl<'a> Validator<'a> {
    pub fn new(providers: &'a FxHashMap<Component, SharedProvider>) -> Self {
        Self { providers }
    }

    /// Check every root in `order`; the first offending edge aborts the run
    pub fn validate(&self, order: &[Component]) -> DiResult<ValidationStats> {
        let mut verified: FxHashSet<&'a Component> = FxHashSet::default();
        let mut stats = ValidationStats::default();

        for root in order {
            if verified.contains(root) {
                continue;
            }
            trace!("Validating dependencies of {}", root);
            self.visit(root, &mut verified, &mut stats)?;
        }

        debug!(
            "Validated {} components, {} dependency edges",
            stats.components, stats.edges
        );
        Ok(stats)
    }

    fn visit(
        &self,
        root: &Component,
        verified: &mut FxHashSet<&'a Component>,
        stats: &mut ValidationStats,
    ) -> DiResult<()> {
        let providers: &'a FxHashMap<Component, SharedProvider> = self.providers;
        let (root, provider) = providers
            .get_key_value(root)
            .ok_or_else(|| DiError::Unresolved {
                component: root.clone(),
            })?;

        let mut path = vec![Frame {
            component: root,
            dependencies: provider.dependencies(),
            next: 0,
        }];

        while let Some(frame) = path.last_mut() {
            let dependencies = frame.dependencies;
            let Some(dependency) = dependencies.get(frame.next) else {
                if let Some(done) = path.pop() {
                    verified.insert(done.component);
                    stats.components += 1;
                }
                continue;
            };
            frame.next += 1;
            stats.edges += 1;
            let requester = frame.component;

            let target = dependency.component();
            let Some((target, provider)) = providers.get_key_value(target) else {
                return Err(DiError::MissingDependency {
                    component: requester.clone(),
                    dependency: target.clone(),
                });
            };

            if dependency.is_deferred() || verified.contains(target) {
                continue;
            }

            if let Some(start) = path.iter().position(|f| f.component == target) {
                return Err(DiError::CyclicDependency {
                    components: path[start..].iter().map(|f| f.component.clone()).collect(),
                });
            }

            path.push(Frame {
                component: target,
                dependencies: provider.dependencies(),
                next: 0,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
