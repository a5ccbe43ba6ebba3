// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Features and their resolution into an installation order.
//!
//! ## Overview
//!
//! A [`Feature`] is a composable module that owns some state and attaches
//! capabilities to items. Features name the features they depend on and the
//! features they cannot coexist with. [`FeatureSet::resolve`] turns an unordered
//! list into a dependency-respecting installation order:
//!
//! - Depth-first post-order, starting from the given list order.
//! - Every dependency is visited before the feature that requires it.
//! - A name reachable through several paths installs once, at its earliest position.
//! - A missing dependency, a conflict, or a dependency cycle is a [`ResolveError`].
//!
//! The resolved order is fixed for the lifetime of a tree and reused by every rebuild.

use core::any::Any;
use std::collections::HashMap;
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, warn};

use crate::item::Registry;

/// A composable tree feature.
///
/// The feature value itself is the feature's durable state: it is installed
/// once per tree and outlives every rebuild. Items never carry feature state.
pub trait Feature: Any {
    /// Unique feature name, used for dependency and conflict declarations.
    fn name(&self) -> &'static str;

    /// Names of features that must be installed before this one.
    fn depends(&self) -> &'static [&'static str] {
        &[]
    }

    /// Names of features that must not be installed alongside this one.
    fn conflicts(&self) -> &'static [&'static str] {
        &[]
    }

    /// Called for every rebuild, in resolved order, after items are re-derived.
    ///
    /// Must be idempotent: project durable state onto the new items here.
    fn install(&mut self, _registry: &Registry) {}

    /// Called after every feature has been installed for a rebuild.
    fn on_rebuild(&mut self, _registry: &Registry) {}

    /// Expansion answer for the default visible-item walk.
    ///
    /// `None` means "no opinion"; a node's children are walked only if some
    /// feature answers `Some(true)`.
    fn is_expanded(&self, _key: &str) -> Option<bool> {
        None
    }

    /// Replacement for the visible-item sequence, as keys in document order.
    ///
    /// When several features return `Some`, the last in resolved order wins.
    fn visible_override(&self, _registry: &Registry) -> Option<Vec<String>> {
        None
    }

    /// Earliest instant at which [`Feature::poll`] has work to do.
    fn next_deadline(&self) -> Option<Instant> {
        None
    }

    /// Run deferred work that is due at `now`. Returns true if state changed.
    fn poll(&mut self, _registry: &Registry, _now: Instant) -> bool {
        false
    }
}

/// Error resolving a feature list.
///
/// All variants are configuration errors; no partial installation happens.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// A feature depends on a name that is not in the set.
    #[error("feature `{feature}` depends on `{dependency}`, which is not installed")]
    MissingDependency {
        /// The feature declaring the dependency.
        feature: &'static str,
        /// The missing dependency.
        dependency: &'static str,
    },
    /// A feature declares a conflict with a name that is in the set.
    #[error("feature `{feature}` conflicts with installed feature `{other}`")]
    Conflict {
        /// The feature declaring the conflict.
        feature: &'static str,
        /// The conflicting feature.
        other: &'static str,
    },
    /// Dependencies form a cycle.
    #[error("dependency cycle through feature `{feature}`")]
    Cycle {
        /// A feature on the cycle.
        feature: &'static str,
    },
}

/// Installed features in resolved order.
#[derive(Default)]
pub struct FeatureSet {
    features: Vec<Box<dyn Feature>>,
}

impl core::fmt::Debug for FeatureSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

impl FeatureSet {
    /// Resolve `features` into installation order.
    pub fn resolve(features: Vec<Box<dyn Feature>>) -> Result<Self, ResolveError> {
        let mut slots: Vec<Option<Box<dyn Feature>>> = Vec::with_capacity(features.len());
        let mut by_name: HashMap<&'static str, usize> = HashMap::new();
        for feature in features {
            let name = feature.name();
            if by_name.contains_key(name) {
                warn!(feature = name, "feature listed twice, keeping the first");
                continue;
            }
            by_name.insert(name, slots.len());
            slots.push(Some(feature));
        }

        for feature in slots.iter().flatten() {
            if let Some(other) = feature
                .conflicts()
                .iter()
                .find(|other| by_name.contains_key(*other))
            {
                return Err(ResolveError::Conflict {
                    feature: feature.name(),
                    other: *other,
                });
            }
        }

        let mut marks: HashMap<&'static str, Mark> = HashMap::new();
        let mut order = Vec::with_capacity(slots.len());
        for idx in 0..slots.len() {
            visit(idx, &slots, &by_name, &mut marks, &mut order)?;
        }

        let features: Vec<_> = order
            .into_iter()
            .filter_map(|idx| slots[idx].take())
            .collect();
        let set = Self { features };
        debug!(order = ?set.names().collect::<Vec<_>>(), "resolved features");
        Ok(set)
    }

    /// Feature names in resolved order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.features.iter().map(|f| f.name())
    }

    /// Number of installed features.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Returns true if no features are installed.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Returns true if a feature with `name` is installed.
    pub fn contains(&self, name: &str) -> bool {
        self.names().any(|n| n == name)
    }

    /// State of the installed feature of type `F`.
    pub fn get<F: Feature>(&self) -> Option<&F> {
        self.features.iter().find_map(|feature| {
            let feature: &dyn Feature = feature.as_ref();
            (feature as &dyn Any).downcast_ref::<F>()
        })
    }

    /// Mutable state of the installed feature of type `F`.
    pub fn get_mut<F: Feature>(&mut self) -> Option<&mut F> {
        self.features.iter_mut().find_map(|feature| {
            let feature: &mut dyn Feature = feature.as_mut();
            (feature as &mut dyn Any).downcast_mut::<F>()
        })
    }

    /// Features in resolved order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &dyn Feature> + '_ {
        self.features.iter().map(Box::as_ref)
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn Feature>> + '_ {
        self.features.iter_mut()
    }
}

fn visit(
    idx: usize,
    slots: &[Option<Box<dyn Feature>>],
    by_name: &HashMap<&'static str, usize>,
    marks: &mut HashMap<&'static str, Mark>,
    order: &mut Vec<usize>,
) -> Result<(), ResolveError> {
    let Some(feature) = slots[idx].as_ref() else {
        return Ok(());
    };
    let name = feature.name();
    match marks.get(name) {
        Some(Mark::Done) => return Ok(()),
        Some(Mark::Visiting) => return Err(ResolveError::Cycle { feature: name }),
        None => {}
    }
    marks.insert(name, Mark::Visiting);
    for dependency in feature.depends() {
        let Some(&dep_idx) = by_name.get(dependency) else {
            return Err(ResolveError::MissingDependency {
                feature: name,
                dependency: *dependency,
            });
        };
        visit(dep_idx, slots, by_name, marks, order)?;
    }
    marks.insert(name, Mark::Done);
    order.push(idx);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named {
        name: &'static str,
        depends: &'static [&'static str],
        conflicts: &'static [&'static str],
    }

    impl Feature for Named {
        fn name(&self) -> &'static str {
            self.name
        }
        fn depends(&self) -> &'static [&'static str] {
            self.depends
        }
        fn conflicts(&self) -> &'static [&'static str] {
            self.conflicts
        }
    }

    fn f(
        name: &'static str,
        depends: &'static [&'static str],
        conflicts: &'static [&'static str],
    ) -> Box<dyn Feature> {
        Box::new(Named {
            name,
            depends,
            conflicts,
        })
    }

    fn order(set: &FeatureSet) -> Vec<&'static str> {
        set.names().collect()
    }

    #[test]
    fn dependency_installs_first() {
        let set = FeatureSet::resolve(vec![f("a", &["b"], &[]), f("b", &[], &[])]).unwrap();
        assert_eq!(order(&set), ["b", "a"]);
    }

    #[test]
    fn independent_features_keep_list_order() {
        let set = FeatureSet::resolve(vec![f("x", &[], &[]), f("y", &[], &[])]).unwrap();
        assert_eq!(order(&set), ["x", "y"]);
    }

    #[test]
    fn shared_dependency_installs_once() {
        let set = FeatureSet::resolve(vec![
            f("a", &["c"], &[]),
            f("b", &["c"], &[]),
            f("c", &[], &[]),
        ])
        .unwrap();
        assert_eq!(order(&set), ["c", "a", "b"]);
    }

    #[test]
    fn duplicate_names_collapse() {
        let set = FeatureSet::resolve(vec![f("a", &[], &[]), f("a", &[], &[])]).unwrap();
        assert_eq!(order(&set), ["a"]);
    }

    #[test]
    fn conflict_is_fatal() {
        let err = FeatureSet::resolve(vec![f("a", &[], &["b"]), f("b", &[], &[])]).unwrap_err();
        assert_eq!(
            err,
            ResolveError::Conflict {
                feature: "a",
                other: "b"
            }
        );
    }

    #[test]
    fn conflict_with_absent_feature_is_fine() {
        assert!(FeatureSet::resolve(vec![f("a", &[], &["b"])]).is_ok());
    }

    #[test]
    fn missing_dependency_is_fatal() {
        let err = FeatureSet::resolve(vec![f("a", &["zzz"], &[])]).unwrap_err();
        assert_eq!(
            err,
            ResolveError::MissingDependency {
                feature: "a",
                dependency: "zzz"
            }
        );
    }

    #[test]
    fn cycle_is_fatal() {
        let err = FeatureSet::resolve(vec![f("a", &["b"], &[]), f("b", &["a"], &[])]).unwrap_err();
        assert!(matches!(err, ResolveError::Cycle { .. }));
    }

    #[test]
    fn downcast_by_type() {
        let mut set = FeatureSet::resolve(vec![f("a", &[], &[])]).unwrap();
        assert_eq!(set.get::<Named>().map(|n| n.name), Some("a"));
        set.get_mut::<Named>().unwrap().name = "renamed";
        assert!(set.contains("renamed"));
        let names: Vec<_> = set.iter().map(|f| f.name()).collect();
        assert_eq!(names, ["renamed"]);
    }
}
