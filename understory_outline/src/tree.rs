// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree handle: rebuild lifecycle, visible-item walk, and change notification.

use std::time::Instant;

use tracing::{debug, trace};

use crate::feature::{Feature, FeatureSet, ResolveError};
use crate::item::{ItemRef, LeafPredicate, Registry};
use crate::node::{TreeNode, find_node_mut};

/// Options for [`Tree::new`].
#[derive(Default)]
pub struct TreeOptions {
    features: Vec<Box<dyn Feature>>,
    leaf: Option<LeafPredicate>,
}

impl core::fmt::Debug for TreeOptions {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let names: Vec<_> = self.features.iter().map(|f| f.name()).collect();
        f.debug_struct("TreeOptions")
            .field("features", &names)
            .field("leaf_predicate", &self.leaf.is_some())
            .finish()
    }
}

impl TreeOptions {
    /// Empty options: no features, default leaf rule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a feature. Order only matters between independent features.
    #[must_use]
    pub fn with_feature(mut self, feature: impl Feature) -> Self {
        self.features.push(Box::new(feature));
        self
    }

    /// Add an already boxed feature.
    #[must_use]
    pub fn with_boxed_feature(mut self, feature: Box<dyn Feature>) -> Self {
        self.features.push(feature);
        self
    }

    /// Decide leafness with `is_leaf` instead of "has no children".
    ///
    /// Lazily loaded trees need this: a node whose children have not been
    /// fetched yet has none, but must not be a leaf.
    #[must_use]
    pub fn with_leaf_predicate(mut self, is_leaf: impl Fn(&TreeNode) -> bool + 'static) -> Self {
        self.leaf = Some(Box::new(is_leaf));
        self
    }
}

/// Handle returned by [`Tree::subscribe`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Subscription(u64);

/// The tree engine: node store, item registry, installed features, and listeners.
///
/// All mutation is synchronous. Every state change made through a feature
/// action ends in [`Tree::notify`].
pub struct Tree {
    registry: Registry,
    features: FeatureSet,
    listeners: Vec<(Subscription, Box<dyn FnMut()>)>,
    next_subscription: u64,
}

impl core::fmt::Debug for Tree {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tree")
            .field("registry", &self.registry)
            .field("features", &self.features)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl Tree {
    /// Resolve the features, derive items from `nodes`, and install every feature.
    ///
    /// Fails if the feature list has a missing dependency, a conflict, or a cycle.
    pub fn new(nodes: Vec<TreeNode>, options: TreeOptions) -> Result<Self, ResolveError> {
        let features = FeatureSet::resolve(options.features)?;
        let mut tree = Self {
            registry: Registry::new(nodes, options.leaf),
            features,
            listeners: Vec::new(),
            next_subscription: 0,
        };
        tree.rebuild();
        Ok(tree)
    }

    /// Replace the node store and rebuild.
    pub fn update_tree(&mut self, nodes: Vec<TreeNode>) {
        self.registry.replace_nodes(nodes);
        self.rebuild();
    }

    /// Re-derive every item, re-install every feature in resolved order, run
    /// the post-rebuild hooks, then notify.
    pub fn rebuild(&mut self) {
        self.registry.rebuild();
        for feature in self.features.iter_mut() {
            feature.install(&self.registry);
        }
        for feature in self.features.iter_mut() {
            feature.on_rebuild(&self.registry);
        }
        debug!(items = self.registry.len(), "rebuilt tree");
        self.notify();
    }

    /// The current node store.
    pub fn nodes(&self) -> &[TreeNode] {
        self.registry.nodes()
    }

    /// The item registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Installed features in resolved order.
    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// Returns true if the tree has no items.
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Look up an item. Unknown keys yield `None`.
    pub fn item(&self, key: &str) -> Option<ItemRef<'_>> {
        let item = self.registry.get(key)?;
        Some(ItemRef::new(item, &self.registry, &self.features))
    }

    /// All items in document order.
    pub fn items(&self) -> impl Iterator<Item = ItemRef<'_>> + '_ {
        self.registry
            .iter()
            .map(|item| ItemRef::new(item, &self.registry, &self.features))
    }

    /// Keys of the items currently eligible for rendering, in document order.
    ///
    /// If any feature supplies an override, the last one in resolved order wins.
    /// Otherwise the forest is walked top-down and a node's children are
    /// included only if it is not a leaf and some feature reports it expanded.
    pub fn visible_keys(&self) -> Vec<String> {
        if let Some(keys) = self
            .features
            .iter()
            .rev()
            .find_map(|f| f.visible_override(&self.registry))
        {
            return keys;
        }
        let mut out = Vec::new();
        self.walk_expanded(self.registry.roots(), &mut out);
        out
    }

    /// The visible-item sequence (see [`Tree::visible_keys`]).
    pub fn visible_items(&self) -> Vec<ItemRef<'_>> {
        self.visible_keys()
            .iter()
            .filter_map(|key| self.item(key))
            .collect()
    }

    fn walk_expanded(&self, keys: &[String], out: &mut Vec<String>) {
        for key in keys {
            let Some(item) = self.registry.get(key) else {
                continue;
            };
            out.push(key.clone());
            let expanded = self
                .features
                .iter()
                .any(|f| f.is_expanded(key) == Some(true));
            if !item.is_leaf() && expanded {
                self.walk_expanded(item.child_keys(), out);
            }
        }
    }

    /// State of the installed feature of type `F`.
    pub fn feature<F: Feature>(&self) -> Option<&F> {
        self.features.get::<F>()
    }

    /// Run `f` against the installed feature of type `F` and the registry.
    ///
    /// Returns `None` if the feature is not installed. Does not notify.
    pub fn update_feature<F: Feature, R>(
        &mut self,
        f: impl FnOnce(&mut F, &Registry) -> R,
    ) -> Option<R> {
        let feature = self.features.get_mut::<F>()?;
        Some(f(feature, &self.registry))
    }

    /// Assign `children` to the node with `key` in the node store.
    ///
    /// Does not rebuild; call [`Tree::rebuild`] afterwards. Returns false if no
    /// node with `key` exists in the current node store.
    pub fn set_node_children(&mut self, key: &str, children: Vec<TreeNode>) -> bool {
        match find_node_mut(self.registry.nodes_mut(), key) {
            Some(node) => {
                node.children = Some(children);
                true
            }
            None => false,
        }
    }

    /// Register a change listener.
    pub fn subscribe(&mut self, listener: impl FnMut() + 'static) -> Subscription {
        let id = Subscription(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was already removed.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(id, _)| *id != subscription);
        self.listeners.len() != before
    }

    /// Invoke every listener synchronously, in subscription order.
    pub fn notify(&mut self) {
        trace!(listeners = self.listeners.len(), "notify");
        for (_, listener) in &mut self.listeners {
            listener();
        }
    }

    /// Earliest deadline any feature is waiting for.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.features.iter().filter_map(|f| f.next_deadline()).min()
    }

    /// Run deferred feature work due at `now`, notifying if anything changed.
    pub fn poll(&mut self, now: Instant) -> bool {
        let mut changed = false;
        for feature in self.features.iter_mut() {
            changed |= feature.poll(&self.registry, now);
        }
        if changed {
            self.notify();
        }
        changed
    }
}
