// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Expand/collapse state.
//!
//! The expanded-key set lives in the [`Expandable`] feature and survives rebuilds.
//! The tree's default visible-item walk asks this feature which nodes are open.
//!
//! When an [`AsyncLoader`](crate::AsyncLoader) is installed, [`ExpandableExt::expand`]
//! also starts a child fetch for unloaded nodes and hands the pending load back to
//! the caller.

use std::collections::HashSet;

use tracing::trace;
use understory_outline::{Feature, ItemRef, Registry, Tree, TreeNode};

use crate::async_loader::{PendingLoad, begin_load};

/// Options for [`Expandable`].
#[derive(Clone, Debug, Default)]
pub struct ExpandableOptions {
    /// Keys expanded on first install.
    pub default_expanded_keys: Vec<String>,
    /// Expand every non-leaf item on first install.
    pub default_expand_all: bool,
}

/// Payload of the expand callback.
#[derive(Clone, Debug)]
pub struct ExpandEvent<'a> {
    /// Key that changed.
    pub key: &'a str,
    /// New state.
    pub expanded: bool,
    /// Source node of the item.
    pub node: &'a TreeNode,
}

type ExpandCallback = Box<dyn FnMut(&ExpandEvent<'_>)>;

/// Expand/collapse feature.
#[derive(Default)]
pub struct Expandable {
    options: ExpandableOptions,
    expanded: HashSet<String>,
    initialized: bool,
    on_expand: Option<ExpandCallback>,
}

impl core::fmt::Debug for Expandable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Expandable")
            .field("options", &self.options)
            .field("expanded", &self.expanded.len())
            .finish_non_exhaustive()
    }
}

impl Expandable {
    /// Feature name.
    pub const NAME: &'static str = "expandable";

    /// Create the feature with `options`.
    pub fn new(options: ExpandableOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    /// Builder: call `f` whenever an item is expanded or collapsed.
    #[must_use]
    pub fn on_expand(mut self, f: impl FnMut(&ExpandEvent<'_>) + 'static) -> Self {
        self.on_expand = Some(Box::new(f));
        self
    }

    /// Returns true if `key` is in the expanded set.
    pub fn is_expanded(&self, key: &str) -> bool {
        self.expanded.contains(key)
    }

    /// Expanded keys that currently have an item, in document order.
    pub fn expanded_keys(&self, registry: &Registry) -> Vec<String> {
        registry
            .iter()
            .filter(|item| self.expanded.contains(item.key()))
            .map(|item| item.key().to_owned())
            .collect()
    }

    /// Set the state of one item. Returns false for unknown keys and leaves.
    pub fn set_expanded(&mut self, registry: &Registry, key: &str, expanded: bool) -> bool {
        let Some(item) = registry.get(key) else {
            return false;
        };
        if item.is_leaf() {
            return false;
        }
        if expanded {
            self.expanded.insert(key.to_owned());
        } else {
            self.expanded.remove(key);
        }
        trace!(key, expanded, "set expanded");
        if let (Some(callback), Some(node)) = (self.on_expand.as_mut(), registry.node(key)) {
            callback(&ExpandEvent {
                key,
                expanded,
                node,
            });
        }
        true
    }

    /// Expand every non-leaf item.
    pub fn expand_all(&mut self, registry: &Registry) {
        self.expanded.extend(
            registry
                .iter()
                .filter(|item| !item.is_leaf())
                .map(|item| item.key().to_owned()),
        );
    }

    /// Collapse everything.
    pub fn collapse_all(&mut self) {
        self.expanded.clear();
    }

    /// Expand every ancestor of `key` so that it is reachable. Returns false for unknown keys.
    pub fn expand_to(&mut self, registry: &Registry, key: &str) -> bool {
        if !registry.contains(key) {
            return false;
        }
        self.expanded
            .extend(registry.ancestors(key).map(|item| item.key().to_owned()));
        true
    }
}

impl Feature for Expandable {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn install(&mut self, registry: &Registry) {
        if self.initialized {
            return;
        }
        self.initialized = true;
        self.expanded
            .extend(self.options.default_expanded_keys.iter().cloned());
        if self.options.default_expand_all {
            self.expand_all(registry);
        }
    }

    fn is_expanded(&self, key: &str) -> Option<bool> {
        Some(self.expanded.contains(key))
    }
}

/// Expand/collapse actions on a [`Tree`].
///
/// Every action on an unknown key, a leaf, or a tree without [`Expandable`] is a no-op.
pub trait ExpandableExt {
    /// Expand `key`.
    ///
    /// Returns the pending child fetch if an [`AsyncLoader`](crate::AsyncLoader)
    /// started one; drive it and pass the result to
    /// [`AsyncLoaderExt::complete_load`](crate::AsyncLoaderExt::complete_load).
    fn expand(&mut self, key: &str) -> Option<PendingLoad>;
    /// Collapse `key`.
    fn collapse(&mut self, key: &str);
    /// Flip the state of `key`.
    fn toggle_expanded(&mut self, key: &str) -> Option<PendingLoad>;
    /// Expand every non-leaf item.
    fn expand_all(&mut self);
    /// Collapse every item.
    fn collapse_all(&mut self);
    /// Expand every ancestor of `key`.
    fn expand_to(&mut self, key: &str);
    /// Expanded keys in document order.
    fn expanded_keys(&self) -> Vec<String>;
}

impl ExpandableExt for Tree {
    fn expand(&mut self, key: &str) -> Option<PendingLoad> {
        let applied =
            self.update_feature::<Expandable, _>(|f, reg| f.set_expanded(reg, key, true))?;
        if !applied {
            return None;
        }
        let pending = begin_load(self, key);
        self.notify();
        pending
    }

    fn collapse(&mut self, key: &str) {
        let changed =
            self.update_feature::<Expandable, _>(|f, reg| f.set_expanded(reg, key, false));
        if changed == Some(true) {
            self.notify();
        }
    }

    fn toggle_expanded(&mut self, key: &str) -> Option<PendingLoad> {
        let expanded = self.feature::<Expandable>()?.is_expanded(key);
        if expanded {
            self.collapse(key);
            None
        } else {
            self.expand(key)
        }
    }

    fn expand_all(&mut self) {
        if self
            .update_feature::<Expandable, _>(|f, reg| f.expand_all(reg))
            .is_some()
        {
            self.notify();
        }
    }

    fn collapse_all(&mut self) {
        if self
            .update_feature::<Expandable, _>(|f, _| f.collapse_all())
            .is_some()
        {
            self.notify();
        }
    }

    fn expand_to(&mut self, key: &str) {
        if self.update_feature::<Expandable, _>(|f, reg| f.expand_to(reg, key)) == Some(true) {
            self.notify();
        }
    }

    fn expanded_keys(&self) -> Vec<String> {
        self.feature::<Expandable>()
            .map(|f| f.expanded_keys(self.registry()))
            .unwrap_or_default()
    }
}

/// Per-item expansion state.
pub trait ExpandableItem {
    /// True if the item is expanded.
    fn expanded(&self) -> bool;
}

impl ExpandableItem for ItemRef<'_> {
    fn expanded(&self) -> bool {
        self.feature::<Expandable>()
            .is_some_and(|f| f.is_expanded(self.key()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{counter, sample_nodes};
    use understory_outline::TreeOptions;

    fn tree(options: ExpandableOptions) -> Tree {
        Tree::new(
            sample_nodes(),
            TreeOptions::new().with_feature(Expandable::new(options)),
        )
        .unwrap()
    }

    #[test]
    fn collapsed_by_default() {
        let tree = tree(ExpandableOptions::default());
        assert_eq!(tree.visible_keys(), ["docs", "src", "readme"]);
        assert!(!tree.item("src").unwrap().expanded());
    }

    #[test]
    fn expand_reveals_children_and_notifies() {
        let mut tree = tree(ExpandableOptions::default());
        let hits = counter(&mut tree);
        assert!(tree.expand("src").is_none());
        assert_eq!(hits.get(), 1);
        assert_eq!(tree.visible_keys(), ["docs", "src", "lib", "ui", "readme"]);
        assert!(tree.item("src").unwrap().expanded());

        tree.expand("ui");
        assert_eq!(
            tree.visible_keys(),
            ["docs", "src", "lib", "ui", "button", "tree_view", "readme"]
        );
    }

    #[test]
    fn collapsed_ancestor_hides_expanded_descendant() {
        let mut tree = tree(ExpandableOptions::default());
        tree.expand("src");
        tree.expand("ui");
        tree.collapse("src");
        assert_eq!(tree.visible_keys(), ["docs", "src", "readme"]);
        assert_eq!(tree.expanded_keys(), ["ui"]);
    }

    #[test]
    fn unknown_and_leaf_keys_are_ignored() {
        let mut tree = tree(ExpandableOptions::default());
        let hits = counter(&mut tree);
        tree.expand("missing");
        tree.expand("readme");
        tree.collapse("missing");
        assert_eq!(hits.get(), 0);
        assert!(tree.expanded_keys().is_empty());
    }

    #[test]
    fn defaults_apply_once_and_survive_rebuild() {
        let mut tree = tree(ExpandableOptions {
            default_expanded_keys: vec!["src".into()],
            default_expand_all: false,
        });
        assert_eq!(tree.expanded_keys(), ["src"]);
        tree.collapse("src");
        tree.expand("docs");
        tree.update_tree(sample_nodes());
        assert_eq!(tree.expanded_keys(), ["docs"], "defaults are not re-applied");
    }

    #[test]
    fn expand_all_and_collapse_all() {
        let mut tree = tree(ExpandableOptions {
            default_expand_all: true,
            ..Default::default()
        });
        assert_eq!(tree.visible_keys().len(), tree.len());
        tree.collapse_all();
        assert_eq!(tree.visible_keys(), ["docs", "src", "readme"]);
        tree.expand_all();
        assert_eq!(tree.visible_keys().len(), tree.len());
    }

    #[test]
    fn expand_to_opens_ancestors() {
        let mut tree = tree(ExpandableOptions::default());
        tree.expand_to("tree_view");
        assert_eq!(tree.expanded_keys(), ["src", "ui"]);
        assert!(tree.visible_keys().contains(&"tree_view".to_owned()));
    }

    #[test]
    fn toggle_flips_state() {
        let mut tree = tree(ExpandableOptions::default());
        tree.toggle_expanded("docs");
        assert!(tree.item("docs").unwrap().expanded());
        tree.toggle_expanded("docs");
        assert!(!tree.item("docs").unwrap().expanded());
    }

    #[test]
    fn callback_sees_each_change() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let mut tree = Tree::new(
            sample_nodes(),
            TreeOptions::new().with_feature(Expandable::default().on_expand(move |e| {
                sink.borrow_mut().push((e.key.to_owned(), e.expanded, e.node.label.clone()));
            })),
        )
        .unwrap();
        tree.expand("src");
        tree.collapse("src");
        assert_eq!(
            *log.borrow(),
            [
                ("src".to_owned(), true, "src".to_owned()),
                ("src".to_owned(), false, "src".to_owned())
            ]
        );
    }
}
