// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tri-state checking with parent/child propagation.
//!
//! ## Hierarchical mode (default)
//!
//! Checking or unchecking an item:
//!
//! 1) applies the new state to the item and every item below it;
//! 2) walks up the parent chain and marks each ancestor checked iff all of its
//!    direct children are checked.
//!
//! `indeterminate` is never stored. It is recomputed on every read: an item is
//! indeterminate when it is not checked but something in its subtree is checked
//! or indeterminate. Leaves are never indeterminate.
//!
//! ## Strict mode
//!
//! With [`CheckableOptions::check_strictly`], actions touch only the target key
//! and nothing is ever indeterminate.
//!
//! ## Rebuilds
//!
//! The checked set survives rebuilds. In hierarchical mode it is reconciled with
//! the new items on install: checked parents push their state down to children
//! that appeared since, then parents are recomputed bottom-up.

use std::collections::HashSet;

use tracing::trace;
use understory_outline::{Feature, Item, ItemRef, NodeFlags, Registry, Tree, TreeNode};

/// Options for [`Checkable`].
#[derive(Clone, Debug, Default)]
pub struct CheckableOptions {
    /// Check only the target key, without propagation.
    pub check_strictly: bool,
    /// Keys checked on first install (propagated unless strict).
    pub default_checked_keys: Vec<String>,
}

/// Payload of the check callback.
#[derive(Clone, Debug)]
pub struct CheckEvent<'a> {
    /// Every checked key that has an item, in document order.
    pub checked_keys: Vec<String>,
    /// Items for `checked_keys`.
    pub checked_items: Vec<&'a Item>,
    /// New state of the target.
    pub checked: bool,
    /// Source node of the target.
    pub node: &'a TreeNode,
}

type CheckCallback = Box<dyn FnMut(&CheckEvent<'_>)>;

/// Tri-state checkbox feature.
#[derive(Default)]
pub struct Checkable {
    options: CheckableOptions,
    checked: HashSet<String>,
    initialized: bool,
    on_check: Option<CheckCallback>,
}

impl core::fmt::Debug for Checkable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Checkable")
            .field("options", &self.options)
            .field("checked", &self.checked.len())
            .finish_non_exhaustive()
    }
}

impl Checkable {
    /// Feature name.
    pub const NAME: &'static str = "checkable";

    /// Create the feature with `options`.
    pub fn new(options: CheckableOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    /// Builder: call `f` after every check or uncheck, before listeners are notified.
    #[must_use]
    pub fn on_check(mut self, f: impl FnMut(&CheckEvent<'_>) + 'static) -> Self {
        self.on_check = Some(Box::new(f));
        self
    }

    /// Returns true if `key` is in the checked set.
    pub fn is_checked(&self, key: &str) -> bool {
        self.checked.contains(key)
    }

    /// Returns true if `key` is partially checked. Always false in strict mode.
    pub fn is_indeterminate(&self, registry: &Registry, key: &str) -> bool {
        if self.options.check_strictly {
            return false;
        }
        match registry.get(key) {
            Some(item) => self.partial(registry, item),
            None => false,
        }
    }

    fn partial(&self, registry: &Registry, item: &Item) -> bool {
        if item.is_leaf() || self.checked.contains(item.key()) {
            return false;
        }
        item.child_keys().iter().any(|child| {
            self.checked.contains(child)
                || registry
                    .get(child)
                    .is_some_and(|child| self.partial(registry, child))
        })
    }

    /// Checked keys that have an item, in document order.
    pub fn checked_keys(&self, registry: &Registry) -> Vec<String> {
        self.checked_items(registry)
            .into_iter()
            .map(|item| item.key().to_owned())
            .collect()
    }

    fn checked_items<'a>(&self, registry: &'a Registry) -> Vec<&'a Item> {
        registry
            .iter()
            .filter(|item| self.checked.contains(item.key()))
            .collect()
    }

    /// Check or uncheck `key`. Returns false if the key has no item or cannot be checked.
    pub fn set_checked(&mut self, registry: &Registry, key: &str, checked: bool) -> bool {
        let Some(node) = registry.node(key) else {
            return false;
        };
        if node.flags.intersects(NodeFlags::DISABLED | NodeFlags::NO_CHECKBOX) {
            return false;
        }

        if self.options.check_strictly {
            self.apply(key, checked);
        } else {
            self.apply(key, checked);
            for descendant in registry.descendant_keys(key) {
                self.apply(descendant, checked);
            }
            self.refresh_ancestors(registry, key);
        }
        trace!(key, checked, total = self.checked.len(), "set checked");

        let snapshot = self
            .on_check
            .is_some()
            .then(|| self.checked_items(registry));
        if let (Some(callback), Some(checked_items)) = (self.on_check.as_mut(), snapshot) {
            callback(&CheckEvent {
                checked_keys: checked_items
                    .iter()
                    .map(|item| item.key().to_owned())
                    .collect(),
                checked_items,
                checked,
                node,
            });
        }
        true
    }

    fn apply(&mut self, key: &str, checked: bool) {
        if checked {
            self.checked.insert(key.to_owned());
        } else {
            self.checked.remove(key);
        }
    }

    fn refresh_ancestors(&mut self, registry: &Registry, key: &str) {
        for ancestor in registry.ancestors(key) {
            let all = ancestor
                .child_keys()
                .iter()
                .all(|child| self.checked.contains(child));
            self.apply(ancestor.key(), all);
        }
    }

    fn reconcile(&mut self, registry: &Registry) {
        // Top-down: document order visits parents before children.
        for item in registry.iter() {
            if self.checked.contains(item.key()) {
                for child in item.child_keys() {
                    self.checked.insert(child.clone());
                }
            }
        }
        // Bottom-up: reverse document order visits children before parents.
        let items: Vec<&Item> = registry.iter().collect();
        for item in items.into_iter().rev() {
            if item.child_keys().is_empty() {
                continue;
            }
            let all = item
                .child_keys()
                .iter()
                .all(|child| self.checked.contains(child));
            self.apply(item.key(), all);
        }
    }
}

impl Feature for Checkable {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn install(&mut self, registry: &Registry) {
        if !self.initialized {
            self.initialized = true;
            self.checked
                .extend(self.options.default_checked_keys.iter().cloned());
        }
        if !self.options.check_strictly {
            self.reconcile(registry);
        }
    }
}

/// Check actions on a [`Tree`].
///
/// Actions on unknown, disabled, or checkbox-less keys, or without
/// [`Checkable`] installed, are no-ops.
pub trait CheckableExt {
    /// Check `key` (and propagate, unless strict).
    fn check(&mut self, key: &str);
    /// Uncheck `key` (and propagate, unless strict).
    fn uncheck(&mut self, key: &str);
    /// Check `key` if it is unchecked, otherwise uncheck it.
    fn toggle_check(&mut self, key: &str);
    /// Checked keys in document order.
    fn checked_keys(&self) -> Vec<String>;
}

impl CheckableExt for Tree {
    fn check(&mut self, key: &str) {
        let changed =
            self.update_feature::<Checkable, _>(|f, reg| f.set_checked(reg, key, true));
        if changed == Some(true) {
            self.notify();
        }
    }

    fn uncheck(&mut self, key: &str) {
        let changed =
            self.update_feature::<Checkable, _>(|f, reg| f.set_checked(reg, key, false));
        if changed == Some(true) {
            self.notify();
        }
    }

    fn toggle_check(&mut self, key: &str) {
        let Some(checked) = self.feature::<Checkable>().map(|f| f.is_checked(key)) else {
            return;
        };
        if checked {
            self.uncheck(key);
        } else {
            self.check(key);
        }
    }

    fn checked_keys(&self) -> Vec<String> {
        self.feature::<Checkable>()
            .map(|f| f.checked_keys(self.registry()))
            .unwrap_or_default()
    }
}

/// Per-item check state.
pub trait CheckableItem {
    /// True if the item is checked.
    fn checked(&self) -> bool;
    /// True if some but not all of the item's subtree is checked.
    fn indeterminate(&self) -> bool;
}

impl CheckableItem for ItemRef<'_> {
    fn checked(&self) -> bool {
        self.feature::<Checkable>()
            .is_some_and(|f| f.is_checked(self.key()))
    }

    fn indeterminate(&self) -> bool {
        self.feature::<Checkable>()
            .is_some_and(|f| f.is_indeterminate(self.registry(), self.key()))
    }
}
