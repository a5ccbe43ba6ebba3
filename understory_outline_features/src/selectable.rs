// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Single and multiple selection.

use indexmap::IndexSet;
use tracing::trace;
use understory_outline::{Feature, ItemRef, Registry, Tree};

/// How many items may be selected at once.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum SelectionMode {
    /// Selecting an item replaces the previous selection.
    #[default]
    Single,
    /// Selecting an item adds it to the selection.
    Multiple,
}

/// Options for [`Selectable`].
#[derive(Clone, Debug, Default)]
pub struct SelectableOptions {
    /// Selection mode.
    pub mode: SelectionMode,
    /// Keys selected on first install.
    pub default_selected_keys: Vec<String>,
}

/// Payload of the select callback.
#[derive(Clone, Debug)]
pub struct SelectEvent<'a> {
    /// Key that changed.
    pub key: &'a str,
    /// New state of `key`.
    pub selected: bool,
    /// Full selection after the change, in selection order.
    pub selected_keys: Vec<String>,
}

type SelectCallback = Box<dyn FnMut(&SelectEvent<'_>)>;

/// Selection feature. The selection keeps the order in which keys were selected.
#[derive(Default)]
pub struct Selectable {
    options: SelectableOptions,
    selected: IndexSet<String>,
    initialized: bool,
    on_select: Option<SelectCallback>,
}

impl core::fmt::Debug for Selectable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Selectable")
            .field("options", &self.options)
            .field("selected", &self.selected)
            .finish_non_exhaustive()
    }
}

impl Selectable {
    /// Feature name.
    pub const NAME: &'static str = "selectable";

    /// Create the feature with `options`.
    pub fn new(options: SelectableOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    /// Builder: call `f` whenever the selection changes.
    #[must_use]
    pub fn on_select(mut self, f: impl FnMut(&SelectEvent<'_>) + 'static) -> Self {
        self.on_select = Some(Box::new(f));
        self
    }

    /// Returns true if `key` is selected.
    pub fn is_selected(&self, key: &str) -> bool {
        self.selected.contains(key)
    }

    /// Selected keys that have an item, in selection order.
    pub fn selected_keys(&self, registry: &Registry) -> Vec<String> {
        self.selected
            .iter()
            .filter(|key| registry.contains(key))
            .cloned()
            .collect()
    }

    /// Set the state of one item. Returns false for unknown or disabled items.
    pub fn set_selected(&mut self, registry: &Registry, key: &str, selected: bool) -> bool {
        if registry.node(key).is_none_or(|node| node.is_disabled()) {
            return false;
        }
        if selected {
            if self.options.mode == SelectionMode::Single {
                self.selected.clear();
            }
            self.selected.insert(key.to_owned());
        } else {
            self.selected.shift_remove(key);
        }
        trace!(key, selected, "set selected");
        if self.on_select.is_some() {
            let selected_keys = self.selected_keys(registry);
            if let Some(callback) = self.on_select.as_mut() {
                callback(&SelectEvent {
                    key,
                    selected,
                    selected_keys,
                });
            }
        }
        true
    }

    /// Drop the whole selection. Returns false if it was already empty.
    pub fn clear(&mut self) -> bool {
        let had = !self.selected.is_empty();
        self.selected.clear();
        had
    }
}

impl Feature for Selectable {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn install(&mut self, _registry: &Registry) {
        if self.initialized {
            return;
        }
        self.initialized = true;
        let defaults = self.options.default_selected_keys.iter().cloned();
        match self.options.mode {
            SelectionMode::Single => self.selected.extend(defaults.take(1)),
            SelectionMode::Multiple => self.selected.extend(defaults),
        }
    }
}

/// Selection actions on a [`Tree`].
///
/// Actions on unknown or disabled keys, or without [`Selectable`] installed, are no-ops.
pub trait SelectableExt {
    /// Select `key`.
    fn select(&mut self, key: &str);
    /// Unselect `key`.
    fn unselect(&mut self, key: &str);
    /// Flip the state of `key`.
    fn toggle_select(&mut self, key: &str);
    /// Clear the selection.
    fn clear_selection(&mut self);
    /// Selected keys in selection order.
    fn selected_keys(&self) -> Vec<String>;
}

impl SelectableExt for Tree {
    fn select(&mut self, key: &str) {
        let changed =
            self.update_feature::<Selectable, _>(|f, reg| f.set_selected(reg, key, true));
        if changed == Some(true) {
            self.notify();
        }
    }

    fn unselect(&mut self, key: &str) {
        if self.update_feature::<Selectable, _>(|f, reg| f.set_selected(reg, key, false))
            == Some(true)
        {
            self.notify();
        }
    }

    fn toggle_select(&mut self, key: &str) {
        let Some(selected) = self.feature::<Selectable>().map(|f| f.is_selected(key)) else {
            return;
        };
        if selected {
            self.unselect(key);
        } else {
            self.select(key);
        }
    }

    fn clear_selection(&mut self) {
        if self.update_feature::<Selectable, _>(|f, _| f.clear()) == Some(true) {
            self.notify();
        }
    }

    fn selected_keys(&self) -> Vec<String> {
        self.feature::<Selectable>()
            .map(|f| f.selected_keys(self.registry()))
            .unwrap_or_default()
    }
}

/// Per-item selection state.
pub trait SelectableItem {
    /// True if the item is selected.
    fn selected(&self) -> bool;
}

impl SelectableItem for ItemRef<'_> {
    fn selected(&self) -> bool {
        self.feature::<Selectable>()
            .is_some_and(|f| f.is_selected(self.key()))
    }
}
