// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Outline Features: stock features for [`understory_outline`] trees.
//!
//! ## Overview
//!
//! Each feature is a value you pass to [`TreeOptions::with_feature`](understory_outline::TreeOptions::with_feature).
//! It keeps its own state across rebuilds and exposes:
//!
//! - a `*Ext` trait on [`Tree`](understory_outline::Tree) with keyed actions and getters;
//! - a `*Item` trait on [`ItemRef`](understory_outline::ItemRef) with per-item state.
//!
//! | Feature | Name | Depends on | Actions |
//! |---|---|---|---|
//! | [`Expandable`] | `expandable` | | [`ExpandableExt`] |
//! | [`Selectable`] | `selectable` | | [`SelectableExt`] |
//! | [`Checkable`] | `checkable` | | [`CheckableExt`] |
//! | [`Search`] | `search` | | [`SearchExt`] |
//! | [`AsyncLoader`] | `async-loader` | `expandable` | [`AsyncLoaderExt`] |
//! | [`DragDrop`] | `drag-drop` | | [`DragDropExt`] |
//!
//! Actions on keys without an item, or on a tree without the feature installed,
//! do nothing. Every action that changes state notifies the tree's listeners.
//!
//! ## Visible items
//!
//! [`Expandable`] answers the tree's expansion walk. [`Search`] replaces the walk
//! while its keyword is non-empty, so an active search shows every match and its
//! ancestors regardless of collapse state. Clearing the search restores the walk.
//!
//! ## Example
//!
//! ```
//! use understory_outline::{Tree, TreeNode, TreeOptions};
//! use understory_outline_features::{
//!     Checkable, CheckableExt, CheckableItem, Expandable, ExpandableExt,
//! };
//!
//! let nodes = vec![TreeNode::new("fruit", "Fruit").with_children([
//!     TreeNode::new("apple", "Apple"),
//!     TreeNode::new("pear", "Pear"),
//! ])];
//! let mut tree = Tree::new(
//!     nodes,
//!     TreeOptions::new()
//!         .with_feature(Checkable::default())
//!         .with_feature(Expandable::default()),
//! )
//! .unwrap();
//!
//! tree.expand("fruit");
//! tree.check("apple");
//! assert_eq!(tree.visible_keys(), ["fruit", "apple", "pear"]);
//! assert!(tree.item("fruit").unwrap().indeterminate());
//!
//! tree.check("pear");
//! assert!(tree.item("fruit").unwrap().checked());
//! ```

mod async_loader;
mod checkable;
mod dnd;
mod expandable;
mod search;
mod selectable;

#[cfg(test)]
mod test_util;

pub use async_loader::{
    AsyncLoader, AsyncLoaderExt, BoxError, LoadError, LoadedChildren, LoadingItem, PendingLoad,
};
pub use checkable::{CheckEvent, Checkable, CheckableExt, CheckableItem, CheckableOptions};
pub use dnd::{
    DragDrop, DragDropExt, DragDropOptions, DragItem, DropEvent, DropInfo, drop_position,
    indicator_rect, level_offset,
};
pub use expandable::{ExpandEvent, Expandable, ExpandableExt, ExpandableItem, ExpandableOptions};
pub use search::{
    HighlightSegment, Search, SearchExt, SearchField, SearchItem, SearchOptions,
    highlight_segments,
};
pub use selectable::{
    SelectEvent, Selectable, SelectableExt, SelectableItem, SelectableOptions, SelectionMode,
};
