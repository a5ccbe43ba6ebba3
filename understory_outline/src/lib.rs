// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Outline: a headless engine for interactive outline trees.
//!
//! Understory Outline backs file-explorer style tree widgets without rendering anything.
//!
//! - Stores a forest of [`TreeNode`]s (the node store).
//! - Derives one [`Item`] per node with parent linkage, depth, and leafness (the item registry).
//! - Lets independent [`Feature`]s attach state and capabilities to items, ordered by
//!   declared dependencies and checked for conflicts.
//!
//! ## Where this fits
//!
//! A renderer reads [`Tree::visible_items`] once per frame and re-renders when a
//! [`Tree::subscribe`] listener fires. A virtualization layer can slice the visible
//! sequence. Pointer sources feed coordinates into drag features. None of those
//! layers live here.
//!
//! ## Rebuild lifecycle
//!
//! [`Tree::update_tree`] replaces the node store and calls [`Tree::rebuild`], which:
//!
//! 1) clears and re-derives every item, depth-first;
//! 2) calls [`Feature::install`] for every feature in resolved order;
//! 3) calls [`Feature::on_rebuild`] for every feature;
//! 4) notifies listeners.
//!
//! Items do not survive a rebuild. A feature keeps durable state in its own value
//! and re-projects it onto the new items from `install`.
//!
//! ## Capabilities
//!
//! Features expose per-item capabilities as extension traits on [`ItemRef`] and
//! actions as extension traits on [`Tree`]. See the `understory_outline_features`
//! crate for expand, select, tri-state check, search, lazy loading, and drag-and-drop.
//!
//! ## Minimal usage
//!
//! ```
//! use understory_outline::{Feature, Tree, TreeNode, TreeOptions};
//!
//! /// Shows every node.
//! struct Open;
//!
//! impl Feature for Open {
//!     fn name(&self) -> &'static str {
//!         "open"
//!     }
//!     fn is_expanded(&self, _key: &str) -> Option<bool> {
//!         Some(true)
//!     }
//! }
//!
//! let nodes = vec![
//!     TreeNode::new("src", "src").with_children([TreeNode::new("lib", "lib.rs")]),
//!     TreeNode::new("readme", "README.md"),
//! ];
//! let tree = Tree::new(nodes, TreeOptions::new().with_feature(Open)).unwrap();
//!
//! assert_eq!(tree.visible_keys(), ["src", "lib", "readme"]);
//! assert_eq!(tree.item("lib").unwrap().depth(), 1);
//! ```
//!
//! All mutation and notification is synchronous within the caller's stack.

mod feature;
mod item;
mod node;
mod tree;

pub use feature::{Feature, FeatureSet, ResolveError};
pub use item::{Item, ItemRef, LeafPredicate, Registry};
pub use node::{MoveError, NodeFlags, Placement, TreeNode, find_node, find_node_mut, move_node};
pub use tree::{Subscription, Tree, TreeOptions};
