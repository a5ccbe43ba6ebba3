// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Item registry: per-node runtime items derived from the node store.
//!
//! Items are recreated wholesale by every rebuild. Anything that must survive a
//! rebuild lives in a [`Feature`](crate::Feature), never on an [`Item`].

use indexmap::IndexMap;
use tracing::warn;

use crate::feature::{Feature, FeatureSet};
use crate::node::TreeNode;

/// Predicate deciding whether a node is a leaf.
pub type LeafPredicate = Box<dyn Fn(&TreeNode) -> bool>;

/// Runtime item derived from one [`TreeNode`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Item {
    key: String,
    parent_key: Option<String>,
    depth: usize,
    is_leaf: bool,
    // Index path from the forest root to the source node.
    path: Vec<usize>,
    children: Vec<String>,
}

impl Item {
    /// Node key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Key of the parent item, or `None` for a root.
    pub fn parent_key(&self) -> Option<&str> {
        self.parent_key.as_deref()
    }

    /// Depth below the forest roots (roots are 0).
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Whether the item is a leaf.
    pub fn is_leaf(&self) -> bool {
        self.is_leaf
    }

    /// Keys of the direct children, in document order.
    pub fn child_keys(&self) -> &[String] {
        &self.children
    }
}

/// Node store plus the flattened, document-ordered item map derived from it.
pub struct Registry {
    nodes: Vec<TreeNode>,
    items: IndexMap<String, Item>,
    roots: Vec<String>,
    leaf: Option<LeafPredicate>,
}

impl core::fmt::Debug for Registry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Registry")
            .field("roots", &self.roots)
            .field("items", &self.items.len())
            .field("leaf_predicate", &self.leaf.is_some())
            .finish_non_exhaustive()
    }
}

impl Registry {
    pub(crate) fn new(nodes: Vec<TreeNode>, leaf: Option<LeafPredicate>) -> Self {
        Self {
            nodes,
            items: IndexMap::new(),
            roots: Vec::new(),
            leaf,
        }
    }

    /// The current node store.
    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    /// Look up an item by key. Unknown keys are not an error.
    pub fn get(&self, key: &str) -> Option<&Item> {
        self.items.get(key)
    }

    /// Returns true if an item exists for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.items.contains_key(key)
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if there are no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// All items in document (pre-order) order.
    pub fn iter(&self) -> impl Iterator<Item = &Item> + '_ {
        self.items.values()
    }

    /// Keys of the root items, in document order.
    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    /// The source node of an item.
    pub fn node(&self, key: &str) -> Option<&TreeNode> {
        self.get(key).and_then(|item| self.node_at(&item.path))
    }

    /// Parent items of `key`, nearest first.
    pub fn ancestors<'a>(&'a self, key: &str) -> impl Iterator<Item = &'a Item> + use<'a> {
        let mut next = self.get(key).and_then(|item| item.parent_key.as_deref());
        core::iter::from_fn(move || {
            let item = self.get(next?)?;
            next = item.parent_key.as_deref();
            Some(item)
        })
    }

    /// Keys of every item below `key`, in document order (excluding `key`).
    pub fn descendant_keys<'a>(&'a self, key: &str) -> Vec<&'a str> {
        let mut out = Vec::new();
        if let Some(item) = self.get(key) {
            self.collect_descendants(item, &mut out);
        }
        out
    }

    /// Returns true if `key` lies strictly below `ancestor`.
    pub fn is_descendant(&self, ancestor: &str, key: &str) -> bool {
        self.ancestors(key).any(|item| item.key == ancestor)
    }

    fn collect_descendants<'a>(&'a self, item: &'a Item, out: &mut Vec<&'a str>) {
        for child in &item.children {
            if let Some(child) = self.get(child) {
                out.push(child.key.as_str());
                self.collect_descendants(child, out);
            }
        }
    }

    fn node_at(&self, path: &[usize]) -> Option<&TreeNode> {
        let (first, rest) = path.split_first()?;
        let mut node = self.nodes.get(*first)?;
        for idx in rest {
            node = node.child_nodes().get(*idx)?;
        }
        Some(node)
    }

    pub(crate) fn replace_nodes(&mut self, nodes: Vec<TreeNode>) {
        self.nodes = nodes;
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut Vec<TreeNode> {
        &mut self.nodes
    }

    /// Clear and repopulate the item map, depth-first.
    pub(crate) fn rebuild(&mut self) {
        self.items.clear();
        let mut path = Vec::new();
        self.roots = derive_items(
            &self.nodes,
            None,
            0,
            &mut path,
            self.leaf.as_ref(),
            &mut self.items,
        );
    }
}

fn derive_items(
    nodes: &[TreeNode],
    parent: Option<&str>,
    depth: usize,
    path: &mut Vec<usize>,
    leaf: Option<&LeafPredicate>,
    items: &mut IndexMap<String, Item>,
) -> Vec<String> {
    let mut keys = Vec::with_capacity(nodes.len());
    for (idx, node) in nodes.iter().enumerate() {
        if items.contains_key(&node.key) {
            warn!(key = %node.key, "duplicate node key, skipping its subtree");
            continue;
        }
        path.push(idx);
        let is_leaf = match leaf {
            Some(is_leaf) => is_leaf(node),
            None => !node.has_children(),
        };
        items.insert(
            node.key.clone(),
            Item {
                key: node.key.clone(),
                parent_key: parent.map(ToOwned::to_owned),
                depth,
                is_leaf,
                path: path.clone(),
                children: Vec::new(),
            },
        );
        let children = derive_items(
            node.child_nodes(),
            Some(node.key.as_str()),
            depth + 1,
            path,
            leaf,
            items,
        );
        if let Some(item) = items.get_mut(&node.key) {
            item.children = children;
        }
        path.pop();
        keys.push(node.key.clone());
    }
    keys
}

/// Borrowed view of an [`Item`] together with the tree it belongs to.
///
/// Features attach per-item capabilities by implementing extension traits on
/// this type, reading their state through [`ItemRef::feature`].
#[derive(Clone, Copy)]
pub struct ItemRef<'a> {
    item: &'a Item,
    registry: &'a Registry,
    features: &'a FeatureSet,
}

impl core::fmt::Debug for ItemRef<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ItemRef")
            .field("item", self.item)
            .finish_non_exhaustive()
    }
}

impl<'a> ItemRef<'a> {
    pub(crate) fn new(item: &'a Item, registry: &'a Registry, features: &'a FeatureSet) -> Self {
        Self {
            item,
            registry,
            features,
        }
    }

    /// The underlying item.
    pub fn item(&self) -> &'a Item {
        self.item
    }

    /// Node key.
    pub fn key(&self) -> &'a str {
        &self.item.key
    }

    /// Key of the parent item, or `None` for a root.
    pub fn parent_key(&self) -> Option<&'a str> {
        self.item.parent_key.as_deref()
    }

    /// Depth below the forest roots (roots are 0).
    pub fn depth(&self) -> usize {
        self.item.depth
    }

    /// Whether the item is a leaf.
    pub fn is_leaf(&self) -> bool {
        self.item.is_leaf
    }

    /// Source node.
    ///
    /// # Panics
    ///
    /// Panics if the item outlived the node store it was derived from, which
    /// cannot happen through the public API.
    pub fn node(&self) -> &'a TreeNode {
        self.registry
            .node_at(&self.item.path)
            .expect("item path is valid for the current node store")
    }

    /// The parent item, if any.
    pub fn parent(&self) -> Option<Self> {
        let parent = self.registry.get(self.item.parent_key.as_deref()?)?;
        Some(Self::new(parent, self.registry, self.features))
    }

    /// Direct children, in document order.
    pub fn children(&self) -> impl Iterator<Item = Self> + use<'a> {
        let registry = self.registry;
        let features = self.features;
        self.item
            .children
            .iter()
            .filter_map(move |key| registry.get(key))
            .map(move |item| Self::new(item, registry, features))
    }

    /// The registry this item belongs to.
    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    /// State of an installed feature, if present.
    pub fn feature<F: Feature>(&self) -> Option<&'a F> {
        self.features.get::<F>()
    }
}
