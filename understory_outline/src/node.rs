// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node store types: the immutable input forest and helpers to edit it between rebuilds.

use std::collections::BTreeMap;

use bitflags::bitflags;
use thiserror::Error;

bitflags! {
    /// Node flags restricting what features may do with a node.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u8 {
        /// Node cannot be selected, checked, or dragged.
        const DISABLED    = 0b0000_0001;
        /// Node has no checkbox; check actions targeting it are ignored.
        const NO_CHECKBOX = 0b0000_0010;
        /// Node cannot start a drag gesture.
        const NO_DRAG     = 0b0000_0100;
    }
}

/// Immutable description of one tree entry.
///
/// Identity is by [`key`](TreeNode::key), which must be unique within one forest snapshot.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TreeNode {
    /// Unique key within the forest.
    pub key: String,
    /// Display text.
    pub label: String,
    /// Child nodes. `None` and an empty list both mean "no children yet".
    pub children: Option<Vec<TreeNode>>,
    /// Behavior flags.
    pub flags: NodeFlags,
    /// Extra named text fields (searchable by name).
    pub fields: BTreeMap<String, String>,
}

impl TreeNode {
    /// Create a childless node.
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            ..Default::default()
        }
    }

    /// Builder: set the children.
    #[must_use]
    pub fn with_children(mut self, children: impl IntoIterator<Item = Self>) -> Self {
        self.children = Some(children.into_iter().collect());
        self
    }

    /// Builder: set the flags.
    #[must_use]
    pub fn with_flags(mut self, flags: NodeFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Builder: add a named text field.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Children as a slice (empty when absent).
    pub fn child_nodes(&self) -> &[Self] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// Returns true if the node has at least one child.
    pub fn has_children(&self) -> bool {
        !self.child_nodes().is_empty()
    }

    /// Returns true if the node is flagged [`NodeFlags::DISABLED`].
    pub fn is_disabled(&self) -> bool {
        self.flags.contains(NodeFlags::DISABLED)
    }

    /// Look up a named text field.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Returns true if `key` names this node or any node below it.
    pub fn contains_key(&self, key: &str) -> bool {
        self.key == key || self.child_nodes().iter().any(|c| c.contains_key(key))
    }
}

/// Position of a drop relative to a target node.
///
/// The discriminants are the conventional `-1 / 0 / 1` drop positions.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Placement {
    /// Insert as the previous sibling of the target.
    Before = -1,
    /// Insert as the last child of the target.
    Inside = 0,
    /// Insert as the next sibling of the target.
    After = 1,
}

impl Placement {
    /// Numeric drop position: `-1`, `0`, or `1`.
    pub fn offset(self) -> i8 {
        self as i8
    }
}

/// Errors from [`move_node`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MoveError {
    /// No node in the forest has the given key.
    #[error("no node with key `{0}`")]
    UnknownKey(String),
    /// The target is the moved node itself or lies inside its subtree.
    #[error("cannot move `{moved}` into its own subtree at `{target}`")]
    IntoOwnSubtree {
        /// Key of the node being moved.
        moved: String,
        /// Key of the requested target.
        target: String,
    },
}

/// Find a node anywhere in `nodes` by key.
pub fn find_node<'a>(nodes: &'a [TreeNode], key: &str) -> Option<&'a TreeNode> {
    for node in nodes {
        if node.key == key {
            return Some(node);
        }
        if let Some(found) = find_node(node.child_nodes(), key) {
            return Some(found);
        }
    }
    None
}

/// Find a node anywhere in `nodes` by key, mutably.
pub fn find_node_mut<'a>(nodes: &'a mut [TreeNode], key: &str) -> Option<&'a mut TreeNode> {
    for node in nodes {
        if node.key == key {
            return Some(node);
        }
        if let Some(found) = node
            .children
            .as_deref_mut()
            .and_then(|c| find_node_mut(c, key))
        {
            return Some(found);
        }
    }
    None
}

/// Move the node `moved` next to or into `target`.
///
/// This is the reparenting helper a drop handler applies to its own copy of the
/// forest before handing it back with `Tree::update_tree`.
pub fn move_node(
    nodes: &mut Vec<TreeNode>,
    moved: &str,
    target: &str,
    placement: Placement,
) -> Result<(), MoveError> {
    let source = find_node(nodes, moved).ok_or_else(|| MoveError::UnknownKey(moved.into()))?;
    if source.contains_key(target) {
        return Err(MoveError::IntoOwnSubtree {
            moved: moved.into(),
            target: target.into(),
        });
    }
    if find_node(nodes, target).is_none() {
        return Err(MoveError::UnknownKey(target.into()));
    }

    let node = take_node(nodes, moved).ok_or_else(|| MoveError::UnknownKey(moved.into()))?;
    match placement {
        Placement::Inside => {
            let parent =
                find_node_mut(nodes, target).ok_or_else(|| MoveError::UnknownKey(target.into()))?;
            parent.children.get_or_insert_with(Vec::new).push(node);
        }
        Placement::Before | Placement::After => {
            let (siblings, idx) =
                siblings_of(nodes, target).ok_or_else(|| MoveError::UnknownKey(target.into()))?;
            let at = if placement == Placement::Before {
                idx
            } else {
                idx + 1
            };
            siblings.insert(at, node);
        }
    }
    Ok(())
}

fn take_node(nodes: &mut Vec<TreeNode>, key: &str) -> Option<TreeNode> {
    if let Some(pos) = nodes.iter().position(|n| n.key == key) {
        return Some(nodes.remove(pos));
    }
    nodes
        .iter_mut()
        .find_map(|n| n.children.as_mut().and_then(|c| take_node(c, key)))
}

fn siblings_of<'a>(
    nodes: &'a mut Vec<TreeNode>,
    key: &str,
) -> Option<(&'a mut Vec<TreeNode>, usize)> {
    if let Some(pos) = nodes.iter().position(|n| n.key == key) {
        return Some((nodes, pos));
    }
    for node in nodes.iter_mut() {
        if let Some(found) = node.children.as_mut().and_then(|c| siblings_of(c, key)) {
            return Some(found);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forest() -> Vec<TreeNode> {
        vec![
            TreeNode::new("a", "A").with_children([
                TreeNode::new("a1", "A1"),
                TreeNode::new("a2", "A2").with_children([TreeNode::new("a2x", "A2X")]),
            ]),
            TreeNode::new("b", "B"),
        ]
    }

    fn keys(nodes: &[TreeNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.key.as_str()).collect()
    }

    #[test]
    fn find_reaches_nested_nodes() {
        let nodes = forest();
        assert_eq!(find_node(&nodes, "a2x").map(|n| n.label.as_str()), Some("A2X"));
        assert!(find_node(&nodes, "zzz").is_none());
    }

    #[test]
    fn empty_children_count_as_none() {
        let n = TreeNode::new("x", "X").with_children([]);
        assert!(!n.has_children());
        assert!(n.child_nodes().is_empty());
    }

    #[test]
    fn move_before_and_after_sibling() {
        let mut nodes = forest();
        move_node(&mut nodes, "b", "a", Placement::Before).unwrap();
        assert_eq!(keys(&nodes), ["b", "a"]);

        move_node(&mut nodes, "a1", "b", Placement::After).unwrap();
        assert_eq!(keys(&nodes), ["b", "a1", "a"]);
        assert_eq!(keys(nodes[2].child_nodes()), ["a2"]);
    }

    #[test]
    fn move_inside_appends_child() {
        let mut nodes = forest();
        move_node(&mut nodes, "b", "a1", Placement::Inside).unwrap();
        assert_eq!(keys(&nodes), ["a"]);
        let a1 = find_node(&nodes, "a1").unwrap();
        assert_eq!(keys(a1.child_nodes()), ["b"]);
    }

    #[test]
    fn move_into_own_subtree_is_rejected() {
        let mut nodes = forest();
        let err = move_node(&mut nodes, "a", "a2x", Placement::Inside).unwrap_err();
        assert!(matches!(err, MoveError::IntoOwnSubtree { .. }));
        // Forest is left untouched.
        assert_eq!(nodes, forest());
    }

    #[test]
    fn move_unknown_key_is_rejected() {
        let mut nodes = forest();
        assert_eq!(
            move_node(&mut nodes, "nope", "a", Placement::After),
            Err(MoveError::UnknownKey("nope".into()))
        );
        assert_eq!(
            move_node(&mut nodes, "b", "nope", Placement::After),
            Err(MoveError::UnknownKey("nope".into()))
        );
    }

    #[test]
    fn placement_offsets() {
        assert_eq!(Placement::Before.offset(), -1);
        assert_eq!(Placement::Inside.offset(), 0);
        assert_eq!(Placement::After.offset(), 1);
    }
}
