// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::cell::Cell;
use std::rc::Rc;

use understory_outline::{Tree, TreeNode};

/// A small project tree with 9 items:
///
/// ```text
/// docs
///   guide
///   api
/// src
///   lib
///   ui
///     button
///     tree_view
/// readme
/// ```
pub(crate) fn sample_nodes() -> Vec<TreeNode> {
    vec![
        TreeNode::new("docs", "Docs").with_children([
            TreeNode::new("guide", "Getting Started Guide"),
            TreeNode::new("api", "API Reference"),
        ]),
        TreeNode::new("src", "src").with_children([
            TreeNode::new("lib", "lib.rs"),
            TreeNode::new("ui", "ui").with_children([
                TreeNode::new("button", "Button.rs"),
                TreeNode::new("tree_view", "TreeView.rs"),
            ]),
        ]),
        TreeNode::new("readme", "README.md"),
    ]
}

/// Subscribe a listener that counts notifications.
pub(crate) fn counter(tree: &mut Tree) -> Rc<Cell<usize>> {
    let hits = Rc::new(Cell::new(0));
    let sink = Rc::clone(&hits);
    tree.subscribe(move || sink.set(sink.get() + 1));
    hits
}
