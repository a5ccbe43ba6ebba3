// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared setup for the outline demos.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use understory_outline::{Tree, TreeNode};
use understory_outline_features::{CheckableItem, ExpandableItem, SearchItem, SelectableItem};

/// Install a stderr subscriber filtered by `RUST_LOG` (default `info`).
///
/// Call once near the start of `main`.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

/// A small project explorer forest.
pub fn project() -> Vec<TreeNode> {
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

/// Print the visible items as an indented outline with state markers.
pub fn print_outline(tree: &Tree) {
    for item in tree.visible_items() {
        let twisty = if item.is_leaf() {
            ' '
        } else if item.expanded() {
            'v'
        } else {
            '>'
        };
        let check = if item.checked() {
            "[x]"
        } else if item.indeterminate() {
            "[-]"
        } else {
            "[ ]"
        };
        let label: String = item
            .highlight()
            .iter()
            .map(|s| {
                if s.matched {
                    format!("*{}*", s.text)
                } else {
                    s.text.to_owned()
                }
            })
            .collect();
        let cursor = if item.selected() { " <" } else { "" };
        println!(
            "{:indent$}{twisty} {check} {label}{cursor}",
            "",
            indent = item.depth() * 2
        );
    }
    println!();
}
