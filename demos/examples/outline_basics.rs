// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Expand, select, and tri-state check on a small project tree.
//!
//! Run:
//! - `cargo run -p understory_outline_demos --example outline_basics`

use understory_outline::{Tree, TreeOptions};
use understory_outline_demos::{init_logging, print_outline, project};
use understory_outline_features::{
    Checkable, CheckableExt, Expandable, ExpandableExt, Selectable, SelectableExt,
    SelectableOptions, SelectionMode,
};

fn main() {
    init_logging();

    let mut tree = Tree::new(
        project(),
        TreeOptions::new()
            .with_feature(Expandable::default())
            .with_feature(Selectable::new(SelectableOptions {
                mode: SelectionMode::Multiple,
                ..Default::default()
            }))
            .with_feature(Checkable::default().on_check(|e| {
                println!("checked {} -> {:?}", e.node.key, e.checked_keys);
            })),
    )
    .expect("features resolve");
    tree.subscribe(|| tracing::debug!("tree changed"));

    println!("features: {:?}", tree.features());
    print_outline(&tree);

    tree.expand("src");
    tree.expand("ui");
    print_outline(&tree);

    tree.check("button");
    print_outline(&tree);

    tree.check("tree_view");
    tree.check("lib");
    print_outline(&tree);

    tree.select("lib");
    tree.select("readme");
    println!("selected: {:?}", tree.selected_keys());
    print_outline(&tree);

    tree.collapse_all();
    tree.expand_to("button");
    println!("expanded: {:?}", tree.expanded_keys());
    print_outline(&tree);
}
