// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drag-and-drop over fixed-height rows, applying the drop to the node store.
//!
//! Run:
//! - `cargo run -p understory_outline_demos --example outline_drag`

use kurbo::{Point, Rect};
use understory_outline::{Tree, TreeOptions};
use understory_outline_demos::{init_logging, print_outline, project};
use understory_outline_features::{DragDrop, DragDropExt, Expandable, ExpandableExt};

const ROW_H: f64 = 24.0;
const WIDTH: f64 = 240.0;
// The tree scrolls inside a container placed at (16, 64) in client space.
const CONTAINER: Rect = Rect::new(16.0, 64.0, 16.0 + WIDTH, 64.0 + 20.0 * ROW_H);

fn row_rect(tree: &Tree, key: &str) -> Option<Rect> {
    let index = tree.visible_keys().iter().position(|k| k == key)?;
    let y0 = CONTAINER.y0 + index as f64 * ROW_H;
    Some(Rect::new(CONTAINER.x0, y0, CONTAINER.x1, y0 + ROW_H))
}

fn main() {
    init_logging();

    let mut tree = Tree::new(
        project(),
        TreeOptions::new()
            .with_feature(Expandable::default())
            .with_feature(DragDrop::default()),
    )
    .expect("features resolve");
    tree.expand_all();
    print_outline(&tree);

    let start = row_rect(&tree, "readme").expect("readme is visible").center();
    tree.drag_start("readme", start);

    // Sweep the pointer down the `ui` row, drifting right by one indent.
    let ui = row_rect(&tree, "ui").expect("ui is visible");
    for dy in [2.0, 12.0, 22.0] {
        let pointer = Point::new(start.x + 24.0, ui.y0 + dy);
        if let Some(info) = tree.drag_over("ui", pointer, CONTAINER, ui) {
            println!(
                "over ui at dy={dy}: {:?} level {:+} indicator {:?}",
                info.position, info.level_offset, info.indicator
            );
        }
    }

    let pointer = Point::new(start.x, ui.y0 + 12.0);
    tree.drag_over("ui", pointer, CONTAINER, ui);
    let Some(event) = tree.drop_dragged() else {
        println!("nothing dropped");
        return;
    };
    println!("drop: {event:?}");

    let mut nodes = tree.nodes().to_vec();
    match event.apply(&mut nodes) {
        Ok(()) => tree.update_tree(nodes),
        Err(err) => tracing::warn!(%err, "drop rejected"),
    }
    tree.expand_all();
    print_outline(&tree);
}
