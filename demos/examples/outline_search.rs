// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Debounced search driven by a simple event loop.
//!
//! Run:
//! - `cargo run -p understory_outline_demos --example outline_search`

use std::thread;
use std::time::{Duration, Instant};

use understory_outline::{Tree, TreeOptions};
use understory_outline_demos::{init_logging, print_outline, project};
use understory_outline_features::{Expandable, Search, SearchExt, SearchOptions};

fn main() {
    init_logging();

    let mut tree = Tree::new(
        project(),
        TreeOptions::new()
            .with_feature(Expandable::default())
            .with_feature(Search::new(SearchOptions {
                delay: Duration::from_millis(150),
                ..Default::default()
            })),
    )
    .expect("features resolve");

    // Keystrokes arrive faster than the debounce window; only the last one applies.
    for keyword in ["t", "tr", "tre", "tree"] {
        tree.search(keyword);
        thread::sleep(Duration::from_millis(40));
    }

    while let Some(deadline) = tree.next_deadline() {
        thread::sleep(deadline.saturating_duration_since(Instant::now()));
        tree.poll(Instant::now());
    }

    println!("keyword: {:?}", tree.keyword());
    println!("matched: {:?}", tree.matched_keys());
    println!("result:  {:?}", tree.search_result_keys());
    print_outline(&tree);

    tree.clear_search();
    print_outline(&tree);
}
