// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Lazily loaded directories with a local executor.
//!
//! Run:
//! - `cargo run -p understory_outline_demos --example outline_lazy`

use futures::executor::LocalPool;
use futures::task::LocalSpawnExt;
use std::cell::RefCell;
use std::rc::Rc;
use understory_outline::{Tree, TreeNode, TreeOptions};
use understory_outline_demos::{init_logging, print_outline};
use understory_outline_features::{
    AsyncLoader, AsyncLoaderExt, BoxError, Expandable, ExpandableExt, LoadedChildren,
};

fn dir(key: &str) -> TreeNode {
    TreeNode::new(key, key.rsplit('/').next().unwrap_or(key))
}

fn file(key: &str) -> TreeNode {
    dir(key).with_field("kind", "file")
}

/// Pretend directory listing. `broken` directories fail to load.
async fn list(key: String) -> Result<Vec<TreeNode>, BoxError> {
    if key.ends_with("broken") {
        return Err(format!("permission denied: {key}").into());
    }
    Ok(vec![
        dir(&format!("{key}/nested")),
        file(&format!("{key}/a.txt")),
        file(&format!("{key}/b.txt")),
    ])
}

fn main() {
    init_logging();

    let mut tree = Tree::new(
        vec![dir("home"), dir("broken"), file("notes.txt")],
        TreeOptions::new()
            .with_feature(Expandable::default())
            .with_feature(AsyncLoader::new(|node: &TreeNode| list(node.key.clone())))
            .with_leaf_predicate(|node| node.field("kind") == Some("file")),
    )
    .expect("features resolve");

    let mut pool = LocalPool::new();
    let done: Rc<RefCell<Vec<LoadedChildren>>> = Rc::default();

    for key in ["home", "broken"] {
        if let Some(pending) = tree.expand(key) {
            let done = Rc::clone(&done);
            pool.spawner()
                .spawn_local(async move {
                    let loaded = pending.fetch().await;
                    done.borrow_mut().push(loaded);
                })
                .expect("local pool accepts tasks");
        }
    }
    println!("loading: {:?}", tree.loading_keys());
    print_outline(&tree);

    pool.run();
    for loaded in done.take() {
        if let Err(err) = tree.complete_load(loaded) {
            tracing::error!(key = %err.key, error = %err.source, "{err}");
        }
    }
    println!("loading: {:?}", tree.loading_keys());

    if let Some(pending) = tree.expand("home/nested") {
        let loaded = futures::executor::block_on(pending.fetch());
        tree.complete_load(loaded).expect("nested listing succeeds");
    }
    print_outline(&tree);
}
