// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use understory_outline::{Tree, TreeNode, TreeOptions};
use understory_outline_features::{
    Checkable, CheckableExt, CheckableItem, Expandable, ExpandableOptions, Search, SearchExt,
    SearchOptions,
};

/// A full `fanout`-ary forest of the given depth. Keys encode the index path.
fn gen_forest(fanout: usize, depth: usize) -> Vec<TreeNode> {
    fn level(prefix: &str, fanout: usize, depth: usize) -> Vec<TreeNode> {
        (0..fanout)
            .map(|i| {
                let key = if prefix.is_empty() {
                    format!("{i}")
                } else {
                    format!("{prefix}.{i}")
                };
                let node = TreeNode::new(key.clone(), format!("node {key}"));
                if depth > 1 {
                    node.with_children(level(&key, fanout, depth - 1))
                } else {
                    node
                }
            })
            .collect()
    }
    level("", fanout, depth)
}

fn count(nodes: &[TreeNode]) -> usize {
    nodes.iter().map(|n| 1 + count(n.child_nodes())).sum()
}

fn sizes() -> [(usize, usize); 3] {
    [(10, 3), (8, 4), (6, 5)]
}

fn bench_rebuild(c: &mut Criterion) {
    let mut group = c.benchmark_group("rebuild");
    for (fanout, depth) in sizes() {
        let forest = gen_forest(fanout, depth);
        group.throughput(Throughput::Elements(count(&forest) as u64));
        let mut tree = Tree::new(
            forest.clone(),
            TreeOptions::new()
                .with_feature(Expandable::default())
                .with_feature(Checkable::default()),
        )
        .unwrap();
        tree.check("0");
        group.bench_function(format!("update_tree_f{fanout}_d{depth}"), |b| {
            b.iter_batched(
                || forest.clone(),
                |nodes| tree.update_tree(nodes),
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn bench_visible(c: &mut Criterion) {
    let mut group = c.benchmark_group("visible");
    for (fanout, depth) in sizes() {
        let forest = gen_forest(fanout, depth);
        group.throughput(Throughput::Elements(count(&forest) as u64));
        let tree = Tree::new(
            forest,
            TreeOptions::new().with_feature(Expandable::new(ExpandableOptions {
                default_expand_all: true,
                ..Default::default()
            })),
        )
        .unwrap();
        group.bench_function(format!("expanded_walk_f{fanout}_d{depth}"), |b| {
            b.iter(|| black_box(tree.visible_keys().len()));
        });
    }
    group.finish();
}

fn bench_check(c: &mut Criterion) {
    let mut group = c.benchmark_group("check");
    for (fanout, depth) in sizes() {
        let forest = gen_forest(fanout, depth);
        let mut tree = Tree::new(
            forest,
            TreeOptions::new().with_feature(Checkable::default()),
        )
        .unwrap();
        let deep = vec!["0"; depth].join(".");
        group.bench_function(format!("toggle_root_f{fanout}_d{depth}"), |b| {
            b.iter(|| tree.toggle_check("0"));
        });
        group.bench_function(format!("toggle_leaf_f{fanout}_d{depth}"), |b| {
            b.iter(|| tree.toggle_check(&deep));
        });
        group.bench_function(format!("indeterminate_f{fanout}_d{depth}"), |b| {
            tree.check(&deep);
            b.iter(|| black_box(tree.item("0").map(|i| i.indeterminate())));
        });
    }
    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    for (fanout, depth) in sizes() {
        let forest = gen_forest(fanout, depth);
        group.throughput(Throughput::Elements(count(&forest) as u64));
        let mut tree = Tree::new(
            forest,
            TreeOptions::new()
                .with_feature(Expandable::default())
                .with_feature(Search::new(SearchOptions {
                    delay: std::time::Duration::ZERO,
                    ..Default::default()
                })),
        )
        .unwrap();
        group.bench_function(format!("match_and_walk_f{fanout}_d{depth}"), |b| {
            b.iter(|| {
                tree.search("NODE 1.2");
                black_box(tree.visible_keys().len())
            });
        });
        tree.clear_search();
    }
    group.finish();
}

criterion_group!(benches, bench_rebuild, bench_visible, bench_check, bench_search);
criterion_main!(benches);
