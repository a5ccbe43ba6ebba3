// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! On-demand child loading.
//!
//! [`AsyncLoader`] holds a caller-supplied loader that produces the children of a
//! node. The first time a non-leaf item without children is expanded, the
//! expand action marks it loading and returns a [`PendingLoad`]. The host drives
//! the future on whatever executor it has and hands the outcome back:
//!
//! ```
//! use futures::executor::block_on;
//! use understory_outline::{Tree, TreeNode, TreeOptions};
//! use understory_outline_features::{
//!     AsyncLoader, AsyncLoaderExt, BoxError, Expandable, ExpandableExt, LoadingItem,
//! };
//!
//! let loader = AsyncLoader::new(|node: &TreeNode| {
//!     let key = node.key.clone();
//!     async move { Ok::<_, BoxError>(vec![TreeNode::new(format!("{key}/child"), "child")]) }
//! });
//! let mut tree = Tree::new(
//!     vec![TreeNode::new("dir", "dir")],
//!     TreeOptions::new()
//!         .with_feature(Expandable::default())
//!         .with_feature(loader)
//!         .with_leaf_predicate(|_| false),
//! )
//! .unwrap();
//!
//! let pending = tree.expand("dir").unwrap();
//! assert!(tree.item("dir").unwrap().loading());
//!
//! let loaded = block_on(pending.fetch());
//! assert!(tree.complete_load(loaded).unwrap());
//! assert_eq!(tree.visible_keys(), ["dir", "dir/child"]);
//! ```
//!
//! Lazy trees need [`TreeOptions::with_leaf_predicate`](understory_outline::TreeOptions::with_leaf_predicate):
//! under the default rule a node without children is a leaf and cannot be expanded.
//!
//! A key has at most one load in flight. Re-expanding it while loading, or after
//! a failure, does not call the loader again. Once children are attached the
//! node is loaded; a host that clears them with
//! [`Tree::update_tree`](understory_outline::Tree::update_tree) gets a fresh
//! fetch on the next expand.

use std::collections::HashSet;
use std::future::Future;

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use thiserror::Error;
use tracing::{debug, trace, warn};
use understory_outline::{Feature, ItemRef, Registry, Tree, TreeNode};

use crate::Expandable;

/// Error type loaders may fail with.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

type LoadFuture = LocalBoxFuture<'static, Result<Vec<TreeNode>, BoxError>>;
type LoadFn = Box<dyn Fn(&TreeNode) -> LoadFuture>;

/// A loader failed to produce children.
#[derive(Debug, Error)]
#[error("loading children of `{key}` failed")]
pub struct LoadError {
    /// Key of the node whose children were requested.
    pub key: String,
    /// The loader's error.
    #[source]
    pub source: BoxError,
}

/// A child fetch started by an expand action.
pub struct PendingLoad {
    key: String,
    future: LoadFuture,
}

impl core::fmt::Debug for PendingLoad {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PendingLoad")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl PendingLoad {
    /// Key of the node being loaded.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Run the loader to completion.
    pub async fn fetch(self) -> LoadedChildren {
        let Self { key, future } = self;
        let result = future.await;
        LoadedChildren { key, result }
    }
}

/// Outcome of a [`PendingLoad`], to be passed to [`AsyncLoaderExt::complete_load`].
#[derive(Debug)]
pub struct LoadedChildren {
    /// Key of the loaded node.
    pub key: String,
    /// The children, or the loader's error.
    pub result: Result<Vec<TreeNode>, BoxError>,
}

/// Lazy child loading feature. Requires [`Expandable`].
pub struct AsyncLoader {
    load: LoadFn,
    loading: HashSet<String>,
}

impl core::fmt::Debug for AsyncLoader {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AsyncLoader")
            .field("loading", &self.loading)
            .finish_non_exhaustive()
    }
}

impl AsyncLoader {
    /// Feature name.
    pub const NAME: &'static str = "async-loader";

    /// Create the feature around `loader`, which receives the node to populate.
    pub fn new<F, Fut>(loader: F) -> Self
    where
        F: Fn(&TreeNode) -> Fut + 'static,
        Fut: Future<Output = Result<Vec<TreeNode>, BoxError>> + 'static,
    {
        Self {
            load: Box::new(move |node: &TreeNode| loader(node).boxed_local()),
            loading: HashSet::new(),
        }
    }

    /// Returns true while a fetch for `key` is outstanding or has failed.
    pub fn is_loading(&self, key: &str) -> bool {
        self.loading.contains(key)
    }

    /// Loading keys that have an item, in document order.
    pub fn loading_keys(&self, registry: &Registry) -> Vec<String> {
        registry
            .iter()
            .filter(|item| self.loading.contains(item.key()))
            .map(|item| item.key().to_owned())
            .collect()
    }

    /// Start a fetch for `key` if it is an unloaded non-leaf item that is not already loading.
    pub fn begin(&mut self, registry: &Registry, key: &str) -> Option<PendingLoad> {
        let item = registry.get(key)?;
        let node = registry.node(key)?;
        if item.is_leaf() || node.has_children() || self.loading.contains(key) {
            return None;
        }
        self.loading.insert(key.to_owned());
        debug!(key, "child load started");
        Some(PendingLoad {
            key: key.to_owned(),
            future: (self.load)(node),
        })
    }

    fn finish(&mut self, key: &str) {
        self.loading.remove(key);
    }
}

impl Feature for AsyncLoader {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn depends(&self) -> &'static [&'static str] {
        &[Expandable::NAME]
    }
}

pub(crate) fn begin_load(tree: &mut Tree, key: &str) -> Option<PendingLoad> {
    tree.update_feature::<AsyncLoader, _>(|loader, reg| loader.begin(reg, key))
        .flatten()
}

/// Completing loads on a [`Tree`].
pub trait AsyncLoaderExt {
    /// Assign loaded children and rebuild.
    ///
    /// Returns `Ok(true)` if the children were attached. If the node left the
    /// tree while loading, the children are dropped and `Ok(false)` is returned.
    /// A loader error is passed through and the item stays loading.
    fn complete_load(&mut self, loaded: LoadedChildren) -> Result<bool, LoadError>;
    /// Keys currently loading, in document order.
    fn loading_keys(&self) -> Vec<String>;
}

impl AsyncLoaderExt for Tree {
    fn complete_load(&mut self, loaded: LoadedChildren) -> Result<bool, LoadError> {
        let LoadedChildren { key, result } = loaded;
        let children = match result {
            Ok(children) => children,
            Err(source) => {
                debug!(%key, error = %source, "child load failed");
                return Err(LoadError { key, source });
            }
        };
        let count = children.len();
        let attached = self.set_node_children(&key, children);
        self.update_feature::<AsyncLoader, _>(|loader, _| loader.finish(&key));
        if !attached {
            warn!(%key, "node left the tree while loading, dropping its children");
            self.notify();
            return Ok(false);
        }
        trace!(%key, children = count, "child load finished");
        self.rebuild();
        Ok(true)
    }

    fn loading_keys(&self) -> Vec<String> {
        self.feature::<AsyncLoader>()
            .map(|f| f.loading_keys(self.registry()))
            .unwrap_or_default()
    }
}

/// Per-item loading state.
pub trait LoadingItem {
    /// True while the item's children are being fetched (or the fetch failed).
    fn loading(&self) -> bool;
}

impl LoadingItem for ItemRef<'_> {
    fn loading(&self) -> bool {
        self.feature::<AsyncLoader>()
            .is_some_and(|f| f.is_loading(self.key()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::counter;
    use crate::{ExpandableExt, ExpandableItem};
    use futures::executor::block_on;
    use std::cell::Cell;
    use std::rc::Rc;
    use understory_outline::{ResolveError, TreeOptions};

    fn is_file(node: &TreeNode) -> bool {
        node.field("kind") == Some("file")
    }

    fn lazy_tree(calls: Rc<Cell<usize>>, fail: bool) -> Tree {
        lazy_forest(
            calls,
            fail,
            vec![
                TreeNode::new("root", "root"),
                TreeNode::new("notes", "notes.txt").with_field("kind", "file"),
            ],
        )
    }

    fn lazy_forest(calls: Rc<Cell<usize>>, fail: bool, roots: Vec<TreeNode>) -> Tree {
        let loader = AsyncLoader::new(move |node: &TreeNode| {
            calls.set(calls.get() + 1);
            let key = node.key.clone();
            async move {
                if fail {
                    return Err::<Vec<TreeNode>, BoxError>("offline".into());
                }
                Ok(vec![
                    TreeNode::new(format!("{key}/a"), "a").with_field("kind", "file"),
                    TreeNode::new(format!("{key}/sub"), "sub"),
                ])
            }
        });
        Tree::new(
            roots,
            TreeOptions::new()
                .with_feature(loader)
                .with_feature(Expandable::default())
                .with_leaf_predicate(is_file),
        )
        .unwrap()
    }

    #[test]
    fn loader_runs_once_across_toggles() {
        let calls = Rc::new(Cell::new(0));
        let mut tree = lazy_tree(Rc::clone(&calls), false);

        let pending = tree.expand("root").unwrap();
        assert_eq!(pending.key(), "root");
        tree.collapse("root");
        assert!(tree.expand("root").is_none());
        tree.toggle_expanded("root");
        assert!(tree.toggle_expanded("root").is_none());
        assert_eq!(calls.get(), 1);

        let loaded = block_on(pending.fetch());
        assert!(tree.complete_load(loaded).unwrap());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn loading_flag_and_rebuild() {
        let mut tree = lazy_tree(Rc::new(Cell::new(0)), false);
        let hits = counter(&mut tree);

        let pending = tree.expand("root").unwrap();
        assert_eq!(hits.get(), 1, "expand notifies once loading is set");
        assert!(tree.item("root").unwrap().loading());
        assert_eq!(tree.loading_keys(), ["root"]);
        assert_eq!(tree.visible_keys(), ["root", "notes"]);

        let loaded = block_on(pending.fetch());
        assert!(tree.complete_load(loaded).unwrap());
        assert_eq!(hits.get(), 2, "rebuild notifies");
        assert!(!tree.item("root").unwrap().loading());
        assert!(tree.item("root").unwrap().expanded());
        assert_eq!(tree.visible_keys(), ["root", "root/a", "root/sub", "notes"]);
        assert_eq!(tree.item("root/sub").unwrap().depth(), 1);
    }

    #[test]
    fn loaded_children_can_load_their_own() {
        let calls = Rc::new(Cell::new(0));
        let mut tree = lazy_tree(Rc::clone(&calls), false);
        let loaded = block_on(tree.expand("root").unwrap().fetch());
        tree.complete_load(loaded).unwrap();

        let loaded = block_on(tree.expand("root/sub").unwrap().fetch());
        tree.complete_load(loaded).unwrap();
        assert_eq!(calls.get(), 2);
        assert!(tree.item("root/sub/a").is_some());
        assert!(tree.expand("root/a").is_none(), "files are leaves");
    }

    #[test]
    fn failure_keeps_loading_and_reports_key() {
        let calls = Rc::new(Cell::new(0));
        let mut tree = lazy_tree(Rc::clone(&calls), true);
        let loaded = block_on(tree.expand("root").unwrap().fetch());
        let err = tree.complete_load(loaded).unwrap_err();
        assert_eq!(err.key, "root");
        assert_eq!(err.to_string(), "loading children of `root` failed");
        assert_eq!(err.source.to_string(), "offline");
        assert!(tree.item("root").unwrap().loading());

        tree.collapse("root");
        assert!(tree.expand("root").is_none());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn cleared_children_are_fetched_again() {
        let calls = Rc::new(Cell::new(0));
        let mut tree = lazy_tree(Rc::clone(&calls), false);
        let loaded = block_on(tree.expand("root").unwrap().fetch());
        assert!(tree.complete_load(loaded).unwrap());

        let mut nodes = tree.nodes().to_vec();
        nodes[0].children = None;
        tree.update_tree(nodes);
        assert!(tree.item("root/a").is_none());

        tree.collapse("root");
        let pending = tree.expand("root").expect("cleared node loads again");
        assert_eq!(calls.get(), 2);
        assert!(tree.item("root").unwrap().loading());

        assert!(tree.complete_load(block_on(pending.fetch())).unwrap());
        assert_eq!(tree.visible_keys(), ["root", "root/a", "root/sub", "notes"]);
    }

    #[test]
    fn concurrent_loads_complete_independently() {
        let calls = Rc::new(Cell::new(0));
        let mut tree = lazy_forest(
            Rc::clone(&calls),
            false,
            vec![TreeNode::new("a", "a"), TreeNode::new("b", "b")],
        );
        let first = tree.expand("a").unwrap();
        let second = tree.expand("b").unwrap();
        assert_eq!(calls.get(), 2);
        assert_eq!(tree.loading_keys(), ["a", "b"]);

        assert!(tree.complete_load(block_on(second.fetch())).unwrap());
        assert!(!tree.item("b").unwrap().loading());
        assert!(tree.item("a").unwrap().loading());
        assert_eq!(tree.loading_keys(), ["a"]);
        assert_eq!(tree.visible_keys(), ["a", "b", "b/a", "b/sub"]);

        assert!(tree.complete_load(block_on(first.fetch())).unwrap());
        assert!(tree.loading_keys().is_empty());
        assert_eq!(tree.visible_keys(), ["a", "a/a", "a/sub", "b", "b/a", "b/sub"]);
    }

    #[test]
    fn detached_node_drops_children() {
        let mut tree = lazy_tree(Rc::new(Cell::new(0)), false);
        let pending = tree.expand("root").unwrap();
        tree.update_tree(vec![TreeNode::new("other", "other")]);

        let loaded = block_on(pending.fetch());
        assert!(!tree.complete_load(loaded).unwrap());
        assert!(tree.loading_keys().is_empty());
        assert_eq!(tree.len(), 1);
        assert!(tree.item("root/a").is_none());
    }

    #[test]
    fn nodes_with_children_are_not_fetched() {
        let calls = Rc::new(Cell::new(0));
        let counted = Rc::clone(&calls);
        let loader = AsyncLoader::new(move |_: &TreeNode| {
            counted.set(counted.get() + 1);
            async { Ok::<_, BoxError>(Vec::new()) }
        });
        let mut tree = Tree::new(
            vec![TreeNode::new("a", "a").with_children([TreeNode::new("b", "b")])],
            TreeOptions::new()
                .with_feature(Expandable::default())
                .with_feature(loader),
        )
        .unwrap();
        assert!(tree.expand("a").is_none());
        assert_eq!(tree.visible_keys(), ["a", "b"]);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn requires_expandable() {
        let loader = AsyncLoader::new(|_: &TreeNode| async { Ok::<_, BoxError>(Vec::new()) });
        let err = Tree::new(Vec::new(), TreeOptions::new().with_feature(loader)).unwrap_err();
        assert!(matches!(
            err,
            ResolveError::MissingDependency {
                feature: "async-loader",
                dependency: "expandable"
            }
        ));
    }
}
