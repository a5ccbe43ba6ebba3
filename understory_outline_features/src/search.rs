// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Debounced, case-insensitive substring search.
//!
//! A search has two key sets:
//!
//! - **matched**: items whose searchable text contains the keyword;
//! - **result**: matched items plus every ancestor of a matched item, so a deep
//!   match stays reachable through a visible path.
//!
//! While the keyword is non-empty, [`Search`] overrides the visible-item walk:
//! only result items are visible, in document order, regardless of what is
//! expanded. With an empty keyword the tree falls back to the expansion walk.
//!
//! ## Debounce
//!
//! [`SearchExt::search_at`] does not match immediately. It records the keyword
//! with a deadline `now + delay`, replacing any earlier pending keyword. The
//! host drives the deadline through [`Tree::next_deadline`] and [`Tree::poll`].
//! A zero delay applies synchronously; [`SearchExt::clear_search`] always does.
//!
//! ```
//! use std::time::{Duration, Instant};
//! use understory_outline::{Tree, TreeNode, TreeOptions};
//! use understory_outline_features::{Search, SearchExt, SearchOptions};
//!
//! let nodes = vec![
//!     TreeNode::new("src", "src").with_children([TreeNode::new("lib", "lib.rs")]),
//!     TreeNode::new("readme", "README.md"),
//! ];
//! let mut tree = Tree::new(nodes, TreeOptions::new().with_feature(Search::default())).unwrap();
//!
//! let t0 = Instant::now();
//! tree.search_at("LIB", t0);
//! assert_eq!(tree.visible_keys(), ["src", "readme"]);
//!
//! tree.poll(t0 + Duration::from_millis(300));
//! assert_eq!(tree.visible_keys(), ["src", "lib"]);
//! ```

use std::collections::HashSet;
use std::time::{Duration, Instant};

use tracing::{debug, trace};
use understory_outline::{Feature, ItemRef, Registry, Tree, TreeNode};

/// Which text of a node is searched and highlighted.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum SearchField {
    /// [`TreeNode::label`].
    #[default]
    Label,
    /// [`TreeNode::key`].
    Key,
    /// A named entry of [`TreeNode::fields`]. Nodes without it never match.
    Field(String),
}

impl SearchField {
    /// The text of `node` this field selects.
    pub fn text<'a>(&self, node: &'a TreeNode) -> Option<&'a str> {
        match self {
            Self::Label => Some(&node.label),
            Self::Key => Some(&node.key),
            Self::Field(name) => node.field(name),
        }
    }
}

/// Options for [`Search`].
#[derive(Clone, Debug)]
pub struct SearchOptions {
    /// Debounce window. Defaults to 300ms.
    pub delay: Duration,
    /// Searched text.
    pub field: SearchField,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(300),
            field: SearchField::Label,
        }
    }
}

/// One piece of highlighted text.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct HighlightSegment<'t> {
    /// Slice of the original text.
    pub text: &'t str,
    /// True if this slice is an occurrence of the keyword.
    pub matched: bool,
}

/// Search feature.
#[derive(Debug, Default)]
pub struct Search {
    options: SearchOptions,
    keyword: String,
    pending: Option<(String, Instant)>,
    matched: HashSet<String>,
    result: HashSet<String>,
}

impl Search {
    /// Feature name.
    pub const NAME: &'static str = "search";

    /// Create the feature with `options`.
    pub fn new(options: SearchOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    /// The applied keyword. Empty when inactive.
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// Returns true while a non-empty keyword is applied.
    pub fn is_active(&self) -> bool {
        !self.keyword.is_empty()
    }

    /// Returns true if `key` matched the applied keyword.
    pub fn is_matched(&self, key: &str) -> bool {
        self.matched.contains(key)
    }

    /// Returns true if `key` is in the result set.
    pub fn in_result(&self, key: &str) -> bool {
        self.result.contains(key)
    }

    /// Matched keys in document order.
    pub fn matched_keys(&self, registry: &Registry) -> Vec<String> {
        in_document_order(registry, &self.matched)
    }

    /// Result keys (matches and their ancestors) in document order.
    pub fn result_keys(&self, registry: &Registry) -> Vec<String> {
        in_document_order(registry, &self.result)
    }

    /// Highlight segments of `node`'s searchable text for the applied keyword.
    pub fn highlight<'n>(&self, node: &'n TreeNode) -> Vec<HighlightSegment<'n>> {
        highlight_segments(self.options.field.text(node).unwrap_or(""), &self.keyword)
    }

    /// Queue `keyword` to apply at `now + delay`, replacing any pending keyword.
    ///
    /// Returns true if it was applied right away (zero delay).
    pub fn request(&mut self, registry: &Registry, keyword: &str, now: Instant) -> bool {
        if self.options.delay.is_zero() {
            self.pending = None;
            self.apply(registry, keyword.to_owned());
            return true;
        }
        let due = now + self.options.delay;
        trace!(keyword, ?due, "search queued");
        self.pending = Some((keyword.to_owned(), due));
        false
    }

    /// Apply the pending keyword now. Returns false if nothing was pending.
    pub fn flush(&mut self, registry: &Registry) -> bool {
        match self.pending.take() {
            Some((keyword, _)) => {
                self.apply(registry, keyword);
                true
            }
            None => false,
        }
    }

    /// Drop the keyword and any pending request. Returns false if already inactive.
    pub fn clear(&mut self) -> bool {
        let had = self.is_active() || self.pending.is_some();
        self.pending = None;
        self.keyword.clear();
        self.matched.clear();
        self.result.clear();
        had
    }

    fn apply(&mut self, registry: &Registry, keyword: String) {
        self.keyword = keyword;
        self.recompute(registry);
        debug!(
            keyword = %self.keyword,
            matched = self.matched.len(),
            result = self.result.len(),
            "search applied"
        );
    }

    fn recompute(&mut self, registry: &Registry) {
        self.matched.clear();
        self.result.clear();
        if self.keyword.is_empty() {
            return;
        }
        for item in registry.iter() {
            let hit = registry
                .node(item.key())
                .and_then(|node| self.options.field.text(node))
                .is_some_and(|text| contains_ignore_case(text, &self.keyword));
            if hit {
                self.matched.insert(item.key().to_owned());
            }
        }
        for key in &self.matched {
            self.result.insert(key.clone());
            self.result
                .extend(registry.ancestors(key).map(|item| item.key().to_owned()));
        }
    }
}

impl Feature for Search {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn install(&mut self, registry: &Registry) {
        self.recompute(registry);
    }

    fn visible_override(&self, registry: &Registry) -> Option<Vec<String>> {
        self.is_active().then(|| self.result_keys(registry))
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, due)| *due)
    }

    fn poll(&mut self, registry: &Registry, now: Instant) -> bool {
        match &self.pending {
            Some((_, due)) if *due <= now => self.flush(registry),
            _ => false,
        }
    }
}

fn in_document_order(registry: &Registry, keys: &HashSet<String>) -> Vec<String> {
    registry
        .iter()
        .filter(|item| keys.contains(item.key()))
        .map(|item| item.key().to_owned())
        .collect()
}

/// Byte offset just past a case-insensitive match of `keyword` at `start`.
fn match_at(text: &str, start: usize, keyword: &str) -> Option<usize> {
    let mut hay = text[start..].char_indices();
    let mut end = start;
    for k in keyword.chars() {
        let (offset, h) = hay.next()?;
        if !h.to_lowercase().eq(k.to_lowercase()) {
            return None;
        }
        end = start + offset + h.len_utf8();
    }
    Some(end)
}

fn find_ignore_case(text: &str, keyword: &str, from: usize) -> Option<(usize, usize)> {
    text[from..].char_indices().find_map(|(offset, _)| {
        let start = from + offset;
        match_at(text, start, keyword).map(|end| (start, end))
    })
}

fn contains_ignore_case(text: &str, keyword: &str) -> bool {
    !keyword.is_empty() && find_ignore_case(text, keyword, 0).is_some()
}

/// Split `text` around every non-overlapping, case-insensitive occurrence of `keyword`.
///
/// Segments are in order and concatenate back to `text`. Text without an
/// occurrence (or an empty keyword) yields a single unmatched segment.
///
/// ```
/// use understory_outline_features::{HighlightSegment, highlight_segments};
///
/// let parts = highlight_segments("Button.rs", "TON");
/// assert_eq!(
///     parts,
///     [
///         HighlightSegment { text: "But", matched: false },
///         HighlightSegment { text: "ton", matched: true },
///         HighlightSegment { text: ".rs", matched: false },
///     ]
/// );
/// ```
pub fn highlight_segments<'t>(text: &'t str, keyword: &str) -> Vec<HighlightSegment<'t>> {
    let mut out = Vec::new();
    if !keyword.is_empty() {
        let mut pos = 0;
        while let Some((start, end)) = find_ignore_case(text, keyword, pos) {
            if start > pos {
                out.push(HighlightSegment {
                    text: &text[pos..start],
                    matched: false,
                });
            }
            out.push(HighlightSegment {
                text: &text[start..end],
                matched: true,
            });
            pos = end;
        }
        if !out.is_empty() && pos < text.len() {
            out.push(HighlightSegment {
                text: &text[pos..],
                matched: false,
            });
        }
    }
    if out.is_empty() {
        out.push(HighlightSegment {
            text,
            matched: false,
        });
    }
    out
}

/// Search actions on a [`Tree`]. Without [`Search`] installed they are no-ops.
pub trait SearchExt {
    /// Queue `keyword` relative to the current time.
    fn search(&mut self, keyword: &str);
    /// Queue `keyword` relative to `now`.
    fn search_at(&mut self, keyword: &str, now: Instant);
    /// Apply a pending keyword immediately.
    fn flush_search(&mut self);
    /// Return to the inactive state immediately.
    fn clear_search(&mut self);
    /// The applied keyword (empty when inactive).
    fn keyword(&self) -> String;
    /// Matches and their ancestors, in document order.
    fn search_result_keys(&self) -> Vec<String>;
    /// Matches only, in document order.
    fn matched_keys(&self) -> Vec<String>;
}

impl SearchExt for Tree {
    fn search(&mut self, keyword: &str) {
        self.search_at(keyword, Instant::now());
    }

    fn search_at(&mut self, keyword: &str, now: Instant) {
        if self.update_feature::<Search, _>(|f, reg| f.request(reg, keyword, now)) == Some(true) {
            self.notify();
        }
    }

    fn flush_search(&mut self) {
        if self.update_feature::<Search, _>(|f, reg| f.flush(reg)) == Some(true) {
            self.notify();
        }
    }

    fn clear_search(&mut self) {
        if self.update_feature::<Search, _>(|f, _| f.clear()) == Some(true) {
            self.notify();
        }
    }

    fn keyword(&self) -> String {
        self.feature::<Search>()
            .map(|f| f.keyword().to_owned())
            .unwrap_or_default()
    }

    fn search_result_keys(&self) -> Vec<String> {
        self.feature::<Search>()
            .map(|f| f.result_keys(self.registry()))
            .unwrap_or_default()
    }

    fn matched_keys(&self) -> Vec<String> {
        self.feature::<Search>()
            .map(|f| f.matched_keys(self.registry()))
            .unwrap_or_default()
    }
}

/// Per-item search state.
pub trait SearchItem<'a> {
    /// True if the item's text contains the applied keyword.
    fn matched(&self) -> bool;
    /// The item's searchable text split for highlighting.
    fn highlight(&self) -> Vec<HighlightSegment<'a>>;
}

impl<'a> SearchItem<'a> for ItemRef<'a> {
    fn matched(&self) -> bool {
        self.feature::<Search>()
            .is_some_and(|f| f.is_matched(self.key()))
    }

    fn highlight(&self) -> Vec<HighlightSegment<'a>> {
        let node = self.node();
        match self.feature::<Search>() {
            Some(search) => search.highlight(node),
            None => highlight_segments(&node.label, ""),
        }
    }
}
