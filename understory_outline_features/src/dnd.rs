// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pointer-driven drag-and-drop with geometric drop-position inference.
//!
//! ## Gesture
//!
//! A gesture moves through `idle → dragging → idle`:
//!
//! - [`DragDropExt::drag_start`] records the dragged key and the pointer position.
//! - [`DragDropExt::drag_over`] computes a [`DropInfo`] from the pointer, the
//!   hovered row's rectangle, and the scroll container's rectangle.
//! - [`DragDropExt::drop_dragged`] forwards a [`DropEvent`] if a drop info is
//!   recorded, then returns to idle.
//! - [`DragDropExt::drag_end`] returns to idle unconditionally (pointer cancel).
//!
//! A rebuild while dragging also returns to idle.
//!
//! ## Geometry
//!
//! The hovered row is split into three horizontal bands. With the default
//! `edge_ratio` of 0.25, the top quarter means [`Placement::Before`], the bottom
//! quarter [`Placement::After`], and the middle half [`Placement::Inside`].
//! The horizontal pointer travel since the drag started, divided by the indent
//! width and rounded, is a nesting hint for the host.
//!
//! This feature never reparents nodes itself. A host applies a [`DropEvent`] to
//! its own copy of the forest (see [`DropEvent::apply`]) and calls
//! [`Tree::update_tree`].
//!
//! All rectangles are in one coordinate space (typically client coordinates);
//! the indicator is reported relative to the container's origin.

use kurbo::{Point, Rect};
use tracing::{debug, trace};
use understory_outline::{
    Feature, ItemRef, MoveError, NodeFlags, Placement, Registry, Tree, TreeNode, move_node,
};

/// Options for [`DragDrop`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DragDropOptions {
    /// Horizontal distance of one nesting level.
    pub indent_unit: f64,
    /// Height fraction of the top and bottom bands of a row.
    pub edge_ratio: f64,
    /// Thickness of the before/after insertion line.
    pub indicator_thickness: f64,
}

impl Default for DragDropOptions {
    fn default() -> Self {
        Self {
            indent_unit: 24.0,
            edge_ratio: 0.25,
            indicator_thickness: 2.0,
        }
    }
}

/// Where a drop would land.
#[derive(Clone, Debug, PartialEq)]
pub struct DropInfo {
    /// Key of the hovered item.
    pub target_key: String,
    /// Position relative to the target.
    pub position: Placement,
    /// Suggested nesting change, in indent levels.
    pub level_offset: i32,
    /// Insertion indicator, relative to the container origin.
    pub indicator: Rect,
}

/// A completed drop, forwarded to the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DropEvent {
    /// Key of the dragged item.
    pub dragging_key: String,
    /// Key of the item dropped on.
    pub drop_target_key: String,
    /// Position relative to the target.
    pub drop_position: Placement,
    /// Suggested nesting change, in indent levels.
    pub level_offset: i32,
}

impl DropEvent {
    /// Reparent the dragged node in `nodes` according to this drop.
    pub fn apply(&self, nodes: &mut Vec<TreeNode>) -> Result<(), MoveError> {
        move_node(
            nodes,
            &self.dragging_key,
            &self.drop_target_key,
            self.drop_position,
        )
    }
}

#[derive(Clone, Debug, Default)]
enum DragState {
    #[default]
    Idle,
    Dragging {
        key: String,
        start: Point,
        drop: Option<DropInfo>,
    },
}

type DropCallback = Box<dyn FnMut(&DropEvent)>;

/// Drag-and-drop feature.
#[derive(Default)]
pub struct DragDrop {
    options: DragDropOptions,
    state: DragState,
    on_drop: Option<DropCallback>,
}

impl core::fmt::Debug for DragDrop {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DragDrop")
            .field("options", &self.options)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl DragDrop {
    /// Feature name.
    pub const NAME: &'static str = "drag-drop";

    /// Create the feature with `options`.
    pub fn new(options: DragDropOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    /// Builder: call `f` for every completed drop.
    #[must_use]
    pub fn on_drop(mut self, f: impl FnMut(&DropEvent) + 'static) -> Self {
        self.on_drop = Some(Box::new(f));
        self
    }

    /// Key being dragged, if any.
    pub fn dragging_key(&self) -> Option<&str> {
        match &self.state {
            DragState::Dragging { key, .. } => Some(key),
            DragState::Idle => None,
        }
    }

    /// Current drop info, if any.
    pub fn drop_info(&self) -> Option<&DropInfo> {
        match &self.state {
            DragState::Dragging { drop, .. } => drop.as_ref(),
            DragState::Idle => None,
        }
    }

    /// Begin dragging `key`. Returns false for unknown, disabled, or `NO_DRAG` items.
    pub fn start(&mut self, registry: &Registry, key: &str, pointer: Point) -> bool {
        let Some(node) = registry.node(key) else {
            return false;
        };
        if node.flags.intersects(NodeFlags::DISABLED | NodeFlags::NO_DRAG) {
            return false;
        }
        trace!(key, x = pointer.x, y = pointer.y, "drag start");
        self.state = DragState::Dragging {
            key: key.to_owned(),
            start: pointer,
            drop: None,
        };
        true
    }

    /// Recompute the drop info for the pointer over `target_key`.
    ///
    /// Hovering an unknown item, the dragged item, or anything inside the
    /// dragged subtree clears the drop info. Returns `None` when not dragging.
    pub fn over(
        &mut self,
        registry: &Registry,
        target_key: &str,
        pointer: Point,
        container: Rect,
        target: Rect,
    ) -> Option<DropInfo> {
        let options = self.options;
        let DragState::Dragging { key, start, drop } = &mut self.state else {
            return None;
        };
        let blocked = !registry.contains(target_key)
            || key.as_str() == target_key
            || registry.is_descendant(key, target_key);
        if blocked {
            *drop = None;
            return None;
        }
        let position = drop_position(pointer.y, target, options.edge_ratio);
        let info = DropInfo {
            target_key: target_key.to_owned(),
            position,
            level_offset: level_offset(start.x, pointer.x, options.indent_unit),
            indicator: indicator_rect(target, container, position, options.indicator_thickness),
        };
        *drop = Some(info.clone());
        Some(info)
    }

    /// Finish the gesture. Forwards and returns the drop if one was recorded.
    pub fn take_drop(&mut self) -> Option<DropEvent> {
        let DragState::Dragging {
            key,
            drop: Some(drop),
            ..
        } = core::mem::take(&mut self.state)
        else {
            return None;
        };
        let event = DropEvent {
            dragging_key: key,
            drop_target_key: drop.target_key,
            drop_position: drop.position,
            level_offset: drop.level_offset,
        };
        debug!(
            dragging = %event.dragging_key,
            target = %event.drop_target_key,
            position = event.drop_position.offset(),
            "drop"
        );
        if let Some(callback) = self.on_drop.as_mut() {
            callback(&event);
        }
        Some(event)
    }

    /// Return to idle. Returns false if nothing was being dragged.
    pub fn end(&mut self) -> bool {
        matches!(
            core::mem::take(&mut self.state),
            DragState::Dragging { .. }
        )
    }
}

impl Feature for DragDrop {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn install(&mut self, _registry: &Registry) {
        if let Some(key) = self.dragging_key() {
            debug!(key, "rebuild cancelled drag");
            self.state = DragState::Idle;
        }
    }
}

/// Vertical drop position of a pointer over `target`.
///
/// The top and bottom `edge_ratio` of the row height map to
/// [`Placement::Before`] and [`Placement::After`]; the rest is [`Placement::Inside`].
pub fn drop_position(pointer_y: f64, target: Rect, edge_ratio: f64) -> Placement {
    let gap = target.height() * edge_ratio;
    let offset = pointer_y - target.y0;
    if offset < gap {
        Placement::Before
    } else if offset > target.height() - gap {
        Placement::After
    } else {
        Placement::Inside
    }
}

/// Horizontal travel from `start_x` to `current_x` in whole indent levels.
#[allow(
    clippy::cast_possible_truncation,
    reason = "Level offsets are small; out-of-range values saturate."
)]
pub fn level_offset(start_x: f64, current_x: f64, indent_unit: f64) -> i32 {
    if indent_unit <= 0.0 {
        return 0;
    }
    ((current_x - start_x) / indent_unit).round() as i32
}

/// Insertion indicator for `position` over `target`, relative to `container`'s origin.
///
/// `Inside` covers the whole row. `Before` and `After` are lines of
/// `thickness` along the row's top and bottom edges.
pub fn indicator_rect(target: Rect, container: Rect, position: Placement, thickness: f64) -> Rect {
    let row = target - container.origin().to_vec2();
    match position {
        Placement::Inside => row,
        Placement::Before => Rect::new(row.x0, row.y0, row.x1, row.y0 + thickness),
        Placement::After => Rect::new(row.x0, row.y1 - thickness, row.x1, row.y1),
    }
}

/// Drag actions on a [`Tree`]. Without [`DragDrop`] installed they are no-ops.
pub trait DragDropExt {
    /// Begin dragging `key` from `pointer`. Returns false if the drag did not start.
    fn drag_start(&mut self, key: &str, pointer: Point) -> bool;
    /// Pointer moved over the row of `key` with bounds `target` inside `container`.
    fn drag_over(
        &mut self,
        key: &str,
        pointer: Point,
        container: Rect,
        target: Rect,
    ) -> Option<DropInfo>;
    /// Drop at the current drop info and return to idle.
    fn drop_dragged(&mut self) -> Option<DropEvent>;
    /// Abandon the gesture.
    fn drag_end(&mut self);
    /// Key being dragged, if any.
    fn dragging_key(&self) -> Option<String>;
    /// Current drop info, if any.
    fn drop_info(&self) -> Option<DropInfo>;
}

impl DragDropExt for Tree {
    fn drag_start(&mut self, key: &str, pointer: Point) -> bool {
        let started = self.update_feature::<DragDrop, _>(|f, reg| f.start(reg, key, pointer))
            == Some(true);
        if started {
            self.notify();
        }
        started
    }

    fn drag_over(
        &mut self,
        key: &str,
        pointer: Point,
        container: Rect,
        target: Rect,
    ) -> Option<DropInfo> {
        let (before, after) = self.update_feature::<DragDrop, _>(|f, reg| {
            let before = f.drop_info().cloned();
            (before, f.over(reg, key, pointer, container, target))
        })?;
        if before != after {
            self.notify();
        }
        after
    }

    fn drop_dragged(&mut self) -> Option<DropEvent> {
        let (was_dragging, event) = self.update_feature::<DragDrop, _>(|f, _| {
            let was_dragging = f.dragging_key().is_some();
            (was_dragging, f.take_drop())
        })?;
        if was_dragging {
            self.notify();
        }
        event
    }

    fn drag_end(&mut self) {
        if self.update_feature::<DragDrop, _>(|f, _| f.end()) == Some(true) {
            self.notify();
        }
    }

    fn dragging_key(&self) -> Option<String> {
        self.feature::<DragDrop>()?.dragging_key().map(ToOwned::to_owned)
    }

    fn drop_info(&self) -> Option<DropInfo> {
        self.feature::<DragDrop>()?.drop_info().cloned()
    }
}

/// Per-item drag state.
pub trait DragItem {
    /// True if this item is being dragged.
    fn dragging(&self) -> bool;
    /// Drop position if the pointer is currently over this item.
    fn drop_position(&self) -> Option<Placement>;
}

impl DragItem for ItemRef<'_> {
    fn dragging(&self) -> bool {
        self.feature::<DragDrop>()
            .and_then(DragDrop::dragging_key)
            .is_some_and(|key| key == self.key())
    }

    fn drop_position(&self) -> Option<Placement> {
        let info = self.feature::<DragDrop>()?.drop_info()?;
        (info.target_key == self.key()).then_some(info.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{counter, sample_nodes};
    use std::cell::RefCell;
    use std::rc::Rc;
    use understory_outline::TreeOptions;

    const CONTAINER: Rect = Rect::new(0.0, 0.0, 300.0, 400.0);

    fn row(index: usize) -> Rect {
        let top = index as f64 * 40.0;
        Rect::new(0.0, top, 300.0, top + 40.0)
    }

    fn tree() -> Tree {
        Tree::new(
            sample_nodes(),
            TreeOptions::new().with_feature(DragDrop::default()),
        )
        .unwrap()
    }

    #[test]
    fn row_bands() {
        let target = Rect::new(0.0, 100.0, 200.0, 140.0);
        assert_eq!(drop_position(105.0, target, 0.25), Placement::Before);
        assert_eq!(drop_position(120.0, target, 0.25), Placement::Inside);
        assert_eq!(drop_position(137.0, target, 0.25), Placement::After);
        assert_eq!(Placement::Before.offset(), -1);
        assert_eq!(Placement::After.offset(), 1);
    }

    #[test]
    fn level_offset_rounds_both_ways() {
        assert_eq!(level_offset(10.0, 60.0, 24.0), 2);
        assert_eq!(level_offset(10.0, -30.0, 24.0), -2);
        assert_eq!(level_offset(10.0, 20.0, 24.0), 0);
        assert_eq!(level_offset(0.0, 100.0, 0.0), 0);
    }

    #[test]
    fn indicator_is_container_relative() {
        let container = Rect::new(10.0, 50.0, 210.0, 450.0);
        let target = Rect::new(10.0, 90.0, 210.0, 130.0);
        assert_eq!(
            indicator_rect(target, container, Placement::Inside, 2.0),
            Rect::new(0.0, 40.0, 200.0, 80.0)
        );
        assert_eq!(
            indicator_rect(target, container, Placement::Before, 2.0),
            Rect::new(0.0, 40.0, 200.0, 42.0)
        );
        assert_eq!(
            indicator_rect(target, container, Placement::After, 2.0),
            Rect::new(0.0, 78.0, 200.0, 80.0)
        );
    }

    #[test]
    fn drag_over_reports_drop_info() {
        let mut tree = tree();
        assert!(tree.drag_start("readme", Point::new(50.0, 90.0)));
        let info = tree
            .drag_over("docs", Point::new(98.0, 5.0), CONTAINER, row(0))
            .unwrap();
        assert_eq!(info.target_key, "docs");
        assert_eq!(info.position, Placement::Before);
        assert_eq!(info.level_offset, 2);
        assert_eq!(info.indicator, Rect::new(0.0, 0.0, 300.0, 2.0));

        assert!(tree.item("readme").unwrap().dragging());
        assert_eq!(
            tree.item("docs").unwrap().drop_position(),
            Some(Placement::Before)
        );
        assert_eq!(tree.item("src").unwrap().drop_position(), None);
    }

    #[test]
    fn drop_forwards_and_resets() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut tree = Tree::new(
            sample_nodes(),
            TreeOptions::new()
                .with_feature(
                    DragDrop::default().on_drop(move |e| sink.borrow_mut().push(e.clone())),
                ),
        )
        .unwrap();
        tree.drag_start("readme", Point::new(0.0, 90.0));
        tree.drag_over("src", Point::new(0.0, 60.0), CONTAINER, row(1));
        let event = tree.drop_dragged().unwrap();
        assert_eq!(
            event,
            DropEvent {
                dragging_key: "readme".into(),
                drop_target_key: "src".into(),
                drop_position: Placement::Inside,
                level_offset: 0,
            }
        );
        assert_eq!(*seen.borrow(), [event]);
        assert_eq!(tree.dragging_key(), None);
        assert_eq!(tree.drop_info(), None);
    }

    #[test]
    fn drop_without_info_only_resets() {
        let mut tree = tree();
        let hits = counter(&mut tree);
        tree.drag_start("lib", Point::ZERO);
        assert!(tree.drop_dragged().is_none());
        assert_eq!(tree.dragging_key(), None);
        assert_eq!(hits.get(), 2, "start and reset both notify");
        assert!(tree.drop_dragged().is_none());
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn hovering_own_subtree_clears_info() {
        let mut tree = tree();
        tree.drag_start("src", Point::ZERO);
        assert!(
            tree.drag_over("docs", Point::new(0.0, 20.0), CONTAINER, row(0))
                .is_some()
        );
        assert!(
            tree.drag_over("button", Point::new(0.0, 20.0), CONTAINER, row(0))
                .is_none()
        );
        assert_eq!(tree.drop_info(), None);
        assert!(
            tree.drag_over("src", Point::new(0.0, 20.0), CONTAINER, row(0))
                .is_none()
        );
        assert!(tree.drop_dragged().is_none());
    }

    #[test]
    fn blocked_items_cannot_be_dragged() {
        let nodes = vec![
            TreeNode::new("pinned", "Pinned").with_flags(NodeFlags::NO_DRAG),
            TreeNode::new("off", "Off").with_flags(NodeFlags::DISABLED),
        ];
        let mut tree =
            Tree::new(nodes, TreeOptions::new().with_feature(DragDrop::default())).unwrap();
        assert!(!tree.drag_start("pinned", Point::ZERO));
        assert!(!tree.drag_start("off", Point::ZERO));
        assert!(!tree.drag_start("missing", Point::ZERO));
        assert_eq!(tree.dragging_key(), None);
    }

    #[test]
    fn drag_over_without_drag_is_ignored() {
        let mut tree = tree();
        assert!(
            tree.drag_over("docs", Point::new(0.0, 20.0), CONTAINER, row(0))
                .is_none()
        );
    }

    #[test]
    fn drag_end_and_rebuild_reset() {
        let mut tree = tree();
        tree.drag_start("lib", Point::ZERO);
        tree.drag_end();
        assert_eq!(tree.dragging_key(), None);

        tree.drag_start("lib", Point::ZERO);
        tree.drag_over("docs", Point::new(0.0, 20.0), CONTAINER, row(0));
        tree.update_tree(sample_nodes());
        assert_eq!(tree.dragging_key(), None);
        assert!(tree.drop_dragged().is_none());
    }

    #[test]
    fn drop_event_reparents_nodes() {
        let mut tree = tree();
        tree.drag_start("readme", Point::ZERO);
        tree.drag_over("lib", Point::new(0.0, 39.0), CONTAINER, row(0));
        let event = tree.drop_dragged().unwrap();
        assert_eq!(event.drop_position, Placement::After);

        let mut nodes = tree.nodes().to_vec();
        event.apply(&mut nodes).unwrap();
        tree.update_tree(nodes);
        assert_eq!(tree.item("readme").unwrap().parent_key(), Some("src"));
        let siblings: Vec<_> = tree
            .item("src")
            .unwrap()
            .children()
            .map(|c| c.key())
            .collect();
        assert_eq!(siblings, ["lib", "readme", "ui"]);
        assert_eq!(tree.registry().roots(), ["docs", "src"]);
    }
}
