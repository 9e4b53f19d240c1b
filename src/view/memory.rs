//! A headless visualization collaborator.
//!
//! [`MemoryCanvas`] keeps everything the engines send it in plain
//! collections and lays items out in fixed-height rows, in insertion order.
//! Horizontal placement follows the current window when one is set.
//! Positions can be overridden per id with [`MemoryCanvas::place`].

use std::collections::HashMap;

use chrono::Duration;
use indexmap::IndexMap;

use super::position::{AbsolutePosition, ParentFrame, RelativePosition};
use super::{
    ArrowPath, ContainerShape, ContainerStyle, HierarchyFrame, ItemSink, Lane, LayoutSource,
    Overlay, ShapeId, TooltipView, WindowControl,
};
use crate::model::{ItemData, TaskId, TimelineWindow};

const ROW_TOP: f32 = 10.0;
const ROW_PITCH: f32 = 30.0;
const ROW_HEIGHT: f32 = 20.0;
const SIDE_MARGIN: f32 = 10.0;
const UNTIMED_WIDTH: f32 = 100.0;

/// A hierarchy container as last drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredContainer {
    pub shape: ContainerShape,
    pub frame: Option<HierarchyFrame>,
}

#[derive(Debug, Default)]
pub struct MemoryCanvas {
    width: f32,
    height: f32,
    items: IndexMap<TaskId, ItemData>,
    lanes: Vec<Lane>,
    arrows: HashMap<ShapeId, Option<ArrowPath>>,
    containers: HashMap<ShapeId, StoredContainer>,
    tooltip: Option<TooltipView>,
    window: Option<TimelineWindow>,
    fit_count: usize,
    placed: HashMap<TaskId, AbsolutePosition>,
}

impl MemoryCanvas {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Pin a task to a fixed absolute position, whether or not it has an item.
    pub fn place(&mut self, id: impl Into<TaskId>, position: AbsolutePosition) {
        self.placed.insert(id.into(), position);
    }

    pub fn items(&self) -> &IndexMap<TaskId, ItemData> {
        &self.items
    }

    pub fn item(&self, id: &str) -> Option<&ItemData> {
        self.items.get(id)
    }

    pub fn lanes(&self) -> &[Lane] {
        &self.lanes
    }

    pub fn arrows(&self) -> &HashMap<ShapeId, Option<ArrowPath>> {
        &self.arrows
    }

    pub fn containers(&self) -> &HashMap<ShapeId, StoredContainer> {
        &self.containers
    }

    pub fn container(&self, shape: ShapeId) -> Option<&StoredContainer> {
        self.containers.get(&shape)
    }

    pub fn tooltip(&self) -> Option<&TooltipView> {
        self.tooltip.as_ref()
    }

    /// How many times the window was fitted to the items.
    pub fn fit_count(&self) -> usize {
        self.fit_count
    }

    /// Absolute position of an item under the row layout.
    pub fn layout_of(&self, id: &TaskId) -> Option<AbsolutePosition> {
        if let Some(placed) = self.placed.get(id) {
            return Some(*placed);
        }
        let (row, _, item) = self.items.get_full(id)?;
        let top = ROW_TOP + row as f32 * ROW_PITCH;
        let usable = (self.width - 2.0 * SIDE_MARGIN).max(1.0);
        let (left, right) = match (self.window, item.start, item.end) {
            (Some(window), Some(start), Some(end)) => (
                SIDE_MARGIN + window.time_to_x(start, usable),
                SIDE_MARGIN + window.time_to_x(end, usable),
            ),
            _ => (SIDE_MARGIN, SIDE_MARGIN + UNTIMED_WIDTH),
        };
        Some(AbsolutePosition::from_edges(left, top, right, top + ROW_HEIGHT))
    }
}

impl LayoutSource for MemoryCanvas {
    fn item_position(&self, id: &TaskId) -> Option<RelativePosition> {
        let abs = self.layout_of(id)?;
        Some(RelativePosition {
            top: self.height - abs.top - abs.height,
            left: abs.left,
            width: abs.width,
            height: abs.height,
            parent: ParentFrame {
                top: 0.0,
                height: self.height,
            },
        })
    }

    fn frame_height(&self) -> f32 {
        self.height
    }

    fn container_height(&self) -> f32 {
        self.height
    }

    fn viewport_width(&self) -> f32 {
        self.width
    }
}

impl ItemSink for MemoryCanvas {
    fn add_item(&mut self, item: &ItemData) {
        self.items.insert(item.id.clone(), item.clone());
    }

    fn update_item(&mut self, item: &ItemData) {
        if let Some(existing) = self.items.get_mut(&item.id) {
            *existing = item.clone();
        }
    }

    fn remove_item(&mut self, id: &TaskId) {
        self.items.shift_remove(id);
    }

    fn set_groups(&mut self, lanes: &[Lane]) {
        self.lanes = lanes.to_vec();
    }
}

impl Overlay for MemoryCanvas {
    fn add_arrow(&mut self, arrow: ShapeId) {
        self.arrows.insert(arrow, None);
    }

    fn set_arrow_path(&mut self, arrow: ShapeId, path: &ArrowPath) {
        if let Some(slot) = self.arrows.get_mut(&arrow) {
            *slot = Some(*path);
        }
    }

    fn remove_arrow(&mut self, arrow: ShapeId) {
        self.arrows.remove(&arrow);
    }

    fn add_container(&mut self, shape: &ContainerShape) {
        self.containers.insert(
            shape.container,
            StoredContainer {
                shape: shape.clone(),
                frame: None,
            },
        );
    }

    fn set_container_frame(&mut self, container: ShapeId, frame: &HierarchyFrame) {
        if let Some(stored) = self.containers.get_mut(&container) {
            stored.frame = Some(*frame);
        }
    }

    fn set_container_style(&mut self, container: ShapeId, style: &ContainerStyle) {
        if let Some(stored) = self.containers.get_mut(&container) {
            stored.shape.style = style.clone();
        }
    }

    fn remove_container(&mut self, container: ShapeId) {
        self.containers.remove(&container);
    }

    fn show_tooltip(&mut self, tooltip: &TooltipView) {
        self.tooltip = Some(tooltip.clone());
    }

    fn hide_tooltip(&mut self) {
        self.tooltip = None;
    }
}

impl WindowControl for MemoryCanvas {
    fn window(&self) -> Option<TimelineWindow> {
        self.window
    }

    fn set_window(&mut self, window: TimelineWindow) {
        self.window = Some(window);
    }

    fn focus(&mut self, id: &TaskId) {
        let Some(item) = self.items.get(id) else {
            return;
        };
        let Some(center) = item.start.or(item.end) else {
            return;
        };
        let half = self
            .window
            .map(|w| w.length() / 2)
            .unwrap_or_else(|| Duration::minutes(30));
        self.window = Some(TimelineWindow::new(center - half, center + half));
    }

    fn fit(&mut self) {
        self.fit_count += 1;
        let start = self.items.values().filter_map(|i| i.start).min();
        let end = self.items.values().filter_map(|i| i.end.or(i.start)).max();
        if let (Some(start), Some(end)) = (start, end) {
            self.window = Some(TimelineWindow::new(start, end));
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::model::{Status, Task};
    use crate::view::position::to_absolute;

    fn timed(id: &str, from_secs: i64, to_secs: i64) -> ItemData {
        let base = Utc.with_ymd_and_hms(2020, 10, 1, 0, 0, 0).unwrap();
        let task = Task::new(id, id, Status::Success).with_times(
            Some(base + Duration::seconds(from_secs)),
            Some(base + Duration::seconds(to_secs)),
        );
        ItemData::from_task(&task, false)
    }

    #[test]
    fn rows_follow_insertion_order() {
        let mut canvas = MemoryCanvas::new(420.0, 300.0);
        canvas.add_item(&timed("a", 0, 50));
        canvas.add_item(&timed("b", 50, 100));
        canvas.fit();

        let a = canvas.layout_of(&"a".into()).unwrap();
        let b = canvas.layout_of(&"b".into()).unwrap();
        assert_eq!((a.top, a.left, a.right), (10.0, 10.0, 210.0));
        assert_eq!((b.top, b.left, b.right), (40.0, 210.0, 410.0));

        canvas.remove_item(&"a".into());
        assert_eq!(canvas.layout_of(&"b".into()).unwrap().top, 10.0);
    }

    #[test]
    fn relative_positions_convert_back() {
        let mut canvas = MemoryCanvas::new(420.0, 300.0);
        canvas.add_item(&timed("a", 0, 50));
        canvas.add_item(&timed("b", 0, 50));
        let relative = canvas.item_position(&"b".into()).unwrap();
        let abs = to_absolute(&relative, canvas.frame_height(), canvas.container_height());
        assert_eq!(Some(abs), canvas.layout_of(&"b".into()));
    }

    #[test]
    fn focus_centers_on_item() {
        let mut canvas = MemoryCanvas::new(420.0, 300.0);
        canvas.add_item(&timed("a", 0, 50));
        canvas.add_item(&timed("b", 100, 200));
        canvas.fit();
        let length = canvas.window().unwrap().length();
        canvas.focus(&"b".into());
        let window = canvas.window().unwrap();
        assert_eq!(window.length(), length);
        assert_eq!(window.center(), canvas.item("b").unwrap().start.unwrap());
        assert_eq!(canvas.fit_count(), 1);
    }
}
