use egui::{Pos2, Rect};

use super::LayoutSource;
use crate::model::{Forest, Task, TaskId};

/// The frame an item is laid out in, as reported by the widget.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ParentFrame {
    pub top: f32,
    pub height: f32,
}

/// Position of an item relative to its frame. The widget measures `top`
/// upwards from the bottom of the frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RelativePosition {
    pub top: f32,
    pub left: f32,
    pub width: f32,
    pub height: f32,
    pub parent: ParentFrame,
}

/// Position in the shared coordinate frame of the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AbsolutePosition {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub mid_x: f32,
    pub mid_y: f32,
    pub width: f32,
    pub height: f32,
}

impl AbsolutePosition {
    pub fn from_edges(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
            mid_x: left + (right - left) / 2.0,
            mid_y: top + (bottom - top) / 2.0,
            width: right - left,
            height: bottom - top,
        }
    }

    fn fields(&self) -> [f32; 8] {
        [
            self.left,
            self.top,
            self.right,
            self.bottom,
            self.mid_x,
            self.mid_y,
            self.width,
            self.height,
        ]
    }

    /// A position is usable for drawing only if every field holds a finite,
    /// non-zero value.
    pub fn is_valid(&self) -> bool {
        self.fields().iter().all(|v| v.is_finite() && *v != 0.0)
    }

    /// False when the widget could not place the item horizontally, e.g.
    /// because it is outside the visible window.
    pub fn is_horizontally_resolved(&self) -> bool {
        self.left.is_finite() && self.right.is_finite()
    }

    pub fn add_top_padding(&mut self, amount: f32) {
        self.top -= amount;
        self.height += amount;
        self.mid_y = self.top + self.height / 2.0;
    }

    pub fn add_bottom_padding(&mut self, amount: f32) {
        self.bottom += amount;
        self.height += amount;
        self.mid_y = self.top + self.height / 2.0;
    }

    pub fn add_padding(&mut self, amount: f32) {
        self.add_top_padding(amount);
        self.add_bottom_padding(amount);
    }

    pub fn left_mid(&self) -> Pos2 {
        Pos2::new(self.left, self.mid_y)
    }

    pub fn right_mid(&self) -> Pos2 {
        Pos2::new(self.right, self.mid_y)
    }

    pub fn to_rect(&self) -> Rect {
        Rect::from_min_max(Pos2::new(self.left, self.top), Pos2::new(self.right, self.bottom))
    }
}

/// Convert a widget position into the overlay frame. The vertical axis is
/// flipped and shifted by the height difference of the two frames.
pub fn to_absolute(
    relative: &RelativePosition,
    parent_frame_height: f32,
    container_height: f32,
) -> AbsolutePosition {
    let offset = container_height - parent_frame_height;
    let left = relative.left;
    let top =
        relative.parent.top + relative.parent.height - relative.top - relative.height + offset;
    AbsolutePosition::from_edges(left, top, left + relative.width, top + relative.height)
}

/// Smallest box containing every position; `None` for an empty input.
pub fn bounding_box(positions: &[AbsolutePosition]) -> Option<AbsolutePosition> {
    let first = positions.first()?;
    let (mut left, mut top, mut right, mut bottom) =
        (first.left, first.top, first.right, first.bottom);
    for p in &positions[1..] {
        left = left.min(p.left);
        top = top.min(p.top);
        right = right.max(p.right);
        bottom = bottom.max(p.bottom);
    }
    Some(AbsolutePosition::from_edges(left, top, right, bottom))
}

/// Resolves where tasks are drawn.
///
/// A task with an item of its own is where the widget put it. An expanded
/// task has no item; it occupies the bounding box of its visible
/// descendants, with room reserved above each nested container for its label.
pub struct PositionService<'a, L: ?Sized> {
    forest: &'a Forest,
    layout: &'a L,
    label_padding: f32,
}

impl<'a, L: LayoutSource + ?Sized> PositionService<'a, L> {
    pub fn new(forest: &'a Forest, layout: &'a L, label_padding: f32) -> Self {
        Self {
            forest,
            layout,
            label_padding,
        }
    }

    /// Absolute position of the task's own item, if it has been laid out.
    pub fn item_position(&self, id: &TaskId) -> Option<AbsolutePosition> {
        let relative = self.layout.item_position(id)?;
        Some(to_absolute(
            &relative,
            self.layout.frame_height(),
            self.layout.container_height(),
        ))
    }

    pub fn task_position(&self, task: &Task) -> Option<AbsolutePosition> {
        self.item_position(&task.id)
            .or_else(|| self.descendants_box(&task.sub_tasks))
    }

    pub fn task_position_by_id(&self, id: &TaskId) -> Option<AbsolutePosition> {
        self.task_position(self.forest.get(id)?)
    }

    fn descendants_box(&self, tasks: &[Task]) -> Option<AbsolutePosition> {
        let positions: Vec<AbsolutePosition> = tasks
            .iter()
            .filter_map(|t| match self.item_position(&t.id) {
                Some(p) => Some(p),
                None => {
                    let mut nested = self.descendants_box(&t.sub_tasks)?;
                    nested.add_top_padding(self.label_padding);
                    Some(nested)
                }
            })
            .collect();
        bounding_box(&positions)
    }
}
