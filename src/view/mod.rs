//! The rendering side of the timeline.
//!
//! The concrete timeline widget is an external collaborator. The engines in
//! this module talk to it through the traits below and never assume a
//! particular rendering technology.

pub mod arrows;
pub mod grouping;
pub mod hierarchy;
pub mod memory;
pub mod position;
pub mod tooltip;

use egui::Color32;
use uuid::Uuid;

use crate::model::{ItemData, TaskId, TimelineWindow};
pub use arrows::{ArrowEngine, ArrowPath};
pub use grouping::{GroupingEngine, Lane, LaneKind};
pub use hierarchy::{HierarchyEngine, HierarchyEvent, HierarchyFrame};
pub use position::{AbsolutePosition, ParentFrame, PositionService, RelativePosition};
pub use tooltip::{TimeTooltip, TooltipView};

/// Handle of a shape drawn on the overlay (an arrow, a hierarchy container or
/// its label). Allocated by the engines, stored by the collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId(Uuid);

impl ShapeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ShapeId {
    fn default() -> Self {
        Self::new()
    }
}

/// Style of a hierarchy container, derived from the expanded task's status.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerStyle {
    pub class_name: String,
    pub color: Color32,
    pub label: String,
}

/// Everything a collaborator needs to create a hierarchy container.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerShape {
    pub container: ShapeId,
    pub label: ShapeId,
    pub task_id: TaskId,
    pub style: ContainerStyle,
}

/// Where laid-out items are, as reported by the timeline widget.
pub trait LayoutSource {
    /// Position of an item the widget has actually laid out.
    fn item_position(&self, id: &TaskId) -> Option<RelativePosition>;
    /// Height of the frame items are laid out in.
    fn frame_height(&self) -> f32;
    /// Height of the overlay container arrows and containers are drawn in.
    fn container_height(&self) -> f32;
    /// Width of the visible area; the far edge for off-screen arrow targets.
    fn viewport_width(&self) -> f32;
}

/// Keyed item collection and lanes of the timeline widget.
pub trait ItemSink {
    fn add_item(&mut self, item: &ItemData);
    fn update_item(&mut self, item: &ItemData);
    fn remove_item(&mut self, id: &TaskId);
    fn set_groups(&mut self, lanes: &[Lane]);
}

/// Shapes drawn over the items.
pub trait Overlay {
    fn add_arrow(&mut self, arrow: ShapeId);
    fn set_arrow_path(&mut self, arrow: ShapeId, path: &ArrowPath);
    fn remove_arrow(&mut self, arrow: ShapeId);

    fn add_container(&mut self, shape: &ContainerShape);
    fn set_container_frame(&mut self, container: ShapeId, frame: &HierarchyFrame);
    fn set_container_style(&mut self, container: ShapeId, style: &ContainerStyle);
    fn remove_container(&mut self, container: ShapeId);

    fn show_tooltip(&mut self, tooltip: &TooltipView);
    fn hide_tooltip(&mut self);
}

/// Control over the visible time range.
pub trait WindowControl {
    fn window(&self) -> Option<TimelineWindow>;
    fn set_window(&mut self, window: TimelineWindow);
    /// Center the window on an item without changing its length.
    fn focus(&mut self, id: &TaskId);
    /// Fit the window to every item.
    fn fit(&mut self);
}

/// A complete visualization collaborator.
pub trait Visualization: LayoutSource + ItemSink + Overlay + WindowControl {}

impl<T> Visualization for T where T: LayoutSource + ItemSink + Overlay + WindowControl {}
