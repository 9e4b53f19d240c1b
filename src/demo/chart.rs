use std::collections::HashMap;

use chrono::{DateTime, Utc};
use egui::epaint::CubicBezierShape;
use egui::{Align2, Color32, Pos2, Rect, Rounding, Sense, Shape, Stroke, Ui, Vec2};
use indexmap::IndexMap;
use timeline_dep_graph::config::StatusPalette;
use timeline_dep_graph::model::{ItemData, TaskId, TimelineWindow};
use timeline_dep_graph::view::{
    AbsolutePosition, ArrowPath, ContainerShape, ContainerStyle, HierarchyFrame, ItemSink, Lane,
    LaneKind, LayoutSource, Overlay, ParentFrame, RelativePosition, ShapeId, TooltipView,
    WindowControl,
};
use timeline_dep_graph::ItemClick;

use crate::demo::theme;

/// What happened in the chart this frame.
#[derive(Debug, Clone, Default)]
pub struct ChartInteraction {
    pub item_clicked: Option<(TaskId, ItemClick)>,
    pub item_hovered: Option<(TaskId, DateTime<Utc>)>,
    pub container_clicked: Option<ShapeId>,
    pub container_hovered: Option<ShapeId>,
    pub label_clicked: Option<ShapeId>,
}

/// A lane band as laid out: the lane and its vertical extent.
#[derive(Debug, Clone)]
struct Band {
    lane: Lane,
    top: f32,
    bottom: f32,
}

/// Timeline widget drawn with the egui painter.
///
/// Items are stacked in rows inside their lane, in the order they were
/// added. Coordinates are local to the chart area.
pub struct EguiCanvas {
    palette: StatusPalette,
    size: Vec2,
    items: IndexMap<TaskId, ItemData>,
    lanes: Vec<Lane>,
    bands: Vec<Band>,
    layout: HashMap<TaskId, AbsolutePosition>,
    arrows: HashMap<ShapeId, Option<ArrowPath>>,
    containers: IndexMap<ShapeId, (ContainerShape, Option<HierarchyFrame>)>,
    tooltip: Option<TooltipView>,
    window: Option<TimelineWindow>,
    layout_changed: bool,
}

impl EguiCanvas {
    pub fn new(palette: StatusPalette) -> Self {
        Self {
            palette,
            size: Vec2::new(800.0, 400.0),
            items: IndexMap::new(),
            lanes: Vec::new(),
            bands: Vec::new(),
            layout: HashMap::new(),
            arrows: HashMap::new(),
            containers: IndexMap::new(),
            tooltip: None,
            window: None,
            layout_changed: false,
        }
    }

    /// Whether item positions moved since the last call.
    pub fn take_layout_changed(&mut self) -> bool {
        std::mem::take(&mut self.layout_changed)
    }

    fn chart_width(&self) -> f32 {
        (self.size.x - theme::LANE_LABEL_WIDTH).max(1.0)
    }

    fn time_to_x(&self, at: DateTime<Utc>) -> Option<f32> {
        let window = self.window?;
        Some(theme::LANE_LABEL_WIDTH + window.time_to_x(at, self.chart_width()))
    }

    fn relayout(&mut self) {
        self.layout.clear();
        self.bands.clear();
        let mut y = theme::ROW_GAP;
        let mut placed: Vec<&TaskId> = Vec::new();

        for lane in &self.lanes {
            match lane.kind {
                LaneKind::Padding => y += theme::LANE_PADDING,
                LaneKind::Label => {
                    let top = y;
                    for item in self.items.values().filter(|i| i.group == lane.id) {
                        if let Some(pos) = self.bar_position(item, y) {
                            self.layout.insert(item.id.clone(), pos);
                        }
                        placed.push(&item.id);
                        y += theme::ROW_HEIGHT + theme::ROW_GAP;
                    }
                    self.bands.push(Band {
                        lane: lane.clone(),
                        top,
                        bottom: y,
                    });
                }
            }
        }
        let unplaced: Vec<&ItemData> = self
            .items
            .values()
            .filter(|i| !placed.contains(&&i.id))
            .collect();
        let mut positions = Vec::with_capacity(unplaced.len());
        for item in unplaced {
            if let Some(pos) = self.bar_position(item, y) {
                positions.push((item.id.clone(), pos));
            }
            y += theme::ROW_HEIGHT + theme::ROW_GAP;
        }
        self.layout.extend(positions);
        self.layout_changed = true;
    }

    fn bar_position(&self, item: &ItemData, top: f32) -> Option<AbsolutePosition> {
        let left = self.time_to_x(item.start?)?;
        let right = self.time_to_x(item.end?)?.max(left + theme::MIN_BAR_WIDTH);
        Some(AbsolutePosition::from_edges(left, top, right, top + theme::ROW_HEIGHT))
    }

    /// Render the chart area and report what the user did.
    pub fn show(&mut self, ui: &mut Ui) -> ChartInteraction {
        let mut interaction = ChartInteraction::default();
        let available = ui.available_size();
        if available != self.size {
            self.size = available;
            self.relayout();
        }

        let (response, painter) = ui.allocate_painter(available, Sense::hover());
        let origin = response.rect.min.to_vec2();
        painter.rect_filled(response.rect, 0.0, theme::BG_DARK);

        draw_lanes(&painter, origin, &self.bands, self.size.x);

        for (shape, (container, frame)) in &self.containers {
            let Some(frame) = frame else { continue };
            let rect = frame.container.to_rect().translate(origin);
            painter.rect_stroke(rect, Rounding::same(4.0), Stroke::new(1.5, container.style.color));
            let label_rect = painter.text(
                frame.label_anchor + origin,
                Align2::LEFT_BOTTOM,
                &container.style.label,
                theme::font_small(),
                container.style.color,
            );

            let response =
                ui.interact(rect, ui.make_persistent_id(("container", *shape)), Sense::click());
            if response.clicked() {
                interaction.container_clicked = Some(*shape);
            }
            if response.hovered() {
                interaction.container_hovered = Some(*shape);
            }
            let label = ui.interact(
                label_rect,
                ui.make_persistent_id(("container-label", container.label)),
                Sense::click(),
            );
            if label.clicked() {
                interaction.label_clicked = Some(*shape);
            }
        }

        for path in self.arrows.values().flatten() {
            draw_arrow(&painter, origin, path);
        }

        for (id, item) in &self.items {
            let Some(pos) = self.layout.get(id) else { continue };
            let color = self.palette.color(item.status);
            let bar_rect = draw_task_bar(&painter, pos.to_rect().translate(origin), item, color);
            let name_rect = painter.text(
                Pos2::new(bar_rect.right() + 6.0, bar_rect.center().y),
                Align2::LEFT_CENTER,
                &item.content,
                theme::font_bar(),
                theme::TEXT_SECONDARY,
            );

            let bar =
                ui.interact(bar_rect, ui.make_persistent_id(("task-bar", id)), Sense::click());
            if bar.clicked() {
                interaction.item_clicked = Some((id.clone(), ItemClick::Bar));
            }
            if let (Some(pointer), Some(window)) = (bar.hover_pos(), self.window) {
                let x = pointer.x - origin.x - theme::LANE_LABEL_WIDTH;
                interaction.item_hovered =
                    Some((id.clone(), window.x_to_time(x, self.chart_width())));
            }
            let name =
                ui.interact(name_rect, ui.make_persistent_id(("task-name", id)), Sense::click());
            if name.clicked() {
                interaction.item_clicked = Some((id.clone(), ItemClick::Name));
            }
        }

        if let Some(tooltip) = &self.tooltip {
            if let Some(x) = self.time_to_x(tooltip.time) {
                let x = x + origin.x;
                painter.line_segment(
                    [Pos2::new(x, response.rect.top()), Pos2::new(x, response.rect.bottom())],
                    Stroke::new(1.0, theme::TIME_MARKER),
                );
            }
            draw_tooltip(&painter, tooltip.anchor + origin, &tooltip.text);
        }

        interaction
    }
}

fn draw_lanes(painter: &egui::Painter, origin: Vec2, bands: &[Band], width: f32) {
    for (i, band) in bands.iter().enumerate() {
        let rect = Rect::from_min_max(Pos2::new(0.0, band.top), Pos2::new(width, band.bottom))
            .translate(origin);
        if i % 2 == 0 {
            painter.rect_filled(rect, 0.0, theme::BG_LANE);
        }
        painter.line_segment(
            [rect.left_bottom(), rect.right_bottom()],
            Stroke::new(0.5, theme::BORDER_SUBTLE),
        );
        painter.text(
            rect.left_top() + Vec2::new(8.0, 6.0),
            Align2::LEFT_TOP,
            &band.lane.content,
            theme::font_small(),
            theme::TEXT_SECONDARY,
        );
    }
}

fn draw_task_bar(painter: &egui::Painter, bar_rect: Rect, item: &ItemData, color: Color32) -> Rect {
    let rounding = Rounding::same(theme::BAR_ROUNDING);

    // Soft shadow
    painter.rect_filled(
        bar_rect.translate(Vec2::new(1.0, 2.0)),
        rounding,
        Color32::from_black_alpha(35),
    );
    painter.rect_filled(bar_rect, rounding, color);
    let highlight_rect = Rect::from_min_size(
        bar_rect.min,
        Vec2::new(bar_rect.width(), (bar_rect.height() * 0.45).max(4.0)),
    );
    painter.rect_filled(
        highlight_rect,
        Rounding {
            nw: theme::BAR_ROUNDING,
            ne: theme::BAR_ROUNDING,
            sw: 0.0,
            se: 0.0,
        },
        Color32::from_white_alpha(25),
    );

    if item.is_highlighted() {
        painter.rect_stroke(
            bar_rect.expand(1.5),
            Rounding::same(theme::BAR_ROUNDING + 1.5),
            Stroke::new(2.0, theme::BORDER_ACCENT),
        );
    }
    if item.expandable && bar_rect.width() > 16.0 {
        painter.text(
            Pos2::new(bar_rect.right() - 8.0, bar_rect.center().y),
            Align2::CENTER_CENTER,
            "+",
            theme::font_bar(),
            theme::TEXT_ON_BAR,
        );
    }

    bar_rect
}

fn draw_arrow(painter: &egui::Painter, origin: Vec2, path: &ArrowPath) {
    let points = path.points().map(|p| p + origin);
    let stroke = Stroke::new(1.5, theme::ARROW);
    painter.add(CubicBezierShape::from_points_stroke(points, false, Color32::TRANSPARENT, stroke));

    let tip = points[3];
    painter.add(Shape::convex_polygon(
        vec![tip, tip + Vec2::new(-6.0, -3.5), tip + Vec2::new(-6.0, 3.5)],
        theme::ARROW,
        Stroke::NONE,
    ));
}

fn draw_tooltip(painter: &egui::Painter, anchor: Pos2, text: &str) {
    let galley = painter.layout_no_wrap(text.to_owned(), theme::font_small(), theme::TEXT_PRIMARY);
    let rect = Rect::from_center_size(anchor, galley.size() + Vec2::new(10.0, 6.0));
    painter.rect_filled(rect, Rounding::same(3.0), theme::BG_PANEL);
    painter.rect_stroke(rect, Rounding::same(3.0), Stroke::new(1.0, theme::BORDER_SUBTLE));
    painter.galley(rect.min + Vec2::new(5.0, 3.0), galley, theme::TEXT_PRIMARY);
}

// ─── Collaborator traits ────────────────────────────────────────────────────

impl LayoutSource for EguiCanvas {
    fn item_position(&self, id: &TaskId) -> Option<RelativePosition> {
        let abs = self.layout.get(id)?;
        Some(RelativePosition {
            top: self.size.y - abs.top - abs.height,
            left: abs.left,
            width: abs.width,
            height: abs.height,
            parent: ParentFrame {
                top: 0.0,
                height: self.size.y,
            },
        })
    }

    fn frame_height(&self) -> f32 {
        self.size.y
    }

    fn container_height(&self) -> f32 {
        self.size.y
    }

    fn viewport_width(&self) -> f32 {
        self.size.x
    }
}

impl ItemSink for EguiCanvas {
    fn add_item(&mut self, item: &ItemData) {
        self.items.insert(item.id.clone(), item.clone());
        self.relayout();
    }

    fn update_item(&mut self, item: &ItemData) {
        if let Some(existing) = self.items.get_mut(&item.id) {
            *existing = item.clone();
            self.relayout();
        }
    }

    fn remove_item(&mut self, id: &TaskId) {
        if self.items.shift_remove(id).is_some() {
            self.relayout();
        }
    }

    fn set_groups(&mut self, lanes: &[Lane]) {
        self.lanes = lanes.to_vec();
        self.relayout();
    }
}

impl Overlay for EguiCanvas {
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
        self.containers.insert(shape.container, (shape.clone(), None));
    }

    fn set_container_frame(&mut self, container: ShapeId, frame: &HierarchyFrame) {
        if let Some((_, slot)) = self.containers.get_mut(&container) {
            *slot = Some(*frame);
        }
    }

    fn set_container_style(&mut self, container: ShapeId, style: &ContainerStyle) {
        if let Some((shape, _)) = self.containers.get_mut(&container) {
            shape.style = style.clone();
        }
    }

    fn remove_container(&mut self, container: ShapeId) {
        self.containers.shift_remove(&container);
    }

    fn show_tooltip(&mut self, tooltip: &TooltipView) {
        self.tooltip = Some(tooltip.clone());
    }

    fn hide_tooltip(&mut self) {
        self.tooltip = None;
    }
}

impl WindowControl for EguiCanvas {
    fn window(&self) -> Option<TimelineWindow> {
        self.window
    }

    fn set_window(&mut self, window: TimelineWindow) {
        self.window = Some(window);
        self.relayout();
    }

    fn focus(&mut self, id: &TaskId) {
        let (Some(window), Some(item)) = (self.window, self.items.get(id)) else {
            return;
        };
        if let Some(center) = item.start {
            let half = window.length() / 2;
            self.set_window(TimelineWindow::new(center - half, center + half));
        }
    }

    fn fit(&mut self) {
        let start = self.items.values().filter_map(|i| i.start).min();
        let end = self.items.values().filter_map(|i| i.end).max();
        if let (Some(start), Some(end)) = (start, end) {
            let margin = (end - start) / 20;
            self.set_window(TimelineWindow::new(start - margin, end + margin));
        }
    }
}
