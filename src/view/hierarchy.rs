//! Containers drawn around expanded tasks.
//!
//! An expanded task has no item of its own. Instead a container is drawn
//! over the bounding box of its visible descendants, with the task name as a
//! label above it. Clicking the container asks for the task to be compressed.

use std::collections::{BTreeSet, HashMap, VecDeque};

use egui::Pos2;
use tracing::{debug, trace};

use super::position::{AbsolutePosition, PositionService};
use super::{ContainerShape, ContainerStyle, LayoutSource, Overlay, ShapeId};
use crate::config::{HierarchyConfig, StatusPalette};
use crate::model::{Forest, Task, TaskId};

/// Interactions with a container, in the order the collaborator reported them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HierarchyEvent {
    CompressRequested(TaskId),
    HoverStarted(TaskId),
    HoverEnded(TaskId),
    Selected(TaskId),
}

/// Geometry of a container and its label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HierarchyFrame {
    pub container: AbsolutePosition,
    pub label_anchor: Pos2,
}

#[derive(Debug)]
struct Element {
    container: ShapeId,
    label: ShapeId,
    style: ContainerStyle,
}

#[derive(Debug)]
pub struct HierarchyEngine {
    config: HierarchyConfig,
    palette: StatusPalette,
    elements: HashMap<TaskId, Element>,
    owners: HashMap<ShapeId, TaskId>,
    deferred: BTreeSet<TaskId>,
    events: VecDeque<HierarchyEvent>,
}

impl HierarchyEngine {
    pub fn new(config: HierarchyConfig, palette: StatusPalette) -> Self {
        Self {
            config,
            palette,
            elements: HashMap::new(),
            owners: HashMap::new(),
            deferred: BTreeSet::new(),
            events: VecDeque::new(),
        }
    }

    pub fn is_expanded(&self, id: &TaskId) -> bool {
        self.elements.contains_key(id) || self.deferred.contains(id)
    }

    /// Container shape of an expanded task, once it has been drawn.
    pub fn container_of(&self, id: &TaskId) -> Option<ShapeId> {
        self.elements.get(id).map(|e| e.container)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn add_element<V>(&mut self, vis: &mut V, forest: &Forest, task: &Task)
    where
        V: LayoutSource + Overlay + ?Sized,
    {
        if !task.is_expandable() {
            return;
        }
        if self.elements.contains_key(&task.id) {
            self.update_element(vis, forest, task);
            return;
        }
        let Some(frame) = self.frame_for(&*vis, forest, task) else {
            debug!(task = %task.id, "container deferred until layout");
            self.deferred.insert(task.id.clone());
            return;
        };
        self.deferred.remove(&task.id);

        let element = Element {
            container: ShapeId::new(),
            label: ShapeId::new(),
            style: self.style_for(task),
        };
        vis.add_container(&ContainerShape {
            container: element.container,
            label: element.label,
            task_id: task.id.clone(),
            style: element.style.clone(),
        });
        vis.set_container_frame(element.container, &frame);
        trace!(task = %task.id, "container added");

        self.owners.insert(element.container, task.id.clone());
        self.owners.insert(element.label, task.id.clone());
        self.elements.insert(task.id.clone(), element);
    }

    pub fn remove_element<V: Overlay + ?Sized>(&mut self, vis: &mut V, id: &TaskId) {
        self.deferred.remove(id);
        if let Some(element) = self.elements.remove(id) {
            self.owners.remove(&element.container);
            self.owners.remove(&element.label);
            vis.remove_container(element.container);
            trace!(task = %id, "container removed");
        }
    }

    /// Restyle and reposition an existing container in place.
    pub fn update_element<V>(&mut self, vis: &mut V, forest: &Forest, task: &Task)
    where
        V: LayoutSource + Overlay + ?Sized,
    {
        if self.deferred.contains(&task.id) {
            self.deferred.remove(&task.id);
            self.add_element(vis, forest, task);
            return;
        }
        let style = self.style_for(task);
        let frame = self.frame_for(&*vis, forest, task);
        let Some(element) = self.elements.get_mut(&task.id) else {
            return;
        };
        if element.style != style {
            vis.set_container_style(element.container, &style);
            element.style = style;
        }
        if let Some(frame) = frame {
            vis.set_container_frame(element.container, &frame);
        }
    }

    /// Reposition every container and retry the deferred ones.
    pub fn reposition_all<V>(&mut self, vis: &mut V, forest: &Forest)
    where
        V: LayoutSource + Overlay + ?Sized,
    {
        let deferred: Vec<TaskId> = std::mem::take(&mut self.deferred).into_iter().collect();
        for id in deferred {
            if let Some(task) = forest.get(&id) {
                self.add_element(vis, forest, task);
            }
        }
        let frames: Vec<(ShapeId, HierarchyFrame)> = self
            .elements
            .iter()
            .filter_map(|(id, element)| {
                let task = forest.get(id)?;
                Some((element.container, self.frame_for(&*vis, forest, task)?))
            })
            .collect();
        for (container, frame) in &frames {
            vis.set_container_frame(*container, frame);
        }
    }

    // ─── Interaction ────────────────────────────────────────────────────────

    pub fn container_clicked(&mut self, shape: ShapeId) {
        self.push(shape, HierarchyEvent::CompressRequested);
    }

    pub fn container_hovered(&mut self, shape: ShapeId) {
        self.push(shape, HierarchyEvent::HoverStarted);
    }

    pub fn container_unhovered(&mut self, shape: ShapeId) {
        self.push(shape, HierarchyEvent::HoverEnded);
    }

    pub fn label_clicked(&mut self, shape: ShapeId) {
        self.push(shape, HierarchyEvent::Selected);
    }

    pub fn drain_events(&mut self) -> Vec<HierarchyEvent> {
        self.events.drain(..).collect()
    }

    fn push(&mut self, shape: ShapeId, event: fn(TaskId) -> HierarchyEvent) {
        if let Some(id) = self.owners.get(&shape) {
            self.events.push_back(event(id.clone()));
        }
    }

    // ─── Geometry ───────────────────────────────────────────────────────────

    fn frame_for<V>(&self, vis: &V, forest: &Forest, task: &Task) -> Option<HierarchyFrame>
    where
        V: LayoutSource + ?Sized,
    {
        let positions = PositionService::new(forest, vis, self.config.label_padding);
        let mut container = positions.task_position(task).filter(AbsolutePosition::is_valid)?;
        container.add_padding(self.config.container_padding);
        Some(HierarchyFrame {
            label_anchor: Pos2::new(
                container.left + self.config.label_indent,
                container.top - self.config.container_padding,
            ),
            container,
        })
    }

    fn style_for(&self, task: &Task) -> ContainerStyle {
        ContainerStyle {
            class_name: format!("{} tdg-hierarchy tdg-pointer", task.status.class_name()),
            color: self.palette.color(task.status),
            label: task.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Status;
    use crate::view::memory::MemoryCanvas;

    fn parent() -> Task {
        Task::new("p", "Parent", Status::Failed).with_sub_tasks(vec![
            Task::new("a", "a", Status::Success),
            Task::new("b", "b", Status::Failed),
        ])
    }

    fn engine() -> HierarchyEngine {
        HierarchyEngine::new(HierarchyConfig::default(), StatusPalette::default())
    }

    fn laid_out_canvas() -> MemoryCanvas {
        let mut canvas = MemoryCanvas::new(800.0, 600.0);
        canvas.place("a", AbsolutePosition::from_edges(100.0, 40.0, 200.0, 60.0));
        canvas.place("b", AbsolutePosition::from_edges(150.0, 70.0, 300.0, 90.0));
        canvas
    }

    #[test]
    fn container_wraps_padded_descendant_box() {
        let task = parent();
        let forest = Forest::new(vec![task.clone()]);
        let mut canvas = laid_out_canvas();
        let mut hierarchy = engine();
        hierarchy.add_element(&mut canvas, &forest, &task);

        let shape = hierarchy.container_of(&task.id).unwrap();
        let stored = canvas.container(shape).unwrap();
        assert_eq!(stored.shape.style.class_name, "tdg-failed tdg-hierarchy tdg-pointer");
        assert_eq!(stored.shape.style.label, "Parent");
        let frame = stored.frame.unwrap();
        assert_eq!(
            (frame.container.left, frame.container.top, frame.container.bottom),
            (100.0, 35.0, 95.0)
        );
        assert_eq!(frame.label_anchor, Pos2::new(110.0, 30.0));
    }

    #[test]
    fn leaf_tasks_get_no_container() {
        let leaf = Task::new("x", "x", Status::Running);
        let mut canvas = laid_out_canvas();
        let mut hierarchy = engine();
        hierarchy.add_element(&mut canvas, &Forest::new(vec![leaf.clone()]), &leaf);
        assert!(hierarchy.is_empty());
        assert!(!hierarchy.is_expanded(&leaf.id));
    }

    #[test]
    fn unresolved_containers_wait_for_layout() {
        let task = parent();
        let forest = Forest::new(vec![task.clone()]);
        let mut canvas = MemoryCanvas::new(800.0, 600.0);
        let mut hierarchy = engine();
        hierarchy.add_element(&mut canvas, &forest, &task);
        assert!(hierarchy.is_expanded(&task.id));
        assert!(canvas.containers().is_empty());

        canvas.place("a", AbsolutePosition::from_edges(100.0, 40.0, 200.0, 60.0));
        hierarchy.reposition_all(&mut canvas, &forest);
        assert_eq!(canvas.containers().len(), 1);
        assert_eq!(hierarchy.len(), 1);
    }

    #[test]
    fn update_restyles_in_place() {
        let task = parent();
        let forest = Forest::new(vec![task.clone()]);
        let mut canvas = laid_out_canvas();
        let mut hierarchy = engine();
        hierarchy.add_element(&mut canvas, &forest, &task);
        let shape = hierarchy.container_of(&task.id).unwrap();

        let mut recovered = task.clone();
        recovered.status = Status::Success;
        hierarchy.update_element(&mut canvas, &forest, &recovered);
        assert_eq!(hierarchy.container_of(&task.id), Some(shape));
        let stored = canvas.container(shape).unwrap();
        assert_eq!(stored.shape.style.class_name, "tdg-success tdg-hierarchy tdg-pointer");
        assert_eq!(stored.shape.style.color, StatusPalette::default().success);
    }

    #[test]
    fn interactions_are_queued_in_order() {
        let task = parent();
        let forest = Forest::new(vec![task.clone()]);
        let mut canvas = laid_out_canvas();
        let mut hierarchy = engine();
        hierarchy.add_element(&mut canvas, &forest, &task);
        let shape = hierarchy.container_of(&task.id).unwrap();
        let label = canvas.container(shape).unwrap().shape.label;

        hierarchy.container_hovered(shape);
        hierarchy.label_clicked(label);
        hierarchy.container_clicked(shape);
        hierarchy.container_unhovered(ShapeId::new());
        assert_eq!(
            hierarchy.drain_events(),
            vec![
                HierarchyEvent::HoverStarted(task.id.clone()),
                HierarchyEvent::Selected(task.id.clone()),
                HierarchyEvent::CompressRequested(task.id.clone()),
            ]
        );
        assert!(hierarchy.drain_events().is_empty());

        hierarchy.remove_element(&mut canvas, &task.id);
        assert!(canvas.containers().is_empty());
        hierarchy.container_clicked(shape);
        assert!(hierarchy.drain_events().is_empty());
    }
}
