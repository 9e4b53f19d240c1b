//! The timeline orchestrator.
//!
//! [`Timeline`] owns the rendered state of a task snapshot (items, arrows,
//! hierarchy containers, lanes) and keeps a [`Visualization`] collaborator in
//! step with it as snapshots arrive, the clock advances and the user expands
//! or compresses tasks.

mod toolbar;

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::config::TimelineConfig;
use crate::error::Result;
use crate::model::item::used_statuses;
use crate::model::task::{exit_tasks, patch_and_filter, root_tasks, validate};
use crate::model::{diff, ChangeSet, Forest, ItemData, Task, TaskId, TimelineWindow};
use crate::view::{
    ArrowEngine, GroupingEngine, HierarchyEngine, HierarchyEvent, ShapeId, TimeTooltip,
    Visualization,
};

/// How a task of the current snapshot is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Not started yet, unknown, or inside a compressed parent.
    Hidden,
    RenderedAsItem,
    /// Replaced by its sub-tasks and a hierarchy container.
    Expanded,
}

/// Which part of an item was clicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemClick {
    /// The bar itself. Expands the task.
    Bar,
    /// The name label. Selects the task.
    Name,
}

/// Notifications for the embedding application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimelineEvent {
    TaskSelected(TaskId),
    TaskHovered(TaskId),
    TaskUnhovered(TaskId),
    GroupingChanged(bool),
}

pub struct Timeline<V: Visualization> {
    vis: V,
    config: TimelineConfig,
    snapshot: Vec<Task>,
    forest: Forest,
    items: IndexMap<TaskId, ItemData>,
    expanded: HashSet<TaskId>,
    arrows: ArrowEngine,
    hierarchy: HierarchyEngine,
    grouping: GroupingEngine,
    tooltip: TimeTooltip,
    focused: Option<TaskId>,
    events: Vec<TimelineEvent>,
}

impl<V: Visualization> Timeline<V> {
    pub fn new(mut vis: V, config: TimelineConfig) -> Self {
        let mut grouping = GroupingEngine::new();
        grouping.ungroup(&mut vis);
        Self {
            arrows: ArrowEngine::new(config.arrows, config.hierarchy.label_padding),
            hierarchy: HierarchyEngine::new(config.hierarchy, config.palette),
            vis,
            config,
            snapshot: Vec::new(),
            forest: Forest::default(),
            items: IndexMap::new(),
            expanded: HashSet::new(),
            grouping,
            tooltip: TimeTooltip::new(),
            focused: None,
            events: Vec::new(),
        }
    }

    // ─── Accessors ──────────────────────────────────────────────────────────

    pub fn vis(&self) -> &V {
        &self.vis
    }

    pub fn vis_mut(&mut self) -> &mut V {
        &mut self.vis
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    /// The snapshot as last filtered against the clock.
    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    pub fn items(&self) -> &IndexMap<TaskId, ItemData> {
        &self.items
    }

    pub fn arrows(&self) -> &ArrowEngine {
        &self.arrows
    }

    pub fn hierarchy(&self) -> &HierarchyEngine {
        &self.hierarchy
    }

    pub fn is_grouped(&self) -> bool {
        self.grouping.is_grouped()
    }

    pub fn focused(&self) -> Option<&TaskId> {
        self.focused.as_ref()
    }

    pub fn is_expanded(&self, id: &TaskId) -> bool {
        self.expanded.contains(id)
    }

    pub fn state_of(&self, id: &TaskId) -> TaskState {
        if self.items.contains_key(id) {
            TaskState::RenderedAsItem
        } else if self.expanded.contains(id) {
            TaskState::Expanded
        } else {
            TaskState::Hidden
        }
    }

    pub fn take_events(&mut self) -> Vec<TimelineEvent> {
        std::mem::take(&mut self.events)
    }

    // ─── Snapshots ──────────────────────────────────────────────────────────

    /// Replace the task snapshot.
    ///
    /// Snapshots with duplicate ids or dependency cycles are rejected and the
    /// current rendering is left as it is. The window is fitted whenever an
    /// empty snapshot is followed by a non-empty one.
    pub fn set_tasks(&mut self, tasks: Vec<Task>, now: DateTime<Utc>) -> Result<()> {
        if let Err(err) = validate(&tasks) {
            warn!(%err, "snapshot rejected");
            return Err(err);
        }
        let was_empty = self.snapshot.is_empty();
        self.snapshot = tasks;
        self.reconcile(now);
        if was_empty && !self.snapshot.is_empty() {
            self.vis.fit();
        }
        Ok(())
    }

    /// Re-derive the rendering for a new instant: tasks that have started
    /// appear, running tasks grow.
    pub fn tick(&mut self, now: DateTime<Utc>) {
        self.reconcile(now);
    }

    fn reconcile(&mut self, now: DateTime<Utc>) {
        let next = Forest::new(patch_and_filter(&self.snapshot, now));
        let prev = std::mem::replace(&mut self.forest, next);

        let mut changes = diff(prev.tasks(), self.forest.tasks());
        let expanded = &self.expanded;
        let forest = &self.forest;
        changes
            .remove
            .retain(|t| is_visible(&prev, expanded, &t.id));
        changes.add.retain(|t| is_visible(forest, expanded, &t.id));
        changes
            .update
            .retain(|t| is_visible(forest, expanded, &t.id));
        if changes.is_empty() {
            return;
        }
        debug!(
            add = changes.add.len(),
            remove = changes.remove.len(),
            update = changes.update.len(),
            "applying snapshot changes"
        );
        self.apply(&prev, &changes);
    }

    fn apply(&mut self, prev: &Forest, changes: &ChangeSet) {
        let had_expanded = !self.expanded.is_empty();
        for task in &changes.remove {
            if self.expanded.contains(&task.id) {
                self.compress_task(task);
            }
            self.remove_item(&task.id);
        }
        for task in &changes.add {
            self.add_item(task);
        }
        for task in &changes.update {
            if !self.expanded.contains(&task.id) {
                self.update_item(task);
            } else if task.is_expandable() {
                self.hierarchy.update_element(&mut self.vis, &self.forest, task);
            } else {
                if let Some(previous) = prev.get(&task.id).cloned() {
                    self.compress_task(&previous);
                }
                self.update_item(task);
            }
        }

        self.arrows
            .update_dependencies(&mut self.vis, &self.forest, changes);
        if had_expanded || !self.expanded.is_empty() {
            self.sync_arrows();
        }
        self.grouping
            .on_visible_set_changed(&mut self.vis, used_statuses(self.items.values()));

        let hovered = self.tooltip.hovered().and_then(|id| self.items.get(id));
        self.tooltip.refresh(&mut self.vis, hovered);
    }

    /// Bring the arrows in line with the current expansion state. Snapshot
    /// updates only know about task-level edges, and re-anchoring only moves
    /// arrows between a task and its sub-forest's roots and exits. Edges into
    /// the middle of a sub-forest are restored here.
    fn sync_arrows(&mut self) {
        let wanted = wanted_arrows(&self.forest, &self.expanded);
        self.arrows.reconcile(&mut self.vis, &self.forest, &wanted);
    }

    // ─── Expand / compress ──────────────────────────────────────────────────

    /// Replace a task by its sub-tasks. Collapsed ancestors are expanded
    /// first, outermost first.
    pub fn expand(&mut self, id: &TaskId) {
        let Some(task) = self.forest.get(id) else {
            return;
        };
        if !task.is_expandable() || self.expanded.contains(id) {
            return;
        }
        let mut chain: Vec<Task> = self
            .forest
            .ancestors(id)
            .into_iter()
            .filter(|a| !self.expanded.contains(&a.id))
            .cloned()
            .collect();
        chain.reverse();
        chain.push(task.clone());
        for task in &chain {
            self.expand_task(task);
        }
        self.sync_arrows();
    }

    fn expand_task(&mut self, task: &Task) {
        debug!(task = %task.id, sub_tasks = task.sub_tasks.len(), "expanding");
        for sub in &task.sub_tasks {
            self.add_item(sub);
        }
        self.arrows.update_dependencies(
            &mut self.vis,
            &self.forest,
            &ChangeSet::adding(&task.sub_tasks),
        );
        self.arrows
            .set_expanded_task_dependencies(&mut self.vis, &self.forest, task);
        self.grouping.add_groups(&mut self.vis, &task.sub_tasks);
        self.remove_item(&task.id);
        self.expanded.insert(task.id.clone());
        self.hierarchy.add_element(&mut self.vis, &self.forest, task);
    }

    /// Fold a task's sub-tasks back into it. Expanded descendants are
    /// compressed first.
    pub fn compress(&mut self, id: &TaskId) {
        if !self.expanded.contains(id) {
            return;
        }
        if let Some(task) = self.forest.get(id).cloned() {
            self.compress_task(&task);
            self.sync_arrows();
            self.grouping
                .on_visible_set_changed(&mut self.vis, used_statuses(self.items.values()));
        }
    }

    fn compress_task(&mut self, task: &Task) {
        for sub in &task.sub_tasks {
            if self.expanded.contains(&sub.id) {
                self.compress_task(sub);
            }
        }
        debug!(task = %task.id, "compressing");
        self.arrows
            .set_compressed_task_dependencies(&mut self.vis, &self.forest, task);
        self.add_item(task);
        for sub in &task.sub_tasks {
            self.arrows.remove_task_arrows(&mut self.vis, &sub.id);
            self.remove_item(&sub.id);
        }
        self.expanded.remove(&task.id);
        self.hierarchy.remove_element(&mut self.vis, &task.id);
    }

    // ─── Focus & grouping ───────────────────────────────────────────────────

    /// Make a task the rendered unit, move the window onto it and highlight
    /// it. `None` only clears the highlight.
    pub fn focus(&mut self, id: Option<&TaskId>) {
        if let Some(previous) = self.focused.take() {
            if let Some(item) = self.items.get_mut(&previous) {
                item.remove_highlight();
                self.vis.update_item(item);
            }
        }
        let Some(id) = id else {
            return;
        };
        let Some(task) = self.forest.get(id).cloned() else {
            warn!(task = %id, "focus requested for a task that is not shown");
            return;
        };

        self.compress(id);
        if let Some(parent) = self.forest.parent(id).map(|p| p.id.clone()) {
            self.expand(&parent);
        }
        let window = match (task.start_time, task.finish_time) {
            (Some(start), Some(finish)) => Duration::try_seconds(self.config.focus.margin_secs)
                .and_then(|margin| TimelineWindow::try_around(start, finish, margin)),
            _ => None,
        };
        match window {
            Some(window) => self.vis.set_window(window),
            None => self.vis.focus(id),
        }

        self.focused = Some(id.clone());
        if let Some(item) = self.items.get_mut(id) {
            item.highlight();
            self.vis.update_item(item);
        }
    }

    pub fn set_grouped(&mut self, grouped: bool) {
        for item in self.items.values_mut() {
            item.set_grouped(grouped);
            self.vis.update_item(item);
        }
        if grouped {
            self.grouping.group_by_status(&mut self.vis);
        } else {
            self.grouping.ungroup(&mut self.vis);
        }
        self.events.push(TimelineEvent::GroupingChanged(grouped));
    }

    // ─── Collaborator notifications ─────────────────────────────────────────

    /// The widget moved its items; every overlay shape follows.
    pub fn on_layout_changed(&mut self) {
        self.arrows.reposition_all(&mut self.vis, &self.forest);
        self.hierarchy.reposition_all(&mut self.vis, &self.forest);
        let hovered = self.tooltip.hovered().and_then(|id| self.items.get(id));
        self.tooltip.refresh(&mut self.vis, hovered);
    }

    pub fn on_item_clicked(&mut self, id: &TaskId, click: ItemClick) {
        match click {
            ItemClick::Bar => self.expand(id),
            ItemClick::Name => self.events.push(TimelineEvent::TaskSelected(id.clone())),
        }
    }

    pub fn on_item_hovered(&mut self, id: &TaskId, pointer: DateTime<Utc>) {
        if let Some(item) = self.items.get(id) {
            self.tooltip.show(&mut self.vis, item, pointer);
            self.events.push(TimelineEvent::TaskHovered(id.clone()));
        }
    }

    pub fn on_item_unhovered(&mut self, id: &TaskId) {
        if self.tooltip.hovered() == Some(id) {
            self.tooltip.hide(&mut self.vis);
        }
        self.events.push(TimelineEvent::TaskUnhovered(id.clone()));
    }

    pub fn on_container_clicked(&mut self, shape: ShapeId) {
        self.hierarchy.container_clicked(shape);
        self.drain_hierarchy_events();
    }

    pub fn on_container_hovered(&mut self, shape: ShapeId) {
        self.hierarchy.container_hovered(shape);
        self.drain_hierarchy_events();
    }

    pub fn on_container_unhovered(&mut self, shape: ShapeId) {
        self.hierarchy.container_unhovered(shape);
        self.drain_hierarchy_events();
    }

    pub fn on_label_clicked(&mut self, shape: ShapeId) {
        self.hierarchy.label_clicked(shape);
        self.drain_hierarchy_events();
    }

    fn drain_hierarchy_events(&mut self) {
        for event in self.hierarchy.drain_events() {
            match event {
                HierarchyEvent::CompressRequested(id) => self.compress(&id),
                HierarchyEvent::HoverStarted(id) => {
                    self.events.push(TimelineEvent::TaskHovered(id));
                }
                HierarchyEvent::HoverEnded(id) => {
                    self.events.push(TimelineEvent::TaskUnhovered(id));
                }
                HierarchyEvent::Selected(id) => self.events.push(TimelineEvent::TaskSelected(id)),
            }
        }
    }

    // ─── Items ──────────────────────────────────────────────────────────────

    fn add_item(&mut self, task: &Task) {
        if self.items.contains_key(&task.id) {
            return;
        }
        let mut item = ItemData::from_task(task, self.grouping.is_grouped());
        if self.focused.as_ref() == Some(&task.id) {
            item.highlight();
        }
        self.vis.add_item(&item);
        self.items.insert(task.id.clone(), item);
    }

    fn update_item(&mut self, task: &Task) {
        let grouped = self.grouping.is_grouped();
        let focused = self.focused.as_ref() == Some(&task.id);
        if let Some(item) = self.items.get_mut(&task.id) {
            *item = ItemData::from_task(task, grouped);
            if focused {
                item.highlight();
            }
            self.vis.update_item(item);
        }
    }

    fn remove_item(&mut self, id: &TaskId) {
        if self.items.shift_remove(id).is_some() {
            self.vis.remove_item(id);
            if self.tooltip.hovered() == Some(id) {
                self.tooltip.hide(&mut self.vis);
            }
        }
    }
}

/// A task is visible when every one of its ancestors is expanded.
fn is_visible(forest: &Forest, expanded: &HashSet<TaskId>, id: &TaskId) -> bool {
    forest.contains(id)
        && forest
            .ancestors(id)
            .iter()
            .all(|a| expanded.contains(&a.id))
}

/// The arrows a fully consistent rendering shows: every edge of a visible
/// task, with expanded endpoints replaced by the exits (as sources) or
/// roots (as targets) of their sub-forest.
fn wanted_arrows(forest: &Forest, expanded: &HashSet<TaskId>) -> HashSet<(TaskId, TaskId)> {
    let mut wanted = HashSet::new();
    let mut stack: Vec<&Task> = forest.tasks().iter().collect();
    while let Some(task) = stack.pop() {
        if expanded.contains(&task.id) {
            stack.extend(task.sub_tasks.iter());
        }
        if task.dependents.is_empty() {
            continue;
        }
        let sources = source_anchors(expanded, task);
        for dependent in &task.dependents {
            for target in target_anchors(forest, expanded, dependent) {
                for source in &sources {
                    wanted.insert((source.clone(), target.clone()));
                }
            }
        }
    }
    wanted
}

fn source_anchors(expanded: &HashSet<TaskId>, task: &Task) -> Vec<TaskId> {
    if !expanded.contains(&task.id) {
        return vec![task.id.clone()];
    }
    exit_tasks(&task.sub_tasks)
        .into_iter()
        .flat_map(|leaf| source_anchors(expanded, leaf))
        .collect()
}

fn target_anchors(forest: &Forest, expanded: &HashSet<TaskId>, id: &TaskId) -> Vec<TaskId> {
    match forest.get(id) {
        Some(task) if expanded.contains(id) => root_tasks(&task.sub_tasks)
            .into_iter()
            .flat_map(|root| target_anchors(forest, expanded, &root.id))
            .collect(),
        _ => vec![id.clone()],
    }
}
