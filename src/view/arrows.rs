//! Dependency arrows between rendered tasks.
//!
//! Every arrow is keyed by its `(source, target)` pair in two maps, one by
//! source and one by target, so removing a task drops its arrows without
//! scanning the whole index. Both maps are private to [`ArrowIndex`] and only
//! ever change together.

use std::collections::{HashMap, HashSet};

use egui::{Pos2, Vec2};
use tracing::{debug, trace};

use super::position::{AbsolutePosition, PositionService};
use super::{LayoutSource, Overlay, ShapeId};
use crate::config::ArrowConfig;
use crate::model::task::{exit_tasks, root_tasks};
use crate::model::{ChangeSet, Forest, Task, TaskId};

// ─── Geometry ───────────────────────────────────────────────────────────────

/// A cubic curve from the right edge of the source to the left edge of the
/// target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrowPath {
    pub from: Pos2,
    pub ctrl1: Pos2,
    pub ctrl2: Pos2,
    pub to: Pos2,
}

impl ArrowPath {
    pub fn between(source: &AbsolutePosition, target: &AbsolutePosition, pull_factor: f32) -> Self {
        let from = source.right_mid();
        let to = target.left_mid();
        let pull = Vec2::new(pull_factor * source.height.min(target.height), 0.0);
        Self {
            from,
            ctrl1: from + pull,
            ctrl2: to - pull,
            to,
        }
    }

    pub fn points(&self) -> [Pos2; 4] {
        [self.from, self.ctrl1, self.ctrl2, self.to]
    }

    /// SVG path data, e.g. for embedders that render to a document.
    pub fn to_svg(&self) -> String {
        format!(
            "M {} {} C {} {}, {} {}, {} {}",
            self.from.x,
            self.from.y,
            self.ctrl1.x,
            self.ctrl1.y,
            self.ctrl2.x,
            self.ctrl2.y,
            self.to.x,
            self.to.y
        )
    }
}

/// An endpoint with no horizontal extent at `x`, borrowing the vertical
/// placement of the other end.
fn pinned(x: f32, other: &AbsolutePosition) -> AbsolutePosition {
    AbsolutePosition::from_edges(x, other.top, x, other.bottom)
}

// ─── Index ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct ArrowIndex {
    outgoing: HashMap<TaskId, HashMap<TaskId, ShapeId>>,
    incoming: HashMap<TaskId, HashMap<TaskId, ShapeId>>,
}

impl ArrowIndex {
    fn get(&self, source: &TaskId, target: &TaskId) -> Option<ShapeId> {
        self.outgoing.get(source)?.get(target).copied()
    }

    fn insert(&mut self, source: &TaskId, target: &TaskId, shape: ShapeId) {
        self.outgoing
            .entry(source.clone())
            .or_default()
            .insert(target.clone(), shape);
        self.incoming
            .entry(target.clone())
            .or_default()
            .insert(source.clone(), shape);
    }

    fn remove(&mut self, source: &TaskId, target: &TaskId) -> Option<ShapeId> {
        let shape = detach(&mut self.outgoing, source, target)?;
        detach(&mut self.incoming, target, source);
        Some(shape)
    }

    fn targets_of(&self, source: &TaskId) -> Vec<TaskId> {
        self.outgoing
            .get(source)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn sources_of(&self, target: &TaskId) -> Vec<TaskId> {
        self.incoming
            .get(target)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn iter(&self) -> impl Iterator<Item = (&TaskId, &TaskId, ShapeId)> {
        self.outgoing
            .iter()
            .flat_map(|(s, targets)| targets.iter().map(move |(t, shape)| (s, t, *shape)))
    }

    fn len(&self) -> usize {
        self.outgoing.values().map(HashMap::len).sum()
    }
}

fn detach(
    map: &mut HashMap<TaskId, HashMap<TaskId, ShapeId>>,
    outer: &TaskId,
    inner: &TaskId,
) -> Option<ShapeId> {
    let entries = map.get_mut(outer)?;
    let shape = entries.remove(inner);
    if entries.is_empty() {
        map.remove(outer);
    }
    shape
}

// ─── Engine ─────────────────────────────────────────────────────────────────

/// Owns the arrow index and keeps the overlay's arrow shapes in sync with it.
#[derive(Debug)]
pub struct ArrowEngine {
    index: ArrowIndex,
    config: ArrowConfig,
    label_padding: f32,
}

impl ArrowEngine {
    pub fn new(config: ArrowConfig, label_padding: f32) -> Self {
        Self {
            index: ArrowIndex::default(),
            config,
            label_padding,
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.outgoing.is_empty()
    }

    pub fn contains(&self, source: &TaskId, target: &TaskId) -> bool {
        self.index.get(source, target).is_some()
    }

    /// Every `(source, target)` pair currently drawn.
    pub fn pairs(&self) -> impl Iterator<Item = (&TaskId, &TaskId)> {
        self.index.iter().map(|(s, t, _)| (s, t))
    }

    pub fn outgoing(&self, source: &TaskId) -> Vec<TaskId> {
        self.index.targets_of(source)
    }

    pub fn incoming(&self, target: &TaskId) -> Vec<TaskId> {
        self.index.sources_of(target)
    }

    /// Draw an arrow unless one already exists for the pair. The path is only
    /// written once both ends resolve to a usable position; otherwise the next
    /// [`reposition_all`](Self::reposition_all) picks it up.
    pub fn add_arrow<V>(&mut self, vis: &mut V, forest: &Forest, source: &TaskId, target: &TaskId)
    where
        V: LayoutSource + Overlay + ?Sized,
    {
        if self.contains(source, target) {
            return;
        }
        let shape = ShapeId::new();
        vis.add_arrow(shape);
        self.index.insert(source, target, shape);
        trace!(%source, %target, "arrow added");

        match self.path_for(&*vis, forest, source, target) {
            Some(path) => vis.set_arrow_path(shape, &path),
            None => trace!(%source, %target, "arrow geometry deferred"),
        }
    }

    pub fn remove_arrow<V>(&mut self, vis: &mut V, source: &TaskId, target: &TaskId)
    where
        V: Overlay + ?Sized,
    {
        if let Some(shape) = self.index.remove(source, target) {
            vis.remove_arrow(shape);
            trace!(%source, %target, "arrow removed");
        }
    }

    /// Drop every arrow starting or ending at `id`.
    pub fn remove_task_arrows<V>(&mut self, vis: &mut V, id: &TaskId)
    where
        V: Overlay + ?Sized,
    {
        for target in self.index.targets_of(id) {
            self.remove_arrow(vis, id, &target);
        }
        for source in self.index.sources_of(id) {
            self.remove_arrow(vis, &source, id);
        }
    }

    /// Apply a change-set: removals first, then additions, then updated tasks
    /// have their outgoing arrows reconciled with their current dependents.
    pub fn update_dependencies<V>(&mut self, vis: &mut V, forest: &Forest, changes: &ChangeSet)
    where
        V: LayoutSource + Overlay + ?Sized,
    {
        let before = self.len();
        for task in &changes.remove {
            self.remove_task_arrows(vis, &task.id);
        }
        for task in &changes.add {
            for target in &task.dependents {
                self.add_arrow(vis, forest, &task.id, target);
            }
        }
        for task in &changes.update {
            let wanted: HashSet<&TaskId> = task.dependents.iter().collect();
            for target in self.index.targets_of(&task.id) {
                if !wanted.contains(&target) {
                    self.remove_arrow(vis, &task.id, &target);
                }
            }
            for target in &task.dependents {
                self.add_arrow(vis, forest, &task.id, target);
            }
        }
        debug!(before, after = self.len(), "dependencies updated");
    }

    /// Move the arrows of a task that is being expanded onto its sub-tasks:
    /// outgoing arrows now leave from every exit of the sub-forest (no
    /// dependent inside it), incoming arrows end at every root.
    pub fn set_expanded_task_dependencies<V>(&mut self, vis: &mut V, forest: &Forest, task: &Task)
    where
        V: LayoutSource + Overlay + ?Sized,
    {
        let leaves = exit_tasks(&task.sub_tasks);
        let roots = root_tasks(&task.sub_tasks);

        for target in self.index.targets_of(&task.id) {
            for leaf in &leaves {
                self.add_arrow(vis, forest, &leaf.id, &target);
            }
            self.remove_arrow(vis, &task.id, &target);
        }
        for source in self.index.sources_of(&task.id) {
            for root in &roots {
                self.add_arrow(vis, forest, &source, &root.id);
            }
            self.remove_arrow(vis, &source, &task.id);
        }
    }

    /// Inverse of [`set_expanded_task_dependencies`](Self::set_expanded_task_dependencies):
    /// arrows between the task's leaf or root sub-tasks and tasks outside its
    /// subtree are re-anchored on the task itself. Arrows internal to the
    /// subtree are left for the caller to remove with the sub-task items.
    pub fn set_compressed_task_dependencies<V>(&mut self, vis: &mut V, forest: &Forest, task: &Task)
    where
        V: LayoutSource + Overlay + ?Sized,
    {
        for leaf in exit_tasks(&task.sub_tasks) {
            for target in self.index.targets_of(&leaf.id) {
                if !task.contains(&target) {
                    self.add_arrow(vis, forest, &task.id, &target);
                    self.remove_arrow(vis, &leaf.id, &target);
                }
            }
        }
        for root in root_tasks(&task.sub_tasks) {
            for source in self.index.sources_of(&root.id) {
                if !task.contains(&source) {
                    self.add_arrow(vis, forest, &source, &task.id);
                    self.remove_arrow(vis, &source, &root.id);
                }
            }
        }
    }

    /// Make the drawn arrows exactly `wanted`, touching only the pairs that
    /// differ.
    pub fn reconcile<V>(&mut self, vis: &mut V, forest: &Forest, wanted: &HashSet<(TaskId, TaskId)>)
    where
        V: LayoutSource + Overlay + ?Sized,
    {
        let stale: Vec<(TaskId, TaskId)> = self
            .index
            .iter()
            .filter(|(s, t, _)| !wanted.contains(&((*s).clone(), (*t).clone())))
            .map(|(s, t, _)| (s.clone(), t.clone()))
            .collect();
        for (source, target) in &stale {
            self.remove_arrow(vis, source, target);
        }
        for (source, target) in wanted {
            self.add_arrow(vis, forest, source, target);
        }
        if !stale.is_empty() {
            debug!(removed = stale.len(), total = self.len(), "arrows reconciled");
        }
    }

    /// Recompute every arrow path, e.g. after the widget re-laid its items.
    pub fn reposition_all<V>(&self, vis: &mut V, forest: &Forest)
    where
        V: LayoutSource + Overlay + ?Sized,
    {
        let paths: Vec<(ShapeId, ArrowPath)> = self
            .index
            .iter()
            .filter_map(|(s, t, shape)| Some((shape, self.path_for(&*vis, forest, s, t)?)))
            .collect();
        trace!(resolved = paths.len(), total = self.len(), "arrows repositioned");
        for (shape, path) in &paths {
            vis.set_arrow_path(*shape, path);
        }
    }

    fn path_for<V>(
        &self,
        vis: &V,
        forest: &Forest,
        source: &TaskId,
        target: &TaskId,
    ) -> Option<ArrowPath>
    where
        V: LayoutSource + ?Sized,
    {
        let positions = PositionService::new(forest, vis, self.label_padding);
        let from = positions
            .task_position_by_id(source)
            .filter(AbsolutePosition::is_horizontally_resolved);
        let to = positions
            .task_position_by_id(target)
            .filter(AbsolutePosition::is_horizontally_resolved);

        if ![from, to].iter().flatten().all(AbsolutePosition::is_valid) {
            return None;
        }
        let far_edge = self.config.far_edge.unwrap_or_else(|| vis.viewport_width());
        let (from, to) = match (from, to) {
            (Some(from), Some(to)) => (from, to),
            (None, Some(to)) => (pinned(0.0, &to), to),
            (Some(from), None) => (from, pinned(far_edge, &from)),
            (None, None) => return None,
        };
        Some(ArrowPath::between(&from, &to, self.config.pull_factor))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::model::{ItemData, Status};
    use crate::view::memory::MemoryCanvas;
    use crate::view::ItemSink;

    fn pairs(engine: &ArrowEngine) -> BTreeSet<(String, String)> {
        engine
            .pairs()
            .map(|(s, t)| (s.to_string(), t.to_string()))
            .collect()
    }

    fn pair(s: &str, t: &str) -> (String, String) {
        (s.to_string(), t.to_string())
    }

    fn render(canvas: &mut MemoryCanvas, tasks: &[&Task]) {
        for task in tasks {
            canvas.add_item(&ItemData::from_task(task, false));
        }
    }

    #[test]
    fn path_runs_from_right_edge_to_left_edge() {
        let source = AbsolutePosition::from_edges(10.0, 10.0, 50.0, 30.0);
        let target = AbsolutePosition::from_edges(80.0, 50.0, 120.0, 60.0);
        let path = ArrowPath::between(&source, &target, 1.0);
        assert_eq!(path.from, Pos2::new(50.0, 20.0));
        assert_eq!(path.to, Pos2::new(80.0, 55.0));
        assert_eq!(path.ctrl1, Pos2::new(60.0, 20.0));
        assert_eq!(path.ctrl2, Pos2::new(70.0, 55.0));
        assert_eq!(path.to_svg(), "M 50 20 C 60 20, 70 55, 80 55");
    }

    #[test]
    fn change_set_drives_index() {
        let t3 = Task::new("task3", "3", Status::Success);
        let t4 = Task::new("task4", "4", Status::Success);
        let t2 = Task::new("task2", "2", Status::Success).with_dependents(["task3", "task4"]);
        let t1 = Task::new("task1", "1", Status::Success).with_dependents(["task2"]);
        let all = vec![t1.clone(), t2.clone(), t3.clone(), t4.clone()];
        let forest = Forest::new(all.clone());

        let mut canvas = MemoryCanvas::new(800.0, 600.0);
        render(&mut canvas, &[&t1, &t2, &t3, &t4]);
        let mut engine = ArrowEngine::new(ArrowConfig::default(), 20.0);
        engine.update_dependencies(&mut canvas, &forest, &ChangeSet::adding(&all));

        assert_eq!(engine.len(), 3);
        assert_eq!(canvas.arrows().len(), 3);
        assert!(canvas.arrows().values().all(Option::is_some));
        assert_eq!(engine.incoming(&"task2".into()), vec![TaskId::from("task1")]);

        engine.update_dependencies(&mut canvas, &forest, &ChangeSet::removing(&[t1, t2]));
        assert!(engine.is_empty());
        assert!(canvas.arrows().is_empty());
    }

    #[test]
    fn update_reconciles_outgoing_edges() {
        let a = Task::new("a", "a", Status::Running).with_dependents(["b"]);
        let b = Task::new("b", "b", Status::Running);
        let c = Task::new("c", "c", Status::Running);
        let forest = Forest::new(vec![a.clone(), b.clone(), c.clone()]);
        let mut canvas = MemoryCanvas::new(800.0, 600.0);
        let mut engine = ArrowEngine::new(ArrowConfig::default(), 20.0);
        engine.update_dependencies(&mut canvas, &forest, &ChangeSet::adding(&[a, b, c]));

        let changed = Task::new("a", "a", Status::Running).with_dependents(["c"]);
        let changes = ChangeSet {
            update: vec![changed],
            ..Default::default()
        };
        engine.update_dependencies(&mut canvas, &forest, &changes);
        assert_eq!(pairs(&engine), BTreeSet::from([pair("a", "c")]));
        assert_eq!(canvas.arrows().len(), 1);
    }

    #[test]
    fn adding_twice_keeps_one_shape() {
        let forest = Forest::default();
        let mut canvas = MemoryCanvas::new(800.0, 600.0);
        let mut engine = ArrowEngine::new(ArrowConfig::default(), 20.0);
        engine.add_arrow(&mut canvas, &forest, &"a".into(), &"b".into());
        engine.add_arrow(&mut canvas, &forest, &"a".into(), &"b".into());
        assert_eq!(engine.len(), 1);
        assert_eq!(canvas.arrows().len(), 1);
        // neither end is laid out
        assert_eq!(canvas.arrows().values().next(), Some(&None));
    }

    #[test]
    fn unresolved_target_is_pinned_to_far_edge() {
        let a = Task::new("a", "a", Status::Running).with_dependents(["gone"]);
        let forest = Forest::new(vec![a.clone()]);
        let mut canvas = MemoryCanvas::new(640.0, 480.0);
        render(&mut canvas, &[&a]);
        let config = ArrowConfig {
            far_edge: Some(700.0),
            ..Default::default()
        };
        let mut engine = ArrowEngine::new(config, 20.0);
        engine.add_arrow(&mut canvas, &forest, &"a".into(), &"gone".into());

        let path = canvas.arrows().values().next().copied().flatten().unwrap();
        assert_eq!(path.to.x, 700.0);
        assert_eq!(path.to.y, path.from.y);

        engine.remove_arrow(&mut canvas, &"a".into(), &"gone".into());
        engine.add_arrow(&mut canvas, &forest, &"before".into(), &"a".into());
        let path = canvas.arrows().values().next().copied().flatten().unwrap();
        assert_eq!(path.from.x, 0.0);
    }

    #[test]
    fn expand_and_compress_re_anchor_arrows() {
        let inner_a = Task::new("pa", "pa", Status::Running).with_dependents(["pb"]);
        let inner_b = Task::new("pb", "pb", Status::Running);
        let parent = Task::new("p", "p", Status::Running)
            .with_dependents(["after"])
            .with_sub_tasks(vec![inner_a.clone(), inner_b.clone()]);
        let before = Task::new("before", "before", Status::Success).with_dependents(["p"]);
        let after = Task::new("after", "after", Status::Unknown);
        let tasks = vec![before.clone(), parent.clone(), after.clone()];
        let forest = Forest::new(tasks.clone());

        let mut canvas = MemoryCanvas::new(800.0, 600.0);
        render(&mut canvas, &[&before, &parent, &after]);
        let mut engine = ArrowEngine::new(ArrowConfig::default(), 20.0);
        engine.update_dependencies(&mut canvas, &forest, &ChangeSet::adding(&tasks));
        let collapsed = pairs(&engine);

        engine.update_dependencies(&mut canvas, &forest, &ChangeSet::adding(&parent.sub_tasks));
        engine.set_expanded_task_dependencies(&mut canvas, &forest, &parent);
        assert_eq!(
            pairs(&engine),
            BTreeSet::from([pair("before", "pa"), pair("pa", "pb"), pair("pb", "after")])
        );

        engine.set_compressed_task_dependencies(&mut canvas, &forest, &parent);
        for sub in &parent.sub_tasks {
            engine.remove_task_arrows(&mut canvas, &sub.id);
        }
        assert_eq!(pairs(&engine), collapsed);
        assert_eq!(canvas.arrows().len(), collapsed.len());
    }

    #[test]
    fn expansion_anchors_on_sub_tasks_that_only_unblock_outside_work() {
        let x = Task::new("x", "x", Status::Success).with_dependents(["y"]);
        let y = Task::new("y", "y", Status::Running).with_dependents(["b"]);
        let parent = Task::new("p", "p", Status::Running)
            .with_dependents(["c"])
            .with_sub_tasks(vec![x.clone(), y.clone()]);
        let b = Task::new("b", "b", Status::Unknown);
        let c = Task::new("c", "c", Status::Unknown);
        let tasks = vec![parent.clone(), b.clone(), c.clone()];
        let forest = Forest::new(tasks.clone());

        let mut canvas = MemoryCanvas::new(800.0, 600.0);
        render(&mut canvas, &[&parent, &b, &c]);
        let mut engine = ArrowEngine::new(ArrowConfig::default(), 20.0);
        engine.update_dependencies(&mut canvas, &forest, &ChangeSet::adding(&tasks));

        render(&mut canvas, &[&x, &y]);
        engine.update_dependencies(&mut canvas, &forest, &ChangeSet::adding(&parent.sub_tasks));
        engine.set_expanded_task_dependencies(&mut canvas, &forest, &parent);
        assert_eq!(
            pairs(&engine),
            BTreeSet::from([pair("x", "y"), pair("y", "b"), pair("y", "c")])
        );

        engine.set_compressed_task_dependencies(&mut canvas, &forest, &parent);
        assert!(pairs(&engine).contains(&pair("p", "c")));
    }

    #[test]
    fn reconcile_only_touches_differences() {
        let forest = Forest::default();
        let mut canvas = MemoryCanvas::new(800.0, 600.0);
        let mut engine = ArrowEngine::new(ArrowConfig::default(), 20.0);
        engine.add_arrow(&mut canvas, &forest, &"a".into(), &"b".into());
        engine.add_arrow(&mut canvas, &forest, &"b".into(), &"c".into());
        let kept: Vec<ShapeId> = canvas.arrows().keys().copied().collect();

        let wanted = HashSet::from([
            (TaskId::from("a"), TaskId::from("b")),
            (TaskId::from("a"), TaskId::from("c")),
        ]);
        engine.reconcile(&mut canvas, &forest, &wanted);
        assert_eq!(
            pairs(&engine),
            BTreeSet::from([pair("a", "b"), pair("a", "c")])
        );
        assert_eq!(canvas.arrows().len(), 2);
        assert_eq!(kept.iter().filter(|s| canvas.arrows().contains_key(s)).count(), 1);
    }
}
