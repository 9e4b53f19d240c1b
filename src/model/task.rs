use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::Status;
use crate::error::{Result, TimelineError};

/// Opaque, stable identifier of a task.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh random id, for embedders that do not bring their own.
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for TaskId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A node of the task forest.
///
/// `dependents` are the outgoing dependency edges: the tasks that this task's
/// completion unblocks. `sub_tasks` are owned exclusively by this task.
/// A missing `finish_time` means the task is still running.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub status: Status,
    #[serde(default)]
    pub dependents: Vec<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sub_tasks: Vec<Task>,
}

impl Task {
    /// Create a task with no times, edges or children.
    pub fn new(id: impl Into<TaskId>, name: impl Into<String>, status: Status) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status,
            dependents: Vec::new(),
            start_time: None,
            finish_time: None,
            sub_tasks: Vec::new(),
        }
    }

    pub fn with_times(
        mut self,
        start: Option<DateTime<Utc>>,
        finish: Option<DateTime<Utc>>,
    ) -> Self {
        self.start_time = start;
        self.finish_time = finish;
        self
    }

    pub fn with_dependents<I, T>(mut self, dependents: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TaskId>,
    {
        self.dependents = dependents.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_sub_tasks(mut self, sub_tasks: Vec<Task>) -> Self {
        self.sub_tasks = sub_tasks;
        self
    }

    /// A task with children can be expanded into them.
    pub fn is_expandable(&self) -> bool {
        !self.sub_tasks.is_empty()
    }

    /// Whether `id` names this task or any task below it.
    pub fn contains(&self, id: &TaskId) -> bool {
        self.id == *id || get_by_id(&self.sub_tasks, id).is_some()
    }
}

// ─── Comparison ─────────────────────────────────────────────────────────────

/// Value equality of two tasks: own fields, dependents as a set, and
/// sub-tasks as a multiset keyed by id (recursively).
pub fn equals(a: &Task, b: &Task) -> bool {
    equal_fields(a, b) && same_dependents(a, b) && equal_task_sets(&a.sub_tasks, &b.sub_tasks)
}

/// Compares id, name, status and both instants. Ignores edges and children.
pub fn equal_fields(a: &Task, b: &Task) -> bool {
    a.id == b.id
        && a.name == b.name
        && a.status == b.status
        && a.start_time == b.start_time
        && a.finish_time == b.finish_time
}

fn same_dependents(a: &Task, b: &Task) -> bool {
    let left: HashSet<&TaskId> = a.dependents.iter().collect();
    let right: HashSet<&TaskId> = b.dependents.iter().collect();
    left == right
}

fn equal_task_sets(a: &[Task], b: &[Task]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut left: Vec<&Task> = a.iter().collect();
    let mut right: Vec<&Task> = b.iter().collect();
    left.sort_by(|x, y| x.id.cmp(&y.id));
    right.sort_by(|x, y| x.id.cmp(&y.id));
    left.iter().zip(right.iter()).all(|(x, y)| equals(x, y))
}

// ─── Queries ────────────────────────────────────────────────────────────────

/// Tasks that no other task depends on, directly or transitively.
///
/// Every id reachable along `dependents` from any task is marked; the tasks
/// never marked are the roots. The visited set bounds the walk, so a cyclic
/// input terminates (its members are simply never roots).
pub fn root_tasks(tasks: &[Task]) -> Vec<&Task> {
    let mut visited: HashSet<&TaskId> = HashSet::new();
    for task in tasks {
        mark_reachable(tasks, task, &mut visited);
    }
    tasks.iter().filter(|t| !visited.contains(&t.id)).collect()
}

fn mark_reachable<'a>(tasks: &'a [Task], from: &'a Task, visited: &mut HashSet<&'a TaskId>) {
    let mut stack = vec![from];
    while let Some(current) = stack.pop() {
        for dep in &current.dependents {
            if visited.insert(dep) {
                if let Some(next) = get_by_id(tasks, dep) {
                    stack.push(next);
                }
            }
        }
    }
}

/// Tasks without dependents.
pub fn leaf_tasks(tasks: &[Task]) -> Vec<&Task> {
    tasks.iter().filter(|t| t.dependents.is_empty()).collect()
}

/// The exit points of a sub-forest: tasks none of whose dependents lie
/// inside `tasks`. Edges leaving the sub-forest do not count, so a task that
/// only unblocks outside work is still an exit.
pub fn exit_tasks(tasks: &[Task]) -> Vec<&Task> {
    tasks
        .iter()
        .filter(|t| t.dependents.iter().all(|dep| get_by_id(tasks, dep).is_none()))
        .collect()
}

/// Depth-first lookup, including sub-tasks.
pub fn get_by_id<'a>(tasks: &'a [Task], id: &TaskId) -> Option<&'a Task> {
    for task in tasks {
        if task.id == *id {
            return Some(task);
        }
        if let Some(found) = get_by_id(&task.sub_tasks, id) {
            return Some(found);
        }
    }
    None
}

/// The direct parent of the task with `id`.
pub fn get_super_task<'a>(tasks: &'a [Task], id: &TaskId) -> Option<&'a Task> {
    for task in tasks {
        if task.sub_tasks.iter().any(|sub| sub.id == *id) {
            return Some(task);
        }
        if let Some(found) = get_super_task(&task.sub_tasks, id) {
            return Some(found);
        }
    }
    None
}

/// Every task of the forest, parents before their children.
pub fn flatten(tasks: &[Task]) -> Vec<&Task> {
    let mut out = Vec::new();
    let mut stack: Vec<&Task> = tasks.iter().rev().collect();
    while let Some(task) = stack.pop() {
        out.push(task);
        stack.extend(task.sub_tasks.iter().rev());
    }
    out
}

// ─── Temporal filtering ─────────────────────────────────────────────────────

/// Keep the tasks that started before `as_of`, clamp open-ended ones to
/// finish at `as_of`, and apply the same to their sub-tasks.
///
/// The result never aliases the input; a task without a start time is dropped.
pub fn patch_and_filter(tasks: &[Task], as_of: DateTime<Utc>) -> Vec<Task> {
    tasks
        .iter()
        .filter(|t| t.start_time.is_some_and(|start| start < as_of))
        .map(|t| Task {
            id: t.id.clone(),
            name: t.name.clone(),
            status: t.status,
            dependents: t.dependents.clone(),
            start_time: t.start_time,
            finish_time: Some(t.finish_time.unwrap_or(as_of)),
            sub_tasks: patch_and_filter(&t.sub_tasks, as_of),
        })
        .collect()
}

// ─── Validation ─────────────────────────────────────────────────────────────

/// Reject snapshots the reconciliation engine cannot render consistently:
/// a repeated id anywhere in the tree, or a cycle along `dependents`.
/// Edges to ids that are not part of the snapshot are ignored.
pub fn validate(tasks: &[Task]) -> Result<()> {
    let all = flatten(tasks);

    let mut seen: HashSet<&str> = HashSet::with_capacity(all.len());
    for task in &all {
        if !seen.insert(task.id.as_str()) {
            return Err(TimelineError::DuplicateTaskId(task.id.clone()));
        }
    }

    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::with_capacity(all.len(), all.len());
    for task in &all {
        graph.add_node(task.id.as_str());
    }
    for task in &all {
        for dep in &task.dependents {
            if *dep == task.id {
                return Err(TimelineError::CyclicDependency {
                    task: task.id.clone(),
                });
            }
            if seen.contains(dep.as_str()) {
                graph.add_edge(task.id.as_str(), dep.as_str(), ());
            }
        }
    }

    toposort(&graph, None).map(|_| ()).map_err(|cycle| {
        TimelineError::CyclicDependency {
            task: TaskId::from(cycle.node_id()),
        }
    })
}
