use indexmap::IndexMap;

use super::task::{equals, Task, TaskId};

/// The changes needed to move a rendering from one snapshot to the next.
///
/// `add` and `update` hold values from the current snapshot, `remove` holds
/// values from the previous one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    pub add: Vec<Task>,
    pub remove: Vec<Task>,
    pub update: Vec<Task>,
}

impl ChangeSet {
    pub fn adding(tasks: &[Task]) -> Self {
        Self {
            add: tasks.to_vec(),
            ..Default::default()
        }
    }

    pub fn removing(tasks: &[Task]) -> Self {
        Self {
            remove: tasks.to_vec(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty() && self.update.is_empty()
    }

    pub fn len(&self) -> usize {
        self.add.len() + self.remove.len() + self.update.len()
    }

    /// Keep only the entries matching `keep` in all three lists.
    pub fn retain(&mut self, mut keep: impl FnMut(&Task) -> bool) {
        self.add.retain(|t| keep(t));
        self.remove.retain(|t| keep(t));
        self.update.retain(|t| keep(t));
    }

    fn merge(&mut self, other: ChangeSet) {
        self.add.extend(other.add);
        self.remove.extend(other.remove);
        self.update.extend(other.update);
    }
}

#[derive(Default)]
struct Pair<'a> {
    prev: Option<&'a Task>,
    curr: Option<&'a Task>,
}

/// Compute the change-set between two snapshots.
///
/// A task present on both sides but unequal is reported as updated, and the
/// diff of its sub-tasks is merged into the result. Entries come out in the
/// order ids were first seen: previous snapshot first, then new ids.
pub fn diff(prev: &[Task], curr: &[Task]) -> ChangeSet {
    let mut pairs: IndexMap<&TaskId, Pair<'_>> = IndexMap::with_capacity(prev.len() + curr.len());
    for task in prev {
        pairs.entry(&task.id).or_default().prev = Some(task);
    }
    for task in curr {
        pairs.entry(&task.id).or_default().curr = Some(task);
    }

    let mut changes = ChangeSet::default();
    for pair in pairs.values() {
        match (pair.prev, pair.curr) {
            (Some(prev), None) => changes.remove.push(prev.clone()),
            (None, Some(curr)) => changes.add.push(curr.clone()),
            (Some(prev), Some(curr)) if !equals(prev, curr) => {
                changes.update.push(curr.clone());
                let nested = diff(&prev.sub_tasks, &curr.sub_tasks);
                changes.merge(nested);
            }
            _ => {}
        }
    }
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Status;
    use pretty_assertions::assert_eq;

    fn ids(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.id.as_str()).collect()
    }

    fn task(id: &str) -> Task {
        Task::new(id, id, Status::Success)
    }

    #[test]
    fn identical_snapshots_have_no_changes() {
        let tasks = vec![task("1").with_dependents(["2"]), task("2")];
        assert!(diff(&tasks, &tasks).is_empty());
    }

    #[test]
    fn reports_removed_tasks_of_a_chain() {
        let prev = vec![
            task("task1").with_dependents(["task2"]),
            task("task2").with_dependents(["task3", "task4"]),
            task("task3"),
            task("task4"),
        ];
        let curr = vec![task("task3"), task("task4")];
        let changes = diff(&prev, &curr);
        assert_eq!(ids(&changes.remove), vec!["task1", "task2"]);
        assert!(changes.add.is_empty());
        assert!(changes.update.is_empty());
    }

    #[test]
    fn reports_added_and_updated() {
        let prev = vec![task("a"), task("b")];
        let mut b = task("b");
        b.status = Status::Failed;
        let curr = vec![b, task("c")];
        let changes = diff(&prev, &curr);
        assert_eq!(ids(&changes.remove), vec!["a"]);
        assert_eq!(ids(&changes.update), vec!["b"]);
        assert_eq!(ids(&changes.add), vec!["c"]);
        assert_eq!(changes.update[0].status, Status::Failed);
    }

    #[test]
    fn dependents_change_is_an_update() {
        let prev = vec![task("a").with_dependents(["b"]), task("b")];
        let curr = vec![task("a"), task("b")];
        assert_eq!(ids(&diff(&prev, &curr).update), vec!["a"]);
    }

    #[test]
    fn sub_task_changes_propagate_to_parent() {
        let prev = vec![task("p").with_sub_tasks(vec![task("x"), task("y")])];
        let mut y = task("y");
        y.name = "y2".into();
        let curr = vec![task("p").with_sub_tasks(vec![y, task("z")])];

        let changes = diff(&prev, &curr);
        assert_eq!(ids(&changes.update), vec!["p", "y"]);
        assert_eq!(ids(&changes.remove), vec!["x"]);
        assert_eq!(ids(&changes.add), vec!["z"]);
        assert_eq!(changes.len(), 4);
    }

    #[test]
    fn retain_filters_every_list() {
        let mut changes = ChangeSet {
            add: vec![task("a"), task("b")],
            remove: vec![task("c")],
            update: vec![task("a2")],
        };
        changes.retain(|t| t.id.as_str().starts_with('a'));
        assert_eq!(ids(&changes.add), vec!["a"]);
        assert!(changes.remove.is_empty());
        assert_eq!(ids(&changes.update), vec!["a2"]);
    }
}
