use std::collections::HashMap;

use super::task::{Task, TaskId};

/// An owned task snapshot with id → location and id → parent tables, so
/// lookups and ancestor walks do not rescan the tree.
///
/// A task's location is the sequence of child indices leading to it from the
/// top level. A repeated id is indexed once; snapshots accepted by the
/// timeline are validated beforehand.
#[derive(Debug, Clone, Default)]
pub struct Forest {
    tasks: Vec<Task>,
    locations: HashMap<TaskId, Vec<usize>>,
    parents: HashMap<TaskId, TaskId>,
}

impl Forest {
    pub fn new(tasks: Vec<Task>) -> Self {
        let mut locations = HashMap::new();
        let mut parents = HashMap::new();
        let mut stack: Vec<(&Task, Vec<usize>, Option<&TaskId>)> = tasks
            .iter()
            .enumerate()
            .map(|(i, t)| (t, vec![i], None))
            .collect();

        while let Some((task, path, parent)) = stack.pop() {
            if locations.contains_key(&task.id) {
                continue;
            }
            if let Some(parent) = parent {
                parents.insert(task.id.clone(), parent.clone());
            }
            for (i, sub) in task.sub_tasks.iter().enumerate() {
                let mut sub_path = path.clone();
                sub_path.push(i);
                stack.push((sub, sub_path, Some(&task.id)));
            }
            locations.insert(task.id.clone(), path);
        }

        Self {
            tasks,
            locations,
            parents,
        }
    }

    /// Top-level tasks.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Number of tasks at every depth.
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.locations.contains_key(id)
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        let path = self.locations.get(id)?;
        let (first, rest) = path.split_first()?;
        let mut task = self.tasks.get(*first)?;
        for &i in rest {
            task = task.sub_tasks.get(i)?;
        }
        Some(task)
    }

    /// The direct parent of `id`, if it is a sub-task.
    pub fn parent(&self, id: &TaskId) -> Option<&Task> {
        self.parents.get(id).and_then(|p| self.get(p))
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: &TaskId) -> Vec<&Task> {
        let mut out = Vec::new();
        let mut current = id;
        while let Some(parent_id) = self.parents.get(current) {
            match self.get(parent_id) {
                Some(parent) => out.push(parent),
                None => break,
            }
            current = parent_id;
        }
        out
    }

    pub fn into_tasks(self) -> Vec<Task> {
        self.tasks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Status;

    fn forest() -> Forest {
        Forest::new(vec![
            Task::new("1", "one", Status::Success),
            Task::new("2", "two", Status::Running).with_sub_tasks(vec![
                Task::new("2A", "two a", Status::Success),
                Task::new("2B", "two b", Status::Running)
                    .with_sub_tasks(vec![Task::new("2B1", "deep", Status::Running)]),
            ]),
        ])
    }

    #[test]
    fn indexes_every_depth() {
        let forest = forest();
        assert_eq!(forest.len(), 5);
        assert_eq!(forest.get(&"2B1".into()).map(|t| t.name.as_str()), Some("deep"));
        assert_eq!(forest.get(&"2A".into()).map(|t| t.name.as_str()), Some("two a"));
        assert!(forest.get(&"nope".into()).is_none());
    }

    #[test]
    fn parents_and_ancestors() {
        let forest = forest();
        assert_eq!(forest.parent(&"2B1".into()).map(|t| t.id.as_str()), Some("2B"));
        assert!(forest.parent(&"1".into()).is_none());
        let chain: Vec<&str> = forest
            .ancestors(&"2B1".into())
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(chain, vec!["2B", "2"]);
    }
}
