use std::collections::BTreeSet;

use tracing::debug;

use super::ItemSink;
use crate::model::{Status, Task, UNGROUPED};

const PADDING_PREFIX: &str = "tdg-group-padding-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneKind {
    /// Empty spacer lane above a labelled one.
    Padding,
    Label,
}

/// A horizontal lane of the timeline widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lane {
    pub id: String,
    pub content: String,
    pub kind: LaneKind,
    /// `None` for the single lane used while ungrouped.
    pub status: Option<Status>,
}

impl Lane {
    fn padding(key: &str, status: Option<Status>) -> Self {
        Self {
            id: format!("{PADDING_PREFIX}{key}"),
            content: String::new(),
            kind: LaneKind::Padding,
            status,
        }
    }

    fn label(key: &str, content: &str, status: Option<Status>) -> Self {
        Self {
            id: key.to_string(),
            content: content.to_string(),
            kind: LaneKind::Label,
            status,
        }
    }
}

/// Keeps the set of statuses in use and the lanes derived from it.
#[derive(Debug, Default)]
pub struct GroupingEngine {
    grouped: bool,
    used: BTreeSet<Status>,
}

impl GroupingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_grouped(&self) -> bool {
        self.grouped
    }

    /// Statuses in use, highest priority first.
    pub fn used_statuses(&self) -> &BTreeSet<Status> {
        &self.used
    }

    pub fn lanes(&self) -> Vec<Lane> {
        if !self.grouped {
            return vec![
                Lane::padding(UNGROUPED, None),
                Lane::label(UNGROUPED, "", None),
            ];
        }
        self.used
            .iter()
            .flat_map(|&status| {
                [
                    Lane::padding(status.as_str(), Some(status)),
                    Lane::label(status.as_str(), status.as_str(), Some(status)),
                ]
            })
            .collect()
    }

    pub fn group_by_status<S: ItemSink + ?Sized>(&mut self, sink: &mut S) {
        self.grouped = true;
        self.emit(sink);
    }

    pub fn ungroup<S: ItemSink + ?Sized>(&mut self, sink: &mut S) {
        self.grouped = false;
        self.emit(sink);
    }

    /// Replace the used set with the statuses of the visible items.
    pub fn on_visible_set_changed<S: ItemSink + ?Sized>(
        &mut self,
        sink: &mut S,
        statuses: BTreeSet<Status>,
    ) {
        if statuses == self.used {
            return;
        }
        self.used = statuses;
        if self.grouped {
            self.emit(sink);
        }
    }

    /// Add the statuses of newly shown tasks.
    pub fn add_groups<S: ItemSink + ?Sized>(&mut self, sink: &mut S, tasks: &[Task]) {
        let mut changed = false;
        for task in tasks {
            changed |= self.used.insert(task.status);
        }
        if changed && self.grouped {
            self.emit(sink);
        }
    }

    fn emit<S: ItemSink + ?Sized>(&self, sink: &mut S) {
        let lanes = self.lanes();
        debug!(grouped = self.grouped, lanes = lanes.len(), "lanes emitted");
        sink.set_groups(&lanes);
    }
}
