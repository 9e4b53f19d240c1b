use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::Status;
use super::task::{Task, TaskId};

/// Lane id used for every item while the timeline is not grouped.
pub const UNGROUPED: &str = "unGrouped";

const BASE_CLASS: &str = "transparent";
const POINTER_CLASS: &str = "tdg-pointer";
const HIGHLIGHT_CLASS: &str = "highlighted";

/// The flat, rendered representation of a visible task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemData {
    pub id: TaskId,
    pub name: String,
    pub status: Status,
    pub content: String,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub class_name: String,
    pub expandable: bool,
    pub group: String,
}

impl ItemData {
    /// Map a task to its item. Expandable tasks get a pointer cursor class.
    pub fn from_task(task: &Task, grouped: bool) -> Self {
        let mut class_name = BASE_CLASS.to_string();
        if task.is_expandable() {
            class_name.push(' ');
            class_name.push_str(POINTER_CLASS);
        }
        Self {
            id: task.id.clone(),
            name: task.name.clone(),
            status: task.status,
            content: task.name.clone(),
            start: task.start_time,
            end: task.finish_time,
            class_name,
            expandable: task.is_expandable(),
            group: group_for(task.status, grouped),
        }
    }

    pub fn set_grouped(&mut self, grouped: bool) {
        self.group = group_for(self.status, grouped);
    }

    pub fn is_highlighted(&self) -> bool {
        self.class_name.split(' ').any(|c| c == HIGHLIGHT_CLASS)
    }

    pub fn highlight(&mut self) {
        if !self.is_highlighted() {
            self.class_name.push(' ');
            self.class_name.push_str(HIGHLIGHT_CLASS);
        }
    }

    pub fn remove_highlight(&mut self) {
        self.class_name = self
            .class_name
            .split(' ')
            .filter(|c| *c != HIGHLIGHT_CLASS)
            .collect::<Vec<_>>()
            .join(" ");
    }
}

fn group_for(status: Status, grouped: bool) -> String {
    if grouped {
        status.as_str().to_string()
    } else {
        UNGROUPED.to_string()
    }
}

/// Distinct statuses among the given items.
pub fn used_statuses<'a>(items: impl IntoIterator<Item = &'a ItemData>) -> BTreeSet<Status> {
    items.into_iter().map(|item| item.status).collect()
}
