use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a task. Declaration order is display priority: `Failed` is the
/// most important and is listed first when items are grouped by status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Failed,
    Blocked,
    Unknown,
    Running,
    Success,
}

impl Status {
    /// Every status in priority order.
    pub const ALL: [Status; 5] = [
        Status::Failed,
        Status::Blocked,
        Status::Unknown,
        Status::Running,
        Status::Success,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Failed => "failed",
            Status::Blocked => "blocked",
            Status::Unknown => "unknown",
            Status::Running => "running",
            Status::Success => "success",
        }
    }

    /// Style class used by collaborators to colour items and containers.
    pub fn class_name(self) -> String {
        format!("tdg-{}", self.as_str())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
