use crate::model::TaskId;

/// Errors surfaced by the timeline when a snapshot or a configuration file
/// cannot be accepted. Missing geometry and lookup misses are not errors.
#[derive(Debug, thiserror::Error)]
pub enum TimelineError {
    /// The same id appears twice somewhere in the task tree.
    #[error("duplicate task id '{0}'")]
    DuplicateTaskId(TaskId),

    /// The `dependents` edges contain a cycle passing through `task`.
    #[error("dependency cycle through task '{task}'")]
    CyclicDependency { task: TaskId },

    #[error("invalid timeline configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TimelineError>;
