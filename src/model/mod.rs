pub mod diff;
pub mod forest;
pub mod item;
pub mod status;
pub mod task;
pub mod window;

pub use diff::{diff, ChangeSet};
pub use forest::Forest;
pub use item::{ItemData, UNGROUPED};
pub use status::Status;
pub use task::{Task, TaskId};
pub use window::TimelineWindow;
