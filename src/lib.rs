//! Incremental reconciliation of hierarchical task-dependency timelines.
//!
//! A snapshot of a recursive task tree is diffed against the previous one and
//! the resulting change-set is applied to a flat rendering: timeline items,
//! dependency arrows and containers around expanded tasks. Expanding a task
//! replaces it by its sub-tasks and re-anchors its arrows on them; compressing
//! it reverses that.
//!
//! The timeline widget itself is a collaborator behind the traits in
//! [`view`]. [`view::memory::MemoryCanvas`] is a headless implementation.
//!
//! ```
//! use chrono::{Duration, Utc};
//! use timeline_dep_graph::model::{Status, Task};
//! use timeline_dep_graph::view::memory::MemoryCanvas;
//! use timeline_dep_graph::{Timeline, TimelineConfig};
//!
//! let now = Utc::now();
//! let build = Task::new("build", "Build", Status::Success)
//!     .with_times(Some(now - Duration::minutes(10)), Some(now - Duration::minutes(5)))
//!     .with_dependents(["test"]);
//! let test = Task::new("test", "Test", Status::Running)
//!     .with_times(Some(now - Duration::minutes(5)), None);
//!
//! let mut timeline = Timeline::new(MemoryCanvas::new(800.0, 400.0), TimelineConfig::default());
//! timeline.set_tasks(vec![build, test], now).unwrap();
//! assert_eq!(timeline.items().len(), 2);
//! assert_eq!(timeline.arrows().len(), 1);
//! ```

pub mod config;
pub mod error;
pub mod model;
pub mod timeline;
pub mod view;

pub use config::TimelineConfig;
pub use error::{Result, TimelineError};
pub use timeline::{ItemClick, TaskState, Timeline, TimelineEvent};
