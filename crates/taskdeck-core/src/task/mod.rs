//! Task domain module.
//!
//! Tasks on the task list/board. The server record shape lives in
//! [`crate::reconcile`].

mod model;

pub use model::{Priority, Task, TaskDraft, TaskPatch, TaskStatus};
