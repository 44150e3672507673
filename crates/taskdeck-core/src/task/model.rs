//! Task domain model.
//!
//! This module contains the task shown on the task list/board in its canonical
//! client shape.

use crate::entity::{Entity, EntityId, EntityKind};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Where a task sits on the board.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not started yet.
    #[default]
    Todo,
    /// Being worked on.
    InProgress,
    /// Finished.
    Done,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: EntityId,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub category: Option<String>,
    pub due_date: Option<NaiveDate>,
}

/// Fields for a task created locally. New tasks always start as `Todo`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub category: Option<String>,
    pub due_date: Option<NaiveDate>,
}

impl TaskDraft {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Partial update of a task. `None` leaves a field unchanged.
///
/// `category` and `due_date` are optional on the task itself, so their patch
/// is doubly optional: `Some(None)` clears the field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub category: Option<Option<String>>,
    pub due_date: Option<Option<NaiveDate>>,
}

impl TaskPatch {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Sets the due date, or removes it with `None`.
    pub fn due_date(due_date: Option<NaiveDate>) -> Self {
        Self {
            due_date: Some(due_date),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl Entity for Task {
    type Draft = TaskDraft;
    type Patch = TaskPatch;

    const KIND: EntityKind = EntityKind::Task;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn from_draft(id: EntityId, draft: &TaskDraft) -> Self {
        Self {
            id,
            title: draft.title.clone(),
            description: draft.description.clone(),
            status: TaskStatus::Todo,
            priority: draft.priority,
            category: draft.category.clone(),
            due_date: draft.due_date,
        }
    }

    fn apply_patch(&mut self, patch: &TaskPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(category) = &patch.category {
            self.category = category.clone();
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
    }
}
