use super::ServerShape;
use crate::entity::EntityId;
use crate::error::{Result, SyncError};
use crate::task::{Priority, Task, TaskDraft, TaskPatch, TaskStatus};
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue, json};

/// A task as the server sends it (camelCase, loosely typed enums).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
}

fn canonical(value: &str) -> String {
    value
        .trim()
        .to_ascii_lowercase()
        .replace(['_', ' '], "-")
}

fn parse_status(value: &str) -> Result<TaskStatus> {
    match canonical(value).as_str() {
        "" | "todo" | "to-do" | "pending" | "open" => Ok(TaskStatus::Todo),
        "in-progress" | "inprogress" | "doing" => Ok(TaskStatus::InProgress),
        "done" | "completed" | "complete" => Ok(TaskStatus::Done),
        other => Err(SyncError::serialization(
            "task",
            format!("unknown task status '{other}'"),
        )),
    }
}

fn parse_priority(value: &str) -> Result<Priority> {
    match canonical(value).as_str() {
        "low" => Ok(Priority::Low),
        "" | "medium" | "normal" => Ok(Priority::Medium),
        "high" => Ok(Priority::High),
        other => Err(SyncError::serialization(
            "task",
            format!("unknown task priority '{other}'"),
        )),
    }
}

fn parse_due_date(value: Option<String>) -> Result<Option<NaiveDate>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(Some(date));
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| Some(dt.date_naive()))
        .map_err(|e| SyncError::serialization("task", format!("invalid due date '{value}': {e}")))
}

fn status_name(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Todo => "todo",
        TaskStatus::InProgress => "in-progress",
        TaskStatus::Done => "done",
    }
}

fn priority_name(priority: Priority) -> &'static str {
    match priority {
        Priority::Low => "low",
        Priority::Medium => "medium",
        Priority::High => "high",
    }
}

fn date_string(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

impl ServerShape for Task {
    type Record = TaskRecord;

    fn from_record(record: TaskRecord) -> Result<Self> {
        Ok(Self {
            id: EntityId::new(record.id),
            title: record.title,
            description: record.description,
            status: parse_status(&record.status)?,
            priority: parse_priority(&record.priority)?,
            category: record.category.filter(|c| !c.is_empty()),
            due_date: parse_due_date(record.due_date)?,
        })
    }

    fn draft_payload(draft: &TaskDraft) -> Result<JsonValue> {
        Ok(json!({
            "title": draft.title,
            "description": draft.description,
            "status": status_name(TaskStatus::Todo),
            "priority": priority_name(draft.priority),
            "category": draft.category,
            "dueDate": draft.due_date.map(date_string),
        }))
    }

    fn patch_payload(patch: &TaskPatch) -> Result<JsonValue> {
        let mut payload = Map::new();
        if let Some(title) = &patch.title {
            payload.insert("title".to_string(), json!(title));
        }
        if let Some(description) = &patch.description {
            payload.insert("description".to_string(), json!(description));
        }
        if let Some(status) = patch.status {
            payload.insert("status".to_string(), json!(status_name(status)));
        }
        if let Some(priority) = patch.priority {
            payload.insert("priority".to_string(), json!(priority_name(priority)));
        }
        // A cleared field goes out as null
        if let Some(category) = &patch.category {
            payload.insert("category".to_string(), json!(category));
        }
        if let Some(due_date) = patch.due_date {
            payload.insert("dueDate".to_string(), json!(due_date.map(date_string)));
        }
        Ok(JsonValue::Object(payload))
    }
}
