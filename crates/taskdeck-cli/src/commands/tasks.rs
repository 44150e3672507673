use crate::session::Session;
use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::ValueEnum;
use taskdeck_core::EntityId;
use taskdeck_core::task::{Priority, Task, TaskDraft, TaskPatch, TaskStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    Todo,
    InProgress,
    Done,
}

impl From<StatusArg> for TaskStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Todo => TaskStatus::Todo,
            StatusArg::InProgress => TaskStatus::InProgress,
            StatusArg::Done => TaskStatus::Done,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PriorityArg {
    Low,
    Medium,
    High,
}

impl From<PriorityArg> for Priority {
    fn from(arg: PriorityArg) -> Self {
        match arg {
            PriorityArg::Low => Priority::Low,
            PriorityArg::Medium => Priority::Medium,
            PriorityArg::High => Priority::High,
        }
    }
}

fn status_label(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Todo => "todo",
        TaskStatus::InProgress => "in progress",
        TaskStatus::Done => "done",
    }
}

pub fn print_list(tasks: &[Task], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(tasks)?);
        return Ok(());
    }
    if tasks.is_empty() {
        println!("No tasks.");
        return Ok(());
    }
    for task in tasks {
        let due = task
            .due_date
            .map(|date| format!(" due {date}"))
            .unwrap_or_default();
        println!(
            "{:<16} [{:<11}] {:?} {}{}",
            task.id.as_str(),
            status_label(task.status),
            task.priority,
            task.title,
            due
        );
    }
    Ok(())
}

pub async fn list(session: &Session, status: Option<StatusArg>, json: bool) -> Result<()> {
    session.load().await?;
    let mut tasks = session.client.tasks().get_all();
    if let Some(status) = status {
        let status = TaskStatus::from(status);
        tasks.retain(|task| task.status == status);
    }
    print_list(&tasks, json)
}

pub struct CreateArgs {
    pub title: String,
    pub description: Option<String>,
    pub priority: PriorityArg,
    pub category: Option<String>,
    pub due: Option<String>,
}

fn parse_due(due: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(due, "%Y-%m-%d")
        .with_context(|| format!("invalid due date '{due}', expected YYYY-MM-DD"))
}

pub async fn create(session: &mut Session, args: CreateArgs) -> Result<()> {
    let due_date = args.due.as_deref().map(parse_due).transpose()?;
    let draft = TaskDraft {
        title: args.title,
        description: args.description.unwrap_or_default(),
        priority: args.priority.into(),
        category: args.category,
        due_date,
    };
    let handle = session.client.tasks().create_optimistic(draft, false)?;
    let id = session.settle(handle).await?;
    println!("{id}");
    Ok(())
}

pub struct EditArgs {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<PriorityArg>,
    pub category: Option<String>,
    pub clear_category: bool,
    pub due: Option<String>,
    pub clear_due: bool,
}

impl EditArgs {
    fn into_patch(self) -> Result<TaskPatch> {
        let category = if self.clear_category {
            Some(None)
        } else {
            self.category.map(Some)
        };
        let due_date = if self.clear_due {
            Some(None)
        } else {
            self.due.as_deref().map(parse_due).transpose()?.map(Some)
        };
        Ok(TaskPatch {
            title: self.title,
            description: self.description,
            priority: self.priority.map(Priority::from),
            category,
            due_date,
            ..TaskPatch::default()
        })
    }
}

pub async fn edit(session: &mut Session, id: String, args: EditArgs) -> Result<()> {
    let patch = args.into_patch()?;
    if patch.is_empty() {
        bail!("nothing to change; pass at least one field");
    }
    session.load().await?;
    let handle = session.client.tasks().update_optimistic(&EntityId::new(id), patch)?;
    session.settle(handle).await?;
    Ok(())
}

pub async fn set_status(session: &mut Session, id: String, status: StatusArg) -> Result<()> {
    session.load().await?;
    let handle = session
        .client
        .set_task_status(&EntityId::new(id), status.into())?;
    session.settle(handle).await?;
    Ok(())
}

pub async fn delete(session: &mut Session, id: String) -> Result<()> {
    session.load().await?;
    let handle = session.client.tasks().delete_optimistic(&EntityId::new(id))?;
    session.settle(handle).await?;
    Ok(())
}
