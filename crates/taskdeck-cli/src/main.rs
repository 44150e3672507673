use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use taskdeck_core::SyncConfig;
use taskdeck_infrastructure::{ConfigLoader, TaskdeckPaths};
use taskdeck_infrastructure::config_loader::apply_env_override;

mod commands;
mod logging;
mod session;

use commands::tasks::{CreateArgs, EditArgs, PriorityArg, StatusArg};
use session::Session;

#[derive(Parser)]
#[command(name = "taskdeck")]
#[command(about = "Taskdeck CLI - tasks and assistant conversations with optimistic sync", long_about = None)]
struct Cli {
    /// Config file (defaults to <config_dir>/taskdeck/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// API base URL, overriding config and TASKDECK_API_URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Log level used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Also write daily-rolling logs under <config_dir>/taskdeck/logs
    #[arg(long, global = true)]
    log_file: bool,

    /// Write the daily-rolling logs into this directory instead (implies --log-file)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assistant conversations
    Conversations {
        #[command(subcommand)]
        action: ConversationAction,
    },
    /// Tasks on the board
    Tasks {
        #[command(subcommand)]
        action: TaskAction,
    },
    /// Refetch periodically and report reloads until Ctrl-C
    Watch {
        /// Seconds between refetches (defaults to refresh.interval_secs)
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Run a walkthrough against an in-memory backend
    Demo,
}

#[derive(Subcommand)]
enum ConversationAction {
    /// List conversations
    List {
        #[arg(long)]
        json: bool,
    },
    /// Start a conversation
    Create {
        title: String,
        /// Opening user message
        #[arg(long)]
        message: Option<String>,
        /// Append instead of inserting at the top
        #[arg(long)]
        back: bool,
    },
    /// Toggle the star
    Favorite { id: String },
    /// Append a user message
    Send { id: String, message: String },
    /// Change the title
    Rename { id: String, title: String },
    /// Delete a conversation
    Delete { id: String },
}

#[derive(Subcommand)]
enum TaskAction {
    /// List tasks
    List {
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
        #[arg(long)]
        json: bool,
    },
    /// Create a task
    Create {
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, value_enum, default_value = "medium")]
        priority: PriorityArg,
        #[arg(long)]
        category: Option<String>,
        /// Due date as YYYY-MM-DD
        #[arg(long)]
        due: Option<String>,
    },
    /// Change task fields
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, value_enum)]
        priority: Option<PriorityArg>,
        #[arg(long, conflicts_with = "clear_category")]
        category: Option<String>,
        #[arg(long)]
        clear_category: bool,
        /// Due date as YYYY-MM-DD
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<String>,
        #[arg(long)]
        clear_due: bool,
    },
    /// Move a task to another column
    Status {
        id: String,
        #[arg(value_enum)]
        status: StatusArg,
    },
    /// Delete a task
    Delete { id: String },
}

/// An explicit directory wins; `--log-file` alone falls back to the default
/// log directory.
fn resolve_log_dir(log_dir: Option<PathBuf>, log_file: bool) -> Result<Option<PathBuf>> {
    match log_dir {
        Some(dir) => Ok(Some(dir)),
        None if log_file => Ok(Some(TaskdeckPaths::log_dir()?)),
        None => Ok(None),
    }
}

fn load_config(cli: &Cli) -> Result<SyncConfig> {
    let loader = match &cli.config {
        Some(path) => ConfigLoader::with_path(path),
        None => ConfigLoader::new_default()?,
    };
    let config = loader
        .load()
        .with_context(|| format!("failed to load {}", loader.path().display()))?;
    let config = apply_env_override(config, cli.api_url.clone());
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_dir = resolve_log_dir(cli.log_dir.clone(), cli.log_file)?;
    let _log_guard = logging::init(&cli.log_level, log_dir.as_deref())?;
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Conversations { action } => {
            let mut session = Session::connect(config)?;
            match action {
                ConversationAction::List { json } => {
                    commands::conversations::list(&session, json).await?
                }
                ConversationAction::Create {
                    title,
                    message,
                    back,
                } => commands::conversations::create(&mut session, title, message, back).await?,
                ConversationAction::Favorite { id } => {
                    commands::conversations::favorite(&mut session, id).await?
                }
                ConversationAction::Send { id, message } => {
                    commands::conversations::send(&mut session, id, message).await?
                }
                ConversationAction::Rename { id, title } => {
                    commands::conversations::rename(&mut session, id, title).await?
                }
                ConversationAction::Delete { id } => {
                    commands::conversations::delete(&mut session, id).await?
                }
            }
        }
        Commands::Tasks { action } => {
            let mut session = Session::connect(config)?;
            match action {
                TaskAction::List { status, json } => {
                    commands::tasks::list(&session, status, json).await?
                }
                TaskAction::Create {
                    title,
                    description,
                    priority,
                    category,
                    due,
                } => {
                    let args = CreateArgs {
                        title,
                        description,
                        priority,
                        category,
                        due,
                    };
                    commands::tasks::create(&mut session, args).await?
                }
                TaskAction::Edit {
                    id,
                    title,
                    description,
                    priority,
                    category,
                    clear_category,
                    due,
                    clear_due,
                } => {
                    let args = EditArgs {
                        title,
                        description,
                        priority,
                        category,
                        clear_category,
                        due,
                        clear_due,
                    };
                    commands::tasks::edit(&mut session, id, args).await?
                }
                TaskAction::Status { id, status } => {
                    commands::tasks::set_status(&mut session, id, status).await?
                }
                TaskAction::Delete { id } => commands::tasks::delete(&mut session, id).await?,
            }
        }
        Commands::Watch { interval } => {
            let session = Session::connect(config)?;
            commands::watch::run(&session, interval).await?
        }
        Commands::Demo => commands::demo::run(config).await?,
    }

    Ok(())
}
