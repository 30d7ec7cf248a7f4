//! `taskdeck` — persisted task list with deadline reminders.
//!
//! ```bash
//! # Add a task due this evening
//! taskdeck add "Buy milk" --deadline "2026-08-07 18:00" --priority High
//!
//! # List pending work, nearest deadline first
//! taskdeck list
//!
//! # Run the reminder loop in the foreground
//! taskdeck watch
//!
//! # Or via environment variables
//! TASKDECK_DATA_FILE=/tmp/tasks.json taskdeck list
//! ```

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;

use taskdeck::config::{AppConfig, ConfigOverrides};
use taskdeck::export;
use taskdeck::query::{self, SortKey};
use taskdeck::reminder::{NotificationSink, ReminderScheduler};
use taskdeck::store::{StoreError, TaskPatch, TaskStore};
use taskdeck::task::{Deadline, Priority, Task, TaskId};

/// CLI arguments parsed by clap.
#[derive(Parser, Debug)]
#[command(version, about = "Persisted task list with deadline reminders")]
struct Cli {
    /// Path to the task data file (default: `~/.local/share/taskdeck/tasks.json`).
    #[arg(long, env = "TASKDECK_DATA_FILE", global = true)]
    data_file: Option<PathBuf>,

    /// Path to config file (default: `~/.config/taskdeck/config.toml`).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "warn", env = "TASKDECK_LOG", global = true)]
    log_level: String,

    /// Path to log file (default: stderr).
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add a new task.
    Add {
        /// Task title.
        title: String,
        /// Deadline in `YYYY-MM-DD HH:MM` (local time).
        #[arg(long)]
        deadline: Option<Deadline>,
        /// Task priority.
        #[arg(long, default_value_t = Priority::Medium)]
        priority: Priority,
        /// Free-form notes.
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// List tasks: pending first, nearest deadline first.
    List {
        /// Case-insensitive substring filter over title and notes.
        #[arg(long)]
        search: Option<String>,
        /// Sort key: title, deadline, priority, or completed.
        #[arg(long)]
        sort: Option<SortKey>,
    },
    /// Show a single task in full.
    Show {
        /// Task id.
        id: TaskId,
    },
    /// Edit fields of an existing task.
    ///
    /// Changing the deadline re-arms the task's reminder.
    Edit {
        /// Task id.
        id: TaskId,
        /// New title.
        #[arg(long)]
        title: Option<String>,
        /// New deadline in `YYYY-MM-DD HH:MM`, or an empty string to clear it.
        #[arg(long)]
        deadline: Option<String>,
        /// New priority.
        #[arg(long)]
        priority: Option<Priority>,
        /// New notes.
        #[arg(long)]
        notes: Option<String>,
    },
    /// Mark a task completed.
    Complete {
        /// Task id.
        id: TaskId,
    },
    /// Reopen a completed task.
    Reopen {
        /// Task id.
        id: TaskId,
    },
    /// Delete a task.
    Delete {
        /// Task id.
        id: TaskId,
    },
    /// Export all tasks as CSV to stdout or a file.
    Export {
        /// Output file (default: stdout).
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Run the reminder loop in the foreground until Ctrl-C.
    Watch {
        /// Poll interval override, in seconds.
        #[arg(long)]
        poll_interval_secs: Option<u64>,
        /// Lookahead window override, in seconds.
        #[arg(long)]
        lookahead_secs: Option<u64>,
    },
}

/// Errors surfaced to the user by the CLI layer.
#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    let overrides = ConfigOverrides {
        config_path: cli.config.clone(),
        data_file: cli.data_file.clone(),
        ..ConfigOverrides::default()
    };
    let config = match AppConfig::load(&overrides) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    let store = match TaskStore::open(&config.data_file) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            eprintln!("Error opening task store: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(cli.command, store, &config).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Initialize logging to stderr, or to a file when `--log-file` is
/// given (the returned guard must be held until shutdown so buffered
/// entries are flushed).
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    if let Some(log_path) = file_path {
        let log_dir = log_path.parent()?;
        let file_name = log_path.file_name()?.to_str()?;
        let file_appender = tracing_appender::rolling::never(log_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        tracing_subscriber::fmt()
            .with_writer(non_blocking)
            .with_env_filter(env_filter)
            .with_ansi(false)
            .init();
        Some(guard)
    } else {
        tracing_subscriber::fmt()
            .with_writer(io::stderr)
            .with_env_filter(env_filter)
            .init();
        None
    }
}

/// Dispatches one subcommand against the store.
async fn run(command: Command, store: Arc<TaskStore>, config: &AppConfig) -> Result<(), CliError> {
    match command {
        Command::Add {
            title,
            deadline,
            priority,
            notes,
        } => {
            let task = store.add(&title, deadline, priority, &notes)?;
            println!("Added task {}: {}", task.id, task.title);
        }
        Command::List { search, sort } => {
            let snapshot = store.all();
            let filtered = match search {
                Some(q) => query::search(&snapshot, &q),
                None => snapshot,
            };
            let ordered = match sort {
                Some(key) => query::sort_by(&filtered, key),
                None => query::default_view(&filtered),
            };
            print_task_table(&ordered);
        }
        Command::Show { id } => {
            let task = store
                .all()
                .into_iter()
                .find(|t| t.id == id)
                .ok_or(StoreError::NotFound(id))?;
            print_task_details(&task);
        }
        Command::Edit {
            id,
            title,
            deadline,
            priority,
            notes,
        } => {
            let deadline = match deadline {
                None => None,
                Some(s) if s.trim().is_empty() => Some(None),
                Some(s) => Some(Some(s.parse::<Deadline>().map_err(StoreError::from)?)),
            };
            // Editing the deadline makes the task eligible for a fresh
            // reminder; the store leaves that decision to its callers.
            let reminded = deadline.as_ref().map(|_| false);
            let patch = TaskPatch {
                title,
                deadline,
                priority,
                notes,
                completed: None,
                reminded,
            };
            let task = store.update(id, patch)?;
            println!("Updated task {}: {}", task.id, task.title);
        }
        Command::Complete { id } => {
            let task = store.update(
                id,
                TaskPatch {
                    completed: Some(true),
                    ..TaskPatch::default()
                },
            )?;
            println!("Completed task {}: {}", task.id, task.title);
        }
        Command::Reopen { id } => {
            let task = store.update(
                id,
                TaskPatch {
                    completed: Some(false),
                    ..TaskPatch::default()
                },
            )?;
            println!("Reopened task {}: {}", task.id, task.title);
        }
        Command::Delete { id } => {
            if store.delete(id)? {
                println!("Deleted task {id}");
            } else {
                println!("Task {id} not found (nothing to delete)");
            }
        }
        Command::Export { output } => {
            let tasks = store.all();
            match output {
                Some(path) => {
                    let file = std::fs::File::create(&path)?;
                    export::write_csv(io::BufWriter::new(file), &tasks)?;
                    println!("Exported {} task(s) to {}", tasks.len(), path.display());
                }
                None => export::write_csv(io::stdout().lock(), &tasks)?,
            }
        }
        Command::Watch {
            poll_interval_secs,
            lookahead_secs,
        } => {
            let mut reminder_config = config.reminder();
            if let Some(secs) = poll_interval_secs {
                reminder_config.poll_interval = std::time::Duration::from_secs(secs);
            }
            if let Some(secs) = lookahead_secs {
                reminder_config.lookahead = std::time::Duration::from_secs(secs);
            }
            let poll_secs = reminder_config.poll_interval.as_secs();

            let scheduler =
                ReminderScheduler::new(store, Arc::new(TerminalSink), reminder_config);
            scheduler.start();
            println!("Watching for due tasks (poll every {poll_secs}s, Ctrl-C to stop)");

            tokio::signal::ctrl_c().await?;
            scheduler.stop().await;
            println!("Stopped.");
        }
    }
    Ok(())
}

/// Notification sink that prints to the terminal.
struct TerminalSink;

impl NotificationSink for TerminalSink {
    fn notify(&self, title: &str, message: &str) {
        println!("[{title}] {message}");
        let _ = io::stdout().flush();
        tracing::info!(title, message, "reminder delivered");
    }
}

/// Prints the snapshot as an aligned table.
fn print_task_table(tasks: &[Task]) {
    if tasks.is_empty() {
        println!("No tasks.");
        return;
    }
    println!(
        "{:<18} {:<40} {:<17} {:<8} STATUS",
        "ID", "TITLE", "DEADLINE", "PRIORITY"
    );
    for task in tasks {
        let id = task.id.to_string();
        let deadline = task.deadline.map(|d| d.to_string()).unwrap_or_default();
        let priority = task.priority.to_string();
        let status = if task.completed { "Done" } else { "Pending" };
        println!(
            "{id:<18} {:<40} {deadline:<17} {priority:<8} {status}",
            truncate(&task.title, 40)
        );
    }
}

/// Prints every field of one task.
fn print_task_details(task: &Task) {
    println!("ID:       {}", task.id);
    println!("Title:    {}", task.title);
    println!(
        "Deadline: {}",
        task.deadline
            .map_or_else(|| "(none)".to_string(), |d| d.to_string())
    );
    println!("Priority: {}", task.priority);
    println!("Status:   {}", if task.completed { "Done" } else { "Pending" });
    println!("Reminded: {}", if task.reminded { "yes" } else { "no" });
    if !task.notes.is_empty() {
        println!("Notes:    {}", task.notes);
    }
}

/// Shortens a string to `max` characters for table display.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{head}…")
    }
}
