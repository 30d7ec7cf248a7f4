//! Background reminder scheduling over the task store.
//!
//! [`ReminderScheduler`] runs a polling loop on the tokio runtime.
//! Each pass takes a snapshot of the store, finds uncompleted,
//! un-reminded tasks whose deadline falls inside the lookahead window,
//! marks them reminded, and hands the notifications to a
//! [`NotificationSink`] off the polling task.
//!
//! Marking happens **before** dispatch: if the process dies between
//! the two, the next run stays silent for that task. At-most-once
//! delivery is the chosen guarantee, never a duplicate.
//!
//! Tasks whose deadline has already slipped past the window by the
//! time they are first observed are left alone; the window is a
//! proximity check, not a catch-up mechanism.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::store::TaskStore;
use crate::task::{Deadline, TaskId};

/// Destination for reminder notifications.
///
/// Implementations must be callable from outside the scheduler's own
/// task (dispatch happens on a blocking worker) and must absorb their
/// own failures; nothing propagates back into the poll loop.
pub trait NotificationSink: Send + Sync {
    /// Delivers one notification.
    fn notify(&self, title: &str, message: &str);
}

/// Default pause between poll passes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Default window before a deadline in which a reminder fires.
pub const DEFAULT_LOOKAHEAD: Duration = Duration::from_secs(60);

/// Timing configuration for the scheduler.
#[derive(Debug, Clone)]
pub struct ReminderConfig {
    /// Pause between poll passes.
    pub poll_interval: Duration,
    /// How far before its deadline a task becomes due for a reminder.
    pub lookahead: Duration,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            lookahead: DEFAULT_LOOKAHEAD,
        }
    }
}

/// A reminder owed to the user, produced by [`poll_once`] after the
/// task has been marked reminded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    /// The task this reminder is for.
    pub task_id: TaskId,
    /// Notification title, e.g. `Task due: Buy milk`.
    pub title: String,
    /// Notification body, e.g. `Due in 1 minute(s): Buy milk`.
    pub message: String,
}

/// Handle to the running poll loop.
struct RunningLoop {
    shutdown_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

/// Background loop that fires each task's deadline reminder at most once.
///
/// State machine: Stopped → Running → Stopped. [`start`](Self::start)
/// while running and [`stop`](Self::stop) while stopped are no-ops.
pub struct ReminderScheduler {
    store: Arc<TaskStore>,
    sink: Arc<dyn NotificationSink>,
    config: ReminderConfig,
    running: Mutex<Option<RunningLoop>>,
}

impl ReminderScheduler {
    /// Creates a scheduler over the given store and sink. The loop does
    /// not run until [`start`](Self::start) is called.
    #[must_use]
    pub fn new(
        store: Arc<TaskStore>,
        sink: Arc<dyn NotificationSink>,
        config: ReminderConfig,
    ) -> Self {
        Self {
            store,
            sink,
            config,
            running: Mutex::new(None),
        }
    }

    /// Starts the poll loop on the tokio runtime. No-op if already
    /// running.
    pub fn start(&self) {
        let mut running = self.running.lock();
        if running.is_some() {
            tracing::debug!("reminder scheduler already running");
            return;
        }

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let store = Arc::clone(&self.store);
        let sink = Arc::clone(&self.sink);
        let config = self.config.clone();

        let handle = tokio::spawn(async move {
            tracing::info!(
                poll_secs = config.poll_interval.as_secs(),
                lookahead_secs = config.lookahead.as_secs(),
                "reminder scheduler started"
            );
            loop {
                // A stop signaled during the previous pass is observed
                // here, before any new scan begins.
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let now = Local::now().naive_local();
                for reminder in poll_once(&store, config.lookahead, now) {
                    dispatch(Arc::clone(&sink), reminder);
                }

                tokio::select! {
                    () = tokio::time::sleep(config.poll_interval) => {}
                    _ = shutdown_rx.recv() => break,
                }
            }
            tracing::info!("reminder scheduler stopped");
        });

        *running = Some(RunningLoop {
            shutdown_tx,
            handle,
        });
    }

    /// Signals the loop to exit after its current pass and waits for it
    /// to finish. Completes within one poll interval because the
    /// inter-poll wait is interruptible. No-op if already stopped.
    pub async fn stop(&self) {
        let taken = self.running.lock().take();
        let Some(running) = taken else {
            tracing::debug!("reminder scheduler already stopped");
            return;
        };
        let _ = running.shutdown_tx.send(()).await;
        if let Err(e) = running.handle.await {
            tracing::warn!(error = %e, "reminder loop task failed");
        }
    }

    /// Returns whether the poll loop is currently running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }
}

/// Runs a single poll pass at the given wall-clock instant.
///
/// Every uncompleted, un-reminded task whose deadline lies within
/// `[now, now + lookahead]` is marked reminded in the store and
/// returned as a [`Reminder`] for dispatch. A failure on one task is
/// logged and skipped; the rest of the snapshot is still scanned.
pub fn poll_once(store: &TaskStore, lookahead: Duration, now: NaiveDateTime) -> Vec<Reminder> {
    let mut due = Vec::new();
    for task in store.all() {
        if task.completed || task.reminded {
            continue;
        }
        let Some(deadline) = task.deadline else {
            continue;
        };
        let Some(message) = due_message(&task.title, deadline, now, lookahead) else {
            continue;
        };

        // Mark first: a crash between marking and notifying suppresses
        // a duplicate on the next pass instead of firing twice.
        match store.mark_reminded(task.id) {
            Ok(true) => due.push(Reminder {
                task_id: task.id,
                title: format!("Task due: {}", task.title),
                message,
            }),
            // Another pass won the race, or the task was deleted meanwhile.
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(id = %task.id, error = %e, "could not mark task reminded, skipping");
            }
        }
    }
    due
}

/// Returns the notification body if `deadline` is inside the lookahead
/// window at `now`, distinguishing "due now" from "due in N minutes".
fn due_message(
    title: &str,
    deadline: Deadline,
    now: NaiveDateTime,
    lookahead: Duration,
) -> Option<String> {
    let window = chrono::Duration::from_std(lookahead).ok()?;
    let due_in = deadline.as_naive().signed_duration_since(now);
    if due_in < chrono::Duration::zero() || due_in > window {
        return None;
    }
    let minutes_left = due_in.num_minutes();
    if minutes_left <= 0 {
        Some(format!("Due now: {title}"))
    } else {
        Some(format!("Due in {minutes_left} minute(s): {title}"))
    }
}

/// Hands one reminder to the sink on a blocking worker, so a slow or
/// blocking sink never stalls the poll loop and no store lock is held
/// across the call.
fn dispatch(sink: Arc<dyn NotificationSink>, reminder: Reminder) {
    drop(tokio::task::spawn_blocking(move || {
        sink.notify(&reminder.title, &reminder.message);
    }));
}
