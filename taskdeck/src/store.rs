//! Durable task storage with synchronous, atomic persistence.
//!
//! [`TaskStore`] is the sole owner of the task collection and its
//! backing JSON file. All mutating operations take an exclusive lock,
//! apply the change in memory, and persist the whole collection before
//! returning; the lock is never held across anything but the in-memory
//! mutation and the file write. Readers get independent snapshots via
//! [`all`](TaskStore::all), so a concurrently polling scheduler never
//! observes a half-applied mutation.
//!
//! Persistence is atomic-replace: the collection is written to a
//! sibling temporary file and renamed over the durable file, so a
//! crash mid-write can never leave a torn document behind.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

use crate::task::{Deadline, DeadlineParseError, Priority, Task, TaskId};

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Task title cannot be empty.
    #[error("task title cannot be empty")]
    EmptyTitle,

    /// A deadline string failed to parse at the boundary.
    #[error(transparent)]
    InvalidDeadline(#[from] DeadlineParseError),

    /// Task with the given id was not found.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// Reading or writing the task file failed.
    ///
    /// Raised for genuine I/O problems (permissions, disk full). A
    /// missing file on load is not an error, and a corrupt file is
    /// recovered internally by backing it up.
    #[error("failed to access task file {path}: {source}")]
    Io {
        /// Path that was being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The task collection could not be encoded as JSON.
    #[error("failed to encode task collection: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A partial update to a task.
///
/// Each field is `Option`: `None` leaves the current value untouched.
/// `deadline` is doubly optional so "clear the deadline" is
/// expressible as `Some(None)`.
///
/// The store applies exactly what the patch says. In particular it
/// does not reset `reminded` when `deadline` changes; a caller editing
/// the deadline must set `reminded: Some(false)` in the same patch if
/// the task should become eligible for a fresh reminder.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    /// New title (validated non-empty).
    pub title: Option<String>,
    /// New deadline; `Some(None)` clears it.
    pub deadline: Option<Option<Deadline>>,
    /// New priority.
    pub priority: Option<Priority>,
    /// New notes.
    pub notes: Option<String>,
    /// New completion state.
    pub completed: Option<bool>,
    /// New reminded state.
    pub reminded: Option<bool>,
}

/// State guarded by the store's exclusive lock.
struct Inner {
    tasks: Vec<Task>,
    /// Highest id ever issued or loaded; new ids are fenced past it.
    last_id: u64,
}

/// Durable, lock-guarded task collection.
pub struct TaskStore {
    path: PathBuf,
    inner: Mutex<Inner>,
}

impl TaskStore {
    /// Opens the store backed by `path`, loading any existing collection.
    ///
    /// A missing file is the normal first-run case and yields an empty
    /// store. A file that exists but is not a valid task document is
    /// renamed to a `.bak.json` sibling and the store starts empty, so
    /// one bad write never bricks startup.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the file or its parent directory
    /// cannot be accessed for reasons other than absence (permissions,
    /// hardware, ...). Corruption is recovered, not surfaced.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let tasks = load_tasks(&path)?;
        let last_id = tasks.iter().map(|t| t.id.as_u64()).max().unwrap_or(0);
        tracing::debug!(path = %path.display(), count = tasks.len(), "task store opened");
        Ok(Self {
            path,
            inner: Mutex::new(Inner { tasks, last_id }),
        })
    }

    /// Returns the path of the durable file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates a task and persists the collection.
    ///
    /// The title is trimmed and must be non-empty afterwards. The
    /// deadline, if any, arrives already parsed as a [`Deadline`], so
    /// malformed values cannot reach this point.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::EmptyTitle`] for a blank title, or
    /// [`StoreError::Io`] / [`StoreError::Encode`] if persistence
    /// fails (in which case the in-memory collection is unchanged).
    pub fn add(
        &self,
        title: &str,
        deadline: Option<Deadline>,
        priority: Priority,
        notes: &str,
    ) -> Result<Task, StoreError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(StoreError::EmptyTitle);
        }

        let mut inner = self.inner.lock();
        let task = Task {
            id: next_id(&mut inner),
            title: title.to_string(),
            deadline,
            priority,
            notes: notes.to_string(),
            completed: false,
            reminded: false,
            extra: serde_json::Map::new(),
        };
        inner.tasks.push(task.clone());
        if let Err(e) = self.persist(&inner.tasks) {
            inner.tasks.pop();
            return Err(e);
        }
        tracing::info!(id = %task.id, title = %task.title, "task added");
        Ok(task)
    }

    /// Applies a partial update to the task with the given id and
    /// persists the collection.
    ///
    /// Only fields present in the patch are touched; a failed persist
    /// rolls the in-memory task back, so the update is never partially
    /// applied.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown id,
    /// [`StoreError::EmptyTitle`] if the patch carries a blank title,
    /// or a persistence error.
    pub fn update(&self, id: TaskId, patch: TaskPatch) -> Result<Task, StoreError> {
        if let Some(title) = &patch.title
            && title.trim().is_empty()
        {
            return Err(StoreError::EmptyTitle);
        }

        let mut inner = self.inner.lock();
        let idx = inner
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or(StoreError::NotFound(id))?;
        let original = inner.tasks[idx].clone();

        {
            let task = &mut inner.tasks[idx];
            if let Some(title) = patch.title {
                task.title = title.trim().to_string();
            }
            if let Some(deadline) = patch.deadline {
                task.deadline = deadline;
            }
            if let Some(priority) = patch.priority {
                task.priority = priority;
            }
            if let Some(notes) = patch.notes {
                task.notes = notes;
            }
            if let Some(completed) = patch.completed {
                task.completed = completed;
            }
            if let Some(reminded) = patch.reminded {
                task.reminded = reminded;
            }
        }

        if let Err(e) = self.persist(&inner.tasks) {
            inner.tasks[idx] = original;
            return Err(e);
        }
        let updated = inner.tasks[idx].clone();
        tracing::debug!(id = %id, "task updated");
        Ok(updated)
    }

    /// Deletes the task with the given id, if present.
    ///
    /// Returns whether a task was removed. Deleting an absent id is an
    /// idempotent no-op that does not touch the durable file.
    ///
    /// # Errors
    ///
    /// Returns a persistence error; the removed task is restored in
    /// memory if the write fails.
    pub fn delete(&self, id: TaskId) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock();
        let Some(idx) = inner.tasks.iter().position(|t| t.id == id) else {
            return Ok(false);
        };
        let removed = inner.tasks.remove(idx);
        if let Err(e) = self.persist(&inner.tasks) {
            inner.tasks.insert(idx, removed);
            return Err(e);
        }
        tracing::info!(id = %id, "task deleted");
        Ok(true)
    }

    /// Marks a task as reminded.
    ///
    /// This is the only mutation the reminder scheduler performs.
    /// Returns `true` if the flag transitioned false→true (and was
    /// persisted); `false` if the task is absent or already reminded.
    ///
    /// # Errors
    ///
    /// Returns a persistence error; the flag is rolled back in memory
    /// if the write fails.
    pub fn mark_reminded(&self, id: TaskId) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock();
        let Some(idx) = inner.tasks.iter().position(|t| t.id == id) else {
            return Ok(false);
        };
        if inner.tasks[idx].reminded {
            return Ok(false);
        }
        inner.tasks[idx].reminded = true;
        if let Err(e) = self.persist(&inner.tasks) {
            inner.tasks[idx].reminded = false;
            return Err(e);
        }
        tracing::debug!(id = %id, "task marked reminded");
        Ok(true)
    }

    /// Returns an independent snapshot of the collection, in insertion
    /// order. The snapshot is taken under the store lock and is immune
    /// to concurrent mutation.
    #[must_use]
    pub fn all(&self) -> Vec<Task> {
        self.inner.lock().tasks.clone()
    }

    /// Returns the number of tasks in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().tasks.len()
    }

    /// Returns whether the store holds no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().tasks.is_empty()
    }

    /// Writes the collection to a sibling temp file and renames it over
    /// the durable file. Called with the store lock held.
    fn persist(&self, tasks: &[Task]) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(tasks)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

/// Issues the next task id: a microsecond clock reading, fenced past
/// the last issued id so bursts within the same tick stay unique.
fn next_id(inner: &mut Inner) -> TaskId {
    let now_micros = u64::try_from(
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_micros(),
    )
    .unwrap_or(u64::MAX);
    let id = now_micros.max(inner.last_id.saturating_add(1));
    inner.last_id = id;
    TaskId::new(id)
}

/// Loads the task collection from `path`, distinguishing the three
/// load outcomes: absent (empty store), corrupt (backed up, empty
/// store), and I/O failure (surfaced).
fn load_tasks(path: &Path) -> Result<Vec<Task>, StoreError> {
    let contents = match fs::read(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no task file, starting empty");
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    match serde_json::from_slice(&contents) {
        Ok(tasks) => Ok(tasks),
        Err(e) => {
            let backup = backup_path(path);
            tracing::warn!(
                path = %path.display(),
                backup = %backup.display(),
                error = %e,
                "task file is not valid, backing it up and starting empty"
            );
            fs::rename(path, &backup).map_err(|source| StoreError::Io {
                path: backup.clone(),
                source,
            })?;
            Ok(Vec::new())
        }
    }
}

/// Backup location for a corrupt task file: `tasks.json` → `tasks.bak.json`.
fn backup_path(path: &Path) -> PathBuf {
    path.with_extension("bak.json")
}
