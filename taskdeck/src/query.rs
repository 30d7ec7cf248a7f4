//! Pure query and ordering functions over task snapshots.
//!
//! Everything here is side-effect-free: functions take a snapshot
//! slice (from [`TaskStore::all`](crate::store::TaskStore::all)) and
//! return a new sequence. All sorts are stable, so ties preserve the
//! input order.

use std::str::FromStr;

use crate::task::{Deadline, Priority, Task};

/// Keys supported by [`sort_by`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Case-insensitive lexicographic title order.
    Title,
    /// Ascending deadline; tasks without a deadline sort last.
    Deadline,
    /// Priority rank: High, then Medium, then Low.
    Priority,
    /// Pending tasks before completed ones.
    Completed,
}

/// Error returned for an unrecognized sort key name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sort key {0:?} (expected title, deadline, priority, or completed)")]
pub struct SortKeyParseError(String);

impl FromStr for SortKey {
    type Err = SortKeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "title" => Ok(Self::Title),
            "deadline" => Ok(Self::Deadline),
            "priority" => Ok(Self::Priority),
            "completed" => Ok(Self::Completed),
            _ => Err(SortKeyParseError(s.to_string())),
        }
    }
}

/// Case-insensitive substring search over title and notes.
///
/// An empty or whitespace-only query returns the snapshot unchanged,
/// in order.
#[must_use]
pub fn search(tasks: &[Task], query: &str) -> Vec<Task> {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return tasks.to_vec();
    }
    tasks
        .iter()
        .filter(|t| t.title.to_lowercase().contains(&q) || t.notes.to_lowercase().contains(&q))
        .cloned()
        .collect()
}

/// Returns the snapshot reordered by the given key (stable).
#[must_use]
pub fn sort_by(tasks: &[Task], key: SortKey) -> Vec<Task> {
    let mut sorted = tasks.to_vec();
    match key {
        SortKey::Title => sorted.sort_by_cached_key(|t| t.title.to_lowercase()),
        SortKey::Deadline => sorted.sort_by_key(deadline_key),
        SortKey::Priority => sorted.sort_by_key(|t| t.priority),
        SortKey::Completed => sorted.sort_by_key(|t| t.completed),
    }
    sorted
}

/// Composite display ordering: pending before completed, then by
/// ascending deadline (missing deadline last), ties broken by
/// priority rank.
#[must_use]
pub fn default_view(tasks: &[Task]) -> Vec<Task> {
    let mut sorted = tasks.to_vec();
    sorted.sort_by_key(|t| (t.completed, deadline_key(t), t.priority));
    sorted
}

/// Sort key placing missing deadlines after every present one.
fn deadline_key(t: &Task) -> (bool, Option<Deadline>) {
    (t.deadline.is_none(), t.deadline)
}
