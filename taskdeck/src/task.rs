//! Core task model for `taskdeck`.
//!
//! Defines the fixed-shape [`Task`] record, its [`TaskId`], [`Priority`],
//! and [`Deadline`] field types, and their durable JSON representation.
//! Malformed deadlines and priorities are rejected here, at the type
//! boundary, so they can never reach the store.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Fixed deadline format: local wall-clock, minute precision.
pub const DEADLINE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Unique identifier for a task.
///
/// Ids are assigned by the store from a high-resolution clock reading,
/// bumped past the last issued id so rapid successive creation never
/// produces a collision. Immutable after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(u64);

impl TaskId {
    /// Creates a `TaskId` from a raw integer value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw integer value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// Task priority.
///
/// Declaration order doubles as display rank: `High` sorts before
/// `Medium`, which sorts before `Low`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Priority {
    /// Needs attention first.
    High,
    /// The default for new tasks.
    #[default]
    Medium,
    /// Can wait.
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => write!(f, "High"),
            Self::Medium => write!(f, "Medium"),
            Self::Low => write!(f, "Low"),
        }
    }
}

/// Error returned when a priority string is not one of `High`/`Medium`/`Low`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown priority {0:?} (expected High, Medium, or Low)")]
pub struct PriorityParseError(String);

impl FromStr for Priority {
    type Err = PriorityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(PriorityParseError(s.to_string())),
        }
    }
}

/// A task deadline: local wall-clock timestamp with minute precision.
///
/// Parses from and serializes to the fixed [`DEADLINE_FORMAT`]
/// (`YYYY-MM-DD HH:MM`). Values that fail to parse are rejected here
/// and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Deadline(NaiveDateTime);

impl Deadline {
    /// Creates a deadline from a naive local timestamp, truncated to
    /// minute precision.
    #[must_use]
    pub fn from_naive(dt: NaiveDateTime) -> Self {
        let truncated = dt
            .with_second(0)
            .and_then(|d| d.with_nanosecond(0))
            .unwrap_or(dt);
        Self(truncated)
    }

    /// Returns the underlying naive local timestamp.
    #[must_use]
    pub const fn as_naive(self) -> NaiveDateTime {
        self.0
    }
}

impl fmt::Display for Deadline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DEADLINE_FORMAT))
    }
}

/// Error returned when a deadline string does not match [`DEADLINE_FORMAT`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid deadline {value:?} (expected YYYY-MM-DD HH:MM)")]
pub struct DeadlineParseError {
    /// The rejected input.
    pub value: String,
    /// Underlying chrono parse failure.
    #[source]
    source: chrono::ParseError,
}

impl FromStr for Deadline {
    type Err = DeadlineParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDateTime::parse_from_str(s, DEADLINE_FORMAT)
            .map(Self)
            .map_err(|source| DeadlineParseError {
                value: s.to_string(),
                source,
            })
    }
}

impl Serialize for Deadline {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Deadline {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A single trackable to-do item.
///
/// `reminded` records whether a reminder has already fired for the
/// current deadline; it transitions false→true at most once per
/// deadline value and is never reset automatically. A caller that
/// edits `deadline` is responsible for resetting `reminded` in the
/// same update.
///
/// Unknown fields found in the durable file are captured in `extra`
/// and written back on the next persist, so documents produced by a
/// newer version survive a round trip through this one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique, store-assigned identifier.
    pub id: TaskId,
    /// Non-empty task title.
    pub title: String,
    /// Optional deadline; absent means the task never triggers a reminder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<Deadline>,
    /// Task priority, `Medium` by default.
    #[serde(default)]
    pub priority: Priority,
    /// Free-form notes, may be empty.
    #[serde(default)]
    pub notes: String,
    /// Whether the task has been completed.
    #[serde(default)]
    pub completed: bool,
    /// Whether a reminder has fired for the current deadline.
    #[serde(default)]
    pub reminded: bool,
    /// Unknown fields, tolerated on read and preserved on rewrite.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
