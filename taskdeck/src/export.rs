//! Row-oriented CSV export of task snapshots.

use std::borrow::Cow;
use std::io::{self, Write};

use crate::task::Task;

/// Column header row, in the order consumers expect.
pub const CSV_HEADER: &str = "id,title,deadline,priority,completed,notes";

/// Writes the snapshot as CSV: a header row followed by one row per
/// task, in input order. Text fields are quoted only when they contain
/// a delimiter, quote, or line break.
///
/// # Errors
///
/// Returns any error from the underlying writer.
pub fn write_csv<W: Write>(mut out: W, tasks: &[Task]) -> io::Result<()> {
    writeln!(out, "{CSV_HEADER}")?;
    for task in tasks {
        let deadline = task.deadline.map(|d| d.to_string()).unwrap_or_default();
        writeln!(
            out,
            "{},{},{},{},{},{}",
            task.id,
            escape(&task.title),
            deadline,
            task.priority,
            task.completed,
            escape(&task.notes),
        )?;
    }
    out.flush()
}

/// Quotes a field when it would otherwise break the row structure.
fn escape(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}
