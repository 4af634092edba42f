//! Error type for the calendar core.

use chrono::NaiveDate;
use thiserror::Error;

use crate::task::TaskId;

/// Broad classes callers branch on when deciding how to surface an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input to a core operation; nothing was applied.
    Validation,
    /// The external task backend failed; the store kept its last good state.
    ExternalFetch,
    /// The action referenced a task that is no longer in the collection.
    StaleDrop,
}

#[derive(Error, Debug)]
pub enum CalendarError {
    #[error("unknown view mode: {0}")]
    InvalidViewMode(String),

    #[error("week start day must be 0-6 (0 = Sunday), got {0}")]
    InvalidWeekStart(i64),

    #[error("unknown navigation direction: {0}")]
    InvalidDirection(String),

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("invalid time slot {hour:02}:{minute:02}")]
    InvalidTimeSlot { hour: u32, minute: u32 },

    #[error("agenda lookahead must be at least one day, got {0}")]
    InvalidLookahead(u32),

    #[error("date arithmetic out of range near {0}")]
    DateOutOfRange(NaiveDate),

    #[error("local time {0} does not exist in the calendar time zone")]
    NonexistentLocalTime(String),

    #[error("invalid task: {0}")]
    InvalidTask(String),

    #[error("task already exists: {0}")]
    DuplicateTask(TaskId),

    #[error("drop has no target date")]
    MissingDropTarget,

    #[error("no task is being dragged")]
    NothingDragged,

    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("dragged task {0} is no longer in the calendar")]
    StaleDrop(TaskId),

    #[error("task backend request failed: {0:#}")]
    Backend(anyhow::Error),
}

impl CalendarError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TaskNotFound(_) | Self::StaleDrop(_) => ErrorKind::StaleDrop,
            Self::Backend(_) => ErrorKind::ExternalFetch,
            _ => ErrorKind::Validation,
        }
    }
}

pub type CalendarResult<T> = Result<T, CalendarError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(
            CalendarError::InvalidViewMode("year".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            CalendarError::StaleDrop(TaskId::new("t1")).kind(),
            ErrorKind::StaleDrop
        );
        assert_eq!(
            CalendarError::Backend(anyhow::anyhow!("503")).kind(),
            ErrorKind::ExternalFetch
        );
    }

    #[test]
    fn backend_error_keeps_context_chain() {
        let err = anyhow::anyhow!("connection reset").context("fetching tasks");
        let msg = CalendarError::Backend(err).to_string();
        assert_eq!(
            msg,
            "task backend request failed: fetching tasks: connection reset"
        );
    }
}
