use chrono::NaiveDate;
use rusqlite::ffi;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Habit {habit_id} already checked in on {date}")]
    DuplicateCheckin { habit_id: i64, date: NaiveDate },

    #[error("{0}")]
    Validation(String),

    #[error("Store failure: {0}")]
    Store(#[from] rusqlite::Error),
}

pub type TrackerResult<T> = Result<T, TrackerError>;

impl TrackerError {
    pub fn habit_not_found(id: i64) -> Self {
        Self::NotFound { entity: "Habit", id }
    }

    pub fn task_not_found(id: i64) -> Self {
        Self::NotFound { entity: "Task", id }
    }
}

/// True only for UNIQUE index conflicts; NOT NULL, foreign key and CHECK failures are excluded.
pub fn is_unique_violation(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}
