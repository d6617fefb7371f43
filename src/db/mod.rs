pub mod habits;
pub mod queries;
pub mod tasks;

use crate::error::{TrackerError, TrackerResult};
use crate::streak::CheckinState;
use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize)]
pub struct HabitRow {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub frequency: Frequency,
    pub streak: u32,
    pub last_checkin: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct HabitLogRow {
    pub id: i64,
    pub habit_id: i64,
    pub date: NaiveDate,
    pub completed: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskRow {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub due_date: Option<NaiveDate>,
    pub priority: Priority,
    pub completed: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl HabitRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            frequency: row.get(3)?,
            streak: row.get(4)?,
            last_checkin: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    pub fn checkin_state(&self) -> CheckinState {
        CheckinState {
            streak: self.streak,
            last_checkin: self.last_checkin,
        }
    }
}

impl HabitLogRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            habit_id: row.get(1)?,
            date: row.get(2)?,
            completed: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}

impl TaskRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            due_date: row.get(3)?,
            priority: row.get(4)?,
            completed: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
        }
    }
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl FromStr for Frequency {
    type Err = TrackerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            other => Err(TrackerError::Validation(format!(
                "Invalid frequency: {other}. Use daily, weekly or monthly"
            ))),
        }
    }
}

impl FromStr for Priority {
    type Err = TrackerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(TrackerError::Validation(format!(
                "Invalid priority: {other}. Use low, medium or high"
            ))),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for Frequency {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Frequency {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error: TrackerError| FromSqlError::Other(Box::new(error)))
    }
}

impl ToSql for Priority {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Priority {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error: TrackerError| FromSqlError::Other(Box::new(error)))
    }
}

pub fn parse_date(input: &str) -> TrackerResult<NaiveDate> {
    let date = NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|_| {
        TrackerError::Validation(format!(
            "Invalid date format: {input}. Use YYYY-MM-DD, e.g. 2024-01-01"
        ))
    })?;

    ensure_storable_date(date)
}

/// Dates are stored as `YYYY-MM-DD` text and compared as strings, so only
/// four-digit, non-negative years keep calendar order.
pub fn ensure_storable_date(date: NaiveDate) -> TrackerResult<NaiveDate> {
    if !(0..=9999).contains(&date.year()) {
        return Err(TrackerError::Validation(format!(
            "Date out of range: {date}. Years must be between 0000 and 9999"
        )));
    }
    Ok(date)
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create DB directory: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open SQLite DB: {}", path.display()))?;
        conn.pragma_update(None, "foreign_keys", true)
            .context("Failed to enable foreign keys")?;

        let database = Self { conn };
        database.init_schema()?;

        Ok(database)
    }

    pub fn init_schema(&self) -> Result<()> {
        queries::schema_statements()
            .iter()
            .try_for_each(|statement| {
                self.conn
                    .execute(statement, [])
                    .context("Failed to initialize schema")
                    .map(|_| ())
            })
    }

    pub fn count_rows(&self, table: Table) -> TrackerResult<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", table.name());
        let count = self.conn.query_row(&sql, [], |row| row.get(0))?;

        Ok(count)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Table {
    Habits,
    HabitLogs,
    Tasks,
}

impl Table {
    fn name(self) -> &'static str {
        match self {
            Table::Habits => "habits",
            Table::HabitLogs => "habit_logs",
            Table::Tasks => "tasks",
        }
    }
}
