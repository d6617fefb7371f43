use super::queries::{HABIT_COLUMNS, HABIT_LOG_COLUMNS};
use super::{Database, Frequency, HabitLogRow, HabitRow, ensure_storable_date};
use crate::error::{TrackerError, TrackerResult, is_unique_violation};
use crate::streak::{self, stats::HabitStats, stats::window_start};
use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct NewHabit {
    pub name: String,
    pub description: String,
    pub frequency: Frequency,
}

#[derive(Debug, Clone, Default)]
pub struct HabitChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub frequency: Option<Frequency>,
}

impl NewHabit {
    pub fn new(
        name: &str,
        description: Option<String>,
        frequency: Frequency,
    ) -> TrackerResult<Self> {
        Ok(Self {
            name: required_name(name)?,
            description: description.unwrap_or_default(),
            frequency,
        })
    }
}

fn required_name(name: &str) -> TrackerResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(TrackerError::Validation("Name is required".to_string()));
    }
    Ok(trimmed.to_string())
}

fn fetch_habit(conn: &Connection, habit_id: i64) -> TrackerResult<HabitRow> {
    conn.query_row(
        &format!("SELECT {HABIT_COLUMNS} FROM habits WHERE id = ?1"),
        params![habit_id],
        HabitRow::from_row,
    )
    .optional()?
    .ok_or_else(|| TrackerError::habit_not_found(habit_id))
}

fn entry_exists_in(conn: &Connection, habit_id: i64, date: NaiveDate) -> TrackerResult<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM habit_logs WHERE habit_id = ?1 AND date = ?2)",
        params![habit_id, date],
        |row| row.get(0),
    )?;

    Ok(exists)
}

fn completed_dates_in(conn: &Connection, habit_id: i64) -> TrackerResult<Vec<NaiveDate>> {
    let mut statement = conn.prepare(
        "SELECT date FROM habit_logs
         WHERE habit_id = ?1 AND completed = 1
         ORDER BY date ASC",
    )?;

    let dates = statement
        .query_map(params![habit_id], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(dates)
}

impl Database {
    pub fn list_habits(&self) -> TrackerResult<Vec<HabitRow>> {
        let mut statement = self
            .conn
            .prepare(&format!("SELECT {HABIT_COLUMNS} FROM habits ORDER BY id ASC"))?;

        let rows = statement
            .query_map([], HabitRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    pub fn habit(&self, habit_id: i64) -> TrackerResult<HabitRow> {
        fetch_habit(&self.conn, habit_id)
    }

    pub fn insert_habit(&self, habit: &NewHabit) -> TrackerResult<HabitRow> {
        let now = Utc::now().naive_utc();
        self.conn.execute(
            "INSERT INTO habits (name, description, frequency, streak, last_checkin, created_at, updated_at)
             VALUES (?1, ?2, ?3, 0, NULL, ?4, ?4)",
            params![&habit.name, &habit.description, habit.frequency, now],
        )?;

        let habit_id = self.conn.last_insert_rowid();
        debug!(habit_id, name = %habit.name, "habit created");
        self.habit(habit_id)
    }

    pub fn update_habit(
        &mut self,
        habit_id: i64,
        changes: HabitChanges,
    ) -> TrackerResult<HabitRow> {
        let transaction = self.conn.transaction()?;
        let mut habit = fetch_habit(&transaction, habit_id)?;

        if let Some(name) = changes.name {
            habit.name = required_name(&name)?;
        }
        if let Some(description) = changes.description {
            habit.description = description;
        }
        if let Some(frequency) = changes.frequency {
            habit.frequency = frequency;
        }

        transaction.execute(
            "UPDATE habits SET name = ?1, description = ?2, frequency = ?3, updated_at = ?4 WHERE id = ?5",
            params![
                &habit.name,
                &habit.description,
                habit.frequency,
                Utc::now().naive_utc(),
                habit_id
            ],
        )?;

        let updated = fetch_habit(&transaction, habit_id)?;
        transaction.commit()?;

        Ok(updated)
    }

    /// Deletes a habit together with every log entry it owns. Returns the number of entries removed.
    pub fn delete_habit(&mut self, habit_id: i64) -> TrackerResult<usize> {
        let transaction = self.conn.transaction()?;
        fetch_habit(&transaction, habit_id)?;

        let removed_logs =
            transaction.execute("DELETE FROM habit_logs WHERE habit_id = ?1", params![habit_id])?;
        transaction.execute("DELETE FROM habits WHERE id = ?1", params![habit_id])?;
        transaction.commit()?;

        info!(habit_id, removed_logs, "habit deleted");
        Ok(removed_logs)
    }

    /// Records a completed check-in for `date` and advances the cached streak.
    ///
    /// The log insert and the streak update commit together; any failure rolls both back.
    pub fn checkin(&mut self, habit_id: i64, date: NaiveDate) -> TrackerResult<HabitRow> {
        ensure_storable_date(date)?;
        let transaction = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let habit = fetch_habit(&transaction, habit_id)?;

        if entry_exists_in(&transaction, habit_id, date)? {
            return Err(TrackerError::DuplicateCheckin { habit_id, date });
        }

        let next = streak::next_checkin(habit.checkin_state(), date);
        let now = Utc::now().naive_utc();

        transaction
            .execute(
                "INSERT INTO habit_logs (habit_id, date, completed, created_at) VALUES (?1, ?2, 1, ?3)",
                params![habit_id, date, now],
            )
            .map_err(|error| {
                if is_unique_violation(&error) {
                    TrackerError::DuplicateCheckin { habit_id, date }
                } else {
                    TrackerError::Store(error)
                }
            })?;

        transaction.execute(
            "UPDATE habits SET streak = ?1, last_checkin = ?2, updated_at = ?3 WHERE id = ?4",
            params![next.streak, next.last_checkin, now, habit_id],
        )?;

        let updated = fetch_habit(&transaction, habit_id)?;
        transaction.commit()?;

        info!(habit_id, date = %date, streak = updated.streak, "habit checked in");
        Ok(updated)
    }

    /// Entries dated within `[from, to]`, newest first.
    pub fn entries_between(
        &self,
        habit_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> TrackerResult<Vec<HabitLogRow>> {
        let mut statement = self.conn.prepare(&format!(
            "SELECT {HABIT_LOG_COLUMNS}
             FROM habit_logs
             WHERE habit_id = ?1 AND date >= ?2 AND date <= ?3
             ORDER BY date DESC"
        ))?;

        let rows = statement
            .query_map(params![habit_id, from, to], HabitLogRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Log entries for the trailing `days`-day window ending on `today`.
    pub fn habit_logs(
        &self,
        habit_id: i64,
        today: NaiveDate,
        days: u32,
    ) -> TrackerResult<Vec<HabitLogRow>> {
        if days == 0 {
            return Err(TrackerError::Validation(
                "days must be at least 1".to_string(),
            ));
        }

        fetch_habit(&self.conn, habit_id)?;
        self.entries_between(habit_id, window_start(today, days), today)
    }

    pub fn count_entries(&self, habit_id: i64, completed: Option<bool>) -> TrackerResult<u64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM habit_logs WHERE habit_id = ?1 AND (?2 IS NULL OR completed = ?2)",
            params![habit_id, completed],
            |row| row.get(0),
        )?;

        Ok(count)
    }

    pub fn habit_stats(
        &mut self,
        habit_id: i64,
        today: NaiveDate,
        window_days: u32,
    ) -> TrackerResult<HabitStats> {
        let transaction = self.conn.transaction()?;
        let habit = fetch_habit(&transaction, habit_id)?;
        let dates = completed_dates_in(&transaction, habit_id)?;
        transaction.commit()?;

        Ok(HabitStats::compute(
            habit.id,
            habit.streak,
            &dates,
            today,
            window_days,
        ))
    }
}
