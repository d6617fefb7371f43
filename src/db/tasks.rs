use super::queries::TASK_COLUMNS;
use super::{Database, Priority, TaskRow};
use crate::error::{TrackerError, TrackerResult};
use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub due_date: Option<NaiveDate>,
    pub priority: Priority,
    pub completed: bool,
}

/// Partial task update. `due_date: Some(None)` clears the due date.
#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<Option<NaiveDate>>,
    pub priority: Option<Priority>,
    pub completed: Option<bool>,
}

impl NewTask {
    pub fn new(title: &str) -> TrackerResult<Self> {
        Ok(Self {
            title: required_title(title)?,
            description: String::new(),
            due_date: None,
            priority: Priority::default(),
            completed: false,
        })
    }
}

fn required_title(title: &str) -> TrackerResult<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(TrackerError::Validation("Title is required".to_string()));
    }
    Ok(trimmed.to_string())
}

fn fetch_task(conn: &Connection, task_id: i64) -> TrackerResult<TaskRow> {
    conn.query_row(
        &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
        params![task_id],
        TaskRow::from_row,
    )
    .optional()?
    .ok_or_else(|| TrackerError::task_not_found(task_id))
}

fn store_task(conn: &Connection, task: &TaskRow) -> TrackerResult<()> {
    conn.execute(
        "UPDATE tasks
         SET title = ?1, description = ?2, due_date = ?3, priority = ?4, completed = ?5, updated_at = ?6
         WHERE id = ?7",
        params![
            &task.title,
            &task.description,
            task.due_date,
            task.priority,
            task.completed,
            Utc::now().naive_utc(),
            task.id
        ],
    )?;

    Ok(())
}

impl Database {
    pub fn list_tasks(&self) -> TrackerResult<Vec<TaskRow>> {
        let mut statement = self
            .conn
            .prepare(&format!("SELECT {TASK_COLUMNS} FROM tasks ORDER BY id ASC"))?;

        let rows = statement
            .query_map([], TaskRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    pub fn task(&self, task_id: i64) -> TrackerResult<TaskRow> {
        fetch_task(&self.conn, task_id)
    }

    pub fn insert_task(&self, task: &NewTask) -> TrackerResult<TaskRow> {
        let now = Utc::now().naive_utc();
        self.conn.execute(
            "INSERT INTO tasks (title, description, due_date, priority, completed, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                &task.title,
                &task.description,
                task.due_date,
                task.priority,
                task.completed,
                now
            ],
        )?;

        let task_id = self.conn.last_insert_rowid();
        debug!(task_id, title = %task.title, "task created");
        self.task(task_id)
    }

    pub fn update_task(&mut self, task_id: i64, changes: TaskChanges) -> TrackerResult<TaskRow> {
        let transaction = self.conn.transaction()?;
        let mut task = fetch_task(&transaction, task_id)?;

        if let Some(title) = changes.title {
            task.title = required_title(&title)?;
        }
        if let Some(description) = changes.description {
            task.description = description;
        }
        if let Some(due_date) = changes.due_date {
            task.due_date = due_date;
        }
        if let Some(priority) = changes.priority {
            task.priority = priority;
        }
        if let Some(completed) = changes.completed {
            task.completed = completed;
        }

        store_task(&transaction, &task)?;
        let updated = fetch_task(&transaction, task_id)?;
        transaction.commit()?;

        Ok(updated)
    }

    pub fn toggle_task(&mut self, task_id: i64) -> TrackerResult<TaskRow> {
        let transaction = self.conn.transaction()?;
        let mut task = fetch_task(&transaction, task_id)?;
        task.completed = !task.completed;

        store_task(&transaction, &task)?;
        let updated = fetch_task(&transaction, task_id)?;
        transaction.commit()?;

        Ok(updated)
    }

    pub fn delete_task(&self, task_id: i64) -> TrackerResult<()> {
        let deleted = self
            .conn
            .execute("DELETE FROM tasks WHERE id = ?1", params![task_id])?;

        if deleted == 0 {
            return Err(TrackerError::task_not_found(task_id));
        }

        debug!(task_id, "task deleted");
        Ok(())
    }
}
