pub const CREATE_HABITS: &str = r#"
CREATE TABLE IF NOT EXISTS habits (
  id           INTEGER PRIMARY KEY AUTOINCREMENT,
  name         TEXT NOT NULL,
  description  TEXT NOT NULL DEFAULT '',
  frequency    TEXT NOT NULL DEFAULT 'daily',
  streak       INTEGER NOT NULL DEFAULT 0,
  last_checkin TEXT,
  created_at   TEXT NOT NULL,
  updated_at   TEXT NOT NULL
);
"#;

pub const CREATE_HABIT_LOGS: &str = r#"
CREATE TABLE IF NOT EXISTS habit_logs (
  id         INTEGER PRIMARY KEY AUTOINCREMENT,
  habit_id   INTEGER NOT NULL REFERENCES habits(id) ON DELETE CASCADE,
  date       TEXT NOT NULL,
  completed  INTEGER NOT NULL DEFAULT 1,
  created_at TEXT NOT NULL,
  UNIQUE (habit_id, date)
);
"#;

pub const CREATE_TASKS: &str = r#"
CREATE TABLE IF NOT EXISTS tasks (
  id          INTEGER PRIMARY KEY AUTOINCREMENT,
  title       TEXT NOT NULL,
  description TEXT NOT NULL DEFAULT '',
  due_date    TEXT,
  priority    TEXT NOT NULL DEFAULT 'medium',
  completed   INTEGER NOT NULL DEFAULT 0,
  created_at  TEXT NOT NULL,
  updated_at  TEXT NOT NULL
);
"#;

pub const INDEX_HABIT_LOGS_DATE: &str =
    "CREATE INDEX IF NOT EXISTS idx_habit_logs_habit_date ON habit_logs(habit_id, date);";

pub const INDEX_TASKS_DUE_DATE: &str =
    "CREATE INDEX IF NOT EXISTS idx_tasks_due_date ON tasks(due_date);";

pub const HABIT_COLUMNS: &str =
    "id, name, description, frequency, streak, last_checkin, created_at, updated_at";

pub const HABIT_LOG_COLUMNS: &str = "id, habit_id, date, completed, created_at";

pub const TASK_COLUMNS: &str =
    "id, title, description, due_date, priority, completed, created_at, updated_at";

pub fn schema_statements() -> Vec<&'static str> {
    vec![
        CREATE_HABITS,
        CREATE_HABIT_LOGS,
        CREATE_TASKS,
        INDEX_HABIT_LOGS_DATE,
        INDEX_TASKS_DUE_DATE,
    ]
}
