use crate::config::Config;
use crate::db::habits::{HabitChanges, NewHabit};
use crate::db::tasks::{NewTask, TaskChanges};
use crate::db::{Database, Frequency, HabitLogRow, HabitRow, Priority, Table, TaskRow, parse_date};
use crate::error::{TrackerError, TrackerResult};
use crate::streak::stats::HabitStats;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{error, warn};

#[derive(Clone)]
pub struct ApiState {
    pub config: Arc<Config>,
}

impl ApiState {
    fn database(&self) -> ApiResult<Database> {
        Ok(Database::open(&self.config.db_path)?)
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/status", get(status))
        .route("/api/habits", get(habit_list).post(habit_create))
        .route(
            "/api/habits/:id",
            get(habit_get).put(habit_update).delete(habit_delete),
        )
        .route("/api/habits/:id/checkin", post(habit_checkin))
        .route("/api/habits/:id/logs", get(habit_logs))
        .route("/api/habits/:id/stats", get(habit_stats))
        .route("/api/tasks", get(task_list).post(task_create))
        .route(
            "/api/tasks/:id",
            get(task_get).put(task_update).delete(task_delete),
        )
        .route("/api/tasks/:id/toggle", post(task_toggle))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct HabitPayload {
    name: Option<String>,
    description: Option<String>,
    frequency: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TaskPayload {
    title: Option<String>,
    description: Option<String>,
    #[serde(default, deserialize_with = "present_or_null")]
    due_date: Option<Option<String>>,
    priority: Option<String>,
    completed: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct CheckinQuery {
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LogsQuery {
    days: Option<i64>,
}

#[derive(Debug, Serialize)]
struct StatusPayload {
    habits: u64,
    habit_logs: u64,
    tasks: u64,
    db_path: String,
}

async fn status(State(state): State<ApiState>) -> ApiResult<Json<StatusPayload>> {
    let database = state.database()?;

    Ok(Json(StatusPayload {
        habits: database.count_rows(Table::Habits)?,
        habit_logs: database.count_rows(Table::HabitLogs)?,
        tasks: database.count_rows(Table::Tasks)?,
        db_path: state.config.db_path.display().to_string(),
    }))
}

async fn habit_list(State(state): State<ApiState>) -> ApiResult<Json<Vec<HabitRow>>> {
    Ok(Json(state.database()?.list_habits()?))
}

async fn habit_create(
    State(state): State<ApiState>,
    Json(payload): Json<HabitPayload>,
) -> ApiResult<(StatusCode, Json<HabitRow>)> {
    let frequency = payload
        .frequency
        .as_deref()
        .map(str::parse::<Frequency>)
        .transpose()?
        .unwrap_or_default();
    let habit = NewHabit::new(
        payload.name.as_deref().unwrap_or_default(),
        payload.description,
        frequency,
    )?;

    let created = state.database()?.insert_habit(&habit)?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn habit_get(
    State(state): State<ApiState>,
    Path(habit_id): Path<i64>,
) -> ApiResult<Json<HabitRow>> {
    Ok(Json(state.database()?.habit(habit_id)?))
}

async fn habit_update(
    State(state): State<ApiState>,
    Path(habit_id): Path<i64>,
    Json(payload): Json<HabitPayload>,
) -> ApiResult<Json<HabitRow>> {
    let changes = HabitChanges {
        name: payload.name,
        description: payload.description,
        frequency: payload
            .frequency
            .as_deref()
            .map(str::parse::<Frequency>)
            .transpose()?,
    };

    Ok(Json(state.database()?.update_habit(habit_id, changes)?))
}

async fn habit_delete(
    State(state): State<ApiState>,
    Path(habit_id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let removed_logs = state.database()?.delete_habit(habit_id)?;

    Ok(Json(json!({
        "message": "Habit deleted successfully",
        "removed_logs": removed_logs
    })))
}

async fn habit_checkin(
    State(state): State<ApiState>,
    Path(habit_id): Path<i64>,
    Query(query): Query<CheckinQuery>,
) -> ApiResult<Json<HabitRow>> {
    let date = query
        .date
        .as_deref()
        .map(parse_date)
        .transpose()?
        .unwrap_or_else(today);

    Ok(Json(state.database()?.checkin(habit_id, date)?))
}

async fn habit_logs(
    State(state): State<ApiState>,
    Path(habit_id): Path<i64>,
    Query(query): Query<LogsQuery>,
) -> ApiResult<Json<Vec<HabitLogRow>>> {
    let days = match query.days {
        Some(days) => u32::try_from(days)
            .ok()
            .filter(|days| *days >= 1)
            .ok_or_else(|| TrackerError::Validation("days must be at least 1".to_string()))?,
        None => state.config.logs_default_days,
    };

    Ok(Json(state.database()?.habit_logs(habit_id, today(), days)?))
}

async fn habit_stats(
    State(state): State<ApiState>,
    Path(habit_id): Path<i64>,
) -> ApiResult<Json<HabitStats>> {
    let window_days = state.config.stats_window_days;

    Ok(Json(
        state
            .database()?
            .habit_stats(habit_id, today(), window_days)?,
    ))
}

async fn task_list(State(state): State<ApiState>) -> ApiResult<Json<Vec<TaskRow>>> {
    Ok(Json(state.database()?.list_tasks()?))
}

async fn task_create(
    State(state): State<ApiState>,
    Json(payload): Json<TaskPayload>,
) -> ApiResult<(StatusCode, Json<TaskRow>)> {
    let task = NewTask {
        description: payload.description.unwrap_or_default(),
        due_date: optional_date(payload.due_date.flatten())?,
        priority: parse_priority(payload.priority)?.unwrap_or_default(),
        completed: payload.completed.unwrap_or(false),
        ..NewTask::new(payload.title.as_deref().unwrap_or_default())?
    };

    let created = state.database()?.insert_task(&task)?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn task_get(
    State(state): State<ApiState>,
    Path(task_id): Path<i64>,
) -> ApiResult<Json<TaskRow>> {
    Ok(Json(state.database()?.task(task_id)?))
}

async fn task_update(
    State(state): State<ApiState>,
    Path(task_id): Path<i64>,
    Json(payload): Json<TaskPayload>,
) -> ApiResult<Json<TaskRow>> {
    let changes = TaskChanges {
        title: payload.title,
        description: payload.description,
        due_date: payload.due_date.map(optional_date).transpose()?,
        priority: parse_priority(payload.priority)?,
        completed: payload.completed,
    };

    Ok(Json(state.database()?.update_task(task_id, changes)?))
}

async fn task_delete(
    State(state): State<ApiState>,
    Path(task_id): Path<i64>,
) -> ApiResult<Json<Value>> {
    state.database()?.delete_task(task_id)?;

    Ok(Json(json!({ "message": "Task deleted successfully" })))
}

async fn task_toggle(
    State(state): State<ApiState>,
    Path(task_id): Path<i64>,
) -> ApiResult<Json<TaskRow>> {
    Ok(Json(state.database()?.toggle_task(task_id)?))
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn optional_date(input: Option<String>) -> TrackerResult<Option<NaiveDate>> {
    input
        .as_deref()
        .filter(|value| !value.trim().is_empty())
        .map(parse_date)
        .transpose()
}

fn parse_priority(input: Option<String>) -> TrackerResult<Option<Priority>> {
    input.as_deref().map(str::parse::<Priority>).transpose()
}

// Distinguishes an absent field (None) from an explicit null (Some(None)).
fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        Self::Internal(value)
    }
}

impl From<TrackerError> for ApiError {
    fn from(value: TrackerError) -> Self {
        match value {
            TrackerError::NotFound { .. } => Self::NotFound(value.to_string()),
            TrackerError::DuplicateCheckin { .. } => {
                warn!(error = %value, "duplicate check-in rejected");
                Self::BadRequest(value.to_string())
            }
            TrackerError::Validation(message) => Self::BadRequest(message),
            TrackerError::Store(_) => Self::Internal(value.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Internal(error) => {
                error!(error = %error, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ApiState, router};
    use crate::config::Config;
    use axum::Router;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn test_app() -> (TempDir, Router) {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = Config {
            db_path: dir.path().join("habitrack.db"),
            ..Config::default()
        };
        let app = router(ApiState {
            config: Arc::new(config),
        });
        (dir, app)
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(
                body.map(|value| Body::from(value.to_string()))
                    .unwrap_or_else(Body::empty),
            )
            .expect("request");

        let response = app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let payload = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        (status, payload)
    }

    async fn create_habit(app: &Router, name: &str) -> i64 {
        let (status, habit) = send(app, "POST", "/api/habits", Some(json!({ "name": name }))).await;
        assert_eq!(status, StatusCode::CREATED);
        habit["id"].as_i64().expect("habit id")
    }

    #[tokio::test]
    async fn checkin_flow_updates_streak_and_rejects_duplicates() {
        let (_dir, app) = test_app();
        let id = create_habit(&app, "Meditate").await;

        let uri = format!("/api/habits/{id}/checkin?date=2024-01-01");
        let (status, habit) = send(&app, "POST", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(habit["streak"], 1);
        assert_eq!(habit["last_checkin"], "2024-01-01");

        let (status, habit) =
            send(&app, "POST", &format!("/api/habits/{id}/checkin?date=2024-01-02"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(habit["streak"], 2);

        let (status, body) =
            send(&app, "POST", &format!("/api/habits/{id}/checkin?date=2024-01-02"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().expect("error").contains("already checked in"));

        let (_, habit) = send(&app, "GET", &format!("/api/habits/{id}"), None).await;
        assert_eq!(habit["streak"], 2);
    }

    #[tokio::test]
    async fn stats_follow_checkin_history() {
        let (_dir, app) = test_app();
        let id = create_habit(&app, "Stretch").await;

        for date in ["2024-01-01", "2024-01-02", "2024-01-04"] {
            let uri = format!("/api/habits/{id}/checkin?date={date}");
            let (status, _) = send(&app, "POST", &uri, None).await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, stats) = send(&app, "GET", &format!("/api/habits/{id}/stats"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["habit_id"], id);
        assert_eq!(stats["current_streak"], 1);
        assert_eq!(stats["longest_streak"], 2);
        assert_eq!(stats["total_completions"], 3);
        assert_eq!(stats["window_days"], 30);

        let (status, logs) = send(&app, "GET", &format!("/api/habits/{id}/logs?days=1"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(logs.as_array().expect("logs").is_empty());

        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/habits/{id}/checkin?date=%2B10000-01-01"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_habit_and_bad_input_map_to_client_errors() {
        let (_dir, app) = test_app();

        let (status, _) = send(&app, "GET", "/api/habits/77/stats", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, "POST", "/api/habits/77/checkin", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(&app, "POST", "/api/habits", Some(json!({ "name": "" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Name is required");

        let (status, _) = send(
            &app,
            "POST",
            "/api/habits",
            Some(json!({ "name": "Swim", "frequency": "hourly" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let id = create_habit(&app, "Journal").await;
        let (status, _) =
            send(&app, "POST", &format!("/api/habits/{id}/checkin?date=2024-13-01"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, "GET", &format!("/api/habits/{id}/logs?days=0"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn deleting_habit_removes_its_logs() {
        let (_dir, app) = test_app();
        let id = create_habit(&app, "Walk").await;
        send(&app, "POST", &format!("/api/habits/{id}/checkin"), None).await;

        let (status, body) = send(&app, "DELETE", &format!("/api/habits/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["removed_logs"], 1);

        let (status, _) = send(&app, "GET", &format!("/api/habits/{id}/logs"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, status_body) = send(&app, "GET", "/api/status", None).await;
        assert_eq!(status_body["habits"], 0);
        assert_eq!(status_body["habit_logs"], 0);
    }

    #[tokio::test]
    async fn task_crud_and_toggle() {
        let (_dir, app) = test_app();

        let (status, task) = send(
            &app,
            "POST",
            "/api/tasks",
            Some(json!({ "title": "Team sync", "due_date": "2025-01-26", "priority": "high" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(task["priority"], "high");
        assert_eq!(task["completed"], false);
        let id = task["id"].as_i64().expect("task id");

        let (_, task) = send(&app, "POST", &format!("/api/tasks/{id}/toggle"), None).await;
        assert_eq!(task["completed"], true);

        let (status, task) = send(
            &app,
            "PUT",
            &format!("/api/tasks/{id}"),
            Some(json!({ "due_date": null, "description": "weekly" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(task["due_date"], Value::Null);
        assert_eq!(task["description"], "weekly");
        assert_eq!(task["title"], "Team sync");

        let (status, _) = send(
            &app,
            "PUT",
            &format!("/api/tasks/{id}"),
            Some(json!({ "due_date": "tomorrow" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, "DELETE", &format!("/api/tasks/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&app, "GET", &format!("/api/tasks/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
