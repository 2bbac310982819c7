use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

/// Represents the priority bucket of a task.
/// Corresponds to the `task_category` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, sqlx::Type)]
#[sqlx(type_name = "task_category", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskCategory {
    #[default]
    Low,
    Medium,
    High,
}

impl TaskCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskCategory::Low => "low",
            TaskCategory::Medium => "medium",
            TaskCategory::High => "high",
        }
    }
}

impl fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskCategory {
    type Err = String;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(TaskCategory::Low),
            "medium" => Ok(TaskCategory::Medium),
            "high" => Ok(TaskCategory::High),
            _ => Err(format!(
                "Invalid category value '{}'. Allowed values are: low, medium, high",
                value
            )),
        }
    }
}

/// Represents a task row as stored in the `tasks` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Task {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    /// `true` once the task is done.
    pub status: bool,
    pub due_date: Option<DateTime<Utc>>,
    pub category: TaskCategory,
    pub completed_at: Option<DateTime<Utc>>,
    /// Set by the owner to ask an admin to delete the task.
    pub delete_request: bool,
    pub owner_id: i32,
    pub created_at: DateTime<Utc>,
}

/// Values for inserting a task. The owner always comes from the caller's token.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub status: bool,
    pub due_date: Option<DateTime<Utc>>,
    pub category: TaskCategory,
    pub completed_at: Option<DateTime<Utc>>,
    pub owner_id: i32,
}

impl NewTask {
    pub fn new(
        title: String,
        description: Option<String>,
        status: bool,
        due_date: Option<DateTime<Utc>>,
        category: TaskCategory,
        owner_id: i32,
    ) -> Self {
        Self {
            title,
            description,
            status,
            due_date,
            category,
            completed_at: completion_time(status, Utc::now()),
            owner_id,
        }
    }
}

/// A partial update. `None` leaves a column untouched; for `completed_at` the outer
/// option says whether to write and the inner one is the value written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<bool>,
    pub due_date: Option<DateTime<Utc>>,
    pub category: Option<TaskCategory>,
    pub completed_at: Option<Option<DateTime<Utc>>>,
    pub delete_request: Option<bool>,
}

impl TaskChanges {
    /// Changes that mark the task done or not done, keeping `completed_at` in step.
    pub fn status(done: bool) -> Self {
        Self {
            status: Some(done),
            completed_at: Some(completion_time(done, Utc::now())),
            ..Default::default()
        }
    }

    pub fn category(category: TaskCategory) -> Self {
        Self {
            category: Some(category),
            ..Default::default()
        }
    }

    pub fn delete_request() -> Self {
        Self {
            delete_request: Some(true),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply_to(self, task: &mut Task) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = Some(description);
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = Some(due_date);
        }
        if let Some(category) = self.category {
            task.category = category;
        }
        if let Some(completed_at) = self.completed_at {
            task.completed_at = completed_at;
        }
        if let Some(delete_request) = self.delete_request {
            task.delete_request = delete_request;
        }
    }
}

/// One page of tasks plus the number of matches ignoring pagination.
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskPage {
    pub tasks: Vec<Task>,
    pub total: i64,
    pub skip: i64,
    pub limit: i64,
}

pub fn completion_time(done: bool, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if done {
        Some(now)
    } else {
        None
    }
}

/// Parses a due date sent by a client.
///
/// Accepts RFC 3339 timestamps, naive `YYYY-MM-DDTHH:MM[:SS]` values (taken as UTC)
/// and plain `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_due_date(raw: &str) -> Result<DateTime<Utc>, AppError> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Some(naive) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(naive.and_utc());
    }

    Err(AppError::ValidationError(
        "Invalid datetime format. Must be ISO 8601 format.".into(),
    ))
}

/// Parses a due date for a new or edited task; it must lie in the future.
pub fn parse_future_due_date(raw: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, AppError> {
    let due_date = parse_due_date(raw)?;
    if due_date <= now {
        return Err(AppError::ValidationError(
            "Due date must be greater than the current date".into(),
        ));
    }
    Ok(due_date)
}
