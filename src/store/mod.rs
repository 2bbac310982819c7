//! Persistence seams.
//!
//! Handlers talk to `UserStore` and `TaskStore` trait objects held in `AppState`;
//! `postgres::PgStore` implements both over a `PgPool`.

pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::models::{NewTask, NewUser, ProfileChanges, Task, TaskCategory, TaskChanges, User};

pub use postgres::PgStore;

/// Largest page a caller may request.
pub const MAX_PAGE_LIMIT: i64 = 100;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(&self, user: NewUser) -> Result<User, AppError>;
    async fn find_user_by_id(&self, id: i32) -> Result<Option<User>, AppError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;
    async fn update_profile(&self, id: i32, changes: ProfileChanges) -> Result<User, AppError>;
    async fn set_password(&self, id: i32, password_hash: &str) -> Result<(), AppError>;
    /// Marks the account as verified.
    async fn activate(&self, id: i32) -> Result<(), AppError>;
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn create_task(&self, task: NewTask) -> Result<Task, AppError>;
    async fn find_task(&self, id: i32) -> Result<Option<Task>, AppError>;
    /// Applies `changes` and returns the updated row. An empty change set returns the
    /// task unchanged.
    async fn update_task(&self, id: i32, changes: TaskChanges) -> Result<Task, AppError>;
    /// Returns `false` when no row had that id.
    async fn delete_task(&self, id: i32) -> Result<bool, AppError>;
    /// Returns one page of matches together with the total match count.
    async fn query_tasks(&self, query: &TaskQuery) -> Result<(Vec<Task>, i64), AppError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskOrder {
    #[default]
    IdAsc,
    IdDesc,
}

/// Validated `skip`/`limit` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: i64,
    pub limit: i64,
}

impl Page {
    pub fn new(skip: Option<i64>, limit: Option<i64>, default_limit: i64) -> Result<Self, AppError> {
        let skip = skip.unwrap_or(0);
        let limit = limit.unwrap_or(default_limit);
        if skip < 0 {
            return Err(AppError::ValidationError(
                "skip must be greater than or equal to 0".into(),
            ));
        }
        if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
            return Err(AppError::ValidationError(format!(
                "limit must be between 1 and {}",
                MAX_PAGE_LIMIT
            )));
        }
        Ok(Self { skip, limit })
    }
}

/// Conditions for `TaskStore::query_tasks`. Every `Some` field narrows the result.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskQuery {
    /// Restricts results to one owner; `None` for admins.
    pub owner_id: Option<i32>,
    /// Case-insensitive substring of the title.
    pub title_contains: Option<String>,
    /// Case-insensitive substring of the title, description or due date text.
    pub text_contains: Option<String>,
    pub status: Option<bool>,
    pub category: Option<TaskCategory>,
    /// Due on or before this instant.
    pub due_before: Option<DateTime<Utc>>,
    pub delete_requested: Option<bool>,
    pub order: TaskOrder,
    pub page: Page,
}

impl TaskQuery {
    pub fn new(owner_id: Option<i32>, page: Page) -> Self {
        Self {
            owner_id,
            title_contains: None,
            text_contains: None,
            status: None,
            category: None,
            due_before: None,
            delete_requested: None,
            order: TaskOrder::IdAsc,
            page,
        }
    }

    /// In-process evaluation of the same predicate `PgStore` renders as SQL.
    pub fn matches(&self, task: &Task) -> bool {
        if self.owner_id.is_some_and(|owner| owner != task.owner_id) {
            return false;
        }
        if let Some(needle) = &self.title_contains {
            if !contains_ignore_case(&task.title, needle) {
                return false;
            }
        }
        if let Some(needle) = &self.text_contains {
            let in_description = task
                .description
                .as_deref()
                .is_some_and(|d| contains_ignore_case(d, needle));
            let in_due_date = task
                .due_date
                .is_some_and(|d| contains_ignore_case(&due_date_text(d), needle));
            if !(contains_ignore_case(&task.title, needle) || in_description || in_due_date) {
                return false;
            }
        }
        if self.status.is_some_and(|status| status != task.status) {
            return false;
        }
        if self.category.is_some_and(|category| category != task.category) {
            return false;
        }
        if let Some(limit) = self.due_before {
            if !task.due_date.is_some_and(|due| due <= limit) {
                return false;
            }
        }
        if self
            .delete_requested
            .is_some_and(|flag| flag != task.delete_request)
        {
            return false;
        }
        true
    }
}

/// Text form of a due date as Postgres prints a `timestamptz` in a UTC session.
pub fn due_date_text(due_date: DateTime<Utc>) -> String {
    due_date.format("%Y-%m-%d %H:%M:%S+00").to_string()
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Wraps a search term for `ILIKE`, escaping the pattern metacharacters.
pub fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}
