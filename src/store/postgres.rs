use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder};

use super::{like_pattern, TaskOrder, TaskQuery, TaskStore, UserStore};
use crate::error::AppError;
use crate::models::{NewTask, NewUser, ProfileChanges, Task, TaskChanges, User};

const USER_COLUMNS: &str = "id, username, email, password_hash, role, first_name, last_name, \
                            contact_number, gender, is_active, created_at";

const TASK_COLUMNS: &str = "id, title, description, status, due_date, category, completed_at, \
                            delete_request, owner_id, created_at";

/// PostgreSQL-backed `UserStore` and `TaskStore`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        log::info!("Connected to database (max {} connections)", max_connections);
        Ok(Self::new(pool))
    }

    /// Applies the embedded migrations under `migrations/`.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        log::info!("Database migrations are up to date");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Appends the `WHERE` clause for `query`. Always emits `WHERE TRUE` so every
/// condition can be prefixed with `AND`.
fn push_task_conditions(builder: &mut QueryBuilder<'_, Postgres>, query: &TaskQuery) {
    builder.push(" WHERE TRUE");
    if let Some(owner_id) = query.owner_id {
        builder.push(" AND owner_id = ").push_bind(owner_id);
    }
    if let Some(title) = &query.title_contains {
        builder
            .push(" AND title ILIKE ")
            .push_bind(like_pattern(title));
    }
    if let Some(text) = &query.text_contains {
        let pattern = like_pattern(text);
        builder
            .push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR CAST(due_date AS TEXT) ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(status) = query.status {
        builder.push(" AND status = ").push_bind(status);
    }
    if let Some(category) = query.category {
        builder.push(" AND category = ").push_bind(category);
    }
    if let Some(due_before) = query.due_before {
        builder.push(" AND due_date <= ").push_bind(due_before);
    }
    if let Some(flag) = query.delete_requested {
        builder.push(" AND delete_request = ").push_bind(flag);
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        let sql = format!(
            "INSERT INTO users (username, email, password_hash, role, first_name, last_name, \
             contact_number, gender) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {}",
            USER_COLUMNS
        );
        let created = sqlx::query_as::<_, User>(&sql)
            .bind(user.username)
            .bind(user.email)
            .bind(user.password_hash)
            .bind(user.role)
            .bind(user.first_name)
            .bind(user.last_name)
            .bind(user.contact_number)
            .bind(user.gender)
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    async fn find_user_by_id(&self, id: i32) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn update_profile(&self, id: i32, changes: ProfileChanges) -> Result<User, AppError> {
        let mut builder = QueryBuilder::<Postgres>::new("UPDATE users SET ");
        let mut set = builder.separated(", ");
        // Keeps the statement valid when no field changes.
        set.push("id = id");
        if let Some(username) = changes.username {
            set.push("username = ").push_bind_unseparated(username);
        }
        if let Some(first_name) = changes.first_name {
            set.push("first_name = ").push_bind_unseparated(first_name);
        }
        if let Some(last_name) = changes.last_name {
            set.push("last_name = ").push_bind_unseparated(last_name);
        }
        if let Some(contact_number) = changes.contact_number {
            set.push("contact_number = ")
                .push_bind_unseparated(contact_number);
        }
        builder
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING ")
            .push(USER_COLUMNS);

        builder
            .build_query_as::<User>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))
    }

    async fn set_password(&self, id: i32, password_hash: &str) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User not found".into()));
        }
        Ok(())
    }

    async fn activate(&self, id: i32) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE users SET is_active = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User not found".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl TaskStore for PgStore {
    async fn create_task(&self, task: NewTask) -> Result<Task, AppError> {
        let sql = format!(
            "INSERT INTO tasks (title, description, status, due_date, category, completed_at, \
             owner_id) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            TASK_COLUMNS
        );
        let created = sqlx::query_as::<_, Task>(&sql)
            .bind(task.title)
            .bind(task.description)
            .bind(task.status)
            .bind(task.due_date)
            .bind(task.category)
            .bind(task.completed_at)
            .bind(task.owner_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    async fn find_task(&self, id: i32) -> Result<Option<Task>, AppError> {
        let sql = format!("SELECT {} FROM tasks WHERE id = $1", TASK_COLUMNS);
        let task = sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(task)
    }

    async fn update_task(&self, id: i32, changes: TaskChanges) -> Result<Task, AppError> {
        if changes.is_empty() {
            return self
                .find_task(id)
                .await?
                .ok_or_else(|| AppError::NotFound("Task not found".into()));
        }

        let mut builder = QueryBuilder::<Postgres>::new("UPDATE tasks SET ");
        let mut set = builder.separated(", ");
        if let Some(title) = changes.title {
            set.push("title = ").push_bind_unseparated(title);
        }
        if let Some(description) = changes.description {
            set.push("description = ").push_bind_unseparated(description);
        }
        if let Some(status) = changes.status {
            set.push("status = ").push_bind_unseparated(status);
        }
        if let Some(due_date) = changes.due_date {
            set.push("due_date = ").push_bind_unseparated(due_date);
        }
        if let Some(category) = changes.category {
            set.push("category = ").push_bind_unseparated(category);
        }
        if let Some(completed_at) = changes.completed_at {
            set.push("completed_at = ").push_bind_unseparated(completed_at);
        }
        if let Some(delete_request) = changes.delete_request {
            set.push("delete_request = ")
                .push_bind_unseparated(delete_request);
        }
        builder
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING ")
            .push(TASK_COLUMNS);

        builder
            .build_query_as::<Task>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Task not found".into()))
    }

    async fn delete_task(&self, id: i32) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn query_tasks(&self, query: &TaskQuery) -> Result<(Vec<Task>, i64), AppError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM tasks");
        push_task_conditions(&mut count, query);
        let total: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut select = QueryBuilder::<Postgres>::new("SELECT ");
        select.push(TASK_COLUMNS).push(" FROM tasks");
        push_task_conditions(&mut select, query);
        select.push(match query.order {
            TaskOrder::IdAsc => " ORDER BY id ASC",
            TaskOrder::IdDesc => " ORDER BY id DESC",
        });
        select
            .push(" OFFSET ")
            .push_bind(query.page.skip)
            .push(" LIMIT ")
            .push_bind(query.page.limit);

        let tasks = select
            .build_query_as::<Task>()
            .fetch_all(&self.pool)
            .await?;
        Ok((tasks, total))
    }
}
