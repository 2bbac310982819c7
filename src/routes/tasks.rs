use actix_web::{delete, get, post, put, web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use validator::Validate;

use crate::{
    auth::{
        policy::{require_admin, require_owner_or_admin},
        CurrentUser, MessageResponse,
    },
    error::AppError,
    models::{
        task::{parse_due_date, parse_future_due_date},
        NewTask, Task, TaskCategory, TaskChanges, TaskPage,
    },
    security::no_html,
    state::AppState,
    store::{Page, TaskOrder, TaskQuery},
};

/// Page size for listing and search endpoints.
const LIST_LIMIT: i64 = 25;
/// Page size for the filter endpoint.
const FILTER_LIMIT: i64 = 8;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskForm {
    #[validate(length(min = 1, max = 200), custom = "no_html")]
    pub title: String,
    #[validate(length(max = 1000), custom = "no_html")]
    pub description: Option<String>,
    pub status: Option<bool>,
    pub due_date: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTaskForm {
    #[validate(length(min = 1, max = 200), custom = "no_html")]
    pub title: Option<String>,
    #[validate(length(max = 1000), custom = "no_html")]
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: bool,
}

#[derive(Debug, Deserialize)]
pub struct CategoryForm {
    pub category: String,
}

/// `?query&skip&limit` for list and search endpoints.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

/// `?skip&limit` for endpoints without a search term.
#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct FilterParams {
    pub task_status: Option<String>,
    pub category: Option<String>,
    pub due_date: Option<String>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

/// Treats empty form and query values as absent.
fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_category(raw: &str) -> Result<TaskCategory, AppError> {
    raw.parse::<TaskCategory>().map_err(AppError::ValidationError)
}

/// Loads a task and checks the caller may act on it: 404 before 403.
async fn authorized_task(
    state: &AppState,
    caller: &CurrentUser,
    task_id: i32,
    action: &str,
) -> Result<Task, AppError> {
    let task = state
        .tasks
        .find_task(task_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))?;
    require_owner_or_admin(caller, task.owner_id, action)?;
    Ok(task)
}

async fn run_query(state: &AppState, query: TaskQuery) -> Result<TaskPage, AppError> {
    let (tasks, total) = state.tasks.query_tasks(&query).await?;
    Ok(TaskPage {
        tasks,
        total,
        skip: query.page.skip,
        limit: query.page.limit,
    })
}

/// Creates a task owned by the caller.
///
/// ## Responses:
/// - `201 Created`: the new `Task`.
/// - `401 Unauthorized`: no valid session.
/// - `422 Unprocessable Entity`: invalid title/description, unknown category, or a
///   due date that is malformed or not in the future.
#[post("/tasks")]
pub async fn create_task(
    state: web::Data<AppState>,
    caller: CurrentUser,
    form: web::Form<CreateTaskForm>,
) -> Result<HttpResponse, AppError> {
    form.validate()?;
    let form = form.into_inner();

    let due_date = non_empty(form.due_date)
        .map(|raw| parse_future_due_date(&raw, Utc::now()))
        .transpose()?;
    let category = match non_empty(form.category) {
        Some(raw) => parse_category(&raw)?,
        None => TaskCategory::default(),
    };

    let task = state
        .tasks
        .create_task(NewTask::new(
            form.title,
            non_empty(form.description),
            form.status.unwrap_or(false),
            due_date,
            category,
            caller.id,
        ))
        .await?;

    log::info!("User {} created task {}", caller.id, task.id);
    Ok(HttpResponse::Created().json(task))
}

/// Lists the caller's tasks (every task for admins), newest first.
///
/// `query` narrows the list to titles containing it, ignoring case.
#[get("/tasks")]
pub async fn list_tasks(
    state: web::Data<AppState>,
    caller: CurrentUser,
    params: web::Query<SearchParams>,
) -> Result<HttpResponse, AppError> {
    let params = params.into_inner();
    let page = Page::new(params.skip, params.limit, LIST_LIMIT)?;

    let mut query = TaskQuery::new(caller.owner_scope(), page);
    query.title_contains = non_empty(params.query);
    query.order = TaskOrder::IdDesc;

    Ok(HttpResponse::Ok().json(run_query(&state, query).await?))
}

#[get("/tasks/{id}")]
pub async fn get_task(
    state: web::Data<AppState>,
    caller: CurrentUser,
    task_id: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let task = authorized_task(&state, &caller, task_id.into_inner(), "view this task").await?;
    Ok(HttpResponse::Ok().json(task))
}

/// Partially updates a task. Absent fields are left unchanged, as are empty
/// description, due date and category values.
#[put("/tasks/{id}")]
pub async fn update_task(
    state: web::Data<AppState>,
    caller: CurrentUser,
    task_id: web::Path<i32>,
    form: web::Form<UpdateTaskForm>,
) -> Result<HttpResponse, AppError> {
    let task = authorized_task(&state, &caller, task_id.into_inner(), "update this task").await?;
    form.validate()?;
    let form = form.into_inner();

    let changes = TaskChanges {
        title: form.title,
        description: non_empty(form.description),
        due_date: non_empty(form.due_date)
            .map(|raw| parse_future_due_date(&raw, Utc::now()))
            .transpose()?,
        category: non_empty(form.category)
            .map(|raw| parse_category(&raw))
            .transpose()?,
        ..Default::default()
    };

    let updated = state.tasks.update_task(task.id, changes).await?;
    log::info!("User {} updated task {}", caller.id, updated.id);
    Ok(HttpResponse::Ok().json(updated))
}

/// Deletes a task. Admins only; owners flag tasks with a delete request instead.
#[delete("/tasks/{id}")]
pub async fn delete_task(
    state: web::Data<AppState>,
    caller: CurrentUser,
    task_id: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let task_id = task_id.into_inner();
    require_admin(&caller, "delete tasks")?;

    if !state.tasks.delete_task(task_id).await? {
        return Err(AppError::NotFound("Task not found".into()));
    }

    log::info!("Admin {} deleted task {}", caller.id, task_id);
    Ok(HttpResponse::Ok().json(MessageResponse::new("Task deleted successfully")))
}

/// Marks a task done or not done; `completed_at` follows the new status.
#[put("/change-status/{id}")]
pub async fn change_status(
    state: web::Data<AppState>,
    caller: CurrentUser,
    task_id: web::Path<i32>,
    form: web::Form<StatusForm>,
) -> Result<HttpResponse, AppError> {
    let task = authorized_task(&state, &caller, task_id.into_inner(), "update this task").await?;
    let updated = state
        .tasks
        .update_task(task.id, TaskChanges::status(form.status))
        .await?;
    log::info!("Task {} status set to {}", updated.id, updated.status);
    Ok(HttpResponse::Ok().json(updated))
}

#[put("/change-category/{id}")]
pub async fn change_category(
    state: web::Data<AppState>,
    caller: CurrentUser,
    task_id: web::Path<i32>,
    form: web::Form<CategoryForm>,
) -> Result<HttpResponse, AppError> {
    let task = authorized_task(&state, &caller, task_id.into_inner(), "update this task").await?;
    let category = form
        .category
        .parse::<TaskCategory>()
        .map_err(AppError::BadRequest)?;
    let updated = state
        .tasks
        .update_task(task.id, TaskChanges::category(category))
        .await?;
    log::info!("Task {} category set to {}", updated.id, updated.category);
    Ok(HttpResponse::Ok().json(updated))
}

/// Flags a task so an admin can delete it.
#[put("/task-delete-request/{id}")]
pub async fn request_delete(
    state: web::Data<AppState>,
    caller: CurrentUser,
    task_id: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let task = authorized_task(
        &state,
        &caller,
        task_id.into_inner(),
        "request deletion of this task",
    )
    .await?;
    let updated = state
        .tasks
        .update_task(task.id, TaskChanges::delete_request())
        .await?;
    log::info!("User {} requested deletion of task {}", caller.id, updated.id);
    Ok(HttpResponse::Ok().json(updated))
}

#[get("/delete-requested-tasks")]
pub async fn delete_requested_tasks(
    state: web::Data<AppState>,
    caller: CurrentUser,
    params: web::Query<PageParams>,
) -> Result<HttpResponse, AppError> {
    require_admin(&caller, "view delete requests")?;
    let page = Page::new(params.skip, params.limit, LIST_LIMIT)?;

    let mut query = TaskQuery::new(None, page);
    query.delete_requested = Some(true);

    Ok(HttpResponse::Ok().json(run_query(&state, query).await?))
}

#[get("/search-delete-requested-tasks")]
pub async fn search_delete_requested_tasks(
    state: web::Data<AppState>,
    caller: CurrentUser,
    params: web::Query<SearchParams>,
) -> Result<HttpResponse, AppError> {
    require_admin(&caller, "view delete requests")?;
    let params = params.into_inner();
    let page = Page::new(params.skip, params.limit, LIST_LIMIT)?;

    let mut query = TaskQuery::new(None, page);
    query.delete_requested = Some(true);
    query.text_contains = non_empty(params.query);

    Ok(HttpResponse::Ok().json(run_query(&state, query).await?))
}

/// Searches title, description and due date text, ignoring case.
#[get("/search")]
pub async fn search_tasks(
    state: web::Data<AppState>,
    caller: CurrentUser,
    params: web::Query<SearchParams>,
) -> Result<HttpResponse, AppError> {
    let params = params.into_inner();
    log::info!(
        "Searching tasks with query: {:?}, skip: {:?}, limit: {:?}",
        params.query,
        params.skip,
        params.limit
    );
    let page = Page::new(params.skip, params.limit, LIST_LIMIT)?;

    let mut query = TaskQuery::new(caller.owner_scope(), page);
    query.text_contains = non_empty(params.query);

    Ok(HttpResponse::Ok().json(run_query(&state, query).await?))
}

/// Filters by status, category and due date; empty parameters are ignored.
///
/// `task_status` is `true` only for a case-insensitive `"true"`; `due_date` keeps
/// tasks due on or before the given instant.
#[get("/filter")]
pub async fn filter_tasks(
    state: web::Data<AppState>,
    caller: CurrentUser,
    params: web::Query<FilterParams>,
) -> Result<HttpResponse, AppError> {
    let params = params.into_inner();
    log::info!(
        "Filter tasks called with task_status={:?}, category={:?}, due_date={:?}, user_id={}",
        params.task_status,
        params.category,
        params.due_date,
        caller.id
    );
    let page = Page::new(params.skip, params.limit, FILTER_LIMIT)?;

    let mut query = TaskQuery::new(caller.owner_scope(), page);
    query.status = non_empty(params.task_status).map(|raw| raw.eq_ignore_ascii_case("true"));
    query.category = non_empty(params.category)
        .map(|raw| parse_category(&raw))
        .transpose()?;
    query.due_before = non_empty(params.due_date)
        .map(|raw| parse_due_date(&raw))
        .transpose()?;

    Ok(HttpResponse::Ok().json(run_query(&state, query).await?))
}
