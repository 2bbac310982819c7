#![allow(dead_code)]

use actix_web::{
    body::MessageBody,
    cookie::Cookie,
    dev::{Service, ServiceResponse},
    middleware::NormalizePath,
    test, web, App,
};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};

use todo_api::{
    auth::{generate_access_token, session_cookie},
    config::TokenSecrets,
    mail::{Mailer, OutgoingEmail},
    models::{NewTask, NewUser, ProfileChanges, Role, Task, TaskCategory, TaskChanges, User},
    routes,
    store::{TaskOrder, TaskQuery, TaskStore, UserStore},
    AppError, AppState, Settings,
};

/// Cheap bcrypt cost for seeded accounts; the service itself hashes with its own cost.
const SEED_HASH_COST: u32 = 4;

pub const PASSWORD: &str = "Password123!";

/// `UserStore` + `TaskStore` held in memory, with the same filtering rules as
/// `PgStore`.
#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<Vec<User>>,
    tasks: Mutex<Vec<Task>>,
    next_task_id: AtomicI32,
}

impl MemoryStore {
    pub fn user(&self, id: i32) -> Option<User> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == id)
            .cloned()
    }

    pub fn task(&self, id: i32) -> Option<Task> {
        self.tasks
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == id)
            .cloned()
    }
}

fn duplicate() -> AppError {
    AppError::BadRequest("A record with this value already exists".into())
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        let mut users = self.users.lock().unwrap();
        if users
            .iter()
            .any(|u| u.username == user.username || u.email == user.email)
        {
            return Err(duplicate());
        }
        let created = User {
            id: users.len() as i32 + 1,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            first_name: user.first_name,
            last_name: user.last_name,
            contact_number: user.contact_number,
            gender: user.gender,
            is_active: false,
            created_at: Utc::now(),
        };
        users.push(created.clone());
        Ok(created)
    }

    async fn find_user_by_id(&self, id: i32) -> Result<Option<User>, AppError> {
        Ok(self.user(id))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn update_profile(&self, id: i32, changes: ProfileChanges) -> Result<User, AppError> {
        let mut users = self.users.lock().unwrap();
        if let Some(username) = &changes.username {
            if users.iter().any(|u| u.id != id && &u.username == username) {
                return Err(duplicate());
            }
        }
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;
        changes.apply_to(user);
        Ok(user.clone())
    }

    async fn set_password(&self, id: i32, password_hash: &str) -> Result<(), AppError> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn activate(&self, id: i32) -> Result<(), AppError> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;
        user.is_active = true;
        Ok(())
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn create_task(&self, task: NewTask) -> Result<Task, AppError> {
        let created = Task {
            id: self.next_task_id.fetch_add(1, Ordering::SeqCst) + 1,
            title: task.title,
            description: task.description,
            status: task.status,
            due_date: task.due_date,
            category: task.category,
            completed_at: task.completed_at,
            delete_request: false,
            owner_id: task.owner_id,
            created_at: Utc::now(),
        };
        self.tasks.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn find_task(&self, id: i32) -> Result<Option<Task>, AppError> {
        Ok(self.task(id))
    }

    async fn update_task(&self, id: i32, changes: TaskChanges) -> Result<Task, AppError> {
        let mut tasks = self.tasks.lock().unwrap();
        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| AppError::NotFound("Task not found".into()))?;
        changes.apply_to(task);
        Ok(task.clone())
    }

    async fn delete_task(&self, id: i32) -> Result<bool, AppError> {
        let mut tasks = self.tasks.lock().unwrap();
        let before = tasks.len();
        tasks.retain(|t| t.id != id);
        Ok(tasks.len() < before)
    }

    async fn query_tasks(&self, query: &TaskQuery) -> Result<(Vec<Task>, i64), AppError> {
        let mut matches: Vec<Task> = self
            .tasks
            .lock()
            .unwrap()
            .iter()
            .filter(|t| query.matches(t))
            .cloned()
            .collect();
        match query.order {
            TaskOrder::IdAsc => matches.sort_by_key(|t| t.id),
            TaskOrder::IdDesc => matches.sort_by_key(|t| std::cmp::Reverse(t.id)),
        }
        let total = matches.len() as i64;
        let page = matches
            .into_iter()
            .skip(query.page.skip as usize)
            .take(query.page.limit as usize)
            .collect();
        Ok((page, total))
    }
}

/// Keeps every message instead of sending it.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<OutgoingEmail> {
        self.sent.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), AppError> {
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

pub fn settings() -> Settings {
    Settings {
        secrets: TokenSecrets {
            access: "test-access-secret".into(),
            verification: "test-verification-secret".into(),
            reset_password: "test-reset-secret".into(),
        },
        public_url: "http://localhost:8080".into(),
        frontend_url: "http://localhost:3000".into(),
        cookie_secure: false,
        allow_admin_signup: false,
    }
}

pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
    pub state: web::Data<AppState>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_settings(settings())
    }

    pub fn with_settings(settings: Settings) -> Self {
        let store = Arc::new(MemoryStore::default());
        let mailer = Arc::new(RecordingMailer::default());
        let state = web::Data::new(AppState::new(
            store.clone(),
            store.clone(),
            mailer.clone(),
            settings,
        ));
        Self {
            store,
            mailer,
            state,
        }
    }

    pub fn secrets(&self) -> &TokenSecrets {
        &self.state.settings.secrets
    }

    /// Inserts an account directly, bypassing registration.
    pub async fn seed_user(&self, username: &str, role: Role, active: bool) -> User {
        let user = self
            .store
            .create_user(NewUser {
                username: username.to_string(),
                email: format!("{}@example.com", username),
                password_hash: bcrypt::hash(PASSWORD, SEED_HASH_COST).unwrap(),
                role,
                first_name: "Test".into(),
                last_name: "User".into(),
                contact_number: "+8801712345678".into(),
                gender: None,
            })
            .await
            .unwrap();
        if active {
            self.store.activate(user.id).await.unwrap();
        }
        self.store.user(user.id).unwrap()
    }

    pub async fn seed_task(&self, owner_id: i32, title: &str) -> Task {
        self.store
            .create_task(NewTask::new(
                title.to_string(),
                Some(format!("{} description", title)),
                false,
                None,
                TaskCategory::Low,
                owner_id,
            ))
            .await
            .unwrap()
    }

    /// A session cookie for `user`, as login would set it.
    pub fn cookie_for(&self, user: &User) -> Cookie<'static> {
        let token = generate_access_token(user.id, user.role, self.secrets()).unwrap();
        session_cookie(token, false)
    }
}

pub async fn init_app(
    state: web::Data<AppState>,
) -> impl Service<actix_http::Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error>
{
    test::init_service(
        App::new()
            .app_data(state)
            .wrap(NormalizePath::trim())
            .configure(routes::config),
    )
    .await
}

/// The first `href` in an email body, with HTML entities for `&` decoded.
pub fn emailed_link(html: &str) -> String {
    let start = html.find("href=\"").expect("email has a link") + "href=\"".len();
    let end = start + html[start..].find('"').expect("closing quote");
    html[start..end].replace("&#38;", "&").replace("&amp;", "&")
}

pub async fn json_body<B: MessageBody>(resp: ServiceResponse<B>) -> serde_json::Value {
    test::read_body_json(resp).await
}
