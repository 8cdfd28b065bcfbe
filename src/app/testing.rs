//! In-memory stand-in for the remote API, used by the manager tests.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
    time::Duration,
};

use async_trait::async_trait;
use rand::Rng;
use serde_json::json;

use crate::{
    api::ApiError,
    app::repositories::{AuthApi, TasksApi},
    model::{
        AuthResponse, Credential, Credentials, Paginated, Task, TaskData, TaskId, UserData, UserId,
        UserProfile,
    },
    storage::ClientStorage,
};

fn generate_token() -> String {
    let mut rng = rand::thread_rng();

    let mut bytes: [u8; 20] = [0; 20];
    bytes.iter_mut().for_each(|b| *b = rng.gen());

    hex::encode(bytes)
}

struct UserRecord {
    password: String,
    profile: UserProfile,
}

#[derive(Default)]
struct ServerState {
    users: HashMap<String, UserRecord>,
    sessions: HashMap<String, String>,
    tasks: Vec<Task>,
    next_id: i64,
    calls: Vec<String>,
    failures: HashMap<&'static str, (u16, String)>,
    page_delays: HashMap<u32, Duration>,
    delays: HashMap<&'static str, Duration>,
    omit_token: bool,
}

/// Fake task API server.
///
/// Reads the credential from the same [`ClientStorage`] the managers write
/// to, the way the real adapter decorates each request.
pub struct FakeServer {
    storage: ClientStorage,
    state: Mutex<ServerState>,
}

impl FakeServer {
    pub fn new(storage: ClientStorage) -> Self {
        Self {
            storage,
            state: Mutex::new(ServerState {
                next_id: 1,
                ..Default::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap()
    }

    pub fn add_user(&self, username: &str, password: &str) -> UserProfile {
        let mut state = self.state();
        let profile = UserProfile {
            id: UserId::from_raw(state.users.len() as i64 + 1),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            first_name: String::new(),
            last_name: String::new(),
        };
        state.users.insert(
            username.to_string(),
            UserRecord {
                password: password.to_string(),
                profile: profile.clone(),
            },
        );
        profile
    }

    /// Creates `username` and stores a valid credential for it.
    pub fn login_as(&self, username: &str) -> UserProfile {
        let profile = self.add_user(username, "password");
        let token = self.open_session(username).token.unwrap();
        self.storage
            .store_credential(&Credential::from_str(&token).unwrap());
        profile
    }

    /// Seeds tasks titled `"task 1" ..= "task n"`.
    pub fn add_tasks(&self, n: usize) -> Vec<Task> {
        (0..n)
            .map(|_| {
                let mut state = self.state();
                let title = format!("task {}", state.next_id);
                insert_task(&mut state, TaskData::new(title))
            })
            .collect()
    }

    pub fn task_count(&self) -> usize {
        self.state().tasks.len()
    }

    /// Invalidates every issued token, as a server-side logout elsewhere would.
    pub fn revoke_all_sessions(&self) {
        self.state().sessions.clear();
    }

    /// Next call of `endpoint` answers with `status` and a JSON body.
    pub fn fail_next(&self, endpoint: &'static str, status: u16, body: serde_json::Value) {
        self.state()
            .failures
            .insert(endpoint, (status, body.to_string()));
    }

    pub fn delay_page(&self, page: u32, delay: Duration) {
        self.state().page_delays.insert(page, delay);
    }

    /// Every call of `endpoint` sleeps for `delay` before answering.
    pub fn delay(&self, endpoint: &'static str, delay: Duration) {
        self.state().delays.insert(endpoint, delay);
    }

    pub fn omit_token_in_auth_responses(&self) {
        self.state().omit_token = true;
    }

    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    fn begin(&self, endpoint: &'static str, call: String) -> Result<(), ApiError> {
        let mut state = self.state();
        state.calls.push(call);

        match state.failures.remove(endpoint) {
            Some((status, body)) => Err(ApiError::from_status(status, body)),
            None => Ok(()),
        }
    }

    async fn pause(&self, endpoint: &'static str) {
        let delay = self.state().delays.get(endpoint).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn authorized_user(&self) -> Result<UserProfile, ApiError> {
        let unauthorized =
            || ApiError::from_status(401, json!({"detail": "Invalid token."}).to_string());

        let credential = self.storage.credential().ok_or_else(unauthorized)?;
        let state = self.state();
        let username = state
            .sessions
            .get(credential.as_str())
            .ok_or_else(unauthorized)?;

        Ok(state.users[username].profile.clone())
    }

    fn open_session(&self, username: &str) -> AuthResponse {
        let mut state = self.state();
        let token = generate_token();
        state.sessions.insert(token.clone(), username.to_string());

        AuthResponse {
            token: (!state.omit_token).then_some(token),
        }
    }
}

fn insert_task(state: &mut ServerState, data: TaskData) -> Task {
    let task = Task {
        id: TaskId::from_raw(state.next_id),
        title: data.title,
        description: data.description,
        due_date: data.due_date,
        completed: data.completed,
    };
    state.next_id += 1;
    state.tasks.push(task.clone());
    task
}

fn not_found() -> ApiError {
    ApiError::from_status(404, json!({"detail": "Not found."}).to_string())
}

#[async_trait]
impl AuthApi for FakeServer {
    async fn register(&self, user: &UserData) -> Result<AuthResponse, ApiError> {
        self.begin("register", "POST /auth/register/".to_string())?;

        if self.state().users.contains_key(&user.username) {
            return Err(ApiError::from_status(
                400,
                json!({"username": ["A user with that username already exists."]}).to_string(),
            ));
        }
        if user.password != user.password2 {
            return Err(ApiError::from_status(
                400,
                json!({"password": ["Password fields didn't match."]}).to_string(),
            ));
        }

        self.add_user(&user.username, &user.password);
        Ok(self.open_session(&user.username))
    }

    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        self.begin("login", "POST /auth/login/".to_string())?;
        self.pause("login").await;

        let valid = self
            .state()
            .users
            .get(&credentials.username)
            .map_or(false, |u| u.password == credentials.password);

        if !valid {
            return Err(ApiError::from_status(
                400,
                json!({"non_field_errors": ["Unable to log in with provided credentials."]})
                    .to_string(),
            ));
        }

        Ok(self.open_session(&credentials.username))
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.begin("logout", "POST /auth/logout/".to_string())?;

        if let Some(credential) = self.storage.credential() {
            self.state().sessions.remove(credential.as_str());
        }
        Ok(())
    }

    async fn fetch_profile(&self) -> Result<UserProfile, ApiError> {
        self.begin("profile", "GET /auth/profile/".to_string())?;
        self.pause("profile").await;

        self.authorized_user()
    }
}

#[async_trait]
impl TasksApi for FakeServer {
    async fn fetch_tasks(&self, page: u32, page_size: u32) -> Result<Paginated<Task>, ApiError> {
        self.begin(
            "tasks",
            format!("GET /tasks/?page={page}&page_size={page_size}"),
        )?;
        self.authorized_user()?;

        let delay = self.state().page_delays.get(&page).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.state();
        let start = (page.saturating_sub(1) * page_size) as usize;
        if page == 0 || (page > 1 && start >= state.tasks.len()) {
            return Err(ApiError::from_status(
                404,
                json!({"detail": "Invalid page."}).to_string(),
            ));
        }

        let results: Vec<Task> = state
            .tasks
            .iter()
            .skip(start)
            .take(page_size as usize)
            .cloned()
            .collect();

        Ok(Paginated {
            count: state.tasks.len() as u64,
            next: None,
            previous: None,
            results,
        })
    }

    async fn fetch_task(&self, task_id: TaskId) -> Result<Task, ApiError> {
        self.begin("task", format!("GET /tasks/{task_id}/"))?;
        self.authorized_user()?;

        self.state()
            .tasks
            .iter()
            .find(|t| t.id == task_id)
            .cloned()
            .ok_or_else(not_found)
    }

    async fn create_task(&self, data: &TaskData) -> Result<Task, ApiError> {
        self.begin("create", "POST /tasks/".to_string())?;
        self.pause("create").await;
        self.authorized_user()?;

        if data.title.trim().is_empty() {
            return Err(ApiError::from_status(
                400,
                json!({"title": ["This field may not be blank."]}).to_string(),
            ));
        }

        Ok(insert_task(&mut self.state(), data.clone()))
    }

    async fn update_task(&self, task_id: TaskId, data: &TaskData) -> Result<Task, ApiError> {
        self.begin("update", format!("PUT /tasks/{task_id}/"))?;
        self.authorized_user()?;

        let mut state = self.state();
        let task = state
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(not_found)?;

        task.title = data.title.clone();
        task.description = data.description.clone();
        task.due_date = data.due_date;
        task.completed = data.completed;
        Ok(task.clone())
    }

    async fn delete_task(&self, task_id: TaskId) -> Result<(), ApiError> {
        self.begin("delete", format!("DELETE /tasks/{task_id}/"))?;
        self.authorized_user()?;

        let mut state = self.state();
        let before = state.tasks.len();
        state.tasks.retain(|t| t.id != task_id);

        if state.tasks.len() == before {
            return Err(not_found());
        }
        Ok(())
    }
}
