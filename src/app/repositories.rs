use async_trait::async_trait;

use crate::{
    api::ApiError,
    model::{AuthResponse, Credentials, Paginated, Task, TaskData, TaskId, UserData, UserProfile},
};

/// Durable client-side key/value storage (survives restarts).
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;

    fn remove(&self, key: &str) -> anyhow::Result<()>;
}

/// Remote authentication endpoints.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn register(&self, user: &UserData) -> Result<AuthResponse, ApiError>;

    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError>;

    async fn logout(&self) -> Result<(), ApiError>;

    async fn fetch_profile(&self) -> Result<UserProfile, ApiError>;
}

/// Remote task endpoints.
#[async_trait]
pub trait TasksApi: Send + Sync {
    async fn fetch_tasks(&self, page: u32, page_size: u32) -> Result<Paginated<Task>, ApiError>;

    async fn fetch_task(&self, task_id: TaskId) -> Result<Task, ApiError>;

    async fn create_task(&self, data: &TaskData) -> Result<Task, ApiError>;

    async fn update_task(&self, task_id: TaskId, data: &TaskData) -> Result<Task, ApiError>;

    async fn delete_task(&self, task_id: TaskId) -> Result<(), ApiError>;
}
