use async_trait::async_trait;

use crate::{
    api::{ApiClient, ApiError},
    app::repositories::TasksApi,
    model::{Paginated, Task, TaskData, TaskId},
};

fn task_path(task_id: TaskId) -> String {
    format!("/tasks/{}/", task_id)
}

#[async_trait]
impl TasksApi for ApiClient {
    async fn fetch_tasks(&self, page: u32, page_size: u32) -> Result<Paginated<Task>, ApiError> {
        let query = [("page", page.to_string()), ("page_size", page_size.to_string())];

        self.get("/tasks/", &query).await
    }

    async fn fetch_task(&self, task_id: TaskId) -> Result<Task, ApiError> {
        self.get(&task_path(task_id), &[]).await
    }

    async fn create_task(&self, data: &TaskData) -> Result<Task, ApiError> {
        self.post("/tasks/", Some(data)).await
    }

    async fn update_task(&self, task_id: TaskId, data: &TaskData) -> Result<Task, ApiError> {
        self.put(&task_path(task_id), data).await
    }

    async fn delete_task(&self, task_id: TaskId) -> Result<(), ApiError> {
        self.delete::<serde_json::Value>(&task_path(task_id))
            .await
            .map(drop)
    }
}
