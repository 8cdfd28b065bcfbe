use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{
    api::ErrorPayload,
    model::{Task, TaskData, TaskForm, TaskId},
};

use super::{pagination, repositories::TasksApi};

pub const DEFAULT_PAGE_SIZE: u32 = 5;

/// Snapshot of the paginated task view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskView {
    pub items: Vec<Task>,
    pub total_count: u64,
    pub current_page: u32,
    pub page_size: u32,
    pub current_task: Option<Task>,
    pub loading: bool,
    pub error: Option<ErrorPayload>,
}

impl TaskView {
    pub fn total_pages(&self) -> u32 {
        pagination::total_pages(self.total_count, self.page_size)
    }
}

struct Inner {
    items: Vec<Task>,
    total_count: u64,
    current_page: u32,
    current_task: Option<Task>,
    in_flight: usize,
    error: Option<ErrorPayload>,
    latest_fetch: u64,
}

/// Read replica of one page of the user's tasks.
///
/// Mutations never patch `items` locally: each successful create, update or
/// delete is followed by a re-fetch, and the view is authoritative again only
/// once that fetch lands. Page fetches are sequenced; a response to anything
/// but the most recently issued fetch is dropped.
pub struct TaskCollection {
    api: Arc<dyn TasksApi>,
    page_size: u32,
    state: Mutex<Inner>,
}

struct InFlight<'a>(&'a TaskCollection);

impl<'a> InFlight<'a> {
    fn begin(tasks: &'a TaskCollection) -> Self {
        let mut inner = tasks.inner();
        inner.in_flight += 1;
        inner.error = None;
        Self(tasks)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut inner = self.0.inner();
        inner.in_flight = inner.in_flight.saturating_sub(1);
    }
}

impl TaskCollection {
    pub fn new(api: Arc<dyn TasksApi>, page_size: u32) -> Self {
        Self {
            api,
            page_size: page_size.max(1),
            state: Mutex::new(Inner {
                items: Vec::new(),
                total_count: 0,
                current_page: 1,
                current_task: None,
                in_flight: 0,
                error: None,
                latest_fetch: 0,
            }),
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn view(&self) -> TaskView {
        let inner = self.inner();

        TaskView {
            items: inner.items.clone(),
            total_count: inner.total_count,
            current_page: inner.current_page,
            page_size: self.page_size,
            current_task: inner.current_task.clone(),
            loading: inner.in_flight > 0,
            error: inner.error.clone(),
        }
    }

    pub fn items(&self) -> Vec<Task> {
        self.inner().items.clone()
    }

    pub fn total_count(&self) -> u64 {
        self.inner().total_count
    }

    pub fn current_page(&self) -> u32 {
        self.inner().current_page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn current_task(&self) -> Option<Task> {
        self.inner().current_task.clone()
    }

    pub fn loading(&self) -> bool {
        self.inner().in_flight > 0
    }

    pub fn error(&self) -> Option<ErrorPayload> {
        self.inner().error.clone()
    }

    pub fn total_pages(&self) -> u32 {
        pagination::total_pages(self.total_count(), self.page_size)
    }

    /// Page numbers for the pagination control.
    pub fn page_numbers(&self) -> Vec<u32> {
        pagination::page_window(self.current_page(), self.total_pages())
    }

    /// Replaces the view with `page`. On failure the view is emptied.
    pub async fn fetch_tasks(&self, page: u32) {
        let _op = InFlight::begin(self);
        let ticket = {
            let mut inner = self.inner();
            inner.latest_fetch += 1;
            inner.latest_fetch
        };

        let result = self.api.fetch_tasks(page, self.page_size).await;

        let mut inner = self.inner();
        if ticket != inner.latest_fetch {
            log::debug!("Discarding superseded response for page {}", page);
            return;
        }

        match result {
            Ok(data) => {
                inner.items = data.results;
                inner.total_count = data.count;
                inner.current_page = page;
            }
            Err(err) => {
                log::error!("Error fetching tasks: {}", err);
                inner.error = Some(ErrorPayload::message_or(&err, "Failed to fetch tasks"));
                inner.items.clear();
            }
        }
    }

    pub async fn refresh(&self) {
        self.fetch_tasks(self.current_page()).await
    }

    /// Fetches `page` if it exists; returns whether a fetch was issued.
    pub async fn go_to_page(&self, page: u32) -> bool {
        if page < 1 || page > self.total_pages() {
            return false;
        }

        self.fetch_tasks(page).await;
        true
    }

    /// Loads one task into `current_task`.
    pub async fn fetch_task(&self, task_id: TaskId) -> Option<Task> {
        let _op = InFlight::begin(self);

        match self.api.fetch_task(task_id).await {
            Ok(task) => {
                self.inner().current_task = Some(task.clone());
                Some(task)
            }
            Err(err) => {
                log::error!("Error fetching task {}: {}", task_id, err);
                self.inner().error =
                    Some(ErrorPayload::from_api_error(&err, "Failed to fetch task"));
                None
            }
        }
    }

    pub async fn create_task(&self, data: &TaskData) -> Option<Task> {
        let _op = InFlight::begin(self);

        match self.api.create_task(data).await {
            Ok(task) => {
                self.refresh().await;
                Some(task)
            }
            Err(err) => {
                log::error!("Error creating task: {}", err);
                self.inner().error =
                    Some(ErrorPayload::message_or(&err, "Failed to create task"));
                None
            }
        }
    }

    /// Full-replace update of `task_id`.
    pub async fn update_task(&self, task_id: TaskId, data: &TaskData) -> Option<Task> {
        let _op = InFlight::begin(self);

        match self.api.update_task(task_id, data).await {
            Ok(task) => {
                self.refresh().await;

                let mut inner = self.inner();
                if inner.current_task.as_ref().map(|t| t.id) == Some(task_id) {
                    inner.current_task = Some(task.clone());
                }
                Some(task)
            }
            Err(err) => {
                log::error!("Error updating task {}: {}", task_id, err);
                self.inner().error =
                    Some(ErrorPayload::from_api_error(&err, "Failed to update task"));
                None
            }
        }
    }

    /// Deletes `task_id` and re-fetches.
    ///
    /// When the deleted task was the only one on a page past the first, the
    /// previous page is fetched instead of the now-empty current one.
    pub async fn delete_task(&self, task_id: TaskId) -> bool {
        let _op = InFlight::begin(self);

        if let Err(err) = self.api.delete_task(task_id).await {
            log::error!("Error deleting task {}: {}", task_id, err);
            self.inner().error =
                Some(ErrorPayload::from_api_error(&err, "Failed to delete task"));
            return false;
        }

        let (page, was_last_on_page) = {
            let inner = self.inner();
            (inner.current_page, inner.items.len() == 1)
        };

        if was_last_on_page && page > 1 {
            self.fetch_tasks(page - 1).await;
        } else {
            self.fetch_tasks(page).await;
        }

        let mut inner = self.inner();
        if inner.current_task.as_ref().map(|t| t.id) == Some(task_id) {
            inner.current_task = None;
        }
        true
    }

    /// Flips `completed` on `task`, keeping its other fields.
    pub async fn toggle_completed(&self, task: &Task) -> Option<Task> {
        let data = TaskData {
            completed: !task.completed,
            ..TaskData::from(task)
        };

        self.update_task(task.id, &data).await
    }

    /// Updates when the form names a task, creates otherwise.
    pub async fn save_task(&self, form: &TaskForm) -> bool {
        match form.id {
            Some(task_id) => self.update_task(task_id, &form.data).await.is_some(),
            None => self.create_task(&form.data).await.is_some(),
        }
    }
}
