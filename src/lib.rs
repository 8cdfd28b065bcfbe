//! Client for a task-management REST API.
//!
//! [`app::auth::SessionManager`] owns the login state and stored credential,
//! [`app::tasks::TaskCollection`] keeps one page of tasks in sync with the
//! server, and [`app::guard::NavigationGuard`] decides which view a user
//! may enter. All of them talk to the server through [`api::ApiClient`].

pub mod api;
pub mod app;
pub mod config;
pub mod model;
pub mod storage;
