mod routes;
mod sessions;
pub mod tasks;
mod types;
mod users;

pub use routes::{Route, RouteMeta};
pub use sessions::Credential;
pub use tasks::{Paginated, Task, TaskData, TaskForm, TaskId};
pub use types::UniqueId;
pub use users::{AuthResponse, Credentials, UserData, UserId, UserProfile};
