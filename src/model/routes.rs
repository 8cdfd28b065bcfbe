use std::fmt;

/// Client-side view routes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    Root,
    Loading,
    Login,
    Register,
    Tasks,
    NotFound(String),
}

/// Access flags attached to a route.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteMeta {
    pub requires_auth: bool,
    pub requires_guest: bool,
    pub is_loading: bool,
}

impl Route {
    pub fn from_path(path: &str) -> Route {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');

        match trimmed {
            "" => Route::Root,
            "/loading" => Route::Loading,
            "/auth/login" => Route::Login,
            "/auth/register" => Route::Register,
            "/tasks" => Route::Tasks,
            _ => Route::NotFound(path.to_string()),
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Route::Root => "/",
            Route::Loading => "/loading",
            Route::Login => "/auth/login",
            Route::Register => "/auth/register",
            Route::Tasks => "/tasks",
            Route::NotFound(path) => path,
        }
    }

    pub fn meta(&self) -> RouteMeta {
        match self {
            Route::Loading => RouteMeta {
                is_loading: true,
                ..Default::default()
            },
            Route::Login | Route::Register => RouteMeta {
                requires_guest: true,
                ..Default::default()
            },
            Route::Tasks => RouteMeta {
                requires_auth: true,
                ..Default::default()
            },
            Route::Root | Route::NotFound(_) => RouteMeta::default(),
        }
    }

    /// Window title for the view rendered at this route.
    pub fn title(&self) -> String {
        let name = match self {
            Route::Root => None,
            Route::Loading => Some("Welcome"),
            Route::Login => Some("Login"),
            Route::Register => Some("Register"),
            Route::Tasks => Some("Tasks"),
            Route::NotFound(_) => Some("Not Found"),
        };

        match name {
            Some(name) => format!("{name} | Task Manager"),
            None => "Task Manager".to_string(),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}
