use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use crate::model::Route;

use super::guard::{Navigation, NavigationGuard};

/// Redirects followed before a navigation is abandoned.
const MAX_REDIRECTS: usize = 8;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum NavigationError {
    #[error("navigation to {path} redirected more than {limit} times")]
    RedirectLoop { path: String, limit: usize },
}

/// Tracks the current view and resolves navigations through the guard.
///
/// A redirect is a fresh navigation: the guard runs again for the target.
pub struct Router {
    guard: NavigationGuard,
    current: Mutex<Route>,
}

impl Router {
    pub fn new(guard: NavigationGuard) -> Self {
        Self {
            guard,
            current: Mutex::new(Route::Root),
        }
    }

    fn current_route(&self) -> MutexGuard<'_, Route> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn current(&self) -> Route {
        self.current_route().clone()
    }

    pub fn guard(&self) -> &NavigationGuard {
        &self.guard
    }

    /// Navigates to `path`, returning the route that was finally entered.
    pub async fn push(&self, path: &str) -> Result<Route, NavigationError> {
        let from = self.current();
        let mut to = Route::from_path(path);

        for _ in 0..=MAX_REDIRECTS {
            match self.guard.before_each(&from, &to).await {
                Navigation::Allow => {
                    *self.current_route() = to.clone();
                    return Ok(to);
                }
                Navigation::Redirect(target) => to = target,
            }
        }

        log::error!("Abandoning navigation to {}: too many redirects", path);
        Err(NavigationError::RedirectLoop {
            path: path.to_string(),
            limit: MAX_REDIRECTS,
        })
    }
}
