use std::{sync::Arc, time::Duration};

use crate::{model::Route, storage::ClientStorage};

use super::auth::SessionManager;

/// How long after the splash view was shown it is skipped on launch.
pub const DEFAULT_LOADING_COOLDOWN: Duration = Duration::from_secs(12 * 60 * 60);

/// Source of the current wall-clock time, in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Outcome of a guard check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Allow,
    Redirect(Route),
}

/// Decides, before each view transition, whether it may proceed.
///
/// Only a loaded profile counts as authenticated. A stored credential is
/// used as a hint for where the splash redirects, and triggers a profile
/// load before any access decision is made.
pub struct NavigationGuard {
    session: Arc<SessionManager>,
    storage: ClientStorage,
    clock: Arc<dyn Clock>,
    cooldown: Duration,
}

impl NavigationGuard {
    pub fn new(session: Arc<SessionManager>, storage: ClientStorage) -> Self {
        Self {
            session,
            storage,
            clock: Arc::new(SystemClock),
            cooldown: DEFAULT_LOADING_COOLDOWN,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// True while the last splash is more recent than the cooldown.
    pub fn should_skip_loading(&self) -> bool {
        let Some(last_shown) = self.storage.last_loading_time() else {
            return false;
        };

        let elapsed = self.clock.now_millis().saturating_sub(last_shown);
        i128::from(elapsed) < self.cooldown.as_millis() as i128
    }

    /// Starts a new cooldown window; called when the splash view finishes.
    pub fn record_splash_shown(&self) {
        self.storage.set_last_loading_time(self.clock.now_millis());
    }

    fn after_splash(&self) -> Route {
        if self.session.is_authenticated() || self.storage.has_credential() {
            Route::Tasks
        } else {
            Route::Login
        }
    }

    pub async fn before_each(&self, from: &Route, to: &Route) -> Navigation {
        log::debug!("Route navigation: {} -> {}", from, to);

        let decision = self.decide(to).await;
        if let Navigation::Redirect(target) = &decision {
            log::info!("Redirecting {} -> {}", to, target);
        }
        decision
    }

    async fn decide(&self, to: &Route) -> Navigation {
        let meta = to.meta();

        if meta.is_loading {
            if self.should_skip_loading() {
                return Navigation::Redirect(self.after_splash());
            }
            return Navigation::Allow;
        }

        if *to == Route::Root {
            if self.should_skip_loading() {
                return Navigation::Redirect(self.after_splash());
            }
            return Navigation::Redirect(Route::Loading);
        }

        if self.storage.has_credential() && !self.session.is_authenticated() {
            if let Err(err) = self.session.fetch_user_profile().await {
                log::info!("Stored credential rejected ({}), sending to login", err);
                self.storage.clear_credential();
                return Navigation::Redirect(Route::Login);
            }
        }

        let authenticated = self.session.is_authenticated();

        if meta.requires_auth && !authenticated {
            return Navigation::Redirect(Route::Login);
        }

        if meta.requires_guest && authenticated {
            return Navigation::Redirect(Route::Tasks);
        }

        Navigation::Allow
    }
}
