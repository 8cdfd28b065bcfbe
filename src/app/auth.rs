use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;

use crate::{
    api::{ApiError, ErrorPayload},
    model::{AuthResponse, Credential, Credentials, UserData, UserProfile},
    storage::ClientStorage,
};

use super::repositories::AuthApi;

/// Snapshot of the client's belief about who is logged in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub user: Option<UserProfile>,
    pub loading: bool,
    pub error: Option<ErrorPayload>,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

#[derive(Default)]
struct Inner {
    user: Option<UserProfile>,
    in_flight: usize,
    error: Option<ErrorPayload>,
}

/// Owns the current user, the stored credential and the auth operations.
///
/// Register, login and logout never return an error: failures land in
/// [`SessionState::error`] and the call returns `false`. Only
/// [`SessionManager::fetch_user_profile`] propagates its failure.
pub struct SessionManager {
    api: Arc<dyn AuthApi>,
    storage: ClientStorage,
    state: Mutex<Inner>,
}

/// Keeps `loading` raised for as long as it is alive.
struct InFlight<'a>(&'a SessionManager);

impl<'a> InFlight<'a> {
    fn begin(session: &'a SessionManager) -> Self {
        session.inner().in_flight += 1;
        Self(session)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut inner = self.0.inner();
        inner.in_flight = inner.in_flight.saturating_sub(1);
    }
}

impl SessionManager {
    pub fn new(api: Arc<dyn AuthApi>, storage: ClientStorage) -> Self {
        Self {
            api,
            storage,
            state: Mutex::new(Inner::default()),
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> SessionState {
        let inner = self.inner();

        SessionState {
            user: inner.user.clone(),
            loading: inner.in_flight > 0,
            error: inner.error.clone(),
        }
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.inner().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner().user.is_some()
    }

    pub fn loading(&self) -> bool {
        self.inner().in_flight > 0
    }

    pub fn error(&self) -> Option<ErrorPayload> {
        self.inner().error.clone()
    }

    pub fn clear_error(&self) {
        self.inner().error = None;
    }

    /// A credential is stored. It may be stale: only a loaded profile
    /// means the session is authenticated.
    pub fn has_stored_credential(&self) -> bool {
        self.storage.has_credential()
    }

    fn set_error(&self, error: ErrorPayload) {
        self.inner().error = Some(error);
    }

    fn clear_session(&self) {
        self.storage.clear_credential();
        self.inner().user = None;
    }

    fn store_token(&self, response: &AuthResponse) {
        match response.token.as_deref().map(Credential::from_str) {
            Some(Some(credential)) => self.storage.store_credential(&credential),
            Some(None) => log::warn!("Ignoring unusable token in auth response"),
            None => {}
        }
    }

    pub async fn register(&self, user: &UserData) -> bool {
        let _op = InFlight::begin(self);
        self.clear_error();
        log::debug!("Registering {}", user.username);

        let response = match self.api.register(user).await {
            Ok(response) => response,
            Err(err) => {
                log::error!("Registration failed: {}", err);
                self.set_error(ErrorPayload::from_api_error(&err, "Registration failed"));
                return false;
            }
        };

        self.store_token(&response);

        if let Err(err) = self.fetch_user_profile().await {
            self.set_error(ErrorPayload::from_api_error(&err, "Registration failed"));
            return false;
        }

        true
    }

    /// Succeeds only if the session is authenticated once the profile is in.
    ///
    /// Any failure clears both the user and the stored credential.
    pub async fn login(&self, credentials: &Credentials) -> bool {
        let _op = InFlight::begin(self);
        self.clear_error();
        log::debug!("Attempting login for {}", credentials.username);

        let outcome = match self.api.login(credentials).await {
            Ok(response) => {
                self.store_token(&response);
                log::debug!("Login accepted, fetching profile");

                match self.fetch_user_profile().await {
                    Ok(_) if self.is_authenticated() => Ok(()),
                    Ok(_) => Err(ErrorPayload::Message(
                        "Authentication failed after successful login".to_string(),
                    )),
                    Err(err) => Err(login_error(&err)),
                }
            }
            Err(err) => Err(login_error(&err)),
        };

        match outcome {
            Ok(()) => true,
            Err(error) => {
                log::error!("Login error: {}", error);
                self.set_error(error);
                self.clear_session();
                false
            }
        }
    }

    /// Always ends logged out locally, whatever the server answers.
    pub async fn logout(&self) {
        let _op = InFlight::begin(self);

        if let Err(err) = self.api.logout().await {
            log::error!("Logout error: {}", err);
        }

        self.clear_session();
        log::info!("Logged out");
    }

    /// Loads the profile for the stored credential.
    ///
    /// A `401` clears the credential and user before the error is returned.
    pub async fn fetch_user_profile(&self) -> Result<UserProfile, ApiError> {
        let _op = InFlight::begin(self);
        log::debug!("Fetching user profile");

        match self.api.fetch_profile().await {
            Ok(profile) => {
                self.inner().user = Some(profile.clone());
                Ok(profile)
            }
            Err(err) => {
                log::error!("Error fetching user profile: {}", err);
                if err.is_unauthorized() {
                    log::info!("Unauthorized, clearing auth state");
                    self.clear_session();
                }
                Err(err)
            }
        }
    }

    /// Restores the session from a stored credential, if any.
    ///
    /// Failure of any kind discards the credential; nothing is reported.
    pub async fn check_auth(&self) {
        if !self.storage.has_credential() {
            return;
        }

        if let Err(err) = self.fetch_user_profile().await {
            log::error!("Failed to restore session: {}", err);
            self.storage.clear_credential();
        }
    }

    /// [`Self::check_auth`] detached onto the runtime.
    pub fn spawn_check_auth(self: &Arc<Self>) -> JoinHandle<()> {
        let session = Arc::clone(self);

        tokio::spawn(async move { session.check_auth().await })
    }
}

fn login_error(err: &ApiError) -> ErrorPayload {
    ErrorPayload::from_api_error(err, "Login failed")
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::{app::testing::FakeServer, storage::InMemoryStore};

    fn setup() -> (Arc<FakeServer>, ClientStorage, SessionManager) {
        let storage = ClientStorage::new(Arc::new(InMemoryStore::new()));
        let server = Arc::new(FakeServer::new(storage.clone()));
        let session = SessionManager::new(server.clone(), storage.clone());
        (server, storage, session)
    }

    fn alice() -> Credentials {
        Credentials {
            username: "alice".to_string(),
            password: "s3cret!".to_string(),
        }
    }

    fn registration(username: &str) -> UserData {
        UserData {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password: "Passw0rd!".to_string(),
            password2: "Passw0rd!".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn login_stores_credential_and_loads_profile() {
        let (server, storage, session) = setup();
        server.add_user("alice", "s3cret!");

        assert!(session.login(&alice()).await);

        let state = session.state();
        assert!(state.is_authenticated());
        assert!(!state.loading);
        assert_eq!(state.error, None);
        assert_eq!(state.user.unwrap().username, "alice");
        assert!(storage.has_credential());
        assert_eq!(
            server.calls(),
            ["POST /auth/login/", "GET /auth/profile/"]
        );
    }

    #[tokio::test]
    async fn failed_login_leaves_session_anonymous() {
        let (server, storage, session) = setup();
        server.add_user("alice", "another password");

        assert!(!session.login(&alice()).await);

        assert!(!session.is_authenticated());
        assert!(!storage.has_credential());
        assert_eq!(
            session.error().unwrap().field("non_field_errors"),
            ["Unable to log in with provided credentials.".to_string()]
        );
    }

    #[tokio::test]
    async fn failed_login_discards_previously_stored_credential() {
        let (server, storage, session) = setup();
        server.add_user("alice", "s3cret!");
        assert!(session.login(&alice()).await);

        server.fail_next("login", 500, json!({"detail": "boom"}));
        assert!(!session.login(&alice()).await);

        assert!(!session.is_authenticated());
        assert!(!storage.has_credential());
        assert_eq!(
            session.error(),
            Some(ErrorPayload::Message("boom".to_string()))
        );
    }

    #[tokio::test]
    async fn login_failure_without_payload_uses_generic_message() {
        let (server, storage, session) = setup();
        server.add_user("alice", "s3cret!");
        server.fail_next("login", 502, serde_json::Value::Null);

        assert!(!session.login(&alice()).await);

        assert!(!storage.has_credential());
        assert_eq!(
            session.error(),
            Some(ErrorPayload::Message("Login failed".to_string()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn loading_stays_raised_through_login_and_profile() {
        let (server, _storage, session) = setup();
        server.add_user("alice", "s3cret!");
        server.delay("login", Duration::from_millis(100));
        server.delay("profile", Duration::from_millis(100));

        let observe = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let during_login = session.loading();
            tokio::time::sleep(Duration::from_millis(100)).await;
            let during_profile = session.loading();
            (during_login, during_profile)
        };
        let creds = alice();
        let (logged_in, (during_login, during_profile)) =
            tokio::join!(session.login(&creds), observe);

        assert!(logged_in);
        assert!(during_login);
        assert!(during_profile);
        assert!(!session.loading());
    }

    #[tokio::test]
    async fn login_without_token_in_response_fails_on_profile() {
        let (server, storage, session) = setup();
        server.add_user("alice", "s3cret!");
        server.omit_token_in_auth_responses();

        assert!(!session.login(&alice()).await);

        assert!(!session.is_authenticated());
        assert!(!storage.has_credential());
        assert_eq!(
            session.error(),
            Some(ErrorPayload::Message("Invalid token.".to_string()))
        );
    }

    #[tokio::test]
    async fn register_logs_the_new_user_in() {
        let (_server, storage, session) = setup();

        assert!(session.register(&registration("carol")).await);

        assert!(session.is_authenticated());
        assert!(storage.has_credential());
        assert_eq!(session.user().unwrap().email, "carol@example.com");
    }

    #[tokio::test]
    async fn register_validation_errors_are_kept_per_field() {
        let (server, storage, session) = setup();
        server.add_user("carol", "x");

        assert!(!session.register(&registration("carol")).await);

        assert!(!session.is_authenticated());
        assert!(!storage.has_credential());
        assert_eq!(
            session.error().unwrap().field("username"),
            ["A user with that username already exists.".to_string()]
        );
    }

    #[tokio::test]
    async fn register_failure_without_payload_uses_generic_message() {
        let (server, _storage, session) = setup();
        server.fail_next("register", 502, serde_json::Value::Null);

        assert!(!session.register(&registration("dave")).await);
        assert_eq!(
            session.error(),
            Some(ErrorPayload::Message("Registration failed".to_string()))
        );
    }

    #[tokio::test]
    async fn logout_clears_local_state_even_when_server_fails() {
        let (server, storage, session) = setup();
        server.add_user("alice", "s3cret!");
        assert!(session.login(&alice()).await);

        server.fail_next("logout", 503, json!({"detail": "unavailable"}));
        session.logout().await;

        assert!(!session.is_authenticated());
        assert!(!storage.has_credential());
        assert!(!session.loading());
    }

    #[tokio::test]
    async fn profile_401_clears_credential_and_still_errors() {
        let (server, storage, session) = setup();
        server.add_user("alice", "s3cret!");
        assert!(session.login(&alice()).await);

        server.revoke_all_sessions();
        let err = session.fetch_user_profile().await.unwrap_err();

        assert!(err.is_unauthorized());
        assert!(!session.is_authenticated());
        assert!(!storage.has_credential());
    }

    #[tokio::test]
    async fn profile_server_error_keeps_credential() {
        let (server, storage, session) = setup();
        server.add_user("alice", "s3cret!");
        assert!(session.login(&alice()).await);

        server.fail_next("profile", 500, json!({"detail": "db down"}));
        let err = session.fetch_user_profile().await.unwrap_err();

        assert_eq!(err.status(), Some(500));
        assert!(storage.has_credential());
        assert!(session.is_authenticated());
    }

    #[tokio::test]
    async fn check_auth_restores_session_from_stored_token() {
        let (server, storage, session) = setup();
        server.add_user("alice", "s3cret!");
        assert!(session.login(&alice()).await);

        // A fresh client process sharing the same durable storage.
        let restarted = Arc::new(SessionManager::new(server.clone(), storage.clone()));
        assert!(!restarted.is_authenticated());

        restarted.spawn_check_auth().await.unwrap();
        assert!(restarted.is_authenticated());
    }

    #[tokio::test]
    async fn check_auth_discards_token_on_any_failure() {
        let (server, storage, session) = setup();
        server.add_user("alice", "s3cret!");
        assert!(session.login(&alice()).await);

        let restarted = SessionManager::new(server.clone(), storage.clone());
        server.fail_next("profile", 500, json!({}));
        restarted.check_auth().await;

        assert!(!restarted.is_authenticated());
        assert!(!storage.has_credential());
    }

    #[tokio::test]
    async fn check_auth_without_token_makes_no_request() {
        let (server, _storage, session) = setup();

        session.check_auth().await;

        assert!(server.calls().is_empty());
    }
}
