use async_trait::async_trait;

use crate::{
    api::{ApiClient, ApiError},
    app::repositories::AuthApi,
    model::{AuthResponse, Credentials, UserData, UserProfile},
};

#[async_trait]
impl AuthApi for ApiClient {
    async fn register(&self, user: &UserData) -> Result<AuthResponse, ApiError> {
        self.post("/auth/register/", Some(user)).await
    }

    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        self.post("/auth/login/", Some(credentials)).await
    }

    async fn logout(&self) -> Result<(), ApiError> {
        // The logout response body, if any, carries nothing we use.
        self.post::<serde_json::Value, ()>("/auth/logout/", None)
            .await
            .map(drop)
    }

    async fn fetch_profile(&self) -> Result<UserProfile, ApiError> {
        self.get("/auth/profile/", &[]).await
    }
}
