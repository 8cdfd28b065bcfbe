use serde::{Deserialize, Serialize};

use super::UniqueId;

pub type UserId = UniqueId;

/// Profile returned by `GET /auth/profile/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

/// Registration form payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserData {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password2: String,
    pub first_name: String,
    pub last_name: String,
}

/// Login form payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Body returned by the login and registration endpoints.
///
/// Only the token is read; any other fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub token: Option<String>,
}
