use std::fmt;

/// Opaque bearer token proving session identity to the server.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn from_str(token: &str) -> Option<Credential> {
        let token = token.trim();

        if !Self::is_valid_token(token) {
            return None;
        }

        Some(Self(token.to_string()))
    }

    fn is_valid_token(token: &str) -> bool {
        // Tokens are sent verbatim in a header value.
        !token.is_empty() && token.chars().all(|c| c.is_ascii_graphic())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value of the `Authorization` header carrying this credential.
    pub fn authorization_header(&self) -> String {
        format!("Token {}", self.0)
    }
}

// Keep the token out of logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}
