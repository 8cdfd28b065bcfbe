use reqwest::{Method, Response};
use serde::de::DeserializeOwned;

use super::ApiError;

/// Turns a raw response into the parsed body or a uniform [`ApiError`].
///
/// Failures are logged here, once, and handed back to the caller.
pub async fn read_response<T: DeserializeOwned>(
    method: &Method,
    path: &str,
    response: Response,
) -> Result<T, ApiError> {
    let status = response.status();
    let body = match response.text().await {
        Ok(body) => body,
        Err(err) => {
            log::error!("API error: {} {}: reading body: {}", method, path, err);
            return Err(err.into());
        }
    };

    if !status.is_success() {
        log::error!("API error: {} {} -> {}: {}", method, path, status, body);
        return Err(ApiError::from_status(status.as_u16(), body));
    }

    parse_body(&body).map_err(|source| {
        log::error!("API error: {} {}: malformed body: {}", method, path, source);
        ApiError::Decode { source, body }
    })
}

// Empty 2xx bodies (204 No Content) decode as JSON `null`, which is `()`.
fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, serde_json::Error> {
    if body.trim().is_empty() {
        serde_json::from_str("null")
    } else {
        serde_json::from_str(body)
    }
}
