use std::{collections::BTreeMap, fmt};

use serde_json::Value;
use thiserror::Error;

/// Uniform "request failed" outcome of the HTTP adapter.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The request never produced a response (connect, timeout, TLS, ...).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("request failed with status {status}: {body}")]
    Status {
        status: u16,
        payload: Option<Value>,
        body: String,
    },

    /// A 2xx response whose body did not have the expected shape.
    #[error("malformed response body: {source}")]
    Decode {
        source: serde_json::Error,
        body: String,
    },

    #[error("invalid API base URL {0:?}")]
    InvalidBaseUrl(String),
}

impl ApiError {
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        let payload = serde_json::from_str(&body)
            .ok()
            .filter(|payload: &Value| !payload.is_null());

        Self::Status {
            status,
            payload,
            body,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(err) => err.status().map(|s| s.as_u16()),
            Self::Decode { .. } | Self::InvalidBaseUrl(_) => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Server-provided error body, if it was JSON.
    pub fn payload(&self) -> Option<&Value> {
        match self {
            Self::Status { payload, .. } => payload.as_ref(),
            _ => None,
        }
    }
}

/// Error value kept in manager state for the view to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorPayload {
    Message(String),
    /// Per-field validation messages, e.g. `{"username": ["already taken"]}`.
    Fields(BTreeMap<String, Vec<String>>),
    Value(Value),
}

impl ErrorPayload {
    /// The server payload as-is, or `fallback` when there is none.
    pub fn from_api_error(err: &ApiError, fallback: &str) -> Self {
        match err.payload() {
            Some(payload) => Self::from_value(payload.clone()),
            None => Self::Message(fallback.to_string()),
        }
    }

    /// The payload's `message` field, or `fallback`.
    pub fn message_or(err: &ApiError, fallback: &str) -> Self {
        let message = err
            .payload()
            .and_then(|p| p.get("message"))
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty());

        Self::Message(message.unwrap_or(fallback).to_string())
    }

    pub fn from_value(value: Value) -> Self {
        for key in ["detail", "message"] {
            if let Some(Value::String(message)) = value.get(key) {
                if value.as_object().map_or(false, |o| o.len() == 1) {
                    return Self::Message(message.clone());
                }
            }
        }

        if let Some(fields) = value.as_object().and_then(field_errors) {
            return Self::Fields(fields);
        }

        match value {
            Value::String(message) => Self::Message(message),
            other => Self::Value(other),
        }
    }

    /// Messages for one form field.
    pub fn field(&self, name: &str) -> &[String] {
        match self {
            Self::Fields(fields) => fields.get(name).map(Vec::as_slice).unwrap_or_default(),
            _ => &[],
        }
    }
}

fn field_errors(object: &serde_json::Map<String, Value>) -> Option<BTreeMap<String, Vec<String>>> {
    let mut fields = BTreeMap::new();

    for (name, value) in object {
        let messages = match value {
            Value::String(message) => vec![message.clone()],
            Value::Array(items) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()?,
            _ => return None,
        };
        fields.insert(name.clone(), messages);
    }

    Some(fields)
}

impl fmt::Display for ErrorPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message(message) => f.write_str(message),
            Self::Fields(fields) => {
                let mut first = true;
                for (name, messages) in fields {
                    if !first {
                        f.write_str("; ")?;
                    }
                    first = false;
                    write!(f, "{}: {}", name, messages.join(", "))?;
                }
                Ok(())
            }
            Self::Value(value) => write!(f, "{}", value),
        }
    }
}
