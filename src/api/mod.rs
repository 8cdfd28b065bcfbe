mod client;
mod endpoints;
mod error;
mod response;

pub use client::ApiClient;
pub use error::{ApiError, ErrorPayload};
