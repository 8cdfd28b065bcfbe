use std::time::Duration;

use reqwest::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    Client, Method, Request, Url,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::storage::ClientStorage;

use super::{response::read_response, ApiError};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// HTTP adapter for the task API.
///
/// Every request is prefixed with the base URL, sent as JSON and, when a
/// credential is stored, carries `Authorization: Token <value>`. Cookies set
/// by the server are kept and replayed. There is no retry.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    storage: ClientStorage,
}

impl ApiClient {
    pub fn new(base_url: &str, storage: ClientStorage) -> Result<Self, ApiError> {
        if Url::parse(base_url).is_err() {
            return Err(ApiError::InvalidBaseUrl(base_url.to_string()));
        }

        let http = Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            storage,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Builds the decorated request without sending it.
    pub fn build_request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<Request, ApiError> {
        let mut builder = self
            .http
            .request(method, self.url(path))
            .header(CONTENT_TYPE, "application/json");

        if let Some(credential) = self.storage.credential() {
            builder = builder.header(AUTHORIZATION, credential.authorization_header());
        }

        if !query.is_empty() {
            builder = builder.query(query);
        }

        if let Some(body) = body {
            builder = builder.json(body);
        }

        Ok(builder.build()?)
    }

    pub async fn send<T, B>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = self.build_request(method.clone(), path, query, body)?;
        log::debug!("{} {}", method, request.url());

        let response = match self.http.execute(request).await {
            Ok(response) => response,
            Err(err) => {
                log::error!("API error: {} {}: {}", method, path, err);
                return Err(err.into());
            }
        };

        read_response(&method, path, response).await
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        self.send::<T, ()>(Method::GET, path, query, None).await
    }

    pub async fn post<T, B>(&self, path: &str, body: Option<&B>) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(Method::POST, path, &[], body).await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(Method::PUT, path, &[], Some(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send::<T, ()>(Method::DELETE, path, &[], None).await
    }
}
