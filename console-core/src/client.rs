//! REST transport for the console backend.
//!
//! Thin wrapper over `reqwest` that resolves paths against the configured base URL,
//! attaches the bearer token, propagates trace context and maps non-2xx responses to
//! [`TransportError`]. Retries are not attempted here.

use reqwest::Response;
use secrecy::{ExposeSecret, Secret};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

use crate::config::ApiSettings;
use crate::error::AppError;
use crate::observability::{TracedClientExt, TracedRequest};

/// Network or HTTP failure, passed through to the caller unchanged.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl TransportError {
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        TransportError::Status {
            status,
            body: body.into(),
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            TransportError::Request(err) => err.status().map(|s| s.as_u16()),
            TransportError::Decode(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<Secret<String>>,
}

impl ApiClient {
    pub fn new(settings: &ApiSettings) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        tracing::info!(
            base_url = %settings.base_url,
            timeout_secs = settings.timeout_secs,
            authenticated = settings.token.is_some(),
            "Console API client configured"
        );

        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            token: settings.token.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a path such as `/node-pools/{id}/servers`.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, request: TracedRequest) -> TracedRequest {
        match &self.token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, TransportError> {
        tracing::debug!(path = %path, "GET");
        let request = self.http.traced_get(&self.url(path)).query(query);
        let response = self.authorize(request).send().await?;
        decode(check(response).await?).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, TransportError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        decode(self.post_raw(path, body).await?).await
    }

    /// POST where the response body is not needed.
    pub async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), TransportError> {
        self.post_raw(path, body).await.map(|_| ())
    }

    async fn post_raw<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Response, TransportError> {
        tracing::debug!(path = %path, "POST");
        let request = self.http.traced_post(&self.url(path)).json(body);
        let response = self.authorize(request).send().await?;
        check(response).await
    }

    pub async fn patch_json<B, T>(&self, path: &str, body: &B) -> Result<T, TransportError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        tracing::debug!(path = %path, "PATCH");
        let request = self.http.traced_patch(&self.url(path)).json(body);
        let response = self.authorize(request).send().await?;
        decode(check(response).await?).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), TransportError> {
        tracing::debug!(path = %path, "DELETE");
        let request = self.http.traced_delete(&self.url(path));
        let response = self.authorize(request).send().await?;
        check(response).await.map(|_| ())
    }
}

async fn check(response: Response) -> Result<Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::warn!(status = %status, body = %body, "Console API returned error status");
    Err(TransportError::status(status.as_u16(), body))
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, TransportError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| TransportError::Decode(e.to_string()))
}
