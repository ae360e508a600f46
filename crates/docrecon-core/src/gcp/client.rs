use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::auth::TokenSource;
use super::config::ClientConfig;
use crate::error::Service;
use crate::{Error, Result};

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    error: GoogleError,
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Authenticated HTTP client for Google REST APIs.
///
/// Cheap to clone; every clone shares the connection pool and token source.
#[derive(Clone)]
pub struct GcpClient {
    config: ClientConfig,
    tokens: Arc<dyn TokenSource>,
    inner: Client,
}

impl GcpClient {
    pub fn new(config: ClientConfig, tokens: Arc<dyn TokenSource>) -> Result<Self> {
        let inner = Self::build_client(&config)?;
        Ok(Self {
            config,
            tokens,
            inner,
        })
    }

    fn build_client(config: &ClientConfig) -> Result<Client> {
        Client::builder()
            .connect_timeout(Duration::from_secs(u64::from(config.connect_timeout_seconds)))
            .timeout(Duration::from_secs(u64::from(config.request_timeout_seconds)))
            .user_agent(config.user_agent())
            .https_only(true)
            .build()
            .map_err(Error::Http)
    }

    async fn authorized(&self, builder: RequestBuilder) -> Result<RequestBuilder> {
        let token = self.tokens.access_token().await?;
        Ok(builder.bearer_auth(token))
    }

    /// Send without interpreting the status code.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let builder = self.authorized(builder).await?;
        builder.send().await.map_err(Error::Http)
    }

    pub async fn get(&self, url: Url) -> Result<Response> {
        self.send(self.inner.get(url)).await
    }

    pub async fn post_json<T: serde::Serialize + ?Sized + Sync>(
        &self,
        url: Url,
        json: &T,
    ) -> Result<Response> {
        self.send(self.inner.post(url).json(json)).await
    }

    pub async fn patch_json<T: serde::Serialize + ?Sized + Sync>(
        &self,
        url: Url,
        json: &T,
    ) -> Result<Response> {
        self.send(self.inner.patch(url).json(json)).await
    }

    pub async fn delete(&self, url: Url) -> Result<Response> {
        self.send(self.inner.delete(url)).await
    }

    pub async fn upload(&self, url: Url, body: Vec<u8>, content_type: &str) -> Result<Response> {
        let builder = self
            .inner
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body);
        self.send(builder).await
    }

    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }
}

/// Pass 2xx responses through; turn anything else into a `RemoteService` error
/// carrying Google's error message when the body has one.
pub async fn ensure_success(response: Response, service: Service) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(Error::remote(service, describe_failure(status, &body)))
}

fn describe_failure(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<GoogleErrorBody>(body) {
        Ok(parsed) => match parsed.error.status {
            Some(code) => format!("{status} {code}: {}", parsed.error.message),
            None => format!("{status}: {}", parsed.error.message),
        },
        Err(_) if body.trim().is_empty() => status.to_string(),
        Err(_) => format!("{status}: {}", body.trim()),
    }
}
