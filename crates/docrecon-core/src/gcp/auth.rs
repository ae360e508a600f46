use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::error::Service;
use crate::{Error, Result};

const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Tokens are refreshed this long before the server says they expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Supplies OAuth2 bearer tokens for Google APIs.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// A fixed token, e.g. from `gcloud auth print-access-token`.
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Read `GOOGLE_OAUTH_ACCESS_TOKEN` if it is set and non-empty.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        std::env::var("GOOGLE_OAUTH_ACCESS_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .map(Self::new)
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Deserialize)]
struct MetadataTokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Service-account tokens from the Compute Engine / Cloud Run metadata server.
pub struct MetadataServerToken {
    http: reqwest::Client,
    cached: RwLock<Option<CachedToken>>,
}

impl MetadataServerToken {
    #[must_use]
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            cached: RwLock::new(None),
        }
    }

    async fn fetch(&self) -> Result<CachedToken> {
        let response = self
            .http
            .get(METADATA_TOKEN_URL)
            .header("Metadata-Flavor", "Google")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::remote(
                Service::Metadata,
                format!("token request returned {}", response.status()),
            ));
        }

        let body: MetadataTokenResponse = response.json().await?;
        let lifetime = Duration::from_secs(body.expires_in).saturating_sub(EXPIRY_MARGIN);

        Ok(CachedToken {
            value: body.access_token,
            refresh_at: Instant::now() + lifetime,
        })
    }
}

#[async_trait]
impl TokenSource for MetadataServerToken {
    async fn access_token(&self) -> Result<String> {
        if let Some(cached) = self.cached.read().await.as_ref() {
            if Instant::now() < cached.refresh_at {
                return Ok(cached.value.clone());
            }
        }

        let mut guard = self.cached.write().await;
        if let Some(cached) = guard.as_ref() {
            if Instant::now() < cached.refresh_at {
                return Ok(cached.value.clone());
            }
        }

        tracing::debug!("Refreshing access token from metadata server");
        let fresh = self.fetch().await?;
        let value = fresh.value.clone();
        *guard = Some(fresh);
        Ok(value)
    }
}

/// A static token from the environment when one is set, otherwise the
/// metadata server.
#[must_use]
pub fn default_token_source() -> Arc<dyn TokenSource> {
    match StaticToken::from_env() {
        Some(token) => {
            tracing::info!("Using access token from GOOGLE_OAUTH_ACCESS_TOKEN");
            Arc::new(token)
        }
        None => Arc::new(MetadataServerToken::new(reqwest::Client::new())),
    }
}
