use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

use super::{ObjectInfo, ObjectStore};
use crate::document::ObjectLocation;
use crate::error::Service;
use crate::gcp::{ensure_success, GcpClient};
use crate::{Error, Result};

const DEFAULT_ENDPOINT: &str = "https://storage.googleapis.com/";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    items: Vec<ListItem>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListItem {
    name: String,
    content_type: Option<String>,
}

/// Cloud Storage through the JSON API.
pub struct GcsObjectStore {
    client: GcpClient,
    endpoint: Url,
}

impl GcsObjectStore {
    pub fn new(client: GcpClient) -> Result<Self> {
        let endpoint = Url::parse(DEFAULT_ENDPOINT).map_err(|e| Error::Config(e.to_string()))?;
        Ok(Self { client, endpoint })
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = endpoint;
        self
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| Error::Config(format!("storage endpoint cannot be a base: {}", self.endpoint)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn object_url(&self, location: &ObjectLocation) -> Result<Url> {
        self.url(&["storage", "v1", "b", &location.bucket, "o", &location.path])
    }

    fn not_found(location: &ObjectLocation) -> Error {
        Error::ObjectNotFound {
            bucket: location.bucket.clone(),
            path: location.path.clone(),
        }
    }
}

#[async_trait]
impl ObjectStore for GcsObjectStore {
    async fn download(&self, location: &ObjectLocation) -> Result<Vec<u8>> {
        let mut url = self.object_url(location)?;
        url.query_pairs_mut().append_pair("alt", "media");

        let response = self.client.get(url).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Self::not_found(location));
        }

        let response = ensure_success(response, Service::Storage).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn upload(
        &self,
        location: &ObjectLocation,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        let mut url = self.url(&["upload", "storage", "v1", "b", &location.bucket, "o"])?;
        url.query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("name", &location.path);

        let response = self.client.upload(url, data, content_type).await?;
        ensure_success(response, Service::Storage).await?;
        tracing::debug!("Uploaded {}", location);
        Ok(())
    }

    async fn delete(&self, location: &ObjectLocation) -> Result<()> {
        let response = self.client.delete(self.object_url(location)?).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Self::not_found(location));
        }

        ensure_success(response, Service::Storage).await?;
        tracing::debug!("Deleted {}", location);
        Ok(())
    }

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectInfo>> {
        let mut objects = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = self.url(&["storage", "v1", "b", bucket, "o"])?;
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("prefix", prefix);
                query.append_pair("fields", "items(name,contentType),nextPageToken");
                if let Some(ref token) = page_token {
                    query.append_pair("pageToken", token);
                }
            }

            let response = ensure_success(self.client.get(url).await?, Service::Storage).await?;
            let page: ListResponse = response.json().await?;

            objects.extend(page.items.into_iter().map(|item| ObjectInfo {
                name: item.name,
                content_type: item.content_type,
            }));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(objects)
    }
}
