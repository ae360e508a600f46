use async_trait::async_trait;
use url::Url;

use super::{ResultRecord, ResultSink};
use crate::error::Service;
use crate::gcp::{ensure_success, GcpClient};
use crate::{Error, Result};

const DEFAULT_ENDPOINT: &str = "https://firestore.googleapis.com/";
const COLLECTION: &str = "files";

/// Upserts records into the Firestore `files` collection, using the document
/// name as the Firestore document id.
pub struct FirestoreSink {
    client: GcpClient,
    project: String,
    database: String,
    endpoint: Url,
}

impl FirestoreSink {
    pub fn new(
        client: GcpClient,
        project: impl Into<String>,
        database: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            client,
            project: project.into(),
            database: database.into(),
            endpoint: Url::parse(DEFAULT_ENDPOINT).map_err(|e| Error::Config(e.to_string()))?,
        })
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = endpoint;
        self
    }

    fn document_url(&self, name: &str) -> Result<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| Error::Config(format!("Firestore endpoint cannot be a base: {}", self.endpoint)))?
            .pop_if_empty()
            .extend([
                "v1",
                "projects",
                &self.project,
                "databases",
                &self.database,
                "documents",
                COLLECTION,
                name,
            ]);
        Ok(url)
    }
}

fn document_body(record: &ResultRecord) -> serde_json::Value {
    serde_json::json!({
        "fields": {
            "name": { "stringValue": record.name },
            "summary": { "stringValue": record.summary },
            "updated_at": { "timestampValue": record.updated_at.to_rfc3339() },
        }
    })
}

#[async_trait]
impl ResultSink for FirestoreSink {
    /// PATCH without an update mask replaces the whole document, creating it
    /// if needed.
    async fn put(&self, record: &ResultRecord) -> Result<()> {
        let url = self.document_url(&record.name)?;
        let response = self.client.patch_json(url, &document_body(record)).await?;
        ensure_success(response, Service::ResultStore).await?;
        Ok(())
    }
}
