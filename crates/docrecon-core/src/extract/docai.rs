//! Document AI REST boundary: synchronous processing, batch submission and
//! long-running operation lookups.

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use url::Url;

use super::processor::ProcessorName;
use super::StructuredDocument;
use crate::error::Service;
use crate::gcp::{ensure_success, GcpClient};
use crate::{Error, Result};

/// Inputs of one batch job over a single staged document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    pub input_uri: String,
    pub mime_type: String,
    pub output_uri: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchState {
    #[default]
    StateUnspecified,
    Waiting,
    Running,
    Succeeded,
    Cancelling,
    Cancelled,
    Failed,
    #[serde(other)]
    Unknown,
}

impl BatchState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::StateUnspecified => "STATE_UNSPECIFIED",
            Self::Waiting => "WAITING",
            Self::Running => "RUNNING",
            Self::Succeeded => "SUCCEEDED",
            Self::Cancelling => "CANCELLING",
            Self::Cancelled => "CANCELLED",
            Self::Failed => "FAILED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for BatchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndividualProcessStatus {
    #[serde(default)]
    pub input_gcs_source: String,
    #[serde(default)]
    pub output_gcs_destination: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchProcessMetadata {
    #[serde(default)]
    pub state: BatchState,
    #[serde(default)]
    pub state_message: String,
    #[serde(default)]
    pub individual_process_statuses: Vec<IndividualProcessStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationError {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

/// A Document AI long-running operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub name: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub metadata: Option<BatchProcessMetadata>,
    #[serde(default)]
    pub error: Option<OperationError>,
}

/// Structured-service boundary.
#[async_trait]
pub trait DocumentProcessor: Send + Sync {
    async fn process(
        &self,
        processor: &ProcessorName,
        content: Vec<u8>,
        mime_type: &str,
    ) -> Result<StructuredDocument>;

    async fn batch_process(
        &self,
        processor: &ProcessorName,
        request: &BatchRequest,
    ) -> Result<Operation>;

    async fn get_operation(&self, name: &str) -> Result<Operation>;
}

#[derive(Debug, Deserialize)]
struct ProcessResponse {
    #[serde(default)]
    document: StructuredDocument,
}

/// Document AI over its v1 REST API at the regional endpoint.
pub struct DocumentAiClient {
    client: GcpClient,
    endpoint_override: Option<Url>,
}

impl DocumentAiClient {
    #[must_use]
    pub const fn new(client: GcpClient) -> Self {
        Self {
            client,
            endpoint_override: None,
        }
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint_override = Some(endpoint);
        self
    }

    fn endpoint(&self, location: &str) -> Result<Url> {
        if let Some(ref endpoint) = self.endpoint_override {
            return Ok(endpoint.clone());
        }
        Url::parse(&format!("https://{location}-documentai.googleapis.com/"))
            .map_err(|e| Error::Config(format!("invalid Document AI location {location}: {e}")))
    }

    fn url(&self, location: &str, resource: &str) -> Result<Url> {
        self.endpoint(location)?
            .join(&format!("v1/{resource}"))
            .map_err(|e| Error::Config(e.to_string()))
    }
}

/// Operation names look like `projects/p/locations/us/operations/123`.
fn location_of(operation_name: &str) -> Option<&str> {
    let mut parts = operation_name.split('/');
    while let Some(part) = parts.next() {
        if part == "locations" {
            return parts.next();
        }
    }
    None
}

#[async_trait]
impl DocumentProcessor for DocumentAiClient {
    async fn process(
        &self,
        processor: &ProcessorName,
        content: Vec<u8>,
        mime_type: &str,
    ) -> Result<StructuredDocument> {
        let url = self.url(
            processor.location(),
            &format!("{}:process", processor.resource_name()),
        )?;
        let body = serde_json::json!({
            "rawDocument": {
                "content": base64::engine::general_purpose::STANDARD.encode(&content),
                "mimeType": mime_type,
            }
        });

        let response = self.client.post_json(url, &body).await?;
        let response = ensure_success(response, Service::DocumentAi).await?;
        let parsed: ProcessResponse = response.json().await?;
        Ok(parsed.document)
    }

    async fn batch_process(
        &self,
        processor: &ProcessorName,
        request: &BatchRequest,
    ) -> Result<Operation> {
        let url = self.url(
            processor.location(),
            &format!("{}:batchProcess", processor.resource_name()),
        )?;
        let body = serde_json::json!({
            "inputDocuments": {
                "gcsDocuments": {
                    "documents": [{
                        "gcsUri": request.input_uri,
                        "mimeType": request.mime_type,
                    }]
                }
            },
            "documentOutputConfig": {
                "gcsOutputConfig": { "gcsUri": request.output_uri }
            }
        });

        let response = self.client.post_json(url, &body).await?;
        let response = ensure_success(response, Service::DocumentAi).await?;
        Ok(response.json().await?)
    }

    async fn get_operation(&self, name: &str) -> Result<Operation> {
        let location = location_of(name)
            .ok_or_else(|| Error::remote(Service::DocumentAi, format!("malformed operation name {name}")))?;
        let response = self.client.get(self.url(location, name)?).await?;
        let response = ensure_success(response, Service::DocumentAi).await?;
        Ok(response.json().await?)
    }
}
