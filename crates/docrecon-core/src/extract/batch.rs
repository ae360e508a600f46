use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::docai::{BatchProcessMetadata, BatchRequest, BatchState, DocumentProcessor, Operation};
use super::{ExtractionMode, ProcessorName, StructuredDocument, StructuredExtractor};
use crate::document::{extension, ObjectLocation};
use crate::staging::{combine_cleanup, TempUploader};
use crate::storage::{ObjectInfo, ObjectStore};
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct BatchSettings {
    /// `gs://` prefix the service writes results under.
    pub output_uri: String,
    /// `gs://bucket/prefix` where inputs are staged. The generated object
    /// name is appended to the prefix as-is, so include a trailing `/` for a
    /// directory.
    pub temp_uri: String,
    /// Upper bound on the wait for the job to finish.
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl BatchSettings {
    pub fn new(output_uri: impl Into<String>, temp_uri: impl Into<String>) -> Self {
        Self {
            output_uri: output_uri.into(),
            temp_uri: temp_uri.into(),
            timeout: Duration::from_secs(400),
            poll_interval: Duration::from_secs(5),
        }
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// Stages the file in object storage, runs an asynchronous batch job over it
/// and reads the first JSON result the job wrote.
pub struct BatchExtractor {
    processor: ProcessorName,
    service: Arc<dyn DocumentProcessor>,
    store: Arc<dyn ObjectStore>,
    settings: BatchSettings,
    temp: ObjectLocation,
}

impl BatchExtractor {
    pub fn new(
        processor: ProcessorName,
        service: Arc<dyn DocumentProcessor>,
        store: Arc<dyn ObjectStore>,
        settings: BatchSettings,
    ) -> Result<Self> {
        let temp = ObjectLocation::parse_prefix(&settings.temp_uri)?;
        Ok(Self {
            processor,
            service,
            store,
            settings,
            temp,
        })
    }

    fn staged_location(&self, file: &Path) -> ObjectLocation {
        let file_name = file.to_string_lossy();
        let mut name = format!("{}{}", self.temp.path, Uuid::new_v4());
        if let Some(ext) = extension(&file_name) {
            name.push('.');
            name.push_str(ext);
        }
        ObjectLocation::new(&self.temp.bucket, name)
    }

    async fn run_batch(&self, input_uri: String, mime_type: &str) -> Result<StructuredDocument> {
        let request = BatchRequest {
            input_uri,
            mime_type: mime_type.to_string(),
            output_uri: self.settings.output_uri.clone(),
        };

        let operation = self.service.batch_process(&self.processor, &request).await?;
        tracing::info!("Waiting for operation ({}) to complete...", operation.name);

        let operation = self.wait(operation).await?;
        let metadata = operation.metadata.unwrap_or_default();

        if metadata.state != BatchState::Succeeded {
            let message = if metadata.state_message.is_empty() {
                operation.error.map(|e| e.message).unwrap_or_default()
            } else {
                metadata.state_message
            };
            return Err(Error::BatchProcessingFailed {
                state: metadata.state.to_string(),
                message,
            });
        }

        self.fetch_output(&metadata).await
    }

    /// Poll until the operation is done. Timing out or failing to poll is
    /// fatal rather than a fall-through to metadata inspection.
    async fn wait(&self, operation: Operation) -> Result<Operation> {
        if operation.done {
            return Ok(operation);
        }

        let name = operation.name.clone();
        let poll = async {
            loop {
                tokio::time::sleep(self.settings.poll_interval).await;
                let current = self.service.get_operation(&name).await.map_err(|e| {
                    Error::BatchWaitFailed {
                        operation: name.clone(),
                        reason: e.to_string(),
                    }
                })?;
                tracing::debug!(
                    "Operation {} state: {}",
                    name,
                    current.metadata.as_ref().map_or(BatchState::StateUnspecified, |m| m.state)
                );
                if current.done {
                    return Ok(current);
                }
            }
        };

        let waited = tokio::time::timeout(self.settings.timeout, poll).await;
        match waited {
            Ok(result) => result,
            Err(_) => Err(Error::BatchWaitFailed {
                operation: name,
                reason: format!("timed out after {:?}", self.settings.timeout),
            }),
        }
    }

    async fn fetch_output(&self, metadata: &BatchProcessMetadata) -> Result<StructuredDocument> {
        for status in &metadata.individual_process_statuses {
            let Ok(destination) = ObjectLocation::parse(&status.output_gcs_destination) else {
                tracing::warn!(
                    "Could not parse output GCS destination: {}",
                    status.output_gcs_destination
                );
                continue;
            };

            let objects = self.store.list(&destination.bucket, &destination.path).await?;
            if let Some(object) = objects.into_iter().find(ObjectInfo::is_json) {
                let location = ObjectLocation::new(&destination.bucket, object.name);
                tracing::info!("Fetching {}", location);
                let bytes = self.store.download(&location).await?;
                return Ok(serde_json::from_slice(&bytes)?);
            }
        }

        Err(Error::ResultNotFound)
    }
}

#[async_trait]
impl StructuredExtractor for BatchExtractor {
    fn mode(&self) -> ExtractionMode {
        ExtractionMode::Batch
    }

    fn processor(&self) -> &ProcessorName {
        &self.processor
    }

    async fn process_document(&self, file: &Path, mime_type: &str) -> Result<StructuredDocument> {
        let mut uploader = TempUploader::new(self.store.clone(), &self.temp.bucket);
        let input_uri = uploader.upload_to(file, self.staged_location(file)).await?;

        let outcome = self.run_batch(input_uri, mime_type).await;
        let cleanup = uploader.delete().await;
        combine_cleanup(outcome, cleanup)
    }
}
