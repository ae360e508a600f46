use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use super::docai::DocumentProcessor;
use super::{ExtractionMode, ProcessorName, StructuredDocument, StructuredExtractor};
use crate::Result;

/// Sends the whole file inline to the synchronous process call. Service
/// errors propagate untouched.
pub struct OnlineExtractor {
    processor: ProcessorName,
    service: Arc<dyn DocumentProcessor>,
}

impl OnlineExtractor {
    pub fn new(processor: ProcessorName, service: Arc<dyn DocumentProcessor>) -> Self {
        Self { processor, service }
    }
}

#[async_trait]
impl StructuredExtractor for OnlineExtractor {
    fn mode(&self) -> ExtractionMode {
        ExtractionMode::Online
    }

    fn processor(&self) -> &ProcessorName {
        &self.processor
    }

    async fn process_document(&self, file: &Path, mime_type: &str) -> Result<StructuredDocument> {
        let content = tokio::fs::read(file).await?;
        tracing::info!(
            "Processing {} ({} bytes) with {}",
            file.display(),
            content.len(),
            self.processor
        );

        let document = self
            .service
            .process(&self.processor, content, mime_type)
            .await?;

        tracing::info!("Structured service returned {} entities", document.entities.len());
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::DocumentEntity;
    use crate::testing::{MockDocumentProcessor, ProcessorCall};
    use crate::Error;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_submits_file_inline() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("invoice.pdf");
        std::fs::write(&file, b"%PDF-1.7 body").unwrap();

        let document = StructuredDocument::new().with_entity(DocumentEntity::new("total", "100.00", 0.9));
        let service = Arc::new(MockDocumentProcessor::new().with_document(document.clone()));
        let extractor = OnlineExtractor::new(
            ProcessorName::new("proj", "us", "p1", None),
            service.clone(),
        );

        let result = extractor.process_document(&file, "application/pdf").await.unwrap();

        assert_eq!(result, document);
        assert_eq!(extractor.mode(), ExtractionMode::Online);
        match &service.calls()[..] {
            [ProcessorCall::Process { processor, mime_type, size }] => {
                assert_eq!(processor, "projects/proj/locations/us/processors/p1");
                assert_eq!(mime_type, "application/pdf");
                assert_eq!(*size, 13);
            }
            other => panic!("unexpected calls: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_service_error_propagates() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("scan.png");
        std::fs::write(&file, b"png").unwrap();

        let service = Arc::new(MockDocumentProcessor::new().with_process_failure("503 UNAVAILABLE"));
        let extractor = OnlineExtractor::new(ProcessorName::new("proj", "us", "p1", None), service);

        let err = extractor.process_document(&file, "image/png").await.unwrap_err();
        assert!(matches!(err, Error::RemoteService { ref message, .. } if message == "503 UNAVAILABLE"));
    }
}
