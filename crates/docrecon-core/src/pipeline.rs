use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::config::DEFAULT_MODEL;
use crate::document::LocalDocument;
use crate::event::UploadEvent;
use crate::extract::StructuredExtractor;
use crate::fetch::DocumentFetcher;
use crate::model::{Attachment, GenerativeModel, PromptTemplate};
use crate::normalize::{EntityMap, EntityNormalizer, ModelNormalizer, StructuredNormalizer};
use crate::reconcile::Reconciler;
use crate::sink::ResultSink;
use crate::staging::TempUploader;
use crate::storage::ObjectStore;
use crate::Result;

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Bucket the model path stages documents in.
    pub temp_bucket: String,
    pub temp_prefix: String,
    pub model_name: String,
    pub extract_prompt: PromptTemplate,
    pub compare_prompt: PromptTemplate,
    pub temperature: Option<f32>,
    pub work_dir: PathBuf,
}

impl PipelineSettings {
    pub fn new(temp_bucket: impl Into<String>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            temp_bucket: temp_bucket.into(),
            temp_prefix: String::new(),
            model_name: DEFAULT_MODEL.to_string(),
            extract_prompt: PromptTemplate::extract_entities(),
            compare_prompt: PromptTemplate::compare_entities(),
            temperature: None,
            work_dir: work_dir.into(),
        }
    }

    #[must_use]
    pub fn with_temp_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.temp_prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn with_model_name(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = model_name.into();
        self
    }

    #[must_use]
    pub fn with_prompts(mut self, extract: PromptTemplate, compare: PromptTemplate) -> Self {
        self.extract_prompt = extract;
        self.compare_prompt = compare;
        self
    }

    #[must_use]
    pub const fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Object path of the source document, as given by the trigger.
    pub document_name: String,
    pub structured: EntityMap,
    pub generated: EntityMap,
    pub summary: String,
    pub duration_ms: u64,
}

/// One run per upload event: fetch, extract two ways, reconcile, store.
///
/// Collaborators are constructed by the caller and shared across runs; the
/// pipeline itself holds no per-run state.
pub struct Pipeline {
    store: Arc<dyn ObjectStore>,
    extractor: Arc<dyn StructuredExtractor>,
    model: Arc<dyn GenerativeModel>,
    sink: Arc<dyn ResultSink>,
    fetcher: DocumentFetcher,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        extractor: Arc<dyn StructuredExtractor>,
        model: Arc<dyn GenerativeModel>,
        sink: Arc<dyn ResultSink>,
        settings: PipelineSettings,
    ) -> Self {
        let fetcher = DocumentFetcher::new(store.clone(), settings.work_dir.clone());
        Self {
            store,
            extractor,
            model,
            sink,
            fetcher,
            settings,
        }
    }

    pub async fn run(&self, event: &UploadEvent) -> Result<PipelineOutput> {
        let start = Instant::now();
        let source = event.location();
        tracing::info!(
            "Processing {} ({}, {} extraction via {})",
            source,
            event.content_type,
            self.extractor.mode(),
            self.extractor.processor()
        );

        // The local copy lives in a per-run scratch directory that is removed
        // here or, if this future is dropped, when `fetched` is.
        let fetched = self.fetcher.fetch(&source, &event.content_type).await?;
        let outcome = self.process(&fetched.document).await;

        if let Err(e) = fetched.close() {
            tracing::warn!("Failed to remove scratch copy of {}: {}", source, e);
        }

        let (structured, generated, summary) = outcome?;
        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        tracing::info!("Finished {} in {}ms", source, duration_ms);

        Ok(PipelineOutput {
            document_name: event.name.clone(),
            structured,
            generated,
            summary,
            duration_ms,
        })
    }

    async fn process(&self, document: &LocalDocument) -> Result<(EntityMap, EntityMap, String)> {
        // Both paths always run to completion so neither one's staging
        // cleanup is cut short by the other failing.
        let (structured, generated) =
            tokio::join!(self.structured_entities(document), self.model_entities(document));
        let structured = structured?;
        let generated = generated?;

        let summary = Reconciler::new(self.model.clone(), &self.settings.model_name)
            .with_template(self.settings.compare_prompt.clone())
            .with_temperature(self.settings.temperature)
            .compare(&structured, &generated)
            .await?;

        self.sink.store(&document.source.path, &summary).await?;

        Ok((structured, generated, summary))
    }

    async fn structured_entities(&self, document: &LocalDocument) -> Result<EntityMap> {
        let extracted = self
            .extractor
            .process_document(document.path(), &document.mime_type)
            .await?;
        StructuredNormalizer::new(extracted).extract_entities().await
    }

    async fn model_entities(&self, document: &LocalDocument) -> Result<EntityMap> {
        let mut uploader = TempUploader::new(self.store.clone(), &self.settings.temp_bucket)
            .with_prefix(&self.settings.temp_prefix);

        let model = self.model.clone();
        let model_name = self.settings.model_name.clone();
        let prompt = self.settings.extract_prompt.clone();
        let temperature = self.settings.temperature;
        let mime_type = document.mime_type.clone();

        uploader
            .with_staged(document.path(), |uri| async move {
                ModelNormalizer::new(model, model_name, prompt, Attachment::new(uri, mime_type))
                    .with_temperature(temperature)
                    .extract_entities()
                    .await
            })
            .await
    }
}
