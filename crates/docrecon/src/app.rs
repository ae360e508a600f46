use std::sync::Arc;

use anyhow::Result;
use docrecon_core::gcp::default_token_source;
use docrecon_core::{
    BatchExtractor, ClientConfig, Config, DocumentAiClient, ExtractionMode, FirestoreSink,
    GcpClient, GcsObjectStore, ObjectStore, OnlineExtractor, Pipeline, PipelineSettings,
    PromptTemplate, Reconciler, ResultSink, ResultStoreKind, SqliteSink, StructuredExtractor,
    VertexGemini,
};

/// Wire the real Google clients from configuration. Built once per process.
pub async fn build_pipeline(config: &Config) -> Result<Pipeline> {
    let client = GcpClient::new(ClientConfig::default(), default_token_source())?;

    let store: Arc<dyn ObjectStore> = Arc::new(GcsObjectStore::new(client.clone())?);
    let service = Arc::new(DocumentAiClient::new(client.clone()));
    let processor = config.processor_name();

    let extractor: Arc<dyn StructuredExtractor> = match config.extraction_mode {
        ExtractionMode::Online => Arc::new(OnlineExtractor::new(processor, service)),
        ExtractionMode::Batch => Arc::new(BatchExtractor::new(
            processor,
            service,
            store.clone(),
            config.batch_settings()?,
        )?),
    };

    let model = Arc::new(VertexGemini::new(client.clone(), &config.project_id, &config.region));

    let sink: Arc<dyn ResultSink> = match &config.result_store {
        ResultStoreKind::Firestore { database } => {
            Arc::new(FirestoreSink::new(client, &config.project_id, database)?)
        }
        ResultStoreKind::Sqlite(path) => Arc::new(SqliteSink::open(&path.to_string_lossy()).await?),
    };

    let extract_prompt = match &config.extract_prompt_file {
        Some(path) => PromptTemplate::from_file(path).await?,
        None => PromptTemplate::extract_entities(),
    };
    let compare_prompt = match &config.compare_prompt_file {
        Some(path) => PromptTemplate::from_file(path).await?,
        None => PromptTemplate::compare_entities(),
    };

    let settings = PipelineSettings::new(&config.temp_bucket, &config.work_dir)
        .with_model_name(&config.model_name)
        .with_prompts(extract_prompt, compare_prompt)
        .with_temperature(config.temperature);

    tracing::info!(
        "Pipeline ready: {} extraction via {}, model {}",
        config.extraction_mode,
        config.processor_name(),
        config.model_name
    );

    Ok(Pipeline::new(store, extractor, model, sink, settings))
}

/// A reconciler on the configured model, for one-off name checks.
pub fn build_reconciler(config: &Config) -> Result<Reconciler> {
    let client = GcpClient::new(ClientConfig::default(), default_token_source())?;
    let model = Arc::new(VertexGemini::new(client, &config.project_id, &config.region));
    Ok(Reconciler::new(model, &config.model_name))
}
