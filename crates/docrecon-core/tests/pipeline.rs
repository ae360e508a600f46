use std::sync::Arc;
use std::time::Duration;

use docrecon_core::extract::{
    BatchProcessMetadata, BatchState, DocumentEntity, IndividualProcessStatus, Operation,
};
use docrecon_core::testing::{MockDocumentProcessor, MockModel, ProcessorCall};
use docrecon_core::{
    BatchExtractor, BatchSettings, Error, MemoryObjectStore, MemorySink, ObjectLocation,
    OnlineExtractor, Pipeline, PipelineSettings, ProcessorName, PromptTemplate, SqliteSink,
    StructuredDocument, StructuredExtractor, UploadEvent,
};
use tempfile::TempDir;

const SUMMARY: &str = "Values match within formatting.";

fn processor() -> ProcessorName {
    ProcessorName::new("proj", "us", "invoice-parser", None)
}

fn invoice() -> StructuredDocument {
    StructuredDocument::new().with_entity(DocumentEntity::new("total", "100.00", 0.98))
}

fn inbox() -> Arc<MemoryObjectStore> {
    let store = Arc::new(MemoryObjectStore::new());
    store.insert(
        &ObjectLocation::new("inbox", "invoice.pdf"),
        b"%PDF-1.7 invoice".to_vec(),
        "application/pdf",
    );
    store
}

fn event() -> UploadEvent {
    UploadEvent::new("inbox", "invoice.pdf", "application/pdf")
}

fn settings(work: &TempDir) -> PipelineSettings {
    PipelineSettings::new("temp", work.path()).with_prompts(
        PromptTemplate::new("List the entities."),
        PromptTemplate::new("A={docai_output} B={gemini_output}"),
    )
}

#[tokio::test]
async fn invoice_run_stores_one_record() {
    let work = TempDir::new().unwrap();
    let store = inbox();
    let sink = Arc::new(MemorySink::new());
    let service = Arc::new(MockDocumentProcessor::new().with_document(invoice()));
    let model = Arc::new(
        MockModel::new()
            .with_response(r#"{"total":"100"}"#)
            .with_response(SUMMARY),
    );

    let pipeline = Pipeline::new(
        store.clone(),
        Arc::new(OnlineExtractor::new(processor(), service.clone())),
        model.clone(),
        sink.clone(),
        settings(&work),
    );

    let output = pipeline.run(&event()).await.unwrap();

    assert_eq!(output.summary, SUMMARY);
    assert_eq!(output.structured.first("total"), Some("100.00"));
    assert_eq!(output.generated.first("total"), Some("100"));

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "invoice.pdf");
    assert_eq!(records[0].summary, SUMMARY);

    let requests = model.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].prompt, r#"A={"total":"100.00"} B={"total":"100"}"#);
    assert!(requests[1].attachment.is_none());

    assert!(matches!(&service.calls()[..], [ProcessorCall::Process { .. }]));
    assert!(store.locations("temp").is_empty());
}

#[tokio::test]
async fn comparison_failure_writes_nothing() {
    let work = TempDir::new().unwrap();
    let store = inbox();
    let sink = Arc::new(MemorySink::new());
    let model = Arc::new(
        MockModel::new()
            .with_response(r#"{"total":"100"}"#)
            .with_failure("429 RESOURCE_EXHAUSTED"),
    );

    let pipeline = Pipeline::new(
        store.clone(),
        Arc::new(OnlineExtractor::new(
            processor(),
            Arc::new(MockDocumentProcessor::new().with_document(invoice())),
        )),
        model,
        sink.clone(),
        settings(&work),
    );

    let err = pipeline.run(&event()).await.unwrap_err();

    assert!(matches!(err, Error::RemoteService { .. }));
    assert_eq!(sink.write_count(), 0);
    assert!(store.locations("temp").is_empty());
}

#[tokio::test]
async fn model_extraction_failure_cleans_up_staging() {
    let work = TempDir::new().unwrap();
    let store = inbox();
    let sink = Arc::new(MemorySink::new());

    let pipeline = Pipeline::new(
        store.clone(),
        Arc::new(OnlineExtractor::new(
            processor(),
            Arc::new(MockDocumentProcessor::new().with_document(invoice())),
        )),
        Arc::new(MockModel::new().with_failure("500 INTERNAL")),
        sink.clone(),
        settings(&work),
    );

    assert!(pipeline.run(&event()).await.is_err());
    assert_eq!(sink.write_count(), 0);
    assert!(store.locations("temp").is_empty());
}

#[tokio::test]
async fn batch_run_reads_output_and_stores_in_sqlite() {
    let work = TempDir::new().unwrap();
    let store = inbox();
    store.insert(
        &ObjectLocation::new("out", "results/7/0/invoice-0.json"),
        serde_json::to_vec(&invoice()).unwrap(),
        "application/json",
    );

    let op = |done: bool, state: BatchState| Operation {
        name: "projects/proj/locations/us/operations/7".into(),
        done,
        metadata: Some(BatchProcessMetadata {
            state,
            state_message: String::new(),
            individual_process_statuses: vec![IndividualProcessStatus {
                input_gcs_source: String::new(),
                output_gcs_destination: "gs://out/results/7/0/".into(),
            }],
        }),
        error: None,
    };
    let service = Arc::new(MockDocumentProcessor::new().with_operations(vec![
        op(false, BatchState::Running),
        op(false, BatchState::Running),
        op(true, BatchState::Succeeded),
    ]));

    let extractor = BatchExtractor::new(
        processor(),
        service,
        store.clone(),
        BatchSettings::new("gs://out/results/", "gs://temp/batch/")
            .with_timeout(Duration::from_secs(10))
            .with_poll_interval(Duration::from_millis(10)),
    )
    .unwrap();
    assert_eq!(extractor.mode().as_str(), "batch");

    let sink = Arc::new(SqliteSink::open_memory().await.unwrap());
    let pipeline = Pipeline::new(
        store.clone(),
        Arc::new(extractor),
        Arc::new(
            MockModel::new()
                .with_response("total: 100")
                .with_response(SUMMARY),
        ),
        sink.clone(),
        settings(&work),
    );

    pipeline.run(&event()).await.unwrap();

    let record = sink.get("invoice.pdf").await.unwrap().unwrap();
    assert_eq!(record.summary, SUMMARY);
    assert_eq!(sink.count().await.unwrap(), 1);
    assert!(store.locations("temp").is_empty());
}
