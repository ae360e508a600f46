pub mod config;
pub mod document;
pub mod error;
pub mod event;
pub mod extract;
pub mod fetch;
pub mod gcp;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod reconcile;
pub mod sink;
pub mod staging;
pub mod storage;
pub mod testing;

pub use config::{Config, ResultStoreKind};
pub use document::{LocalDocument, ObjectLocation};
pub use error::{Error, Result, Service};
pub use event::UploadEvent;
pub use extract::{
    BatchExtractor, BatchSettings, DocumentAiClient, DocumentProcessor, ExtractionMode,
    OnlineExtractor, ProcessorName, StructuredDocument, StructuredExtractor,
};
pub use fetch::{DocumentFetcher, FetchedDocument};
pub use gcp::{ClientConfig, GcpClient, MetadataServerToken, StaticToken, TokenSource};
pub use model::{GenerativeModel, PromptTemplate, VertexGemini};
pub use normalize::{EntityMap, EntityNormalizer, ModelNormalizer, StructuredNormalizer};
pub use pipeline::{Pipeline, PipelineOutput, PipelineSettings};
pub use reconcile::Reconciler;
pub use sink::{FirestoreSink, MemorySink, ResultRecord, ResultSink, SqliteSink};
pub use staging::TempUploader;
pub use storage::{GcsObjectStore, MemoryObjectStore, ObjectStore};
