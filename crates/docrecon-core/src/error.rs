use thiserror::Error;

/// Remote capability an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Storage,
    DocumentAi,
    GenerativeModel,
    ResultStore,
    Metadata,
}

impl Service {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Storage => "storage",
            Self::DocumentAi => "document_ai",
            Self::GenerativeModel => "generative_model",
            Self::ResultStore => "result_store",
            Self::Metadata => "metadata_server",
        }
    }
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Source document not found: gs://{bucket}/{path}")]
    SourceNotFound { bucket: String, path: String },

    #[error("Batch process failed ({state}): {message}")]
    BatchProcessingFailed { state: String, message: String },

    #[error("Waiting for batch operation {operation} failed: {reason}")]
    BatchWaitFailed { operation: String, reason: String },

    #[error("Processed document not found under any batch output location")]
    ResultNotFound,

    #[error("{service} error: {message}")]
    RemoteService { service: Service, message: String },

    #[error("Object not found: gs://{bucket}/{path}")]
    ObjectNotFound { bucket: String, path: String },

    #[error("No staged object to delete")]
    NothingStaged,

    #[error("An object is already staged at {0}")]
    AlreadyStaged(String),

    #[error("Invalid trigger event: {0}")]
    InvalidEvent(String),

    #[error("Invalid storage URI: {0}")]
    InvalidUri(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    pub fn remote(service: Service, message: impl Into<String>) -> Self {
        Self::RemoteService {
            service,
            message: message.into(),
        }
    }

    /// Whether redelivering the same trigger event could succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RemoteService { .. } | Self::BatchWaitFailed { .. } | Self::Http(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
