mod firestore;
mod memory;
mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::base_name;
use crate::Result;

pub use firestore::FirestoreSink;
pub use memory::MemorySink;
pub use sqlite::SqliteSink;

/// The persisted outcome of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub name: String,
    pub summary: String,
    pub updated_at: DateTime<Utc>,
}

impl ResultRecord {
    /// Keys the record by the final path segment of `document_name`.
    pub fn new(document_name: &str, summary: impl Into<String>) -> Self {
        Self {
            name: base_name(document_name).to_string(),
            summary: summary.into(),
            updated_at: Utc::now(),
        }
    }
}

/// Result store boundary. Writes are upserts keyed by document base name.
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn put(&self, record: &ResultRecord) -> Result<()>;

    async fn store(&self, document_name: &str, summary: &str) -> Result<()> {
        let record = ResultRecord::new(document_name, summary);
        self.put(&record).await?;
        tracing::info!("Stored result for {}", record.name);
        Ok(())
    }
}
