use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use crate::document::{LocalDocument, ObjectLocation};
use crate::storage::ObjectStore;
use crate::{Error, Result};

/// Copies uploaded objects into a local work directory.
///
/// Every fetch gets its own scratch directory under the work directory and
/// the file keeps the object's base name inside it, so concurrent runs never
/// share a local path.
pub struct DocumentFetcher {
    store: Arc<dyn ObjectStore>,
    work_dir: PathBuf,
}

/// A fetched document and the scratch directory holding it. Dropping it
/// removes the directory.
#[derive(Debug)]
pub struct FetchedDocument {
    pub document: LocalDocument,
    scratch: TempDir,
}

impl FetchedDocument {
    /// Remove the scratch directory, reporting any failure.
    pub fn close(self) -> Result<()> {
        self.scratch.close()?;
        Ok(())
    }
}

impl DocumentFetcher {
    pub fn new(store: Arc<dyn ObjectStore>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            work_dir: work_dir.into(),
        }
    }

    pub async fn fetch(&self, source: &ObjectLocation, mime_type: &str) -> Result<FetchedDocument> {
        tokio::fs::create_dir_all(&self.work_dir).await?;
        let scratch = tempfile::Builder::new()
            .prefix("run-")
            .tempdir_in(&self.work_dir)?;
        let local_path = scratch.path().join(source.base_name());

        match self.store.download_to_file(source, &local_path).await {
            Ok(()) => {}
            Err(Error::ObjectNotFound { bucket, path }) => {
                return Err(Error::SourceNotFound { bucket, path });
            }
            Err(e) => return Err(e),
        }

        tracing::info!("Fetched {} to {}", source, local_path.display());
        Ok(FetchedDocument {
            document: LocalDocument::new(source.clone(), local_path, mime_type.to_string()),
            scratch,
        })
    }
}
