use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::document::{base_name, ObjectLocation};
use crate::storage::ObjectStore;
use crate::{Error, Result};

/// Stages one local file in object storage and owns its deletion.
///
/// A manager holds at most one staged object. `delete` removes it exactly
/// once; calling it with nothing staged fails with `Error::NothingStaged`.
pub struct TempUploader {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    prefix: String,
    staged: Option<ObjectLocation>,
}

impl TempUploader {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            prefix: String::new(),
            staged: None,
        }
    }

    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    #[must_use]
    pub const fn staged(&self) -> Option<&ObjectLocation> {
        self.staged.as_ref()
    }

    /// Upload `path` under a fresh unique name and return its `gs://` URI.
    pub async fn upload(&mut self, path: &Path) -> Result<String> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let object_name = format!("{}{}-{}", self.prefix, Uuid::new_v4(), base_name(&file_name));
        self.upload_to(path, ObjectLocation::new(&self.bucket, object_name))
            .await
    }

    /// Upload `path` to a caller-chosen location. The bucket configured at
    /// construction is not consulted.
    pub async fn upload_to(&mut self, path: &Path, location: ObjectLocation) -> Result<String> {
        if let Some(ref existing) = self.staged {
            return Err(Error::AlreadyStaged(existing.uri()));
        }

        self.store.upload_file(&location, path).await?;
        tracing::info!("Staged {} at {}", path.display(), location);

        let uri = location.uri();
        self.staged = Some(location);
        Ok(uri)
    }

    pub async fn delete(&mut self) -> Result<()> {
        let location = self.staged.take().ok_or(Error::NothingStaged)?;
        self.store.delete(&location).await?;
        tracing::info!("Removed staged object {}", location);
        Ok(())
    }

    /// Stage `path`, run `work` with its URI, then delete the staged object
    /// whether or not `work` succeeded.
    pub async fn with_staged<T, F, Fut>(&mut self, path: &Path, work: F) -> Result<T>
    where
        F: FnOnce(String) -> Fut + Send,
        Fut: Future<Output = Result<T>> + Send,
    {
        let uri = self.upload(path).await?;
        let outcome = work(uri).await;
        let cleanup = self.delete().await;
        combine_cleanup(outcome, cleanup)
    }
}

/// A manager dropped with an object still staged (its run was cancelled)
/// hands the delete to the runtime when there is one.
impl Drop for TempUploader {
    fn drop(&mut self) {
        let Some(location) = self.staged.take() else {
            return;
        };

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("Staged object {} was never deleted", location);
            return;
        };

        tracing::warn!("Abandoned staged object {}, deleting in background", location);
        let store = self.store.clone();
        handle.spawn(async move {
            match store.delete(&location).await {
                Ok(()) => tracing::info!("Removed abandoned object {}", location),
                Err(e) => tracing::error!("Failed to remove abandoned object {}: {}", location, e),
            }
        });
    }
}

/// Merge a unit of work with the cleanup that followed it. The work's own
/// error takes precedence; a cleanup failure fails an otherwise good result.
pub(crate) fn combine_cleanup<T>(outcome: Result<T>, cleanup: Result<()>) -> Result<T> {
    match (outcome, cleanup) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(cleanup_err)) => Err(cleanup_err),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(cleanup_err)) => {
            tracing::warn!("Cleanup after failure also failed: {}", cleanup_err);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryObjectStore;
    use tempfile::TempDir;

    fn local_file(dir: &TempDir, name: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, b"%PDF-1.7").unwrap();
        path
    }

    #[tokio::test]
    async fn test_delete_without_upload_fails() {
        let mut uploader = TempUploader::new(Arc::new(MemoryObjectStore::new()), "temp");
        assert!(matches!(uploader.delete().await, Err(Error::NothingStaged)));
    }

    #[tokio::test]
    async fn test_upload_then_delete_removes_object() {
        let tmp = TempDir::new().unwrap();
        let store = Arc::new(MemoryObjectStore::new());
        let mut uploader = TempUploader::new(store.clone(), "temp").with_prefix("model-input/");

        let uri = uploader.upload(&local_file(&tmp, "invoice.pdf")).await.unwrap();
        let location = ObjectLocation::parse(&uri).unwrap();
        assert!(store.contains(&location));
        assert!(location.path.starts_with("model-input/"));
        assert!(location.path.ends_with("-invoice.pdf"));

        uploader.delete().await.unwrap();
        assert!(!store.contains(&location));
        assert!(matches!(uploader.delete().await, Err(Error::NothingStaged)));
    }

    #[tokio::test]
    async fn test_second_upload_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = local_file(&tmp, "a.pdf");
        let mut uploader = TempUploader::new(Arc::new(MemoryObjectStore::new()), "temp");

        uploader.upload(&path).await.unwrap();
        assert!(matches!(
            uploader.upload(&path).await,
            Err(Error::AlreadyStaged(_))
        ));
        uploader.delete().await.unwrap();
    }

    #[tokio::test]
    async fn test_names_are_unique_per_upload() {
        let tmp = TempDir::new().unwrap();
        let path = local_file(&tmp, "same.pdf");
        let store = Arc::new(MemoryObjectStore::new());

        let mut first = TempUploader::new(store.clone(), "temp");
        let mut second = TempUploader::new(store.clone(), "temp");
        let a = first.upload(&path).await.unwrap();
        let b = second.upload(&path).await.unwrap();

        assert_ne!(a, b);
        assert_eq!(store.len(), 2);
        first.delete().await.unwrap();
        second.delete().await.unwrap();
    }

    #[tokio::test]
    async fn test_with_staged_cleans_up_on_error() {
        let tmp = TempDir::new().unwrap();
        let store = Arc::new(MemoryObjectStore::new());
        let mut uploader = TempUploader::new(store.clone(), "temp");

        let result: Result<()> = uploader
            .with_staged(&local_file(&tmp, "a.pdf"), |_uri| async {
                Err(Error::ResultNotFound)
            })
            .await;

        assert!(matches!(result, Err(Error::ResultNotFound)));
        assert!(store.is_empty());
        assert!(uploader.staged().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_work_still_removes_staged_object() {
        let tmp = TempDir::new().unwrap();
        let path = local_file(&tmp, "a.pdf");
        let store = Arc::new(MemoryObjectStore::new());
        let mut uploader = TempUploader::new(store.clone(), "temp");

        let run = uploader.with_staged(&path, |_uri| async {
            tokio::time::sleep(std::time::Duration::from_secs(30)).await;
            Ok(())
        });
        let cancelled = tokio::time::timeout(std::time::Duration::from_secs(1), run).await;
        assert!(cancelled.is_err());
        assert_eq!(store.len(), 1);

        drop(uploader);
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_upload_to_uses_given_location() {
        let tmp = TempDir::new().unwrap();
        let store = Arc::new(MemoryObjectStore::new());
        let mut uploader = TempUploader::new(store.clone(), "temp");
        let location = ObjectLocation::new("other", "batch/1234.pdf");

        let uri = uploader
            .upload_to(&local_file(&tmp, "a.pdf"), location.clone())
            .await
            .unwrap();

        assert_eq!(uri, "gs://other/batch/1234.pdf");
        assert!(store.contains(&location));
        uploader.delete().await.unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_combine_cleanup_prefers_work_error() {
        let result: Result<()> = combine_cleanup(Err(Error::ResultNotFound), Err(Error::NothingStaged));
        assert!(matches!(result, Err(Error::ResultNotFound)));

        let result = combine_cleanup(Ok(1), Err(Error::NothingStaged));
        assert!(matches!(result, Err(Error::NothingStaged)));
    }
}
