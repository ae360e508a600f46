mod gcs;
mod memory;

use async_trait::async_trait;
use std::path::Path;

use crate::document::{extension, ObjectLocation};
use crate::Result;

pub use gcs::GcsObjectStore;
pub use memory::MemoryObjectStore;

/// One entry from a prefix listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub name: String,
    pub content_type: Option<String>,
}

impl ObjectInfo {
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.content_type.as_deref() == Some("application/json")
    }
}

/// Object storage boundary.
///
/// `download` and `delete` report a missing object as `Error::ObjectNotFound`
/// so callers can tell it apart from transport failures.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn download(&self, location: &ObjectLocation) -> Result<Vec<u8>>;

    async fn upload(&self, location: &ObjectLocation, data: Vec<u8>, content_type: &str)
        -> Result<()>;

    async fn delete(&self, location: &ObjectLocation) -> Result<()>;

    /// Objects whose name starts with `prefix`, in the store's listing order.
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectInfo>>;

    async fn download_to_file(&self, location: &ObjectLocation, dest: &Path) -> Result<()> {
        let data = self.download(location).await?;
        tokio::fs::write(dest, data).await?;
        Ok(())
    }

    async fn upload_file(&self, location: &ObjectLocation, path: &Path) -> Result<()> {
        let data = tokio::fs::read(path).await?;
        let content_type = content_type_for(&path.to_string_lossy());
        self.upload(location, data, content_type).await
    }
}

/// Guess a content type from a file name's extension.
#[must_use]
pub fn content_type_for(path: &str) -> &'static str {
    match extension(path).map(str::to_ascii_lowercase).as_deref() {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("tif" | "tiff") => "image/tiff",
        Some("bmp") => "image/bmp",
        Some("webp") => "image/webp",
        Some("json") => "application/json",
        Some("txt") => "text/plain",
        Some("html" | "htm") => "text/html",
        _ => "application/octet-stream",
    }
}
