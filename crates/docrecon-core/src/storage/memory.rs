//! In-memory object storage for tests and local runs.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use super::{ObjectInfo, ObjectStore};
use crate::document::ObjectLocation;
use crate::{Error, Result};

struct StoredObject {
    data: Vec<u8>,
    content_type: String,
}

/// Objects keyed by `(bucket, path)`; listings come back in name order like
/// Cloud Storage.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: RwLock<BTreeMap<(String, String), StoredObject>>,
}

impl MemoryObjectStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object.
    pub fn insert(
        &self,
        location: &ObjectLocation,
        data: impl Into<Vec<u8>>,
        content_type: impl Into<String>,
    ) {
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                (location.bucket.clone(), location.path.clone()),
                StoredObject {
                    data: data.into(),
                    content_type: content_type.into(),
                },
            );
    }

    #[must_use]
    pub fn contains(&self, location: &ObjectLocation) -> bool {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&(location.bucket.clone(), location.path.clone()))
    }

    /// All object locations in a bucket.
    #[must_use]
    pub fn locations(&self, bucket: &str) -> Vec<ObjectLocation> {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(b, p)| ObjectLocation::new(b, p))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn download(&self, location: &ObjectLocation) -> Result<Vec<u8>> {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(location.bucket.clone(), location.path.clone()))
            .map(|object| object.data.clone())
            .ok_or_else(|| Error::ObjectNotFound {
                bucket: location.bucket.clone(),
                path: location.path.clone(),
            })
    }

    async fn upload(
        &self,
        location: &ObjectLocation,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        self.insert(location, data, content_type);
        Ok(())
    }

    async fn delete(&self, location: &ObjectLocation) -> Result<()> {
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&(location.bucket.clone(), location.path.clone()))
            .map(|_| ())
            .ok_or_else(|| Error::ObjectNotFound {
                bucket: location.bucket.clone(),
                path: location.path.clone(),
            })
    }

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectInfo>> {
        Ok(self
            .objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|((b, path), _)| b == bucket && path.starts_with(prefix))
            .map(|((_, path), object)| ObjectInfo {
                name: path.clone(),
                content_type: Some(object.content_type.clone()),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_download_delete() {
        let store = MemoryObjectStore::new();
        let loc = ObjectLocation::new("temp", "a/b.pdf");

        store.upload(&loc, b"%PDF".to_vec(), "application/pdf").await.unwrap();
        assert_eq!(store.download(&loc).await.unwrap(), b"%PDF");

        store.delete(&loc).await.unwrap();
        assert!(!store.contains(&loc));
        assert!(matches!(
            store.delete(&loc).await,
            Err(Error::ObjectNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_filters_by_bucket_and_prefix() {
        let store = MemoryObjectStore::new();
        store.insert(&ObjectLocation::new("out", "job/1/b.json"), "{}", "application/json");
        store.insert(&ObjectLocation::new("out", "job/1/a.txt"), "", "text/plain");
        store.insert(&ObjectLocation::new("out", "job/2/c.json"), "{}", "application/json");
        store.insert(&ObjectLocation::new("other", "job/1/d.json"), "{}", "application/json");

        let names: Vec<_> = store
            .list("out", "job/1/")
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.name)
            .collect();

        assert_eq!(names, vec!["job/1/a.txt", "job/1/b.json"]);
    }
}
