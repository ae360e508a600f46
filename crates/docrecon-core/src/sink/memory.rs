use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use super::{ResultRecord, ResultSink};
use crate::Result;

/// Keeps records in memory. Counts every write so tests can assert on it.
#[derive(Default)]
pub struct MemorySink {
    records: RwLock<BTreeMap<String, ResultRecord>>,
    writes: AtomicUsize,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<ResultRecord> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    #[must_use]
    pub fn records(&self) -> Vec<ResultRecord> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResultSink for MemorySink {
    async fn put(&self, record: &ResultRecord) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(record.name.clone(), record.clone());
        Ok(())
    }
}
