//! Mock implementations of the remote service boundaries.
//!
//! These let the pipeline and its stages be exercised without network calls.
//! Object storage has no mock here; use [`crate::storage::MemoryObjectStore`].

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use crate::error::Service;
use crate::extract::{BatchRequest, DocumentProcessor, Operation, ProcessorName, StructuredDocument};
use crate::model::{GenerateRequest, GenerativeModel};
use crate::{Error, Result};

/// Record of a call made to the mock processor.
#[derive(Debug, Clone)]
pub enum ProcessorCall {
    Process {
        processor: String,
        mime_type: String,
        size: usize,
    },
    BatchProcess {
        processor: String,
        request: BatchRequest,
    },
    GetOperation {
        name: String,
    },
}

/// A scripted structured-extraction service.
///
/// `process` answers with the configured document (empty by default).
/// Batch operations are served from a script: each call takes the next
/// operation, and the last one repeats forever.
#[derive(Default)]
pub struct MockDocumentProcessor {
    document: StructuredDocument,
    process_failure: Option<String>,
    poll_failure: Option<String>,
    operations: Mutex<VecDeque<Operation>>,
    calls: Mutex<Vec<ProcessorCall>>,
}

impl MockDocumentProcessor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_document(mut self, document: StructuredDocument) -> Self {
        self.document = document;
        self
    }

    #[must_use]
    pub fn with_process_failure(mut self, message: impl Into<String>) -> Self {
        self.process_failure = Some(message.into());
        self
    }

    /// The first operation answers `batch_process`, the rest answer polls.
    #[must_use]
    pub fn with_operations(self, operations: Vec<Operation>) -> Self {
        *self.operations.lock().unwrap_or_else(PoisonError::into_inner) = operations.into();
        self
    }

    #[must_use]
    pub fn with_poll_failure(mut self, message: impl Into<String>) -> Self {
        self.poll_failure = Some(message.into());
        self
    }

    pub fn calls(&self) -> Vec<ProcessorCall> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn record(&self, call: ProcessorCall) {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(call);
    }

    fn next_operation(&self) -> Result<Operation> {
        let mut operations = self.operations.lock().unwrap_or_else(PoisonError::into_inner);
        if operations.len() > 1 {
            if let Some(op) = operations.pop_front() {
                return Ok(op);
            }
        }
        operations
            .front()
            .cloned()
            .ok_or_else(|| Error::remote(Service::DocumentAi, "no scripted operation"))
    }
}

#[async_trait]
impl DocumentProcessor for MockDocumentProcessor {
    async fn process(
        &self,
        processor: &ProcessorName,
        content: Vec<u8>,
        mime_type: &str,
    ) -> Result<StructuredDocument> {
        self.record(ProcessorCall::Process {
            processor: processor.resource_name().to_string(),
            mime_type: mime_type.to_string(),
            size: content.len(),
        });

        match &self.process_failure {
            Some(message) => Err(Error::remote(Service::DocumentAi, message.clone())),
            None => Ok(self.document.clone()),
        }
    }

    async fn batch_process(
        &self,
        processor: &ProcessorName,
        request: &BatchRequest,
    ) -> Result<Operation> {
        self.record(ProcessorCall::BatchProcess {
            processor: processor.resource_name().to_string(),
            request: request.clone(),
        });
        self.next_operation()
    }

    async fn get_operation(&self, name: &str) -> Result<Operation> {
        self.record(ProcessorCall::GetOperation {
            name: name.to_string(),
        });

        if let Some(message) = &self.poll_failure {
            return Err(Error::remote(Service::DocumentAi, message.clone()));
        }
        self.next_operation()
    }
}

enum Reply {
    Text(String),
    Failure(String),
}

/// A generative model that replies from a FIFO script and records every
/// request, including ones that fail.
#[derive(Default)]
pub struct MockModel {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl MockModel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_response(self, text: impl Into<String>) -> Self {
        self.push(Reply::Text(text.into()));
        self
    }

    #[must_use]
    pub fn with_failure(self, message: impl Into<String>) -> Self {
        self.push(Reply::Failure(message.into()));
        self
    }

    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn push(&self, reply: Reply) {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reply);
    }
}

#[async_trait]
impl GenerativeModel for MockModel {
    async fn generate(&self, request: &GenerateRequest) -> Result<String> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        let reply = self
            .replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        match reply {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Failure(message)) => Err(Error::remote(Service::GenerativeModel, message)),
            None => Err(Error::remote(Service::GenerativeModel, "no scripted response")),
        }
    }
}
