use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::document::ObjectLocation;
use crate::{Error, Result};

/// An object-finalized notification: which object was uploaded and its
/// declared MIME type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadEvent {
    pub bucket: String,
    pub name: String,
    #[serde(rename = "contentType")]
    pub content_type: String,
}

/// Pub/Sub push delivery wrapper.
#[derive(Debug, Clone, Deserialize)]
pub struct PushEnvelope {
    pub message: PushMessage,
    #[serde(default)]
    pub subscription: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushMessage {
    pub data: String,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

impl UploadEvent {
    pub fn new(
        bucket: impl Into<String>,
        name: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            name: name.into(),
            content_type: content_type.into(),
        }
    }

    /// Decode a base64-encoded JSON payload.
    pub fn decode(data: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(data.trim())
            .map_err(|e| Error::InvalidEvent(format!("payload is not base64: {e}")))?;
        let event: Self = serde_json::from_slice(&bytes)
            .map_err(|e| Error::InvalidEvent(format!("payload is not an upload event: {e}")))?;

        if event.bucket.is_empty() || event.name.is_empty() {
            return Err(Error::InvalidEvent("bucket and name must be non-empty".to_string()));
        }
        Ok(event)
    }

    pub fn from_push_envelope(body: &[u8]) -> Result<Self> {
        let envelope: PushEnvelope = serde_json::from_slice(body)
            .map_err(|e| Error::InvalidEvent(format!("malformed push envelope: {e}")))?;

        if let Some(id) = &envelope.message.message_id {
            tracing::debug!("Decoding push message {}", id);
        }
        Self::decode(&envelope.message.data)
    }

    #[must_use]
    pub fn location(&self) -> ObjectLocation {
        ObjectLocation::new(&self.bucket, &self.name)
    }

    #[must_use]
    pub fn encode(&self) -> String {
        // Serializing three string fields cannot fail.
        STANDARD.encode(serde_json::to_vec(self).unwrap_or_default())
    }
}
