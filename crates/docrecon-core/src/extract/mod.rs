mod batch;
mod docai;
mod online;
mod processor;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::Result;

pub use batch::{BatchExtractor, BatchSettings};
pub use docai::{
    BatchProcessMetadata, BatchRequest, BatchState, DocumentAiClient, DocumentProcessor,
    IndividualProcessStatus, Operation, OperationError,
};
pub use online::OnlineExtractor;
pub use processor::ProcessorName;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedValue {
    #[serde(default)]
    pub text: String,
}

/// One typed entity as Document AI reports it. Properties nest child
/// entities such as the fields of a line item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentEntity {
    #[serde(rename = "type", default)]
    pub entity_type: String,
    #[serde(default)]
    pub mention_text: String,
    #[serde(default)]
    pub confidence: f32,
    #[serde(default)]
    pub normalized_value: Option<NormalizedValue>,
    #[serde(default)]
    pub properties: Vec<DocumentEntity>,
}

impl DocumentEntity {
    pub fn new(entity_type: impl Into<String>, mention_text: impl Into<String>, confidence: f32) -> Self {
        Self {
            entity_type: entity_type.into(),
            mention_text: mention_text.into(),
            confidence,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_property(mut self, property: Self) -> Self {
        self.properties.push(property);
        self
    }

    /// Mention text, or the normalized value when the mention is blank.
    #[must_use]
    pub fn value(&self) -> &str {
        let mention = self.mention_text.trim();
        if !mention.is_empty() {
            return mention;
        }
        self.normalized_value
            .as_ref()
            .map_or("", |v| v.text.trim())
    }
}

/// Output of the structured service. Unknown fields in the service's JSON
/// are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredDocument {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub entities: Vec<DocumentEntity>,
}

impl StructuredDocument {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_entity(mut self, entity: DocumentEntity) -> Self {
        self.entities.push(entity);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMode {
    Online,
    Batch,
}

impl ExtractionMode {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Batch => "batch",
        }
    }
}

impl std::fmt::Display for ExtractionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExtractionMode {
    type Err = crate::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "online" => Ok(Self::Online),
            "batch" => Ok(Self::Batch),
            other => Err(crate::Error::Config(format!(
                "unknown extraction mode: {other}"
            ))),
        }
    }
}

/// Submits a local document to the structured service.
#[async_trait]
pub trait StructuredExtractor: Send + Sync {
    fn mode(&self) -> ExtractionMode;

    fn processor(&self) -> &ProcessorName;

    async fn process_document(&self, file: &Path, mime_type: &str) -> Result<StructuredDocument>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_json_parsing() {
        let json = r#"{
            "uri": "",
            "mimeType": "application/pdf",
            "text": "INVOICE\nTotal: 100.00",
            "pages": [{"pageNumber": 1}],
            "entities": [{
                "type": "total_amount",
                "mentionText": "100.00",
                "confidence": 0.98,
                "normalizedValue": {"text": "100", "moneyValue": {"units": "100"}}
            }, {
                "type": "line_item",
                "mentionText": "Widget 2 50.00",
                "properties": [{"type": "line_item/amount", "mentionText": "50.00"}]
            }]
        }"#;

        let doc: StructuredDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.entities.len(), 2);
        assert_eq!(doc.entities[0].entity_type, "total_amount");
        assert_eq!(doc.entities[0].value(), "100.00");
        assert_eq!(doc.entities[1].properties[0].value(), "50.00");
    }

    #[test]
    fn test_value_falls_back_to_normalized() {
        let mut entity = DocumentEntity::new("invoice_date", "  ", 0.7);
        entity.normalized_value = Some(NormalizedValue {
            text: "2024-03-01".into(),
        });
        assert_eq!(entity.value(), "2024-03-01");
    }

    #[test]
    fn test_extraction_mode_from_str() {
        assert_eq!("Batch".parse::<ExtractionMode>().unwrap(), ExtractionMode::Batch);
        assert!("streaming".parse::<ExtractionMode>().is_err());
    }
}
