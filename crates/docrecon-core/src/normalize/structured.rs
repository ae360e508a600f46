use async_trait::async_trait;

use super::{EntityMap, EntityNormalizer};
use crate::extract::{DocumentEntity, StructuredDocument};
use crate::Result;

/// Builds the map from the structured service's own entity schema.
pub struct StructuredNormalizer {
    document: StructuredDocument,
}

impl StructuredNormalizer {
    #[must_use]
    pub const fn new(document: StructuredDocument) -> Self {
        Self { document }
    }

    fn collect(entity: &DocumentEntity, map: &mut EntityMap) {
        map.insert(entity.entity_type.as_str(), entity.value());
        for property in &entity.properties {
            Self::collect(property, map);
        }
    }
}

#[async_trait]
impl EntityNormalizer for StructuredNormalizer {
    async fn extract_entities(&self) -> Result<EntityMap> {
        let mut map = EntityMap::new();
        for entity in &self.document.entities {
            Self::collect(entity, &mut map);
        }
        tracing::debug!(
            "Normalized {} structured entities into {} types",
            self.document.entities.len(),
            map.len()
        );
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_type_to_value() {
        let document = StructuredDocument::new()
            .with_entity(DocumentEntity::new("total", "100.00", 0.97));

        let map = StructuredNormalizer::new(document).extract_entities().await.unwrap();

        assert_eq!(map.to_string(), r#"{"total":"100.00"}"#);
    }

    #[tokio::test]
    async fn test_properties_and_repeats() {
        let document = StructuredDocument::new()
            .with_entity(
                DocumentEntity::new("line_item", "Widget x2 50.00", 0.9)
                    .with_property(DocumentEntity::new("line_item/amount", "50.00", 0.9)),
            )
            .with_entity(
                DocumentEntity::new("line_item", "Gadget x1 25.00", 0.9)
                    .with_property(DocumentEntity::new("line_item/amount", "25.00", 0.9)),
            );

        let map = StructuredNormalizer::new(document).extract_entities().await.unwrap();

        assert_eq!(map.get("line_item").unwrap().len(), 2);
        assert_eq!(
            map.get("line_item/amount").unwrap(),
            &["50.00".to_string(), "25.00".to_string()]
        );
    }
}
