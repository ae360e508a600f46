use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use super::{EntityMap, EntityNormalizer};
use crate::model::{Attachment, GenerateRequest, GenerativeModel, PromptTemplate};
use crate::Result;

/// Asks the generative model to read a staged document and list its entities.
pub struct ModelNormalizer {
    model: Arc<dyn GenerativeModel>,
    model_name: String,
    prompt: PromptTemplate,
    document: Attachment,
    temperature: Option<f32>,
}

impl ModelNormalizer {
    pub fn new(
        model: Arc<dyn GenerativeModel>,
        model_name: impl Into<String>,
        prompt: PromptTemplate,
        document: Attachment,
    ) -> Self {
        Self {
            model,
            model_name: model_name.into(),
            prompt,
            document,
            temperature: None,
        }
    }

    #[must_use]
    pub const fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }
}

#[async_trait]
impl EntityNormalizer for ModelNormalizer {
    async fn extract_entities(&self) -> Result<EntityMap> {
        let request = GenerateRequest::new(&self.model_name, self.prompt.text())
            .with_attachment(self.document.clone())
            .with_temperature(self.temperature);

        let text = self.model.generate(&request).await?;
        let map = parse_model_output(&text);

        if map.is_empty() {
            tracing::warn!(
                "No entities could be parsed from {} output ({} chars)",
                self.model_name,
                text.len()
            );
        } else {
            tracing::info!("{} extracted {} entity types", self.model_name, map.len());
        }

        Ok(map)
    }
}

/// Best-effort parse of model text into an `EntityMap`.
///
/// Accepts a JSON object (optionally inside a Markdown code fence or
/// surrounded by prose), a JSON array of `{type, value}` objects, or plain
/// `key: value` lines. Anything else, including JSON with no usable values,
/// yields an empty map.
#[must_use]
pub fn parse_model_output(text: &str) -> EntityMap {
    let body = strip_code_fence(text);
    let mut map = EntityMap::new();

    // Once the reply holds a JSON object or array, it is the answer even when
    // nothing in it survives; its text is never re-read as `key: value` lines.
    match embedded_json(body) {
        Some(value @ Value::Object(_)) => {
            flatten("", &value, &mut map);
            return map;
        }
        Some(Value::Array(items)) => {
            collect_typed_items(&items, &mut map);
            return map;
        }
        _ => {}
    }

    parse_key_value_lines(body, &mut map);
    map
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the info string (e.g. "json") on the opening fence line.
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end()
        .strip_suffix("```")
        .unwrap_or(rest)
        .trim()
}

fn embedded_json(body: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        return Some(value);
    }

    for (open, close) in [('{', '}'), ('[', ']')] {
        if let (Some(start), Some(end)) = (body.find(open), body.rfind(close)) {
            if start < end {
                if let Ok(value) = serde_json::from_str::<Value>(&body[start..=end]) {
                    return Some(value);
                }
            }
        }
    }
    None
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn flatten(prefix: &str, value: &Value, map: &mut EntityMap) {
    match value {
        Value::Object(fields) => {
            for (key, child) in fields {
                let key = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten(&key, child, map);
            }
        }
        Value::Array(items) => {
            for item in items {
                flatten(prefix, item, map);
            }
        }
        Value::Null => {}
        scalar => {
            if let Some(text) = scalar_text(scalar) {
                map.insert(prefix, text);
            }
        }
    }
}

/// `[{"type": "total", "value": "100"}, ...]`, the shape models reach for
/// when imitating the structured service.
fn collect_typed_items(items: &[Value], map: &mut EntityMap) {
    for item in items {
        let Some(fields) = item.as_object() else {
            continue;
        };
        let entity_type = ["type", "entity_type", "name", "key"]
            .iter()
            .find_map(|k| fields.get(*k).and_then(Value::as_str));
        let value = ["value", "mention_text", "mentionText", "text"]
            .iter()
            .find_map(|k| fields.get(*k).and_then(scalar_text));

        if let (Some(entity_type), Some(value)) = (entity_type, value) {
            map.insert(entity_type, value);
        }
    }
}

fn parse_key_value_lines(body: &str, map: &mut EntityMap) {
    for line in body.lines() {
        let line = line.trim().trim_start_matches(['-', '*', '•']).trim();
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };

        let key = key.trim().trim_matches(|c| c == '*' || c == '"' || c == '`').trim();
        let value = value
            .trim()
            .trim_end_matches(',')
            .trim_matches(|c| c == '"' || c == '`')
            .trim();

        if key.is_empty() || key.split_whitespace().count() > 4 {
            continue;
        }
        map.insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockModel;

    #[test]
    fn test_plain_json_object() {
        let map = parse_model_output(r#"{"total": "100", "currency": "USD"}"#);
        assert_eq!(map.first("total"), Some("100"));
        assert_eq!(map.first("currency"), Some("USD"));
    }

    #[test]
    fn test_fenced_json_with_numbers_arrays_and_nesting() {
        let text = "```json\n{\n  \"total\": 100,\n  \"paid\": false,\n  \"line_item\": [\"Widget\", \"Gadget\"],\n  \"supplier\": {\"name\": \"Acme\", \"vat\": null}\n}\n```";
        let map = parse_model_output(text);

        assert_eq!(map.first("total"), Some("100"));
        assert_eq!(map.first("paid"), Some("false"));
        assert_eq!(map.get("line_item").unwrap().len(), 2);
        assert_eq!(map.first("supplier.name"), Some("Acme"));
        assert!(map.get("supplier.vat").is_none());
    }

    #[test]
    fn test_json_surrounded_by_prose() {
        let map = parse_model_output("Here are the entities:\n{\"invoice_id\": \"INV-7\"}\nLet me know!");
        assert_eq!(map.first("invoice_id"), Some("INV-7"));
    }

    #[test]
    fn test_typed_item_array() {
        let map = parse_model_output(
            r#"[{"type": "total", "value": "100"}, {"type": "due_date", "mentionText": "2024-04-01"}, "noise"]"#,
        );
        assert_eq!(map.first("total"), Some("100"));
        assert_eq!(map.first("due_date"), Some("2024-04-01"));
    }

    #[test]
    fn test_key_value_lines() {
        let map = parse_model_output("- **total**: 100\n* supplier_name: \"Acme Corp\",\nThis sentence is prose without a colon");
        assert_eq!(map.first("total"), Some("100"));
        assert_eq!(map.first("supplier_name"), Some("Acme Corp"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_json_without_values_is_empty() {
        assert!(parse_model_output(r#"{"total": null}"#).is_empty());
        assert!(parse_model_output("```json\n{\"supplier\": {\"vat\": null}}\n```").is_empty());
        assert!(parse_model_output(r#"[{"note": "no entities: none found"}]"#).is_empty());
    }

    #[test]
    fn test_unparseable_is_empty() {
        assert!(parse_model_output("I could not read the document.").is_empty());
        assert!(parse_model_output("").is_empty());
    }

    #[tokio::test]
    async fn test_sends_prompt_with_attachment() {
        let model = Arc::new(MockModel::new().with_response(r#"{"total": "100"}"#));
        let normalizer = ModelNormalizer::new(
            model.clone(),
            "gemini-1.5-flash-001",
            PromptTemplate::new("Extract."),
            Attachment::new("gs://temp/abc-invoice.pdf", "application/pdf"),
        )
        .with_temperature(Some(0.1));

        let map = normalizer.extract_entities().await.unwrap();

        assert_eq!(map.to_string(), r#"{"total":"100"}"#);
        let requests = model.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "gemini-1.5-flash-001");
        assert_eq!(requests[0].prompt, "Extract.");
        assert_eq!(
            requests[0].attachment.as_ref().unwrap().uri,
            "gs://temp/abc-invoice.pdf"
        );
        assert_eq!(requests[0].temperature, Some(0.1));
    }
}
