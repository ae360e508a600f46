mod model;
mod structured;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::Result;

pub use model::{parse_model_output, ModelNormalizer};
pub use structured::StructuredNormalizer;

/// Entity type → extracted values, in the shape both extraction paths share.
///
/// Inserting an existing type appends another value. The textual form is a
/// JSON object with sorted keys; single values render as strings and repeated
/// ones as arrays.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityMap {
    entries: BTreeMap<String, Vec<String>>,
}

impl EntityMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Blank keys and blank values are ignored.
    pub fn insert(&mut self, entity_type: impl Into<String>, value: impl Into<String>) {
        let entity_type = entity_type.into().trim().to_string();
        let value = value.into().trim().to_string();
        if entity_type.is_empty() || value.is_empty() {
            return;
        }
        self.entries.entry(entity_type).or_default().push(value);
    }

    #[must_use]
    pub fn get(&self, entity_type: &str) -> Option<&[String]> {
        self.entries.get(entity_type).map(Vec::as_slice)
    }

    #[must_use]
    pub fn first(&self, entity_type: &str) -> Option<&str> {
        self.get(entity_type)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        let object = self
            .entries
            .iter()
            .map(|(key, values)| {
                let value = match values.as_slice() {
                    [single] => Value::String(single.clone()),
                    many => Value::Array(many.iter().cloned().map(Value::String).collect()),
                };
                (key.clone(), value)
            })
            .collect();
        Value::Object(object)
    }
}

impl std::fmt::Display for EntityMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EntityMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

/// Produces an `EntityMap` from one extraction path.
#[async_trait]
pub trait EntityNormalizer: Send + Sync {
    async fn extract_entities(&self) -> Result<EntityMap>;
}
