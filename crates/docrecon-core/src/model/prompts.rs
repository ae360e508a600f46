use std::path::Path;

use crate::Result;

/// Asks for the document's entities as a flat JSON object.
pub const EXTRACT_ENTITIES_PROMPT: &str = r#"You are a document data extraction assistant.
Read the attached document and extract every business entity it contains:
names, identifiers, dates, addresses, amounts, totals, currencies and line items.

Respond with a single JSON object and nothing else. Use snake_case entity
types as keys and the text exactly as it appears in the document as values.
When an entity type occurs more than once, use an array of values.
Omit entity types that are not present."#;

/// Compares the two extraction outputs. Placeholders: `{docai_output}`,
/// `{gemini_output}`.
pub const COMPARE_ENTITIES_PROMPT: &str = r#"Two systems extracted entities from the same document.

Document AI output:
{docai_output}

Gemini output:
{gemini_output}

Compare the two outputs entity by entity. For each entity type say whether the
values match, match after normalizing formatting (case, whitespace, currency
symbols, number and date formats), differ, or are missing from one side.
Finish with a one-paragraph summary of how far the two extractions agree and
which values need human review."#;

/// Yes/no check that two names refer to the same person or organization.
/// Placeholders: `{candidate}`, `{extracted}`.
pub const NAME_MATCH_PROMPT: &str = r#"Are these names: "{candidate}" and "{extracted}" considered the same? Only answer with 'true' if the full name is present in the piece of text, else output 'false'."#;

/// Prompt text with `{name}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    text: String,
}

impl PromptTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    #[must_use]
    pub fn extract_entities() -> Self {
        Self::new(EXTRACT_ENTITIES_PROMPT)
    }

    #[must_use]
    pub fn compare_entities() -> Self {
        Self::new(COMPARE_ENTITIES_PROMPT)
    }

    #[must_use]
    pub fn name_match() -> Self {
        Self::new(NAME_MATCH_PROMPT)
    }

    pub async fn from_file(path: &Path) -> Result<Self> {
        Ok(Self::new(tokio::fs::read_to_string(path).await?))
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Substitute each `{name}` with its value. Unknown placeholders are left
    /// in place; values are inserted verbatim and never re-scanned.
    #[must_use]
    pub fn render(&self, values: &[(&str, &str)]) -> String {
        let mut out = String::with_capacity(self.text.len());
        let mut rest = self.text.as_str();

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];

            let substituted = after.find('}').and_then(|close| {
                let key = &after[..close];
                values
                    .iter()
                    .find(|(name, _)| *name == key)
                    .map(|(_, value)| (*value, close))
            });

            match substituted {
                Some((value, close)) => {
                    out.push_str(value);
                    rest = &after[close + 1..];
                }
                None => {
                    out.push('{');
                    rest = after;
                }
            }
        }

        out.push_str(rest);
        out
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::extract_entities()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_placeholders() {
        let prompt = PromptTemplate::compare_entities().render(&[
            ("docai_output", r#"{"total":"100.00"}"#),
            ("gemini_output", r#"{"total":"100"}"#),
        ]);

        assert!(prompt.contains(r#"Document AI output:
{"total":"100.00"}"#));
        assert!(prompt.contains(r#"Gemini output:
{"total":"100"}"#));
        assert!(!prompt.contains("{docai_output}"));
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let template = PromptTemplate::new("a={a} b={b}");
        assert_eq!(template.render(&[("a", "{b}"), ("b", "2")]), "a={b} b=2");
    }

    #[test]
    fn test_unknown_and_unclosed_braces_survive() {
        let template = PromptTemplate::new("json {\"k\": 1} {missing} {open");
        assert_eq!(template.render(&[]), "json {\"k\": 1} {missing} {open");
    }
}
