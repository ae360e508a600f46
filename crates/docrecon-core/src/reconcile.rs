use std::sync::Arc;

use crate::model::{GenerateRequest, GenerativeModel, PromptTemplate};
use crate::normalize::EntityMap;
use crate::Result;

/// Name checks want a near-deterministic one-word answer.
const NAME_MATCH_TEMPERATURE: f32 = 0.01;

/// Has the generative model judge how well two entity maps agree.
///
/// The two maps are never diffed structurally; both are rendered into the
/// comparison prompt and whatever text the model returns is the summary.
/// One call, no retry.
pub struct Reconciler {
    model: Arc<dyn GenerativeModel>,
    model_name: String,
    template: PromptTemplate,
    temperature: Option<f32>,
}

impl Reconciler {
    pub fn new(model: Arc<dyn GenerativeModel>, model_name: impl Into<String>) -> Self {
        Self {
            model,
            model_name: model_name.into(),
            template: PromptTemplate::compare_entities(),
            temperature: None,
        }
    }

    #[must_use]
    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    #[must_use]
    pub const fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    #[must_use]
    pub fn prompt(&self, structured: &EntityMap, generated: &EntityMap) -> String {
        let structured = structured.to_string();
        let generated = generated.to_string();
        self.template.render(&[
            ("docai_output", &structured),
            ("gemini_output", &generated),
        ])
    }

    pub async fn compare(&self, structured: &EntityMap, generated: &EntityMap) -> Result<String> {
        let request = GenerateRequest::new(&self.model_name, self.prompt(structured, generated))
            .with_temperature(self.temperature);

        let summary = self.model.generate(&request).await?;
        tracing::info!("Reconciliation summary: {} chars", summary.len());
        Ok(summary)
    }

    /// Ask the model whether `candidate` and the `extracted` name are the
    /// same. Only the exact reply `true` counts as a match.
    pub async fn names_match(&self, candidate: &str, extracted: &str) -> Result<bool> {
        let prompt = PromptTemplate::name_match()
            .render(&[("candidate", candidate), ("extracted", extracted)]);
        let request = GenerateRequest::new(&self.model_name, prompt)
            .with_temperature(Some(NAME_MATCH_TEMPERATURE));

        let reply = self.model.generate(&request).await?;
        let matched = reply == "true";
        if matched {
            tracing::info!("Model matched {:?} with {:?}", extracted, candidate);
        } else {
            tracing::info!("No match for {:?} and {:?}", extracted, candidate);
        }
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockModel;
    use crate::Error;

    fn maps() -> (EntityMap, EntityMap) {
        (
            [("total", "100.00")].into_iter().collect(),
            [("total", "100")].into_iter().collect(),
        )
    }

    #[tokio::test]
    async fn test_compare_embeds_both_maps() {
        let model = Arc::new(MockModel::new().with_response("Values match within formatting."));
        let reconciler = Reconciler::new(model.clone(), "gemini-1.5-flash-001")
            .with_template(PromptTemplate::new("A={docai_output}\nB={gemini_output}"));
        let (a, b) = maps();

        let summary = reconciler.compare(&a, &b).await.unwrap();

        assert_eq!(summary, "Values match within formatting.");
        let requests = model.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].prompt,
            "A={\"total\":\"100.00\"}\nB={\"total\":\"100\"}"
        );
        assert!(requests[0].attachment.is_none());
    }

    #[tokio::test]
    async fn test_model_failure_propagates() {
        let model = Arc::new(MockModel::new().with_failure("429 RESOURCE_EXHAUSTED"));
        let reconciler = Reconciler::new(model.clone(), "gemini");
        let (a, b) = maps();

        let err = reconciler.compare(&a, &b).await.unwrap_err();

        assert!(matches!(err, Error::RemoteService { .. }));
        assert_eq!(model.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_names_match_on_exact_true() {
        let model = Arc::new(MockModel::new().with_response("true"));
        let reconciler = Reconciler::new(model.clone(), "gemini-1.0-pro-001")
            .with_temperature(Some(0.7));

        assert!(reconciler.names_match("Jane Q. Doe", "JANE DOE").await.unwrap());

        let requests = model.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "gemini-1.0-pro-001");
        assert_eq!(requests[0].temperature, Some(0.01));
        assert!(requests[0].prompt.starts_with(r#"Are these names: "Jane Q. Doe" and "JANE DOE""#));
        assert!(requests[0].attachment.is_none());
    }

    #[tokio::test]
    async fn test_names_match_rejects_anything_else() {
        let model = Arc::new(
            MockModel::new()
                .with_response("false")
                .with_response("True")
                .with_response("true.\n"),
        );
        let reconciler = Reconciler::new(model, "gemini");

        assert!(!reconciler.names_match("Acme Corp", "Acme Corporation").await.unwrap());
        assert!(!reconciler.names_match("Acme Corp", "Acme Corporation").await.unwrap());
        assert!(!reconciler.names_match("Acme Corp", "Acme Corporation").await.unwrap());
    }

    #[tokio::test]
    async fn test_names_match_propagates_model_failure() {
        let model = Arc::new(MockModel::new().with_failure("503 UNAVAILABLE"));
        let reconciler = Reconciler::new(model, "gemini");

        let err = reconciler.names_match("Jane Doe", "Jane Doe").await.unwrap_err();
        assert!(matches!(err, Error::RemoteService { .. }));
    }
}
