//! Gemini through the Vertex AI `generateContent` endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{GenerateRequest, GenerativeModel};
use crate::error::Service;
use crate::gcp::{ensure_success, GcpClient};
use crate::{Error, Result};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: &'static str,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    FileData {
        #[serde(rename = "fileData")]
        file_data: GeminiFileData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiFileData {
    mime_type: String,
    file_uri: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

/// Vertex AI Gemini client bound to one project and region.
pub struct VertexGemini {
    client: GcpClient,
    project: String,
    region: String,
    endpoint_override: Option<Url>,
}

impl VertexGemini {
    pub fn new(client: GcpClient, project: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            client,
            project: project.into(),
            region: region.into(),
            endpoint_override: None,
        }
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint_override = Some(endpoint);
        self
    }

    fn url(&self, model: &str) -> Result<Url> {
        let base = match self.endpoint_override {
            Some(ref endpoint) => endpoint.clone(),
            None => Url::parse(&format!("https://{}-aiplatform.googleapis.com/", self.region))
                .map_err(|e| Error::Config(format!("invalid Vertex AI region {}: {e}", self.region)))?,
        };

        base.join(&format!(
            "v1/projects/{}/locations/{}/publishers/google/models/{model}:generateContent",
            self.project, self.region
        ))
        .map_err(|e| Error::Config(e.to_string()))
    }
}

fn build_request(request: &GenerateRequest) -> GeminiRequest {
    let mut parts = Vec::with_capacity(2);
    if let Some(ref attachment) = request.attachment {
        parts.push(GeminiPart::FileData {
            file_data: GeminiFileData {
                mime_type: attachment.mime_type.clone(),
                file_uri: attachment.uri.clone(),
            },
        });
    }
    parts.push(GeminiPart::Text {
        text: request.prompt.clone(),
    });

    GeminiRequest {
        contents: vec![GeminiContent {
            role: "user",
            parts,
        }],
        generation_config: request
            .temperature
            .map(|temperature| GeminiGenerationConfig { temperature }),
    }
}

fn response_text(response: GeminiResponse) -> Result<String> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates returned".to_string());
        return Err(Error::remote(Service::GenerativeModel, reason));
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        let reason = candidate
            .finish_reason
            .unwrap_or_else(|| "UNKNOWN".to_string());
        return Err(Error::remote(
            Service::GenerativeModel,
            format!("empty response (finish reason {reason})"),
        ));
    }

    Ok(text)
}

#[async_trait]
impl GenerativeModel for VertexGemini {
    async fn generate(&self, request: &GenerateRequest) -> Result<String> {
        let url = self.url(&request.model)?;
        let body = build_request(request);

        tracing::debug!(
            "Calling {} with {} prompt chars{}",
            request.model,
            request.prompt.len(),
            if request.attachment.is_some() { " and an attached document" } else { "" }
        );

        let response = self.client.post_json(url, &body).await?;
        let response = ensure_success(response, Service::GenerativeModel).await?;
        let parsed: GeminiResponse = response.json().await?;
        response_text(parsed)
    }
}
