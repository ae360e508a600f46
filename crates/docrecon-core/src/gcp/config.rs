use serde::{Deserialize, Serialize};

/// HTTP settings shared by every Google API client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// TCP connect timeout
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u32,

    /// Whole-request timeout. Online Document AI calls on large PDFs are slow,
    /// so this is generous.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u32,

    #[serde(default)]
    pub user_agent: Option<String>,
}

const fn default_connect_timeout() -> u32 {
    10
}

const fn default_request_timeout() -> u32 {
    300
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_seconds: default_connect_timeout(),
            request_timeout_seconds: default_request_timeout(),
            user_agent: None,
        }
    }
}

impl ClientConfig {
    #[must_use]
    pub fn user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(|| format!("docrecon/{}", env!("CARGO_PKG_VERSION")))
    }
}
