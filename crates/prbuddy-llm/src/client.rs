use std::sync::Arc;
use std::time::Duration;

use prbuddy_core::Message;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::LlmError;

const DEFAULT_ENDPOINT: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "llama3";

#[derive(Debug, Serialize)]
struct WireMessage {
    role: String,
    content: String,
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        WireMessage {
            role: message.role.as_str().to_string(),
            content: message.content.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    num_ctx: u32,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    options: ChatOptions,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

/// A model descriptor as reported by the backend's `/api/ps`. The
/// shape beyond `name` is backend-specific, so everything else is
/// preserved as opaque JSON rather than dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub name: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<ModelDescriptor>,
}

/// Talks to a locally hosted chat-completion backend (Ollama-shaped
/// API: `/api/chat`, `/api/ps`). Holds the process-wide "active
/// model" override behind a lock, per the model-selection order in
/// the component contract: active override, then env var, then a
/// hardcoded default.
#[derive(Debug, Clone)]
pub struct LlmClient {
    http: reqwest::Client,
    endpoint: String,
    fallback_model: String,
    num_ctx: u32,
    active_model: Arc<RwLock<Option<String>>>,
}

impl LlmClient {
    pub fn new(endpoint: impl Into<String>, fallback_model: impl Into<String>) -> Self {
        LlmClient::with_timeout(endpoint, fallback_model, Duration::from_secs(30))
    }

    pub fn with_timeout(
        endpoint: impl Into<String>,
        fallback_model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        LlmClient::with_config(endpoint, fallback_model, timeout, 8192)
    }

    /// Full constructor: lets the caller pin `num_ctx` to whatever a
    /// loaded `PrbuddyConfig` specifies. `num_ctx` is advisory
    /// (backend-specific, spec §9) — unknown backends may ignore it.
    pub fn with_config(
        endpoint: impl Into<String>,
        fallback_model: impl Into<String>,
        timeout: Duration,
        num_ctx: u32,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to build LLM HTTP client");

        LlmClient {
            http,
            endpoint: endpoint.into(),
            fallback_model: fallback_model.into(),
            num_ctx,
            active_model: Arc::new(RwLock::new(None)),
        }
    }

    pub fn default_endpoint() -> String {
        std::env::var("PRBUDDY_LLM_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string())
    }

    pub fn default_fallback_model() -> String {
        DEFAULT_MODEL.to_string()
    }

    async fn resolve_model(&self) -> String {
        if let Some(active) = self.active_model.read().await.clone() {
            return active;
        }
        if let Ok(from_env) = std::env::var("PRBUDDY_LLM_MODEL") {
            if !from_env.is_empty() {
                return from_env;
            }
        }
        self.fallback_model.clone()
    }

    pub async fn set_active_model(&self, name: impl Into<String>) {
        let mut guard = self.active_model.write().await;
        *guard = Some(name.into());
    }

    pub async fn active_model(&self) -> Option<String> {
        self.active_model.read().await.clone()
    }

    /// Sends `messages` to the chat endpoint and returns the reply
    /// content. Empty content and non-2xx responses are both errors.
    pub async fn chat(&self, messages: &[Message]) -> Result<String, LlmError> {
        let model = self.resolve_model().await;
        let request = ChatRequest {
            model,
            messages: messages.iter().map(WireMessage::from).collect(),
            options: ChatOptions {
                num_ctx: self.num_ctx,
            },
            stream: false,
        };

        let url = format!("{}/api/chat", self.endpoint.trim_end_matches('/'));
        let response = self.http.post(&url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::BadStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        if parsed.message.content.is_empty() {
            return Err(LlmError::EmptyContent);
        }
        Ok(parsed.message.content)
    }

    pub async fn list_models(&self) -> Result<Vec<ModelDescriptor>, LlmError> {
        let url = format!("{}/api/ps", self.endpoint.trim_end_matches('/'));
        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::BadStatus {
                status: status.as_u16(),
                body,
            });
        }
        let parsed: ListModelsResponse = response.json().await?;
        Ok(parsed.models)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolve_model_prefers_active_override() {
        let client = LlmClient::new("http://localhost:11434", "fallback-model");
        client.set_active_model("override-model").await;
        assert_eq!(client.resolve_model().await, "override-model");
    }

    #[tokio::test]
    async fn resolve_model_falls_back_to_default_without_override_or_env() {
        std::env::remove_var("PRBUDDY_LLM_MODEL");
        let client = LlmClient::new("http://localhost:11434", "fallback-model");
        assert_eq!(client.resolve_model().await, "fallback-model");
    }
}
