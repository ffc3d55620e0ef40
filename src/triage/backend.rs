//! Text-completion backends. [`OllamaBackend`] talks to a local Ollama
//! server over its `/api/generate` and `/api/tags` endpoints.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::prompt::SamplingOptions;
use super::TriageError;
use crate::config::ModelConfig;

/// A single-shot, stateless completion endpoint.
#[async_trait::async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Name of the model being queried, for logging.
    fn model_name(&self) -> &str;

    /// Submit `prompt` and return the raw completion text.
    async fn complete(&self, prompt: &str) -> Result<String, TriageError>;

    /// Lightweight reachability check. Never errors.
    async fn health(&self) -> bool;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: SamplingOptions,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: Option<String>,
}

/// Ollama-compatible backend.
#[derive(Debug, Clone)]
pub struct OllamaBackend {
    client: Client,
    endpoint: String,
    model: String,
    options: SamplingOptions,
    timeout: Duration,
    health_timeout: Duration,
}

impl OllamaBackend {
    /// Build a backend around an existing client (and its connection pool).
    pub fn new(client: Client, config: &ModelConfig) -> Self {
        Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.name.clone(),
            options: config.sampling(),
            timeout: Duration::from_secs(config.timeout_secs),
            health_timeout: Duration::from_secs(config.health_timeout_secs),
        }
    }

    /// Build a backend with a fresh client.
    pub fn from_config(config: &ModelConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("idstriage/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::new(client, config))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl CompletionBackend for OllamaBackend {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, TriageError> {
        let url = format!("{}/api/generate", self.endpoint);
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: self.options,
        };

        let response = self
            .client
            .post(url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TriageError::Status(status.as_u16()));
        }

        let payload: GenerateResponse = response
            .json()
            .await
            .map_err(|e| TriageError::MalformedOutput(e.to_string()))?;

        payload
            .response
            .map(|text| text.trim().to_string())
            .ok_or_else(|| TriageError::MalformedOutput("missing 'response' field".to_string()))
    }

    async fn health(&self) -> bool {
        let url = format!("{}/api/tags", self.endpoint);
        match self
            .client
            .get(url)
            .timeout(self.health_timeout)
            .send()
            .await
        {
            Ok(resp) => resp.status() == StatusCode::OK,
            Err(e) => {
                tracing::warn!(endpoint = %self.endpoint, error = %e, "model health check failed");
                false
            }
        }
    }
}
