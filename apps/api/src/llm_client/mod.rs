//! LLM Client — the single point of entry for all model server calls in Skillmark.
//!
//! ARCHITECTURAL RULE: No other module may talk to the model server directly.
//! All generation requests MUST go through `TextGenerator`.
//!
//! The server is an Ollama-compatible endpoint reached at `<base_url>/api/generate`.
//! It streams newline-delimited JSON; see `stream` for the aggregation rules.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;
pub mod stream;

#[cfg(test)]
pub mod mock;

use crate::llm_client::prompts::ANALYZE_JD_SYSTEM;
use crate::llm_client::stream::StreamAggregator;

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "mistral:latest";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
/// Temperature used for extraction-style calls: focused, repeatable output.
pub const ANALYSIS_TEMPERATURE: f32 = 0.2;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Failed to communicate with model server: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Model server returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Failed to communicate with model server: {0}")]
    Communication(String),

    #[error("Malformed stream line {line}: {message}")]
    ResponseFormat { line: usize, message: String },
}

impl LlmError {
    /// True for transport-level failures: unreachable server, bad status,
    /// or a server-reported error mid-stream.
    pub fn is_communication(&self) -> bool {
        matches!(
            self,
            LlmError::Http(_) | LlmError::Api { .. } | LlmError::Communication(_)
        )
    }
}

/// A single text-generation call. Serializes directly as the request body:
/// `{model, prompt, temperature, system?}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            prompt: prompt.into(),
            temperature: DEFAULT_TEMPERATURE,
            system: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// No range check: out-of-range values are left for the server to reject or clamp.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Raw output of `analyze_job_description`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawAnalysis {
    pub raw_analysis: String,
}

/// The generation seam. `OllamaClient` is the production backend;
/// carried in `AppState` as `Arc<dyn TextGenerator>`.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Runs one generation and returns the fully aggregated, trimmed text.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError>;

    /// Model used when a caller has no preference.
    fn default_model(&self) -> &str;
}

#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    /// `timeout` of `None` leaves the transport default in place (no overall deadline).
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, LlmError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.base_url);

        let mut response = self.client.post(&url).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Model server returned {}: {}", status, body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let mut aggregator = StreamAggregator::new();
        while let Some(chunk) = response.chunk().await? {
            aggregator.push(&chunk)?;
        }

        let fragments = aggregator.fragments();
        let done = aggregator.is_done();
        let text = aggregator.finish()?;

        debug!(
            "Generation succeeded: model={}, fragments={}, done={}, chars={}",
            request.model,
            fragments,
            done,
            text.len()
        );

        Ok(text)
    }

    fn default_model(&self) -> &str {
        &self.model
    }
}

/// Asks the model for a general breakdown of a job description.
///
/// The answer is returned verbatim under `raw_analysis`.
pub async fn analyze_job_description(
    generator: &dyn TextGenerator,
    text: &str,
) -> Result<RawAnalysis, LlmError> {
    let request = GenerationRequest::new(text)
        .with_model(generator.default_model())
        .with_system(ANALYZE_JD_SYSTEM)
        .with_temperature(ANALYSIS_TEMPERATURE);

    let raw_analysis = generator.generate(&request).await?;

    // TODO: parse into structured requirements once the analysis output has a fixed schema.
    Ok(RawAnalysis { raw_analysis })
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}
