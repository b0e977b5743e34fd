use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::usage::Usage;

/// Generation knobs passed with every run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelSettings {
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            temperature: Some(0.0),
            max_output_tokens: None,
        }
    }
}

/// Final text and accounting of one model run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutput {
    pub final_output: String,
    pub usage: Usage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_id: Option<String>,
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("model call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("http error: {0}")]
    Http(String),
    #[error("api error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("parse error: {0}")]
    ParseError(String),
    #[error("model returned no output text")]
    EmptyOutput,
    #[error("missing API key (set OPENAI_API_KEY)")]
    MissingApiKey,
}

/// Seam between the survey agent and a hosted model.
#[async_trait]
pub trait ModelRunner: Send + Sync {
    fn model(&self) -> &str;

    async fn run(&self, input: &str, settings: &ModelSettings) -> Result<RunOutput, AgentError>;
}
