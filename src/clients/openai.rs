use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use crate::clients::traits::{AgentError, ModelRunner, ModelSettings, RunOutput};
use crate::config::Config;
use crate::message::{Message, Role};
use crate::response_item::ResponseItem;
use crate::usage::Usage;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

/// Model runner backed by the OpenAI Responses API.
#[derive(Clone, Debug)]
pub struct OpenAiResponsesClient {
    endpoint: String,
    api_key: String,
    model: String,
    timeout: Duration,
    client: Client,
}

impl OpenAiResponsesClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: &str,
        timeout_ms: u64,
    ) -> Result<Self, AgentError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AgentError::MissingApiKey);
        }

        // Accept either the API root or the full responses endpoint
        let endpoint = if base_url.ends_with("/responses") {
            base_url.to_string()
        } else {
            format!("{}/responses", base_url.trim_end_matches('/'))
        };

        let timeout = Duration::from_millis(timeout_ms);
        let client = Client::builder()
            .user_agent(concat!("satisfaction-survey/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| AgentError::Http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint,
            api_key,
            model: model.into(),
            timeout,
            client,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, AgentError> {
        let api_key = config
            .runtime
            .openai_api_key
            .clone()
            .ok_or(AgentError::MissingApiKey)?;
        Self::new(
            api_key,
            config.model.name.clone(),
            &config.model.base_url,
            config.model.timeout_ms,
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn map_send_err(&self, err: reqwest::Error) -> AgentError {
        if err.is_timeout() {
            AgentError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else {
            AgentError::Http(err.to_string())
        }
    }
}

#[async_trait]
impl ModelRunner for OpenAiResponsesClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn run(&self, input: &str, settings: &ModelSettings) -> Result<RunOutput, AgentError> {
        let mut body = json!({
            "model": self.model,
            "input": input,
            "store": false
        });
        if let Some(t) = settings.temperature {
            body["temperature"] = json!(t);
        }
        if let Some(max) = settings.max_output_tokens {
            body["max_output_tokens"] = json!(max);
        }

        let res = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_err(e))?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(AgentError::Api {
                status: status.as_u16(),
                message: api_error_message(&text),
            });
        }

        let val: Value = res
            .json()
            .await
            .map_err(|e| AgentError::ParseError(format!("response body is not JSON: {}", e)))?;

        let output = parse_responses_body(&val)?;
        tracing::debug!(
            "Responses call completed: model={}, input_tokens={}, output_tokens={}",
            self.model,
            output.usage.input_tokens,
            output.usage.output_tokens
        );
        Ok(output)
    }
}

/// Map a Responses API body to the final assistant text and usage.
pub fn parse_responses_body(val: &Value) -> Result<RunOutput, AgentError> {
    if let Some(err) = val.get("error").filter(|e| !e.is_null()) {
        let message = err
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(AgentError::ParseError(format!("response carries error: {}", message)));
    }

    let items: Vec<ResponseItem> = match val.get("output") {
        Some(output) => serde_json::from_value(output.clone())
            .map_err(|e| AgentError::ParseError(format!("invalid output items: {}", e)))?,
        None => Vec::new(),
    };
    let messages = Message::from_response_items(&items)
        .map_err(|e| AgentError::ParseError(e.to_string()))?;

    let final_output: String = messages
        .iter()
        .filter(|m| m.role().as_str() == Role::ASSISTANT)
        .map(Message::content)
        .collect();
    let final_output = final_output.trim().to_string();
    if final_output.is_empty() {
        return Err(AgentError::EmptyOutput);
    }

    let mut usage = match val.get("usage") {
        Some(u) if !u.is_null() => serde_json::from_value::<Usage>(u.clone())
            .map_err(|e| AgentError::ParseError(format!("invalid usage: {}", e)))?,
        _ => Usage::default(),
    };
    usage.requests = 1;

    Ok(RunOutput {
        final_output,
        usage,
        response_id: val.get("id").and_then(Value::as_str).map(str::to_string),
    })
}

fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_body() -> Value {
        json!({
            "id": "resp_123",
            "object": "response",
            "status": "completed",
            "output": [
                {"type": "reasoning", "id": "rs_1", "summary": []},
                {
                    "type": "message",
                    "id": "msg_1",
                    "role": "assistant",
                    "status": "completed",
                    "content": [
                        {"type": "output_text", "text": "{\"question_density\": 0.5}", "annotations": []}
                    ]
                }
            ],
            "usage": {
                "input_tokens": 120,
                "input_tokens_details": {"cached_tokens": 20},
                "output_tokens": 30,
                "output_tokens_details": {"reasoning_tokens": 0},
                "total_tokens": 150
            }
        })
    }

    #[test]
    fn test_parse_responses_body() {
        let out = parse_responses_body(&sample_body()).unwrap();
        assert_eq!(out.final_output, "{\"question_density\": 0.5}");
        assert_eq!(out.response_id.as_deref(), Some("resp_123"));
        assert_eq!(out.usage.requests, 1);
        assert_eq!(out.usage.input_tokens, 120);
        assert_eq!(out.usage.input_tokens_details.cached_tokens, 20);
        assert_eq!(out.usage.total_tokens, 150);
    }

    #[test]
    fn test_parse_responses_body_refusal_only_is_empty() {
        let body = json!({
            "output": [{
                "type": "message",
                "role": "assistant",
                "content": [{"type": "refusal", "refusal": "I can't help with that."}]
            }]
        });
        assert!(matches!(
            parse_responses_body(&body),
            Err(AgentError::EmptyOutput)
        ));
    }

    #[test]
    fn test_parse_responses_body_error_object() {
        let body = json!({"error": {"message": "model overloaded"}, "output": []});
        match parse_responses_body(&body) {
            Err(AgentError::ParseError(msg)) => assert!(msg.contains("model overloaded")),
            other => panic!("Expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_api_error_message() {
        let body = r#"{"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}}"#;
        assert_eq!(api_error_message(body), "Incorrect API key provided");
        assert_eq!(api_error_message(" upstream down \n"), "upstream down");
    }

    #[test]
    fn test_new_requires_key_and_normalizes_endpoint() {
        assert!(matches!(
            OpenAiResponsesClient::new("  ", DEFAULT_MODEL, DEFAULT_BASE_URL, 1000),
            Err(AgentError::MissingApiKey)
        ));

        let client =
            OpenAiResponsesClient::new("sk-test", DEFAULT_MODEL, "http://localhost:8080/v1/", 1000)
                .unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8080/v1/responses");
        assert_eq!(client.model(), DEFAULT_MODEL);
    }
}
