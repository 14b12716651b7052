//! HTTP-backed Adapter: a bounded retry-with-jitter policy and a per-call
//! timeout around a text-completion endpoint (§4.3).

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::adapter::LanguageModelAdapter;
use crate::error::LlmError;
use crate::schemas::validate;

#[derive(Debug, Clone, Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    schema: Option<&'a Value>,
}

#[derive(Debug, Clone, Deserialize)]
struct CompletionResponse {
    text: Option<String>,
    #[serde(default)]
    value: Option<Value>,
}

/// Speaks to an HTTP text-completion endpoint: JSON request/response, with a
/// JSON Schema passed alongside constrained-output prompts and validated
/// against the response before deserialization (§4.3, §6).
pub struct RemoteAdapter {
    client: Client,
    endpoint: String,
    timeout: Duration,
    max_retries: u32,
    initial_backoff: Duration,
}

impl RemoteAdapter {
    pub fn new(endpoint: impl Into<String>, timeout_seconds: u64, max_retries: u32, initial_backoff_ms: u64) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            timeout: Duration::from_secs(timeout_seconds),
            max_retries,
            initial_backoff: Duration::from_millis(initial_backoff_ms),
        }
    }

    async fn call(&self, prompt: &str, temperature: f64, schema: Option<&Value>) -> Result<CompletionResponse, LlmError> {
        let body = CompletionRequest { prompt, temperature, schema };
        let mut backoff = self.initial_backoff;
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let jitter_ms = rand::thread_rng().gen_range(0..backoff.as_millis() as u64 + 1);
                tracing::warn!(attempt, ?backoff, "LLM call failed, retrying with jitter");
                tokio::time::sleep(Duration::from_millis(jitter_ms)).await;
                backoff *= 2;
            }

            let attempt_result = tokio::time::timeout(
                self.timeout,
                self.client.post(&self.endpoint).json(&body).send(),
            )
            .await;

            let result = match attempt_result {
                Ok(send_result) => send_result.map_err(LlmError::from),
                Err(_) => Err(LlmError::Timeout),
            };

            match result {
                Ok(response) => match response.json::<CompletionResponse>().await {
                    Ok(parsed) => return Ok(parsed),
                    Err(e) => return Err(LlmError::InvalidResponse(e.to_string())),
                },
                Err(e) if e.is_retryable() => last_err = Some(e),
                Err(e) => return Err(e),
            }
        }

        Err(last_err.unwrap_or(LlmError::Timeout))
    }
}

#[async_trait]
impl LanguageModelAdapter for RemoteAdapter {
    async fn complete(&self, prompt: &str, temperature: f64) -> Result<String, LlmError> {
        let response = self.call(prompt, temperature, None).await?;
        response.text.ok_or_else(|| LlmError::InvalidResponse("missing text field".to_string()))
    }

    async fn complete_structured(&self, prompt: &str, temperature: f64, schema: &Value) -> Result<Value, LlmError> {
        let response = self.call(prompt, temperature, Some(schema)).await?;
        let value = response
            .value
            .ok_or_else(|| LlmError::InvalidResponse("missing value field".to_string()))?;
        validate(schema, &value)?;
        Ok(value)
    }
}
