//! Deterministic test fake: pre-programmed responses keyed by call kind
//! (§4.3). Used by the engine's own test suite in place of a real backend so
//! the seeded scenarios in §8 are reproducible.
//!
//! The Adapter contract carries only a prompt string, so the engine prefixes
//! every prompt with its call kind ("plan:", "generate:", "critic:",
//! "option_eval:", "guidance:", "summary:", "closing:") and this fake keys
//! its queued responses on that prefix. Each call site owns a distinct kind
//! so scripted queues never cross.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::adapter::LanguageModelAdapter;
use crate::error::LlmError;

#[derive(Debug, Clone, Default)]
pub struct ScriptedResponse {
    pub free_text: Option<String>,
    pub structured: Option<Value>,
}

#[derive(Debug, Default)]
pub struct ScriptedAdapter {
    script: Mutex<HashMap<String, Vec<ScriptedResponse>>>,
    fallback: ScriptedResponse,
}

fn call_kind(prompt: &str) -> &str {
    prompt.split_once(':').map(|(kind, _)| kind).unwrap_or("generate")
}

impl ScriptedAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response to be returned the next time a prompt prefixed with `call_kind` arrives.
    pub fn push(&self, call_kind: impl Into<String>, response: ScriptedResponse) {
        self.script.lock().unwrap().entry(call_kind.into()).or_default().push(response);
    }

    fn next_for(&self, kind: &str) -> ScriptedResponse {
        let mut script = self.script.lock().unwrap();
        match script.get_mut(kind) {
            Some(queue) if !queue.is_empty() => queue.remove(0),
            _ => self.fallback.clone(),
        }
    }
}

#[async_trait]
impl LanguageModelAdapter for ScriptedAdapter {
    async fn complete(&self, prompt: &str, _temperature: f64) -> Result<String, LlmError> {
        self.next_for(call_kind(prompt))
            .free_text
            .ok_or_else(|| LlmError::InvalidResponse("no scripted free_text response available".into()))
    }

    async fn complete_structured(&self, prompt: &str, _temperature: f64, _schema: &Value) -> Result<Value, LlmError> {
        self.next_for(call_kind(prompt))
            .structured
            .ok_or_else(|| LlmError::InvalidResponse("no scripted structured response available".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn structured_responses_drain_in_fifo_order() {
        let adapter = ScriptedAdapter::new();
        adapter.push("generate", ScriptedResponse { free_text: None, structured: Some(json!({"message": "first"})) });
        adapter.push("generate", ScriptedResponse { free_text: None, structured: Some(json!({"message": "second"})) });
        let first = adapter.complete_structured("generate:go", 0.5, &json!({})).await.unwrap();
        assert_eq!(first["message"], "first");
        let second = adapter.complete_structured("generate:go", 0.5, &json!({})).await.unwrap();
        assert_eq!(second["message"], "second");
    }

    #[tokio::test]
    async fn missing_script_falls_back_to_error_not_panic() {
        let adapter = ScriptedAdapter::new();
        assert!(adapter.complete("plan:go", 0.4).await.is_err());
    }
}
