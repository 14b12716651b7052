//! The Adapter contract (§6): free-text completion and constrained-output
//! completion against a declared JSON Schema. Two concrete implementations
//! ship with the engine — `RemoteAdapter` and `ScriptedAdapter`.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::LlmError;

/// Capability the engine depends on; injected at meeting construction rather
/// than reached for as a process-wide singleton (§9).
#[async_trait]
pub trait LanguageModelAdapter: Send + Sync {
    /// Free-text completion at the given creativity temperature.
    async fn complete(&self, prompt: &str, temperature: f64) -> Result<String, LlmError>;

    /// Constrained-output completion: the response is validated against
    /// `schema` before being handed back as a `serde_json::Value`.
    async fn complete_structured(
        &self,
        prompt: &str,
        temperature: f64,
        schema: &Value,
    ) -> Result<Value, LlmError>;
}
