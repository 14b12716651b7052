//! Layered runtime configuration (§4.8): defaults, an optional TOML file,
//! then `MEETING_`-prefixed environment variables, in ascending priority.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::types::Conditions;

/// LLM call tuning: timeouts and retry policy for the constrained-output adapter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LlmSettings {
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
}

fn default_timeout_seconds() -> u64 {
    20
}

/// Default matches §7's transport-error contract: retry once with jitter,
/// then fall back on a second failure.
fn default_max_retries() -> u32 {
    1
}

fn default_initial_backoff_ms() -> u64 {
    250
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
        }
    }
}

/// Top-level engine configuration, loaded once at meeting construction time.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MeetingEngineConfig {
    /// Fixed seed for reproducible runs; `None` draws from entropy.
    #[serde(default)]
    pub rng_seed: Option<u64>,

    #[serde(default)]
    pub llm: LlmSettings,

    #[serde(default)]
    pub conditions: Conditions,
}

/// Load settings from an optional TOML file, then `MEETING_`-prefixed env vars.
///
/// Priority (highest to lowest):
/// 1. Environment variables (`MEETING_` prefix, `__` nested separator)
/// 2. `path` (if given and present on disk)
/// 3. built-in defaults
///
/// A missing or malformed file never panics: a missing file is silently
/// skipped, a malformed one logs a warning and falls through to defaults.
pub fn load_config(path: Option<&str>) -> MeetingEngineConfig {
    let mut builder = Config::builder();

    if let Some(path) = path {
        builder = builder.add_source(File::with_name(path).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("MEETING")
            .separator("__")
            .try_parsing(true),
    );

    match builder.build().and_then(|c| c.try_deserialize()) {
        Ok(settings) => settings,
        Err(err) => {
            tracing::warn!(error = %err, "falling back to default meeting engine configuration");
            MeetingEngineConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults_without_panicking() {
        let cfg = load_config(Some("/nonexistent/path/to/config"));
        assert_eq!(cfg.llm.max_retries, default_max_retries());
    }
}
