//! Crate-boundary error type.
//!
//! Construction-time validation failures are the only errors the engine
//! surfaces to its caller; nothing inside a running meeting propagates one
//! of these (see the fallback semantics in each module instead).

use thiserror::Error;

/// Errors raised while building a meeting (roster validation) or loading config.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("duplicate agent name: {0}")]
    DuplicateAgentName(String),

    #[error("no Chair present in the roster (expected an agent named \"Alice\")")]
    NoChair,

    #[error("agent name must be 1..=50 characters: {0:?}")]
    InvalidAgentName(String),

    #[error("persona for {agent} must be 10..=500 characters, got {len}")]
    InvalidPersonaLength { agent: String, len: usize },

    #[error("dominance for {agent} must be in [0.1, 3.0], got {value}")]
    InvalidDominance { agent: String, value: f64 },

    #[error("trait {trait_name} for {agent} must be in [0, 1], got {value}")]
    InvalidTrait {
        agent: String,
        trait_name: &'static str,
        value: f64,
    },

    #[error("empty agent roster")]
    EmptyRoster,

    #[error("configuration file present but malformed: {0}")]
    ConfigParse(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
