//! LLM adapter: prompt assembly, constrained-output invocation, and
//! candidate reranking.

pub mod adapter;
pub mod candidates;
pub mod error;
pub mod prompt;
pub mod remote;
pub mod schemas;
pub mod scripted;

pub use adapter::LanguageModelAdapter;
pub use candidates::{generate_candidates, heuristic_score};
pub use error::LlmError;
pub use prompt::allowed_speech_acts;
pub use remote::RemoteAdapter;
pub use scripted::{ScriptedAdapter, ScriptedResponse};
