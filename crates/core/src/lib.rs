//! Core types, schema, options registry and social model for the meeting
//! deliberation engine. This crate has no knowledge of LLMs or I/O — it is
//! the pure data model the rest of the workspace builds on.

pub mod config;
pub mod error;
pub mod options;
pub mod rng;
pub mod schema;
pub mod social;
pub mod stage;
pub mod state;
pub mod types;

pub use config::{LlmSettings, MeetingEngineConfig};
pub use error::{EngineError, Result};
pub use options::{OptionRegistry, Option_, RegisterOutcome};
pub use rng::MeetingRng;
pub use schema::{
    fallback_turn, sanitize_turn, CriticScore, OptionEval, ParsedTurn, PlanSpec, RawTurn, Reaction,
    VoteKind,
};
pub use social::SocialModel;
pub use stage::{Stage, STAGES};
pub use state::{CancellationHandle, EpisodicEntry, EpisodicKind, MeetingState, Metrics};
pub use types::{
    validate_roster, AgentDescriptor, AgentProfile, Conditions, CriteriaScores, Stance, Traits,
    CHAIR_NAME, CRITERIA,
};
