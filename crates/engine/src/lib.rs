//! Stage-driven meeting orchestrator: Chair, participant turns, summarizer
//! and the streaming event loop.

pub mod chair;
pub mod events;
pub mod orchestrator;
pub mod summarizer;
pub mod turn;

use std::pin::Pin;
use std::sync::Arc;

use futures::Stream;
use meeting_core::{
    validate_roster, AgentDescriptor, AgentProfile, CancellationHandle, Conditions, MeetingRng,
    MeetingState, Result,
};
use meeting_llm::adapter::LanguageModelAdapter;

pub use events::Event;
pub use orchestrator::run_meeting;

/// Validate a roster and assemble the initial `MeetingState` (§6 Engine
/// contract). This is the single entry point the HTTP/persistence layer
/// calls before handing the resulting stream off to `run_meeting`.
pub fn build_meeting(
    issue: impl Into<String>,
    agents: Vec<AgentDescriptor>,
    conditions: Conditions,
    rng_seed: Option<u64>,
    cancellation: CancellationHandle,
) -> Result<MeetingState> {
    validate_roster(&agents)?;

    let stances = agents.iter().map(|a| (a.name.clone(), a.stance)).collect();
    let profiles: Vec<AgentProfile> = agents.iter().map(AgentProfile::from).collect();
    let rng = match rng_seed {
        Some(seed) => MeetingRng::from_seed(seed),
        None => {
            let rng = MeetingRng::from_entropy();
            tracing::info!(seed = rng.seed(), "seeded meeting RNG from entropy");
            rng
        }
    };

    Ok(MeetingState::new(issue.into(), profiles, stances, conditions, rng, cancellation))
}

/// Validate, assemble, and run a meeting in one call, returning its event stream.
pub fn run_meeting_from_descriptors(
    issue: impl Into<String>,
    agents: Vec<AgentDescriptor>,
    conditions: Conditions,
    rng_seed: Option<u64>,
    cancellation: CancellationHandle,
    adapter: Arc<dyn LanguageModelAdapter>,
) -> Result<Pin<Box<dyn Stream<Item = Event> + Send + 'static>>> {
    let state = build_meeting(issue, agents, conditions, rng_seed, cancellation)?;
    Ok(run_meeting(state, adapter))
}
