//! Produces the lazy event sequence for one meeting (§4.7), directly
//! mirroring the original streaming generator's checkpoint order: cancel,
//! chair, each agent, summarizer, re-check.

use std::pin::Pin;
use std::sync::Arc;

use futures::Stream;
use meeting_core::{MeetingState, Stage};
use meeting_llm::adapter::LanguageModelAdapter;

use crate::chair::chair_step;
use crate::events::Event;
use crate::summarizer::summarizer_step;
use crate::turn::agent_step;

const CLOSING_TRANSCRIPT_LINES: usize = 20;

/// Run a single meeting to completion (or cancellation), yielding dialogue
/// events as they happen and exactly one terminal `Event::Final`.
pub fn run_meeting(
    mut state: MeetingState,
    adapter: Arc<dyn LanguageModelAdapter>,
) -> Pin<Box<dyn Stream<Item = Event> + Send + 'static>> {
    let meeting_span = tracing::info_span!("meeting", issue = %state.issue);
    Box::pin(async_stream::stream! {
        let mut cancelled = false;

        loop {
            // Span entry is dropped before the first await below: tracing
            // guards aren't `Send` and must never be held across a suspension
            // point in a stream that itself needs to be `Send`.
            meeting_span.in_scope(|| {
                tracing::debug!(stage = state.stage.as_str(), turn = state.turn, "round start");
            });
            // 1. Cancellation checkpoint.
            if state.cancellation.is_cancelled() {
                cancelled = true;
                state.decision = Some("Meeting cancelled by user".to_string());
                state.stage = Stage::Confirm;
                break;
            }

            // 2. Chair.
            for event in chair_step(&mut state, adapter.as_ref()).await {
                yield event;
            }

            // 3. Each agent, fixed roster order.
            let roster = state.agents.clone();
            for agent in &roster {
                if state.cancellation.is_cancelled() {
                    cancelled = true;
                    state.decision = Some("Meeting cancelled by user".to_string());
                    state.stage = Stage::Confirm;
                    break;
                }
                for event in agent_step(&mut state, adapter.as_ref(), agent).await {
                    yield event;
                }
                if state.stage.is_terminal() {
                    break;
                }
            }
            if cancelled {
                break;
            }

            // 4. Summarizer.
            for event in summarizer_step(&mut state, adapter.as_ref()).await {
                yield event;
            }

            // 5. Re-check termination.
            if state.stage.is_terminal() && state.decision.is_some() {
                break;
            }
        }

        let options_summary = build_options_summary(&state);
        let summary = summarize_meeting(&state, adapter.as_ref()).await;
        meeting_span.in_scope(|| {
            tracing::info!(
                decision = state.decision.as_deref().unwrap_or("<none>"),
                cancelled,
                turns = state.turn,
                "meeting concluded"
            );
        });
        yield Event::Final {
            decision: state.decision.clone(),
            summary,
            options_summary,
            metrics: state.metrics.clone(),
            cancelled,
        };
    })
}

fn build_options_summary(state: &MeetingState) -> String {
    if state.options.is_empty() {
        return "No options were proposed.".to_string();
    }
    state
        .options
        .iter()
        .map(|o| {
            format!(
                "{}: \"{}\" ({} support / {} oppose / {} abstain)",
                o.id,
                o.text,
                o.supporters.len(),
                o.opponents.len(),
                o.abstainers.len()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

async fn summarize_meeting(state: &MeetingState, adapter: &dyn LanguageModelAdapter) -> String {
    let transcript: String = state
        .dialogue
        .iter()
        .rev()
        .take(CLOSING_TRANSCRIPT_LINES)
        .cloned()
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect::<Vec<_>>()
        .join("\n");
    let decision = state.decision.clone().unwrap_or_else(|| "no decision".to_string());
    let prompt = format!(
        "closing:Write a short closing narrative for the meeting on \"{}\". Decision: {decision}.\n{transcript}",
        state.issue
    );
    match adapter.complete(&prompt, 0.3).await {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        _ => format!("The meeting on \"{}\" concluded with: {decision}", state.issue),
    }
}
