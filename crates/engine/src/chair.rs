//! The Chair & Stage Controller (§4.5): invoked once per round, ahead of the
//! agent turns, to keep the meeting moving through STAGES.

use meeting_core::{MeetingState, Stage};
use meeting_llm::adapter::LanguageModelAdapter;

use crate::events::Event;

/// Run the Chair's per-round check. Returns the dialogue events produced.
pub async fn chair_step(state: &mut MeetingState, adapter: &dyn LanguageModelAdapter) -> Vec<Event> {
    let mut events = Vec::new();
    let stage = state.stage;
    tracing::debug!(stage = stage.as_str(), stage_turns = state.stage_turns, "chair step");

    // 1. Stage has used its full budget.
    let max_turns = stage.max_turns(state.conditions.time_pressure);
    if state.stage_turns >= max_turns {
        let line = format!("[{}] Chair: Let's move on.", stage.as_str());
        state.push_line(line.clone());
        events.push(Event::dialogue(line));
        state.advance_stage();
        return events;
    }

    // 2. Consensus check (skipped for decide/confirm, which have their own logic).
    if !matches!(stage, Stage::Decide | Stage::Confirm) && state.consensus_reached() {
        let line = format!("[{}] Chair: We have consensus, let's move forward.", stage.as_str());
        state.push_line(line.clone());
        events.push(Event::dialogue(line));
        state.advance_stage();
        return events;
    }

    // 3. Materialize a decision and move to confirm.
    if stage == Stage::Decide && state.decision.is_none() {
        let decision_text = match state.options.best() {
            Some(best) => format!("{}: {}", best.id, best.text),
            None => state.majority_stance().as_str().to_string(),
        };
        let line = format!(">>> DECISION: {decision_text}");
        state.push_line(line.clone());
        events.push(Event::dialogue(line));
        state.decision = Some(decision_text);
        state.set_stage_forward(Stage::Confirm);
        return events;
    }

    // 4. Closing line once we're in confirm.
    if stage == Stage::Confirm {
        let decision = state.decision.clone().unwrap_or_else(|| "no decision reached".to_string());
        let line = format!("[confirm] Chair: This meeting concludes with: {decision}");
        state.push_line(line.clone());
        events.push(Event::dialogue(line));
        return events;
    }

    // 5. Free-text guidance, at a fixed low temperature.
    let prompt = format!(
        "guidance:[{}] Chair, give a one-sentence guidance line for \"{}\".",
        stage.as_str(),
        state.issue
    );
    let guidance = match adapter.complete(&prompt, 0.2).await {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        _ => "Let's continue.".to_string(),
    };
    let line = format!("[{}] Chair: {}", stage.as_str(), guidance);
    state.push_line(line.clone());
    events.push(Event::dialogue(line));
    state.stage_turns += 1;

    events
}
