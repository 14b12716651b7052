//! Per-round summary line (§4.6). Runs after the Chair and every agent have
//! spoken; failure is non-fatal and simply skips the line. The summarizer's
//! own line does not count toward `stage_turns` (§9, resolved open question).

use meeting_core::MeetingState;
use meeting_llm::adapter::LanguageModelAdapter;

use crate::events::Event;

const RECENT_LINES_FOR_SUMMARY: usize = 12;

pub async fn summarizer_step(state: &mut MeetingState, adapter: &dyn LanguageModelAdapter) -> Vec<Event> {
    let mut events = Vec::new();
    let recent: Vec<&String> = state.dialogue.iter().rev().take(RECENT_LINES_FOR_SUMMARY).collect();
    if recent.is_empty() {
        return events;
    }
    let transcript: String = recent.into_iter().rev().cloned().collect::<Vec<_>>().join("\n");
    let prompt = format!("summary:Summarize the last round of this meeting in one sentence.\n{transcript}");

    if let Ok(summary) = adapter.complete(&prompt, 0.3).await {
        let summary = summary.trim();
        if !summary.is_empty() {
            let line = format!("[{}] (Summary) {}", state.stage.as_str(), summary);
            state.push_line(line.clone());
            events.push(Event::dialogue(line));
        }
    }

    events
}
