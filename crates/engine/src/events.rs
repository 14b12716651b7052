//! Event stream emitted by the orchestrator (§4.7, §6 Engine contract).

use meeting_core::Metrics;
use serde::{Deserialize, Serialize};

/// One item of the lazy event sequence `runMeeting` produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Event {
    Dialogue { line: String },
    Final {
        decision: Option<String>,
        summary: String,
        options_summary: String,
        metrics: Metrics,
        cancelled: bool,
    },
}

impl Event {
    pub fn dialogue(line: impl Into<String>) -> Self {
        Event::Dialogue { line: line.into() }
    }
}
