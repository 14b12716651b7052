//! Prompt assembly: chat messages, per-stage briefs, and the memory pack
//! handed to the model alongside each constrained-output call.

use std::fmt;

use meeting_core::{OptionRegistry, Stage};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
}

/// Everything an agent call needs to know about the conversation so far
/// (§4.4 step 3): the last few dialogue lines, unresolved questions, and a
/// brief of registered options.
#[derive(Debug, Clone)]
pub struct MemoryPack {
    pub recent_lines: Vec<String>,
    pub unresolved_questions: Vec<String>,
    pub options_brief: String,
}

const RECENT_LINE_LIMIT: usize = 6;
const RECENT_LINE_TRUNCATE: usize = 400;
const UNRESOLVED_QUESTION_LIMIT: usize = 2;

impl MemoryPack {
    pub fn build(dialogue: &[String], options: &OptionRegistry) -> Self {
        let recent_lines = dialogue
            .iter()
            .rev()
            .take(RECENT_LINE_LIMIT)
            .map(|line| truncate_chars(line, RECENT_LINE_TRUNCATE))
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();

        let unresolved_questions = dialogue
            .iter()
            .rev()
            .filter(|line| line.contains('?'))
            .take(UNRESOLVED_QUESTION_LIMIT)
            .cloned()
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();

        let options_brief = if options.is_empty() {
            "No options registered yet.".to_string()
        } else {
            options
                .iter()
                .map(|o| {
                    format!(
                        "{}: \"{}\" (proposed by {}, {} support / {} oppose / {} abstain)",
                        o.id,
                        o.text,
                        o.proposer,
                        o.supporters.len(),
                        o.opponents.len(),
                        o.abstainers.len()
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        };

        Self { recent_lines, unresolved_questions, options_brief }
    }

    pub fn as_brief(&self) -> String {
        format!(
            "Recent dialogue:\n{}\n\nUnresolved questions:\n{}\n\nOptions:\n{}",
            self.recent_lines.join("\n"),
            if self.unresolved_questions.is_empty() {
                "(none)".to_string()
            } else {
                self.unresolved_questions.join("\n")
            },
            self.options_brief
        )
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

/// Speech acts the `plan` call may choose from in a given stage (§4.3 plan).
/// Purely advisory context for the prompt; nothing downstream enforces that
/// the model actually picks one of these, since the stage brief already
/// steers `generate` towards stage-appropriate content and the heuristic
/// scorer in `candidates` separately rewards stage-fitting vocabulary.
pub fn allowed_speech_acts(stage: Stage) -> &'static [&'static str] {
    match stage {
        Stage::Introduce => &["welcome", "frame_issue", "state_goal"],
        Stage::Clarify => &["ask_clarifying_question", "restate_assumption"],
        Stage::Discuss => &["argue_for", "argue_against", "raise_tradeoff", "ask_question"],
        Stage::Options => &["propose_option", "refine_option", "ask_question"],
        Stage::Evaluate => &["compare_options", "cast_vote", "ask_question"],
        Stage::Decide => &["cast_vote", "call_for_decision", "accept_decision"],
        Stage::Confirm => &["confirm_action_items", "close_out"],
    }
}

/// Build the brief handed to `plan` and `generate` for a given stage.
pub fn stage_brief(stage: Stage, issue: &str) -> String {
    format!(
        "Meeting issue: {issue}\nCurrent stage: {stage}\nAllowed speech acts: {acts}\nSpeak only within this stage's allowed speech acts.",
        stage = stage.as_str(),
        acts = allowed_speech_acts(stage).join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_pack_caps_recent_lines_at_six() {
        let dialogue: Vec<String> = (0..20).map(|i| format!("[discuss] line {i}")).collect();
        let pack = MemoryPack::build(&dialogue, &OptionRegistry::new());
        assert_eq!(pack.recent_lines.len(), 6);
        assert_eq!(pack.recent_lines.last().unwrap(), "[discuss] line 19");
    }

    #[test]
    fn every_stage_has_a_non_empty_allowed_speech_act_set() {
        for stage in meeting_core::STAGES {
            assert!(!allowed_speech_acts(stage).is_empty());
        }
    }

    #[test]
    fn options_brief_reports_none_registered_when_empty() {
        let pack = MemoryPack::build(&[], &OptionRegistry::new());
        assert_eq!(pack.options_brief, "No options registered yet.");
    }
}
