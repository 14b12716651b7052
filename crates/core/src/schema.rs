//! Value types for LLM-produced turns and coercion rules that collapse
//! invalid model output into something the engine can always act on.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::stage::Stage;
use crate::types::Stance;

/// A speech act the Planner may choose, scoped to what a stage allows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanSpec {
    pub speech_act: String,
    pub objective: String,
}

/// Overall quality score returned by the critic call, in [0,1].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CriticScore {
    pub score: f64,
}

/// Six [0,1] attribute scores for a proposed option, produced by the
/// constrained-output "analyst" call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OptionEval {
    pub cost: f64,
    pub risk: f64,
    pub speed: f64,
    pub fairness: f64,
    pub innovation: f64,
    pub consensus: f64,
}

impl From<OptionEval> for crate::types::CriteriaScores {
    fn from(e: OptionEval) -> Self {
        crate::types::CriteriaScores {
            cost: e.cost,
            risk: e.risk,
            speed: e.speed,
            fairness: e.fairness,
            innovation: e.innovation,
            consensus: e.consensus,
        }
    }
}

/// How a speaker reacted to the preceding exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reaction {
    Accept,
    RejectPropose,
    Decline,
}

impl Reaction {
    pub fn as_str(self) -> &'static str {
        match self {
            Reaction::Accept => "accept",
            Reaction::RejectPropose => "reject+propose",
            Reaction::Decline => "decline",
        }
    }

    /// Fuzzy-prefix normalization (§4.4 step 6): match on a few recognizable
    /// stems rather than requiring the model to hit the exact token.
    pub fn normalize(raw: &str) -> Reaction {
        let lower = raw.trim().to_lowercase();
        if lower.starts_with("acknowledge") || lower.starts_with("agree") || lower.starts_with("yes") {
            Reaction::Accept
        } else if lower.starts_with("reject") || lower.starts_with("counter") || lower.starts_with("propose") {
            Reaction::RejectPropose
        } else if lower.starts_with("decline") || lower.starts_with("no") || lower.starts_with("disagree") {
            Reaction::Decline
        } else {
            Reaction::Accept
        }
    }
}

/// A voter's position on an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteKind {
    Support,
    Oppose,
    Abstain,
}

impl VoteKind {
    pub fn as_str(self) -> &'static str {
        match self {
            VoteKind::Support => "SUPPORT",
            VoteKind::Oppose => "OPPOSE",
            VoteKind::Abstain => "ABSTAIN",
        }
    }
}

/// Raw turn as returned by the constrained-output `generate` call, before sanitation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTurn {
    pub asker: String,
    pub question: String,
    pub responder: String,
    pub message: String,
    pub reaction: String,
    #[serde(default)]
    pub stance_updates: HashMap<String, String>,
    #[serde(default)]
    pub chair_decision: Option<String>,
    #[serde(default)]
    pub end_stage: bool,
    pub next_stage: String,
    #[serde(default)]
    pub action_item: Option<String>,
    #[serde(default)]
    pub option_proposal: Option<String>,
    #[serde(default)]
    pub option_ref: Option<String>,
    #[serde(default)]
    pub option_vote: Option<VoteKind>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub negotiation_offer: Option<String>,
}

/// A turn after sanitation: every field is guaranteed consistent with the
/// roster and the stage machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedTurn {
    pub asker: String,
    pub question: String,
    pub responder: String,
    pub message: String,
    pub reaction: Reaction,
    pub stance_updates: HashMap<String, Stance>,
    pub chair_decision: Option<String>,
    pub end_stage: bool,
    pub next_stage: Stage,
    pub action_item: Option<String>,
    pub option_proposal: Option<String>,
    pub option_ref: Option<String>,
    pub option_vote: Option<VoteKind>,
    pub comment: Option<String>,
    pub negotiation_offer: Option<String>,
}

/// Names that stand in for "whoever is presiding" rather than a specific agent.
const COLLECTIVE_REFERENTS: [&str; 6] = ["all", "everyone", "team", "group", "committee", "room"];

/// Minimal safe turn used whenever the model's output can't be trusted at all
/// (schema-validation failure, transport exhaustion — §4.3, §7).
pub fn fallback_turn(caller: &str, other_agent: &str, stage: Stage) -> ParsedTurn {
    ParsedTurn {
        asker: caller.to_string(),
        question: String::new(),
        responder: other_agent.to_string(),
        message: "Let's move on.".to_string(),
        reaction: Reaction::Accept,
        stance_updates: HashMap::new(),
        chair_decision: None,
        end_stage: false,
        next_stage: stage,
        action_item: None,
        option_proposal: None,
        option_ref: None,
        option_vote: None,
        comment: None,
        negotiation_offer: None,
    }
}

/// Sanitize a raw model turn against the roster and current stage (§4.4 step 6).
pub fn sanitize_turn(raw: RawTurn, caller: &str, roster: &[String], chair: &str, stage: Stage) -> ParsedTurn {
    let resolve = |name: &str| -> String {
        let lower = name.trim().to_lowercase();
        if COLLECTIVE_REFERENTS.contains(&lower.as_str()) {
            return chair.to_string();
        }
        if let Some(found) = roster.iter().find(|a| a.eq_ignore_ascii_case(&lower)) {
            return found.clone();
        }
        // Unknown name from the model: attribute the turn to the caller.
        caller.to_string()
    };

    let mut asker = resolve(&raw.asker);
    let mut responder = resolve(&raw.responder);
    if asker == responder {
        // Pick any other agent, deterministically by roster order.
        responder = roster
            .iter()
            .find(|a| **a != asker)
            .cloned()
            .unwrap_or(asker.clone());
    }
    if asker.is_empty() {
        asker = caller.to_string();
    }

    let reaction = Reaction::normalize(&raw.reaction);

    let next_stage = Stage::parse(&raw.next_stage).unwrap_or(stage);

    let message = if raw.message.trim().is_empty() {
        "Let's move on.".to_string()
    } else {
        raw.message
    };

    let stance_updates = raw
        .stance_updates
        .into_iter()
        .filter_map(|(agent, token)| Stance::parse(&token).map(|s| (agent, s)))
        .collect();

    ParsedTurn {
        asker,
        question: raw.question,
        responder,
        message,
        reaction,
        stance_updates,
        chair_decision: raw.chair_decision,
        end_stage: raw.end_stage,
        next_stage,
        action_item: raw.action_item,
        option_proposal: raw.option_proposal,
        option_ref: raw.option_ref,
        option_vote: raw.option_vote,
        comment: raw.comment,
        negotiation_offer: raw.negotiation_offer,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Vec<String> {
        vec!["Alice".into(), "Bob".into(), "Charlie".into()]
    }

    #[test]
    fn collective_referents_resolve_to_the_chair() {
        let raw = RawTurn {
            asker: "Bob".into(),
            question: "what do we do?".into(),
            responder: "everyone".into(),
            message: "thoughts?".into(),
            reaction: "yes".into(),
            stance_updates: HashMap::new(),
            chair_decision: None,
            end_stage: false,
            next_stage: "discuss".into(),
            action_item: None,
            option_proposal: None,
            option_ref: None,
            option_vote: None,
            comment: None,
            negotiation_offer: None,
        };
        let parsed = sanitize_turn(raw, "Bob", &roster(), "Alice", Stage::Discuss);
        assert_eq!(parsed.responder, "Alice");
    }

    #[test]
    fn asker_equal_responder_is_corrected() {
        let raw = RawTurn {
            asker: "Bob".into(),
            question: "q".into(),
            responder: "Bob".into(),
            message: "m".into(),
            reaction: "accept".into(),
            stance_updates: HashMap::new(),
            chair_decision: None,
            end_stage: false,
            next_stage: "discuss".into(),
            action_item: None,
            option_proposal: None,
            option_ref: None,
            option_vote: None,
            comment: None,
            negotiation_offer: None,
        };
        let parsed = sanitize_turn(raw, "Bob", &roster(), "Alice", Stage::Discuss);
        assert_ne!(parsed.asker, parsed.responder);
    }

    #[test]
    fn invalid_next_stage_falls_back_to_current_stage() {
        let raw = RawTurn {
            asker: "Bob".into(),
            question: "q".into(),
            responder: "Alice".into(),
            message: "m".into(),
            reaction: "accept".into(),
            stance_updates: HashMap::new(),
            chair_decision: None,
            end_stage: true,
            next_stage: "nonsense".into(),
            action_item: None,
            option_proposal: None,
            option_ref: None,
            option_vote: None,
            comment: None,
            negotiation_offer: None,
        };
        let parsed = sanitize_turn(raw, "Bob", &roster(), "Alice", Stage::Discuss);
        assert_eq!(parsed.next_stage, Stage::Discuss);
    }

    #[test]
    fn reaction_normalizes_by_fuzzy_prefix() {
        assert_eq!(Reaction::normalize("Acknowledge and move on"), Reaction::Accept);
        assert_eq!(Reaction::normalize("Counter-proposal incoming"), Reaction::RejectPropose);
        assert_eq!(Reaction::normalize("Declining for now"), Reaction::Decline);
        assert_eq!(Reaction::normalize("garble"), Reaction::Accept);
    }
}
