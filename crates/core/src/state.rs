//! The strongly-typed meeting state record (§9: "dynamically typed meeting
//! state -> a strongly typed record").

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::options::OptionRegistry;
use crate::rng::MeetingRng;
use crate::social::SocialModel;
use crate::stage::Stage;
use crate::types::{AgentProfile, Conditions, Stance};

/// Kind of an append-only episodic log entry, used only for post-hoc analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodicKind {
    Question,
    Response,
    Reaction,
    Option,
    Vote,
    Action,
    Negotiation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodicEntry {
    pub turn: u32,
    pub stage: Stage,
    pub speaker: String,
    pub kind: EpisodicKind,
    pub text: String,
    #[serde(default)]
    pub meta: serde_json::Value,
}

/// Counters only ever incremented, surfaced verbatim in the `final` event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metrics {
    pub turns_per_stage: std::collections::HashMap<String, u32>,
    pub turns_by_agent: std::collections::HashMap<String, u32>,
    pub interruptions: u32,
    pub actions_raised: u32,
    pub options_proposed: u32,
    pub votes_cast: u32,
}

impl Metrics {
    pub fn record_stage_turn(&mut self, stage: Stage) {
        *self.turns_per_stage.entry(stage.as_str().to_string()).or_insert(0) += 1;
    }

    pub fn record_agent_turn(&mut self, agent: &str) {
        *self.turns_by_agent.entry(agent.to_string()).or_insert(0) += 1;
    }
}

/// Shared boolean the engine polls at documented checkpoints to terminate gracefully.
/// Replaces the source's process-wide `_CANCELLATION_FLAGS` uuid-keyed table with a
/// single handle the caller owns and passes in explicitly (§9).
#[derive(Debug, Clone, Default)]
pub struct CancellationHandle(Arc<AtomicBool>);

impl CancellationHandle {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The single-writer, per-meeting mutable state. Owned exclusively by the
/// orchestrator running one meeting; no entity outlives it.
#[derive(Debug, Clone)]
pub struct MeetingState {
    pub issue: String,
    pub stage: Stage,
    pub agents: Vec<String>,
    pub profiles: std::collections::HashMap<String, AgentProfile>,
    pub stances: std::collections::HashMap<String, Stance>,
    pub turn: u32,
    pub stage_turns: u32,
    pub dialogue: Vec<String>,
    pub convo_edges: Vec<(String, String)>,
    pub decision: Option<String>,
    pub chair_used: bool,
    pub options: OptionRegistry,
    pub episodic: Vec<EpisodicEntry>,
    pub social: SocialModel,
    pub metrics: Metrics,
    pub cancellation: CancellationHandle,
    pub recent_pairs: Vec<(String, String)>,
    pub question_seen: HashSet<(Stage, String, String)>,
    pub interruptions_this_stage: u32,
    pub accepts_this_stage: u32,
    pub conditions: Conditions,
    pub rng: MeetingRng,
}

impl MeetingState {
    pub fn new(
        issue: String,
        profiles: Vec<AgentProfile>,
        stances: std::collections::HashMap<String, Stance>,
        conditions: Conditions,
        rng: MeetingRng,
        cancellation: CancellationHandle,
    ) -> Self {
        let agents: Vec<String> = profiles.iter().map(|p| p.name.clone()).collect();
        let social = SocialModel::new(&agents);
        let profiles = profiles.into_iter().map(|p| (p.name.clone(), p)).collect();
        Self {
            issue,
            stage: Stage::Introduce,
            agents,
            profiles,
            stances,
            turn: 0,
            stage_turns: 0,
            dialogue: Vec::new(),
            convo_edges: Vec::new(),
            decision: None,
            chair_used: false,
            options: OptionRegistry::new(),
            episodic: Vec::new(),
            social,
            metrics: Metrics::default(),
            cancellation,
            recent_pairs: Vec::new(),
            question_seen: HashSet::new(),
            interruptions_this_stage: 0,
            accepts_this_stage: 0,
            conditions,
            rng,
        }
    }

    /// Append a dialogue line and bump the monotonic turn counter.
    pub fn push_line(&mut self, line: impl Into<String>) {
        self.dialogue.push(line.into());
        self.turn += 1;
    }

    /// Advance to the next stage, resetting per-stage counters.
    pub fn advance_stage(&mut self) {
        if let Some(next) = self.stage.next() {
            self.stage = next;
        }
        self.stage_turns = 0;
        self.interruptions_this_stage = 0;
        self.accepts_this_stage = 0;
    }

    /// Move to `target` only if it is strictly ahead of the current stage
    /// (stages never regress). Returns whether the move happened.
    pub fn set_stage_forward(&mut self, target: Stage) -> bool {
        if target.index() > self.stage.index() {
            self.stage = target;
            self.stage_turns = 0;
            self.interruptions_this_stage = 0;
            self.accepts_this_stage = 0;
            true
        } else {
            false
        }
    }

    /// Whether consensus has been reached under the configured
    /// `decision_threshold` (§6): unanimous when the threshold is 1.0 (the
    /// default), else a share-of-roster check. Used identically by the
    /// Chair's per-round consensus check and by each agent's own stage
    /// transition so the two paths can't disagree about what "consensus"
    /// means mid-stage.
    pub fn consensus_reached(&self) -> bool {
        if self.conditions.decision_threshold >= 1.0 {
            self.all_stances_equal()
        } else {
            self.stance_share_meets_threshold().is_some()
        }
    }

    pub fn all_stances_equal(&self) -> bool {
        let mut iter = self.stances.values();
        match iter.next() {
            Some(first) => iter.all(|s| s == first),
            None => true,
        }
    }

    /// Whether the majority share of stances meets `conditions.decision_threshold` (§6).
    pub fn stance_share_meets_threshold(&self) -> Option<Stance> {
        let total = self.stances.len();
        if total == 0 {
            return None;
        }
        let mut for_count = 0usize;
        let mut against_count = 0usize;
        let mut neutral_count = 0usize;
        for s in self.stances.values() {
            match s {
                Stance::For => for_count += 1,
                Stance::Against => against_count += 1,
                Stance::Neutral => neutral_count += 1,
            }
        }
        let threshold = self.conditions.decision_threshold.clamp(0.5, 1.0);
        let needed = (threshold * total as f64).ceil() as usize;
        if for_count >= needed {
            Some(Stance::For)
        } else if against_count >= needed {
            Some(Stance::Against)
        } else if neutral_count >= needed {
            Some(Stance::Neutral)
        } else {
            None
        }
    }

    /// Majority stance fallback for `decide` with no options (§4.4 step 19).
    pub fn majority_stance(&self) -> Stance {
        let mut for_count = 0usize;
        let mut against_count = 0usize;
        let mut neutral_count = 0usize;
        for s in self.stances.values() {
            match s {
                Stance::For => for_count += 1,
                Stance::Against => against_count += 1,
                Stance::Neutral => neutral_count += 1,
            }
        }
        if for_count >= against_count && for_count >= neutral_count {
            Stance::For
        } else if against_count >= neutral_count {
            Stance::Against
        } else {
            Stance::Neutral
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CriteriaScores, Traits};

    fn mk_profile(name: &str) -> AgentProfile {
        AgentProfile {
            name: name.to_string(),
            persona: "test".to_string(),
            dominance: 1.0,
            traits: Traits::default(),
            goals: CriteriaScores::default(),
        }
    }

    #[test]
    fn push_line_strictly_increases_turn() {
        let mut state = MeetingState::new(
            "issue".into(),
            vec![mk_profile("Alice")],
            [("Alice".to_string(), Stance::Neutral)].into_iter().collect(),
            Conditions::default(),
            MeetingRng::from_seed(1),
            CancellationHandle::new(),
        );
        let before = state.turn;
        state.push_line("[introduce] Alice: hi");
        assert_eq!(state.turn, before + 1);
    }

    #[test]
    fn advance_stage_resets_counters() {
        let mut state = MeetingState::new(
            "issue".into(),
            vec![mk_profile("Alice")],
            [("Alice".to_string(), Stance::Neutral)].into_iter().collect(),
            Conditions::default(),
            MeetingRng::from_seed(1),
            CancellationHandle::new(),
        );
        state.stage_turns = 5;
        state.interruptions_this_stage = 2;
        state.advance_stage();
        assert_eq!(state.stage, Stage::Clarify);
        assert_eq!(state.stage_turns, 0);
        assert_eq!(state.interruptions_this_stage, 0);
    }

    #[test]
    fn consensus_reached_falls_back_to_a_threshold_share_below_unanimity() {
        let mut state = MeetingState::new(
            "issue".into(),
            vec![mk_profile("Alice"), mk_profile("Bob"), mk_profile("Charlie")],
            [
                ("Alice".to_string(), Stance::For),
                ("Bob".to_string(), Stance::For),
                ("Charlie".to_string(), Stance::Against),
            ]
            .into_iter()
            .collect(),
            Conditions { decision_threshold: 1.0, ..Conditions::default() },
            MeetingRng::from_seed(1),
            CancellationHandle::new(),
        );
        assert!(!state.consensus_reached(), "unanimity required at threshold 1.0");

        state.conditions.decision_threshold = 0.6;
        assert!(state.consensus_reached(), "2/3 share clears a 0.6 threshold");
    }
}
