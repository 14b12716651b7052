//! The seven-stage meeting finite-state machine.
//!
//! Unlike a branching sales-call FSM, meeting stages only ever advance
//! through a fixed prefix of `STAGES` — there is no revisiting a prior stage.

use serde::{Deserialize, Serialize};

/// Discrete phases of the meeting, in their only valid order of traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    #[default]
    Introduce,
    Clarify,
    Discuss,
    Options,
    Evaluate,
    Decide,
    Confirm,
}

/// Canonical traversal order, `STAGES` in the spec.
pub const STAGES: [Stage; 7] = [
    Stage::Introduce,
    Stage::Clarify,
    Stage::Discuss,
    Stage::Options,
    Stage::Evaluate,
    Stage::Decide,
    Stage::Confirm,
];

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Introduce => "introduce",
            Stage::Clarify => "clarify",
            Stage::Discuss => "discuss",
            Stage::Options => "options",
            Stage::Evaluate => "evaluate",
            Stage::Decide => "decide",
            Stage::Confirm => "confirm",
        }
    }

    pub fn parse(s: &str) -> Option<Stage> {
        STAGES.into_iter().find(|st| st.as_str() == s.trim().to_lowercase())
    }

    pub fn index(self) -> usize {
        STAGES.iter().position(|s| *s == self).unwrap()
    }

    pub fn is_terminal(self) -> bool {
        self == Stage::Confirm
    }

    /// The next stage in the traversal order, or `None` once terminal.
    pub fn next(self) -> Option<Stage> {
        STAGES.get(self.index() + 1).copied()
    }

    /// Base per-stage maximum stage-turns before the Chair forces an advance.
    /// `time_pressure` (§6) tightens this: each unit shaves up to half the budget off.
    pub fn max_turns(self, time_pressure: f64) -> u32 {
        let base: u32 = match self {
            Stage::Introduce => 6,
            Stage::Clarify => 6,
            Stage::Discuss => 8,
            Stage::Options => 6,
            Stage::Evaluate => 6,
            Stage::Decide => 4,
            Stage::Confirm => 2,
        };
        let pressure = time_pressure.clamp(0.0, 1.0);
        let tightened = (base as f64 * (1.0 - 0.5 * pressure)).round() as u32;
        tightened.max(1)
    }

    /// Fixed per-stage creativity temperature for candidate generation.
    /// `formality` (§6) reduces it; `creativity_mode` raises the `options` temperature.
    pub fn temperature(self, formality: f64, creativity_mode: bool) -> f64 {
        let base = match self {
            Stage::Introduce => 0.6,
            Stage::Clarify => 0.3,
            Stage::Discuss => 0.7,
            Stage::Options => {
                if creativity_mode {
                    0.95
                } else {
                    0.8
                }
            }
            Stage::Evaluate => 0.4,
            Stage::Decide => 0.3,
            Stage::Confirm => 0.2,
        };
        let formality = formality.clamp(0.0, 1.0);
        (base * (1.0 - 0.4 * formality)).clamp(0.05, 1.0)
    }

    /// Base interruption probability before trait/affinity adjustment (§4.4 step 8).
    /// `conflict_tolerance` (§6) raises this base.
    pub fn interruption_base(self, conflict_tolerance: f64) -> f64 {
        let base = match self {
            Stage::Discuss => 0.16,
            Stage::Evaluate => 0.16,
            Stage::Options => 0.12,
            Stage::Decide => 0.08,
            Stage::Clarify => 0.05,
            Stage::Introduce => 0.04,
            Stage::Confirm => 0.02,
        };
        base + 0.1 * conflict_tolerance.clamp(0.0, 1.0)
    }
}
