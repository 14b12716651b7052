//! Roster-facing value types: stances, traits, goals, and the agent profile
//! the rest of the engine treats as an immutable read-only view.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// An agent's current position on the issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stance {
    Against,
    Neutral,
    For,
}

impl Stance {
    /// Fixed order used by the persuasion model to move a stance one step
    /// towards a target: against -> neutral -> for.
    const ORDER: [Stance; 3] = [Stance::Against, Stance::Neutral, Stance::For];

    pub fn index(self) -> usize {
        Self::ORDER.iter().position(|s| *s == self).unwrap()
    }

    /// Step one position towards `target`, or stay put if already there or adjacent in the wrong direction.
    pub fn step_towards(self, target: Stance) -> Stance {
        let cur = self.index() as i32;
        let tgt = target.index() as i32;
        let next = cur + (tgt - cur).signum();
        Self::ORDER[next.clamp(0, 2) as usize]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stance::Against => "against",
            Stance::Neutral => "neutral",
            Stance::For => "for",
        }
    }

    /// Parse a free-text stance token, defaulting to `None` if unrecognized.
    pub fn parse(s: &str) -> Option<Stance> {
        match s.trim().to_lowercase().as_str() {
            "for" => Some(Stance::For),
            "against" => Some(Stance::Against),
            "neutral" => Some(Stance::Neutral),
            _ => None,
        }
    }
}

/// The six attributes every option is scored on, and every agent goal is weighted over.
pub const CRITERIA: [&str; 6] = ["cost", "risk", "speed", "fairness", "innovation", "consensus"];

/// A set of six [0,1] scores keyed by the fixed `CRITERIA` order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriteriaScores {
    pub cost: f64,
    pub risk: f64,
    pub speed: f64,
    pub fairness: f64,
    pub innovation: f64,
    pub consensus: f64,
}

impl CriteriaScores {
    pub fn uniform(value: f64) -> Self {
        Self {
            cost: value,
            risk: value,
            speed: value,
            fairness: value,
            innovation: value,
            consensus: value,
        }
    }

    pub fn get(&self, criterion: &str) -> f64 {
        match criterion {
            "cost" => self.cost,
            "risk" => self.risk,
            "speed" => self.speed,
            "fairness" => self.fairness,
            "innovation" => self.innovation,
            "consensus" => self.consensus,
            _ => 0.5,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        CRITERIA.iter().map(move |c| (*c, self.get(c)))
    }
}

impl Default for CriteriaScores {
    fn default() -> Self {
        Self::uniform(0.5)
    }
}

/// Per-agent personality traits used by the social model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Traits {
    pub interrupt: f64,
    pub conflict_avoid: f64,
    pub persuasion: f64,
}

impl Default for Traits {
    fn default() -> Self {
        Self {
            interrupt: 0.2,
            conflict_avoid: 0.5,
            persuasion: 0.5,
        }
    }
}

/// Agent descriptor as supplied by the caller at meeting construction time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDescriptor {
    pub name: String,
    pub stance: Stance,
    pub dominance: f64,
    pub persona: String,
    pub traits: Traits,
    #[serde(default)]
    pub goals: CriteriaScores,
}

impl AgentDescriptor {
    pub fn validate(&self) -> Result<()> {
        let len = self.name.chars().count();
        if !(1..=50).contains(&len) {
            return Err(EngineError::InvalidAgentName(self.name.clone()));
        }
        let persona_len = self.persona.chars().count();
        if !(10..=500).contains(&persona_len) {
            return Err(EngineError::InvalidPersonaLength {
                agent: self.name.clone(),
                len: persona_len,
            });
        }
        if !(0.1..=3.0).contains(&self.dominance) {
            return Err(EngineError::InvalidDominance {
                agent: self.name.clone(),
                value: self.dominance,
            });
        }
        for (name, value) in [
            ("interrupt", self.traits.interrupt),
            ("conflict_avoid", self.traits.conflict_avoid),
            ("persuasion", self.traits.persuasion),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(EngineError::InvalidTrait {
                    agent: self.name.clone(),
                    trait_name: name,
                    value,
                });
            }
        }
        Ok(())
    }
}

/// Immutable read-only view of a roster member, as threaded through the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfile {
    pub name: String,
    pub persona: String,
    pub dominance: f64,
    pub traits: Traits,
    pub goals: CriteriaScores,
}

impl From<&AgentDescriptor> for AgentProfile {
    fn from(d: &AgentDescriptor) -> Self {
        Self {
            name: d.name.clone(),
            persona: d.persona.clone(),
            dominance: d.dominance,
            traits: d.traits,
            goals: d.goals,
        }
    }
}

/// Chair convention: the default profile names the chair "Alice".
pub const CHAIR_NAME: &str = "Alice";

/// Validate a roster: unique names (case-folded), one Chair present, and each
/// descriptor's own fields in range.
pub fn validate_roster(agents: &[AgentDescriptor]) -> Result<()> {
    if agents.is_empty() {
        return Err(EngineError::EmptyRoster);
    }
    let mut seen = HashMap::new();
    for agent in agents {
        agent.validate()?;
        let key = agent.name.to_lowercase();
        if seen.insert(key, ()).is_some() {
            return Err(EngineError::DuplicateAgentName(agent.name.clone()));
        }
    }
    if !agents
        .iter()
        .any(|a| a.name.eq_ignore_ascii_case(CHAIR_NAME))
    {
        return Err(EngineError::NoChair);
    }
    Ok(())
}

/// Optional environmental conditions bag (§6).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Conditions {
    pub time_pressure: f64,
    pub formality: f64,
    pub conflict_tolerance: f64,
    pub decision_threshold: f64,
    pub max_turns: u32,
    pub creativity_mode: bool,
}

impl Default for Conditions {
    fn default() -> Self {
        Self {
            time_pressure: 0.0,
            formality: 0.0,
            conflict_tolerance: 0.0,
            decision_threshold: 1.0,
            max_turns: 40,
            creativity_mode: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stance_steps_towards_target_one_step_at_a_time() {
        assert_eq!(Stance::Against.step_towards(Stance::For), Stance::Neutral);
        assert_eq!(Stance::Neutral.step_towards(Stance::For), Stance::For);
        assert_eq!(Stance::For.step_towards(Stance::Against), Stance::Neutral);
        assert_eq!(Stance::For.step_towards(Stance::For), Stance::For);
    }

    #[test]
    fn roster_requires_a_chair_named_alice() {
        let bob = AgentDescriptor {
            name: "Bob".into(),
            stance: Stance::Neutral,
            dominance: 1.0,
            persona: "A pragmatic engineer who likes data.".into(),
            traits: Traits::default(),
            goals: CriteriaScores::default(),
        };
        assert_eq!(validate_roster(&[bob]), Err(EngineError::NoChair));
    }

    #[test]
    fn roster_rejects_duplicate_names_case_insensitively() {
        let mk = |name: &str| AgentDescriptor {
            name: name.into(),
            stance: Stance::Neutral,
            dominance: 1.0,
            persona: "A pragmatic engineer who likes data.".into(),
            traits: Traits::default(),
            goals: CriteriaScores::default(),
        };
        let agents = vec![mk("Alice"), mk("alice")];
        assert!(matches!(
            validate_roster(&agents),
            Err(EngineError::DuplicateAgentName(_))
        ));
    }
}
