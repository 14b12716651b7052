//! The persuasion-and-affinity social model (§4.2): per-agent affinity,
//! interaction-history logs with half-life decay, and stance-shift sampling.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::rng::MeetingRng;
use crate::types::{CriteriaScores, Stance, Traits};

/// One recorded interaction outcome between a listener and a speaker.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InteractionEntry {
    pub turn: u32,
    pub val: f64,
}

/// Per-agent affinity and interaction-history log, keyed by a directed pair.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SocialModel {
    affinity: HashMap<(String, String), f64>,
    history: HashMap<(String, String), Vec<InteractionEntry>>,
}

const HISTORY_WINDOW: usize = 80;
const HALF_LIFE_TURNS: f64 = 12.0;

impl SocialModel {
    pub fn new(agents: &[String]) -> Self {
        let mut affinity = HashMap::new();
        for a in agents {
            for b in agents {
                if a != b {
                    affinity.insert((a.clone(), b.clone()), 0.0);
                }
            }
        }
        Self {
            affinity,
            history: HashMap::new(),
        }
    }

    pub fn affinity(&self, src: &str, dst: &str) -> f64 {
        *self.affinity.get(&(src.to_string(), dst.to_string())).unwrap_or(&0.0)
    }

    /// Exponential moving average update (§4.2 updateAffinity).
    pub fn update_affinity(&mut self, src: &str, dst: &str, delta: f64) {
        let key = (src.to_string(), dst.to_string());
        let cur = *self.affinity.get(&key).unwrap_or(&0.0);
        let next = (cur * 0.9 + delta * 0.1).clamp(-1.0, 1.0);
        self.affinity.insert(key, next);
    }

    /// Decay affinity by a flat amount (used on a failed persuasion roll, §4.2 maybeShift).
    pub fn decay_affinity(&mut self, src: &str, dst: &str, amount: f64) {
        let key = (src.to_string(), dst.to_string());
        let cur = *self.affinity.get(&key).unwrap_or(&0.0);
        self.affinity.insert(key, (cur - amount).clamp(-1.0, 1.0));
    }

    /// Append an interaction outcome for the social model to later decay-weight.
    pub fn log_interaction(&mut self, listener: &str, speaker: &str, turn: u32, val: f64) {
        let entry = self
            .history
            .entry((listener.to_string(), speaker.to_string()))
            .or_default();
        entry.push(InteractionEntry { turn, val });
    }

    /// Half-life-weighted support bias over the last 80 entries (§4.2 decayedSupportBias).
    pub fn decayed_support_bias(&self, listener: &str, speaker: &str, now: u32) -> f64 {
        let Some(entries) = self.history.get(&(listener.to_string(), speaker.to_string())) else {
            return 0.0;
        };
        let window = if entries.len() > HISTORY_WINDOW {
            &entries[entries.len() - HISTORY_WINDOW..]
        } else {
            &entries[..]
        };
        if window.is_empty() {
            return 0.0;
        }
        let mut num = 0.0;
        let mut den = 0.0;
        for e in window {
            let age = (now.saturating_sub(e.turn)) as f64;
            let w = 0.5f64.powf(age / HALF_LIFE_TURNS);
            num += w * e.val;
            den += w;
        }
        if den == 0.0 {
            0.0
        } else {
            (num / den).clamp(-1.0, 1.0)
        }
    }

    /// Alignment between a listener's goal weights and a stance's typical appeal (§4.2 alignScore).
    pub fn align_score(listener_goals: &CriteriaScores, target_stance: Stance) -> f64 {
        match target_stance {
            Stance::For => 0.6 * listener_goals.innovation + 0.4 * listener_goals.speed,
            Stance::Against => 0.6 * listener_goals.risk + 0.4 * listener_goals.cost,
            Stance::Neutral => 0.5 * listener_goals.consensus + 0.5 * listener_goals.fairness,
        }
    }

    /// Base persuasion probability before the support-bias multiplier (§4.2 persuasionProbability).
    pub fn persuasion_probability(
        speaker_traits: &Traits,
        listener_traits: &Traits,
        speaker_dominance: f64,
        align: f64,
        affinity: f64,
    ) -> f64 {
        let p = 0.15
            + 0.35 * speaker_traits.persuasion
            + 0.25 * (speaker_dominance / 1.5).min(1.0)
            + 0.20 * align
            + 0.25 * affinity.clamp(-0.5, 0.5)
            - 0.20 * listener_traits.conflict_avoid;
        p.clamp(0.02, 0.9)
    }

    /// Attempt to shift `listener`'s stance one step towards `speaker`'s stance
    /// (§4.2 maybeShift). Returns the listener's new stance if the roll succeeds,
    /// else decays their affinity towards the speaker slightly.
    pub fn maybe_shift(
        &mut self,
        rng: &mut MeetingRng,
        now: u32,
        listener: &str,
        listener_traits: &Traits,
        listener_goals: &CriteriaScores,
        listener_stance: Stance,
        speaker: &str,
        speaker_traits: &Traits,
        speaker_dominance: f64,
        speaker_stance: Stance,
    ) -> Option<Stance> {
        let align = Self::align_score(listener_goals, speaker_stance);
        let aff = self.affinity(listener, speaker);
        let base_p = Self::persuasion_probability(speaker_traits, listener_traits, speaker_dominance, align, aff);
        let bias = self.decayed_support_bias(listener, speaker, now);
        let p = (base_p * (1.0 + 0.25 * bias)).clamp(0.02, 0.95);

        if rng.sample_bernoulli(p) {
            Some(listener_stance.step_towards(speaker_stance))
        } else {
            self.decay_affinity(listener, speaker, 0.02);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persuasion_probability_stays_in_bounds() {
        let sp = Traits {
            interrupt: 1.0,
            conflict_avoid: 0.0,
            persuasion: 1.0,
        };
        let li = Traits {
            interrupt: 0.0,
            conflict_avoid: 1.0,
            persuasion: 0.0,
        };
        let p = SocialModel::persuasion_probability(&sp, &li, 3.0, 1.0, 1.0);
        assert!((0.02..=0.9).contains(&p));
        let p2 = SocialModel::persuasion_probability(&sp, &li, 0.1, -1.0, -1.0);
        assert!((0.02..=0.9).contains(&p2));
    }

    #[test]
    fn affinity_stays_bounded_after_many_updates() {
        let mut model = SocialModel::new(&["Alice".into(), "Bob".into()]);
        for _ in 0..200 {
            model.update_affinity("Alice", "Bob", 1.0);
        }
        assert!(model.affinity("Alice", "Bob") <= 1.0);
        for _ in 0..200 {
            model.update_affinity("Alice", "Bob", -1.0);
        }
        assert!(model.affinity("Alice", "Bob") >= -1.0);
    }

    #[test]
    fn decayed_support_bias_is_zero_with_no_history() {
        let model = SocialModel::new(&["Alice".into(), "Bob".into()]);
        assert_eq!(model.decayed_support_bias("Alice", "Bob", 10), 0.0);
    }

    #[test]
    fn decayed_support_bias_weighs_recent_entries_more() {
        let mut model = SocialModel::new(&["Alice".into(), "Bob".into()]);
        model.log_interaction("Alice", "Bob", 0, -1.0);
        model.log_interaction("Alice", "Bob", 20, 1.0);
        let bias = model.decayed_support_bias("Alice", "Bob", 20);
        assert!(bias > 0.0);
    }
}
