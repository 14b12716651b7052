//! The options registry (§4.1): proposals, voting, utility scoring and
//! best-option selection.

use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::schema::VoteKind;
use crate::stage::Stage;
use crate::types::{CriteriaScores, CRITERIA};

/// A named proposal and its voter sets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Option_ {
    pub id: String,
    pub text: String,
    pub proposer: String,
    pub supporters: HashSet<String>,
    pub opponents: HashSet<String>,
    pub abstainers: HashSet<String>,
    pub first_stage: Stage,
    pub first_turn: u32,
    pub attributes: CriteriaScores,
}

impl Option_ {
    pub fn votes_disjoint(&self) -> bool {
        self.supporters.is_disjoint(&self.opponents)
            && self.supporters.is_disjoint(&self.abstainers)
            && self.opponents.is_disjoint(&self.abstainers)
    }

    pub fn voters(&self) -> HashSet<String> {
        self.supporters
            .union(&self.opponents)
            .cloned()
            .collect::<HashSet<_>>()
            .union(&self.abstainers)
            .cloned()
            .collect()
    }
}

fn normalize_text(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Per-meeting mapping from option id to its registered state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptionRegistry {
    options: Vec<Option_>,
    counter: u32,
}

/// Outcome of a `register` call: whether it created a new option or merged
/// into an existing duplicate.
pub enum RegisterOutcome {
    Created(String),
    Duplicate(String),
}

impl OptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Option_> {
        self.options.iter().find(|o| o.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Option_> {
        self.options.iter_mut().find(|o| o.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Option_> {
        self.options.iter()
    }

    fn find_duplicate(&self, normalized: &str) -> Option<&Option_> {
        self.options
            .iter()
            .find(|o| normalize_text(&o.text) == normalized)
    }

    /// Register a new proposal, or merge into an existing duplicate by
    /// normalized text. `attributes` comes from the Prompt Adapter's
    /// constrained-output analyst call (or 0.5-filled on failure, per §4.1's
    /// failure semantics — the caller is responsible for that fallback).
    pub fn register(
        &mut self,
        text: &str,
        proposer: &str,
        stage: Stage,
        turn: u32,
        attributes: CriteriaScores,
    ) -> RegisterOutcome {
        let normalized = normalize_text(text);
        if let Some(existing) = self.find_duplicate(&normalized) {
            let id = existing.id.clone();
            let opt = self.get_mut(&id).unwrap();
            opt.opponents.remove(proposer);
            opt.abstainers.remove(proposer);
            opt.supporters.insert(proposer.to_string());
            return RegisterOutcome::Duplicate(id);
        }

        self.counter += 1;
        let id = format!("O{}", self.counter);
        let mut supporters = HashSet::new();
        supporters.insert(proposer.to_string());
        self.options.push(Option_ {
            id: id.clone(),
            text: text.trim().to_string(),
            proposer: proposer.to_string(),
            supporters,
            opponents: HashSet::new(),
            abstainers: HashSet::new(),
            first_stage: stage,
            first_turn: turn,
            attributes,
        });
        RegisterOutcome::Created(id)
    }

    /// The id of the most recently allocated option, if any.
    pub fn most_recent(&self) -> Option<String> {
        self.options.last().map(|o| o.id.clone())
    }

    /// Cast (or re-cast) a vote. Resolves `opt_ref` if given and known, else
    /// falls back to the most recently allocated option. Returns `None` if no
    /// option exists to vote on ("vote ignored" per §4.1).
    pub fn vote(&mut self, voter: &str, opt_ref: Option<&str>, vote: VoteKind) -> Option<String> {
        let id = match opt_ref.filter(|r| self.get(r).is_some()) {
            Some(r) => r.to_string(),
            None => self.most_recent()?,
        };
        let opt = self.get_mut(&id)?;
        opt.supporters.remove(voter);
        opt.opponents.remove(voter);
        opt.abstainers.remove(voter);
        match vote {
            VoteKind::Support => opt.supporters.insert(voter.to_string()),
            VoteKind::Oppose => opt.opponents.insert(voter.to_string()),
            VoteKind::Abstain => opt.abstainers.insert(voter.to_string()),
        };
        Some(id)
    }

    /// Agent's weighted utility over an option's attributes (§4.1). Goal
    /// weights are normalized so they sum to 1; a criterion with no explicit
    /// weight in the agent's goals defaults to 0.3/0.2 split evenly.
    pub fn utility(&self, goals: &CriteriaScores, oid: &str) -> f64 {
        let Some(opt) = self.get(oid) else {
            return 0.0;
        };
        let raw: Vec<f64> = CRITERIA.iter().map(|c| goals.get(c)).collect();
        let total: f64 = raw.iter().sum();
        let weights: Vec<f64> = if total > 0.0 {
            raw.iter().map(|w| w / total).collect()
        } else {
            vec![1.0 / CRITERIA.len() as f64; CRITERIA.len()]
        };
        CRITERIA
            .iter()
            .zip(weights)
            .map(|(c, w)| w * opt.attributes.get(c))
            .sum()
    }

    /// Best option by (supporters - opponents, supporters, -first_turn) descending.
    pub fn best(&self) -> Option<&Option_> {
        self.options.iter().max_by(|a, b| {
            let key = |o: &Option_| {
                (
                    o.supporters.len() as i64 - o.opponents.len() as i64,
                    o.supporters.len() as i64,
                    -(o.first_turn as i64),
                )
            };
            key(a).cmp(&key(b))
        })
    }

    /// Agents in the roster who have not yet voted on `oid`.
    pub fn non_voters<'a>(&self, oid: &str, roster: &'a [String]) -> VecDeque<&'a str> {
        let Some(opt) = self.get(oid) else {
            return roster.iter().map(|s| s.as_str()).collect();
        };
        let voted = opt.voters();
        roster
            .iter()
            .filter(|a| !voted.contains(a.as_str()))
            .map(|s| s.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registering_duplicate_text_merges_and_leaves_count_unchanged() {
        let mut reg = OptionRegistry::new();
        reg.register("hire two engineers", "Alice", Stage::Options, 1, CriteriaScores::default());
        assert_eq!(reg.len(), 1);
        let outcome = reg.register("Hire   Two Engineers.", "Dana", Stage::Options, 5, CriteriaScores::default());
        assert!(matches!(outcome, RegisterOutcome::Duplicate(_)));
        assert_eq!(reg.len(), 1);
        let opt = reg.iter().next().unwrap();
        assert!(opt.supporters.contains("Alice"));
        assert!(opt.supporters.contains("Dana"));
    }

    #[test]
    fn revoting_the_same_vote_leaves_tallies_unchanged() {
        let mut reg = OptionRegistry::new();
        reg.register("pilot in manchester", "Bob", Stage::Options, 1, CriteriaScores::default());
        let id = reg.most_recent().unwrap();
        reg.vote("Alice", Some(&id), VoteKind::Support);
        reg.vote("Alice", Some(&id), VoteKind::Support);
        let opt = reg.get(&id).unwrap();
        assert_eq!(opt.supporters.len(), 1);
        assert!(opt.votes_disjoint());
    }

    #[test]
    fn vote_with_no_ref_targets_most_recent_option() {
        let mut reg = OptionRegistry::new();
        reg.register("a", "Alice", Stage::Options, 1, CriteriaScores::default());
        reg.register("b", "Bob", Stage::Options, 2, CriteriaScores::default());
        let resolved = reg.vote("Charlie", None, VoteKind::Oppose).unwrap();
        assert_eq!(resolved, reg.most_recent().unwrap());
    }

    #[test]
    fn vote_with_no_options_is_ignored() {
        let mut reg = OptionRegistry::new();
        assert!(reg.vote("Alice", None, VoteKind::Support).is_none());
    }

    #[test]
    fn best_prefers_higher_net_support_then_supporters_then_earlier_turn() {
        let mut reg = OptionRegistry::new();
        reg.register("a", "Alice", Stage::Options, 1, CriteriaScores::default());
        reg.register("b", "Bob", Stage::Options, 2, CriteriaScores::default());
        let ida = reg.options[0].id.clone();
        let idb = reg.options[1].id.clone();
        reg.vote("Alice", Some(&ida), VoteKind::Support);
        reg.vote("Bob", Some(&ida), VoteKind::Support);
        reg.vote("Charlie", Some(&ida), VoteKind::Oppose);
        reg.vote("Dana", Some(&idb), VoteKind::Support);
        let best = reg.best().unwrap();
        assert_eq!(best.id, ida);
        let _ = idb;
    }
}
