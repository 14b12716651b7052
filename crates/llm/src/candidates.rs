//! K=3 candidate generation and reranking (§4.3, §4.4 step 5).
//!
//! Candidate generation is parallelized behind the Adapter: K concurrent
//! constrained-output calls are joined, then reranked by
//! `0.7*heuristic + 0.3*critic`; ordering of the raw candidates is
//! irrelevant since they are reranked (§9).

use std::collections::HashSet;

use meeting_core::{fallback_turn, MeetingRng, RawTurn, Stage};
use serde_json::Value;

use crate::adapter::LanguageModelAdapter;
use crate::schemas::{CRITIC_SCORE_SCHEMA, RAW_TURN_SCHEMA};

const CANDIDATE_COUNT: usize = 3;

/// Stage-specific keywords a good candidate for that stage tends to use.
fn stage_keywords(stage: Stage) -> &'static [&'static str] {
    match stage {
        Stage::Introduce => &["goal", "agenda", "welcome", "issue"],
        Stage::Clarify => &["clarify", "mean", "assume", "scope"],
        Stage::Discuss => &["because", "tradeoff", "however", "consider"],
        Stage::Options => &["propose", "option", "alternative", "suggest"],
        Stage::Evaluate => &["cost", "risk", "benefit", "compare"],
        Stage::Decide => &["decide", "vote", "adopt", "final"],
        Stage::Confirm => &["confirm", "summary", "agreed", "done"],
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

/// `1.0 + specificity + fit - overlap_penalty` (§4.3).
///
/// `specificity` rewards digits and long tokens (concrete, detailed text).
/// `fit` rewards stage-appropriate vocabulary. `overlap_penalty` discourages
/// candidates that just repeat the last six transcript lines verbatim.
pub fn heuristic_score(text: &str, stage: Stage, recent: &[String]) -> f64 {
    let tokens = tokenize(text);
    if tokens.is_empty() {
        return 1.0;
    }

    let digit_count = text.chars().filter(|c| c.is_ascii_digit()).count();
    let long_token_count = tokens.iter().filter(|t| t.len() >= 7).count();
    let specificity = 0.05 * digit_count as f64 + 0.05 * long_token_count as f64;

    let keywords = stage_keywords(stage);
    let fit_hits = tokens.iter().filter(|t| keywords.contains(&t.as_str())).count();
    let fit = 0.1 * fit_hits as f64;

    let recent_tokens: HashSet<String> = recent
        .iter()
        .rev()
        .take(6)
        .flat_map(|line| tokenize(line))
        .collect();
    let overlap = tokens.iter().filter(|t| recent_tokens.contains(*t)).count();
    let overlap_penalty = 0.05 * overlap as f64;

    1.0 + specificity + fit - overlap_penalty
}

struct Candidate {
    raw: RawTurn,
    heuristic: f64,
}

/// Pick a random roster member other than `caller`, via the meeting's seeded
/// RNG (never `rand::thread_rng()` directly — see `meeting_core::rng`).
fn random_other_agent(rng: &mut MeetingRng, caller: &str, roster: &[String]) -> String {
    let others: Vec<String> = roster.iter().filter(|a| a.as_str() != caller).cloned().collect();
    rng.choose(&others).cloned().unwrap_or_else(|| caller.to_string())
}

/// Fire K=3 concurrent `generate` calls, rerank by `0.7*heuristic + 0.3*critic`,
/// and return the winner. On total failure (every candidate fails schema
/// validation), return the minimal safe fallback turn with a randomly chosen
/// responder (§4.3).
pub async fn generate_candidates(
    adapter: &dyn LanguageModelAdapter,
    caller: &str,
    roster: &[String],
    rng: &mut MeetingRng,
    stage: Stage,
    persona: &str,
    stage_brief: &str,
    temperature: f64,
    prompt: &str,
    recent_lines: &[String],
) -> RawTurn {
    let generate_calls = (0..CANDIDATE_COUNT).map(|i| {
        let prompt = format!("{prompt}\nvariant {i}");
        async move { adapter.complete_structured(&prompt, temperature, &RAW_TURN_SCHEMA).await }
    });
    let results: Vec<Result<Value, _>> = futures::future::join_all(generate_calls).await;

    let mut candidates = Vec::new();
    for result in results {
        let Ok(value) = result else { continue };
        let Ok(raw) = serde_json::from_value::<RawTurn>(value) else { continue };
        let heuristic = heuristic_score(&raw.message, stage, recent_lines);
        candidates.push(Candidate { raw, heuristic });
    }

    if candidates.is_empty() {
        let other_agent = random_other_agent(rng, caller, roster);
        return fallback_turn(caller, &other_agent, stage);
    }

    let recent_brief = recent_lines.iter().rev().take(6).rev().cloned().collect::<Vec<_>>().join("\n");
    let critic_calls = candidates.iter().map(|c| {
        let prompt = format!(
            "critic:stage={}\npersona: {persona}\n{stage_brief}\ncandidate: {}\nrecent:\n{recent_brief}",
            stage.as_str(),
            c.raw.message
        );
        async move { adapter.complete_structured(&prompt, 0.0, &CRITIC_SCORE_SCHEMA).await }
    });
    let critic_results: Vec<Result<Value, _>> = futures::future::join_all(critic_calls).await;

    let mut best_index = 0;
    let mut best_score = f64::MIN;
    for (i, candidate) in candidates.iter().enumerate() {
        let critic = critic_results
            .get(i)
            .and_then(|r| r.as_ref().ok())
            .and_then(|v| v.get("score"))
            .and_then(|s| s.as_f64())
            .unwrap_or(0.5);
        let rank = 0.7 * candidate.heuristic + 0.3 * critic;
        if rank > best_score {
            best_score = rank;
            best_index = i;
        }
    }

    candidates.into_iter().nth(best_index).unwrap().raw
}
