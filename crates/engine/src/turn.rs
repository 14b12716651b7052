//! Turn execution for a single agent (§4.4): the step-by-step procedure that
//! mutates `MeetingState` by up to three dialogue lines plus ancillary
//! option/vote/action lines.

use meeting_core::{
    sanitize_turn, CriteriaScores, EpisodicEntry, EpisodicKind, MeetingState, OptionEval,
    ParsedTurn, PlanSpec, Reaction, RegisterOutcome, Stage, Stance, VoteKind, CHAIR_NAME,
};
use meeting_llm::adapter::LanguageModelAdapter;
use meeting_llm::candidates::generate_candidates;
use meeting_llm::prompt::{stage_brief, MemoryPack};
use meeting_llm::schemas::{OPTION_EVAL_SCHEMA, PLAN_SPEC_SCHEMA};

use crate::events::Event;

const STAGE_TURN_HARD_CAP: u32 = 10;
const RECENT_PAIRS_WINDOW: usize = 20;

/// Run one agent's turn. Returns the dialogue events newly produced.
pub async fn agent_step(state: &mut MeetingState, adapter: &dyn LanguageModelAdapter, agent: &str) -> Vec<Event> {
    let mut events = Vec::new();
    let stage = state.stage;
    tracing::debug!(agent, stage = stage.as_str(), turn = state.turn, "agent step");

    // Step 1: stage has overrun its hard cap regardless of configured budget.
    if state.stage_turns > STAGE_TURN_HARD_CAP {
        let line = format!("[{}] Chair: We've spent enough time here.", stage.as_str());
        state.push_line(line.clone());
        events.push(Event::dialogue(line));
        state.advance_stage();
        return events;
    }

    // Step 2: global turn budget exhausted, force the meeting to decide.
    if state.turn > state.conditions.max_turns {
        let line = format!("[{}] Chair: Time's up.", stage.as_str());
        state.push_line(line.clone());
        events.push(Event::dialogue(line));
        state.stage = Stage::Decide;
        state.stage_turns = 0;
        state.interruptions_this_stage = 0;
        state.accepts_this_stage = 0;
        return events;
    }

    // Step 3: memory pack.
    let memory = MemoryPack::build(&state.dialogue, &state.options);
    let brief = stage_brief(stage, &state.issue);
    let Some(profile) = state.profiles.get(agent).cloned() else { return events };
    let temperature = stage.temperature(state.conditions.formality, state.conditions.creativity_mode);

    // Step 4: plan the speech act (informs, but does not gate, candidate generation).
    let plan_prompt = format!("plan:{brief}\npersona: {}\n{}", profile.persona, memory.as_brief());
    let plan: Option<PlanSpec> = adapter
        .complete_structured(&plan_prompt, 0.4, &PLAN_SPEC_SCHEMA)
        .await
        .ok()
        .and_then(|v| serde_json::from_value(v).ok());
    if let Some(plan) = &plan {
        tracing::debug!(speech_act = %plan.speech_act, objective = %plan.objective, "planned speech act");
    }

    // Step 5: generate K=3 candidates and rerank.
    let generate_prompt = format!("generate:{brief}\npersona: {}\n{}", profile.persona, memory.as_brief());
    let raw = generate_candidates(
        adapter,
        agent,
        &state.agents,
        &mut state.rng,
        stage,
        &profile.persona,
        &brief,
        temperature,
        &generate_prompt,
        &state.dialogue,
    )
    .await;

    // Step 6: sanitize.
    let parsed = sanitize_turn(raw, agent, &state.agents, CHAIR_NAME, stage);

    // Step 7: duplicate-question guard.
    if !parsed.question.trim().is_empty() {
        let key = (stage, parsed.asker.clone(), parsed.question.trim().to_lowercase());
        if state.question_seen.contains(&key) {
            let line = format!("[{}] Chair: That's been asked already.", stage.as_str());
            state.push_line(line.clone());
            events.push(Event::dialogue(line));
            state.advance_stage();
            return events;
        }
        state.question_seen.insert(key);
    }

    // Step 8: interruption model.
    if let Some((_interrupter, lines)) = maybe_interrupt(state, &parsed) {
        for line in lines {
            state.push_line(line.clone());
            events.push(Event::dialogue(line));
        }
        state.interruptions_this_stage += 1;
        state.metrics.interruptions += 1;
        run_persuasion(state, &_interrupter, &parsed.responder);
    }

    // Step 9: unique action item short-circuits the rest of the turn.
    if let Some(action) = &parsed.action_item {
        let normalized = action.trim().to_lowercase();
        let already_raised = state
            .episodic
            .iter()
            .any(|e| e.kind == EpisodicKind::Action && e.text.to_lowercase() == normalized);
        if !already_raised && !normalized.is_empty() {
            let line = format!("[{}] ACTION RAISED: {}", stage.as_str(), action.trim());
            state.push_line(line.clone());
            events.push(Event::dialogue(line));
            state.metrics.actions_raised += 1;
            log_episodic(state, stage, agent, EpisodicKind::Action, action.trim());
            state.advance_stage();
            return events;
        }
    }

    // Step 10: the three dialogue lines.
    if !parsed.question.trim().is_empty() {
        let line = format!("[{}] {} asks {}: {}", stage.as_str(), parsed.asker, parsed.responder, parsed.question);
        state.push_line(line.clone());
        events.push(Event::dialogue(line));
        log_episodic(state, stage, &parsed.asker, EpisodicKind::Question, &parsed.question);
    }
    let response_line = format!("[{}] {}: {}", stage.as_str(), parsed.responder, parsed.message);
    state.push_line(response_line.clone());
    events.push(Event::dialogue(response_line));
    log_episodic(state, stage, &parsed.responder, EpisodicKind::Response, &parsed.message);

    let reaction_line = format!("[{}] {} reacts: {}", stage.as_str(), parsed.asker, parsed.reaction.as_str());
    state.push_line(reaction_line.clone());
    events.push(Event::dialogue(reaction_line));
    log_episodic(state, stage, &parsed.asker, EpisodicKind::Reaction, parsed.reaction.as_str());

    if let Some(offer) = &parsed.negotiation_offer {
        log_episodic(state, stage, &parsed.asker, EpisodicKind::Negotiation, offer);
    }

    state.metrics.record_stage_turn(stage);
    state.metrics.record_agent_turn(agent);

    state.convo_edges.push((parsed.asker.clone(), parsed.responder.clone()));
    state.recent_pairs.push((parsed.asker.clone(), parsed.responder.clone()));
    if state.recent_pairs.len() > RECENT_PAIRS_WINDOW {
        state.recent_pairs.remove(0);
    }

    // Step 11: apply stance updates.
    for (who, stance) in &parsed.stance_updates {
        if state.stances.contains_key(who) {
            state.stances.insert(who.clone(), *stance);
        }
    }

    // Step 12: accept/decline bookkeeping feeds the social model.
    let (delta, val) = match parsed.reaction {
        Reaction::Accept => (1.2, 1.0),
        Reaction::Decline | Reaction::RejectPropose => (-1.2, -1.0),
    };
    state.social.update_affinity(&parsed.asker, &parsed.responder, delta);
    state.social.log_interaction(&parsed.asker, &parsed.responder, state.turn, val);
    if matches!(parsed.reaction, Reaction::Accept) {
        state.accepts_this_stage += 1;
    }

    // Step 13: too much agreement in a row invites dissent.
    if state.accepts_this_stage >= 4 && matches!(stage, Stage::Discuss | Stage::Options | Stage::Evaluate) {
        let line = format!("[{}] Chair: Let's hear a counterpoint.", stage.as_str());
        state.push_line(line.clone());
        events.push(Event::dialogue(line));
        state.accepts_this_stage = 0;
    }

    // Step 14: option proposal / vote.
    if let Some(text) = &parsed.option_proposal {
        let attributes = evaluate_option_attrs(adapter, text).await;
        match state.options.register(text, &parsed.asker, stage, state.turn, attributes) {
            RegisterOutcome::Created(id) => {
                let line = format!("[{}] OPTION PROPOSED {} by {}: {}", stage.as_str(), id, parsed.asker, text);
                state.push_line(line.clone());
                events.push(Event::dialogue(line));
                state.metrics.options_proposed += 1;
                log_episodic(state, stage, &parsed.asker, EpisodicKind::Option, text);
            }
            RegisterOutcome::Duplicate(id) => {
                let line = format!("[{}] OPTION PROPOSED {} by {}: {} (duplicate)", stage.as_str(), id, parsed.asker, text);
                state.push_line(line.clone());
                events.push(Event::dialogue(line));
                log_episodic(state, stage, &parsed.asker, EpisodicKind::Option, text);
            }
        }
    }
    if let Some(vote) = parsed.option_vote {
        if let Some(id) = state.options.vote(&parsed.asker, parsed.option_ref.as_deref(), vote) {
            let line = format!("[{}] VOTE {} -> {}: {}", stage.as_str(), parsed.asker, id, vote.as_str());
            state.push_line(line.clone());
            events.push(Event::dialogue(line));
            state.metrics.votes_cast += 1;
            log_episodic(state, stage, &parsed.asker, EpisodicKind::Vote, vote.as_str());
        }
    }

    // Step 15: autoVote stragglers in evaluate/decide (§4.1 autoVote).
    if matches!(stage, Stage::Evaluate | Stage::Decide) && !state.options.is_empty() {
        if let Some(oid) = state.options.most_recent() {
            let roster = state.agents.clone();
            let non_voters: Vec<String> = state
                .options
                .non_voters(&oid, &roster)
                .into_iter()
                .map(str::to_string)
                .collect();
            let proposer = state.options.get(&oid).map(|o| o.proposer.clone());
            for voter in non_voters {
                let Some(profile) = state.profiles.get(&voter).cloned() else { continue };
                let utility = state.options.utility(&profile.goals, &oid);
                let affinity_bonus = proposer
                    .as_deref()
                    .map(|p| 0.05 * state.social.affinity(&voter, p))
                    .unwrap_or(0.0);
                let adjusted = utility + affinity_bonus;
                let vote = if adjusted >= 0.55 {
                    VoteKind::Support
                } else if adjusted <= 0.45 {
                    VoteKind::Oppose
                } else {
                    VoteKind::Abstain
                };
                if let Some(id) = state.options.vote(&voter, Some(&oid), vote) {
                    let line = format!("[{}] VOTE {} -> {}: {}", stage.as_str(), voter, id, vote.as_str());
                    state.push_line(line.clone());
                    events.push(Event::dialogue(line));
                    state.metrics.votes_cast += 1;
                    log_episodic(state, stage, &voter, EpisodicKind::Vote, vote.as_str());
                }
            }
        }
    }

    // Step 16: persuasion pass for the asker.
    run_persuasion(state, &parsed.asker, &parsed.responder);

    // Step 17: chair decision line.
    if let Some(decision) = &parsed.chair_decision {
        let line = format!("[{}] Chair: {}", stage.as_str(), decision);
        state.push_line(line.clone());
        events.push(Event::dialogue(line));
        state.chair_used = true;
    }

    // Step 18: stage transitions.
    if state.consensus_reached() {
        let line = format!("[{}] Chair: We have consensus, let's move forward.", stage.as_str());
        state.push_line(line.clone());
        events.push(Event::dialogue(line));
        state.advance_stage();
    } else if parsed.end_stage {
        state.set_stage_forward(parsed.next_stage);
    }

    // Step 19: materialize a decision once we reach decide with none recorded.
    if state.stage == Stage::Decide && state.decision.is_none() {
        let decision_text = match state.options.best() {
            Some(best) => format!("{}: {}", best.id, best.text),
            None => state.majority_stance().as_str().to_string(),
        };
        let line = format!(">>> DECISION: {decision_text}");
        state.push_line(line.clone());
        events.push(Event::dialogue(line));
        state.decision = Some(decision_text);
    }

    events
}

fn log_episodic(state: &mut MeetingState, stage: Stage, speaker: &str, kind: EpisodicKind, text: &str) {
    state.episodic.push(EpisodicEntry {
        turn: state.turn,
        stage,
        speaker: speaker.to_string(),
        kind,
        text: text.to_string(),
        meta: serde_json::Value::Null,
    });
}

/// Pick the first bystander (fixed roster order) whose interruption roll
/// succeeds, capped at two per stage (§4.4 step 8).
fn maybe_interrupt(state: &mut MeetingState, parsed: &ParsedTurn) -> Option<(String, Vec<String>)> {
    if state.interruptions_this_stage >= 2 {
        return None;
    }
    let stage = state.stage;
    let base = stage.interruption_base(state.conditions.conflict_tolerance);
    let bystanders = state.agents.clone();
    for bystander in bystanders {
        if bystander == parsed.asker || bystander == parsed.responder {
            continue;
        }
        let Some(profile) = state.profiles.get(&bystander).cloned() else { continue };
        let affinity = state.social.affinity(&bystander, &parsed.responder);
        let p = (base + 0.45 * profile.traits.interrupt + 0.25 * (-affinity).max(0.0)).min(0.65);
        if state.rng.sample_bernoulli(p) {
            let lines = vec![
                format!("[{}] (INTERRUPTION) {}: Wait, let me jump in.", stage.as_str(), bystander),
                format!("[{}] Chair: One at a time.", stage.as_str()),
            ];
            return Some((bystander, lines));
        }
    }
    None
}

/// Attempt to shift `listener`'s stance towards `speaker`'s (§4.2, §4.4 step 16).
fn run_persuasion(state: &mut MeetingState, listener: &str, speaker: &str) {
    if listener == speaker {
        return;
    }
    let (Some(listener_profile), Some(speaker_profile)) =
        (state.profiles.get(listener).cloned(), state.profiles.get(speaker).cloned())
    else {
        return;
    };
    let listener_stance = state.stances.get(listener).copied().unwrap_or(Stance::Neutral);
    let speaker_stance = state.stances.get(speaker).copied().unwrap_or(Stance::Neutral);
    let now = state.turn;
    let shift = state.social.maybe_shift(
        &mut state.rng,
        now,
        listener,
        &listener_profile.traits,
        &listener_profile.goals,
        listener_stance,
        speaker,
        &speaker_profile.traits,
        speaker_profile.dominance,
        speaker_stance,
    );
    if let Some(new_stance) = shift {
        state.stances.insert(listener.to_string(), new_stance);
    }
}

async fn evaluate_option_attrs(adapter: &dyn LanguageModelAdapter, text: &str) -> CriteriaScores {
    let prompt = format!("option_eval:{text}");
    match adapter.complete_structured(&prompt, 0.2, &OPTION_EVAL_SCHEMA).await {
        Ok(value) => serde_json::from_value::<OptionEval>(value).map(CriteriaScores::from).unwrap_or_default(),
        Err(_) => CriteriaScores::default(),
    }
}
