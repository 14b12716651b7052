//! JSON Schema declarations the engine hands to the Adapter alongside each
//! constrained-output prompt (§6 Adapter contract), and the validator that
//! checks a raw response against them before it is deserialized.

use jsonschema::JSONSchema;
use once_cell::sync::Lazy;
use serde_json::{json, Value};

use crate::error::LlmError;

/// Schema for the raw turn returned by `generate` — the shape the sanitation
/// pipeline in `meeting-core::schema` then coerces into a `ParsedTurn`.
pub static RAW_TURN_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "required": ["asker", "question", "responder", "message", "reaction", "next_stage"],
        "properties": {
            "asker": {"type": "string"},
            "question": {"type": "string"},
            "responder": {"type": "string"},
            "message": {"type": "string"},
            "reaction": {"type": "string"},
            "stance_updates": {"type": "object"},
            "chair_decision": {"type": ["string", "null"]},
            "end_stage": {"type": "boolean"},
            "next_stage": {"type": "string"},
            "action_item": {"type": ["string", "null"]},
            "option_proposal": {"type": ["string", "null"]},
            "option_ref": {"type": ["string", "null"]},
            "option_vote": {"type": ["string", "null"]},
            "comment": {"type": ["string", "null"]},
            "negotiation_offer": {"type": ["string", "null"]}
        }
    })
});

/// Schema for `plan(stage, agent, persona, stage_brief, memory_brief)`.
pub static PLAN_SPEC_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "required": ["speech_act", "objective"],
        "properties": {
            "speech_act": {"type": "string"},
            "objective": {"type": "string"}
        }
    })
});

/// Schema for `critic(...) -> [0,1]`.
pub static CRITIC_SCORE_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "required": ["score"],
        "properties": {
            "score": {"type": "number", "minimum": 0.0, "maximum": 1.0}
        }
    })
});

/// Schema for `evaluateOptionAttrs(text) -> six scores in [0,1]`.
pub static OPTION_EVAL_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "required": ["cost", "risk", "speed", "fairness", "innovation", "consensus"],
        "properties": {
            "cost": {"type": "number", "minimum": 0.0, "maximum": 1.0},
            "risk": {"type": "number", "minimum": 0.0, "maximum": 1.0},
            "speed": {"type": "number", "minimum": 0.0, "maximum": 1.0},
            "fairness": {"type": "number", "minimum": 0.0, "maximum": 1.0},
            "innovation": {"type": "number", "minimum": 0.0, "maximum": 1.0},
            "consensus": {"type": "number", "minimum": 0.0, "maximum": 1.0}
        }
    })
});

/// Validate `value` against `schema`, returning the joined validation errors
/// as a single `LlmError::SchemaValidation` on failure.
pub fn validate(schema: &Value, value: &Value) -> Result<(), LlmError> {
    let compiled = JSONSchema::compile(schema)
        .map_err(|e| LlmError::SchemaValidation(format!("invalid schema: {e}")))?;
    if let Err(errors) = compiled.validate(value) {
        let joined = errors.map(|e| e.to_string()).collect::<Vec<_>>().join("; ");
        return Err(LlmError::SchemaValidation(joined));
    }
    Ok(())
}
