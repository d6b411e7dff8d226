//! Completion criteria deciding whether a step's output is accepted

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// System instruction given to the judge model
pub const JUDGE_SYSTEM_INSTRUCTION: &str = "You are an impartial judge.";

/// Predicate over generated text
///
/// Criteria of a type this crate does not know are kept verbatim, so a stored
/// workflow serializes back exactly as it was submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum CompletionCriterion {
    /// Case-insensitive substring match; an empty value always passes
    Contains { value: Option<String> },

    /// Output must parse as JSON
    JsonValid,

    /// A judge model answers YES/NO against the instruction
    LlmJudge { instruction: String },

    /// Reserved; not enforced yet
    Regex { value: Option<String> },

    /// Any other criterion, as submitted
    Unknown(Value),
}

/// Wire form of the recognised criterion types
#[derive(Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum KnownCriterion {
    Contains {
        #[serde(default)]
        value: Option<String>,
    },
    JsonValid,
    LlmJudge {
        #[serde(default)]
        instruction: String,
    },
    Regex {
        #[serde(default)]
        value: Option<String>,
    },
}

const KNOWN_TYPES: [&str; 4] = ["contains", "json_valid", "llm_judge", "regex"];

impl TryFrom<Value> for CompletionCriterion {
    type Error = serde_json::Error;

    fn try_from(raw: Value) -> Result<Self, Self::Error> {
        let known = raw
            .get("type")
            .and_then(Value::as_str)
            .is_some_and(|t| KNOWN_TYPES.contains(&t));
        if !known {
            return Ok(Self::Unknown(raw));
        }

        Ok(match serde_json::from_value(raw)? {
            KnownCriterion::Contains { value } => Self::Contains { value },
            KnownCriterion::JsonValid => Self::JsonValid,
            KnownCriterion::LlmJudge { instruction } => Self::LlmJudge { instruction },
            KnownCriterion::Regex { value } => Self::Regex { value },
        })
    }
}

impl From<CompletionCriterion> for Value {
    fn from(criterion: CompletionCriterion) -> Self {
        let known = match criterion {
            CompletionCriterion::Contains { value } => KnownCriterion::Contains { value },
            CompletionCriterion::JsonValid => KnownCriterion::JsonValid,
            CompletionCriterion::LlmJudge { instruction } => {
                KnownCriterion::LlmJudge { instruction }
            }
            CompletionCriterion::Regex { value } => KnownCriterion::Regex { value },
            CompletionCriterion::Unknown(raw) => return raw,
        };
        serde_json::to_value(known).unwrap_or(Value::Null)
    }
}

impl CompletionCriterion {
    pub fn contains(value: impl Into<String>) -> Self {
        Self::Contains {
            value: Some(value.into()),
        }
    }

    pub fn llm_judge(instruction: impl Into<String>) -> Self {
        Self::LlmJudge {
            instruction: instruction.into(),
        }
    }

    /// Unrecognised criterion of the given type
    pub fn unknown(type_name: &str) -> Self {
        Self::Unknown(serde_json::json!({ "type": type_name }))
    }

    /// Wire name of the criterion type
    pub fn type_name(&self) -> &str {
        match self {
            Self::Contains { .. } => "contains",
            Self::JsonValid => "json_valid",
            Self::LlmJudge { .. } => "llm_judge",
            Self::Regex { .. } => "regex",
            Self::Unknown(raw) => raw.get("type").and_then(Value::as_str).unwrap_or("unknown"),
        }
    }

    /// Whether the criterion is enforced by the evaluator
    pub fn is_enforced(&self) -> bool {
        !matches!(self, Self::Regex { .. } | Self::Unknown(_))
    }
}

impl fmt::Display for CompletionCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Case-insensitive substring check; empty or missing needle passes
pub fn output_contains(output: &str, value: Option<&str>) -> bool {
    match value {
        None => true,
        Some(needle) if needle.is_empty() => true,
        Some(needle) => output.to_lowercase().contains(&needle.to_lowercase()),
    }
}

/// True iff the output is well-formed JSON
pub fn output_is_json(output: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(output).is_ok()
}

/// Build the prompt sent to the judge model
pub fn judge_prompt(instruction: &str, output: &str) -> String {
    format!(
        "Task: Evaluate if the following text meets the requirement.\n\
         Requirement: {instruction}\n\n\
         Text to evaluate:\n\
         {output}\n\n\
         Answer ONLY with 'YES' or 'NO'."
    )
}

/// Interpret a judge reply; anything containing YES is a pass
pub fn judge_verdict(reply: &str) -> bool {
    reply.trim().to_uppercase().contains("YES")
}
