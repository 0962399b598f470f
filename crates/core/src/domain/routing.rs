use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const INVALID_RESPONSE_REASON: &str = "Invalid LLM response";
pub const FALLBACK_NEXT_ACTION: &str = "Fallback message";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Faq,
    Reviews,
    Fallback,
}

/// Downstream tool named by the classifier. `None` means no tool applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    Faq,
    Reviews,
    None,
}

impl ToolChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Faq => "faq",
            Self::Reviews => "reviews",
            Self::None => "none",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingDecision {
    pub intent: Intent,
    pub tool_to_use: ToolChoice,
    pub reason: String,
    pub next_action: String,
}

#[derive(Debug, Error)]
#[error("classifier output does not match the routing decision schema: {source}")]
pub struct DecisionParseError {
    #[from]
    source: serde_json::Error,
}

impl RoutingDecision {
    /// Decision substituted when the classifier output cannot be parsed.
    pub fn fallback() -> Self {
        Self {
            intent: Intent::Fallback,
            tool_to_use: ToolChoice::None,
            reason: INVALID_RESPONSE_REASON.to_string(),
            next_action: FALLBACK_NEXT_ACTION.to_string(),
        }
    }

    /// Parses raw classifier text against the strict decision schema. Every
    /// field is required, enum values are closed and unknown keys are
    /// rejected. Surrounding whitespace and a single markdown code fence are
    /// tolerated.
    pub fn parse(raw: &str) -> Result<Self, DecisionParseError> {
        let body = strip_code_fence(raw.trim());
        Ok(serde_json::from_str(body)?)
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let Some(inner) = rest.strip_suffix("```") else {
        return text;
    };
    // Drop an optional language tag on the opening fence line.
    match inner.split_once('\n') {
        Some((tag, body)) if !tag.trim_start().starts_with('{') => body.trim(),
        _ => inner.trim(),
    }
}
