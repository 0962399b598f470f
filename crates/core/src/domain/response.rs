use serde::{Deserialize, Serialize};

use crate::domain::routing::RoutingDecision;

pub const FALLBACK_MESSAGE: &str = "I'm here to help with your orders, returns, payments, or product reviews. Can you please ask about one of these topics?";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Faq,
    Reviews,
    Fallback,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqAnswer {
    pub answer: String,
    pub sources: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewAnalysis {
    pub product: String,
    pub analysis: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackMessage {
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolPayload {
    Faq(FaqAnswer),
    Reviews(ReviewAnalysis),
    Fallback(FallbackMessage),
}

/// Envelope returned for a routed chat message. Built only through the
/// per-source constructors so `source` always names the tool that produced
/// `response`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ToolResponse {
    source: ResponseSource,
    intent: RoutingDecision,
    response: ToolPayload,
}

impl ToolResponse {
    pub fn faq(intent: RoutingDecision, answer: FaqAnswer) -> Self {
        Self { source: ResponseSource::Faq, intent, response: ToolPayload::Faq(answer) }
    }

    pub fn reviews(intent: RoutingDecision, analysis: ReviewAnalysis) -> Self {
        Self { source: ResponseSource::Reviews, intent, response: ToolPayload::Reviews(analysis) }
    }

    pub fn fallback(intent: RoutingDecision) -> Self {
        Self {
            source: ResponseSource::Fallback,
            intent,
            response: ToolPayload::Fallback(FallbackMessage {
                message: FALLBACK_MESSAGE.to_string(),
            }),
        }
    }

    pub fn source(&self) -> ResponseSource {
        self.source
    }

    pub fn intent(&self) -> &RoutingDecision {
        &self.intent
    }

    pub fn response(&self) -> &ToolPayload {
        &self.response
    }
}
