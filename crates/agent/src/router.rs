//! Routes one chat message: classify, parse the decision strictly, dispatch
//! to the chosen tool and wrap the result in a response envelope.

use std::sync::Arc;

use productai_core::errors::ApplicationError;
use productai_core::{RoutingDecision, ToolChoice, ToolResponse};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::answer::AnswerEngine;
use crate::classifier::IntentClassifier;
use crate::llm::LlmError;
use crate::reviews::{ReviewAnalyzer, DEFAULT_REVIEW_LIMIT};
use crate::tools::{ToolError, FAQ_TOOL, REVIEWS_TOOL};

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("missing required field `{field}`")]
    MissingField { field: &'static str },
    #[error("intent classifier call failed: {0}")]
    Classifier(#[source] LlmError),
    #[error("{tool} tool failed: {source}")]
    Tool {
        tool: &'static str,
        #[source]
        source: ToolError,
    },
}

impl From<RouteError> for ApplicationError {
    fn from(value: RouteError) -> Self {
        match value {
            RouteError::MissingField { field } => Self::MissingField { field },
            RouteError::Classifier(error) => Self::UpstreamClassifier(error.to_string()),
            RouteError::Tool { tool, source } => source.into_application(tool),
        }
    }
}

pub struct RequestRouter {
    classifier: Arc<dyn IntentClassifier>,
    answers: Arc<dyn AnswerEngine>,
    reviews: Arc<dyn ReviewAnalyzer>,
}

impl RequestRouter {
    pub fn new(
        classifier: Arc<dyn IntentClassifier>,
        answers: Arc<dyn AnswerEngine>,
        reviews: Arc<dyn ReviewAnalyzer>,
    ) -> Self {
        Self { classifier, answers, reviews }
    }

    /// Each call is independent: no state is kept between messages.
    pub async fn route(&self, message: &str) -> Result<ToolResponse, RouteError> {
        if message.is_empty() {
            return Err(RouteError::MissingField { field: "message" });
        }

        info!(event_name = "router.message.received", user_message = message, "incoming chat message");
        let raw = self.classifier.classify(message).await.map_err(RouteError::Classifier)?;
        debug!(event_name = "router.classifier.output", raw = %raw, "classifier output received");
        let decision = match RoutingDecision::parse(&raw) {
            Ok(decision) => decision,
            Err(error) => {
                warn!(
                    event_name = "router.decision.invalid",
                    error = %error,
                    "classifier output rejected, using fallback decision"
                );
                RoutingDecision::fallback()
            }
        };

        info!(
            event_name = "router.decision.accepted",
            intent = ?decision.intent,
            tool = decision.tool_to_use.as_str(),
            reason = %decision.reason,
            "routing decision ready"
        );

        let envelope = match decision.tool_to_use {
            ToolChoice::Faq => {
                let answer = self
                    .answers
                    .answer(message, &[])
                    .await
                    .map_err(|source| RouteError::Tool { tool: FAQ_TOOL, source })?;
                ToolResponse::faq(decision, answer)
            }
            // The whole message stands in for the product name.
            ToolChoice::Reviews => {
                let analysis = self
                    .reviews
                    .analyze(message, &[], DEFAULT_REVIEW_LIMIT)
                    .await
                    .map_err(|source| RouteError::Tool { tool: REVIEWS_TOOL, source })?;
                ToolResponse::reviews(decision, analysis)
            }
            ToolChoice::None => ToolResponse::fallback(decision),
        };

        info!(
            event_name = "router.response.ready",
            source = ?envelope.source(),
            "chat message routed"
        );
        Ok(envelope)
    }
}
