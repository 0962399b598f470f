use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use productai_core::errors::ApplicationError;
use productai_db::RepositoryError;
use serde_json::Value;
use thiserror::Error;

use crate::answer::AnswerEngine;
use crate::llm::LlmError;
use crate::reviews::{ReviewAnalyzer, DEFAULT_REVIEW_LIMIT};

pub const FAQ_TOOL: &str = "faq";
pub const REVIEWS_TOOL: &str = "reviews";

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("missing required field `{field}`")]
    MissingField { field: &'static str },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
    #[error("index lookup failed: {0}")]
    Retrieval(#[from] RepositoryError),
    #[error("language model call failed: {0}")]
    Upstream(#[from] LlmError),
    #[error("failed to encode tool output: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ToolError {
    pub fn into_application(self, tool: &'static str) -> ApplicationError {
        match self {
            Self::MissingField { field } => ApplicationError::MissingField { field },
            Self::InvalidArgument(message) => ApplicationError::InvalidArgument(message),
            Self::Configuration(message) => ApplicationError::Configuration(message),
            Self::Encode(error) => ApplicationError::Internal(error.to_string()),
            error @ (Self::Retrieval(_) | Self::Upstream(_)) => {
                ApplicationError::UpstreamTool { tool, message: error.to_string() }
            }
        }
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    async fn execute(&self, input: Value) -> Result<Value, ToolError>;
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.insert(tool.name().to_string(), Box::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(Box::as_ref)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// `{"query": string}` -> `{"answer", "sources"}`
pub struct FaqTool {
    engine: Arc<dyn AnswerEngine>,
}

impl FaqTool {
    pub fn new(engine: Arc<dyn AnswerEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl Tool for FaqTool {
    fn name(&self) -> &'static str {
        FAQ_TOOL
    }

    async fn execute(&self, input: Value) -> Result<Value, ToolError> {
        let query = required_str(&input, "query")?;
        let answer = self.engine.answer(query, &[]).await?;
        Ok(serde_json::to_value(answer)?)
    }
}

/// `{"product_name": string, "reviews"?: [string]}` -> `{"product", "analysis"}`
pub struct ReviewsTool {
    analyzer: Arc<dyn ReviewAnalyzer>,
}

impl ReviewsTool {
    pub fn new(analyzer: Arc<dyn ReviewAnalyzer>) -> Self {
        Self { analyzer }
    }
}

#[async_trait]
impl Tool for ReviewsTool {
    fn name(&self) -> &'static str {
        REVIEWS_TOOL
    }

    async fn execute(&self, input: Value) -> Result<Value, ToolError> {
        let product_name = required_str(&input, "product_name")?;
        let reviews = optional_string_list(&input, "reviews")?;
        let analysis = self.analyzer.analyze(product_name, &reviews, DEFAULT_REVIEW_LIMIT).await?;
        Ok(serde_json::to_value(analysis)?)
    }
}

fn required_str<'a>(input: &'a Value, field: &'static str) -> Result<&'a str, ToolError> {
    match input.get(field) {
        None | Some(Value::Null) => Err(ToolError::MissingField { field }),
        Some(Value::String(value)) if value.trim().is_empty() => {
            Err(ToolError::MissingField { field })
        }
        Some(Value::String(value)) => Ok(value),
        Some(_) => Err(ToolError::InvalidArgument(format!("'{field}' must be a string."))),
    }
}

fn optional_string_list(input: &Value, field: &'static str) -> Result<Vec<String>, ToolError> {
    let invalid = || ToolError::InvalidArgument(format!("'{field}' must be a list of strings."));
    match input.get(field) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string).ok_or_else(invalid))
            .collect(),
        Some(_) => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use productai_core::domain::document::ChatTurn;
    use productai_core::errors::ApplicationError;
    use productai_core::{FaqAnswer, ReviewAnalysis};
    use serde_json::json;

    use super::{FaqTool, ReviewsTool, ToolError, ToolRegistry, FAQ_TOOL, REVIEWS_TOOL};
    use crate::answer::AnswerEngine;
    use crate::llm::LlmError;
    use crate::reviews::ReviewAnalyzer;

    struct StaticAnswers;

    #[async_trait]
    impl AnswerEngine for StaticAnswers {
        async fn answer(&self, question: &str, _history: &[ChatTurn]) -> Result<FaqAnswer, ToolError> {
            Ok(FaqAnswer { answer: format!("answer to {question}"), sources: vec!["doc".into()] })
        }
    }

    #[derive(Default)]
    struct RecordingAnalyzer {
        calls: Mutex<Vec<(String, Vec<String>, usize)>>,
    }

    #[async_trait]
    impl ReviewAnalyzer for RecordingAnalyzer {
        async fn analyze(
            &self,
            product_name: &str,
            reviews: &[String],
            limit: usize,
        ) -> Result<ReviewAnalysis, ToolError> {
            self.calls.lock().expect("lock").push((
                product_name.to_string(),
                reviews.to_vec(),
                limit,
            ));
            Ok(ReviewAnalysis { product: product_name.to_string(), analysis: "ok".into() })
        }
    }

    fn registry(analyzer: Arc<RecordingAnalyzer>) -> ToolRegistry {
        let mut registry = ToolRegistry::default();
        registry.register(FaqTool::new(Arc::new(StaticAnswers)));
        registry.register(ReviewsTool::new(analyzer));
        registry
    }

    #[tokio::test]
    async fn faq_tool_answers_query() {
        let registry = registry(Arc::default());
        let tool = registry.get(FAQ_TOOL).expect("faq tool registered");

        let output = tool.execute(json!({"query": "refunds?"})).await.expect("execute");
        assert_eq!(output, json!({"answer": "answer to refunds?", "sources": ["doc"]}));
    }

    #[tokio::test]
    async fn missing_query_is_reported_by_field_name() {
        let registry = registry(Arc::default());
        let tool = registry.get(FAQ_TOOL).expect("faq tool registered");

        let error = tool.execute(json!({})).await.expect_err("missing query");
        assert!(matches!(error, ToolError::MissingField { field: "query" }));
        assert_eq!(
            error.into_application(FAQ_TOOL),
            ApplicationError::MissingField { field: "query" }
        );
    }

    #[tokio::test]
    async fn reviews_tool_passes_optional_reviews_and_default_limit() {
        let analyzer = Arc::new(RecordingAnalyzer::default());
        let registry = registry(analyzer.clone());
        let tool = registry.get(REVIEWS_TOOL).expect("reviews tool registered");

        let output = tool
            .execute(json!({"product_name": "Kettle", "reviews": ["hot", "fast"]}))
            .await
            .expect("execute");

        assert_eq!(output, json!({"product": "Kettle", "analysis": "ok"}));
        let calls = analyzer.calls.lock().expect("lock");
        assert_eq!(calls[0], ("Kettle".to_string(), vec!["hot".into(), "fast".into()], 5));
    }

    #[tokio::test]
    async fn malformed_reviews_list_is_invalid_argument() {
        let registry = registry(Arc::default());
        let tool = registry.get(REVIEWS_TOOL).expect("reviews tool registered");

        let error = tool
            .execute(json!({"product_name": "Kettle", "reviews": [1, 2]}))
            .await
            .expect_err("numeric reviews");
        assert!(matches!(error, ToolError::InvalidArgument(_)));
    }

    #[test]
    fn upstream_failures_map_to_upstream_tool_errors() {
        let error = ToolError::Upstream(LlmError::EmptyResponse { endpoint: "chat completions" });
        assert!(matches!(
            error.into_application(REVIEWS_TOOL),
            ApplicationError::UpstreamTool { tool: "reviews", .. }
        ));
    }

    #[test]
    fn registry_lists_tools_in_name_order() {
        let registry = registry(Arc::default());
        assert_eq!(registry.names(), vec!["faq", "reviews"]);
        assert!(registry.get("weather").is_none());
    }
}
