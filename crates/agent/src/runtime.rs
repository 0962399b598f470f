use std::sync::Arc;

use productai_core::config::{AppConfig, LlmProvider};
use thiserror::Error;
use tracing::info;

use crate::answer::{AnswerEngine, RagAnswerEngine};
use crate::classifier::{IntentClassifier, LlmIntentClassifier};
use crate::llm::{LlmError, OpenAiClient};
use crate::reviews::{LlmReviewAnalyzer, ReviewAnalyzer};
use crate::router::RequestRouter;
use crate::tools::{FaqTool, ReviewsTool, ToolError, ToolRegistry};

#[derive(Debug, Error)]
pub enum RuntimeInitError {
    #[error("language model client: {0}")]
    Llm(#[from] LlmError),
    #[error("faq index: {0}")]
    Index(#[from] ToolError),
}

/// The chat router and the directly callable tools, sharing one set of
/// collaborators.
pub struct AgentRuntime {
    router: RequestRouter,
    tools: ToolRegistry,
}

impl AgentRuntime {
    pub fn with_collaborators(
        classifier: Arc<dyn IntentClassifier>,
        answers: Arc<dyn AnswerEngine>,
        reviews: Arc<dyn ReviewAnalyzer>,
    ) -> Self {
        let mut tools = ToolRegistry::default();
        tools.register(FaqTool::new(answers.clone()));
        tools.register(ReviewsTool::new(reviews.clone()));

        Self { router: RequestRouter::new(classifier, answers, reviews), tools }
    }

    /// Builds the production runtime. Fails when the index has not been
    /// built yet, so a server never starts without its FAQ source.
    pub async fn from_config(config: &AppConfig) -> Result<Self, RuntimeInitError> {
        let client = Arc::new(OpenAiClient::from_config(&config.llm)?);
        let answers =
            RagAnswerEngine::open(&config.index, client.clone(), client.clone()).await?;

        info!(
            event_name = "runtime.initialized",
            provider = match config.llm.provider {
                LlmProvider::OpenAi => "openai",
                LlmProvider::Ollama => "ollama",
            },
            model = client.model(),
            index_path = %config.index.path.display(),
            top_k = config.index.top_k,
            "agent runtime ready"
        );

        Ok(Self::with_collaborators(
            Arc::new(LlmIntentClassifier::new(client.clone())),
            Arc::new(answers),
            Arc::new(LlmReviewAnalyzer::new(client)),
        ))
    }

    pub fn router(&self) -> &RequestRouter {
        &self.router
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }
}

#[cfg(test)]
mod tests {
    use productai_core::config::AppConfig;
    use secrecy::SecretString;

    use super::{AgentRuntime, RuntimeInitError};
    use crate::tools::ToolError;

    #[tokio::test]
    async fn runtime_refuses_to_start_without_an_index() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = AppConfig::default();
        config.llm.api_key = Some(SecretString::from("sk-test".to_string()));
        config.index.path = dir.path().join("faq_index.db");

        let result = AgentRuntime::from_config(&config).await;

        assert!(matches!(result, Err(RuntimeInitError::Index(ToolError::Configuration(_)))));
    }

    #[tokio::test]
    async fn runtime_registers_both_tools() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = AppConfig::default();
        config.index.path = dir.path().join("faq_index.db");
        productai_db::open_index(&config.index.path, productai_db::OpenMode::CreateIfMissing)
            .await
            .expect("create index");

        let runtime = AgentRuntime::from_config(&config).await.expect("runtime");

        assert_eq!(runtime.tools().names(), vec!["faq", "reviews"]);
    }
}
