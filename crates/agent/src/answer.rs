//! Retrieval-augmented answers over the FAQ index.
//!
//! A question is embedded, the closest chunks are pulled from the index and
//! the language model answers from those chunks only. When prior turns are
//! supplied, the question is first rewritten into a standalone question so
//! follow-ups retrieve the right context.

use std::sync::Arc;

use async_trait::async_trait;
use productai_core::config::IndexConfig;
use productai_core::{ChatTurn, FaqAnswer, ScoredChunk};
use productai_db::{open_index, ChunkStore, OpenMode, SqlChunkStore};
use tracing::debug;

use crate::llm::{ChatMessage, CompletionRequest, Embedder, LlmClient};
use crate::tools::ToolError;

pub const SOURCE_SNIPPET_CHARS: usize = 250;

const CONDENSE_PROMPT: &str = "Rewrite the follow-up question so it can be understood without the \
conversation below. Keep the language of the original question and reply with the rewritten \
question only.";

const ANSWER_PROMPT: &str = "You answer customer questions for an e-commerce store using only the \
context below. If the context does not contain the answer, say that you don't know instead of \
guessing.";

#[async_trait]
pub trait AnswerEngine: Send + Sync {
    async fn answer(&self, question: &str, history: &[ChatTurn]) -> Result<FaqAnswer, ToolError>;
}

pub struct RagAnswerEngine {
    store: Arc<dyn ChunkStore>,
    embedder: Arc<dyn Embedder>,
    llm: Arc<dyn LlmClient>,
    top_k: usize,
}

impl RagAnswerEngine {
    pub fn new(
        store: Arc<dyn ChunkStore>,
        embedder: Arc<dyn Embedder>,
        llm: Arc<dyn LlmClient>,
        top_k: usize,
    ) -> Self {
        Self { store, embedder, llm, top_k }
    }

    /// Opens the persisted index read-only. A missing index is a configuration
    /// failure, never an empty answer set.
    pub async fn open(
        index: &IndexConfig,
        embedder: Arc<dyn Embedder>,
        llm: Arc<dyn LlmClient>,
    ) -> Result<Self, ToolError> {
        let pool = open_index(&index.path, OpenMode::Existing)
            .await
            .map_err(|error| ToolError::Configuration(error.to_string()))?;
        Ok(Self::new(Arc::new(SqlChunkStore::new(pool)), embedder, llm, index.top_k))
    }

    async fn standalone_question(
        &self,
        question: &str,
        history: &[ChatTurn],
    ) -> Result<String, ToolError> {
        if history.is_empty() {
            return Ok(question.to_string());
        }

        let transcript = history
            .iter()
            .map(|turn| format!("Customer: {}\nAssistant: {}", turn.question, turn.answer))
            .collect::<Vec<_>>()
            .join("\n");
        let request = CompletionRequest {
            messages: vec![
                ChatMessage::system(CONDENSE_PROMPT),
                ChatMessage::user(format!(
                    "Conversation:\n{transcript}\n\nFollow-up question: {question}"
                )),
            ],
            temperature: 0.0,
        };
        let rewritten = self.llm.complete(request).await?;
        let rewritten = rewritten.trim();
        Ok(if rewritten.is_empty() { question.to_string() } else { rewritten.to_string() })
    }
}

#[async_trait]
impl AnswerEngine for RagAnswerEngine {
    async fn answer(&self, question: &str, history: &[ChatTurn]) -> Result<FaqAnswer, ToolError> {
        if question.trim().is_empty() {
            return Err(ToolError::InvalidArgument("question must not be empty".to_string()));
        }

        let standalone = self.standalone_question(question, history).await?;
        let query_embedding = self.embedder.embed(&standalone).await?;
        let chunks = self.store.search(&query_embedding, self.top_k).await?;
        debug!(
            event_name = "faq.retrieval.completed",
            retrieved = chunks.len(),
            top_score = chunks.first().map(|chunk| chunk.score).unwrap_or_default(),
        );

        let request = CompletionRequest {
            messages: vec![
                ChatMessage::system(format!("{ANSWER_PROMPT}\n\nContext:\n{}", context(&chunks))),
                ChatMessage::user(standalone),
            ],
            temperature: 0.0,
        };
        let answer = self.llm.complete(request).await?;

        Ok(FaqAnswer {
            answer: answer.trim().to_string(),
            sources: chunks.iter().map(|chunk| snippet(&chunk.content)).collect(),
        })
    }
}

fn context(chunks: &[ScoredChunk]) -> String {
    chunks.iter().map(|chunk| chunk.content.as_str()).collect::<Vec<_>>().join("\n\n")
}

fn snippet(content: &str) -> String {
    content.chars().take(SOURCE_SNIPPET_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use productai_core::config::IndexConfig;
    use productai_core::{ChatTurn, EmbeddedChunk, SourceDocument};
    use productai_db::{ChunkStore, InMemoryChunkStore};

    use super::{AnswerEngine, RagAnswerEngine, SOURCE_SNIPPET_CHARS};
    use crate::llm::{CompletionRequest, Embedder, LlmClient, LlmError};
    use crate::tools::ToolError;

    struct KeywordEmbedder;

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
            Ok(texts
                .iter()
                .map(|text| {
                    let text = text.to_lowercase();
                    vec![
                        f32::from(u8::from(text.contains("return"))),
                        f32::from(u8::from(text.contains("ship"))),
                        0.1,
                    ]
                })
                .collect())
        }
    }

    #[derive(Default)]
    struct ScriptedLlm {
        requests: Mutex<Vec<CompletionRequest>>,
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
            let mut requests = self.requests.lock().expect("lock");
            requests.push(request);
            Ok(if requests.len() == 1 && requests[0].messages[1].content.contains("Follow-up") {
                "How do returns work?".to_string()
            } else {
                "  Returns are accepted within 30 days.  ".to_string()
            })
        }
    }

    async fn seeded_store() -> Arc<InMemoryChunkStore> {
        let store = Arc::new(InMemoryChunkStore::default());
        let long_return_policy = format!("Returns are accepted within 30 days. {}", "r".repeat(400));
        let chunks = vec![
            EmbeddedChunk::new(0, long_return_policy, vec![1.0, 0.0, 0.1]),
            EmbeddedChunk::new(1, "Orders ship in two days.", vec![0.0, 1.0, 0.1]),
        ];
        store
            .insert_document(&SourceDocument::new("faq.md", "faq"), &chunks)
            .await
            .expect("seed store");
        store
    }

    #[tokio::test]
    async fn answers_from_retrieved_context_with_truncated_sources() {
        let llm = Arc::new(ScriptedLlm::default());
        let engine =
            RagAnswerEngine::new(seeded_store().await, Arc::new(KeywordEmbedder), llm.clone(), 1);

        let answer = engine.answer("What is the return policy?", &[]).await.expect("answer");

        assert_eq!(answer.answer, "Returns are accepted within 30 days.");
        assert_eq!(answer.sources.len(), 1);
        assert_eq!(answer.sources[0].chars().count(), SOURCE_SNIPPET_CHARS);
        assert!(answer.sources[0].starts_with("Returns are accepted"));

        let requests = llm.requests.lock().expect("lock");
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].temperature, 0.0);
        assert!(requests[0].messages[0].content.contains("Returns are accepted within 30 days."));
        assert!(!requests[0].messages[0].content.contains("Orders ship"));
    }

    #[tokio::test]
    async fn history_condenses_the_follow_up_before_retrieval() {
        let llm = Arc::new(ScriptedLlm::default());
        let engine =
            RagAnswerEngine::new(seeded_store().await, Arc::new(KeywordEmbedder), llm.clone(), 1);
        let history = vec![ChatTurn {
            question: "Can I send items back?".to_string(),
            answer: "Yes, see our policy.".to_string(),
        }];

        let answer = engine.answer("How long do I have?", &history).await.expect("answer");

        assert!(answer.sources[0].starts_with("Returns"));
        let requests = llm.requests.lock().expect("lock");
        assert_eq!(requests.len(), 2);
        assert!(requests[0].messages[1].content.contains("Can I send items back?"));
        assert_eq!(requests[1].messages[1].content, "How do returns work?");
    }

    #[tokio::test]
    async fn empty_index_still_answers_with_no_sources() {
        let llm = Arc::new(ScriptedLlm::default());
        let engine = RagAnswerEngine::new(
            Arc::new(InMemoryChunkStore::default()),
            Arc::new(KeywordEmbedder),
            llm.clone(),
            3,
        );

        let answer = engine.answer("What is the return policy?", &[]).await.expect("answer");

        assert!(answer.sources.is_empty());
        assert_eq!(answer.answer, "Returns are accepted within 30 days.");
        assert_eq!(llm.requests.lock().expect("lock").len(), 1);
    }

    #[tokio::test]
    async fn empty_question_is_rejected_without_calls() {
        let llm = Arc::new(ScriptedLlm::default());
        let engine =
            RagAnswerEngine::new(seeded_store().await, Arc::new(KeywordEmbedder), llm.clone(), 3);

        let error = engine.answer("   ", &[]).await.expect_err("empty question");
        assert!(matches!(error, ToolError::InvalidArgument(_)));
        assert!(llm.requests.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn missing_index_is_a_configuration_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let index = IndexConfig { path: dir.path().join("absent.db"), top_k: 3 };

        let result = RagAnswerEngine::open(
            &index,
            Arc::new(KeywordEmbedder),
            Arc::new(ScriptedLlm::default()),
        )
        .await;

        assert!(matches!(result, Err(ToolError::Configuration(_))));
        assert!(!PathBuf::from(&index.path).exists());
    }
}
