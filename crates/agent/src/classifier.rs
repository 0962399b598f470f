use std::sync::Arc;

use async_trait::async_trait;

use crate::llm::{ChatMessage, CompletionRequest, LlmClient, LlmError};

pub const ROUTER_SYSTEM_PROMPT: &str = r#"You are "ProductAI Assistant", the conversation manager for an e-commerce platform.
Decide which category the user's message belongs to:
1. FAQ questions about orders, shipping, returns, refunds, payments or accounts.
2. Review questions asking for opinions, ratings or customer feedback about a product.
3. Anything else, which is handled by the fallback.

Reply with JSON only, using exactly this structure:
{"intent": "<faq | reviews | fallback>", "tool_to_use": "<faq | reviews | none>", "reason": "<short reason>", "next_action": "<instruction>"}
Do not add any other text."#;

/// Produces the raw routing decision text for a user message. Parsing and
/// fallback handling belong to the router so every classifier gets the same
/// strict schema.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, message: &str) -> Result<String, LlmError>;
}

pub struct LlmIntentClassifier {
    llm: Arc<dyn LlmClient>,
}

impl LlmIntentClassifier {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl IntentClassifier for LlmIntentClassifier {
    async fn classify(&self, message: &str) -> Result<String, LlmError> {
        let request = CompletionRequest {
            messages: vec![ChatMessage::system(ROUTER_SYSTEM_PROMPT), ChatMessage::user(message)],
            temperature: 0.0,
        };
        let raw = self.llm.complete(request).await?;
        Ok(raw.trim().to_string())
    }
}
