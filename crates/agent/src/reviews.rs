use std::sync::Arc;

use async_trait::async_trait;
use productai_core::ReviewAnalysis;

use crate::llm::{ChatMessage, CompletionRequest, LlmClient};
use crate::tools::ToolError;

pub const DEFAULT_REVIEW_LIMIT: usize = 5;
const ANALYST_SYSTEM_PROMPT: &str = "You are a professional product analyst.";
const ANALYSIS_TEMPERATURE: f32 = 0.6;

#[async_trait]
pub trait ReviewAnalyzer: Send + Sync {
    /// Summarizes customer opinion on a product. At most `limit` reviews are
    /// shown to the model, in the order given.
    async fn analyze(
        &self,
        product_name: &str,
        reviews: &[String],
        limit: usize,
    ) -> Result<ReviewAnalysis, ToolError>;
}

pub struct LlmReviewAnalyzer {
    llm: Arc<dyn LlmClient>,
}

impl LlmReviewAnalyzer {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl ReviewAnalyzer for LlmReviewAnalyzer {
    async fn analyze(
        &self,
        product_name: &str,
        reviews: &[String],
        limit: usize,
    ) -> Result<ReviewAnalysis, ToolError> {
        if product_name.trim().is_empty() {
            return Err(ToolError::InvalidArgument("Product name is required.".to_string()));
        }

        let request = CompletionRequest {
            messages: vec![
                ChatMessage::system(ANALYST_SYSTEM_PROMPT),
                ChatMessage::user(review_prompt(product_name, reviews, limit)),
            ],
            temperature: ANALYSIS_TEMPERATURE,
        };
        let analysis = self.llm.complete(request).await?;

        Ok(ReviewAnalysis { product: product_name.to_string(), analysis: analysis.trim().to_string() })
    }
}

fn review_prompt(product_name: &str, reviews: &[String], limit: usize) -> String {
    let mut prompt = format!(
        "You are an expert product review analyst.\n\
         Analyze customer opinion about \"{product_name}\" and reply with these sections:\n\
         1. Summary: a short overview of overall customer sentiment.\n\
         2. Pros: what customers like.\n\
         3. Cons: what customers complain about.\n\
         4. Sentiment: Positive, Negative or Mixed.\n"
    );

    let shown: Vec<&String> = reviews.iter().take(limit).collect();
    if !shown.is_empty() {
        prompt.push_str("\nHere are the reviews:\n");
        for review in shown {
            prompt.push_str("- ");
            prompt.push_str(review);
            prompt.push('\n');
        }
    }
    prompt
}
