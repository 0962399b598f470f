//! Agent runtime: intent classification and tool orchestration
//!
//! This crate turns a free-text customer message into one of three answers:
//! - an FAQ answer grounded in the ingested document index (`answer`)
//! - a product review analysis (`reviews`)
//! - a fixed fallback message for anything else
//!
//! # Flow
//!
//! 1. **Classification** (`classifier`) - the LLM returns a JSON routing decision
//! 2. **Strict parsing** (`router`) - malformed or out-of-schema output becomes the fallback decision
//! 3. **Dispatch** (`router`, `tools`) - the chosen tool runs and its output is wrapped in an envelope
//!
//! Index construction lives in `ingest`. `AgentRuntime` wires the production
//! collaborators together from `AppConfig`.
//!
//! The LLM only picks a route and writes prose. Which tool runs, and what
//! happens when its output is invalid, is decided here.

pub mod answer;
pub mod classifier;
pub mod ingest;
pub mod llm;
pub mod reviews;
pub mod router;
pub mod runtime;
pub mod tools;

pub use answer::{AnswerEngine, RagAnswerEngine};
pub use classifier::{IntentClassifier, LlmIntentClassifier};
pub use ingest::{IngestError, IngestReport, Ingestor};
pub use llm::{ChatMessage, CompletionRequest, Embedder, LlmClient, LlmError, OpenAiClient};
pub use reviews::{LlmReviewAnalyzer, ReviewAnalyzer};
pub use router::{RequestRouter, RouteError};
pub use runtime::{AgentRuntime, RuntimeInitError};
pub use tools::{Tool, ToolError, ToolRegistry};
