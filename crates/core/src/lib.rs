pub mod config;
pub mod domain;
pub mod errors;
pub mod splitter;

pub use domain::document::{ChatTurn, ContentHash, EmbeddedChunk, ScoredChunk, SourceDocument};
pub use domain::response::{
    FallbackMessage, FaqAnswer, ResponseSource, ReviewAnalysis, ToolPayload, ToolResponse,
    FALLBACK_MESSAGE,
};
pub use domain::routing::{DecisionParseError, Intent, RoutingDecision, ToolChoice};
pub use errors::{ApplicationError, InterfaceError};
pub use splitter::{SplitterError, TextSplitter};
