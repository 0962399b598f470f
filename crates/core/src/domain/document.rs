use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl ContentHash {
    pub fn of(content: &str) -> Self {
        Self(blake3::hash(content.as_bytes()).to_hex().to_string())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub source_path: String,
    pub content_hash: ContentHash,
    pub ingested_at: DateTime<Utc>,
}

impl SourceDocument {
    pub fn new(source_path: impl Into<String>, content: &str) -> Self {
        Self {
            source_path: source_path.into(),
            content_hash: ContentHash::of(content),
            ingested_at: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedChunk {
    pub ordinal: u32,
    pub content: String,
    pub content_hash: ContentHash,
    pub embedding: Vec<f32>,
}

impl EmbeddedChunk {
    pub fn new(ordinal: u32, content: impl Into<String>, embedding: Vec<f32>) -> Self {
        let content = content.into();
        let content_hash = ContentHash::of(&content);
        Self { ordinal, content, content_hash, embedding }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub source_path: String,
    pub content: String,
    pub score: f32,
}

/// One prior exchange in a conversation, oldest first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub question: String,
    pub answer: String,
}
