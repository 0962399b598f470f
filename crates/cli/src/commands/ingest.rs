use std::path::PathBuf;
use std::sync::Arc;

use productai_agent::{Embedder, Ingestor, OpenAiClient};
use productai_core::config::{AppConfig, LoadOptions};
use productai_core::TextSplitter;
use productai_db::{open_index, OpenMode, SqlChunkStore};
use tracing::Level;

use crate::commands::CommandResult;

pub fn run(paths: &[PathBuf]) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "ingest",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    // Progress events go to stderr so stdout stays a single JSON outcome.
    let level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let _ = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();

    let client = match OpenAiClient::from_config(&config.llm) {
        Ok(client) => client,
        Err(error) => {
            return CommandResult::failure("ingest", "llm_client", error.to_string(), 3);
        }
    };

    run_with(&config, Arc::new(client), paths)
}

pub fn run_with(config: &AppConfig, embedder: Arc<dyn Embedder>, paths: &[PathBuf]) -> CommandResult {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "ingest",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = open_index(&config.index.path, OpenMode::CreateIfMissing)
            .await
            .map_err(|error| ("index_open", error.to_string(), 4u8))?;

        let ingestor =
            Ingestor::new(Arc::new(SqlChunkStore::new(pool.clone())), embedder, TextSplitter::default());
        let report = ingestor
            .ingest_paths(paths)
            .await
            .map_err(|error| ("ingest", error.to_string(), 5u8))?;

        pool.close().await;
        Ok::<_, (&'static str, String, u8)>(report)
    });

    match result {
        Ok(report) => CommandResult::success(
            "ingest",
            format!(
                "ingested {} document(s) into `{}`: {} chunk(s) stored, {} already indexed",
                report.documents,
                config.index.path.display(),
                report.chunks_inserted,
                report.chunks_skipped
            ),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("ingest", error_class, message, exit_code)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use productai_agent::{Embedder, LlmError};
    use productai_core::config::AppConfig;
    use serde_json::Value;

    use super::run_with;

    struct UnitEmbedder;

    #[async_trait]
    impl Embedder for UnitEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    fn config_in(dir: &std::path::Path) -> AppConfig {
        let mut config = AppConfig::default();
        config.index.path = dir.join("faq_index.db");
        config
    }

    #[test]
    fn ingest_creates_the_index_and_reports_counts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let faq = dir.path().join("faq.md");
        std::fs::write(&faq, "Returns are accepted within 30 days.").expect("write faq");
        let config = config_in(dir.path());

        let first = run_with(&config, Arc::new(UnitEmbedder), std::slice::from_ref(&faq));
        let second = run_with(&config, Arc::new(UnitEmbedder), &[faq]);

        assert_eq!(first.exit_code, 0);
        assert!(config.index.path.exists());
        let first: Value = serde_json::from_str(&first.output).expect("json");
        assert!(first["message"].as_str().expect("message").contains("1 chunk(s) stored"));
        let second: Value = serde_json::from_str(&second.output).expect("json");
        assert!(second["message"].as_str().expect("message").contains("1 already indexed"));
    }

    #[test]
    fn empty_document_fails_with_ingest_error_class() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blank = dir.path().join("blank.txt");
        std::fs::write(&blank, "\n\n").expect("write blank");
        let config = config_in(dir.path());

        let result = run_with(&config, Arc::new(UnitEmbedder), &[blank]);

        assert_eq!(result.exit_code, 5);
        let payload: Value = serde_json::from_str(&result.output).expect("json");
        assert!(payload["message"].as_str().expect("message").contains("contains no text"));
    }

    #[test]
    fn unreadable_document_fails_with_ingest_error_class() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = config_in(dir.path());

        let result = run_with(&config, Arc::new(UnitEmbedder), &[dir.path().join("missing.txt")]);

        assert_eq!(result.exit_code, 5);
        let payload: Value = serde_json::from_str(&result.output).expect("json");
        assert_eq!(payload["error_class"], "ingest");
    }
}
