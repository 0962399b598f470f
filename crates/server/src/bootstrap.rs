use std::sync::Arc;

use productai_agent::{AgentRuntime, RuntimeInitError};
use productai_core::config::{AppConfig, ConfigError};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub runtime: Arc<AgentRuntime>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("agent runtime initialization failed: {0}")]
    Runtime(#[from] RuntimeInitError),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        index_path = %config.index.path.display(),
        "starting application bootstrap"
    );

    let runtime = AgentRuntime::from_config(&config).await?;
    info!(
        event_name = "system.bootstrap.runtime_ready",
        correlation_id = "bootstrap",
        tools = ?runtime.tools().names(),
        "agent runtime initialized"
    );

    Ok(Application { config, runtime: Arc::new(runtime) })
}

#[cfg(test)]
mod tests {
    use productai_core::config::{AppConfig, ConfigOverrides, LoadOptions};
    use productai_db::{open_index, OpenMode};

    use crate::bootstrap::{bootstrap_with_config, Application, BootstrapError};

    async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
        let config = AppConfig::load(options)?;
        bootstrap_with_config(config).await
    }

    fn options(index_path: std::path::PathBuf, config_dir: &std::path::Path) -> LoadOptions {
        LoadOptions {
            config_path: Some(config_dir.join("absent.toml")),
            require_file: false,
            overrides: ConfigOverrides {
                llm_api_key: Some("sk-test".to_string()),
                index_path: Some(index_path),
                ..ConfigOverrides::default()
            },
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_without_an_index() {
        let dir = tempfile::tempdir().expect("tempdir");

        let result = bootstrap(options(dir.path().join("faq_index.db"), dir.path())).await;

        let error = result.err().expect("missing index must fail");
        assert!(matches!(error, BootstrapError::Runtime(_)));
        assert!(error.to_string().contains("productai ingest"));
    }

    #[tokio::test]
    async fn bootstrap_succeeds_with_an_ingested_index() {
        let dir = tempfile::tempdir().expect("tempdir");
        let index_path = dir.path().join("faq_index.db");
        let pool = open_index(&index_path, OpenMode::CreateIfMissing).await.expect("create index");
        pool.close().await;

        let app = bootstrap(options(index_path, dir.path())).await.expect("bootstrap");

        assert_eq!(app.runtime.tools().names(), vec!["faq", "reviews"]);
    }
}
