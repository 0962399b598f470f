use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use productai_core::config::{AppConfig, LoadOptions, DEFAULT_CONFIG_FILE};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    render(&config, config_file_doc.as_ref(), config_file_path.as_deref())
}

fn render(config: &AppConfig, file_doc: Option<&Value>, file_path: Option<&Path>) -> String {
    let line = |key: &str, value: &str, env_keys: &[&str]| {
        render_line(key, value, field_source(key, env_keys, file_doc, file_path))
    };

    let llm_api_key = if config.llm.api_key.is_some() { "<redacted>" } else { "<unset>" };

    let lines = vec![
        "effective config (source precedence: overrides > env > file > default):".to_string(),
        line("llm.provider", &format!("{:?}", config.llm.provider), &["PRODUCTAI_LLM_PROVIDER"]),
        line("llm.api_key", llm_api_key, &["PRODUCTAI_LLM_API_KEY", "OPENAI_API_KEY"]),
        line("llm.base_url", &config.llm.base_url, &["PRODUCTAI_LLM_BASE_URL"]),
        line("llm.model", &config.llm.model, &["PRODUCTAI_LLM_MODEL", "OPENAI_MODEL"]),
        line(
            "llm.embedding_model",
            &config.llm.embedding_model,
            &["PRODUCTAI_LLM_EMBEDDING_MODEL"],
        ),
        line(
            "llm.timeout_secs",
            &config.llm.timeout_secs.to_string(),
            &["PRODUCTAI_LLM_TIMEOUT_SECS"],
        ),
        line(
            "llm.max_retries",
            &config.llm.max_retries.to_string(),
            &["PRODUCTAI_LLM_MAX_RETRIES"],
        ),
        line(
            "index.path",
            &config.index.path.display().to_string(),
            &["PRODUCTAI_INDEX_PATH", "FAQ_INDEX_PATH"],
        ),
        line("index.top_k", &config.index.top_k.to_string(), &["PRODUCTAI_INDEX_TOP_K"]),
        line(
            "server.bind_address",
            &config.server.bind_address,
            &["PRODUCTAI_SERVER_BIND_ADDRESS"],
        ),
        line("server.port", &config.server.port.to_string(), &["PRODUCTAI_SERVER_PORT"]),
        line(
            "server.graceful_shutdown_secs",
            &config.server.graceful_shutdown_secs.to_string(),
            &["PRODUCTAI_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        line(
            "logging.level",
            &config.logging.level,
            &["PRODUCTAI_LOGGING_LEVEL", "PRODUCTAI_LOG_LEVEL"],
        ),
        line(
            "logging.format",
            &format!("{:?}", config.logging.format),
            &["PRODUCTAI_LOGGING_FORMAT", "PRODUCTAI_LOG_FORMAT"],
        ),
    ];

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from("config").join(DEFAULT_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use productai_core::config::AppConfig;
    use secrecy::SecretString;
    use toml::Value;

    use super::{contains_path, render};

    #[test]
    fn api_key_is_never_printed() {
        let mut config = AppConfig::default();
        config.llm.api_key = Some(SecretString::from("sk-live-123456".to_string()));

        let output = render(&config, None, None);

        assert!(output.contains("- llm.api_key = <redacted>"));
        assert!(!output.contains("sk-live-123456"));
    }

    #[test]
    fn file_values_are_attributed_to_the_file() {
        let doc: Value = "[index]\ntop_k = 5\n".parse().expect("toml");

        let mut config = AppConfig::default();
        config.index.top_k = 5;

        let output = render(&config, Some(&doc), Some(Path::new("productai.toml")));

        assert!(output.contains("- index.top_k = 5 (source: file (productai.toml))"));
        assert!(output.contains("- server.port = 8001 (source: "));
    }

    #[test]
    fn nested_keys_are_resolved_by_path() {
        let doc: Value = "[server]\nport = 9000\n".parse().expect("toml");

        assert!(contains_path(&doc, "server.port"));
        assert!(!contains_path(&doc, "server.bind_address"));
        assert!(!contains_path(&doc, "index.path"));
    }
}
