use productai_core::config::{AppConfig, LlmProvider, LoadOptions};
use productai_db::{open_index, ChunkStore, OpenMode, SqlChunkStore};
use serde::Serialize;

use crate::commands::{escape_json, CommandResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let checks = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => checks_for(&config),
        Err(error) => vec![
            DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            },
            skipped("llm_credentials"),
            skipped("index_readiness"),
        ],
    };
    let report = build_report(checks);
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn skipped(name: &'static str) -> DoctorCheck {
    DoctorCheck {
        name,
        status: CheckStatus::Skipped,
        details: "skipped because configuration did not load".to_string(),
    }
}

fn checks_for(config: &AppConfig) -> Vec<DoctorCheck> {
    vec![
        DoctorCheck {
            name: "config_validation",
            status: CheckStatus::Pass,
            details: "configuration loaded and validated".to_string(),
        },
        check_llm_credentials(config),
        check_index_readiness(config),
    ]
}

fn build_report(checks: Vec<DoctorCheck>) -> DoctorReport {
    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_llm_credentials(config: &AppConfig) -> DoctorCheck {
    let (status, details) = match (config.llm.provider, config.llm.api_key.is_some()) {
        (_, true) => (CheckStatus::Pass, format!("api key present for model `{}`", config.llm.model)),
        (LlmProvider::Ollama, false) => {
            (CheckStatus::Pass, format!("no api key needed for `{}`", config.llm.base_url))
        }
        (LlmProvider::OpenAi, false) => (
            CheckStatus::Fail,
            "no api key configured; set PRODUCTAI_LLM_API_KEY or OPENAI_API_KEY".to_string(),
        ),
    };
    DoctorCheck { name: "llm_credentials", status, details }
}

fn check_index_readiness(config: &AppConfig) -> DoctorCheck {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: "index_readiness",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    let result = runtime.block_on(async {
        let pool = open_index(&config.index.path, OpenMode::Existing)
            .await
            .map_err(|error| error.to_string())?;
        let count = SqlChunkStore::new(pool.clone())
            .count_chunks()
            .await
            .map_err(|error| format!("failed to count indexed chunks: {error}"));
        pool.close().await;
        count
    });

    match result {
        Ok(0) => DoctorCheck {
            name: "index_readiness",
            status: CheckStatus::Fail,
            details: format!(
                "index `{}` has no chunks; run `productai ingest` first",
                config.index.path.display()
            ),
        },
        Ok(count) => DoctorCheck {
            name: "index_readiness",
            status: CheckStatus::Pass,
            details: format!("{count} chunk(s) indexed in `{}`", config.index.path.display()),
        },
        Err(error) => {
            DoctorCheck { name: "index_readiness", status: CheckStatus::Fail, details: error }
        }
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}
