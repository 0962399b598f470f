pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "productai",
    about = "ProductAI operator CLI",
    long_about = "Build the FAQ index, inspect configuration and check service readiness.",
    after_help = "Examples:\n  productai ingest docs/faq.md docs/returns.pdf\n  productai config\n  productai doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Split, embed and store documents (.txt, .md, .pdf) in the FAQ index")]
    Ingest {
        #[arg(required = true, num_args = 1.., help = "Documents to ingest")]
        paths: Vec<PathBuf>,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, LLM credentials and FAQ index readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Ingest { paths } => commands::ingest::run(&paths),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command};

    #[test]
    fn ingest_requires_at_least_one_path() {
        assert!(Cli::try_parse_from(["productai", "ingest"]).is_err());

        let cli = Cli::try_parse_from(["productai", "ingest", "faq.md", "returns.pdf"])
            .expect("parse ingest");
        assert!(matches!(cli.command, Command::Ingest { ref paths } if paths.len() == 2));
    }

    #[test]
    fn doctor_accepts_json_flag() {
        let cli = Cli::try_parse_from(["productai", "doctor", "--json"]).expect("parse doctor");
        assert!(matches!(cli.command, Command::Doctor { json: true }));
    }
}
