use std::process::ExitCode;

fn main() -> ExitCode {
    productai_cli::run()
}
