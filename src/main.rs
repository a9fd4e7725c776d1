//! Vigil CLI entrypoint for one scan run.

mod cli;

use std::io::{self, Write};
use std::process::ExitCode;

use tracing::error;
use vigil::{ExitCategory, ForgeError};

#[tokio::main]
async fn main() -> ExitCode {
    cli::logging::init();

    match cli::scan::run().await {
        Ok(summary) => {
            let category = summary.exit_category();
            if cli::output::write_scan_summary(&summary).is_err() {
                return ExitCode::from(ExitCategory::SystemProblem.code());
            }
            ExitCode::from(category.code())
        }
        Err(failure) => report_failure(&failure),
    }
}

fn report_failure(failure: &ForgeError) -> ExitCode {
    let category = failure.exit_category();
    error!(
        error = %failure,
        exit_code = category.code(),
        "scan run failed"
    );
    if writeln!(io::stderr().lock(), "{}", failure.user_facing_message()).is_err() {
        return ExitCode::from(ExitCategory::SystemProblem.code());
    }
    ExitCode::from(category.code())
}
