//! Run summary output.

use std::io::{self, Write};

use vigil::{ForgeError, ScanSummary};

/// Writes a one-paragraph summary of the run to stdout.
///
/// # Errors
///
/// Returns [`ForgeError::Io`] when stdout cannot be written.
pub fn write_scan_summary(summary: &ScanSummary) -> Result<(), ForgeError> {
    let pull_requests = summary
        .pull_requests
        .iter()
        .map(|number| format!("#{number}"))
        .collect::<Vec<_>>()
        .join(", ");
    let message = format!(
        "Scanned pull requests: {pull_requests}\n\
         Comments posted: {}, already present: {}, held back: {}, outside diff: {}\n\
         Reviews dismissed: {}, pull requests approved: {}",
        summary.posted,
        summary.already_active,
        summary.suppressed,
        summary.outside_diff,
        summary.dismissed_reviews.len(),
        summary.approved.len()
    );

    writeln!(io::stdout().lock(), "{message}").map_err(|error| ForgeError::Io {
        message: error.to_string(),
    })
}
