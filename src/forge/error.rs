//! Error types exposed by the forge layer.

use thiserror::Error;

use super::rate_limit::RateLimitInfo;

/// Fixed message shown whenever talking to the forge failed.
///
/// Forge failures are usually not fixed by re-running the scan, so the
/// wording steers the reader towards a person rather than a retry.
pub const FORGE_COMMUNICATION_FAILURE: &str =
    "GitHub API communication error. Please contact a human.";

/// Errors surfaced while configuring the bot or communicating with the forge.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ForgeError {
    /// The authentication token was missing.
    #[error("personal access token is required")]
    MissingToken,

    /// Repository owner or name were missing or empty.
    #[error("repository owner and name are required")]
    InvalidRepository,

    /// A URL or API path could not be parsed.
    #[error("URL is invalid: {0}")]
    InvalidUrl(String),

    /// The authentication token was rejected by the forge.
    #[error("GitHub rejected the token: {message}")]
    Authentication {
        /// Error message returned with the 401/403 response.
        message: String,
    },

    /// The forge returned a non-success status that is not an
    /// authentication failure.
    #[error("GitHub API error ({status}): {message}")]
    Api {
        /// HTTP status code of the response.
        status: u16,
        /// Response message describing the failure.
        message: String,
    },

    /// Networking failed while calling the forge.
    #[error("network error talking to GitHub: {message}")]
    Network {
        /// Transport-level error detail.
        message: String,
    },

    /// A response body did not have the expected shape.
    #[error("unexpected GitHub response for {operation}: {message}")]
    Decode {
        /// Operation whose response failed to decode.
        operation: String,
        /// Decoder error detail.
        message: String,
    },

    /// Rate limit exceeded - the API returned 403/429 with a rate limit message.
    #[error("GitHub API rate limit exceeded: {message}")]
    RateLimitExceeded {
        /// Rate limit info if it could be fetched after the failure.
        rate_limit: Option<RateLimitInfo>,
        /// Error message from the forge.
        message: String,
    },

    /// The commit under scan does not exist in the repository.
    #[error("commit {commit_id} was not found in the repository")]
    CommitNotFound {
        /// Commit identifier supplied by the caller.
        commit_id: String,
    },

    /// No open pull request has the commit under scan as its head.
    #[error("commit {commit_id} is not the head of any open pull request")]
    CommitNotPartOfPullRequest {
        /// Commit identifier supplied by the caller.
        commit_id: String,
    },

    /// Configuration could not be loaded or is inconsistent.
    #[error("configuration error: {message}")]
    Configuration {
        /// Details about the configuration failure.
        message: String,
    },

    /// Local I/O operation failed.
    #[error("I/O error: {message}")]
    Io {
        /// Error detail from the underlying I/O operation.
        message: String,
    },
}

/// Exit status categories reported by the `vigil` binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCategory {
    /// The run completed and found nothing to report.
    Normal,
    /// An unexpected internal failure.
    Internal,
    /// The scanned commit is not the head of any open pull request.
    CommitNotPartOfPullRequest,
    /// The run completed and issues were reported.
    IssuesFound,
    /// Local system or filesystem problem.
    SystemProblem,
    /// Communication with the forge failed.
    ForgeProblem,
    /// The bot was invoked with invalid options.
    UsageError,
}

impl ExitCategory {
    /// Returns the process exit status for this category.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Normal => 0,
            Self::Internal => 220,
            Self::CommitNotPartOfPullRequest => 230,
            Self::IssuesFound => 250,
            Self::SystemProblem => 251,
            Self::ForgeProblem => 252,
            Self::UsageError => 253,
        }
    }
}

impl ForgeError {
    /// Classifies the error into an exit status category.
    #[must_use]
    pub const fn exit_category(&self) -> ExitCategory {
        match self {
            Self::MissingToken
            | Self::InvalidRepository
            | Self::InvalidUrl(_)
            | Self::Configuration { .. } => ExitCategory::UsageError,
            Self::Authentication { .. }
            | Self::Api { .. }
            | Self::Network { .. }
            | Self::Decode { .. }
            | Self::RateLimitExceeded { .. }
            | Self::CommitNotFound { .. } => ExitCategory::ForgeProblem,
            Self::CommitNotPartOfPullRequest { .. } => ExitCategory::CommitNotPartOfPullRequest,
            Self::Io { .. } => ExitCategory::SystemProblem,
        }
    }

    /// Returns true when the failure happened while talking to the forge.
    #[must_use]
    pub const fn is_forge_communication(&self) -> bool {
        matches!(self.exit_category(), ExitCategory::ForgeProblem)
            && !matches!(self, Self::CommitNotFound { .. })
    }

    /// Renders the message shown to a person reading the CI log.
    ///
    /// Forge communication failures are prefixed with
    /// [`FORGE_COMMUNICATION_FAILURE`] so they read differently from
    /// configuration mistakes or unexpected internal errors.
    #[must_use]
    pub fn user_facing_message(&self) -> String {
        if self.is_forge_communication() {
            format!("{FORGE_COMMUNICATION_FAILURE} ({self})")
        } else {
            self.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{ExitCategory, FORGE_COMMUNICATION_FAILURE, ForgeError};

    #[rstest]
    #[case::network(ForgeError::Network { message: "reset".to_owned() }, 252)]
    #[case::commit_missing(ForgeError::CommitNotFound { commit_id: "abc".to_owned() }, 252)]
    #[case::not_in_pr(ForgeError::CommitNotPartOfPullRequest { commit_id: "abc".to_owned() }, 230)]
    #[case::io(ForgeError::Io { message: "disk full".to_owned() }, 251)]
    #[case::usage(ForgeError::MissingToken, 253)]
    fn exit_codes_follow_error_category(#[case] error: ForgeError, #[case] expected: u8) {
        assert_eq!(error.exit_category().code(), expected);
    }

    #[test]
    fn forge_failures_ask_for_a_human() {
        let error = ForgeError::Api {
            status: 502,
            message: "bad gateway".to_owned(),
        };

        let message = error.user_facing_message();
        assert!(
            message.starts_with(FORGE_COMMUNICATION_FAILURE),
            "unexpected message: {message}"
        );
        assert!(message.contains("bad gateway"));
    }

    #[test]
    fn missing_commit_is_not_reported_as_communication_failure() {
        let error = ForgeError::CommitNotFound {
            commit_id: "deadbeef".to_owned(),
        };

        assert_eq!(error.exit_category(), ExitCategory::ForgeProblem);
        assert_eq!(
            error.user_facing_message(),
            "commit deadbeef was not found in the repository"
        );
    }
}
