//! Run configuration loaded from CLI, environment, and files.
//!
//! [`VigilConfig`] merges its sources with ortho-config's layered approach.
//!
//! # Precedence
//!
//! Configuration values are loaded with the following precedence (lowest to
//! highest):
//!
//! 1. **Defaults** – Built-in defaults
//! 2. **Configuration file** – `.vigil.toml` in the current directory, home
//!    directory, or XDG config directory
//! 3. **Environment variables** – `VIGIL_*`, with `GITHUB_TOKEN` as a
//!    fallback for the token
//! 4. **Command-line arguments** – `--token`, `--owner`, `--commit`, …
//!
//! # Configuration File
//!
//! ```toml
//! owner = "octocat"
//! repo = "hello-world"
//! commit = "4f1c2e9"
//! scan_report = "vigil-report.json"
//! branches_ignore = "release,hotfix"
//! review_comments_total_max = 70
//! dismiss_stale_reviews = true
//! issues_label = "vigil: issues found"
//! status_context = "ci/vigil"
//! ```

use std::env;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

use crate::forge::error::ForgeError;
use crate::forge::filter::LoginSelector;
use crate::forge::messages::DEFAULT_APPROVAL_MESSAGE;
use crate::forge::pacing::{PacingPolicy, RetryPolicy};
use crate::forge::reconcile::ReconcileSettings;

const DEFAULT_REVIEW_COMMENTS_TOTAL_MAX: u64 = 70;
const DEFAULT_DISCOVERY_ATTEMPTS: u32 = 2;
const DEFAULT_DISCOVERY_RETRY_DELAY_SECONDS: u64 = 10;
const DEFAULT_PAGE_DELAY_MILLISECONDS: u64 = 2_000;

/// Settings for one scan run.
///
/// # Environment Variables
///
/// - `VIGIL_TOKEN`, `GITHUB_TOKEN`, or `--token`: Authentication token
/// - `VIGIL_OWNER` or `--owner`: Repository owner
/// - `VIGIL_REPO` or `--repo`: Repository name
/// - `VIGIL_COMMIT` or `--commit`: Commit that was scanned
/// - `VIGIL_SCAN_REPORT` or `--scan-report`: Path of the scan report
///
/// # Example
///
/// ```no_run
/// use ortho_config::OrthoConfig;
/// use vigil::VigilConfig;
///
/// let config = VigilConfig::load().expect("failed to load configuration");
/// let token = config.resolve_token().expect("token required");
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, OrthoConfig)]
#[serde(default)]
#[ortho_config(
    prefix = "VIGIL",
    discovery(
        dotfile_name = ".vigil.toml",
        config_file_name = "vigil.toml",
        app_name = "vigil"
    )
)]
pub struct VigilConfig {
    /// Personal access token for the forge API.
    #[ortho_config(cli_short = 't')]
    pub token: Option<String>,

    /// Repository owner.
    #[ortho_config(cli_short = 'o')]
    pub owner: Option<String>,

    /// Repository name.
    #[ortho_config(cli_short = 'r')]
    pub repo: Option<String>,

    /// Commit the scan ran against.
    #[ortho_config(cli_short = 'c')]
    pub commit: Option<String>,

    /// API base URL, for GitHub Enterprise installations.
    #[ortho_config()]
    pub api_base: Option<String>,

    /// Path of the scan report produced by the linters.
    #[ortho_config(cli_short = 's')]
    pub scan_report: Option<String>,

    /// Comma-separated head branches whose pull requests are ignored.
    #[ortho_config()]
    pub branches_ignore: Option<String>,

    /// Leaves draft pull requests alone.
    #[ortho_config()]
    pub skip_draft_prs: bool,

    /// Maximum number of active bot comments per pull request; `0` disables
    /// the limit.
    #[ortho_config()]
    pub review_comments_total_max: u64,

    /// Dismisses bot reviews whose comments have all become obsolete.
    #[ortho_config()]
    pub dismiss_stale_reviews: bool,

    /// Approves pull requests without issues.
    #[ortho_config()]
    pub autoapprove: bool,

    /// Body of the approval review.
    #[ortho_config()]
    pub autoapprove_message: Option<String>,

    /// Label kept on pull requests with issues and removed otherwise.
    #[ortho_config()]
    pub issues_label: Option<String>,

    /// Context of the commit status; no status is set when absent.
    #[ortho_config()]
    pub status_context: Option<String>,

    /// Link attached to the commit status.
    #[ortho_config()]
    pub status_target_url: Option<String>,

    /// Pull request discovery attempts, including the first.
    #[ortho_config()]
    pub discovery_attempts: u32,

    /// Wait between discovery attempts, in seconds.
    #[ortho_config()]
    pub discovery_retry_delay_seconds: u64,

    /// Wait between pages of the open pull request listing, in milliseconds.
    #[ortho_config()]
    pub page_delay_milliseconds: u64,
}

impl Default for VigilConfig {
    fn default() -> Self {
        Self {
            token: None,
            owner: None,
            repo: None,
            commit: None,
            api_base: None,
            scan_report: None,
            branches_ignore: None,
            skip_draft_prs: false,
            review_comments_total_max: DEFAULT_REVIEW_COMMENTS_TOTAL_MAX,
            dismiss_stale_reviews: false,
            autoapprove: false,
            autoapprove_message: None,
            issues_label: None,
            status_context: None,
            status_target_url: None,
            discovery_attempts: DEFAULT_DISCOVERY_ATTEMPTS,
            discovery_retry_delay_seconds: DEFAULT_DISCOVERY_RETRY_DELAY_SECONDS,
            page_delay_milliseconds: DEFAULT_PAGE_DELAY_MILLISECONDS,
        }
    }
}

fn required<'a>(value: Option<&'a str>, what: &str, flag: &str) -> Result<&'a str, ForgeError> {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .ok_or_else(|| ForgeError::Configuration {
            message: format!("{what} is required (use {flag})"),
        })
}

impl VigilConfig {
    /// Resolves the token from configuration or the `GITHUB_TOKEN`
    /// environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`ForgeError::MissingToken`] when no source provides a value.
    pub fn resolve_token(&self) -> Result<String, ForgeError> {
        self.token
            .clone()
            .or_else(|| env::var("GITHUB_TOKEN").ok())
            .filter(|token| !token.trim().is_empty())
            .ok_or(ForgeError::MissingToken)
    }

    /// Returns owner and repository name.
    ///
    /// # Errors
    ///
    /// Returns [`ForgeError::Configuration`] when either is missing.
    pub fn require_repository(&self) -> Result<(&str, &str), ForgeError> {
        let owner = required(self.owner.as_deref(), "repository owner", "--owner or -o")?;
        let repo = required(self.repo.as_deref(), "repository name", "--repo or -r")?;
        Ok((owner, repo))
    }

    /// Returns the scanned commit.
    ///
    /// # Errors
    ///
    /// Returns [`ForgeError::Configuration`] when no commit is configured.
    pub fn require_commit(&self) -> Result<&str, ForgeError> {
        required(self.commit.as_deref(), "commit", "--commit or -c")
    }

    /// Returns the scan report path.
    ///
    /// # Errors
    ///
    /// Returns [`ForgeError::Configuration`] when no path is configured.
    pub fn require_scan_report(&self) -> Result<&str, ForgeError> {
        required(self.scan_report.as_deref(), "scan report path", "--scan-report or -s")
    }

    /// Ignored branch names, trimmed and without empty entries.
    #[must_use]
    pub fn branches_ignore(&self) -> Vec<String> {
        self.branches_ignore
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|branch| !branch.is_empty())
            .map(ToOwned::to_owned)
            .collect()
    }

    /// Approval message, falling back to the built-in one.
    #[must_use]
    pub fn approval_message(&self) -> &str {
        self.autoapprove_message
            .as_deref()
            .filter(|message| !message.trim().is_empty())
            .unwrap_or(DEFAULT_APPROVAL_MESSAGE)
    }

    /// Retry policy for pull request discovery.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.discovery_attempts,
            Duration::from_secs(self.discovery_retry_delay_seconds),
        )
    }

    /// Pacing between listing pages.
    #[must_use]
    pub const fn pacing_policy(&self) -> PacingPolicy {
        PacingPolicy::new(Duration::from_millis(self.page_delay_milliseconds))
    }

    /// Reconciliation settings, posting as the token holder.
    #[must_use]
    pub fn reconcile_settings(&self) -> ReconcileSettings {
        ReconcileSettings {
            bot: LoginSelector::CurrentTokenHolder,
            review_comments_total_max: usize::try_from(self.review_comments_total_max)
                .unwrap_or(usize::MAX),
        }
    }
}
