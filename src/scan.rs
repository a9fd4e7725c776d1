//! One scan run: from a commit and its scan report to forge updates.

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::config::VigilConfig;
use crate::forge::cache::ResponseCache;
use crate::forge::client::ForgeClient;
use crate::forge::error::{ExitCategory, ForgeError};
use crate::forge::issues::{ScanReport, dedupe_issues};
use crate::forge::messages::REVIEW_COMMENTS_CEILING_MARKER;
use crate::forge::models::CommitState;
use crate::forge::mutations::CommitStatus;
use crate::forge::pacing::RetryPolicy;
use crate::forge::reconcile::{ReconcileSettings, Reconciler};
use crate::forge::transport::ForgeTransport;
use crate::telemetry::{TelemetryEvent, TelemetrySink};

/// Commit status settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusOptions {
    /// Status context.
    pub context: String,
    /// Link attached to the status.
    pub target_url: Option<String>,
}

/// What a scan run does besides posting inline comments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Commit that was scanned.
    pub commit_id: String,
    /// Head branches whose pull requests are ignored.
    pub branches_ignore: Vec<String>,
    /// Leaves draft pull requests alone.
    pub skip_drafts: bool,
    /// Dismisses stale bot reviews.
    pub dismiss_stale_reviews: bool,
    /// Approval message for pull requests without issues; no approval when
    /// absent.
    pub approval_message: Option<String>,
    /// Label maintained according to whether issues were found.
    pub issues_label: Option<String>,
    /// Commit status to set; none when absent.
    pub status: Option<StatusOptions>,
    /// Pull request discovery retries.
    pub retry: RetryPolicy,
}

impl ScanOptions {
    /// Builds options from the run configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ForgeError::Configuration`] when no commit is configured.
    pub fn from_config(config: &VigilConfig) -> Result<Self, ForgeError> {
        Ok(Self {
            commit_id: config.require_commit()?.to_owned(),
            branches_ignore: config.branches_ignore(),
            skip_drafts: config.skip_draft_prs,
            dismiss_stale_reviews: config.dismiss_stale_reviews,
            approval_message: config
                .autoapprove
                .then(|| config.approval_message().to_owned()),
            issues_label: config.issues_label.clone(),
            status: config.status_context.clone().map(|context| StatusOptions {
                context,
                target_url: config.status_target_url.clone(),
            }),
            retry: config.retry_policy(),
        })
    }
}

/// Totals over every pull request touched by a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Pull requests reconciled.
    pub pull_requests: Vec<u64>,
    /// Comments posted.
    pub posted: usize,
    /// Issues already covered by active comments.
    pub already_active: usize,
    /// Issues held back by the ceiling.
    pub suppressed: usize,
    /// Issues outside the diff.
    pub outside_diff: usize,
    /// Reviews dismissed.
    pub dismissed_reviews: Vec<u64>,
    /// Pull requests approved.
    pub approved: Vec<u64>,
}

impl ScanSummary {
    /// Whether any issue inside the diff was reported.
    #[must_use]
    pub const fn issues_found(&self) -> bool {
        self.posted > 0 || self.already_active > 0 || self.suppressed > 0
    }

    /// Exit category for a completed run.
    #[must_use]
    pub const fn exit_category(&self) -> ExitCategory {
        if self.issues_found() {
            ExitCategory::IssuesFound
        } else {
            ExitCategory::Normal
        }
    }
}

async fn observe_rate_limit<T, C>(client: &ForgeClient<T, C>, telemetry: &dyn TelemetrySink)
where
    T: ForgeTransport,
    C: ResponseCache,
{
    match client.rate_limit_usage().await {
        Ok(info) => telemetry.record(TelemetryEvent::RateLimitObserved {
            limit: info.limit(),
            remaining: info.remaining(),
            reset_at: info.reset_at(),
        }),
        Err(error) => warn!(error = %error, "could not read rate limit usage"),
    }
}

/// Runs a full scan update for one commit.
///
/// # Errors
///
/// Returns [`ForgeError::CommitNotFound`] for an unknown commit,
/// [`ForgeError::CommitNotPartOfPullRequest`] when no open pull request has
/// the commit as its head, and propagates any other forge failure.
pub async fn run_scan<T, C>(
    client: &ForgeClient<T, C>,
    settings: ReconcileSettings,
    telemetry: &dyn TelemetrySink,
    report: ScanReport,
    options: &ScanOptions,
) -> Result<ScanSummary, ForgeError>
where
    T: ForgeTransport,
    C: ResponseCache,
{
    let commit_id = options.commit_id.as_str();
    observe_rate_limit(client, telemetry).await;
    client.commit_info(commit_id).await?;

    let prs = client
        .find_open_prs_for_commit_with_retries(
            commit_id,
            &options.branches_ignore,
            options.skip_drafts,
            &options.retry,
        )
        .await?;
    if prs.is_empty() {
        return Err(ForgeError::CommitNotPartOfPullRequest {
            commit_id: commit_id.to_owned(),
        });
    }

    let reconciler = Reconciler::new(client, settings, telemetry);
    reconciler
        .cleanup_bot_comments(
            commit_id,
            &[REVIEW_COMMENTS_CEILING_MARKER.to_owned()],
            &options.branches_ignore,
            options.skip_drafts,
        )
        .await?;

    let issues = dedupe_issues(report.issues);
    let mut summary = ScanSummary::default();
    let mut suppressed = BTreeMap::new();
    let mut with_issues = BTreeMap::new();
    for &pr_number in prs.keys() {
        let outcome = reconciler
            .reconcile_issue_comments(pr_number, commit_id, &issues, &report.diff_positions)
            .await?;
        summary.pull_requests.push(pr_number);
        summary.posted += outcome.posted;
        summary.already_active += outcome.already_active;
        summary.suppressed += outcome.suppressed;
        summary.outside_diff += outcome.outside_diff;
        with_issues.insert(
            pr_number,
            outcome.posted + outcome.already_active + outcome.suppressed > 0,
        );
        suppressed.insert(pr_number, outcome.suppressed_issues);
    }

    reconciler
        .post_total_comments_ceiling_warning(&suppressed, commit_id)
        .await?;

    if options.dismiss_stale_reviews {
        for &pr_number in prs.keys() {
            let dismissed = reconciler
                .dismiss_reviews_with_no_active_comments(pr_number)
                .await?;
            summary.dismissed_reviews.extend(dismissed);
        }
    }

    for (&pr_number, &has_issues) in &with_issues {
        if let Some(label) = options.issues_label.as_deref() {
            if has_issues {
                reconciler.ensure_label(pr_number, label).await?;
            } else {
                reconciler.ensure_label_absent(pr_number, label).await?;
            }
        }
        if let Some(message) = options.approval_message.as_deref()
            && !has_issues
        {
            reconciler.approve_pr(pr_number, commit_id, message).await?;
            summary.approved.push(pr_number);
        }
    }

    if let Some(status) = &options.status {
        let (state, description) = if summary.issues_found() {
            let total = summary.posted + summary.already_active + summary.suppressed;
            (CommitState::Failure, format!("{total} issues found"))
        } else {
            (CommitState::Success, "No issues found".to_owned())
        };
        reconciler
            .set_commit_status(
                commit_id,
                &CommitStatus {
                    state,
                    description,
                    context: status.context.clone(),
                    target_url: status.target_url.clone(),
                },
            )
            .await?;
    }

    info!(
        commit_id,
        pull_requests = summary.pull_requests.len(),
        posted = summary.posted,
        suppressed = summary.suppressed,
        dismissed = summary.dismissed_reviews.len(),
        "scan run finished"
    );
    observe_rate_limit(client, telemetry).await;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rstest::rstest;

    use super::{ScanOptions, ScanSummary, StatusOptions, run_scan};
    use crate::forge::client::ForgeClient;
    use crate::forge::error::{ExitCategory, ForgeError};
    use crate::forge::issues::{DiffPositions, IssueLevel, IssueRecord, ScanReport};
    use crate::forge::locator::RepositoryLocator;
    use crate::forge::pacing::{PacingPolicy, RetryPolicy};
    use crate::forge::reconcile::ReconcileSettings;
    use crate::forge::test_support::FakeForge;
    use crate::telemetry::NoopTelemetrySink;

    const COMMIT: &str = "abc123";

    fn client() -> ForgeClient<FakeForge> {
        let locator =
            RepositoryLocator::from_owner_repo("octo", "cat").expect("locator should be valid");
        let client = ForgeClient::new(FakeForge::new("vigil-bot"), locator)
            .with_pacing(PacingPolicy::immediate());
        client.transport().add_commit(COMMIT);
        client
    }

    fn options() -> ScanOptions {
        ScanOptions {
            commit_id: COMMIT.to_owned(),
            branches_ignore: Vec::new(),
            skip_drafts: false,
            dismiss_stale_reviews: true,
            approval_message: Some("Looks clean.".to_owned()),
            issues_label: Some("vigil: issues".to_owned()),
            status: Some(StatusOptions {
                context: "ci/vigil".to_owned(),
                target_url: None,
            }),
            retry: RetryPolicy::immediate(1),
        }
    }

    fn report(lines: &[u32]) -> ScanReport {
        ScanReport {
            issues: lines
                .iter()
                .map(|&line| IssueRecord {
                    file_name: "file1.php".to_owned(),
                    file_line: line,
                    message: format!("Problem on line {line}"),
                    level: IssueLevel::Error,
                    source: "phpcs".to_owned(),
                    severity: None,
                })
                .collect(),
            diff_positions: DiffPositions::from_changed_lines(BTreeMap::from([(
                "file1.php".to_owned(),
                vec![None, Some(1), Some(2)],
            )])),
        }
    }

    #[tokio::test]
    async fn unknown_commit_stops_the_run() {
        let client = client();
        let mut unknown = options();
        unknown.commit_id = "feedface".to_owned();

        let error = run_scan(
            &client,
            ReconcileSettings::default(),
            &NoopTelemetrySink,
            report(&[]),
            &unknown,
        )
        .await
        .expect_err("unknown commit should fail");

        assert!(matches!(error, ForgeError::CommitNotFound { .. }));
    }

    #[tokio::test]
    async fn commit_without_pull_request_is_reported() {
        let error = run_scan(
            &client(),
            ReconcileSettings::default(),
            &NoopTelemetrySink,
            report(&[]),
            &options(),
        )
        .await
        .expect_err("commit without pull request should fail");

        assert_eq!(error.exit_category(), ExitCategory::CommitNotPartOfPullRequest);
    }

    #[rstest]
    #[case::issues(&[1, 2], ExitCategory::IssuesFound, "failure")]
    #[case::clean(&[], ExitCategory::Normal, "success")]
    #[tokio::test]
    async fn run_outcome_drives_label_approval_and_status(
        #[case] lines: &[u32],
        #[case] expected: ExitCategory,
        #[case] state: &str,
    ) {
        let client = client();
        client
            .transport()
            .add_pull_request(5, COMMIT, "feature/a", false);

        let summary = run_scan(
            &client,
            ReconcileSettings::default(),
            &NoopTelemetrySink,
            report(lines),
            &options(),
        )
        .await
        .expect("run should succeed");

        let fake = client.transport();
        assert_eq!(summary.exit_category(), expected);
        assert_eq!(!fake.labels(5).is_empty(), summary.issues_found());
        assert_eq!(summary.approved.is_empty(), summary.issues_found());
        assert_eq!(
            fake.statuses()
                .first()
                .and_then(|(_, body)| body.get("state").cloned()),
            Some(serde_json::json!(state))
        );
    }

    #[test]
    fn summary_without_issues_exits_normally() {
        let summary = ScanSummary {
            outside_diff: 3,
            ..ScanSummary::default()
        };

        assert_eq!(summary.exit_category(), ExitCategory::Normal);
    }
}
