//! Bot conversation comments, approvals and commit statuses.

use std::collections::{BTreeMap, HashSet};

use tracing::info;

use super::Reconciler;
use crate::forge::cache::ResponseCache;
use crate::forge::error::ForgeError;
use crate::forge::filter::LoginSelector;
use crate::forge::issues::IssueRecord;
use crate::forge::messages::REVIEW_COMMENTS_CEILING_MARKER;
use crate::forge::models::ReviewEvent;
use crate::forge::mutations::CommitStatus;
use crate::forge::transport::ForgeTransport;
use crate::telemetry::TelemetryEvent;

impl<T, C> Reconciler<'_, T, C>
where
    T: ForgeTransport,
    C: ResponseCache,
{
    /// Posts one ceiling warning on each pull request that had issues held
    /// back, unless a bot comment already carries it. Returns the pull
    /// requests that received a new warning.
    ///
    /// # Errors
    ///
    /// Propagates forge failures.
    pub async fn post_total_comments_ceiling_warning(
        &self,
        prs_with_suppressed: &BTreeMap<u64, Vec<IssueRecord>>,
        commit_id: &str,
    ) -> Result<Vec<u64>, ForgeError> {
        let bot = LoginSelector::Literal(self.bot_login().await?);
        let mut warned = Vec::new();
        for (&pr_number, suppressed) in prs_with_suppressed {
            if suppressed.is_empty() {
                continue;
            }
            let existing = self
                .client
                .generic_comments(pr_number, Some(&bot), true)
                .await?;
            if existing
                .iter()
                .any(|comment| comment.body.contains(REVIEW_COMMENTS_CEILING_MARKER))
            {
                info!(pr_number, "ceiling warning already present");
                continue;
            }

            self.client
                .submit_generic_comment(pr_number, REVIEW_COMMENTS_CEILING_MARKER, Some(commit_id))
                .await?;
            self.telemetry
                .record(TelemetryEvent::CeilingWarningPosted { pr_number });
            warned.push(pr_number);
        }
        Ok(warned)
    }

    /// Deletes bot conversation comments containing any of `markers` from
    /// every open pull request for `commit_id`, returning how many were
    /// deleted.
    ///
    /// Comments by other users and bot comments without a marker are left
    /// alone.
    ///
    /// # Errors
    ///
    /// Propagates forge failures.
    pub async fn cleanup_bot_comments(
        &self,
        commit_id: &str,
        markers: &[String],
        branches_ignore: &[String],
        skip_drafts: bool,
    ) -> Result<usize, ForgeError> {
        if markers.is_empty() {
            return Ok(0);
        }
        let bot = LoginSelector::Literal(self.bot_login().await?);
        let prs = self
            .client
            .find_open_prs_for_commit(commit_id, branches_ignore, skip_drafts, false)
            .await?;

        let mut deleted_ids = HashSet::new();
        for &pr_number in prs.keys() {
            let comments = self
                .client
                .generic_comments(pr_number, Some(&bot), true)
                .await?;
            let mut deleted = 0;
            for comment in comments {
                let marked = markers
                    .iter()
                    .any(|marker| comment.body.contains(marker.as_str()));
                if !marked || !deleted_ids.insert(comment.id) {
                    continue;
                }
                self.client.delete_generic_comment(comment.id).await?;
                deleted += 1;
            }

            info!(pr_number, deleted, "bot comments cleaned up");
            if deleted > 0 {
                self.telemetry
                    .record(TelemetryEvent::BotCommentsCleanedUp { pr_number, deleted });
            }
        }
        Ok(deleted_ids.len())
    }

    /// Approves a pull request at `commit_id`, returning the review id.
    ///
    /// The head of the pull request is not checked again after the
    /// approval is submitted, so a commit pushed while the scan ran can end
    /// up approved without having been scanned.
    ///
    /// # Errors
    ///
    /// Propagates forge failures.
    pub async fn approve_pr(
        &self,
        pr_number: u64,
        commit_id: &str,
        message: &str,
    ) -> Result<Option<u64>, ForgeError> {
        let review_id = self
            .client
            .submit_review(pr_number, commit_id, message, ReviewEvent::Approve, &[])
            .await?;
        self.telemetry.record(TelemetryEvent::PullRequestApproved {
            pr_number,
            commit_id: commit_id.to_owned(),
        });
        Ok(review_id)
    }

    /// Sets a commit status.
    ///
    /// # Errors
    ///
    /// Propagates forge failures.
    pub async fn set_commit_status(
        &self,
        commit_id: &str,
        status: &CommitStatus,
    ) -> Result<(), ForgeError> {
        self.client.create_commit_status(commit_id, status).await?;
        self.telemetry.record(TelemetryEvent::CommitStatusSet {
            commit_id: commit_id.to_owned(),
            state: status.state.as_api_str().to_owned(),
            context: status.context.clone(),
        });
        Ok(())
    }
}
