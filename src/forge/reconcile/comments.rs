//! Inline comment reconciliation.

use std::collections::BTreeMap;

use tracing::info;

use super::Reconciler;
use crate::forge::cache::ResponseCache;
use crate::forge::client::CommentQuery;
use crate::forge::error::ForgeError;
use crate::forge::issues::{DiffPositions, IssueRecord, normalize_comment_body, render_comment_body};
use crate::forge::models::{DraftReviewComment, ReviewComment, ReviewEvent, location_key};
use crate::forge::transport::ForgeTransport;
use crate::telemetry::TelemetryEvent;

/// What happened to one issue during reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentState {
    /// Not yet decided.
    NotYetPosted,
    /// Queued for the review submitted by this run.
    PostedThisRun,
    /// An active comment with the same message already sits on the line.
    AlreadyActive,
    /// Held back because the pull request reached the comment ceiling.
    SuppressedByCeiling,
    /// The line is not part of the diff, so no comment can be anchored.
    OutsideDiff,
}

/// An issue together with its reconciliation decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedComment {
    /// The issue.
    pub issue: IssueRecord,
    /// Diff position of the issue line, when it has one.
    pub position: Option<u32>,
    /// Decision reached.
    pub state: CommentState,
}

/// Decisions for every issue of one pull request, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentPlan {
    /// Planned comments.
    pub entries: Vec<PlannedComment>,
}

impl CommentPlan {
    fn in_state(&self, state: CommentState) -> impl Iterator<Item = &PlannedComment> {
        self.entries.iter().filter(move |entry| entry.state == state)
    }

    /// Inline comments to submit.
    #[must_use]
    pub fn drafts(&self) -> Vec<DraftReviewComment> {
        self.in_state(CommentState::PostedThisRun)
            .filter_map(|entry| {
                entry.position.map(|position| DraftReviewComment {
                    path: entry.issue.file_name.clone(),
                    position,
                    body: render_comment_body(&entry.issue),
                })
            })
            .collect()
    }

    /// Review event for the submitted review.
    #[must_use]
    pub fn review_event(&self) -> ReviewEvent {
        if self
            .in_state(CommentState::PostedThisRun)
            .any(|entry| entry.issue.is_error())
        {
            ReviewEvent::RequestChanges
        } else {
            ReviewEvent::Comment
        }
    }

    /// Counts per decision.
    #[must_use]
    pub fn outcome(&self) -> ReconcileOutcome {
        ReconcileOutcome {
            posted: self.in_state(CommentState::PostedThisRun).count(),
            already_active: self.in_state(CommentState::AlreadyActive).count(),
            suppressed: self.in_state(CommentState::SuppressedByCeiling).count(),
            outside_diff: self.in_state(CommentState::OutsideDiff).count(),
            suppressed_issues: self
                .in_state(CommentState::SuppressedByCeiling)
                .map(|entry| entry.issue.clone())
                .collect(),
            review_id: None,
        }
    }
}

/// Result of reconciling one pull request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Comments posted by this run.
    pub posted: usize,
    /// Issues already covered by an active comment.
    pub already_active: usize,
    /// Issues held back by the ceiling.
    pub suppressed: usize,
    /// Issues on lines outside the diff.
    pub outside_diff: usize,
    /// The issues held back by the ceiling.
    pub suppressed_issues: Vec<IssueRecord>,
    /// Review submitted by this run, when one was.
    pub review_id: Option<u64>,
}

/// Decides the fate of each issue against the comments already posted.
///
/// `existing` holds the active comments on the pull request and
/// `bot_active_count` how many of them the bot wrote. A `ceiling` of zero
/// disables the limit.
#[must_use]
pub fn plan_comments(
    issues: &[IssueRecord],
    positions: &DiffPositions,
    existing: &[ReviewComment],
    bot_active_count: usize,
    ceiling: usize,
) -> CommentPlan {
    let mut posted_bodies: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for comment in existing {
        if let Some(key) = comment.location_key() {
            posted_bodies
                .entry(key)
                .or_default()
                .push(normalize_comment_body(&comment.body));
        }
    }

    let mut running_total = bot_active_count;
    let entries = issues
        .iter()
        .map(|issue| {
            let position = positions.position_for(&issue.file_name, issue.file_line);
            let mut planned = PlannedComment {
                issue: issue.clone(),
                position,
                state: CommentState::NotYetPosted,
            };
            let Some(anchor) = position else {
                planned.state = CommentState::OutsideDiff;
                return planned;
            };

            let wanted = normalize_comment_body(&render_comment_body(issue));
            let at_location = posted_bodies
                .entry(location_key(&issue.file_name, anchor))
                .or_default();
            planned.state = if at_location.contains(&wanted) {
                CommentState::AlreadyActive
            } else if ceiling > 0 && running_total >= ceiling {
                CommentState::SuppressedByCeiling
            } else {
                at_location.push(wanted);
                running_total = running_total.saturating_add(1);
                CommentState::PostedThisRun
            };
            planned
        })
        .collect();

    CommentPlan { entries }
}

impl<T, C> Reconciler<'_, T, C>
where
    T: ForgeTransport,
    C: ResponseCache,
{
    /// Posts inline comments for issues not yet covered on the pull request.
    ///
    /// All new comments go out in a single review anchored at `commit_id`,
    /// requesting changes when any of them is an error.
    ///
    /// # Errors
    ///
    /// Propagates forge failures; nothing is posted when the fetch fails.
    pub async fn reconcile_issue_comments(
        &self,
        pr_number: u64,
        commit_id: &str,
        issues: &[IssueRecord],
        positions: &DiffPositions,
    ) -> Result<ReconcileOutcome, ForgeError> {
        let bot = self.bot_login().await?;
        let query = CommentQuery {
            login: None,
            active: Some(true),
        };
        let existing = self.client.review_comments(pr_number, &query, true).await?;
        let bot_active_count = existing
            .iter()
            .filter(|comment| comment.author.as_deref() == Some(bot.as_str()))
            .count();

        let plan = plan_comments(
            issues,
            positions,
            &existing,
            bot_active_count,
            self.settings.review_comments_total_max,
        );
        let mut outcome = plan.outcome();
        let drafts = plan.drafts();
        if !drafts.is_empty() {
            outcome.review_id = self
                .client
                .submit_review(pr_number, commit_id, "", plan.review_event(), &drafts)
                .await?;
        }

        info!(
            pr_number,
            commit_id,
            posted = outcome.posted,
            already_active = outcome.already_active,
            suppressed = outcome.suppressed,
            outside_diff = outcome.outside_diff,
            "reconciled inline comments"
        );
        self.telemetry.record(TelemetryEvent::IssueCommentsReconciled {
            pr_number,
            posted: outcome.posted,
            already_active: outcome.already_active,
            suppressed: outcome.suppressed,
            outside_diff: outcome.outside_diff,
        });
        Ok(outcome)
    }
}
