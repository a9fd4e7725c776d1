//! Tests for the reconciliation engine.

use std::collections::BTreeMap;

use rstest::rstest;

use super::{CommentState, ReconcileSettings, Reconciler, plan_comments, review_dismissibility};
use crate::forge::client::ForgeClient;
use crate::forge::filter::LoginSelector;
use crate::forge::issues::{DiffPositions, IssueLevel, IssueRecord};
use crate::forge::locator::RepositoryLocator;
use crate::forge::messages::{REVIEW_COMMENTS_CEILING_MARKER, STALE_REVIEW_DISMISSAL_MESSAGE};
use crate::forge::models::test_support::{
    active_comment, generic_comment, in_review, obsolete_comment, review,
};
use crate::forge::models::{CommitState, ReviewState};
use crate::forge::mutations::CommitStatus;
use crate::forge::pacing::PacingPolicy;
use crate::forge::test_support::FakeForge;
use crate::telemetry::TelemetryEvent;
use crate::telemetry::test_support::RecordingTelemetrySink;

const BOT: &str = "vigil-bot";
const PR: u64 = 5;
const COMMIT: &str = "abc123";

struct Harness {
    client: ForgeClient<FakeForge>,
    telemetry: RecordingTelemetrySink,
}

impl Harness {
    fn new() -> Self {
        let locator =
            RepositoryLocator::from_owner_repo("octo", "cat").expect("locator should be valid");
        Self {
            client: ForgeClient::new(FakeForge::new(BOT), locator)
                .with_pacing(PacingPolicy::immediate()),
            telemetry: RecordingTelemetrySink::default(),
        }
    }

    fn reconciler(&self, ceiling: usize) -> Reconciler<'_, FakeForge> {
        let settings = ReconcileSettings {
            bot: LoginSelector::CurrentTokenHolder,
            review_comments_total_max: ceiling,
        };
        Reconciler::new(&self.client, settings, &self.telemetry)
    }

    fn forge(&self) -> &FakeForge {
        self.client.transport()
    }
}

fn issue(line: u32, message: &str, level: IssueLevel) -> IssueRecord {
    IssueRecord {
        file_name: "file1.php".to_owned(),
        file_line: line,
        message: message.to_owned(),
        level,
        source: "phpcs".to_owned(),
        severity: None,
    }
}

/// Lines 1 to 5 of `file1.php` sit at the same diff positions.
fn positions() -> DiffPositions {
    DiffPositions::from_changed_lines(BTreeMap::from([(
        "file1.php".to_owned(),
        (0..=5).map(|line| (line > 0).then_some(line)).collect(),
    )]))
}

#[tokio::test]
async fn second_run_posts_nothing() {
    let harness = Harness::new();
    let reconciler = harness.reconciler(0);
    let issues = vec![issue(3, "All output should be escaped.", IssueLevel::Warning)];

    let first = reconciler
        .reconcile_issue_comments(PR, COMMIT, &issues, &positions())
        .await
        .expect("first run should succeed");
    let second = reconciler
        .reconcile_issue_comments(PR, COMMIT, &issues, &positions())
        .await
        .expect("second run should succeed");

    assert_eq!(first.posted, 1);
    assert_eq!(second.posted, 0);
    assert_eq!(second.already_active, 1);
    assert_eq!(harness.forge().review_comments(PR).len(), 1);
    assert_eq!(harness.forge().submitted_reviews().len(), 1);
}

#[rstest]
#[case::warnings_only(IssueLevel::Warning, "COMMENT")]
#[case::with_error(IssueLevel::Error, "REQUEST_CHANGES")]
#[tokio::test]
async fn review_event_follows_issue_levels(#[case] level: IssueLevel, #[case] expected: &str) {
    let harness = Harness::new();
    let issues = vec![
        issue(1, "Consider caching", IssueLevel::Info),
        issue(2, "Escape output", level),
    ];

    harness
        .reconciler(0)
        .reconcile_issue_comments(PR, COMMIT, &issues, &positions())
        .await
        .expect("reconciliation should succeed");

    let submitted = harness.forge().submitted_reviews();
    assert_eq!(submitted.len(), 1);
    let only = submitted.first().expect("one review should be submitted");
    assert_eq!(only.event, expected);
    assert_eq!(only.commit_id, COMMIT);
    assert_eq!(only.comment_count, 2);
}

#[tokio::test]
async fn ceiling_suppresses_overflow_and_warns_once() {
    let harness = Harness::new();
    let reconciler = harness.reconciler(2);
    let issues = vec![
        issue(1, "First", IssueLevel::Warning),
        issue(2, "Second", IssueLevel::Warning),
        issue(3, "Third", IssueLevel::Warning),
    ];

    let outcome = reconciler
        .reconcile_issue_comments(PR, COMMIT, &issues, &positions())
        .await
        .expect("reconciliation should succeed");
    assert_eq!(outcome.posted, 2);
    assert_eq!(outcome.suppressed, 1);

    let suppressed = BTreeMap::from([(PR, outcome.suppressed_issues.clone())]);
    for _ in 0..2 {
        reconciler
            .post_total_comments_ceiling_warning(&suppressed, COMMIT)
            .await
            .expect("warning should be posted");
    }

    let warnings = harness
        .forge()
        .generic_comments(PR)
        .into_iter()
        .filter(|comment| comment.body.contains(REVIEW_COMMENTS_CEILING_MARKER))
        .count();
    assert_eq!(warnings, 1);
    assert!(
        harness
            .telemetry
            .take()
            .contains(&TelemetryEvent::CeilingWarningPosted { pr_number: PR })
    );
}

#[tokio::test]
async fn ceiling_counts_existing_bot_comments_only() {
    let harness = Harness::new();
    harness
        .forge()
        .add_review_comment(PR, &active_comment(1, "file1.php", 4, "Old", BOT));
    harness
        .forge()
        .add_review_comment(PR, &active_comment(2, "file1.php", 4, "Human", "reviewer"));

    let outcome = harness
        .reconciler(2)
        .reconcile_issue_comments(
            PR,
            COMMIT,
            &[
                issue(1, "First", IssueLevel::Warning),
                issue(2, "Second", IssueLevel::Warning),
            ],
            &positions(),
        )
        .await
        .expect("reconciliation should succeed");

    assert_eq!(outcome.posted, 1);
    assert_eq!(outcome.suppressed, 1);
}

#[test]
fn lines_outside_the_diff_are_not_posted() {
    let plan = plan_comments(
        &[issue(40, "Far away", IssueLevel::Error)],
        &positions(),
        &[],
        0,
        0,
    );

    assert_eq!(
        plan.entries.first().map(|entry| entry.state),
        Some(CommentState::OutsideDiff)
    );
    assert!(plan.drafts().is_empty());
}

#[test]
fn differently_labelled_comment_still_counts_as_posted() {
    let existing = [active_comment(
        9,
        "file1.php",
        3,
        "**:no_entry_sign: Error ( severity 7 )**: Escape output",
        BOT,
    )];

    let plan = plan_comments(
        &[issue(3, "Escape output", IssueLevel::Warning)],
        &positions(),
        &existing,
        1,
        0,
    );

    assert_eq!(plan.outcome().already_active, 1);
}

#[rstest]
#[case::active_first(vec![Some(5), None])]
#[case::obsolete_first(vec![None, Some(5)])]
fn active_comment_vetoes_dismissal_in_any_order(#[case] anchors: Vec<Option<u32>>) {
    let comments: Vec<_> = anchors
        .into_iter()
        .zip(1..)
        .map(|(anchor, id)| {
            let comment = match anchor {
                Some(position) => active_comment(id, "file1.php", position, "x", BOT),
                None => obsolete_comment(id, "file1.php", "x", BOT),
            };
            in_review(comment, 10)
        })
        .collect();

    assert_eq!(review_dismissibility(&comments).get(&10), Some(&false));
}

#[test]
fn comments_outside_reviews_are_ignored() {
    let comments = [
        obsolete_comment(1, "file1.php", "x", BOT),
        in_review(obsolete_comment(2, "file1.php", "x", BOT), 10),
    ];

    let status = review_dismissibility(&comments);

    assert_eq!(status.len(), 1);
    assert_eq!(status.get(&10), Some(&true));
}

#[tokio::test]
async fn dismisses_only_reviews_with_obsolete_comments() {
    let harness = Harness::new();
    let forge = harness.forge();
    forge.add_review(PR, &review(10, BOT, ReviewState::ChangesRequested));
    forge.add_review(PR, &review(11, BOT, ReviewState::ChangesRequested));
    forge.add_review(PR, &review(12, "reviewer", ReviewState::ChangesRequested));
    forge.add_review_comment(PR, &in_review(obsolete_comment(1, "a.php", "x", BOT), 10));
    forge.add_review_comment(PR, &in_review(obsolete_comment(2, "a.php", "x", BOT), 11));
    forge.add_review_comment(PR, &in_review(active_comment(3, "a.php", 5, "x", BOT), 11));
    forge.add_review_comment(
        PR,
        &in_review(obsolete_comment(4, "a.php", "x", "reviewer"), 12),
    );

    let dismissed = harness
        .reconciler(0)
        .dismiss_reviews_with_no_active_comments(PR)
        .await
        .expect("dismissal should succeed");

    assert_eq!(dismissed, vec![10]);
    let recorded = forge.dismissals();
    assert_eq!(recorded.len(), 1);
    assert_eq!(
        recorded.first().map(|entry| entry.message.as_str()),
        Some(STALE_REVIEW_DISMISSAL_MESSAGE)
    );
}

#[tokio::test]
async fn no_comments_means_no_dismissal() {
    let harness = Harness::new();
    harness
        .forge()
        .add_review(PR, &review(10, BOT, ReviewState::ChangesRequested));

    let dismissed = harness
        .reconciler(0)
        .dismiss_reviews_with_no_active_comments(PR)
        .await
        .expect("dismissal should succeed");

    assert!(dismissed.is_empty());
    assert!(harness.forge().dismissals().is_empty());
    assert_eq!(
        harness.telemetry.take(),
        vec![TelemetryEvent::DismissalSkipped { pr_number: PR }]
    );
}

#[tokio::test]
async fn dismissal_reads_comments_posted_in_the_same_run() {
    let harness = Harness::new();
    let reconciler = harness.reconciler(0);
    let issues = vec![issue(2, "Escape output", IssueLevel::Error)];
    reconciler
        .reconcile_issue_comments(PR, COMMIT, &issues, &positions())
        .await
        .expect("first scan should succeed");

    harness.forge().mark_comments_obsolete(PR, "file1.php");
    let dismissed = reconciler
        .dismiss_reviews_with_no_active_comments(PR)
        .await
        .expect("dismissal should succeed");

    assert_eq!(dismissed.len(), 1);
    let states: Vec<ReviewState> = harness
        .forge()
        .reviews(PR)
        .into_iter()
        .map(|item| item.state)
        .collect();
    assert_eq!(states, vec![ReviewState::Dismissed]);
}

#[tokio::test]
async fn cleanup_deletes_only_marked_bot_comments() {
    let harness = Harness::new();
    let forge = harness.forge();
    forge.add_pull_request(PR, COMMIT, "feature/a", false);
    forge.add_generic_comment(PR, &generic_comment(1, REVIEW_COMMENTS_CEILING_MARKER, BOT));
    forge.add_generic_comment(PR, &generic_comment(2, "Scan complete", BOT));
    forge.add_generic_comment(
        PR,
        &generic_comment(3, REVIEW_COMMENTS_CEILING_MARKER, "other-tool"),
    );

    let deleted = harness
        .reconciler(0)
        .cleanup_bot_comments(
            COMMIT,
            &[REVIEW_COMMENTS_CEILING_MARKER.to_owned()],
            &[],
            false,
        )
        .await
        .expect("cleanup should succeed");

    assert_eq!(deleted, 1);
    let remaining: Vec<u64> = forge
        .generic_comments(PR)
        .iter()
        .map(|comment| comment.id)
        .collect();
    assert_eq!(remaining, vec![2, 3]);
}

#[tokio::test]
async fn labels_are_only_changed_when_needed() {
    let harness = Harness::new();
    let reconciler = harness.reconciler(0);

    let added = reconciler
        .ensure_label(PR, "vigil: issues found")
        .await
        .expect("label should be added");
    let added_again = reconciler
        .ensure_label(PR, "vigil: issues found")
        .await
        .expect("label lookup should succeed");
    assert!(added);
    assert!(!added_again);
    assert_eq!(harness.forge().labels(PR), vec!["vigil: issues found"]);

    let removed = reconciler
        .ensure_label_absent(PR, "vigil: issues found")
        .await
        .expect("label should be removed");
    let removed_again = reconciler
        .ensure_label_absent(PR, "vigil: issues found")
        .await
        .expect("label lookup should succeed");
    assert!(removed);
    assert!(!removed_again);
    assert!(harness.forge().labels(PR).is_empty());
}

#[tokio::test]
async fn approval_and_status_reach_the_forge() {
    let harness = Harness::new();
    let reconciler = harness.reconciler(0);

    reconciler
        .approve_pr(PR, COMMIT, "No issues found.")
        .await
        .expect("approval should succeed");
    reconciler
        .set_commit_status(
            COMMIT,
            &CommitStatus {
                state: CommitState::Success,
                description: "No issues found".to_owned(),
                context: "vigil".to_owned(),
                target_url: None,
            },
        )
        .await
        .expect("status should be set");

    let submitted = harness.forge().submitted_reviews();
    assert_eq!(
        submitted.first().map(|entry| entry.event.as_str()),
        Some("APPROVE")
    );
    let statuses = harness.forge().statuses();
    assert_eq!(statuses.len(), 1);
    assert_eq!(
        statuses
            .first()
            .and_then(|(_, body)| body.get("state"))
            .and_then(serde_json::Value::as_str),
        Some("success")
    );
}
