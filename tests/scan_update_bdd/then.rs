//! Then steps for scan update behavioural tests.

use rstest_bdd_macros::then;
use vigil::forge::messages::REVIEW_COMMENTS_CEILING_MARKER;
use vigil::telemetry::TelemetryEvent;

use crate::scan_update_bdd_state::ScanState;

fn as_count(value: u64) -> usize {
    usize::try_from(value).unwrap_or_else(|error| panic!("count too large: {error}"))
}

#[then("pull request {pr:u64} has {count:u64} review comments")]
fn review_comment_count(scan_state: &ScanState, pr: u64, count: u64) {
    let comments = scan_state.client().transport().review_comments(pr);
    assert_eq!(comments.len(), as_count(count), "comments: {comments:?}");
}

#[then("pull request {pr:u64} has {count:u64} ceiling warnings")]
fn ceiling_warning_count(scan_state: &ScanState, pr: u64, count: u64) {
    let warnings = scan_state
        .client()
        .transport()
        .generic_comments(pr)
        .into_iter()
        .filter(|comment| comment.body.contains(REVIEW_COMMENTS_CEILING_MARKER))
        .count();
    assert_eq!(warnings, as_count(count));
}

#[then("the last scan posted {count:u64} comments")]
fn posted_count(scan_state: &ScanState, count: u64) {
    assert_eq!(scan_state.summary().posted, as_count(count));
}

#[then("the last scan found {count:u64} active comments")]
fn already_active_count(scan_state: &ScanState, count: u64) {
    assert_eq!(scan_state.summary().already_active, as_count(count));
}

#[then("the last scan held back {count:u64} comments")]
fn suppressed_count(scan_state: &ScanState, count: u64) {
    assert_eq!(scan_state.summary().suppressed, as_count(count));
}

#[then("the last scan dismissed {count:u64} reviews")]
fn dismissed_count(scan_state: &ScanState, count: u64) {
    assert_eq!(scan_state.summary().dismissed_reviews.len(), as_count(count));
}

#[then("telemetry recorded a dismissal on pull request {pr:u64}")]
fn dismissal_recorded(scan_state: &ScanState, pr: u64) {
    let events = scan_state.telemetry().take();
    assert!(
        events.iter().any(|event| matches!(
            event,
            TelemetryEvent::ReviewsDismissed { pr_number, .. } if *pr_number == pr
        )),
        "events: {events:?}"
    );
}

#[then("the scan fails with exit code {code:u8}")]
fn scan_fails_with(scan_state: &ScanState, code: u8) {
    let actual = scan_state
        .error
        .with_ref(|error| error.exit_category().code())
        .unwrap_or_else(|| panic!("scan should have failed"));
    assert_eq!(actual, code);
}
