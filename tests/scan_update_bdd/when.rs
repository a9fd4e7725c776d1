//! When steps for scan update behavioural tests.

use std::collections::BTreeMap;

use rstest_bdd_macros::when;
use vigil::forge::{
    DiffPositions, IssueRecord, LoginSelector, ReconcileSettings, RetryPolicy, ScanReport,
};
use vigil::scan::{ScanOptions, run_scan};

use crate::scan_update_bdd_state::{ScanState, ensure_runtime};

/// Every reported file changes lines 1 to 10, each at the matching position.
fn diff_positions(issues: &[IssueRecord]) -> DiffPositions {
    let changed: BTreeMap<String, Vec<Option<u32>>> = issues
        .iter()
        .map(|issue| {
            let lines = (0..=10).map(|line| (line > 0).then_some(line)).collect();
            (issue.file_name.clone(), lines)
        })
        .collect();
    DiffPositions::from_changed_lines(changed)
}

fn scan(scan_state: &ScanState, dismiss_stale_reviews: bool) {
    let runtime = ensure_runtime(&scan_state.runtime)
        .unwrap_or_else(|error| panic!("runtime should start: {error}"));
    let client = scan_state.client();
    let telemetry = scan_state.telemetry();
    let commit_id = scan_state
        .commit
        .get()
        .unwrap_or_else(|| panic!("no commit configured for the scenario"));
    let issues = scan_state.issues.get().unwrap_or_default();

    let report = ScanReport {
        diff_positions: diff_positions(&issues),
        issues,
    };
    let settings = ReconcileSettings {
        bot: LoginSelector::CurrentTokenHolder,
        review_comments_total_max: scan_state.ceiling.get().unwrap_or(0),
    };
    let options = ScanOptions {
        commit_id,
        branches_ignore: Vec::new(),
        skip_drafts: false,
        dismiss_stale_reviews,
        approval_message: None,
        issues_label: None,
        status: None,
        retry: RetryPolicy::immediate(1),
    };

    drop(scan_state.summary.take());
    drop(scan_state.error.take());
    match runtime.block_on(run_scan(
        client.as_ref(),
        settings,
        telemetry.as_ref(),
        report,
        &options,
    )) {
        Ok(summary) => scan_state.summary.set(summary),
        Err(error) => scan_state.error.set(error),
    }
}

#[when("the commit is scanned")]
fn commit_scanned(scan_state: &ScanState) {
    scan(scan_state, false);
}

#[when("the commit is scanned with stale review dismissal")]
fn commit_scanned_with_dismissal(scan_state: &ScanState) {
    scan(scan_state, true);
}

#[when("the code of {file} on pull request {pr:u64} changes")]
fn code_changes(scan_state: &ScanState, file: String, pr: u64) {
    scan_state
        .client()
        .transport()
        .mark_comments_obsolete(pr, &file);
}

#[when("the scan report is emptied")]
fn report_emptied(scan_state: &ScanState) {
    scan_state.issues.set(Vec::new());
}
