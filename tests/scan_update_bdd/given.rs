//! Given steps for scan update behavioural tests.

use rstest_bdd_macros::given;
use vigil::forge::{IssueLevel, IssueRecord};

use crate::scan_update_bdd_state::ScanState;

fn push_issue(state: &ScanState, issue: IssueRecord) {
    if state
        .issues
        .with_mut(|issues| issues.push(issue.clone()))
        .is_none()
    {
        state.issues.set(vec![issue]);
    }
}

fn issue(file: String, line: u32, message: String, level: IssueLevel) -> IssueRecord {
    IssueRecord {
        file_name: file,
        file_line: line,
        message,
        level,
        source: "phpcs".to_owned(),
        severity: None,
    }
}

#[given("an open pull request {pr:u64} for commit {sha}")]
fn open_pull_request(scan_state: &ScanState, pr: u64, sha: String) {
    let client = scan_state.client();
    client.transport().add_commit(&sha);
    client
        .transport()
        .add_pull_request(pr, &sha, "feature/login", false);
    scan_state.commit.set(sha);
}

#[given("a pushed commit {sha} without a pull request")]
fn commit_without_pull_request(scan_state: &ScanState, sha: String) {
    scan_state.client().transport().add_commit(&sha);
    scan_state.commit.set(sha);
}

#[given("a comment ceiling of {max:u64}")]
fn comment_ceiling(scan_state: &ScanState, max: u64) {
    let ceiling = usize::try_from(max).unwrap_or_else(|error| panic!("ceiling too large: {error}"));
    scan_state.ceiling.set(ceiling);
}

#[given("a warning on line {line:u32} of {file} saying {message}")]
fn warning_issue(scan_state: &ScanState, line: u32, file: String, message: String) {
    push_issue(scan_state, issue(file, line, message, IssueLevel::Warning));
}

#[given("an error on line {line:u32} of {file} saying {message}")]
fn error_issue(scan_state: &ScanState, line: u32, file: String, message: String) {
    push_issue(scan_state, issue(file, line, message, IssueLevel::Error));
}
