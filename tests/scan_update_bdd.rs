//! Behavioural tests for scan updates on pull requests.

mod support {
    #[path = "../support/runtime.rs"]
    pub mod runtime;
}

#[path = "scan_update_bdd/given.rs"]
mod scan_update_bdd_given;
#[path = "scan_update_bdd/state.rs"]
mod scan_update_bdd_state;
#[path = "scan_update_bdd/then.rs"]
mod scan_update_bdd_then;
#[path = "scan_update_bdd/when.rs"]
mod scan_update_bdd_when;

use rstest::fixture;
use rstest_bdd_macros::scenario;

use scan_update_bdd_state::ScanState;

#[fixture]
fn scan_state() -> ScanState {
    ScanState::default()
}

#[scenario(path = "tests/features/scan_update.feature", index = 0)]
fn rescan_posts_nothing_new(scan_state: ScanState) {
    let _ = scan_state;
}

#[scenario(path = "tests/features/scan_update.feature", index = 1)]
fn ceiling_holds_back_comments(scan_state: ScanState) {
    let _ = scan_state;
}

#[scenario(path = "tests/features/scan_update.feature", index = 2)]
fn obsolete_reviews_dismissed(scan_state: ScanState) {
    let _ = scan_state;
}

#[scenario(path = "tests/features/scan_update.feature", index = 3)]
fn commit_outside_pull_request(scan_state: ScanState) {
    let _ = scan_state;
}
