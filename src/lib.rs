//! Vigil library crate: pull request review reconciliation for CI scans.
//!
//! The library takes the issues found by linters for one commit, finds the
//! open pull requests that commit heads, and keeps the bot's inline
//! comments, reviews, labels and commit statuses in step with the scan.
//! Forge access goes through Octocrab behind a transport trait, so every
//! step can be exercised against an in-memory forge in tests.

pub mod config;
pub mod forge;
pub mod report;
pub mod scan;
pub mod telemetry;

pub use config::VigilConfig;
pub use forge::{
    ExitCategory, ForgeClient, ForgeError, OctocrabTransport, PersonalAccessToken,
    RepositoryLocator, ScanReport,
};
pub use report::load_scan_report;
pub use scan::{ScanOptions, ScanSummary, run_scan};
