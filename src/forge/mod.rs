//! Forge access and pull request review reconciliation.
//!
//! The [`transport`] layer talks HTTP through Octocrab, [`client`] adds
//! caching, pagination and typed decoding on top, and [`reconcile`] turns a
//! scan report into posted comments, dismissed reviews, labels and statuses.
//! Errors from every layer are reported as [`ForgeError`], which carries the
//! exit category the binary uses.

pub mod cache;
pub mod client;
pub mod discovery;
pub mod error;
pub mod filter;
pub mod issues;
pub mod locator;
pub mod messages;
pub mod models;
pub mod mutations;
pub mod pacing;
pub mod pagination;
pub mod rate_limit;
pub mod reconcile;
pub mod transport;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use cache::{CacheKey, InMemoryResponseCache, ResponseCache};
pub use client::{CollaboratorAffiliation, CommentQuery, ForgeClient, ReviewQuery};
pub use discovery::ImplicatedPullRequests;
pub use error::{ExitCategory, FORGE_COMMUNICATION_FAILURE, ForgeError};
pub use filter::LoginSelector;
pub use issues::{DiffPositions, IssueLevel, IssueRecord, ScanReport};
pub use locator::{PersonalAccessToken, RepositoryLocator};
pub use mutations::CommitStatus;
pub use pacing::{PacingPolicy, RetryPolicy};
pub use rate_limit::RateLimitInfo;
pub use reconcile::{ReconcileOutcome, ReconcileSettings, Reconciler};
pub use transport::{ForgeTransport, OctocrabTransport};

#[cfg(test)]
pub use transport::MockForgeTransport;
