//! Run telemetry events and sinks.
//!
//! Each reconciliation step reports what it changed on the forge as one
//! structured event. The binary writes them to stderr as JSON lines so a CI
//! log can be mined for posted, suppressed and dismissed counts without
//! parsing prose.

use std::io;

use serde::{Deserialize, Serialize};

/// A structured telemetry event emitted by `vigil`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TelemetryEvent {
    /// Rate limit window observed at the start or end of a run.
    RateLimitObserved {
        /// Requests allowed in the window.
        limit: u32,
        /// Requests left in the window.
        remaining: u32,
        /// Unix timestamp when the window resets.
        reset_at: u64,
    },
    /// Inline comments for one pull request were reconciled.
    IssueCommentsReconciled {
        /// Pull request number.
        pr_number: u64,
        /// Comments posted by this run.
        posted: usize,
        /// Issues already covered by an active comment.
        already_active: usize,
        /// Issues held back by the comment ceiling.
        suppressed: usize,
        /// Issues on lines outside the diff.
        outside_diff: usize,
    },
    /// Stale bot reviews were dismissed.
    ReviewsDismissed {
        /// Pull request number.
        pr_number: u64,
        /// Dismissed review ids.
        review_ids: Vec<u64>,
    },
    /// Dismissal was skipped because no bot comments were found.
    DismissalSkipped {
        /// Pull request number.
        pr_number: u64,
    },
    /// The comment ceiling warning was posted.
    CeilingWarningPosted {
        /// Pull request number.
        pr_number: u64,
    },
    /// Earlier bot conversation comments were removed.
    BotCommentsCleanedUp {
        /// Pull request number.
        pr_number: u64,
        /// Number of deleted comments.
        deleted: usize,
    },
    /// The pull request was approved.
    PullRequestApproved {
        /// Pull request number.
        pr_number: u64,
        /// Commit the approval is anchored to.
        commit_id: String,
    },
    /// A label was added to the pull request.
    LabelAdded {
        /// Pull request number.
        pr_number: u64,
        /// Label name.
        label: String,
    },
    /// A label was removed from the pull request.
    LabelRemoved {
        /// Pull request number.
        pr_number: u64,
        /// Label name.
        label: String,
    },
    /// A commit status was created.
    CommitStatusSet {
        /// Commit the status belongs to.
        commit_id: String,
        /// Status state string.
        state: String,
        /// Status context.
        context: String,
    },
}

/// A sink that can record telemetry events.
pub trait TelemetrySink: Send + Sync {
    /// Records a telemetry event.
    fn record(&self, event: TelemetryEvent);
}

/// Telemetry sink that drops all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetrySink;

impl TelemetrySink for NoopTelemetrySink {
    fn record(&self, _event: TelemetryEvent) {}
}

/// Records telemetry events to stderr as JSON lines (JSONL).
#[derive(Debug, Default)]
pub struct StderrJsonlTelemetrySink;

impl TelemetrySink for StderrJsonlTelemetrySink {
    fn record(&self, event: TelemetryEvent) {
        let Ok(serialised) = serde_json::to_string(&event) else {
            return;
        };

        let _ignored = writeln_stderr(&serialised);
    }
}

fn writeln_stderr(message: &str) -> io::Result<()> {
    use io::Write;

    let mut stderr = io::stderr().lock();
    writeln!(stderr, "{message}")
}

/// Telemetry helpers for tests.
#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    use std::sync::{Mutex, PoisonError};

    use super::{TelemetryEvent, TelemetrySink};

    /// Sink that keeps every event in memory.
    #[derive(Debug, Default)]
    pub struct RecordingTelemetrySink {
        events: Mutex<Vec<TelemetryEvent>>,
    }

    impl RecordingTelemetrySink {
        /// Returns and clears the recorded events.
        #[must_use]
        pub fn take(&self) -> Vec<TelemetryEvent> {
            self.events
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .drain(..)
                .collect()
        }
    }

    impl TelemetrySink for RecordingTelemetrySink {
        fn record(&self, event: TelemetryEvent) {
            self.events
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(event);
        }
    }
}
