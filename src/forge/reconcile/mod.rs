//! Reconciling scan results with the review state already on the forge.
//!
//! A [`Reconciler`] decides, per pull request, which inline comments to
//! post, which stale reviews to dismiss and which bot conversation comments
//! to add or remove. Every decision is driven by a fresh read of the forge,
//! so running the same scan twice posts nothing the second time.

mod comments;
mod dismissal;
mod generic;
mod labels;

pub use comments::{CommentPlan, CommentState, PlannedComment, ReconcileOutcome, plan_comments};
pub use dismissal::review_dismissibility;

use super::cache::{InMemoryResponseCache, ResponseCache};
use super::client::ForgeClient;
use super::error::ForgeError;
use super::filter::LoginSelector;
use super::transport::ForgeTransport;
use crate::telemetry::TelemetrySink;

/// Bot identity and limits applied while reconciling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileSettings {
    /// Identity the bot posts as.
    pub bot: LoginSelector,
    /// Maximum number of active bot comments per pull request; zero means
    /// unlimited.
    pub review_comments_total_max: usize,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            bot: LoginSelector::CurrentTokenHolder,
            review_comments_total_max: 0,
        }
    }
}

/// Reconciliation engine bound to one repository client.
pub struct Reconciler<'a, T, C = InMemoryResponseCache> {
    client: &'a ForgeClient<T, C>,
    settings: ReconcileSettings,
    telemetry: &'a dyn TelemetrySink,
}

impl<'a, T, C> Reconciler<'a, T, C>
where
    T: ForgeTransport,
    C: ResponseCache,
{
    /// Creates a reconciler.
    #[must_use]
    pub fn new(
        client: &'a ForgeClient<T, C>,
        settings: ReconcileSettings,
        telemetry: &'a dyn TelemetrySink,
    ) -> Self {
        Self {
            client,
            settings,
            telemetry,
        }
    }

    /// Settings in effect.
    #[must_use]
    pub const fn settings(&self) -> &ReconcileSettings {
        &self.settings
    }

    async fn bot_login(&self) -> Result<String, ForgeError> {
        self.client.resolve_login(&self.settings.bot).await
    }
}

#[cfg(test)]
mod tests;
