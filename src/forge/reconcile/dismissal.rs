//! Dismissing bot reviews whose inline comments have all gone stale.

use std::collections::BTreeMap;

use tracing::{info, warn};

use super::Reconciler;
use crate::forge::cache::ResponseCache;
use crate::forge::client::{CommentQuery, ReviewQuery};
use crate::forge::error::ForgeError;
use crate::forge::filter::LoginSelector;
use crate::forge::messages::STALE_REVIEW_DISMISSAL_MESSAGE;
use crate::forge::models::{ReviewComment, ReviewState};
use crate::forge::transport::ForgeTransport;
use crate::telemetry::TelemetryEvent;

/// Whether each review may be dismissed, judged from its comments.
///
/// A review is dismissible once one of its comments is obsolete, but a
/// single active comment vetoes it for good, whatever order the comments
/// arrive in. Comments outside any review are ignored, and reviews with no
/// comments never appear in the result.
#[must_use]
pub fn review_dismissibility(comments: &[ReviewComment]) -> BTreeMap<u64, bool> {
    let mut status: BTreeMap<u64, bool> = BTreeMap::new();
    for comment in comments {
        let Some(review_id) = comment.review_id else {
            continue;
        };
        let entry = status.entry(review_id).or_insert(true);
        if comment.is_active() {
            *entry = false;
        }
    }
    status
}

impl<T, C> Reconciler<'_, T, C>
where
    T: ForgeTransport,
    C: ResponseCache,
{
    /// Dismisses the bot's change-requesting reviews left with only
    /// obsolete comments, returning the dismissed review ids.
    ///
    /// The bot's comments are always fetched fresh. When none come back the
    /// step does nothing, since an empty listing cannot be told apart from
    /// a failed one.
    ///
    /// # Errors
    ///
    /// Propagates forge failures.
    pub async fn dismiss_reviews_with_no_active_comments(
        &self,
        pr_number: u64,
    ) -> Result<Vec<u64>, ForgeError> {
        let bot = LoginSelector::Literal(self.bot_login().await?);
        let reviews = self
            .client
            .reviews(
                pr_number,
                &ReviewQuery {
                    login: Some(bot.clone()),
                    states: vec![ReviewState::ChangesRequested],
                },
                false,
            )
            .await?;
        let comments = self
            .client
            .review_comments(
                pr_number,
                &CommentQuery {
                    login: Some(bot),
                    active: None,
                },
                true,
            )
            .await?;

        if comments.is_empty() {
            warn!(
                pr_number,
                "no bot review comments found; not dismissing any review"
            );
            self.telemetry
                .record(TelemetryEvent::DismissalSkipped { pr_number });
            return Ok(Vec::new());
        }

        let status = review_dismissibility(&comments);
        let mut dismissed = Vec::new();
        for review in reviews {
            if status.get(&review.id) != Some(&true) {
                continue;
            }
            self.client
                .dismiss_review(pr_number, review.id, STALE_REVIEW_DISMISSAL_MESSAGE)
                .await?;
            dismissed.push(review.id);
        }

        info!(pr_number, dismissed = dismissed.len(), "stale reviews dismissed");
        if !dismissed.is_empty() {
            self.telemetry.record(TelemetryEvent::ReviewsDismissed {
                pr_number,
                review_ids: dismissed.clone(),
            });
        }
        Ok(dismissed)
    }
}
