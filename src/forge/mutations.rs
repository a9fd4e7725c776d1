//! Single-call forge mutations.
//!
//! Each operation maps to exactly one request. Errors propagate unchanged
//! and nothing is retried here.

use serde_json::{Value, json};
use tracing::info;

use super::client::ForgeClient;
use super::cache::ResponseCache;
use super::error::ForgeError;
use super::messages::strip_chatops_markers;
use super::models::{CommitState, DraftReviewComment, ReviewEvent};
use super::transport::ForgeTransport;

/// Commit status to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitStatus {
    /// Status state.
    pub state: CommitState,
    /// Short description shown next to the status.
    pub description: String,
    /// Context identifying the check.
    pub context: String,
    /// Link shown with the status; omitted when empty.
    pub target_url: Option<String>,
}

/// Renders a conversation comment body.
///
/// Chat-ops markers are stripped and, when a commit is given, a
/// `(commit-ID: …)` suffix records which commit the message refers to.
#[must_use]
pub fn generic_comment_body(message: &str, commit_id: Option<&str>) -> String {
    let mut body = strip_chatops_markers(message);
    if let Some(commit) = commit_id.filter(|value| !value.is_empty()) {
        body.push_str(&format!(" (commit-ID: {commit})."));
    }
    body.push_str("\n\r");
    body
}

impl<T, C> ForgeClient<T, C>
where
    T: ForgeTransport,
    C: ResponseCache,
{
    /// Submits a review anchored at `commit_id`, returning the review id.
    ///
    /// # Errors
    ///
    /// Propagates transport failures.
    pub async fn submit_review(
        &self,
        pr_number: u64,
        commit_id: &str,
        body: &str,
        event: ReviewEvent,
        comments: &[DraftReviewComment],
    ) -> Result<Option<u64>, ForgeError> {
        let inline: Vec<Value> = comments
            .iter()
            .map(|comment| {
                json!({
                    "path": comment.path,
                    "position": comment.position,
                    "body": comment.body,
                })
            })
            .collect();
        let payload = json!({
            "commit_id": commit_id,
            "body": strip_chatops_markers(body),
            "event": event.as_api_str(),
            "comments": inline,
        });

        info!(
            pr_number,
            commit_id,
            event = event.as_api_str(),
            comment_count = comments.len(),
            "submitting review"
        );
        let reply = self
            .transport()
            .post(&self.locator().pull_reviews_path(pr_number), &payload)
            .await?;
        Ok(reply.get("id").and_then(Value::as_u64))
    }

    /// Deletes an inline review comment.
    ///
    /// # Errors
    ///
    /// Propagates transport failures.
    pub async fn delete_review_comment(&self, comment_id: u64) -> Result<(), ForgeError> {
        info!(comment_id, "deleting review comment");
        self.transport()
            .delete(&self.locator().review_comment_path(comment_id))
            .await
    }

    /// Posts a conversation comment on a pull request.
    ///
    /// # Errors
    ///
    /// Propagates transport failures.
    pub async fn submit_generic_comment(
        &self,
        pr_number: u64,
        message: &str,
        commit_id: Option<&str>,
    ) -> Result<(), ForgeError> {
        let payload = json!({ "body": generic_comment_body(message, commit_id) });
        info!(pr_number, commit_id, "posting conversation comment");
        self.transport()
            .post(&self.locator().issue_comments_path(pr_number), &payload)
            .await
            .map(|_| ())
    }

    /// Deletes a conversation comment.
    ///
    /// # Errors
    ///
    /// Propagates transport failures.
    pub async fn delete_generic_comment(&self, comment_id: u64) -> Result<(), ForgeError> {
        info!(comment_id, "deleting conversation comment");
        self.transport()
            .delete(&self.locator().issue_comment_path(comment_id))
            .await
    }

    /// Dismisses a review with an explanatory message.
    ///
    /// # Errors
    ///
    /// Propagates transport failures.
    pub async fn dismiss_review(
        &self,
        pr_number: u64,
        review_id: u64,
        message: &str,
    ) -> Result<(), ForgeError> {
        let payload = json!({ "message": message, "event": "DISMISS" });
        info!(pr_number, review_id, "dismissing review");
        self.transport()
            .put(
                &self.locator().review_dismissal_path(pr_number, review_id),
                &payload,
            )
            .await
            .map(|_| ())
    }

    /// Adds a label to a pull request.
    ///
    /// # Errors
    ///
    /// Propagates transport failures.
    pub async fn add_label(&self, pr_number: u64, name: &str) -> Result<(), ForgeError> {
        let payload = json!({ "labels": [name] });
        info!(pr_number, label = name, "adding label");
        self.transport()
            .post(&self.locator().issue_labels_path(pr_number), &payload)
            .await
            .map(|_| ())
    }

    /// Removes a label from a pull request.
    ///
    /// # Errors
    ///
    /// Propagates transport failures.
    pub async fn remove_label(&self, pr_number: u64, name: &str) -> Result<(), ForgeError> {
        info!(pr_number, label = name, "removing label");
        self.transport()
            .delete(&self.locator().issue_label_path(pr_number, name))
            .await
    }

    /// Creates a commit status.
    ///
    /// # Errors
    ///
    /// Propagates transport failures.
    pub async fn create_commit_status(
        &self,
        commit_id: &str,
        status: &CommitStatus,
    ) -> Result<(), ForgeError> {
        let mut payload = json!({
            "state": status.state.as_api_str(),
            "description": status.description,
            "context": status.context,
        });
        if let Some(url) = status.target_url.as_deref().filter(|url| !url.is_empty())
            && let Some(fields) = payload.as_object_mut()
        {
            fields.insert("target_url".to_owned(), json!(url));
        }

        info!(
            commit_id,
            state = status.state.as_api_str(),
            context = status.context,
            "creating commit status"
        );
        self.transport()
            .post(&self.locator().statuses_path(commit_id), &payload)
            .await
            .map(|_| ())
    }
}
