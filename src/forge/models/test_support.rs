//! Builders for forge model fixtures.
//!
//! # Examples
//!
//! ```
//! use vigil::forge::models::test_support::{active_comment, open_pull_request};
//!
//! let pr = open_pull_request(4, "abc123", "feature/login");
//! assert!(!pr.draft);
//!
//! let comment = active_comment(1, "src/a.php", 3, "Fix this", "vigil-bot");
//! assert!(comment.is_active());
//! ```

use super::{
    CommentAnchor, GenericComment, PullRequest, Review, ReviewComment, ReviewState,
};

/// Builds a non-draft open pull request.
#[must_use]
pub fn open_pull_request(number: u64, head_sha: &str, head_ref: &str) -> PullRequest {
    PullRequest {
        number,
        title: Some(format!("Pull request {number}")),
        author: Some("contributor".to_owned()),
        head_sha: head_sha.to_owned(),
        head_ref: Some(head_ref.to_owned()),
        draft: false,
    }
}

/// Builds a review comment anchored at `position`.
#[must_use]
pub fn active_comment(
    id: u64,
    path: &str,
    position: u32,
    body: &str,
    author: &str,
) -> ReviewComment {
    ReviewComment {
        id,
        path: path.to_owned(),
        anchor: CommentAnchor::Anchored { position },
        body: body.to_owned(),
        author: Some(author.to_owned()),
        review_id: None,
        commit_id: None,
        original_commit_id: None,
    }
}

/// Builds a review comment whose code has changed since it was posted.
#[must_use]
pub fn obsolete_comment(id: u64, path: &str, body: &str, author: &str) -> ReviewComment {
    ReviewComment {
        anchor: CommentAnchor::Obsolete,
        ..active_comment(id, path, 1, body, author)
    }
}

/// Attaches `comment` to the review with the given id.
#[must_use]
pub fn in_review(comment: ReviewComment, review_id: u64) -> ReviewComment {
    ReviewComment {
        review_id: Some(review_id),
        ..comment
    }
}

/// Builds a submitted review.
#[must_use]
pub fn review(id: u64, author: &str, state: ReviewState) -> Review {
    Review {
        id,
        author: Some(author.to_owned()),
        state,
        commit_id: None,
    }
}

/// Builds a conversation comment.
#[must_use]
pub fn generic_comment(id: u64, body: &str, author: &str) -> GenericComment {
    GenericComment {
        id,
        body: body.to_owned(),
        author: Some(author.to_owned()),
    }
}
