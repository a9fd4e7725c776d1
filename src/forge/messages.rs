//! Fixed texts the bot posts and the markers it searches for.

/// Opens a section that chat-ops forwarding must skip.
pub const CHATOPS_IGNORE_START: &str = "<!-- vigil-chatops-ignore-start -->";

/// Closes a section that chat-ops forwarding must skip.
pub const CHATOPS_IGNORE_END: &str = "<!-- vigil-chatops-ignore-end -->";

/// Body of the warning posted when the inline comment ceiling is reached.
///
/// The text doubles as the marker used to find earlier warnings, so it must
/// not change between releases.
pub const REVIEW_COMMENTS_CEILING_MARKER: &str = "Total number of active review comments per \
     pull request has been reached and some comments might not appear as a result. Please \
     resolve some issues to see more";

/// Message attached when dismissing a review whose comments are all obsolete.
pub const STALE_REVIEW_DISMISSAL_MESSAGE: &str =
    "Dismissing review as all inline comments are obsolete by now";

/// Default body of the approval review.
pub const DEFAULT_APPROVAL_MESSAGE: &str =
    "Automated scan found no issues in the files changed by this pull request.";

/// Removes chat-ops ignore markers from text about to be posted.
///
/// # Example
///
/// ```
/// use vigil::forge::messages::{CHATOPS_IGNORE_END, CHATOPS_IGNORE_START, strip_chatops_markers};
///
/// let text = format!("{CHATOPS_IGNORE_START}details{CHATOPS_IGNORE_END} done");
/// assert_eq!(strip_chatops_markers(&text), "details done");
/// ```
#[must_use]
pub fn strip_chatops_markers(text: &str) -> String {
    text.replace(CHATOPS_IGNORE_START, "")
        .replace(CHATOPS_IGNORE_END, "")
}
