//! Forge objects the bot reads and writes.
//!
//! Types prefixed with `Api` are private deserialisation targets matching the
//! REST payloads; they convert into the public domain types at the boundary
//! so nothing past the client ever handles raw JSON.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::ForgeError;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Open pull request as seen during discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    /// Pull request number.
    pub number: u64,
    /// Title, for logging.
    pub title: Option<String>,
    /// Author login, for logging.
    pub author: Option<String>,
    /// SHA of the head commit.
    pub head_sha: String,
    /// Head branch name; absent when the head repository was deleted.
    pub head_ref: Option<String>,
    /// Whether the pull request is a draft.
    pub draft: bool,
}

/// Where an inline review comment sits in the current diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentAnchor {
    /// The comment still points at a line in the latest diff.
    Anchored {
        /// Diff position the comment is attached to.
        position: u32,
    },
    /// The code the comment referred to has changed since.
    Obsolete,
}

impl CommentAnchor {
    /// Builds an anchor from the nullable position the forge reports.
    #[must_use]
    pub const fn from_position(position: Option<u32>) -> Self {
        match position {
            Some(value) => Self::Anchored { position: value },
            None => Self::Obsolete,
        }
    }

    /// Diff position, when anchored.
    #[must_use]
    pub const fn position(self) -> Option<u32> {
        match self {
            Self::Anchored { position } => Some(position),
            Self::Obsolete => None,
        }
    }
}

/// Inline review comment on a pull request diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewComment {
    /// Comment identifier.
    pub id: u64,
    /// File path the comment is attached to.
    pub path: String,
    /// Position in the current diff, or obsolete.
    pub anchor: CommentAnchor,
    /// Comment body.
    pub body: String,
    /// Author login.
    pub author: Option<String>,
    /// Review the comment was submitted with, if any.
    pub review_id: Option<u64>,
    /// Commit the comment is currently attached to.
    pub commit_id: Option<String>,
    /// Commit the comment was originally made against.
    pub original_commit_id: Option<String>,
}

impl ReviewComment {
    /// Returns true when the comment still anchors to the current diff.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.anchor, CommentAnchor::Anchored { .. })
    }

    /// `path:position` key used to match comments against issues.
    #[must_use]
    pub fn location_key(&self) -> Option<String> {
        self.anchor
            .position()
            .map(|position| location_key(&self.path, position))
    }
}

/// Formats the `path:position` key shared by comments and issues.
#[must_use]
pub fn location_key(path: &str, position: u32) -> String {
    format!("{path}:{position}")
}

/// State of a submitted review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReviewState {
    /// The reviewer asked for changes.
    ChangesRequested,
    /// The reviewer left comments only.
    Commented,
    /// The reviewer approved.
    Approved,
    /// The review was dismissed.
    Dismissed,
    /// The review has not been submitted yet.
    Pending,
    /// Any state this crate does not model.
    Other,
}

impl ReviewState {
    /// Parses the upper-case state string used by the REST API.
    #[must_use]
    pub fn from_api(value: &str) -> Self {
        match value {
            "CHANGES_REQUESTED" => Self::ChangesRequested,
            "COMMENTED" => Self::Commented,
            "APPROVED" => Self::Approved,
            "DISMISSED" => Self::Dismissed,
            "PENDING" => Self::Pending,
            _ => Self::Other,
        }
    }

    /// State string as used by the REST API.
    #[must_use]
    pub const fn as_api_str(self) -> &'static str {
        match self {
            Self::ChangesRequested => "CHANGES_REQUESTED",
            Self::Commented => "COMMENTED",
            Self::Approved => "APPROVED",
            Self::Dismissed => "DISMISSED",
            Self::Pending => "PENDING",
            Self::Other => "OTHER",
        }
    }
}

/// Submitted review on a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
    /// Review identifier.
    pub id: u64,
    /// Author login.
    pub author: Option<String>,
    /// Review state.
    pub state: ReviewState,
    /// Commit the review was submitted against.
    pub commit_id: Option<String>,
}

/// Conversation comment on a pull request (an issue comment).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericComment {
    /// Comment identifier.
    pub id: u64,
    /// Comment body.
    pub body: String,
    /// Author login.
    pub author: Option<String>,
}

/// Issue/pull request label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    /// Label name.
    pub name: String,
}

/// Identity behind the configured token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// Login name.
    pub login: String,
    /// Numeric user id.
    pub id: u64,
}

/// One file touched by a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitFile {
    /// Path after the commit.
    pub filename: String,
    /// Change status (`added`, `modified`, `renamed`, …).
    pub status: String,
    /// Path before a rename.
    pub previous_filename: Option<String>,
}

/// Commit details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    /// Commit SHA.
    pub sha: String,
    /// Files changed by the commit.
    pub files: Vec<CommitFile>,
}

/// User that triggered an issue event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventActor {
    /// Login name.
    pub login: String,
    /// Numeric user id.
    pub id: u64,
}

/// Timeline event on an issue or pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueEvent {
    /// Event identifier.
    pub id: u64,
    /// Event type (`review_dismissed`, `labeled`, …).
    pub event: String,
    /// User that caused the event.
    pub actor: Option<EventActor>,
    /// Review dismissed by a `review_dismissed` event.
    pub dismissed_review_id: Option<u64>,
}

/// Organisation team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    /// Team identifier.
    pub id: u64,
    /// URL-safe team slug.
    pub slug: String,
    /// Display name.
    pub name: String,
}

/// Member of an organisation team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamMember {
    /// Login name.
    pub login: String,
    /// Numeric user id.
    pub id: u64,
}

/// Permission flags reported for a collaborator.
///
/// A flag the forge did not report is `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Permissions {
    /// Administrative access.
    pub admin: Option<bool>,
    /// Write access.
    pub push: Option<bool>,
    /// Read access.
    pub pull: Option<bool>,
}

/// Repository collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collaborator {
    /// Login name.
    pub login: String,
    /// Numeric user id.
    pub id: u64,
    /// Permission flags, when reported.
    pub permissions: Option<Permissions>,
}

/// State of a commit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitState {
    /// The check errored.
    Error,
    /// The check failed.
    Failure,
    /// The check is running.
    Pending,
    /// The check passed.
    Success,
}

impl CommitState {
    /// State string as used by the REST API.
    #[must_use]
    pub const fn as_api_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Failure => "failure",
            Self::Pending => "pending",
            Self::Success => "success",
        }
    }
}

/// Event a review is submitted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewEvent {
    /// Plain comments.
    Comment,
    /// Comments that block merging.
    RequestChanges,
    /// Approval.
    Approve,
}

impl ReviewEvent {
    /// Event string as used by the REST API.
    #[must_use]
    pub const fn as_api_str(self) -> &'static str {
        match self {
            Self::Comment => "COMMENT",
            Self::RequestChanges => "REQUEST_CHANGES",
            Self::Approve => "APPROVE",
        }
    }
}

/// Inline comment to include in a new review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftReviewComment {
    /// File path.
    pub path: String,
    /// Diff position.
    pub position: u32,
    /// Comment body.
    pub body: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiUser {
    login: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiIdentifiedUser {
    login: String,
    id: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiHead {
    sha: String,
    #[serde(rename = "ref")]
    reference: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiPullRequest {
    number: u64,
    title: Option<String>,
    user: Option<ApiUser>,
    head: ApiHead,
    #[serde(default)]
    draft: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiReviewComment {
    id: u64,
    #[serde(default)]
    path: String,
    position: Option<u32>,
    #[serde(default)]
    body: String,
    user: Option<ApiUser>,
    pull_request_review_id: Option<u64>,
    commit_id: Option<String>,
    original_commit_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiReview {
    id: u64,
    user: Option<ApiUser>,
    state: String,
    commit_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiGenericComment {
    id: u64,
    #[serde(default)]
    body: String,
    user: Option<ApiUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiLabel {
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiAuthenticatedUser {
    login: String,
    id: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiCommitFile {
    filename: String,
    status: String,
    previous_filename: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiCommit {
    sha: String,
    #[serde(default)]
    files: Vec<ApiCommitFile>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiPullRequestCommit {
    sha: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiDismissedReview {
    review_id: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiIssueEvent {
    id: u64,
    event: String,
    actor: Option<ApiIdentifiedUser>,
    dismissed_review: Option<ApiDismissedReview>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiTeam {
    id: u64,
    slug: String,
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiPermissions {
    admin: Option<bool>,
    push: Option<bool>,
    pull: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiCollaborator {
    login: String,
    id: u64,
    permissions: Option<ApiPermissions>,
}

fn login_of(user: Option<ApiUser>) -> Option<String> {
    user.and_then(|value| value.login)
}

impl From<ApiPullRequest> for PullRequest {
    fn from(value: ApiPullRequest) -> Self {
        Self {
            number: value.number,
            title: value.title,
            author: login_of(value.user),
            head_sha: value.head.sha,
            head_ref: value.head.reference,
            draft: value.draft.unwrap_or(false),
        }
    }
}

impl From<ApiReviewComment> for ReviewComment {
    fn from(value: ApiReviewComment) -> Self {
        Self {
            id: value.id,
            path: value.path,
            anchor: CommentAnchor::from_position(value.position),
            body: value.body,
            author: login_of(value.user),
            review_id: value.pull_request_review_id,
            commit_id: value.commit_id,
            original_commit_id: value.original_commit_id,
        }
    }
}

impl From<ApiReview> for Review {
    fn from(value: ApiReview) -> Self {
        Self {
            id: value.id,
            author: login_of(value.user),
            state: ReviewState::from_api(&value.state),
            commit_id: value.commit_id,
        }
    }
}

impl From<ApiGenericComment> for GenericComment {
    fn from(value: ApiGenericComment) -> Self {
        Self {
            id: value.id,
            body: value.body,
            author: login_of(value.user),
        }
    }
}

impl From<ApiLabel> for Label {
    fn from(value: ApiLabel) -> Self {
        Self { name: value.name }
    }
}

impl From<ApiAuthenticatedUser> for AuthenticatedUser {
    fn from(value: ApiAuthenticatedUser) -> Self {
        Self {
            login: value.login,
            id: value.id,
        }
    }
}

impl From<ApiPullRequestCommit> for String {
    fn from(value: ApiPullRequestCommit) -> Self {
        value.sha
    }
}

impl From<ApiCommit> for CommitInfo {
    fn from(value: ApiCommit) -> Self {
        Self {
            sha: value.sha,
            files: value
                .files
                .into_iter()
                .map(|file| CommitFile {
                    filename: file.filename,
                    status: file.status,
                    previous_filename: file.previous_filename,
                })
                .collect(),
        }
    }
}

impl From<ApiIssueEvent> for IssueEvent {
    fn from(value: ApiIssueEvent) -> Self {
        Self {
            id: value.id,
            event: value.event,
            actor: value.actor.map(|actor| EventActor {
                login: actor.login,
                id: actor.id,
            }),
            dismissed_review_id: value.dismissed_review.map(|review| review.review_id),
        }
    }
}

impl From<ApiTeam> for Team {
    fn from(value: ApiTeam) -> Self {
        Self {
            id: value.id,
            slug: value.slug,
            name: value.name,
        }
    }
}

impl From<ApiIdentifiedUser> for TeamMember {
    fn from(value: ApiIdentifiedUser) -> Self {
        Self {
            login: value.login,
            id: value.id,
        }
    }
}

impl From<ApiCollaborator> for Collaborator {
    fn from(value: ApiCollaborator) -> Self {
        Self {
            login: value.login,
            id: value.id,
            permissions: value.permissions.map(|flags| Permissions {
                admin: flags.admin,
                push: flags.push,
                pull: flags.pull,
            }),
        }
    }
}

/// Decodes one JSON value into a domain type through its wire type.
pub(crate) fn decode_one<A, D>(operation: &str, value: Value) -> Result<D, ForgeError>
where
    A: DeserializeOwned,
    D: From<A>,
{
    serde_json::from_value::<A>(value)
        .map(D::from)
        .map_err(|error| ForgeError::Decode {
            operation: operation.to_owned(),
            message: error.to_string(),
        })
}

/// Decodes a list of JSON values into domain types.
pub(crate) fn decode_list<A, D>(operation: &str, values: Vec<Value>) -> Result<Vec<D>, ForgeError>
where
    A: DeserializeOwned,
    D: From<A>,
{
    values
        .into_iter()
        .map(|value| decode_one::<A, D>(operation, value))
        .collect()
}

/// Decodes a cached JSON array into domain types.
pub(crate) fn decode_array<A, D>(operation: &str, value: Value) -> Result<Vec<D>, ForgeError>
where
    A: DeserializeOwned,
    D: From<A>,
{
    match value {
        Value::Array(values) => decode_list::<A, D>(operation, values),
        other => Err(ForgeError::Decode {
            operation: operation.to_owned(),
            message: format!("expected a JSON array, got {other}"),
        }),
    }
}
