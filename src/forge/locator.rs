//! Repository identity wrappers and API path construction.

use std::fmt;

use url::{Url, form_urlencoded};

use super::error::ForgeError;

/// Default REST API base for github.com.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Repository owner wrapper to avoid stringly typed parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryOwner(String);

impl RepositoryOwner {
    pub(crate) fn new(value: &str) -> Result<Self, ForgeError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ForgeError::InvalidRepository);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the owner value.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Repository name wrapper to prevent parameter mix-ups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryName(String);

impl RepositoryName {
    pub(crate) fn new(value: &str) -> Result<Self, ForgeError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ForgeError::InvalidRepository);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the repository name.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Personal access token wrapper enforcing presence.
#[derive(Clone, PartialEq, Eq)]
pub struct PersonalAccessToken(String);

impl PersonalAccessToken {
    /// Validates that the token is non-empty and trims whitespace.
    ///
    /// # Errors
    ///
    /// Returns `ForgeError::MissingToken` when the supplied string is blank.
    pub fn new(token: impl AsRef<str>) -> Result<Self, ForgeError> {
        let trimmed = token.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ForgeError::MissingToken);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the token value.
    #[must_use]
    pub const fn value(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for PersonalAccessToken {
    fn as_ref(&self) -> &str {
        self.value()
    }
}

// Tokens end up in tracing fields through derived Debug impls of callers.
impl fmt::Debug for PersonalAccessToken {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("PersonalAccessToken(***)")
    }
}

/// Relative REST API path with an optional query string.
///
/// Path segments are percent-encoded individually, so branch names, label
/// names and logins containing `/`, spaces or other reserved characters stay
/// inside their segment.
///
/// # Example
///
/// ```
/// use vigil::forge::locator::ApiPath;
///
/// let path = ApiPath::new(["repos", "octo", "cat", "issues", "7", "labels", "needs review"])
///     .with_query("page", "1");
/// assert_eq!(
///     path.to_string(),
///     "/repos/octo/cat/issues/7/labels/needs%20review?page=1"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ApiPath {
    segments: Vec<String>,
    query: Vec<(String, String)>,
}

impl ApiPath {
    /// Builds a path from raw, unencoded segments.
    #[must_use]
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
            query: Vec::new(),
        }
    }

    /// Appends a query parameter.
    #[must_use]
    pub fn with_query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_owned(), value.into()));
        self
    }

    /// Raw path segments, in order.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Raw query parameters, in insertion order.
    #[must_use]
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// Returns the value of the first query parameter named `key`.
    #[must_use]
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }
}

fn encode_segment(segment: &str) -> String {
    form_urlencoded::byte_serialize(segment.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

impl fmt::Display for ApiPath {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(formatter, "/{}", encode_segment(segment))?;
        }

        if !self.query.is_empty() {
            let query = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(self.query.iter())
                .finish();
            write!(formatter, "?{query}")?;
        }

        Ok(())
    }
}

/// Repository the bot operates on, plus the API base it talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryLocator {
    api_base: Url,
    owner: RepositoryOwner,
    repository: RepositoryName,
}

impl RepositoryLocator {
    /// Creates a locator for `owner/repo` on github.com.
    ///
    /// # Errors
    ///
    /// Returns `ForgeError::InvalidRepository` when owner or repo is empty.
    pub fn from_owner_repo(owner: &str, repo: &str) -> Result<Self, ForgeError> {
        Self::with_api_base(owner, repo, DEFAULT_API_BASE)
    }

    /// Creates a locator for `owner/repo` served by the given API base, such
    /// as a GitHub Enterprise `https://host/api/v3` endpoint.
    ///
    /// # Errors
    ///
    /// Returns `ForgeError::InvalidRepository` when owner or repo is empty and
    /// `ForgeError::InvalidUrl` when the API base cannot be parsed.
    pub fn with_api_base(owner: &str, repo: &str, api_base: &str) -> Result<Self, ForgeError> {
        let validated_owner = RepositoryOwner::new(owner)?;
        let repository = RepositoryName::new(repo)?;
        let parsed_base =
            Url::parse(api_base).map_err(|error| ForgeError::InvalidUrl(error.to_string()))?;

        Ok(Self {
            api_base: parsed_base,
            owner: validated_owner,
            repository,
        })
    }

    /// API base URL.
    #[must_use]
    pub const fn api_base(&self) -> &Url {
        &self.api_base
    }

    /// Repository owner.
    #[must_use]
    pub const fn owner(&self) -> &RepositoryOwner {
        &self.owner
    }

    /// Repository name.
    #[must_use]
    pub const fn repository(&self) -> &RepositoryName {
        &self.repository
    }

    fn repo_path<const N: usize>(&self, tail: [&str; N]) -> ApiPath {
        let mut segments = vec![
            "repos".to_owned(),
            self.owner.as_str().to_owned(),
            self.repository.as_str().to_owned(),
        ];
        segments.extend(tail.iter().map(|segment| (*segment).to_owned()));
        ApiPath::new(segments)
    }

    pub(crate) fn pulls_path(&self) -> ApiPath {
        self.repo_path(["pulls"])
    }

    pub(crate) fn repository_review_comments_path(&self) -> ApiPath {
        self.repo_path(["pulls", "comments"])
    }

    pub(crate) fn review_comment_path(&self, comment_id: u64) -> ApiPath {
        self.repo_path(["pulls", "comments", &comment_id.to_string()])
    }

    pub(crate) fn pull_review_comments_path(&self, pr_number: u64) -> ApiPath {
        self.repo_path(["pulls", &pr_number.to_string(), "comments"])
    }

    pub(crate) fn pull_request_commits_path(&self, pr_number: u64) -> ApiPath {
        self.repo_path(["pulls", &pr_number.to_string(), "commits"])
    }

    pub(crate) fn pull_reviews_path(&self, pr_number: u64) -> ApiPath {
        self.repo_path(["pulls", &pr_number.to_string(), "reviews"])
    }

    pub(crate) fn review_dismissal_path(&self, pr_number: u64, review_id: u64) -> ApiPath {
        self.repo_path([
            "pulls",
            &pr_number.to_string(),
            "reviews",
            &review_id.to_string(),
            "dismissals",
        ])
    }

    pub(crate) fn issue_comments_path(&self, pr_number: u64) -> ApiPath {
        self.repo_path(["issues", &pr_number.to_string(), "comments"])
    }

    pub(crate) fn issue_comment_path(&self, comment_id: u64) -> ApiPath {
        self.repo_path(["issues", "comments", &comment_id.to_string()])
    }

    pub(crate) fn issue_labels_path(&self, pr_number: u64) -> ApiPath {
        self.repo_path(["issues", &pr_number.to_string(), "labels"])
    }

    pub(crate) fn issue_label_path(&self, pr_number: u64, label: &str) -> ApiPath {
        self.repo_path(["issues", &pr_number.to_string(), "labels", label])
    }

    pub(crate) fn issue_events_path(&self, pr_number: u64) -> ApiPath {
        self.repo_path(["issues", &pr_number.to_string(), "events"])
    }

    pub(crate) fn commit_path(&self, commit_id: &str) -> ApiPath {
        self.repo_path(["commits", commit_id])
    }

    pub(crate) fn statuses_path(&self, commit_id: &str) -> ApiPath {
        self.repo_path(["statuses", commit_id])
    }

    pub(crate) fn collaborators_path(&self) -> ApiPath {
        self.repo_path(["collaborators"])
    }
}

pub(crate) fn authenticated_user_path() -> ApiPath {
    ApiPath::new(["user"])
}

pub(crate) fn rate_limit_path() -> ApiPath {
    ApiPath::new(["rate_limit"])
}

pub(crate) fn org_teams_path(org: &str) -> ApiPath {
    ApiPath::new(["orgs", org, "teams"])
}

pub(crate) fn team_members_path(org: &str, team_slug: &str) -> ApiPath {
    ApiPath::new(["orgs", org, "teams", team_slug, "members"])
}
