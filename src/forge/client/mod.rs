//! Cached read operations against one repository.
//!
//! [`ForgeClient`] owns the transport, the response cache and the repository
//! locator. Listings are cached as raw JSON keyed by the operation and its
//! request arguments, then decoded and filtered per call, so two calls that
//! differ only in their filter share one forge round trip. Passing
//! `skip_cache = true` forces a fresh request and refreshes the stored entry.

use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Value, json};
use tracing::{debug, info};

use super::cache::{CacheKey, InMemoryResponseCache, ResponseCache};
use super::error::ForgeError;
use super::filter::{
    AuthorFilter, CommentFilter, EventFilter, LoginSelector, PermissionFilter, ReviewFilter,
    TeamFilter, retain_matching,
};
use super::locator::{
    ApiPath, RepositoryLocator, authenticated_user_path, org_teams_path, rate_limit_path,
    team_members_path,
};
use super::models::{
    ApiAuthenticatedUser, ApiCollaborator, ApiCommit, ApiGenericComment, ApiIdentifiedUser,
    ApiIssueEvent, ApiLabel, ApiPullRequestCommit, ApiReview, ApiReviewComment, ApiTeam, AuthenticatedUser,
    Collaborator, CommitInfo, GenericComment, IssueEvent, Label, Review, ReviewComment,
    ReviewState, Team, TeamMember, decode_array, decode_one,
};
use super::pacing::PacingPolicy;
use super::pagination::{PageFailurePolicy, fetch_all_pages};
use super::rate_limit::{ApiRateLimitResponse, RateLimitInfo};
use super::transport::ForgeTransport;

/// Author and anchor constraints for a review comment listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentQuery {
    /// Author to keep.
    pub login: Option<LoginSelector>,
    /// Active flag to keep.
    pub active: Option<bool>,
}

/// Author and state constraints for a review listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewQuery {
    /// Author to keep.
    pub login: Option<LoginSelector>,
    /// States to keep; empty keeps every state.
    pub states: Vec<ReviewState>,
}

/// Collaborator affiliation accepted by the collaborators listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CollaboratorAffiliation {
    /// Outside collaborators only.
    Outside,
    /// Collaborators with direct repository access.
    Direct,
    /// Every collaborator.
    #[default]
    All,
}

impl CollaboratorAffiliation {
    const fn as_api_str(self) -> &'static str {
        match self {
            Self::Outside => "outside",
            Self::Direct => "direct",
            Self::All => "all",
        }
    }
}

/// Forge access for a single repository within one run.
pub struct ForgeClient<T, C = InMemoryResponseCache> {
    transport: T,
    cache: C,
    locator: RepositoryLocator,
    pacing: PacingPolicy,
}

impl<T> ForgeClient<T, InMemoryResponseCache>
where
    T: ForgeTransport,
{
    /// Creates a client with a fresh in-memory cache and default pacing.
    #[must_use]
    pub fn new(transport: T, locator: RepositoryLocator) -> Self {
        Self::with_cache(transport, InMemoryResponseCache::new(), locator)
    }
}

impl<T, C> ForgeClient<T, C>
where
    T: ForgeTransport,
    C: ResponseCache,
{
    /// Creates a client around an explicit cache.
    #[must_use]
    pub fn with_cache(transport: T, cache: C, locator: RepositoryLocator) -> Self {
        Self {
            transport,
            cache,
            locator,
            pacing: PacingPolicy::default(),
        }
    }

    /// Replaces the pacing policy.
    #[must_use]
    pub fn with_pacing(mut self, pacing: PacingPolicy) -> Self {
        self.pacing = pacing;
        self
    }

    /// Repository this client operates on.
    #[must_use]
    pub const fn locator(&self) -> &RepositoryLocator {
        &self.locator
    }

    /// Underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Pacing policy in effect.
    #[must_use]
    pub const fn pacing(&self) -> PacingPolicy {
        self.pacing
    }

    /// Drops every cached response.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    fn repo_key(&self, operation: &str, extra: Value) -> CacheKey {
        CacheKey::new(
            operation,
            json!([
                self.locator.owner().as_str(),
                self.locator.repository().as_str(),
                extra
            ]),
        )
    }

    /// Returns the cached value for `key`, or awaits `fetch` and stores it.
    pub(crate) async fn memoised<F>(
        &self,
        key: CacheKey,
        skip_cache: bool,
        fetch: F,
    ) -> Result<Value, ForgeError>
    where
        F: Future<Output = Result<Value, ForgeError>>,
    {
        if !skip_cache && let Some(hit) = self.cache.get(&key) {
            debug!(key = key.as_str(), cached = true, "forge read");
            return Ok(hit);
        }

        let fresh = fetch.await?;
        debug!(key = key.as_str(), cached = false, skip_cache, "forge read");
        Ok(self.cache.set(key, fresh))
    }

    pub(crate) async fn list_all(
        &self,
        endpoint: &ApiPath,
        policy: PageFailurePolicy,
        page_delay: Duration,
    ) -> Result<Value, ForgeError> {
        fetch_all_pages(&self.transport, endpoint, policy, page_delay)
            .await
            .map(Value::Array)
    }

    /// Identity behind the configured token.
    ///
    /// # Errors
    ///
    /// Propagates transport and decode failures.
    pub async fn authenticated_user(&self) -> Result<AuthenticatedUser, ForgeError> {
        let path = authenticated_user_path();
        let value = self
            .memoised(
                CacheKey::new("authenticated_user", json!([])),
                false,
                self.transport.get(&path),
            )
            .await?;
        decode_one::<ApiAuthenticatedUser, AuthenticatedUser>("authenticated user", value)
    }

    /// Resolves a login selector, looking up the token holder when needed.
    ///
    /// # Errors
    ///
    /// Propagates failures from [`Self::authenticated_user`].
    pub async fn resolve_login(&self, selector: &LoginSelector) -> Result<String, ForgeError> {
        let LoginSelector::Literal(login) = selector else {
            return Ok(selector.resolve(&self.authenticated_user().await?));
        };
        Ok(login.clone())
    }

    async fn resolve_optional(
        &self,
        selector: Option<&LoginSelector>,
    ) -> Result<Option<String>, ForgeError> {
        match selector {
            Some(value) => self.resolve_login(value).await.map(Some),
            None => Ok(None),
        }
    }

    /// Current rate limit window. Never cached.
    ///
    /// # Errors
    ///
    /// Propagates transport and decode failures.
    pub async fn rate_limit_usage(&self) -> Result<RateLimitInfo, ForgeError> {
        let value = self.transport.get(&rate_limit_path()).await?;
        let parsed: ApiRateLimitResponse =
            serde_json::from_value(value).map_err(|error| ForgeError::Decode {
                operation: "rate limit".to_owned(),
                message: error.to_string(),
            })?;
        let info = RateLimitInfo::from(parsed.rate);
        info!(
            limit = info.limit(),
            remaining = info.remaining(),
            used = info.used(),
            reset_at = info.reset_at(),
            "forge rate limit usage"
        );
        Ok(info)
    }

    /// Commit details, including changed files.
    ///
    /// # Errors
    ///
    /// Returns [`ForgeError::CommitNotFound`] when the forge answers 404 or
    /// 422 for the commit, and propagates other failures.
    pub async fn commit_info(&self, commit_id: &str) -> Result<CommitInfo, ForgeError> {
        let path = self.locator.commit_path(commit_id);
        let fetched = self
            .memoised(
                self.repo_key("commit_info", json!([commit_id])),
                false,
                self.transport.get(&path),
            )
            .await;

        let value = fetched.map_err(|error| match error {
            ForgeError::Api {
                status: 404 | 422, ..
            } => ForgeError::CommitNotFound {
                commit_id: commit_id.to_owned(),
            },
            other => other,
        })?;
        decode_one::<ApiCommit, CommitInfo>("commit info", value)
    }

    /// SHAs of the commits on a pull request, oldest first.
    ///
    /// # Errors
    ///
    /// Propagates transport, pagination and decode failures.
    pub async fn pull_request_commits(&self, pr_number: u64) -> Result<Vec<String>, ForgeError> {
        let endpoint = self.locator.pull_request_commits_path(pr_number);
        let value = self
            .memoised(
                self.repo_key("pull_request_commits", json!([pr_number])),
                false,
                self.list_all(&endpoint, PageFailurePolicy::Abort, Duration::ZERO),
            )
            .await?;
        decode_array::<ApiPullRequestCommit, String>("pull request commits", value)
    }

    /// Review comments on a pull request.
    ///
    /// # Errors
    ///
    /// Propagates transport, pagination and decode failures.
    pub async fn review_comments(
        &self,
        pr_number: u64,
        query: &CommentQuery,
        skip_cache: bool,
    ) -> Result<Vec<ReviewComment>, ForgeError> {
        let login = self.resolve_optional(query.login.as_ref()).await?;
        let endpoint = self.locator.pull_review_comments_path(pr_number);
        let value = self
            .memoised(
                self.repo_key("pull_review_comments", json!([pr_number])),
                skip_cache,
                self.list_all(&endpoint, PageFailurePolicy::Abort, Duration::ZERO),
            )
            .await?;
        let comments =
            decode_array::<ApiReviewComment, ReviewComment>("review comments", value)?;

        let filter = CommentFilter {
            login,
            active: query.active,
        };
        Ok(retain_matching(&comments, &filter))
    }

    /// Active review comments made against `commit_id` across the whole
    /// repository since `since`, indexed by `path:position`.
    ///
    /// Failed pages are treated as empty so a partial index is still
    /// returned.
    ///
    /// # Errors
    ///
    /// Propagates decode failures.
    pub async fn repository_review_comments_since(
        &self,
        commit_id: &str,
        since: DateTime<Utc>,
    ) -> Result<BTreeMap<String, Vec<ReviewComment>>, ForgeError> {
        let since_text = since.to_rfc3339_opts(SecondsFormat::Secs, true);
        let endpoint = self
            .locator
            .repository_review_comments_path()
            .with_query("sort", "created")
            .with_query("direction", "asc")
            .with_query("since", since_text.clone());
        let value = self
            .memoised(
                self.repo_key("repository_review_comments", json!([commit_id, since_text])),
                false,
                self.list_all(&endpoint, PageFailurePolicy::TreatAsEmpty, Duration::ZERO),
            )
            .await?;
        let comments =
            decode_array::<ApiReviewComment, ReviewComment>("repository review comments", value)?;

        let mut index: BTreeMap<String, Vec<ReviewComment>> = BTreeMap::new();
        for comment in comments {
            if comment.original_commit_id.as_deref() != Some(commit_id) {
                continue;
            }
            if let Some(key) = comment.location_key() {
                index.entry(key).or_default().push(comment);
            }
        }
        Ok(index)
    }

    /// Conversation comments on a pull request, optionally by one author.
    ///
    /// # Errors
    ///
    /// Propagates transport, pagination and decode failures.
    pub async fn generic_comments(
        &self,
        pr_number: u64,
        author: Option<&LoginSelector>,
        skip_cache: bool,
    ) -> Result<Vec<GenericComment>, ForgeError> {
        let login = self.resolve_optional(author).await?;
        let endpoint = self.locator.issue_comments_path(pr_number);
        let value = self
            .memoised(
                self.repo_key("issue_comments", json!([pr_number])),
                skip_cache,
                self.list_all(&endpoint, PageFailurePolicy::Abort, Duration::ZERO),
            )
            .await?;
        let comments =
            decode_array::<ApiGenericComment, GenericComment>("issue comments", value)?;

        Ok(retain_matching(&comments, &AuthorFilter { login }))
    }

    /// Reviews submitted on a pull request.
    ///
    /// # Errors
    ///
    /// Propagates transport, pagination and decode failures.
    pub async fn reviews(
        &self,
        pr_number: u64,
        query: &ReviewQuery,
        skip_cache: bool,
    ) -> Result<Vec<Review>, ForgeError> {
        let login = self.resolve_optional(query.login.as_ref()).await?;
        let endpoint = self.locator.pull_reviews_path(pr_number);
        let value = self
            .memoised(
                self.repo_key("pull_reviews", json!([pr_number])),
                skip_cache,
                self.list_all(&endpoint, PageFailurePolicy::Abort, Duration::ZERO),
            )
            .await?;
        let reviews = decode_array::<ApiReview, Review>("reviews", value)?;

        let filter = ReviewFilter {
            login,
            states: query.states.clone(),
        };
        Ok(retain_matching(&reviews, &filter))
    }

    /// Labels attached to a pull request.
    ///
    /// # Errors
    ///
    /// Propagates transport, pagination and decode failures.
    pub async fn labels(&self, pr_number: u64, skip_cache: bool) -> Result<Vec<Label>, ForgeError> {
        let endpoint = self.locator.issue_labels_path(pr_number);
        let value = self
            .memoised(
                self.repo_key("issue_labels", json!([pr_number])),
                skip_cache,
                self.list_all(&endpoint, PageFailurePolicy::Abort, Duration::ZERO),
            )
            .await?;
        decode_array::<ApiLabel, Label>("labels", value)
    }

    /// Looks up a label on a pull request by exact name.
    ///
    /// # Errors
    ///
    /// Propagates failures from [`Self::labels`].
    pub async fn find_label(
        &self,
        pr_number: u64,
        name: &str,
        skip_cache: bool,
    ) -> Result<Option<Label>, ForgeError> {
        let labels = self.labels(pr_number, skip_cache).await?;
        Ok(labels.into_iter().find(|label| label.name == name))
    }

    /// Timeline events on a pull request.
    ///
    /// Failed pages are treated as empty.
    ///
    /// # Errors
    ///
    /// Propagates decode failures.
    pub async fn issue_events(
        &self,
        pr_number: u64,
        filter: &EventFilter,
        skip_cache: bool,
    ) -> Result<Vec<IssueEvent>, ForgeError> {
        let endpoint = self.locator.issue_events_path(pr_number);
        let value = self
            .memoised(
                self.repo_key("issue_events", json!([pr_number])),
                skip_cache,
                self.list_all(&endpoint, PageFailurePolicy::TreatAsEmpty, Duration::ZERO),
            )
            .await?;
        let events = decode_array::<ApiIssueEvent, IssueEvent>("issue events", value)?;
        Ok(retain_matching(&events, filter))
    }

    /// Ids of reviews dismissed by events matching `filter`.
    ///
    /// # Errors
    ///
    /// Propagates failures from [`Self::issue_events`].
    pub async fn dismissed_review_ids(
        &self,
        pr_number: u64,
        filter: &EventFilter,
        skip_cache: bool,
    ) -> Result<Vec<u64>, ForgeError> {
        let events = self.issue_events(pr_number, filter, skip_cache).await?;
        Ok(events
            .into_iter()
            .filter_map(|event| event.dismissed_review_id)
            .collect())
    }

    /// Teams in an organisation.
    ///
    /// # Errors
    ///
    /// Propagates transport, pagination and decode failures.
    pub async fn org_teams(&self, org: &str, filter: &TeamFilter) -> Result<Vec<Team>, ForgeError> {
        let endpoint = org_teams_path(org);
        let value = self
            .memoised(
                CacheKey::new("org_teams", json!([org])),
                false,
                self.list_all(&endpoint, PageFailurePolicy::Abort, Duration::ZERO),
            )
            .await?;
        let teams = decode_array::<ApiTeam, Team>("org teams", value)?;
        Ok(retain_matching(&teams, filter))
    }

    /// Members of one organisation team.
    ///
    /// # Errors
    ///
    /// Propagates transport, pagination and decode failures.
    pub async fn team_members(
        &self,
        org: &str,
        team_slug: &str,
    ) -> Result<Vec<TeamMember>, ForgeError> {
        let endpoint = team_members_path(org, team_slug);
        let value = self
            .memoised(
                CacheKey::new("team_members", json!([org, team_slug])),
                false,
                self.list_all(&endpoint, PageFailurePolicy::Abort, Duration::ZERO),
            )
            .await?;
        decode_array::<ApiIdentifiedUser, TeamMember>("team members", value)
    }

    /// Distinct member ids across several teams, in first-seen order.
    ///
    /// # Errors
    ///
    /// Propagates failures from [`Self::team_members`].
    pub async fn team_member_ids(
        &self,
        org: &str,
        team_slugs: &[String],
    ) -> Result<Vec<u64>, ForgeError> {
        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        for slug in team_slugs {
            for member in self.team_members(org, slug).await? {
                if seen.insert(member.id) {
                    ids.push(member.id);
                }
            }
        }
        Ok(ids)
    }

    /// Repository collaborators.
    ///
    /// # Errors
    ///
    /// Propagates transport, pagination and decode failures.
    pub async fn collaborators(
        &self,
        affiliation: CollaboratorAffiliation,
        filter: &PermissionFilter,
    ) -> Result<Vec<Collaborator>, ForgeError> {
        let endpoint = self
            .locator
            .collaborators_path()
            .with_query("affiliation", affiliation.as_api_str());
        let value = self
            .memoised(
                self.repo_key("collaborators", json!([affiliation.as_api_str()])),
                false,
                self.list_all(&endpoint, PageFailurePolicy::Abort, Duration::ZERO),
            )
            .await?;
        let collaborators = decode_array::<ApiCollaborator, Collaborator>("collaborators", value)?;
        Ok(retain_matching(&collaborators, filter))
    }
}
