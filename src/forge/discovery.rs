//! Finding the open pull requests a commit belongs to.

use std::collections::BTreeMap;

use serde_json::{Value, json};
use tracing::info;

use super::cache::{CacheKey, ResponseCache};
use super::client::ForgeClient;
use super::error::ForgeError;
use super::models::{ApiPullRequest, PullRequest, decode_array};
use super::pacing::{RetryPolicy, pause};
use super::pagination::PageFailurePolicy;
use super::transport::ForgeTransport;

/// Open pull requests keyed by number.
pub type ImplicatedPullRequests = BTreeMap<u64, PullRequest>;

fn is_implicated(pr: &PullRequest, commit_id: &str, branches_ignore: &[String]) -> bool {
    let Some(head_ref) = pr.head_ref.as_deref() else {
        return false;
    };
    if branches_ignore.iter().any(|branch| branch == head_ref) {
        return false;
    }
    pr.head_sha == commit_id
}

impl<T, C> ForgeClient<T, C>
where
    T: ForgeTransport,
    C: ResponseCache,
{
    /// Open pull requests whose head commit is `commit_id`.
    ///
    /// Pull requests without a head branch and those on `branches_ignore`
    /// are skipped. The result before draft filtering is cached per commit
    /// and ignore list, so toggling `skip_drafts` never refetches.
    ///
    /// # Errors
    ///
    /// Propagates transport, pagination and decode failures.
    pub async fn find_open_prs_for_commit(
        &self,
        commit_id: &str,
        branches_ignore: &[String],
        skip_drafts: bool,
        skip_cache: bool,
    ) -> Result<ImplicatedPullRequests, ForgeError> {
        let key = CacheKey::new(
            "open_prs_for_commit",
            json!([
                self.locator().owner().as_str(),
                self.locator().repository().as_str(),
                commit_id,
                branches_ignore
            ]),
        );
        let implicated = self
            .memoised(
                key,
                skip_cache,
                self.fetch_implicated(commit_id, branches_ignore),
            )
            .await?;

        let found = decode_array::<ApiPullRequest, PullRequest>("open pull requests", implicated)?;
        let prs: ImplicatedPullRequests = found
            .into_iter()
            .filter(|pr| !(skip_drafts && pr.draft))
            .map(|pr| (pr.number, pr))
            .collect();

        info!(
            repo_owner = self.locator().owner().as_str(),
            repo_name = self.locator().repository().as_str(),
            commit_id,
            skip_drafts,
            skip_cache,
            found = prs.len(),
            "open pull requests for commit"
        );
        Ok(prs)
    }

    async fn fetch_implicated(
        &self,
        commit_id: &str,
        branches_ignore: &[String],
    ) -> Result<Value, ForgeError> {
        let endpoint = self.locator().pulls_path().with_query("state", "open");
        let listing = self
            .list_all(
                &endpoint,
                PageFailurePolicy::Abort,
                self.pacing().open_pull_requests_page_delay(),
            )
            .await?;
        let raw = listing.as_array().cloned().unwrap_or_default();
        let decoded = decode_array::<ApiPullRequest, PullRequest>("open pull requests", listing)?;

        let kept = raw
            .into_iter()
            .zip(decoded)
            .filter(|(_, pr)| is_implicated(pr, commit_id, branches_ignore))
            .map(|(value, _)| value)
            .collect();
        Ok(Value::Array(kept))
    }

    /// Retries [`Self::find_open_prs_for_commit`] until it finds something.
    ///
    /// The first attempt may be answered from the cache; later attempts
    /// wait for the policy delay and bypass it, giving the forge time to
    /// associate a freshly pushed commit with its pull request.
    ///
    /// # Errors
    ///
    /// Propagates the first failure from any attempt.
    pub async fn find_open_prs_for_commit_with_retries(
        &self,
        commit_id: &str,
        branches_ignore: &[String],
        skip_drafts: bool,
        policy: &RetryPolicy,
    ) -> Result<ImplicatedPullRequests, ForgeError> {
        let mut attempt = 1;
        loop {
            let delay = policy.delay_for(attempt);
            if attempt > 1 {
                info!(
                    commit_id,
                    attempt,
                    delay_secs = delay.as_secs(),
                    "no open pull request found yet; retrying"
                );
            }
            pause(delay).await;

            let prs = self
                .find_open_prs_for_commit(commit_id, branches_ignore, skip_drafts, attempt > 1)
                .await?;
            if !prs.is_empty() || attempt >= policy.max_attempts() {
                return Ok(prs);
            }
            attempt += 1;
        }
    }
}
