//! In-memory forge for exercising reconciliation end to end.
//!
//! [`FakeForge`] implements [`ForgeTransport`] over a small model of one
//! repository: pull requests, review comments, reviews, conversation
//! comments, labels, issue events, commits and statuses. It serves listings
//! page by page, applies mutations to its own state and keeps a request log
//! so tests can assert on both the resulting forge state and the traffic.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::{Value, json};

use super::error::ForgeError;
use super::locator::ApiPath;
use super::models::{
    ApiGenericComment, ApiReview, ApiReviewComment, GenericComment, Review, ReviewComment,
    ReviewState, decode_list,
};
use super::transport::ForgeTransport;

/// Review submitted through the fake, as the forge received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedReview {
    /// Pull request number.
    pub pr_number: u64,
    /// Assigned review id.
    pub review_id: u64,
    /// Event string (`COMMENT`, `REQUEST_CHANGES`, `APPROVE`).
    pub event: String,
    /// Commit the review is anchored to.
    pub commit_id: String,
    /// Review body.
    pub body: String,
    /// Number of inline comments included.
    pub comment_count: usize,
}

/// Review dismissal received by the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dismissal {
    /// Pull request number.
    pub pr_number: u64,
    /// Dismissed review id.
    pub review_id: u64,
    /// Dismissal message.
    pub message: String,
}

#[derive(Debug, Default)]
struct FakeState {
    bot_login: String,
    bot_id: u64,
    next_id: u64,
    pull_requests: Vec<Value>,
    review_comments: BTreeMap<u64, Vec<Value>>,
    reviews: BTreeMap<u64, Vec<Value>>,
    pull_commits: BTreeMap<u64, Vec<Value>>,
    issue_comments: BTreeMap<u64, Vec<Value>>,
    labels: BTreeMap<u64, Vec<String>>,
    events: BTreeMap<u64, Vec<Value>>,
    commits: HashSet<String>,
    statuses: Vec<(String, Value)>,
    submitted: Vec<SubmittedReview>,
    dismissals: Vec<Dismissal>,
    failing: HashSet<String>,
    requests: Vec<String>,
}

impl FakeState {
    fn allocate_id(&mut self) -> u64 {
        self.next_id = self.next_id.saturating_add(1);
        self.next_id
    }

    fn bot_user(&self) -> Value {
        json!({ "login": self.bot_login, "id": self.bot_id })
    }
}

/// In-memory stand-in for the forge REST API.
#[derive(Debug)]
pub struct FakeForge {
    state: Mutex<FakeState>,
}

fn not_found(path: &ApiPath) -> ForgeError {
    ForgeError::Api {
        status: 404,
        message: format!("{path} failed: Not Found"),
    }
}

fn parse_id(raw: &str, path: &ApiPath) -> Result<u64, ForgeError> {
    raw.parse().map_err(|_| not_found(path))
}

fn page_of(items: &[Value], path: &ApiPath) -> Value {
    let page: usize = path
        .query_value("page")
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(1);
    let per_page: usize = path
        .query_value("per_page")
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(30);
    let start = page.saturating_sub(1).saturating_mul(per_page);
    Value::Array(items.iter().skip(start).take(per_page).cloned().collect())
}

fn review_comment_to_wire(comment: &ReviewComment) -> Value {
    json!({
        "id": comment.id,
        "path": comment.path,
        "position": comment.anchor.position(),
        "body": comment.body,
        "user": comment.author.as_ref().map(|login| json!({ "login": login })),
        "pull_request_review_id": comment.review_id,
        "commit_id": comment.commit_id,
        "original_commit_id": comment.original_commit_id,
    })
}

fn string_field(body: &Value, field: &str) -> String {
    body.get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}

fn review_state_for_event(event: &str) -> ReviewState {
    match event {
        "REQUEST_CHANGES" => ReviewState::ChangesRequested,
        "APPROVE" => ReviewState::Approved,
        _ => ReviewState::Commented,
    }
}

impl FakeForge {
    /// Creates an empty forge whose token belongs to `bot_login`.
    #[must_use]
    pub fn new(bot_login: &str) -> Self {
        Self {
            state: Mutex::new(FakeState {
                bot_login: bot_login.to_owned(),
                bot_id: 1,
                next_id: 1000,
                ..FakeState::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds an open pull request.
    pub fn add_pull_request(&self, number: u64, head_sha: &str, head_ref: &str, draft: bool) {
        self.lock().pull_requests.push(json!({
            "number": number,
            "title": format!("Pull request {number}"),
            "user": { "login": "contributor" },
            "head": { "sha": head_sha, "ref": head_ref },
            "draft": draft,
        }));
    }

    /// Appends a commit to the history of a pull request.
    pub fn add_pull_request_commit(&self, pr_number: u64, sha: &str) {
        self.lock()
            .pull_commits
            .entry(pr_number)
            .or_default()
            .push(json!({ "sha": sha }));
    }

    /// Adds an open pull request whose head branch is unknown.
    pub fn add_pull_request_without_head_ref(&self, number: u64, head_sha: &str) {
        self.lock().pull_requests.push(json!({
            "number": number,
            "head": { "sha": head_sha, "ref": null },
        }));
    }

    /// Registers a commit so commit lookups succeed.
    pub fn add_commit(&self, sha: &str) {
        self.lock().commits.insert(sha.to_owned());
    }

    /// Seeds an existing review comment.
    pub fn add_review_comment(&self, pr_number: u64, comment: &ReviewComment) {
        self.lock()
            .review_comments
            .entry(pr_number)
            .or_default()
            .push(review_comment_to_wire(comment));
    }

    /// Seeds an existing review.
    pub fn add_review(&self, pr_number: u64, review: &Review) {
        self.lock().reviews.entry(pr_number).or_default().push(json!({
            "id": review.id,
            "user": review.author.as_ref().map(|login| json!({ "login": login })),
            "state": review.state.as_api_str(),
            "commit_id": review.commit_id,
        }));
    }

    /// Seeds an existing conversation comment.
    pub fn add_generic_comment(&self, pr_number: u64, comment: &GenericComment) {
        self.lock()
            .issue_comments
            .entry(pr_number)
            .or_default()
            .push(json!({
                "id": comment.id,
                "body": comment.body,
                "user": comment.author.as_ref().map(|login| json!({ "login": login })),
            }));
    }

    /// Seeds a label on a pull request.
    pub fn add_label(&self, pr_number: u64, name: &str) {
        self.lock()
            .labels
            .entry(pr_number)
            .or_default()
            .push(name.to_owned());
    }

    /// Seeds a timeline event in wire format.
    pub fn add_issue_event(&self, pr_number: u64, event: Value) {
        self.lock().events.entry(pr_number).or_default().push(event);
    }

    /// Detaches every review comment on `path` from the diff, as a new push
    /// touching that file would.
    pub fn mark_comments_obsolete(&self, pr_number: u64, path: &str) {
        let mut state = self.lock();
        if let Some(comments) = state.review_comments.get_mut(&pr_number) {
            for comment in comments
                .iter_mut()
                .filter(|comment| comment.get("path").and_then(Value::as_str) == Some(path))
            {
                if let Some(object) = comment.as_object_mut() {
                    object.insert("position".to_owned(), Value::Null);
                }
            }
        }
    }

    /// Makes every GET whose rendered path equals `path` fail.
    pub fn fail_requests_to(&self, path: &str) {
        self.lock().failing.insert(path.to_owned());
    }

    /// Review comments currently on a pull request.
    #[must_use]
    pub fn review_comments(&self, pr_number: u64) -> Vec<ReviewComment> {
        let stored = self.stored(|state| state.review_comments.get(&pr_number).cloned());
        decode_list::<ApiReviewComment, ReviewComment>("stored review comments", stored)
            .unwrap_or_default()
    }

    /// Conversation comments currently on a pull request.
    #[must_use]
    pub fn generic_comments(&self, pr_number: u64) -> Vec<GenericComment> {
        let stored = self.stored(|state| state.issue_comments.get(&pr_number).cloned());
        decode_list::<ApiGenericComment, GenericComment>("stored issue comments", stored)
            .unwrap_or_default()
    }

    /// Reviews currently on a pull request.
    #[must_use]
    pub fn reviews(&self, pr_number: u64) -> Vec<Review> {
        let stored = self.stored(|state| state.reviews.get(&pr_number).cloned());
        decode_list::<ApiReview, Review>("stored reviews", stored).unwrap_or_default()
    }

    fn stored<F>(&self, select: F) -> Vec<Value>
    where
        F: FnOnce(&FakeState) -> Option<Vec<Value>>,
    {
        let state = self.lock();
        select(&*state).unwrap_or_default()
    }

    /// Label names currently on a pull request.
    #[must_use]
    pub fn labels(&self, pr_number: u64) -> Vec<String> {
        self.lock()
            .labels
            .get(&pr_number)
            .cloned()
            .unwrap_or_default()
    }

    /// Reviews submitted through the transport, in order.
    #[must_use]
    pub fn submitted_reviews(&self) -> Vec<SubmittedReview> {
        self.lock().submitted.clone()
    }

    /// Dismissals received through the transport, in order.
    #[must_use]
    pub fn dismissals(&self) -> Vec<Dismissal> {
        self.lock().dismissals.clone()
    }

    /// Commit statuses created through the transport.
    #[must_use]
    pub fn statuses(&self) -> Vec<(String, Value)> {
        self.lock().statuses.clone()
    }

    /// Every request received, as `VERB /path?query`.
    #[must_use]
    pub fn request_log(&self) -> Vec<String> {
        self.lock().requests.clone()
    }

    /// Number of requests whose log line starts with `prefix`.
    #[must_use]
    pub fn request_count(&self, prefix: &str) -> usize {
        self.lock()
            .requests
            .iter()
            .filter(|line| line.starts_with(prefix))
            .count()
    }

    fn handle_get(state: &FakeState, path: &ApiPath) -> Result<Value, ForgeError> {
        let segments: Vec<&str> = path.segments().iter().map(String::as_str).collect();
        match segments.as_slice() {
            ["user"] => Ok(state.bot_user()),
            ["rate_limit"] => Ok(json!({
                "rate": { "limit": 5000, "used": 1, "remaining": 4999, "reset": 1_700_000_000_u64 }
            })),
            ["repos", _, _, rest @ ..] => Self::handle_repo_get(state, rest, path),
            _ => Err(not_found(path)),
        }
    }

    fn handle_repo_get(
        state: &FakeState,
        rest: &[&str],
        path: &ApiPath,
    ) -> Result<Value, ForgeError> {
        let listing = |map: &BTreeMap<u64, Vec<Value>>, raw: &str| -> Result<Value, ForgeError> {
            let number = parse_id(raw, path)?;
            Ok(page_of(
                map.get(&number).map(Vec::as_slice).unwrap_or_default(),
                path,
            ))
        };

        match rest {
            ["pulls"] => Ok(page_of(&state.pull_requests, path)),
            ["pulls", "comments"] => {
                let all: Vec<Value> = state.review_comments.values().flatten().cloned().collect();
                Ok(page_of(&all, path))
            }
            ["pulls", number, "comments"] => listing(&state.review_comments, number),
            ["pulls", number, "reviews"] => listing(&state.reviews, number),
            ["pulls", number, "commits"] => listing(&state.pull_commits, number),
            ["issues", number, "comments"] => listing(&state.issue_comments, number),
            ["issues", number, "events"] => listing(&state.events, number),
            ["issues", number, "labels"] => {
                let id = parse_id(number, path)?;
                let labels: Vec<Value> = state
                    .labels
                    .get(&id)
                    .map(|names| names.iter().map(|name| json!({ "name": name })).collect())
                    .unwrap_or_default();
                Ok(page_of(&labels, path))
            }
            ["commits", sha] if state.commits.contains(*sha) => Ok(json!({
                "sha": sha,
                "files": [],
            })),
            _ => Err(not_found(path)),
        }
    }

    fn handle_post(
        state: &mut FakeState,
        path: &ApiPath,
        body: &Value,
    ) -> Result<Value, ForgeError> {
        let segments: Vec<&str> = path.segments().iter().map(String::as_str).collect();
        let ["repos", _, _, rest @ ..] = segments.as_slice() else {
            return Err(not_found(path));
        };

        match rest {
            ["pulls", number, "reviews"] => {
                let pr_number = parse_id(number, path)?;
                Ok(Self::submit_review(state, pr_number, body))
            }
            ["issues", number, "comments"] => {
                let pr_number = parse_id(number, path)?;
                let id = state.allocate_id();
                let comment = json!({
                    "id": id,
                    "body": string_field(body, "body"),
                    "user": state.bot_user(),
                });
                state
                    .issue_comments
                    .entry(pr_number)
                    .or_default()
                    .push(comment.clone());
                Ok(comment)
            }
            ["issues", number, "labels"] => {
                let pr_number = parse_id(number, path)?;
                let names: Vec<String> = body
                    .get("labels")
                    .and_then(Value::as_array)
                    .map(|labels| {
                        labels
                            .iter()
                            .filter_map(Value::as_str)
                            .map(ToOwned::to_owned)
                            .collect()
                    })
                    .unwrap_or_default();
                let current = state.labels.entry(pr_number).or_default();
                for name in names {
                    if !current.contains(&name) {
                        current.push(name);
                    }
                }
                Ok(Value::Array(
                    current.iter().map(|name| json!({ "name": name })).collect(),
                ))
            }
            ["statuses", sha] => {
                state.statuses.push(((*sha).to_owned(), body.clone()));
                Ok(body.clone())
            }
            _ => Err(not_found(path)),
        }
    }

    fn submit_review(state: &mut FakeState, pr_number: u64, body: &Value) -> Value {
        let review_id = state.allocate_id();
        let event = string_field(body, "event");
        let commit_id = string_field(body, "commit_id");
        let drafts: Vec<Value> = body
            .get("comments")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        for draft in &drafts {
            let id = state.allocate_id();
            let comment = json!({
                "id": id,
                "path": string_field(draft, "path"),
                "position": draft.get("position").cloned().unwrap_or(Value::Null),
                "body": string_field(draft, "body"),
                "user": state.bot_user(),
                "pull_request_review_id": review_id,
                "commit_id": commit_id,
                "original_commit_id": commit_id,
            });
            state
                .review_comments
                .entry(pr_number)
                .or_default()
                .push(comment);
        }

        let review = json!({
            "id": review_id,
            "user": state.bot_user(),
            "state": review_state_for_event(&event).as_api_str(),
            "commit_id": commit_id,
        });
        state
            .reviews
            .entry(pr_number)
            .or_default()
            .push(review.clone());
        state.submitted.push(SubmittedReview {
            pr_number,
            review_id,
            event,
            commit_id,
            body: string_field(body, "body"),
            comment_count: drafts.len(),
        });
        review
    }

    fn handle_put(
        state: &mut FakeState,
        path: &ApiPath,
        body: &Value,
    ) -> Result<Value, ForgeError> {
        let segments: Vec<&str> = path.segments().iter().map(String::as_str).collect();
        let ["repos", _, _, "pulls", number, "reviews", review, "dismissals"] =
            segments.as_slice()
        else {
            return Err(not_found(path));
        };
        let pr_number = parse_id(number, path)?;
        let review_id = parse_id(review, path)?;

        let stored = state
            .reviews
            .get_mut(&pr_number)
            .and_then(|reviews| {
                reviews
                    .iter_mut()
                    .find(|entry| entry.get("id").and_then(Value::as_u64) == Some(review_id))
            })
            .ok_or_else(|| not_found(path))?;
        if let Some(object) = stored.as_object_mut() {
            object.insert("state".to_owned(), json!("DISMISSED"));
        }
        let updated = stored.clone();

        state.dismissals.push(Dismissal {
            pr_number,
            review_id,
            message: string_field(body, "message"),
        });
        Ok(updated)
    }

    fn handle_delete(state: &mut FakeState, path: &ApiPath) -> Result<(), ForgeError> {
        let segments: Vec<&str> = path.segments().iter().map(String::as_str).collect();
        let ["repos", _, _, rest @ ..] = segments.as_slice() else {
            return Err(not_found(path));
        };

        let remove_by_id = |map: &mut BTreeMap<u64, Vec<Value>>, id: u64| -> bool {
            for entries in map.values_mut() {
                let before = entries.len();
                entries.retain(|entry| entry.get("id").and_then(Value::as_u64) != Some(id));
                if entries.len() != before {
                    return true;
                }
            }
            false
        };

        let removed = match rest {
            ["pulls", "comments", id] => {
                remove_by_id(&mut state.review_comments, parse_id(id, path)?)
            }
            ["issues", "comments", id] => {
                remove_by_id(&mut state.issue_comments, parse_id(id, path)?)
            }
            ["issues", number, "labels", name] => {
                let pr_number = parse_id(number, path)?;
                state.labels.get_mut(&pr_number).is_some_and(|labels| {
                    let before = labels.len();
                    labels.retain(|label| label != name);
                    labels.len() != before
                })
            }
            _ => false,
        };

        if removed {
            Ok(())
        } else {
            Err(not_found(path))
        }
    }
}

#[async_trait]
impl ForgeTransport for FakeForge {
    async fn get(&self, path: &ApiPath) -> Result<Value, ForgeError> {
        let mut state = self.lock();
        state.requests.push(format!("GET {path}"));
        let rendered = path.to_string();
        if state
            .failing
            .iter()
            .any(|failing| rendered.starts_with(failing.as_str()))
        {
            return Err(ForgeError::Network {
                message: format!("GET {rendered} failed: injected failure"),
            });
        }
        Self::handle_get(&state, path)
    }

    async fn post(&self, path: &ApiPath, body: &Value) -> Result<Value, ForgeError> {
        let mut state = self.lock();
        state.requests.push(format!("POST {path}"));
        Self::handle_post(&mut state, path, body)
    }

    async fn put(&self, path: &ApiPath, body: &Value) -> Result<Value, ForgeError> {
        let mut state = self.lock();
        state.requests.push(format!("PUT {path}"));
        Self::handle_put(&mut state, path, body)
    }

    async fn delete(&self, path: &ApiPath) -> Result<(), ForgeError> {
        let mut state = self.lock();
        state.requests.push(format!("DELETE {path}"));
        Self::handle_delete(&mut state, path)
    }
}
