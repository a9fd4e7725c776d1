//! Predicate filters over forge objects.
//!
//! Every filter narrows a list without reordering or mutating it. Within one
//! dimension the allowed values are alternatives; across dimensions all must
//! hold. An unset dimension places no constraint.

use camino::Utf8Path;

use super::models::{
    AuthenticatedUser, Collaborator, GenericComment, IssueEvent, Review, ReviewComment,
    ReviewState, Team,
};

/// Author selector for filters that narrow by login.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LoginSelector {
    /// A specific login.
    Literal(String),
    /// Whoever owns the configured token.
    CurrentTokenHolder,
}

impl LoginSelector {
    /// Resolves the selector to a concrete login.
    #[must_use]
    pub fn resolve(&self, current: &AuthenticatedUser) -> String {
        match self {
            Self::Literal(login) => login.clone(),
            Self::CurrentTokenHolder => current.login.clone(),
        }
    }
}

/// Predicate over one kind of forge object.
pub trait Filter<T> {
    /// Returns true when `item` should be kept.
    fn matches(&self, item: &T) -> bool;
}

/// Returns the items accepted by `filter`, in their original order.
pub fn retain_matching<T, F>(items: &[T], filter: &F) -> Vec<T>
where
    T: Clone,
    F: Filter<T> + ?Sized,
{
    items
        .iter()
        .filter(|item| filter.matches(item))
        .cloned()
        .collect()
}

fn author_is(author: Option<&str>, login: Option<&str>) -> bool {
    login.is_none_or(|expected| author == Some(expected))
}

/// Narrows review comments by resolved author login and active flag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentFilter {
    /// Required author login.
    pub login: Option<String>,
    /// Required active flag.
    pub active: Option<bool>,
}

impl Filter<ReviewComment> for CommentFilter {
    fn matches(&self, item: &ReviewComment) -> bool {
        author_is(item.author.as_deref(), self.login.as_deref())
            && self.active.is_none_or(|active| item.is_active() == active)
    }
}

/// Narrows conversation comments by resolved author login.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorFilter {
    /// Required author login.
    pub login: Option<String>,
}

impl Filter<GenericComment> for AuthorFilter {
    fn matches(&self, item: &GenericComment) -> bool {
        author_is(item.author.as_deref(), self.login.as_deref())
    }
}

/// Narrows reviews by resolved author login and state membership.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewFilter {
    /// Required author login.
    pub login: Option<String>,
    /// Accepted states; empty accepts every state.
    pub states: Vec<ReviewState>,
}

impl Filter<Review> for ReviewFilter {
    fn matches(&self, item: &Review) -> bool {
        author_is(item.author.as_deref(), self.login.as_deref())
            && (self.states.is_empty() || self.states.contains(&item.state))
    }
}

/// Narrows issue events by type and actor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    /// Accepted event types; empty accepts every type.
    pub event_types: Vec<String>,
    /// Accepted actor logins; empty accepts every actor.
    pub actor_logins: Vec<String>,
    /// Accepted actor ids; empty accepts every actor.
    pub actor_ids: Vec<u64>,
}

impl Filter<IssueEvent> for EventFilter {
    fn matches(&self, item: &IssueEvent) -> bool {
        let type_ok = self.event_types.is_empty() || self.event_types.contains(&item.event);
        let login_ok = self.actor_logins.is_empty()
            || item
                .actor
                .as_ref()
                .is_some_and(|actor| self.actor_logins.contains(&actor.login));
        let id_ok = self.actor_ids.is_empty()
            || item
                .actor
                .as_ref()
                .is_some_and(|actor| self.actor_ids.contains(&actor.id));
        type_ok && login_ok && id_ok
    }
}

/// Narrows collaborators by permission flags.
///
/// A required flag only excludes a collaborator whose permissions report
/// that flag with a different value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PermissionFilter {
    /// Required admin flag.
    pub admin: Option<bool>,
    /// Required push flag.
    pub push: Option<bool>,
    /// Required pull flag.
    pub pull: Option<bool>,
}

impl Filter<Collaborator> for PermissionFilter {
    fn matches(&self, item: &Collaborator) -> bool {
        let Some(permissions) = item.permissions else {
            return true;
        };
        let flag_ok = |required: Option<bool>, actual: Option<bool>| match (required, actual) {
            (Some(expected), Some(value)) => expected == value,
            _ => true,
        };
        flag_ok(self.admin, permissions.admin)
            && flag_ok(self.push, permissions.push)
            && flag_ok(self.pull, permissions.pull)
    }
}

/// Narrows teams by slug.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamFilter {
    /// Required slug.
    pub slug: Option<String>,
}

impl Filter<Team> for TeamFilter {
    fn matches(&self, item: &Team) -> bool {
        self.slug.as_deref().is_none_or(|slug| item.slug == slug)
    }
}

/// Narrows repository file paths by extension and leading directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathFilter {
    /// Extensions to keep (without the dot); `None` keeps every extension.
    pub allowed_extensions: Option<Vec<String>>,
    /// Extensions to drop.
    pub denied_extensions: Vec<String>,
    /// Directories whose contents are dropped.
    pub skip_folders: Vec<String>,
}

impl PathFilter {
    /// Returns true when `path` passes every configured rule.
    #[must_use]
    pub fn accepts(&self, path: &str) -> bool {
        let extension = Utf8Path::new(path)
            .extension()
            .map(str::to_lowercase)
            .unwrap_or_default();

        let allowed = self.allowed_extensions.as_ref().is_none_or(|allowed| {
            allowed
                .iter()
                .any(|candidate| candidate.eq_ignore_ascii_case(&extension))
        });
        let denied = self
            .denied_extensions
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(&extension));
        let skipped = self
            .skip_folders
            .iter()
            .any(|folder| is_within_folder(path, folder));

        allowed && !denied && !skipped
    }
}

impl Filter<String> for PathFilter {
    fn matches(&self, item: &String) -> bool {
        self.accepts(item)
    }
}

/// Prefix match on whole path segments: `tests` contains `tests/a.php` but
/// not `mytests/a.php` or `tests-old/a.php`.
fn is_within_folder(path: &str, folder: &str) -> bool {
    let trimmed = folder.trim_matches('/');
    if trimmed.is_empty() {
        return false;
    }
    path.strip_prefix(trimmed)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{
        CommentFilter, EventFilter, Filter, LoginSelector, PathFilter, PermissionFilter,
        ReviewFilter, retain_matching,
    };
    use crate::forge::models::test_support::{active_comment, obsolete_comment, review};
    use crate::forge::models::{
        AuthenticatedUser, Collaborator, EventActor, IssueEvent, Permissions, ReviewState,
    };

    fn collaborator(login: &str, admin: bool, push: bool, pull: bool) -> Collaborator {
        Collaborator {
            login: login.to_owned(),
            id: 1,
            permissions: Some(Permissions {
                admin: Some(admin),
                push: Some(push),
                pull: Some(pull),
            }),
        }
    }

    #[test]
    fn push_filter_keeps_only_writers() {
        let writer = collaborator("writer", false, true, true);
        let reader = collaborator("reader", false, false, true);
        let filter = PermissionFilter {
            push: Some(true),
            ..PermissionFilter::default()
        };

        let kept = retain_matching(&[writer.clone(), reader], &filter);

        assert_eq!(kept, vec![writer]);
    }

    #[test]
    fn unreported_permission_flag_never_excludes() {
        let partial = Collaborator {
            login: "partial".to_owned(),
            id: 2,
            permissions: Some(Permissions {
                admin: None,
                push: Some(true),
                pull: None,
            }),
        };
        let filter = PermissionFilter {
            admin: Some(true),
            push: Some(true),
            pull: None,
        };

        assert!(filter.matches(&partial));
    }

    #[rstest]
    #[case::inside("tests/foo.php", false)]
    #[case::nested("tests/unit/foo.php", false)]
    #[case::sibling_prefix("mytests/foo.php", true)]
    #[case::longer_segment("tests-old/foo.php", true)]
    #[case::elsewhere("src/tests/foo.php", true)]
    fn skip_folders_match_at_segment_boundary(#[case] path: &str, #[case] accepted: bool) {
        let filter = PathFilter {
            skip_folders: vec!["tests".to_owned()],
            ..PathFilter::default()
        };

        assert_eq!(filter.accepts(path), accepted);
    }

    #[rstest]
    #[case::allowed("src/a.php", true)]
    #[case::allowed_upper("src/A.PHP", true)]
    #[case::not_allowed("src/a.txt", false)]
    #[case::denied("vendor/a.min.js", false)]
    #[case::no_extension("Makefile", false)]
    fn extension_rules_apply(#[case] path: &str, #[case] accepted: bool) {
        let filter = PathFilter {
            allowed_extensions: Some(vec!["php".to_owned(), "js".to_owned()]),
            denied_extensions: vec!["js".to_owned()],
            skip_folders: Vec::new(),
        };

        assert_eq!(filter.accepts(path), accepted);
    }

    #[test]
    fn comment_filter_combines_login_and_active_flag() {
        let comments = vec![
            active_comment(1, "a.php", 3, "x", "vigil-bot"),
            obsolete_comment(2, "a.php", "y", "vigil-bot"),
            active_comment(3, "a.php", 4, "z", "someone-else"),
        ];
        let filter = CommentFilter {
            login: Some("vigil-bot".to_owned()),
            active: Some(true),
        };

        let kept: Vec<u64> = retain_matching(&comments, &filter)
            .into_iter()
            .map(|comment| comment.id)
            .collect();

        assert_eq!(kept, vec![1]);
    }

    #[test]
    fn review_filter_accepts_any_listed_state() {
        let reviews = vec![
            review(10, "vigil-bot", ReviewState::ChangesRequested),
            review(11, "vigil-bot", ReviewState::Commented),
            review(12, "vigil-bot", ReviewState::Approved),
        ];
        let filter = ReviewFilter {
            login: None,
            states: vec![ReviewState::Approved, ReviewState::ChangesRequested],
        };

        let kept: Vec<u64> = retain_matching(&reviews, &filter)
            .into_iter()
            .map(|item| item.id)
            .collect();

        assert_eq!(kept, vec![10, 12]);
    }

    #[test]
    fn event_filter_requires_every_dimension() {
        let event = |id: u64, kind: &str, actor_id: u64| IssueEvent {
            id,
            event: kind.to_owned(),
            actor: Some(EventActor {
                login: format!("user{actor_id}"),
                id: actor_id,
            }),
            dismissed_review_id: None,
        };
        let events = vec![
            event(1, "review_dismissed", 7),
            event(2, "labeled", 7),
            event(3, "review_dismissed", 8),
        ];
        let filter = EventFilter {
            event_types: vec!["review_dismissed".to_owned()],
            actor_logins: Vec::new(),
            actor_ids: vec![7],
        };

        let kept: Vec<u64> = retain_matching(&events, &filter)
            .into_iter()
            .map(|item| item.id)
            .collect();

        assert_eq!(kept, vec![1]);
    }

    #[test]
    fn current_token_holder_resolves_to_authenticated_login() {
        let user = AuthenticatedUser {
            login: "vigil-bot".to_owned(),
            id: 5,
        };

        assert_eq!(LoginSelector::CurrentTokenHolder.resolve(&user), "vigil-bot");
        assert_eq!(
            LoginSelector::Literal("alice".to_owned()).resolve(&user),
            "alice"
        );
    }
}
