//! Filter, sort and paginate issue listings.

use std::cmp::Ordering;

use crate::error::{IssuesError, Result};
use crate::model::{Issue, IssueDetails, Label, RepoKey};
use crate::query::{Direction, ListFilters, ListScope, Page, Paged, SortField};
use crate::store::{Record, RecordKind, RecordStore};
use crate::tracker::IssueTracker;

/// Whether an issue passes every supplied filter.
#[must_use]
pub fn matches_filters(issue: &Issue, filters: &ListFilters) -> bool {
    if !filters.state.matches(issue.state) {
        return false;
    }
    if !filters.labels.iter().all(|l| issue.has_label(l)) {
        return false;
    }
    if filters.since.is_some_and(|since| issue.updated_at < since) {
        return false;
    }
    if let Some(assignee) = &filters.assignee {
        if !assignee.matches(&issue.assignees) {
            return false;
        }
    }
    if let Some(creator) = &filters.creator {
        if &issue.user != creator {
            return false;
        }
    }
    true
}

/// Whether an issue lives inside a listing scope.
#[must_use]
pub fn in_scope(issue: &Issue, scope: &ListScope) -> bool {
    match scope {
        ListScope::All => true,
        ListScope::Owner(owner) => &issue.owner == owner,
        ListScope::Repository(key) => issue.belongs_to(key),
    }
}

/// Total order used by listings: the sort key in the requested direction,
/// then `number` descending, then global `id` descending.
#[must_use]
pub fn compare_issues(a: &Issue, b: &Issue, sort: SortField, direction: Direction) -> Ordering {
    let primary = match sort {
        SortField::Created => a.created_at.cmp(&b.created_at),
        SortField::Updated => a.updated_at.cmp(&b.updated_at),
        SortField::Comments => a.comments.cmp(&b.comments),
    };
    direction
        .apply(primary)
        .then_with(|| b.number.cmp(&a.number))
        .then_with(|| b.id.cmp(&a.id))
}

/// Filter then sort a set of issues.
pub fn select_issues<'a, I>(issues: I, filters: &ListFilters) -> Vec<&'a Issue>
where
    I: IntoIterator<Item = &'a Issue>,
{
    let mut selected: Vec<&Issue> = issues
        .into_iter()
        .filter(|issue| matches_filters(issue, filters))
        .collect();
    selected.sort_by(|a, b| compare_issues(a, b, filters.sort, filters.direction));
    selected
}

impl<S: RecordStore + Clone> IssueTracker<S> {
    /// List issues in a scope: filter, then sort, then paginate.
    ///
    /// An unknown repository or owner simply yields no issues.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the tracker lock is poisoned.
    pub fn list_issues(
        &self,
        scope: &ListScope,
        filters: &ListFilters,
        page: Page,
    ) -> Result<Paged<IssueDetails>> {
        self.read(|state| {
            let scoped = state
                .store
                .scan(RecordKind::Issue, |r| {
                    r.as_issue().is_some_and(|i| in_scope(i, scope))
                })
                .filter_map(Record::as_issue);
            let selected = select_issues(scoped, filters);
            let paged = Paged::from_ordered(selected, page);
            Ok(paged.map(|issue| state.details(issue.clone())))
        })
    }

    /// A repository's labels ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryNotFound` if no issue was ever filed in the repository.
    pub fn list_labels(&self, repo: &RepoKey, page: Page) -> Result<Paged<Label>> {
        self.read(|state| {
            if !state.repository_exists(repo) {
                return Err(IssuesError::RepositoryNotFound {
                    owner: repo.owner.clone(),
                    repo: repo.name.clone(),
                });
            }
            let labels: Vec<Label> = state
                .store
                .scan(RecordKind::Label, |r| {
                    r.as_label()
                        .is_some_and(|l| l.owner == repo.owner && l.repo == repo.name)
                })
                .filter_map(Record::as_label)
                .cloned()
                .collect();
            Ok(Paged::from_ordered(labels, page))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::IssueState;
    use crate::query::{AssigneeFilter, IssuePatch, NewIssue, StateFilter};
    use chrono::{Duration, Utc};
    use proptest::prelude::*;

    fn tracker_with_issues() -> IssueTracker {
        let t = IssueTracker::in_memory("local-user");
        let widget = RepoKey::new("acme", "widget");
        let gadget = RepoKey::new("acme", "gadget");
        let other = RepoKey::new("umbrella", "corp");
        for (repo, title, labels) in [
            (&widget, "one", vec!["bug"]),
            (&widget, "two", vec!["bug", "ui"]),
            (&gadget, "three", vec!["ui"]),
            (&other, "four", vec![]),
        ] {
            t.create_issue(
                repo,
                NewIssue {
                    title: title.to_string(),
                    labels: labels.into_iter().map(String::from).collect(),
                    ..Default::default()
                },
            )
            .unwrap();
        }
        t.update_issue(
            &widget,
            1,
            IssuePatch {
                state: Some(IssueState::Closed),
                ..Default::default()
            },
        )
        .unwrap();
        t
    }

    fn titles(paged: &Paged<IssueDetails>) -> Vec<&str> {
        paged.items.iter().map(|d| d.issue.title.as_str()).collect()
    }

    #[test]
    fn test_default_lists_open_newest_first() {
        let t = tracker_with_issues();
        let all = t
            .list_issues(&ListScope::All, &ListFilters::default(), Page::default())
            .unwrap();
        assert_eq!(titles(&all), vec!["four", "three", "two"]);
        assert_eq!(all.total_count, 3);
    }

    #[test]
    fn test_scopes() {
        let t = tracker_with_issues();
        let filters = ListFilters {
            state: StateFilter::All,
            ..Default::default()
        };
        let repo = t
            .list_issues(
                &ListScope::Repository(RepoKey::new("acme", "widget")),
                &filters,
                Page::default(),
            )
            .unwrap();
        assert_eq!(titles(&repo), vec!["two", "one"]);

        let owner = t
            .list_issues(&ListScope::Owner("acme".to_string()), &filters, Page::default())
            .unwrap();
        assert_eq!(owner.total_count, 3);

        let missing = t
            .list_issues(
                &ListScope::Repository(RepoKey::new("nobody", "nothing")),
                &filters,
                Page::default(),
            )
            .unwrap();
        assert_eq!(missing.total_count, 0);
    }

    #[test]
    fn test_label_and_state_filters() {
        let t = tracker_with_issues();
        let filters = ListFilters {
            state: StateFilter::All,
            labels: vec!["bug".to_string(), "ui".to_string()],
            direction: Direction::Asc,
            ..Default::default()
        };
        let hits = t
            .list_issues(&ListScope::All, &filters, Page::default())
            .unwrap();
        assert_eq!(titles(&hits), vec!["two"]);

        let closed = t
            .list_issues(
                &ListScope::All,
                &ListFilters {
                    state: StateFilter::Closed,
                    ..Default::default()
                },
                Page::default(),
            )
            .unwrap();
        assert_eq!(titles(&closed), vec!["one"]);
    }

    #[test]
    fn test_since_and_updated_sort() {
        let t = tracker_with_issues();
        let filters = ListFilters {
            state: StateFilter::All,
            sort: SortField::Updated,
            since: Some(Utc::now() - Duration::hours(1)),
            ..Default::default()
        };
        let hits = t
            .list_issues(&ListScope::All, &filters, Page::default())
            .unwrap();
        // "one" was closed last, so it is the most recently updated.
        assert_eq!(titles(&hits)[0], "one");

        let future = ListFilters {
            since: Some(Utc::now() + Duration::hours(1)),
            ..filters
        };
        let none = t
            .list_issues(&ListScope::All, &future, Page::default())
            .unwrap();
        assert_eq!(none.total_count, 0);
    }

    #[test]
    fn test_pagination_counts_total() {
        let t = tracker_with_issues();
        let filters = ListFilters {
            state: StateFilter::All,
            ..Default::default()
        };
        let first = t
            .list_issues(&ListScope::All, &filters, Page::new(Some(3), Some(1)))
            .unwrap();
        let second = t
            .list_issues(&ListScope::All, &filters, Page::new(Some(3), Some(2)))
            .unwrap();
        let beyond = t
            .list_issues(&ListScope::All, &filters, Page::new(Some(3), Some(5)))
            .unwrap();
        assert_eq!(first.items.len(), 3);
        assert_eq!(second.items.len(), 1);
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.total_count, 4);
    }

    #[test]
    fn test_assignee_and_creator_filters() {
        let t = IssueTracker::in_memory("local-user");
        let repo = RepoKey::new("acme", "widget");
        t.create_issue(
            &repo,
            NewIssue {
                title: "assigned".to_string(),
                assignees: vec!["octocat".to_string()],
                ..Default::default()
            },
        )
        .unwrap();
        t.create_issue(
            &repo,
            NewIssue {
                title: "free".to_string(),
                ..Default::default()
            },
        )
        .unwrap();

        let list = |filters: ListFilters| {
            t.list_issues(&ListScope::All, &filters, Page::default())
                .unwrap()
                .items
                .into_iter()
                .map(|d| d.issue.title)
                .collect::<Vec<_>>()
        };
        assert_eq!(
            list(ListFilters {
                assignee: Some(AssigneeFilter::parse("none")),
                ..Default::default()
            }),
            vec!["free"]
        );
        assert_eq!(
            list(ListFilters {
                assignee: Some(AssigneeFilter::parse("*")),
                ..Default::default()
            }),
            vec!["assigned"]
        );
        assert_eq!(
            list(ListFilters {
                creator: Some("someone-else".to_string()),
                ..Default::default()
            })
            .len(),
            0
        );
    }

    #[test]
    fn test_labels_listing() {
        let t = tracker_with_issues();
        let labels = t
            .list_labels(&RepoKey::new("acme", "widget"), Page::default())
            .unwrap();
        let names: Vec<&str> = labels.items.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["bug", "ui"]);

        let err = t
            .list_labels(&RepoKey::new("nobody", "nothing"), Page::default())
            .unwrap_err();
        assert!(err.is_not_found());
    }

    fn arb_issue() -> impl Strategy<Value = Issue> {
        (1u64..50, 1u64..1000, 0i64..5, 0u64..4, any::<bool>()).prop_map(
            |(number, id, age, comments, closed)| {
                let ts = Utc::now() - Duration::minutes(age);
                Issue {
                    id,
                    owner: "acme".to_string(),
                    repo: "widget".to_string(),
                    number,
                    title: format!("#{number}"),
                    body: None,
                    state: if closed {
                        IssueState::Closed
                    } else {
                        IssueState::Open
                    },
                    state_reason: None,
                    labels: vec![],
                    assignees: vec![],
                    user: "local-user".to_string(),
                    closed_by: None,
                    comments,
                    locked: false,
                    active_lock_reason: None,
                    created_at: ts,
                    updated_at: ts,
                    closed_at: None,
                }
            },
        )
    }

    fn arb_filters() -> impl Strategy<Value = ListFilters> {
        (
            prop_oneof![
                Just(StateFilter::Open),
                Just(StateFilter::Closed),
                Just(StateFilter::All)
            ],
            prop_oneof![
                Just(SortField::Created),
                Just(SortField::Updated),
                Just(SortField::Comments)
            ],
            prop_oneof![Just(Direction::Asc), Just(Direction::Desc)],
        )
            .prop_map(|(state, sort, direction)| ListFilters {
                state,
                sort,
                direction,
                ..Default::default()
            })
    }

    proptest! {
        #[test]
        fn prop_selection_is_filtered_and_totally_ordered(
            issues in prop::collection::vec(arb_issue(), 0..40),
            filters in arb_filters(),
        ) {
            let selected = select_issues(&issues, &filters);

            prop_assert!(selected.iter().all(|i| filters.state.matches(i.state)));
            let expected = issues.iter().filter(|i| filters.state.matches(i.state)).count();
            prop_assert_eq!(selected.len(), expected);

            for pair in selected.windows(2) {
                let ord = compare_issues(pair[0], pair[1], filters.sort, filters.direction);
                prop_assert_ne!(ord, Ordering::Greater);
            }
        }

        #[test]
        fn prop_pages_partition_the_selection(
            issues in prop::collection::vec(arb_issue(), 0..40),
            per_page in 1i64..10,
        ) {
            let filters = ListFilters { state: StateFilter::All, ..Default::default() };
            let selected = select_issues(&issues, &filters);
            let mut rejoined = Vec::new();
            let mut page_no = 1;
            loop {
                let page = Page::new(Some(per_page), Some(page_no));
                let chunk = page.slice(selected.clone());
                if chunk.is_empty() {
                    break;
                }
                rejoined.extend(chunk);
                page_no += 1;
            }
            prop_assert_eq!(rejoined, selected);
        }
    }
}
