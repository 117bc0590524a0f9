//! Cross-repository issue search.
//!
//! Queries use GitHub's syntax: free text plus `key:value` qualifiers.
//! Free text is matched case-insensitively as a substring of the title or
//! body; title matches rank above body-only matches.

use std::cmp::Ordering;

use tracing::debug;

use crate::error::Result;
use crate::model::{Issue, IssueDetails, IssueState, RepoKey};
use crate::query::{Page, Paged, SearchOptions, SortField};
use crate::store::{Record, RecordKind, RecordStore};
use crate::tracker::IssueTracker;

/// Score of a title match.
pub const TITLE_SCORE: f64 = 2.0;
/// Score of a body-only match.
pub const BODY_SCORE: f64 = 1.0;

/// A parsed search query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    /// Lower-cased free text; empty when the query only has qualifiers.
    pub text: String,
    pub repo: Option<RepoKey>,
    pub owner: Option<String>,
    pub state: Option<IssueState>,
    pub labels: Vec<String>,
    pub author: Option<String>,
    pub assignee: Option<String>,
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

impl SearchQuery {
    /// Split a raw `q` into qualifiers and free text.
    ///
    /// Unrecognised keys and malformed values stay in the free text.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let mut query = Self::default();
        let mut words: Vec<&str> = Vec::new();

        for token in raw.split_whitespace() {
            let Some((key, value)) = token.split_once(':') else {
                words.push(token);
                continue;
            };
            let value = unquote(value);
            let recognised = match (key, value) {
                (_, "") => false,
                ("repo", v) => match v.split_once('/') {
                    Some((owner, name)) if !owner.is_empty() && !name.is_empty() => {
                        query.repo = Some(RepoKey::new(owner, name));
                        true
                    }
                    _ => false,
                },
                ("user" | "org", v) => {
                    query.owner = Some(v.to_string());
                    true
                }
                ("is" | "state", "open") => {
                    query.state = Some(IssueState::Open);
                    true
                }
                ("is" | "state", "closed") => {
                    query.state = Some(IssueState::Closed);
                    true
                }
                ("is" | "type", "issue") => true,
                ("label", v) => {
                    query.labels.push(v.to_string());
                    true
                }
                ("author", v) => {
                    query.author = Some(v.to_string());
                    true
                }
                ("assignee", v) => {
                    query.assignee = Some(v.to_string());
                    true
                }
                _ => false,
            };
            if !recognised {
                words.push(token);
            }
        }

        query.text = words.join(" ").to_lowercase();
        query
    }

    fn has_qualifiers(&self) -> bool {
        self.repo.is_some()
            || self.owner.is_some()
            || self.state.is_some()
            || !self.labels.is_empty()
            || self.author.is_some()
            || self.assignee.is_some()
    }

    /// A query with neither text nor qualifiers matches nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && !self.has_qualifiers()
    }

    fn passes_qualifiers(&self, issue: &Issue) -> bool {
        self.repo.as_ref().is_none_or(|r| issue.belongs_to(r))
            && self.owner.as_ref().is_none_or(|o| &issue.owner == o)
            && self.state.is_none_or(|s| issue.state == s)
            && self.labels.iter().all(|l| issue.has_label(l))
            && self.author.as_ref().is_none_or(|a| &issue.user == a)
            && self
                .assignee
                .as_ref()
                .is_none_or(|a| issue.assignees.iter().any(|x| x == a))
    }

    /// Relevance score of an issue, or `None` if it does not match.
    #[must_use]
    pub fn score(&self, issue: &Issue) -> Option<f64> {
        if self.is_empty() || !self.passes_qualifiers(issue) {
            return None;
        }
        if self.text.is_empty() || issue.title.to_lowercase().contains(&self.text) {
            return Some(TITLE_SCORE);
        }
        issue
            .body
            .as_ref()
            .filter(|body| body.to_lowercase().contains(&self.text))
            .map(|_| BODY_SCORE)
    }
}

/// One search result.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub details: IssueDetails,
    pub score: f64,
}

fn compare_hits(a: (&Issue, f64), b: (&Issue, f64), options: SearchOptions) -> Ordering {
    let (ia, sa) = a;
    let (ib, sb) = b;
    let primary = match options.sort {
        None => sb
            .total_cmp(&sa)
            .then_with(|| ib.updated_at.cmp(&ia.updated_at)),
        Some(SortField::Created) => options.order.apply(ia.created_at.cmp(&ib.created_at)),
        Some(SortField::Updated) => options.order.apply(ia.updated_at.cmp(&ib.updated_at)),
        Some(SortField::Comments) => options.order.apply(ia.comments.cmp(&ib.comments)),
    };
    primary
        .then_with(|| ib.number.cmp(&ia.number))
        .then_with(|| ib.id.cmp(&ia.id))
}

impl<S: RecordStore + Clone> IssueTracker<S> {
    /// Search issues across every repository.
    ///
    /// A blank query returns no results rather than an error.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the tracker lock is poisoned.
    pub fn search_issues(
        &self,
        q: &str,
        options: SearchOptions,
        page: Page,
    ) -> Result<Paged<SearchHit>> {
        let query = SearchQuery::parse(q);
        debug!(?query, "searching issues");

        self.read(|state| {
            if query.is_empty() {
                return Ok(Paged::from_ordered(Vec::new(), page));
            }
            let mut matches: Vec<(&Issue, f64)> = state
                .store
                .scan(RecordKind::Issue, |_| true)
                .filter_map(Record::as_issue)
                .filter_map(|issue| query.score(issue).map(|score| (issue, score)))
                .collect();
            matches.sort_by(|a, b| compare_hits(*a, *b, options));

            let paged = Paged::from_ordered(matches, page);
            Ok(paged.map(|(issue, score)| SearchHit {
                details: state.details(issue.clone()),
                score,
            }))
        })
    }
}
