//! Query, filter, pagination and patch types for tracker operations.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::error::IssuesError;
use crate::model::{IssueState, RepoKey, StateReason};

/// `state` filter of an issue listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StateFilter {
    #[default]
    Open,
    Closed,
    All,
}

impl StateFilter {
    #[must_use]
    pub fn matches(self, state: IssueState) -> bool {
        match self {
            Self::Open => state == IssueState::Open,
            Self::Closed => state == IssueState::Closed,
            Self::All => true,
        }
    }
}

impl FromStr for StateFilter {
    type Err = IssuesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            "all" => Ok(Self::All),
            other => Err(IssuesError::validation(
                "state",
                format!("must be one of open, closed, all (got '{other}')"),
            )),
        }
    }
}

/// Sort key for issue listings and explicit search ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortField {
    #[default]
    Created,
    Updated,
    Comments,
}

impl FromStr for SortField {
    type Err = IssuesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "updated" => Ok(Self::Updated),
            "comments" => Ok(Self::Comments),
            other => Err(IssuesError::validation(
                "sort",
                format!("must be one of created, updated, comments (got '{other}')"),
            )),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    Asc,
    #[default]
    Desc,
}

impl Direction {
    /// Parse a direction, naming `field` in the error (`direction` or `order`).
    ///
    /// # Errors
    ///
    /// Returns `Validation` for anything but `asc` or `desc`.
    pub fn parse_field(field: &str, s: &str) -> Result<Self, IssuesError> {
        match s {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(IssuesError::validation(
                field,
                format!("must be asc or desc (got '{other}')"),
            )),
        }
    }

    /// Orient an ascending comparison.
    #[must_use]
    pub const fn apply(self, ordering: std::cmp::Ordering) -> std::cmp::Ordering {
        match self {
            Self::Asc => ordering,
            Self::Desc => ordering.reverse(),
        }
    }
}

impl FromStr for Direction {
    type Err = IssuesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_field("direction", s)
    }
}

/// `assignee` filter of an issue listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssigneeFilter {
    /// `*`: at least one assignee.
    Any,
    /// `none`: no assignees.
    None,
    Login(String),
}

impl AssigneeFilter {
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "*" => Self::Any,
            "none" => Self::None,
            login => Self::Login(login.to_string()),
        }
    }

    #[must_use]
    pub fn matches(&self, assignees: &[String]) -> bool {
        match self {
            Self::Any => !assignees.is_empty(),
            Self::None => assignees.is_empty(),
            Self::Login(login) => assignees.iter().any(|a| a == login),
        }
    }
}

/// Which issues a listing draws from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListScope {
    /// Every repository.
    All,
    /// Every repository of one owner.
    Owner(String),
    Repository(RepoKey),
}

/// Filter options for listing issues.
#[derive(Debug, Clone, Default)]
pub struct ListFilters {
    pub state: StateFilter,
    /// All of these labels must be present.
    pub labels: Vec<String>,
    /// `updated_at >= since`
    pub since: Option<DateTime<Utc>>,
    pub sort: SortField,
    pub direction: Direction,
    pub assignee: Option<AssigneeFilter>,
    /// Creator login.
    pub creator: Option<String>,
}

/// A 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub per_page: usize,
    pub page: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            per_page: Self::DEFAULT_PER_PAGE,
            page: 1,
        }
    }
}

impl Page {
    pub const DEFAULT_PER_PAGE: usize = 30;
    pub const MAX_PER_PAGE: usize = 100;

    /// Build a page request, clamping `per_page` into `1..=100` and `page` to at least 1.
    #[must_use]
    pub fn new(per_page: Option<i64>, page: Option<i64>) -> Self {
        let per_page = per_page.map_or(Self::DEFAULT_PER_PAGE, |n| {
            usize::try_from(n.clamp(1, 100)).unwrap_or(Self::DEFAULT_PER_PAGE)
        });
        let page = page
            .and_then(|n| usize::try_from(n).ok())
            .filter(|n| *n >= 1)
            .unwrap_or(1);
        Self { per_page, page }
    }

    #[must_use]
    pub const fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.per_page)
    }

    /// Take this page out of an already ordered result set.
    #[must_use]
    pub fn slice<T>(&self, items: Vec<T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.offset())
            .take(self.per_page)
            .collect()
    }

    /// Number of the last page for `total` results (at least 1).
    #[must_use]
    pub const fn last_page(&self, total: usize) -> usize {
        if total == 0 {
            1
        } else {
            total.div_ceil(self.per_page)
        }
    }
}

/// One page of results plus the pre-pagination match count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub total_count: usize,
    pub page: Page,
}

impl<T> Paged<T> {
    /// Paginate a fully ordered result set.
    #[must_use]
    pub fn from_ordered(items: Vec<T>, page: Page) -> Self {
        let total_count = items.len();
        Self {
            items: page.slice(items),
            total_count,
            page,
        }
    }

    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paged<U> {
        Paged {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
            page: self.page,
        }
    }

    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.page.page < self.page.last_page(self.total_count)
    }
}

/// Input of an issue create.
#[derive(Debug, Clone, Default)]
pub struct NewIssue {
    pub title: String,
    pub body: Option<String>,
    pub labels: Vec<String>,
    pub assignees: Vec<String>,
}

/// Fields to update on an issue. `None` means "not supplied".
#[derive(Debug, Clone, Default)]
pub struct IssuePatch {
    pub title: Option<String>,
    /// `Some(None)` clears the body.
    pub body: Option<Option<String>>,
    pub state: Option<IssueState>,
    pub state_reason: Option<Option<StateReason>>,
    /// Full replacement; `Some(vec![])` clears.
    pub labels: Option<Vec<String>>,
    /// Full replacement; `Some(vec![])` clears.
    pub assignees: Option<Vec<String>>,
}

impl IssuePatch {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.body.is_none()
            && self.state.is_none()
            && self.state_reason.is_none()
            && self.labels.is_none()
            && self.assignees.is_none()
    }
}

/// Sort key of a repository comment listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CommentSort {
    #[default]
    Created,
    Updated,
}

impl FromStr for CommentSort {
    type Err = IssuesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "updated" => Ok(Self::Updated),
            other => Err(IssuesError::validation(
                "sort",
                format!("must be created or updated (got '{other}')"),
            )),
        }
    }
}

/// Filter options for comment listings.
#[derive(Debug, Clone, Default)]
pub struct CommentFilters {
    /// `updated_at >= since`
    pub since: Option<DateTime<Utc>>,
    /// Repository listings only; issue listings are always chronological.
    pub sort: Option<CommentSort>,
    pub direction: Option<Direction>,
}

/// Ordering options of a search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchOptions {
    /// `None` keeps relevance order.
    pub sort: Option<SortField>,
    pub order: Direction,
}

impl fmt::Display for StateFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::All => "all",
        })
    }
}
