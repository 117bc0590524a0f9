//! Query-string parsing and pagination headers.
//!
//! Query values arrive as strings and are converted here so that bad values
//! produce a 422 naming the parameter instead of a bare 400.

use axum::http::Uri;
use issues_core::util::parse_timestamp;
use issues_core::{
    AssigneeFilter, CommentFilters, CommentSort, Direction, IssuesError, ListFilters, Page, Paged,
    SearchOptions, SortField, StateFilter,
};
use serde::{Deserialize, Deserializer};

use crate::format::ApiUrls;

/// Distinguish an absent field (`None`) from an explicit `null` (`Some(None)`).
///
/// Use with `#[serde(default, deserialize_with = "double_option")]`.
///
/// # Errors
///
/// Propagates the inner deserializer's error.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn parse_int(field: &str, value: Option<&String>) -> Result<Option<i64>, IssuesError> {
    value
        .map(|v| {
            v.trim()
                .parse::<i64>()
                .map_err(|_| IssuesError::validation(field, format!("'{v}' is not an integer")))
        })
        .transpose()
}

fn blank_to_none(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

/// `per_page` / `page`.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub per_page: Option<String>,
    pub page: Option<String>,
}

impl PageParams {
    /// # Errors
    ///
    /// Returns `Validation` for non-integer values.
    pub fn page(&self) -> Result<Page, IssuesError> {
        Ok(Page::new(
            parse_int("per_page", self.per_page.as_ref())?,
            parse_int("page", self.page.as_ref())?,
        ))
    }
}

/// Issue listing parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub state: Option<String>,
    pub labels: Option<String>,
    pub since: Option<String>,
    pub sort: Option<String>,
    pub direction: Option<String>,
    pub assignee: Option<String>,
    pub creator: Option<String>,
    #[serde(flatten)]
    pub paging: PageParams,
}

impl ListParams {
    /// # Errors
    ///
    /// Returns `Validation` naming the first bad parameter.
    pub fn filters(&self) -> Result<ListFilters, IssuesError> {
        Ok(ListFilters {
            state: blank_to_none(self.state.as_ref())
                .map(str::parse::<StateFilter>)
                .transpose()?
                .unwrap_or(StateFilter::Open),
            labels: self
                .labels
                .as_deref()
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|l| !l.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
            since: blank_to_none(self.since.as_ref())
                .map(|v| parse_timestamp("since", v))
                .transpose()?,
            sort: blank_to_none(self.sort.as_ref())
                .map(str::parse::<SortField>)
                .transpose()?
                .unwrap_or_default(),
            direction: blank_to_none(self.direction.as_ref())
                .map(str::parse::<Direction>)
                .transpose()?
                .unwrap_or_default(),
            assignee: blank_to_none(self.assignee.as_ref()).map(AssigneeFilter::parse),
            creator: blank_to_none(self.creator.as_ref()).map(String::from),
        })
    }
}

/// Comment listing parameters.
#[derive(Debug, Default, Deserialize)]
pub struct CommentParams {
    pub since: Option<String>,
    pub sort: Option<String>,
    pub direction: Option<String>,
    #[serde(flatten)]
    pub paging: PageParams,
}

impl CommentParams {
    /// # Errors
    ///
    /// Returns `Validation` naming the first bad parameter.
    pub fn filters(&self) -> Result<CommentFilters, IssuesError> {
        Ok(CommentFilters {
            since: blank_to_none(self.since.as_ref())
                .map(|v| parse_timestamp("since", v))
                .transpose()?,
            sort: blank_to_none(self.sort.as_ref())
                .map(str::parse::<CommentSort>)
                .transpose()?,
            direction: blank_to_none(self.direction.as_ref())
                .map(str::parse::<Direction>)
                .transpose()?,
        })
    }
}

/// `/search/issues` parameters.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    #[serde(flatten)]
    pub paging: PageParams,
}

impl SearchParams {
    #[must_use]
    pub fn query(&self) -> &str {
        self.q.as_deref().unwrap_or_default()
    }

    /// `best-match` (or no `sort`) keeps relevance order.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for an unknown `sort` or `order`.
    pub fn options(&self) -> Result<SearchOptions, IssuesError> {
        let sort = match blank_to_none(self.sort.as_ref()) {
            None | Some("best-match") => None,
            Some(other) => Some(other.parse::<SortField>()?),
        };
        let order = blank_to_none(self.order.as_ref())
            .map(|v| Direction::parse_field("order", v))
            .transpose()?
            .unwrap_or_default();
        Ok(SearchOptions { sort, order })
    }
}

/// RFC 5988 `Link` header for a paginated response, or `None` when the
/// request is for the only page.
///
/// Every other query parameter of the request is preserved.
#[must_use]
pub fn link_header<T>(urls: &ApiUrls, uri: &Uri, paged: &Paged<T>) -> Option<String> {
    let current = paged.page.page;
    let last = paged.page.last_page(paged.total_count);

    let mut rels: Vec<(usize, &str)> = Vec::new();
    if current > 1 {
        rels.push((current.saturating_sub(1).min(last), "prev"));
    }
    if current < last {
        rels.push((current + 1, "next"));
    }
    // Past the end, `last` still tells the client where the results stop.
    if paged.total_count > 0 && current != last {
        rels.push((last, "last"));
    }
    if current > 1 {
        rels.push((1, "first"));
    }
    if rels.is_empty() {
        return None;
    }

    let kept: Vec<&str> = uri
        .query()
        .unwrap_or_default()
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| pair.split('=').next() != Some("page"))
        .collect();
    let target = format!("{}{}", urls.base(), uri.path());

    let links: Vec<String> = rels
        .into_iter()
        .map(|(page, rel)| {
            let mut query = kept.clone();
            let page_param = format!("page={page}");
            query.push(&page_param);
            format!("<{target}?{}>; rel=\"{rel}\"", query.join("&"))
        })
        .collect();
    Some(links.join(", "))
}
