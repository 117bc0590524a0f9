//! Request handlers, grouped by resource.

pub mod comments;
pub mod issues;
pub mod meta;
pub mod search;

use axum::{
    Json,
    http::{HeaderMap, HeaderValue, Uri, header},
    response::{IntoResponse, Response},
};
use issues_core::Paged;
use serde::Serialize;

use super::params::link_header;
use crate::format::ApiUrls;

/// A JSON array response with a `Link` header when there is more than one page.
pub(crate) fn paginated<T, J, F>(urls: &ApiUrls, uri: &Uri, paged: &Paged<T>, render: F) -> Response
where
    J: Serialize,
    F: FnMut(&T) -> J,
{
    let items: Vec<J> = paged.items.iter().map(render).collect();
    let mut headers = HeaderMap::new();
    if let Some(value) = link_header(urls, uri, paged).and_then(|l| HeaderValue::from_str(&l).ok()) {
        headers.insert(header::LINK, value);
    }
    (headers, Json(items)).into_response()
}
