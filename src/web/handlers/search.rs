//! `/search/issues`

use axum::{
    Json,
    extract::{OriginalUri, Query, State},
    http::{HeaderMap, HeaderValue, header},
    response::{IntoResponse, Response},
};

use crate::format::SearchResultsJson;
use crate::web::error::ApiError;
use crate::web::extract::Urls;
use crate::web::params::{SearchParams, link_header};
use crate::web::state::AppState;

/// `GET /search/issues?q=...`
pub async fn search_issues(
    State(state): State<AppState>,
    Urls(urls): Urls,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<SearchParams>,
) -> Result<Response, ApiError> {
    let options = params.options()?;
    let page = params.paging.page()?;
    let query = params.query().to_string();
    let results = state
        .call(move |tracker| tracker.search_issues(&query, options, page))
        .await?;

    let mut headers = HeaderMap::new();
    if let Some(value) = link_header(&urls, &uri, &results).and_then(|l| HeaderValue::from_str(&l).ok()) {
        headers.insert(header::LINK, value);
    }
    Ok((headers, Json(SearchResultsJson::render(&results, &urls))).into_response())
}
