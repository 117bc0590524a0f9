//! Issue comment handlers.

use axum::{
    Json,
    extract::{OriginalUri, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use super::paginated;
use crate::format::CommentJson;
use crate::web::error::ApiError;
use crate::web::extract::{CommentPath, IssuePath, JsonBody, PathParams, RepoPath, Urls};
use crate::web::params::CommentParams;
use crate::web::state::AppState;

/// Body of comment create and update.
#[derive(Debug, Default, Deserialize)]
pub struct CommentRequest {
    pub body: Option<String>,
}

/// `GET /repos/{owner}/{repo}/issues/{number}/comments`
pub async fn list_comments(
    State(state): State<AppState>,
    Urls(urls): Urls,
    OriginalUri(uri): OriginalUri,
    PathParams(path): PathParams<IssuePath>,
    Query(params): Query<CommentParams>,
) -> Result<Response, ApiError> {
    let filters = params.filters()?;
    let page = params.paging.page()?;
    let repo = path.key();
    let paged = state
        .call(move |tracker| tracker.list_comments(&repo, path.number, &filters, page))
        .await?;
    Ok(paginated(&urls, &uri, &paged, |c| CommentJson::render(c, &urls)))
}

/// `POST /repos/{owner}/{repo}/issues/{number}/comments`
pub async fn create_comment(
    State(state): State<AppState>,
    Urls(urls): Urls,
    PathParams(path): PathParams<IssuePath>,
    JsonBody(request): JsonBody<CommentRequest>,
) -> Result<Response, ApiError> {
    let repo = path.key();
    let body = request.body.unwrap_or_default();
    let comment = state
        .call(move |tracker| tracker.create_comment(&repo, path.number, body))
        .await
        .map_err(ApiError::comment)?;
    let json = CommentJson::render(&comment, &urls);
    let location = json.url.clone();
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(json),
    )
        .into_response())
}

/// `GET /repos/{owner}/{repo}/issues/comments`
pub async fn list_repo_comments(
    State(state): State<AppState>,
    Urls(urls): Urls,
    OriginalUri(uri): OriginalUri,
    PathParams(path): PathParams<RepoPath>,
    Query(params): Query<CommentParams>,
) -> Result<Response, ApiError> {
    let filters = params.filters()?;
    let page = params.paging.page()?;
    let repo = path.key();
    let paged = state
        .call(move |tracker| tracker.list_repo_comments(&repo, &filters, page))
        .await?;
    Ok(paginated(&urls, &uri, &paged, |c| CommentJson::render(c, &urls)))
}

/// `GET /repos/{owner}/{repo}/issues/comments/{comment_id}`
pub async fn get_comment(
    State(state): State<AppState>,
    Urls(urls): Urls,
    PathParams(path): PathParams<CommentPath>,
) -> Result<Json<CommentJson>, ApiError> {
    let repo = path.key();
    let comment = state
        .call(move |tracker| tracker.get_comment(&repo, path.comment_id))
        .await?;
    Ok(Json(CommentJson::render(&comment, &urls)))
}

/// `PATCH /repos/{owner}/{repo}/issues/comments/{comment_id}`
pub async fn update_comment(
    State(state): State<AppState>,
    Urls(urls): Urls,
    PathParams(path): PathParams<CommentPath>,
    JsonBody(request): JsonBody<CommentRequest>,
) -> Result<Json<CommentJson>, ApiError> {
    let repo = path.key();
    let body = request.body.unwrap_or_default();
    let comment = state
        .call(move |tracker| tracker.update_comment(&repo, path.comment_id, body))
        .await
        .map_err(ApiError::comment)?;
    Ok(Json(CommentJson::render(&comment, &urls)))
}

/// `DELETE /repos/{owner}/{repo}/issues/comments/{comment_id}`
pub async fn delete_comment(
    State(state): State<AppState>,
    PathParams(path): PathParams<CommentPath>,
) -> Result<StatusCode, ApiError> {
    let repo = path.key();
    state
        .call(move |tracker| tracker.delete_comment(&repo, path.comment_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `PUT /repos/{owner}/{repo}/issues/comments/{comment_id}/pin`
pub async fn pin_comment(
    State(state): State<AppState>,
    Urls(urls): Urls,
    PathParams(path): PathParams<CommentPath>,
) -> Result<Json<CommentJson>, ApiError> {
    let repo = path.key();
    let comment = state
        .call(move |tracker| tracker.pin_comment(&repo, path.comment_id))
        .await?;
    Ok(Json(CommentJson::render(&comment, &urls)))
}

/// `DELETE /repos/{owner}/{repo}/issues/comments/{comment_id}/pin`
pub async fn unpin_comment(
    State(state): State<AppState>,
    PathParams(path): PathParams<CommentPath>,
) -> Result<StatusCode, ApiError> {
    let repo = path.key();
    state
        .call(move |tracker| tracker.unpin_comment(&repo, path.comment_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
