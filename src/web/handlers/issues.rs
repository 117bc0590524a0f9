//! Issue handlers: listings, CRUD, locking, timeline and labels.

use axum::{
    Json,
    extract::{OriginalUri, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use issues_core::{
    IssuePatch, IssueState, IssueTracker, IssuesError, Label, ListScope, LockReason, NewIssue,
    Page, RepoKey, StateReason,
};
use serde::Deserialize;

use super::paginated;
use crate::format::{EventJson, IssueJson, LabelJson};
use crate::web::error::ApiError;
use crate::web::extract::{IssuePath, JsonBody, OrgPath, PathParams, RepoPath, Urls};
use crate::web::params::{ListParams, PageParams, double_option};
use crate::web::state::AppState;

/// A label given by name or as a `{"name": ...}` object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum LabelInput {
    Name(String),
    Object { name: String },
}

impl LabelInput {
    fn into_name(self) -> String {
        match self {
            Self::Name(name) | Self::Object { name } => name,
        }
    }
}

fn label_names(labels: Vec<LabelInput>) -> Vec<String> {
    labels.into_iter().map(LabelInput::into_name).collect()
}

/// A title given as a string or a bare number.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TitleInput {
    Text(String),
    Number(serde_json::Number),
}

impl TitleInput {
    fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Number(number) => number.to_string(),
        }
    }
}

/// Body of `POST /repos/{owner}/{repo}/issues`.
#[derive(Debug, Default, Deserialize)]
pub struct CreateIssueRequest {
    pub title: Option<TitleInput>,
    pub body: Option<String>,
    pub labels: Option<Vec<LabelInput>>,
    pub assignees: Option<Vec<String>>,
    /// Single-assignee form; ignored when `assignees` is present.
    pub assignee: Option<String>,
}

impl CreateIssueRequest {
    fn into_new_issue(self) -> NewIssue {
        let assignees = match (self.assignees, self.assignee) {
            (Some(list), _) => list,
            (None, Some(one)) => vec![one],
            (None, None) => Vec::new(),
        };
        NewIssue {
            title: self.title.map(TitleInput::into_text).unwrap_or_default(),
            body: self.body,
            labels: self.labels.map(label_names).unwrap_or_default(),
            assignees,
        }
    }
}

/// Body of `PATCH /repos/{owner}/{repo}/issues/{number}`.
///
/// `null` clears `body`, `labels` and `assignees`; a `null` title or state
/// is ignored.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateIssueRequest {
    pub title: Option<TitleInput>,
    #[serde(default, deserialize_with = "double_option")]
    pub body: Option<Option<String>>,
    pub state: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub state_reason: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub labels: Option<Option<Vec<LabelInput>>>,
    #[serde(default, deserialize_with = "double_option")]
    pub assignees: Option<Option<Vec<String>>>,
    #[serde(default, deserialize_with = "double_option")]
    pub assignee: Option<Option<String>>,
}

impl UpdateIssueRequest {
    /// # Errors
    ///
    /// Returns a validation error for an unknown `state` or `state_reason`.
    pub fn into_patch(self) -> Result<IssuePatch, IssuesError> {
        let state = self.state.as_deref().map(str::parse::<IssueState>).transpose()?;
        let state_reason = match self.state_reason {
            Some(Some(reason)) => Some(Some(reason.parse::<StateReason>()?)),
            Some(None) => Some(None),
            None => None,
        };
        let assignees = match (self.assignees, self.assignee) {
            (Some(list), _) => Some(list.unwrap_or_default()),
            (None, Some(one)) => Some(one.into_iter().collect()),
            (None, None) => None,
        };
        Ok(IssuePatch {
            title: self.title.map(TitleInput::into_text),
            body: self.body,
            state,
            state_reason,
            labels: self.labels.map(|l| l.map(label_names).unwrap_or_default()),
            assignees,
        })
    }
}

/// Body of `PUT .../lock`.
#[derive(Debug, Default, Deserialize)]
pub struct LockRequest {
    pub lock_reason: Option<String>,
}

async fn list_scoped(
    state: &AppState,
    urls: &Urls,
    uri: &OriginalUri,
    scope: ListScope,
    params: &ListParams,
) -> Result<Response, ApiError> {
    let filters = params.filters()?;
    let page = params.paging.page()?;
    let paged = state
        .call(move |tracker| tracker.list_issues(&scope, &filters, page))
        .await?;
    Ok(paginated(&urls.0, &uri.0, &paged, |details| {
        IssueJson::render(details, &urls.0)
    }))
}

/// `GET /repos/{owner}/{repo}/issues`
pub async fn list_repo_issues(
    State(state): State<AppState>,
    urls: Urls,
    uri: OriginalUri,
    PathParams(path): PathParams<RepoPath>,
    Query(params): Query<ListParams>,
) -> Result<Response, ApiError> {
    list_scoped(&state, &urls, &uri, ListScope::Repository(path.key()), &params).await
}

/// `GET /issues` and `GET /user/issues`
pub async fn list_all_issues(
    State(state): State<AppState>,
    urls: Urls,
    uri: OriginalUri,
    Query(params): Query<ListParams>,
) -> Result<Response, ApiError> {
    list_scoped(&state, &urls, &uri, ListScope::All, &params).await
}

/// `GET /orgs/{org}/issues`
pub async fn list_org_issues(
    State(state): State<AppState>,
    urls: Urls,
    uri: OriginalUri,
    PathParams(path): PathParams<OrgPath>,
    Query(params): Query<ListParams>,
) -> Result<Response, ApiError> {
    list_scoped(&state, &urls, &uri, ListScope::Owner(path.org), &params).await
}

/// `POST /repos/{owner}/{repo}/issues`
pub async fn create_issue(
    State(state): State<AppState>,
    Urls(urls): Urls,
    PathParams(path): PathParams<RepoPath>,
    JsonBody(request): JsonBody<CreateIssueRequest>,
) -> Result<Response, ApiError> {
    let repo = path.key();
    let new = request.into_new_issue();
    let created = state
        .call(move |tracker| tracker.create_issue(&repo, new))
        .await?;
    let json = IssueJson::render(&created, &urls);
    let location = json.url.clone();
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(json),
    )
        .into_response())
}

/// `GET /repos/{owner}/{repo}/issues/{number}`
pub async fn get_issue(
    State(state): State<AppState>,
    Urls(urls): Urls,
    PathParams(path): PathParams<IssuePath>,
) -> Result<Json<IssueJson>, ApiError> {
    let repo = path.key();
    let details = state
        .call(move |tracker| tracker.get_issue(&repo, path.number))
        .await?;
    Ok(Json(IssueJson::render(&details, &urls)))
}

/// `PATCH /repos/{owner}/{repo}/issues/{number}`
pub async fn update_issue(
    State(state): State<AppState>,
    Urls(urls): Urls,
    PathParams(path): PathParams<IssuePath>,
    JsonBody(request): JsonBody<UpdateIssueRequest>,
) -> Result<Json<IssueJson>, ApiError> {
    let patch = request.into_patch()?;
    let repo = path.key();
    let details = state
        .call(move |tracker| tracker.update_issue(&repo, path.number, patch))
        .await?;
    Ok(Json(IssueJson::render(&details, &urls)))
}

/// `PUT /repos/{owner}/{repo}/issues/{number}/lock`
pub async fn lock_issue(
    State(state): State<AppState>,
    PathParams(path): PathParams<IssuePath>,
    JsonBody(request): JsonBody<LockRequest>,
) -> Result<StatusCode, ApiError> {
    let reason = request
        .lock_reason
        .as_deref()
        .map(str::parse::<LockReason>)
        .transpose()?;
    let repo = path.key();
    state
        .call(move |tracker| tracker.lock_issue(&repo, path.number, reason))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /repos/{owner}/{repo}/issues/{number}/lock`
pub async fn unlock_issue(
    State(state): State<AppState>,
    PathParams(path): PathParams<IssuePath>,
) -> Result<StatusCode, ApiError> {
    let repo = path.key();
    state
        .call(move |tracker| tracker.unlock_issue(&repo, path.number))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Every label of a repository, for resolving event label colors.
fn all_labels(tracker: &IssueTracker, repo: &RepoKey) -> Result<Vec<Label>, IssuesError> {
    let mut labels = Vec::new();
    let mut page = Page::new(Some(100), Some(1));
    loop {
        let paged = tracker.list_labels(repo, page)?;
        let more = paged.has_next();
        labels.extend(paged.items);
        if !more {
            return Ok(labels);
        }
        page.page += 1;
    }
}

/// `GET /repos/{owner}/{repo}/issues/{number}/events`
pub async fn list_events(
    State(state): State<AppState>,
    Urls(urls): Urls,
    OriginalUri(uri): OriginalUri,
    PathParams(path): PathParams<IssuePath>,
    Query(params): Query<PageParams>,
) -> Result<Response, ApiError> {
    let page = params.page()?;
    let repo = path.key();
    let (paged, labels) = state
        .call(move |tracker| {
            let paged = tracker.list_events(&repo, path.number, page)?;
            Ok((paged, all_labels(tracker, &repo)?))
        })
        .await?;
    Ok(paginated(&urls, &uri, &paged, |event| {
        EventJson::render(event, &urls, &labels)
    }))
}

/// `GET /repos/{owner}/{repo}/labels`
pub async fn list_labels(
    State(state): State<AppState>,
    Urls(urls): Urls,
    OriginalUri(uri): OriginalUri,
    PathParams(path): PathParams<RepoPath>,
    Query(params): Query<PageParams>,
) -> Result<Response, ApiError> {
    let page = params.page()?;
    let repo = path.key();
    let paged = state
        .call(move |tracker| tracker.list_labels(&repo, page))
        .await?;
    Ok(paginated(&urls, &uri, &paged, |label| {
        LabelJson::render(label, &urls)
    }))
}
