//! Request extractors with GitHub-style rejections.

use std::convert::Infallible;

use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::{header, request::Parts},
};
use issues_core::RepoKey;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::error::ApiError;
use super::state::AppState;
use crate::format::ApiUrls;

/// URL builder for the current request: the configured public URL, or
/// `http://<Host>`.
pub struct Urls(pub ApiUrls);

impl FromRequestParts<AppState> for Urls {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(url) = &state.public_url {
            return Ok(Self(ApiUrls::new(url)));
        }
        let host = parts
            .headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .or_else(|| parts.uri.authority().map(|a| a.as_str()))
            .unwrap_or("localhost");
        Ok(Self(ApiUrls::new(&format!("http://{host}"))))
    }
}

/// Path parameters; a segment that fails to parse (e.g. a non-numeric
/// issue number) is a 404 rather than a 400.
pub struct PathParams<T>(pub T);

impl<S, T> FromRequestParts<S> for PathParams<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Path::<T>::from_request_parts(parts, state)
            .await
            .map(|Path(value)| Self(value))
            .map_err(|rejection| {
                debug!(%rejection, "unroutable path parameters");
                ApiError::NotFound
            })
    }
}

/// JSON request body. The content type is not checked and an empty body
/// reads as `{}`.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(request, state)
            .await
            .map_err(|rejection| ApiError::BadJson(rejection.body_text()))?;
        let raw: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
            b"{}"
        } else {
            &bytes
        };
        serde_json::from_slice(raw)
            .map(Self)
            .map_err(|err| ApiError::BadJson(err.to_string()))
    }
}

#[derive(Debug, Deserialize)]
pub struct RepoPath {
    pub owner: String,
    pub repo: String,
}

impl RepoPath {
    #[must_use]
    pub fn key(&self) -> RepoKey {
        RepoKey::new(&self.owner, &self.repo)
    }
}

#[derive(Debug, Deserialize)]
pub struct IssuePath {
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

impl IssuePath {
    #[must_use]
    pub fn key(&self) -> RepoKey {
        RepoKey::new(&self.owner, &self.repo)
    }
}

#[derive(Debug, Deserialize)]
pub struct CommentPath {
    pub owner: String,
    pub repo: String,
    pub comment_id: u64,
}

impl CommentPath {
    #[must_use]
    pub fn key(&self) -> RepoKey {
        RepoKey::new(&self.owner, &self.repo)
    }
}

#[derive(Debug, Deserialize)]
pub struct OrgPath {
    pub org: String,
}
