//! Response rendering for `gh_issues_local`.
//!
//! Stored records carry no URLs. Everything a GitHub client expects to
//! follow (`url`, `html_url`, `comments_url`, ...) is derived here from a
//! base URL chosen per request.
//!
//! # JSON Output Types
//!
//! - [`IssueJson`] - Issue as returned by the issues endpoints
//! - [`CommentJson`] - Issue comment
//! - [`EventJson`] - Timeline event
//! - [`LabelJson`] / [`UserJson`] - Nested objects
//! - [`SearchResultsJson`] - `/search/issues` envelope

mod output;

pub use output::{
    ApiUrls, CommentJson, EventJson, IssueJson, LabelJson, LabelRef, RenameJson, SearchItemJson,
    SearchResultsJson, UserJson,
};
