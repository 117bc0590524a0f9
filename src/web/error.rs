//! HTTP error type and its GitHub-style JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use issues_core::IssuesError;
use serde::Serialize;

/// Documentation link attached to error bodies, as GitHub does.
pub const DOCUMENTATION_URL: &str = "https://docs.github.com/rest";

/// Error type for API handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Tracker error; `resource` names the GitHub resource in 422 bodies.
    #[error("{source}")]
    Core {
        resource: &'static str,
        #[source]
        source: IssuesError,
    },

    /// Request body is not valid JSON for the endpoint.
    #[error("Problems parsing JSON: {0}")]
    BadJson(String),

    /// Unknown route or unparseable path segment.
    #[error("Not Found")]
    NotFound,

    /// Missing or wrong bearer token.
    #[error("Requires authentication")]
    Unauthorized,
}

impl ApiError {
    /// Attribute validation failures to comments instead of issues.
    #[must_use]
    pub fn comment(source: IssuesError) -> Self {
        Self::Core {
            resource: "IssueComment",
            source,
        }
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Core { source, .. } if source.is_not_found() => StatusCode::NOT_FOUND,
            Self::Core { source, .. } if source.is_validation() => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Core { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadJson(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }
}

impl From<IssuesError> for ApiError {
    fn from(source: IssuesError) -> Self {
        Self::Core {
            resource: "Issue",
            source,
        }
    }
}

#[derive(Serialize)]
struct FieldError {
    resource: &'static str,
    field: String,
    code: &'static str,
    message: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    message: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<FieldError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    documentation_url: Option<&'static str>,
}

impl ErrorResponse {
    const fn plain(message: &'static str) -> Self {
        Self {
            message,
            errors: Vec::new(),
            documentation_url: None,
        }
    }

    const fn documented(message: &'static str) -> Self {
        Self {
            message,
            errors: Vec::new(),
            documentation_url: Some(DOCUMENTATION_URL),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Core { resource, source } if source.is_validation() => ErrorResponse {
                message: "Validation Failed",
                errors: source
                    .validation_errors()
                    .into_iter()
                    .map(|e| FieldError {
                        resource: *resource,
                        field: e.field,
                        code: "invalid",
                        message: e.message,
                    })
                    .collect(),
                documentation_url: Some(DOCUMENTATION_URL),
            },
            Self::Core { source, .. } if source.is_not_found() => {
                tracing::debug!(error = %source, "lookup failed");
                ErrorResponse::documented("Not Found")
            }
            Self::Core { source, .. } => {
                tracing::error!(error = %source, "internal server error");
                ErrorResponse::plain("Internal Server Error")
            }
            Self::BadJson(reason) => {
                tracing::debug!(%reason, "rejected request body");
                ErrorResponse::documented("Problems parsing JSON")
            }
            Self::NotFound => ErrorResponse::documented("Not Found"),
            Self::Unauthorized => ErrorResponse::plain("Requires authentication"),
        };

        (status, Json(body)).into_response()
    }
}
