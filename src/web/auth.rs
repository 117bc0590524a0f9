//! Bearer-token gate for non-local deployments.
//!
//! The token lives in `<data_dir>/.gh-issues-local-token` unless configured
//! explicitly. Clients send it as `Authorization: Bearer <token>` (the
//! `token <token>` form used by `gh` is accepted too).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use rand::Rng;
use rand::distr::Alphanumeric;
use tracing::{debug, info, warn};

use super::error::ApiError;
use super::state::AppState;
use crate::config::Config;

pub const TOKEN_FILE: &str = ".gh-issues-local-token";
const TOKEN_LEN: usize = 43;

/// Paths reachable without a token even when the gate is on.
const PUBLIC_PATHS: [&str; 3] = ["/api/health", "/api/auth/status", "/api/auth/verify"];
const PROTECTED_PREFIXES: [&str; 5] = ["/repos/", "/search/", "/orgs/", "/user/", "/api/"];

/// Token check state. `None` means the gate is off.
#[derive(Debug, Clone, Default)]
pub struct AuthGate {
    token: Option<String>,
}

impl AuthGate {
    #[must_use]
    pub const fn disabled() -> Self {
        Self { token: None }
    }

    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    /// Build the gate for a configuration, creating the token file if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the token file cannot be read or written.
    pub fn from_config(config: &Config) -> io::Result<Self> {
        if !config.auth_enabled() {
            return Ok(Self::disabled());
        }
        match &config.auth.token {
            Some(token) => Ok(Self::with_token(token.clone())),
            None => ensure_token(&config.data_dir()).map(Self::with_token),
        }
    }

    #[must_use]
    pub const fn required(&self) -> bool {
        self.token.is_some()
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Whether `candidate` is acceptable. Always true when the gate is off.
    #[must_use]
    pub fn verify(&self, candidate: &str) -> bool {
        self.token
            .as_deref()
            .is_none_or(|expected| constant_time_eq(expected.as_bytes(), candidate.as_bytes()))
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// A fresh random token.
#[must_use]
pub fn generate_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

#[must_use]
pub fn token_path(data_dir: &Path) -> PathBuf {
    data_dir.join(TOKEN_FILE)
}

/// Read the token file, generating it (mode 0600) if missing or empty.
///
/// # Errors
///
/// Returns an error if the file cannot be read or created.
pub fn ensure_token(data_dir: &Path) -> io::Result<String> {
    let path = token_path(data_dir);
    if path.is_file() {
        let existing = fs::read_to_string(&path)?;
        let existing = existing.trim();
        if !existing.is_empty() {
            debug!(path = %path.display(), "using existing auth token");
            return Ok(existing.to_string());
        }
    }

    fs::create_dir_all(data_dir)?;
    let token = generate_token();
    fs::write(&path, format!("{token}\n"))?;
    restrict_permissions(&path)?;
    info!(path = %path.display(), "generated auth token");
    Ok(token)
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> io::Result<()> {
    Ok(())
}

#[must_use]
pub fn is_public(path: &str) -> bool {
    PUBLIC_PATHS.contains(&path)
}

/// Whether a request path requires a token when the gate is on.
#[must_use]
pub fn is_protected(path: &str) -> bool {
    if is_public(path) {
        return false;
    }
    path == "/issues" || PROTECTED_PREFIXES.iter().any(|p| path.starts_with(p))
}

/// Extract the credential from an `Authorization` header value.
fn bearer(value: &str) -> Option<&str> {
    let (scheme, credential) = value.trim().split_once(' ')?;
    (scheme.eq_ignore_ascii_case("bearer") || scheme.eq_ignore_ascii_case("token"))
        .then(|| credential.trim())
}

/// Middleware rejecting protected requests without a valid token.
pub async fn require_token(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if !state.auth.required() || !is_protected(request.uri().path()) {
        return next.run(request).await;
    }

    let accepted = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer)
        .is_some_and(|token| state.auth.verify(token));

    if accepted {
        next.run(request).await
    } else {
        warn!(path = request.uri().path(), "rejected unauthenticated request");
        ApiError::Unauthorized.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protected_paths() {
        assert!(is_protected("/repos/acme/widget/issues"));
        assert!(is_protected("/search/issues"));
        assert!(is_protected("/orgs/acme/issues"));
        assert!(is_protected("/user/issues"));
        assert!(is_protected("/issues"));
        assert!(is_protected("/api/anything"));
        assert!(!is_protected("/api/health"));
        assert!(!is_protected("/api/auth/status"));
        assert!(!is_protected("/api/auth/verify"));
        assert!(!is_protected("/"));
        assert!(!is_protected("/issues-overview"));
    }

    #[test]
    fn test_bearer_parsing() {
        assert_eq!(bearer("Bearer abc"), Some("abc"));
        assert_eq!(bearer("token abc"), Some("abc"));
        assert_eq!(bearer("bearer  abc "), Some("abc"));
        assert_eq!(bearer("Basic abc"), None);
        assert_eq!(bearer("abc"), None);
    }

    #[test]
    fn test_verify() {
        assert!(AuthGate::disabled().verify("anything"));
        let gate = AuthGate::with_token("secret");
        assert!(gate.verify("secret"));
        assert!(!gate.verify("secreT"));
        assert!(!gate.verify("secret2"));
    }

    #[test]
    fn test_generated_tokens_differ() {
        let a = generate_token();
        assert_eq!(a.len(), TOKEN_LEN);
        assert_ne!(a, generate_token());
    }

    #[test]
    fn test_ensure_token_persists() {
        let dir = tempfile::tempdir().unwrap();
        let first = ensure_token(dir.path()).unwrap();
        let second = ensure_token(dir.path()).unwrap();
        assert_eq!(first, second);

        let raw = fs::read_to_string(token_path(dir.path())).unwrap();
        assert_eq!(raw, format!("{first}\n"));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(token_path(dir.path()))
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_empty_token_file_is_regenerated() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(token_path(dir.path()), "\n").unwrap();
        let token = ensure_token(dir.path()).unwrap();
        assert_eq!(token.len(), TOKEN_LEN);
    }

    #[test]
    fn test_gate_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config {
            data_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        assert!(!AuthGate::from_config(&config).unwrap().required());

        config.auth.required = true;
        config.auth.token = Some("fixed".into());
        let gate = AuthGate::from_config(&config).unwrap();
        assert_eq!(gate.token(), Some("fixed"));

        config.auth.token = None;
        let gate = AuthGate::from_config(&config).unwrap();
        assert!(gate.required());
        assert!(token_path(dir.path()).is_file());
    }
}
