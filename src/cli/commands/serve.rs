//! Serve command implementation.

use anyhow::{Context, Result};
use issues_core::{InMemoryStore, IssueTracker};
use tracing::{info, warn};

use crate::config::{Config, LOCALHOST};
use crate::web::{self, AppState, AuthGate, auth};

/// Open the tracker over the configured snapshot file (or memory only).
///
/// # Errors
///
/// Returns an error if the snapshot exists but cannot be loaded.
pub fn open_tracker(config: &Config) -> Result<IssueTracker> {
    let store = match config.storage_path() {
        Some(path) => {
            let store = InMemoryStore::open(&path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
            info!(path = %path.display(), records = store.len(), "opened issue store");
            store
        }
        None => {
            info!("storage file disabled; keeping issues in memory");
            InMemoryStore::new()
        }
    };
    Ok(IssueTracker::new(store, config.user.login.as_str()))
}

/// Start the server and block until ctrl-c.
///
/// # Errors
///
/// Returns an error if startup fails or the listener cannot be bound.
pub fn execute(config: &Config) -> Result<()> {
    let tracker = open_tracker(config)?;
    let gate = AuthGate::from_config(config).context("Failed to prepare auth token")?;

    if !gate.required() && config.server.host != LOCALHOST {
        warn!(host = %config.server.host, "serving on a non-local address without authentication");
    }

    println!(
        "gh-issues-local listening on http://{}:{}",
        config.server.host, config.server.port
    );
    if gate.required() {
        if config.auth.token.is_some() {
            println!("Auth: bearer token from configuration");
        } else {
            println!(
                "Auth: bearer token in {}",
                auth::token_path(&config.data_dir()).display()
            );
        }
    }

    let state = AppState::new(tracker, gate, config.public_url.clone());
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime.block_on(web::run_server(state, &config.server))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use issues_core::{NewIssue, RepoKey};

    #[test]
    fn tracker_persists_to_configured_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            data_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };

        let tracker = open_tracker(&config).unwrap();
        assert_eq!(tracker.actor(), "local-user");
        tracker
            .create_issue(
                &RepoKey::new("acme", "widget"),
                NewIssue {
                    title: "Persisted".into(),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(dir.path().join("issues.jsonl").is_file());

        let reopened = open_tracker(&config).unwrap();
        let issue = reopened
            .get_issue(&RepoKey::new("acme", "widget"), 1)
            .unwrap();
        assert_eq!(issue.issue.title, "Persisted");
    }

    #[test]
    fn memory_only_storage_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            data_dir: Some(dir.path().to_path_buf()),
            storage: StorageConfig { file: None },
            ..Default::default()
        };
        let tracker = open_tracker(&config).unwrap();
        tracker
            .create_issue(
                &RepoKey::new("acme", "widget"),
                NewIssue {
                    title: "Ephemeral".into(),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
