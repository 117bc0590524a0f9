//! Shared state handed to every handler.

use std::sync::Arc;

use issues_core::{IssueTracker, IssuesError};
use tracing::error;

use super::auth::AuthGate;

#[derive(Clone)]
pub struct AppState {
    pub tracker: Arc<IssueTracker>,
    pub auth: Arc<AuthGate>,
    /// Overrides the `Host`-derived base URL in rendered links.
    pub public_url: Option<Arc<str>>,
}

impl AppState {
    #[must_use]
    pub fn new(tracker: IssueTracker, auth: AuthGate, public_url: Option<String>) -> Self {
        Self {
            tracker: Arc::new(tracker),
            auth: Arc::new(auth),
            public_url: public_url.map(Arc::from),
        }
    }

    /// Run a tracker operation on the blocking pool.
    ///
    /// Mutations flush the JSONL file, so tracker calls stay off the async
    /// worker threads.
    ///
    /// # Errors
    ///
    /// Returns the operation's error, or `Storage` if the task panicked.
    pub async fn call<T, F>(&self, op: F) -> Result<T, IssuesError>
    where
        F: FnOnce(&IssueTracker) -> Result<T, IssuesError> + Send + 'static,
        T: Send + 'static,
    {
        let tracker = Arc::clone(&self.tracker);
        tokio::task::spawn_blocking(move || op(&tracker))
            .await
            .unwrap_or_else(|err| {
                error!(error = %err, "tracker task failed");
                Err(IssuesError::Storage(format!("tracker task failed: {err}")))
            })
    }
}
