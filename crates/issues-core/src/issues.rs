//! Issue creation, retrieval, state machine and timeline.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::{IssuesError, Result};
use crate::model::{
    EventKind, Issue, IssueDetails, IssueEvent, IssueState, LockReason, RepoKey, Rename,
    StateReason,
};
use crate::query::{IssuePatch, NewIssue, Page, Paged};
use crate::store::{Record, RecordKind, RecordStore};
use crate::tracker::{EventPayload, ISSUE_SEQUENCE, IssueTracker, TrackerState};
use crate::util::{ordered_set, set_diff};
use crate::validation::IssueValidator;

/// Apply a requested state to an issue.
///
/// `open -> closed` takes `reason` (default `completed`; `reopened` is
/// rejected). `closed -> open` clears every close field. Requesting the
/// current state changes nothing.
///
/// # Errors
///
/// Returns `InvalidStateReason` when closing with `reopened`.
pub fn apply_state(
    issue: &mut Issue,
    target: IssueState,
    reason: Option<StateReason>,
    actor: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    match (issue.state, target) {
        (IssueState::Open, IssueState::Closed) => {
            let reason = reason.unwrap_or(StateReason::Completed);
            if !reason.is_close_reason() {
                return Err(IssuesError::InvalidStateReason {
                    reason: reason.to_string(),
                });
            }
            issue.state = IssueState::Closed;
            issue.state_reason = Some(reason);
            issue.closed_at = Some(now);
            issue.closed_by = Some(actor.to_string());
        }
        (IssueState::Closed, IssueState::Open) => {
            issue.state = IssueState::Open;
            issue.state_reason = None;
            issue.closed_at = None;
            issue.closed_by = None;
        }
        _ => {}
    }
    Ok(())
}

/// Timeline entries implied by the difference between two versions of an issue.
pub(crate) fn diff_events(before: &Issue, after: &Issue) -> Vec<(EventKind, EventPayload)> {
    let mut events = Vec::new();

    if before.title != after.title {
        events.push((
            EventKind::Renamed,
            EventPayload {
                rename: Some(Rename {
                    from: before.title.clone(),
                    to: after.title.clone(),
                }),
                ..Default::default()
            },
        ));
    }

    match (before.state, after.state) {
        (IssueState::Open, IssueState::Closed) => events.push((
            EventKind::Closed,
            EventPayload {
                state_reason: after.state_reason,
                ..Default::default()
            },
        )),
        (IssueState::Closed, IssueState::Open) => {
            events.push((EventKind::Reopened, EventPayload::default()));
        }
        _ => {}
    }

    let (added, removed) = set_diff(&before.labels, &after.labels);
    for name in added {
        events.push((
            EventKind::Labeled,
            EventPayload {
                label: Some(name.to_string()),
                ..Default::default()
            },
        ));
    }
    for name in removed {
        events.push((
            EventKind::Unlabeled,
            EventPayload {
                label: Some(name.to_string()),
                ..Default::default()
            },
        ));
    }

    let (added, removed) = set_diff(&before.assignees, &after.assignees);
    for login in added {
        events.push((
            EventKind::Assigned,
            EventPayload {
                assignee: Some(login.to_string()),
                ..Default::default()
            },
        ));
    }
    for login in removed {
        events.push((
            EventKind::Unassigned,
            EventPayload {
                assignee: Some(login.to_string()),
                ..Default::default()
            },
        ));
    }

    events
}

fn record_diff<S: RecordStore>(
    state: &mut TrackerState<S>,
    before: &Issue,
    after: &Issue,
    actor: &str,
    now: DateTime<Utc>,
) {
    for (kind, payload) in diff_events(before, after) {
        state.record_event(after, actor, now, kind, payload);
    }
}

impl<S: RecordStore + Clone> IssueTracker<S> {
    // ========================================================================
    // Issue CRUD
    // ========================================================================

    /// File a new issue, creating the repository and any unknown labels.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the title is blank or an input is too long.
    pub fn create_issue(&self, repo: &RepoKey, new: NewIssue) -> Result<IssueDetails> {
        IssueValidator::validate_new(&new)?;
        let labels = ordered_set(&new.labels);
        let assignees = ordered_set(&new.assignees);

        self.write(|state, actor| {
            let now = state.now();
            state.upsert_repository(repo, now);
            state.upsert_labels(repo, &labels);

            let id = state.store.next_id(ISSUE_SEQUENCE);
            let number = state.store.next_id(&repo.number_sequence());
            let issue = Issue {
                id,
                owner: repo.owner.clone(),
                repo: repo.name.clone(),
                number,
                title: new.title,
                body: new.body,
                state: IssueState::Open,
                state_reason: None,
                labels,
                assignees,
                user: actor.to_string(),
                closed_by: None,
                comments: 0,
                locked: false,
                active_lock_reason: None,
                created_at: now,
                updated_at: now,
                closed_at: None,
            };

            let blank = Issue {
                labels: Vec::new(),
                assignees: Vec::new(),
                ..issue.clone()
            };
            record_diff(state, &blank, &issue, actor, now);
            state.store.put(Record::Issue(issue.clone()));

            info!(repo = %repo, number, id, "created issue");
            Ok(state.details(issue))
        })
    }

    /// Fetch one issue.
    ///
    /// # Errors
    ///
    /// Returns `IssueNotFound` if the number is unknown in the repository.
    pub fn get_issue(&self, repo: &RepoKey, number: u64) -> Result<IssueDetails> {
        self.read(|state| Ok(state.details(state.issue(repo, number)?)))
    }

    /// Apply a partial update. Always bumps `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns `IssueNotFound` for an unknown issue, or a validation error
    /// (blank title, closing as `reopened`, oversized input).
    pub fn update_issue(&self, repo: &RepoKey, number: u64, patch: IssuePatch) -> Result<IssueDetails> {
        IssueValidator::validate_patch(&patch)?;

        self.write(|state, actor| {
            let before = state.issue(repo, number)?;
            let mut issue = before.clone();
            let now = state.now();

            if let Some(target) = patch.state {
                apply_state(&mut issue, target, patch.state_reason.flatten(), actor, now)?;
            }
            if let Some(title) = patch.title {
                issue.title = title;
            }
            if let Some(body) = patch.body {
                issue.body = body;
            }
            if let Some(labels) = patch.labels {
                issue.labels = ordered_set(labels);
            }
            if let Some(assignees) = patch.assignees {
                issue.assignees = ordered_set(assignees);
            }
            issue.updated_at = now;

            state.upsert_labels(repo, &issue.labels);
            record_diff(state, &before, &issue, actor, now);
            state.store.put(Record::Issue(issue.clone()));

            debug!(repo = %repo, number, state = %issue.state, "updated issue");
            Ok(state.details(issue))
        })
    }

    // ========================================================================
    // Locking
    // ========================================================================

    /// Lock an issue's conversation. Relocking replaces the reason.
    ///
    /// # Errors
    ///
    /// Returns `IssueNotFound` for an unknown issue.
    pub fn lock_issue(&self, repo: &RepoKey, number: u64, reason: Option<LockReason>) -> Result<()> {
        self.write(|state, actor| {
            let mut issue = state.issue(repo, number)?;
            let changed = !issue.locked || issue.active_lock_reason != reason;
            let now = state.now();
            issue.locked = true;
            issue.active_lock_reason = reason;
            issue.updated_at = now;

            if changed {
                state.record_event(
                    &issue,
                    actor,
                    now,
                    EventKind::Locked,
                    EventPayload {
                        lock_reason: reason,
                        ..Default::default()
                    },
                );
            }
            state.store.put(Record::Issue(issue));
            debug!(repo = %repo, number, "locked issue");
            Ok(())
        })
    }

    /// Unlock an issue's conversation.
    ///
    /// # Errors
    ///
    /// Returns `IssueNotFound` for an unknown issue.
    pub fn unlock_issue(&self, repo: &RepoKey, number: u64) -> Result<()> {
        self.write(|state, actor| {
            let mut issue = state.issue(repo, number)?;
            let was_locked = issue.locked;
            let now = state.now();
            issue.locked = false;
            issue.active_lock_reason = None;
            issue.updated_at = now;

            if was_locked {
                state.record_event(&issue, actor, now, EventKind::Unlocked, EventPayload::default());
            }
            state.store.put(Record::Issue(issue));
            debug!(repo = %repo, number, "unlocked issue");
            Ok(())
        })
    }

    // ========================================================================
    // Timeline
    // ========================================================================

    /// Events of one issue, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `IssueNotFound` for an unknown issue.
    pub fn list_events(&self, repo: &RepoKey, number: u64, page: Page) -> Result<Paged<IssueEvent>> {
        self.read(|state| {
            state.issue(repo, number)?;
            let repo = repo.clone();
            let events: Vec<IssueEvent> = state
                .store
                .scan(RecordKind::Event, move |r| {
                    r.as_event().is_some_and(|e| {
                        e.issue_number == number && e.owner == repo.owner && e.repo == repo.name
                    })
                })
                .filter_map(Record::as_event)
                .cloned()
                .collect();
            Ok(Paged::from_ordered(events, page))
        })
    }
}
