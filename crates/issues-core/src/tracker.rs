//! The issue tracker: committed snapshots of a record store, plus the
//! acting user.
//!
//! Operations live in sibling modules (`issues`, `listing`, `search`,
//! `comments`) as further `impl IssueTracker` blocks. They all go through
//! [`IssueTracker::read`] or [`IssueTracker::write`].
//!
//! Readers work on the last committed snapshot and never wait for a
//! mutation or its flush. Mutations are serialized: each one copies the
//! committed state, applies itself to the copy, flushes it, and only then
//! publishes it. A mutation that fails at any step publishes nothing.

use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use chrono::{DateTime, Utc};
use tracing::{debug, error};

use crate::error::{IssuesError, Result};
use crate::model::{
    EventKind, Issue, IssueDetails, IssueEvent, Label, LockReason, RepoKey, Rename, Repository,
    StateReason,
};
use crate::store::{InMemoryStore, Record, RecordKey, RecordKind, RecordStore};
use crate::util::Clock;

pub(crate) const ISSUE_SEQUENCE: &str = "issues";
pub(crate) const COMMENT_SEQUENCE: &str = "comments";
pub(crate) const LABEL_SEQUENCE: &str = "labels";
pub(crate) const EVENT_SEQUENCE: &str = "events";

/// Optional payload of a recorded event.
#[derive(Debug, Default)]
pub(crate) struct EventPayload {
    pub label: Option<String>,
    pub assignee: Option<String>,
    pub rename: Option<Rename>,
    pub state_reason: Option<StateReason>,
    pub lock_reason: Option<LockReason>,
}

/// One committed version of the tracker contents.
#[derive(Clone)]
pub(crate) struct TrackerState<S> {
    pub(crate) store: S,
    clock: Clock,
}

impl<S: RecordStore> TrackerState<S> {
    /// Allocate a timestamp for the current mutation.
    pub(crate) fn now(&mut self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Owned copy of an issue, or `IssueNotFound`.
    pub(crate) fn issue(&self, repo: &RepoKey, number: u64) -> Result<Issue> {
        self.store
            .get(&RecordKey::Issue(repo.clone(), number))
            .and_then(Record::as_issue)
            .cloned()
            .ok_or_else(|| IssuesError::IssueNotFound {
                owner: repo.owner.clone(),
                repo: repo.name.clone(),
                number,
            })
    }

    pub(crate) fn repository_exists(&self, repo: &RepoKey) -> bool {
        self.store
            .get(&RecordKey::Repository(repo.clone()))
            .is_some()
    }

    /// Resolve an issue's label names against the label table.
    pub(crate) fn details(&self, issue: Issue) -> IssueDetails {
        let repo = issue.repo_key();
        let labels = issue
            .labels
            .iter()
            .map(|name| {
                self.store
                    .get(&RecordKey::Label(repo.clone(), name.clone()))
                    .and_then(Record::as_label)
                    .cloned()
                    .unwrap_or_else(|| Label {
                        id: 0,
                        owner: repo.owner.clone(),
                        repo: repo.name.clone(),
                        name: name.clone(),
                        color: Label::DEFAULT_COLOR.to_string(),
                        description: None,
                    })
            })
            .collect();
        IssueDetails { issue, labels }
    }

    /// Create the repository record if it does not exist yet.
    pub(crate) fn upsert_repository(&mut self, repo: &RepoKey, now: DateTime<Utc>) {
        if self.repository_exists(repo) {
            return;
        }
        debug!(repo = %repo, "creating repository");
        self.store.put(Record::Repository(Repository {
            owner: repo.owner.clone(),
            name: repo.name.clone(),
            created_at: now,
        }));
    }

    /// Create label records for any names the repository does not know yet.
    pub(crate) fn upsert_labels(&mut self, repo: &RepoKey, names: &[String]) {
        for name in names {
            let key = RecordKey::Label(repo.clone(), name.clone());
            if self.store.get(&key).is_some() {
                continue;
            }
            let id = self.store.next_id(LABEL_SEQUENCE);
            debug!(repo = %repo, label = %name, id, "creating label");
            self.store.put(Record::Label(Label {
                id,
                owner: repo.owner.clone(),
                repo: repo.name.clone(),
                name: name.clone(),
                color: Label::DEFAULT_COLOR.to_string(),
                description: None,
            }));
        }
    }

    pub(crate) fn record_event(
        &mut self,
        issue: &Issue,
        actor: &str,
        at: DateTime<Utc>,
        event: EventKind,
        payload: EventPayload,
    ) {
        let id = self.store.next_id(EVENT_SEQUENCE);
        self.store.put(Record::Event(IssueEvent {
            id,
            owner: issue.owner.clone(),
            repo: issue.repo.clone(),
            issue_number: issue.number,
            actor: actor.to_string(),
            event,
            label: payload.label,
            assignee: payload.assignee,
            rename: payload.rename,
            state_reason: payload.state_reason,
            lock_reason: payload.lock_reason,
            created_at: at,
        }));
    }
}

/// Issue tracker over a [`RecordStore`].
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
pub struct IssueTracker<S = InMemoryStore> {
    committed: RwLock<Arc<TrackerState<S>>>,
    /// Held for the whole of a mutation so sequence allocation is serialized.
    writer: Mutex<()>,
    actor: String,
}

impl IssueTracker<InMemoryStore> {
    /// A tracker over a fresh memory-only store.
    #[must_use]
    pub fn in_memory(actor: impl Into<String>) -> Self {
        Self::new(InMemoryStore::new(), actor)
    }
}

fn poisoned<T>(_: T) -> IssuesError {
    IssuesError::Storage("tracker lock poisoned".to_string())
}

impl<S: RecordStore + Clone> IssueTracker<S> {
    /// Wrap a store. `actor` is the login recorded as creator, closer and
    /// event actor of every mutation.
    pub fn new(store: S, actor: impl Into<String>) -> Self {
        let mut clock = Clock::new();
        for record in store.scan(RecordKind::Issue, |_| true) {
            if let Some(issue) = record.as_issue() {
                clock.observe(issue.updated_at);
            }
        }
        for record in store.scan(RecordKind::Comment, |_| true) {
            if let Some(comment) = record.as_comment() {
                clock.observe(comment.updated_at);
            }
        }
        for record in store.scan(RecordKind::Event, |_| true) {
            if let Some(event) = record.as_event() {
                clock.observe(event.created_at);
            }
        }

        Self {
            committed: RwLock::new(Arc::new(TrackerState { store, clock })),
            writer: Mutex::new(()),
            actor: actor.into(),
        }
    }

    /// Login recorded on mutations.
    #[must_use]
    pub fn actor(&self) -> &str {
        &self.actor
    }

    fn snapshot(&self) -> Result<Arc<TrackerState<S>>> {
        self.committed.read().map(|guard| Arc::clone(&guard)).map_err(poisoned)
    }

    fn writer_guard(&self) -> Result<MutexGuard<'_, ()>> {
        self.writer.lock().map_err(poisoned)
    }

    /// Run a read-only operation against the last committed snapshot.
    pub(crate) fn read<T>(&self, op: impl FnOnce(&TrackerState<S>) -> Result<T>) -> Result<T> {
        let snapshot = self.snapshot()?;
        op(&snapshot)
    }

    /// Run a mutation on a copy of the committed state, flush the copy and
    /// publish it.
    ///
    /// An `Err` from the closure or from the flush leaves the committed
    /// state as it was.
    pub(crate) fn write<T>(
        &self,
        op: impl FnOnce(&mut TrackerState<S>, &str) -> Result<T>,
    ) -> Result<T> {
        let _writer = self.writer_guard()?;
        let mut next = TrackerState::clone(&*self.snapshot()?);
        let value = op(&mut next, &self.actor)?;
        if let Err(err) = next.store.flush() {
            error!(error = %err, "failed to persist mutation; discarding it");
            return Err(err);
        }
        *self.committed.write().map_err(poisoned)? = Arc::new(next);
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{ListFilters, ListScope, NewIssue, Page};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    /// Store whose flush can be switched to fail.
    #[derive(Clone, Default)]
    struct FlakyStore {
        inner: InMemoryStore,
        fail: Arc<AtomicBool>,
    }

    impl RecordStore for FlakyStore {
        fn put(&mut self, record: Record) {
            self.inner.put(record);
        }

        fn get(&self, key: &RecordKey) -> Option<&Record> {
            self.inner.get(key)
        }

        fn remove(&mut self, key: &RecordKey) -> Option<Record> {
            self.inner.remove(key)
        }

        fn scan<'a, P>(
            &'a self,
            kind: RecordKind,
            predicate: P,
        ) -> Box<dyn Iterator<Item = &'a Record> + 'a>
        where
            P: Fn(&Record) -> bool + 'a,
        {
            self.inner.scan(kind, predicate)
        }

        fn next_id(&mut self, sequence: &str) -> u64 {
            self.inner.next_id(sequence)
        }

        fn flush(&mut self) -> Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(IssuesError::Storage("disk full".to_string()));
            }
            Ok(())
        }
    }

    fn new_issue(title: &str) -> NewIssue {
        NewIssue {
            title: title.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn in_memory_tracker_reports_actor() {
        let tracker = IssueTracker::in_memory("octocat");
        assert_eq!(tracker.actor(), "octocat");
    }

    #[test]
    fn clock_resumes_after_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("issues.jsonl");

        let first = IssueTracker::new(InMemoryStore::open(&path).unwrap(), "local-user");
        let created = first
            .create_issue(
                &RepoKey::new("acme", "widget"),
                NewIssue {
                    title: "Persisted".to_string(),
                    ..Default::default()
                },
            )
            .unwrap();
        drop(first);

        let second = IssueTracker::new(InMemoryStore::open(&path).unwrap(), "local-user");
        let next = second
            .create_issue(
                &RepoKey::new("acme", "widget"),
                NewIssue {
                    title: "Later".to_string(),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(next.issue.number, 2);
        assert!(next.issue.created_at > created.issue.created_at);
    }

    #[test]
    fn failed_mutation_does_not_flush() {
        let tracker = IssueTracker::in_memory("local-user");
        let err = tracker
            .create_issue(
                &RepoKey::new("acme", "widget"),
                NewIssue {
                    title: " ".to_string(),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(err.is_validation());
        let listed = tracker
            .list_issues(
                &crate::query::ListScope::All,
                &crate::query::ListFilters::default(),
                crate::query::Page::default(),
            )
            .unwrap();
        assert_eq!(listed.total_count, 0);
    }

    #[test]
    fn failed_flush_discards_the_mutation() {
        let store = FlakyStore::default();
        let fail = Arc::clone(&store.fail);
        let tracker = IssueTracker::new(store, "local-user");
        let repo = RepoKey::new("acme", "widget");

        tracker.create_issue(&repo, new_issue("kept")).unwrap();

        fail.store(true, Ordering::SeqCst);
        let err = tracker.create_issue(&repo, new_issue("lost")).unwrap_err();
        assert!(matches!(err, IssuesError::Storage(_)));
        assert!(tracker.get_issue(&repo, 2).unwrap_err().is_not_found());
        let err = tracker.create_comment(&repo, 1, "lost".to_string()).unwrap_err();
        assert!(matches!(err, IssuesError::Storage(_)));
        assert_eq!(tracker.get_issue(&repo, 1).unwrap().issue.comments, 0);

        fail.store(false, Ordering::SeqCst);
        let next = tracker.create_issue(&repo, new_issue("retried")).unwrap();
        assert_eq!(next.issue.number, 2);
        let listed = tracker
            .list_issues(&ListScope::All, &ListFilters::default(), Page::default())
            .unwrap();
        assert_eq!(listed.total_count, 2);
    }

    #[test]
    fn concurrent_creates_allocate_distinct_numbers() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 5;

        let tracker = Arc::new(IssueTracker::in_memory("local-user"));
        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let tracker = Arc::clone(&tracker);
                thread::spawn(move || {
                    let repo = RepoKey::new("acme", "widget");
                    (0..PER_THREAD)
                        .map(|i| {
                            let created = tracker
                                .create_issue(&repo, new_issue(&format!("t{t}-{i}")))
                                .unwrap();
                            (created.issue.number, created.issue.id)
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut numbers = Vec::new();
        let mut ids = HashSet::new();
        for handle in handles {
            for (number, id) in handle.join().unwrap() {
                numbers.push(number);
                assert!(ids.insert(id), "duplicate id {id}");
            }
        }
        numbers.sort_unstable();
        let expected: Vec<u64> = (1..=(THREADS * PER_THREAD) as u64).collect();
        assert_eq!(numbers, expected);
    }

    #[test]
    fn writer_proceeds_while_reader_holds_snapshot() {
        let tracker = IssueTracker::in_memory("local-user");
        let repo = RepoKey::new("acme", "widget");

        let seen_inside = tracker
            .read(|state| {
                thread::scope(|scope| {
                    scope
                        .spawn(|| tracker.create_issue(&repo, new_issue("during read")))
                        .join()
                        .unwrap()
                })?;
                Ok(state.repository_exists(&repo))
            })
            .unwrap();

        assert!(!seen_inside);
        assert_eq!(tracker.get_issue(&repo, 1).unwrap().issue.title, "during read");
    }
}
