//! `issues-core` — GitHub Issues semantics over a keyed record store.
//!
//! Provides issue creation and state transitions, filtered listings,
//! cross-repository search, comments and the issue timeline. There is no
//! HTTP here; callers render the returned records however they like.
//!
//! # Quick Start
//!
//! ```no_run
//! use issues_core::{InMemoryStore, IssuePatch, IssueState, IssueTracker, NewIssue, RepoKey};
//!
//! // Load existing file (created on first write if missing)
//! let store = InMemoryStore::open("path/to/issues.jsonl").unwrap();
//! let tracker = IssueTracker::new(store, "local-user");
//! let repo = RepoKey::new("acme", "widget");
//!
//! // Create
//! let created = tracker
//!     .create_issue(&repo, NewIssue { title: "New task".into(), ..Default::default() })
//!     .unwrap();
//!
//! // Close
//! tracker
//!     .update_issue(
//!         &repo,
//!         created.issue.number,
//!         IssuePatch { state: Some(IssueState::Closed), ..Default::default() },
//!     )
//!     .unwrap();
//! ```

pub mod comments;
pub mod error;
pub mod issues;
pub mod jsonl;
pub mod listing;
pub mod model;
pub mod query;
pub mod search;
pub mod store;
pub mod tracker;
pub mod util;
pub mod validation;

pub use error::{IssuesError, Result, ValidationError};
pub use model::{
    Comment, EventKind, Issue, IssueDetails, IssueEvent, IssueState, Label, LockReason, RepoKey,
    StateReason, User,
};
pub use query::{
    AssigneeFilter, CommentFilters, CommentSort, Direction, IssuePatch, ListFilters, ListScope,
    NewIssue, Page, Paged, SearchOptions, SortField, StateFilter,
};
pub use search::{SearchHit, SearchQuery};
pub use store::{InMemoryStore, Record, RecordKey, RecordKind, RecordStore};
pub use tracker::IssueTracker;
