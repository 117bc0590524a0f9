//! Issue comments.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::{IssuesError, Result};
use crate::model::{Comment, RepoKey};
use crate::query::{CommentFilters, CommentSort, Direction, Page, Paged};
use crate::store::{Record, RecordKey, RecordKind, RecordStore};
use crate::tracker::{COMMENT_SEQUENCE, IssueTracker, TrackerState};
use crate::validation::CommentValidator;

fn lookup<S: RecordStore>(state: &TrackerState<S>, repo: &RepoKey, id: u64) -> Option<Comment> {
    state
        .store
        .get(&RecordKey::Comment(id))
        .and_then(Record::as_comment)
        .filter(|c| c.belongs_to(repo))
        .cloned()
}

fn require<S: RecordStore>(state: &TrackerState<S>, repo: &RepoKey, id: u64) -> Result<Comment> {
    lookup(state, repo, id).ok_or(IssuesError::CommentNotFound { id })
}

fn chronological(a: &Comment, b: &Comment) -> Ordering {
    a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id))
}

fn collect_comments<S, P>(
    state: &TrackerState<S>,
    since: Option<DateTime<Utc>>,
    predicate: P,
) -> Vec<Comment>
where
    S: RecordStore,
    P: Fn(&Comment) -> bool,
{
    state
        .store
        .scan(RecordKind::Comment, |_| true)
        .filter_map(Record::as_comment)
        .filter(|c| predicate(c) && since.is_none_or(|s| c.updated_at >= s))
        .cloned()
        .collect()
}

impl<S: RecordStore + Clone> IssueTracker<S> {
    /// Comment on an issue.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a blank body or `IssueNotFound` for an unknown issue.
    pub fn create_comment(&self, repo: &RepoKey, number: u64, body: String) -> Result<Comment> {
        CommentValidator::validate_body(&body)?;

        self.write(|state, actor| {
            let mut issue = state.issue(repo, number)?;
            let now = state.now();
            let id = state.store.next_id(COMMENT_SEQUENCE);
            let comment = Comment {
                id,
                owner: repo.owner.clone(),
                repo: repo.name.clone(),
                issue_number: number,
                body,
                user: actor.to_string(),
                created_at: now,
                updated_at: now,
                pinned: false,
            };

            issue.comments += 1;
            issue.updated_at = now;
            state.store.put(Record::Issue(issue));
            state.store.put(Record::Comment(comment.clone()));

            info!(repo = %repo, number, id, "created comment");
            Ok(comment)
        })
    }

    /// Comments of one issue, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `IssueNotFound` for an unknown issue.
    pub fn list_comments(
        &self,
        repo: &RepoKey,
        number: u64,
        filters: &CommentFilters,
        page: Page,
    ) -> Result<Paged<Comment>> {
        self.read(|state| {
            state.issue(repo, number)?;
            let mut comments = collect_comments(state, filters.since, |c| {
                c.belongs_to(repo) && c.issue_number == number
            });
            comments.sort_by(chronological);
            Ok(Paged::from_ordered(comments, page))
        })
    }

    /// Comments across every issue of a repository.
    ///
    /// Without `sort` the order is chronological. With `sort` the direction
    /// defaults to descending.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the tracker lock is poisoned.
    pub fn list_repo_comments(
        &self,
        repo: &RepoKey,
        filters: &CommentFilters,
        page: Page,
    ) -> Result<Paged<Comment>> {
        self.read(|state| {
            let mut comments = collect_comments(state, filters.since, |c| c.belongs_to(repo));
            match filters.sort {
                None => {
                    let direction = filters.direction.unwrap_or(Direction::Asc);
                    comments.sort_by(|a, b| direction.apply(chronological(a, b)));
                }
                Some(sort) => {
                    let direction = filters.direction.unwrap_or_default();
                    comments.sort_by(|a, b| {
                        let primary = match sort {
                            CommentSort::Created => a.created_at.cmp(&b.created_at),
                            CommentSort::Updated => a.updated_at.cmp(&b.updated_at),
                        };
                        direction.apply(primary.then(a.id.cmp(&b.id)))
                    });
                }
            }
            Ok(Paged::from_ordered(comments, page))
        })
    }

    /// Fetch one comment.
    ///
    /// # Errors
    ///
    /// Returns `CommentNotFound` if the id is unknown in this repository.
    pub fn get_comment(&self, repo: &RepoKey, id: u64) -> Result<Comment> {
        self.read(|state| require(state, repo, id))
    }

    /// Replace a comment's body.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a blank body or `CommentNotFound` for an unknown id.
    pub fn update_comment(&self, repo: &RepoKey, id: u64, body: String) -> Result<Comment> {
        CommentValidator::validate_body(&body)?;

        self.write(|state, _actor| {
            let mut comment = require(state, repo, id)?;
            comment.body = body;
            comment.updated_at = state.now();
            state.store.put(Record::Comment(comment.clone()));
            debug!(repo = %repo, id, "updated comment");
            Ok(comment)
        })
    }

    /// Delete a comment. Returns whether anything was removed; deleting an
    /// unknown or already deleted id succeeds without change.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the change cannot be persisted.
    pub fn delete_comment(&self, repo: &RepoKey, id: u64) -> Result<bool> {
        self.write(|state, _actor| {
            let Some(comment) = lookup(state, repo, id) else {
                debug!(repo = %repo, id, "comment already absent");
                return Ok(false);
            };

            let now = state.now();
            if let Ok(mut issue) = state.issue(repo, comment.issue_number) {
                issue.comments = issue.comments.saturating_sub(1);
                issue.updated_at = now;
                state.store.put(Record::Issue(issue));
            }
            state.store.remove(&RecordKey::Comment(id));

            info!(repo = %repo, id, number = comment.issue_number, "deleted comment");
            Ok(true)
        })
    }

    /// Pin a comment.
    ///
    /// # Errors
    ///
    /// Returns `CommentNotFound` for an unknown id.
    pub fn pin_comment(&self, repo: &RepoKey, id: u64) -> Result<Comment> {
        self.write(|state, _actor| {
            let mut comment = require(state, repo, id)?;
            if !comment.pinned {
                comment.pinned = true;
                state.store.put(Record::Comment(comment.clone()));
            }
            Ok(comment)
        })
    }

    /// Unpin a comment. Unknown ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the change cannot be persisted.
    pub fn unpin_comment(&self, repo: &RepoKey, id: u64) -> Result<()> {
        self.write(|state, _actor| {
            if let Some(mut comment) = lookup(state, repo, id) {
                if comment.pinned {
                    comment.pinned = false;
                    state.store.put(Record::Comment(comment));
                }
            }
            Ok(())
        })
    }
}
