//! Core data types for issues-core.
//!
//! These are the stored shapes. The GitHub-flavoured JSON that clients see
//! is rendered from them by the HTTP layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::IssuesError;

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_false(b: &bool) -> bool {
    !*b
}

/// `(owner, name)` composite key of a repository.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RepoKey {
    pub owner: String,
    pub name: String,
}

impl RepoKey {
    #[must_use]
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Name of the per-repository issue number sequence.
    #[must_use]
    pub fn number_sequence(&self) -> String {
        format!("repos/{}/{}/issues", self.owner, self.name)
    }
}

impl fmt::Display for RepoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Issue lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IssueState {
    #[default]
    Open,
    Closed,
}

impl IssueState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for IssueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueState {
    type Err = IssuesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            other => Err(IssuesError::InvalidState {
                state: other.to_string(),
            }),
        }
    }
}

/// Disposition recorded alongside a closed issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateReason {
    Completed,
    NotPlanned,
    Reopened,
}

impl StateReason {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::NotPlanned => "not_planned",
            Self::Reopened => "reopened",
        }
    }

    /// Whether this reason may accompany an `open -> closed` transition.
    #[must_use]
    pub const fn is_close_reason(&self) -> bool {
        matches!(self, Self::Completed | Self::NotPlanned)
    }
}

impl fmt::Display for StateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StateReason {
    type Err = IssuesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(Self::Completed),
            "not_planned" => Ok(Self::NotPlanned),
            "reopened" => Ok(Self::Reopened),
            other => Err(IssuesError::InvalidStateReason {
                reason: other.to_string(),
            }),
        }
    }
}

/// Reason attached to a conversation lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LockReason {
    #[serde(rename = "off-topic")]
    OffTopic,
    #[serde(rename = "too heated")]
    TooHeated,
    #[serde(rename = "resolved")]
    Resolved,
    #[serde(rename = "spam")]
    Spam,
}

impl LockReason {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OffTopic => "off-topic",
            Self::TooHeated => "too heated",
            Self::Resolved => "resolved",
            Self::Spam => "spam",
        }
    }
}

impl FromStr for LockReason {
    type Err = IssuesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off-topic" => Ok(Self::OffTopic),
            "too heated" => Ok(Self::TooHeated),
            "resolved" => Ok(Self::Resolved),
            "spam" => Ok(Self::Spam),
            other => Err(IssuesError::validation(
                "lock_reason",
                format!("invalid value '{other}'"),
            )),
        }
    }
}

/// A repository record. Created implicitly by the first issue filed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Repository {
    pub owner: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Repository {
    #[must_use]
    pub fn key(&self) -> RepoKey {
        RepoKey::new(&self.owner, &self.name)
    }
}

/// The primary issue entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Issue {
    /// Global id, unique across repositories.
    pub id: u64,
    /// Owning repository.
    pub owner: String,
    pub repo: String,
    /// Repository-scoped sequential number.
    pub number: u64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default)]
    pub state: IssueState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_reason: Option<StateReason>,
    /// Label names, insertion ordered, unique.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    /// Assignee logins, insertion ordered, unique.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assignees: Vec<String>,
    /// Creator login.
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_by: Option<String>,
    /// Live comment count.
    #[serde(default)]
    pub comments: u64,
    #[serde(default, skip_serializing_if = "is_false")]
    pub locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_lock_reason: Option<LockReason>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl Issue {
    #[must_use]
    pub fn repo_key(&self) -> RepoKey {
        RepoKey::new(&self.owner, &self.repo)
    }

    #[must_use]
    pub fn belongs_to(&self, key: &RepoKey) -> bool {
        self.owner == key.owner && self.repo == key.name
    }

    #[must_use]
    pub fn has_label(&self, name: &str) -> bool {
        self.labels.iter().any(|l| l == name)
    }
}

/// A comment on an issue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Comment {
    pub id: u64,
    pub owner: String,
    pub repo: String,
    pub issue_number: u64,
    pub body: String,
    pub user: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub pinned: bool,
}

impl Comment {
    #[must_use]
    pub fn belongs_to(&self, key: &RepoKey) -> bool {
        self.owner == key.owner && self.repo == key.name
    }
}

/// A repository-scoped label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Label {
    pub id: u64,
    pub owner: String,
    pub repo: String,
    pub name: String,
    /// Six hex digits, no leading `#`.
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Label {
    pub const DEFAULT_COLOR: &'static str = "ededed";
}

/// A user reference. Users are not stored; any login is accepted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct User {
    pub login: String,
    pub id: u64,
    pub avatar_url: String,
}

impl User {
    #[must_use]
    pub fn from_login(login: &str) -> Self {
        Self {
            login: login.to_string(),
            id: crate::util::user_id(login),
            avatar_url: String::new(),
        }
    }
}

/// Issue timeline event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Closed,
    Reopened,
    Labeled,
    Unlabeled,
    Assigned,
    Unassigned,
    Renamed,
    Locked,
    Unlocked,
}

impl EventKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Reopened => "reopened",
            Self::Labeled => "labeled",
            Self::Unlabeled => "unlabeled",
            Self::Assigned => "assigned",
            Self::Unassigned => "unassigned",
            Self::Renamed => "renamed",
            Self::Locked => "locked",
            Self::Unlocked => "unlocked",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Title change carried by a `renamed` event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rename {
    pub from: String,
    pub to: String,
}

/// An entry in an issue's timeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IssueEvent {
    pub id: u64,
    pub owner: String,
    pub repo: String,
    pub issue_number: u64,
    pub actor: String,
    pub event: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rename: Option<Rename>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_reason: Option<StateReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_reason: Option<LockReason>,
    pub created_at: DateTime<Utc>,
}

/// An issue together with its resolved label records, ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueDetails {
    pub issue: Issue,
    pub labels: Vec<Label>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_parses_only_github_values() {
        assert_eq!("open".parse::<IssueState>().unwrap(), IssueState::Open);
        assert_eq!("closed".parse::<IssueState>().unwrap(), IssueState::Closed);
        assert!(matches!(
            "Closed".parse::<IssueState>(),
            Err(IssuesError::InvalidState { .. })
        ));
    }

    #[test]
    fn state_reason_serde_is_snake_case() {
        let json = serde_json::to_string(&StateReason::NotPlanned).unwrap();
        assert_eq!(json, "\"not_planned\"");
        assert!(StateReason::Completed.is_close_reason());
        assert!(!StateReason::Reopened.is_close_reason());
    }

    #[test]
    fn lock_reason_uses_github_spelling() {
        let json = serde_json::to_string(&LockReason::TooHeated).unwrap();
        assert_eq!(json, "\"too heated\"");
        assert_eq!(
            "off-topic".parse::<LockReason>().unwrap(),
            LockReason::OffTopic
        );
    }

    #[test]
    fn number_sequence_is_scoped_per_repo() {
        let a = RepoKey::new("acme", "widget");
        let b = RepoKey::new("acme", "gadget");
        assert_ne!(a.number_sequence(), b.number_sequence());
        assert_eq!(a.to_string(), "acme/widget");
    }

    #[test]
    fn user_id_is_stable() {
        assert_eq!(User::from_login("octocat"), User::from_login("octocat"));
    }
}
