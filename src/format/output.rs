use issues_core::util::format_timestamp;
use issues_core::{
    Comment, IssueDetails, IssueEvent, Label, LockReason, Paged, RepoKey, SearchHit, StateReason,
    User,
};
use serde::Serialize;
use url::Url;

/// URL builder rooted at the externally visible base (`http://host:port`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiUrls {
    base: String,
}

impl ApiUrls {
    #[must_use]
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    #[must_use]
    pub fn user(&self, login: &str) -> String {
        format!("{}/users/{login}", self.base)
    }

    #[must_use]
    pub fn repo(&self, repo: &RepoKey) -> String {
        format!("{}/repos/{}/{}", self.base, repo.owner, repo.name)
    }

    #[must_use]
    pub fn issue(&self, repo: &RepoKey, number: u64) -> String {
        format!("{}/issues/{number}", self.repo(repo))
    }

    #[must_use]
    pub fn comment(&self, repo: &RepoKey, id: u64) -> String {
        format!("{}/issues/comments/{id}", self.repo(repo))
    }

    #[must_use]
    pub fn event(&self, repo: &RepoKey, id: u64) -> String {
        format!("{}/issues/events/{id}", self.repo(repo))
    }

    #[must_use]
    pub fn label(&self, repo: &RepoKey, name: &str) -> String {
        let repo_url = self.repo(repo);
        match Url::parse(&repo_url) {
            Ok(mut url) => {
                // Pushed segments are percent-encoded.
                if let Ok(mut segments) = url.path_segments_mut() {
                    segments.push("labels").push(name);
                }
                url.into()
            }
            Err(_) => format!("{repo_url}/labels/{name}"),
        }
    }
}

/// GitHub user object.
#[derive(Debug, Clone, Serialize)]
pub struct UserJson {
    pub login: String,
    pub id: u64,
    pub node_id: String,
    pub avatar_url: String,
    pub gravatar_id: String,
    pub url: String,
    pub html_url: String,
    pub followers_url: String,
    pub following_url: String,
    pub gists_url: String,
    pub starred_url: String,
    pub subscriptions_url: String,
    pub organizations_url: String,
    pub repos_url: String,
    pub events_url: String,
    pub received_events_url: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub site_admin: bool,
}

impl UserJson {
    #[must_use]
    pub fn render(login: &str, urls: &ApiUrls) -> Self {
        let user = User::from_login(login);
        let url = urls.user(login);
        Self {
            node_id: format!("U_{login}"),
            id: user.id,
            avatar_url: user.avatar_url,
            gravatar_id: String::new(),
            html_url: url.clone(),
            followers_url: format!("{url}/followers"),
            following_url: format!("{url}/following{{/other_user}}"),
            gists_url: format!("{url}/gists{{/gist_id}}"),
            starred_url: format!("{url}/starred{{/owner}}{{/repo}}"),
            subscriptions_url: format!("{url}/subscriptions"),
            organizations_url: format!("{url}/orgs"),
            repos_url: format!("{url}/repos"),
            events_url: format!("{url}/events{{/privacy}}"),
            received_events_url: format!("{url}/received_events"),
            url,
            login: user.login,
            kind: "User",
            site_admin: false,
        }
    }
}

/// GitHub label object.
#[derive(Debug, Clone, Serialize)]
pub struct LabelJson {
    pub id: u64,
    pub node_id: String,
    pub url: String,
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    pub default: bool,
}

impl LabelJson {
    #[must_use]
    pub fn render(label: &Label, urls: &ApiUrls) -> Self {
        let repo = RepoKey::new(&label.owner, &label.repo);
        Self {
            id: label.id,
            node_id: format!("LA_{}", label.id),
            url: urls.label(&repo, &label.name),
            name: label.name.clone(),
            description: label.description.clone(),
            color: label.color.clone(),
            default: false,
        }
    }
}

/// GitHub issue object.
#[derive(Debug, Clone, Serialize)]
pub struct IssueJson {
    pub id: u64,
    pub node_id: String,
    pub url: String,
    pub repository_url: String,
    pub labels_url: String,
    pub comments_url: String,
    pub events_url: String,
    pub html_url: String,
    pub number: u64,
    pub state: &'static str,
    pub state_reason: Option<StateReason>,
    pub title: String,
    pub body: Option<String>,
    pub user: UserJson,
    pub labels: Vec<LabelJson>,
    pub assignee: Option<UserJson>,
    pub assignees: Vec<UserJson>,
    pub milestone: Option<()>,
    pub locked: bool,
    pub active_lock_reason: Option<LockReason>,
    pub comments: u64,
    pub created_at: String,
    pub updated_at: String,
    pub closed_at: Option<String>,
    pub closed_by: Option<UserJson>,
    pub author_association: &'static str,
}

impl IssueJson {
    #[must_use]
    pub fn render(details: &IssueDetails, urls: &ApiUrls) -> Self {
        let issue = &details.issue;
        let repo = issue.repo_key();
        let url = urls.issue(&repo, issue.number);
        let assignees: Vec<UserJson> = issue
            .assignees
            .iter()
            .map(|login| UserJson::render(login, urls))
            .collect();

        Self {
            id: issue.id,
            node_id: format!("I_{}", issue.id),
            repository_url: urls.repo(&repo),
            labels_url: format!("{url}/labels{{/name}}"),
            comments_url: format!("{url}/comments"),
            events_url: format!("{url}/events"),
            html_url: url.clone(),
            url,
            number: issue.number,
            state: issue.state.as_str(),
            state_reason: issue.state_reason,
            title: issue.title.clone(),
            body: issue.body.clone(),
            user: UserJson::render(&issue.user, urls),
            labels: details
                .labels
                .iter()
                .map(|label| LabelJson::render(label, urls))
                .collect(),
            assignee: assignees.first().cloned(),
            assignees,
            milestone: None,
            locked: issue.locked,
            active_lock_reason: issue.active_lock_reason,
            comments: issue.comments,
            created_at: format_timestamp(&issue.created_at),
            updated_at: format_timestamp(&issue.updated_at),
            closed_at: issue.closed_at.as_ref().map(format_timestamp),
            closed_by: issue
                .closed_by
                .as_deref()
                .map(|login| UserJson::render(login, urls)),
            author_association: "OWNER",
        }
    }
}

/// GitHub issue comment object.
#[derive(Debug, Clone, Serialize)]
pub struct CommentJson {
    pub id: u64,
    pub node_id: String,
    pub url: String,
    pub html_url: String,
    pub issue_url: String,
    pub body: String,
    pub user: UserJson,
    pub created_at: String,
    pub updated_at: String,
    pub author_association: &'static str,
    pub pinned: bool,
}

impl CommentJson {
    #[must_use]
    pub fn render(comment: &Comment, urls: &ApiUrls) -> Self {
        let repo = RepoKey::new(&comment.owner, &comment.repo);
        let issue_url = urls.issue(&repo, comment.issue_number);
        Self {
            id: comment.id,
            node_id: format!("IC_{}", comment.id),
            url: urls.comment(&repo, comment.id),
            html_url: format!("{issue_url}#issuecomment-{}", comment.id),
            issue_url,
            body: comment.body.clone(),
            user: UserJson::render(&comment.user, urls),
            created_at: format_timestamp(&comment.created_at),
            updated_at: format_timestamp(&comment.updated_at),
            author_association: "OWNER",
            pinned: comment.pinned,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RenameJson {
    pub from: String,
    pub to: String,
}

/// GitHub issue event object.
#[derive(Debug, Clone, Serialize)]
pub struct EventJson {
    pub id: u64,
    pub node_id: String,
    pub url: String,
    pub actor: UserJson,
    pub event: &'static str,
    pub commit_id: Option<String>,
    pub commit_url: Option<String>,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<LabelRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<UserJson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rename: Option<RenameJson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_reason: Option<StateReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_reason: Option<LockReason>,
}

/// Label reference embedded in `labeled`/`unlabeled` events.
#[derive(Debug, Clone, Serialize)]
pub struct LabelRef {
    pub name: String,
    pub color: String,
}

impl EventJson {
    /// `colors` resolves a label name to its current color.
    #[must_use]
    pub fn render(event: &IssueEvent, urls: &ApiUrls, colors: &[Label]) -> Self {
        let repo = RepoKey::new(&event.owner, &event.repo);
        Self {
            id: event.id,
            node_id: format!("E_{}", event.id),
            url: urls.event(&repo, event.id),
            actor: UserJson::render(&event.actor, urls),
            event: event.event.as_str(),
            commit_id: None,
            commit_url: None,
            created_at: format_timestamp(&event.created_at),
            label: event.label.as_ref().map(|name| LabelRef {
                color: colors
                    .iter()
                    .find(|l| &l.name == name)
                    .map_or_else(|| Label::DEFAULT_COLOR.to_string(), |l| l.color.clone()),
                name: name.clone(),
            }),
            assignee: event
                .assignee
                .as_deref()
                .map(|login| UserJson::render(login, urls)),
            rename: event.rename.as_ref().map(|r| RenameJson {
                from: r.from.clone(),
                to: r.to.clone(),
            }),
            state_reason: event.state_reason,
            lock_reason: event.lock_reason,
        }
    }
}

/// One search result: an issue plus its relevance score.
#[derive(Debug, Clone, Serialize)]
pub struct SearchItemJson {
    #[serde(flatten)]
    pub issue: IssueJson,
    pub score: f64,
}

/// `/search/issues` envelope.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResultsJson {
    pub total_count: usize,
    pub incomplete_results: bool,
    pub items: Vec<SearchItemJson>,
}

impl SearchResultsJson {
    #[must_use]
    pub fn render(results: &Paged<SearchHit>, urls: &ApiUrls) -> Self {
        Self {
            total_count: results.total_count,
            incomplete_results: false,
            items: results
                .items
                .iter()
                .map(|hit| SearchItemJson {
                    issue: IssueJson::render(&hit.details, urls),
                    score: hit.score,
                })
                .collect(),
        }
    }
}
