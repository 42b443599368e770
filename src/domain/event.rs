use serde::Deserialize;

/// Webhook payload sent by Launchpad for bug and bug-comment events.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BugEvent {
    pub action: String,
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub bug: String,
    #[serde(default)]
    pub bug_comment: Option<String>,
    #[serde(default)]
    pub old: Option<BugSnapshot>,
    #[serde(default)]
    pub new: BugSnapshot,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BugSnapshot {
    pub title: Option<String>,
    pub description: Option<String>,
    pub reporter: Option<String>,
    pub tags: Vec<String>,
    pub status: Option<String>,
    pub importance: Option<String>,
    pub assignee: Option<String>,
    pub date_created: Option<String>,
    pub commenter: Option<String>,
    pub content: Option<String>,
}

impl BugEvent {
    pub fn kind(&self) -> EventAction {
        EventAction::parse(&self.action)
    }

    pub fn is_comment(&self) -> bool {
        self.bug_comment.is_some()
    }

    pub fn bug_id(&self) -> Option<BugId> {
        BugId::from_path(&self.bug)
    }

    /// Public URL of the bug on Launchpad.
    pub fn source_url(&self, launchpad_url: &str) -> String {
        format!(
            "{}{}{}",
            launchpad_url.trim_end_matches('/'),
            self.target,
            self.bug
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventAction {
    Created,
    Changed(String),
    Other(String),
}

impl EventAction {
    pub fn parse(action: &str) -> Self {
        let action = action.trim();
        if action == "created" {
            return EventAction::Created;
        }
        match action.split_once("-changed") {
            Some((field, "")) if !field.is_empty() => EventAction::Changed(field.to_string()),
            _ => EventAction::Other(action.to_string()),
        }
    }
}

/// Bug fields whose changes are mirrored to Jira.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatableField {
    Title,
    Description,
    Reporter,
    Status,
    Importance,
}

impl UpdatableField {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "title" => Some(UpdatableField::Title),
            "description" => Some(UpdatableField::Description),
            "reporter" => Some(UpdatableField::Reporter),
            "status" => Some(UpdatableField::Status),
            "importance" => Some(UpdatableField::Importance),
            _ => None,
        }
    }
}

/// Stable identifier of a Launchpad bug, taken from its path (`/bugs/42`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BugId(String);

impl BugId {
    pub fn from_path(path: &str) -> Option<Self> {
        let segment = path.trim().trim_end_matches('/').rsplit('/').next()?;
        let id: String = segment
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        if id.is_empty() { None } else { Some(Self(id)) }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Label stamped on the Jira ticket so the bug can be found again.
    pub fn tracking_label(&self) -> String {
        format!("launchpad-bug-{}", self.as_str())
    }
}

impl std::fmt::Display for BugId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
