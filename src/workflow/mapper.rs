use crate::config::SyncConfig;
use crate::domain::event::{BugEvent, EventAction, UpdatableField};
use crate::domain::ticket::{FieldUpdate, TicketFields, comment_marker};

pub const DEFAULT_STATUS: &str = "To Do";
pub const DEFAULT_PRIORITY: &str = "Medium";

/// What a `<field>-changed` event does to an existing ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOp {
    Fields(FieldUpdate),
    Transition(String),
    Ignore(String),
}

/// Translates Launchpad bug events into Jira field values.
#[derive(Debug, Clone)]
pub struct TicketMapper {
    launchpad_url: String,
}

impl TicketMapper {
    pub fn new(launchpad_url: impl Into<String>) -> Self {
        Self {
            launchpad_url: launchpad_url.into(),
        }
    }

    pub fn create_fields(&self, event: &BugEvent, config: &SyncConfig) -> TicketFields {
        TicketFields {
            project_key: config.jira_project_key.clone(),
            issue_type: config.jira_issue_type.clone(),
            summary: event.new.title.clone().unwrap_or_default(),
            description: self.render_description(event, config),
            priority: Some(resolve_priority(config, event.new.importance.as_deref())),
            components: config.components.clone(),
            parent_key: config
                .jira_epic_key
                .clone()
                .filter(|key| !key.trim().is_empty()),
            labels: event
                .bug_id()
                .map(|bug| vec![bug.tracking_label()])
                .unwrap_or_default(),
        }
    }

    pub fn update_op(&self, event: &BugEvent, config: &SyncConfig) -> UpdateOp {
        let EventAction::Changed(name) = event.kind() else {
            return UpdateOp::Ignore(format!("'{}' is not a change event", event.action));
        };
        let Some(field) = UpdatableField::parse(&name) else {
            return UpdateOp::Ignore(format!("field '{name}' is not synced"));
        };

        match field {
            UpdatableField::Title => UpdateOp::Fields(FieldUpdate {
                summary: Some(event.new.title.clone().unwrap_or_default()),
                ..FieldUpdate::default()
            }),
            UpdatableField::Description | UpdatableField::Reporter => {
                if !config.sync_description {
                    return UpdateOp::Ignore("description sync is disabled".to_string());
                }
                UpdateOp::Fields(FieldUpdate {
                    description: Some(self.render_description(event, config)),
                    ..FieldUpdate::default()
                })
            }
            UpdatableField::Status => {
                UpdateOp::Transition(resolve_status(config, event.new.status.as_deref()))
            }
            UpdatableField::Importance => UpdateOp::Fields(FieldUpdate {
                priority: Some(resolve_priority(config, event.new.importance.as_deref())),
                ..FieldUpdate::default()
            }),
        }
    }

    /// Comment body for a mirrored Launchpad comment, tagged with its marker.
    pub fn comment_text(&self, event: &BugEvent) -> String {
        let comment_id = event.bug_comment.as_deref().unwrap_or_default();
        let commenter = strip_path(event.new.commenter.as_deref().unwrap_or("unknown"));
        let content = event.new.content.as_deref().unwrap_or_default().trim();
        format!(
            "{} {commenter} wrote:\n\n{content}",
            comment_marker(comment_id)
        )
        .trim_end()
        .to_string()
    }

    fn render_description(&self, event: &BugEvent, config: &SyncConfig) -> String {
        let reporter = strip_path(event.new.reporter.as_deref().unwrap_or("unknown"));
        let mut sections = vec![
            format!("Launchpad bug: {}", event.source_url(&self.launchpad_url)),
            format!("Reported by: {reporter}"),
        ];
        if config.sync_description {
            if let Some(description) = event
                .new
                .description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
            {
                sections.push(description.to_string());
            }
        }
        sections.join("\n\n")
    }
}

pub fn resolve_status(config: &SyncConfig, status: Option<&str>) -> String {
    status
        .and_then(|status| config.status_mapping.get(status))
        .cloned()
        .unwrap_or_else(|| DEFAULT_STATUS.to_string())
}

pub fn resolve_priority(config: &SyncConfig, importance: Option<&str>) -> String {
    importance
        .and_then(|importance| config.severity_mapping.get(importance))
        .cloned()
        .unwrap_or_else(|| DEFAULT_PRIORITY.to_string())
}

fn strip_path(identity: &str) -> &str {
    identity.trim().trim_start_matches('/')
}
