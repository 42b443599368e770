/// Handle to an existing Jira issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub key: String,
    pub url: Option<String>,
}

/// Field values for a new ticket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketFields {
    pub project_key: String,
    pub issue_type: String,
    pub summary: String,
    pub description: String,
    pub priority: Option<String>,
    pub components: Vec<String>,
    pub parent_key: Option<String>,
    pub labels: Vec<String>,
}

/// Partial update of an existing ticket; `None` leaves the field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldUpdate {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
}

impl FieldUpdate {
    pub fn is_empty(&self) -> bool {
        self.summary.is_none() && self.description.is_none() && self.priority.is_none()
    }
}

/// Workflow edge available from a ticket's current status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub id: String,
    pub to_status: String,
}

/// Marker embedded in mirrored comments, used to detect duplicates.
pub fn comment_marker(comment_id: &str) -> String {
    format!("[Launchpad comment {}]", comment_id.trim())
}
