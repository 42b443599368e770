//! In-memory issue tracker that records every call.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::event::BugId;
use crate::domain::ticket::{FieldUpdate, Ticket, TicketFields, Transition, comment_marker};
use crate::error::{AppError, AppResult};
use crate::services::IssueTrackerService;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerCall {
    Find { project_key: String, bug: String },
    Create(TicketFields),
    Update { key: String, update: FieldUpdate },
    CurrentStatus(String),
    Transitions(String),
    ApplyTransition { key: String, to_status: String },
    AddComment { key: String, text: String },
    HasComment { key: String, comment_id: String },
}

impl TrackerCall {
    pub fn name(&self) -> &'static str {
        match self {
            TrackerCall::Find { .. } => "find_ticket",
            TrackerCall::Create(_) => "create_ticket",
            TrackerCall::Update { .. } => "update_ticket",
            TrackerCall::CurrentStatus(_) => "current_status",
            TrackerCall::Transitions(_) => "available_transitions",
            TrackerCall::ApplyTransition { .. } => "apply_transition",
            TrackerCall::AddComment { .. } => "add_comment",
            TrackerCall::HasComment { .. } => "has_comment",
        }
    }

    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            TrackerCall::Create(_)
                | TrackerCall::Update { .. }
                | TrackerCall::ApplyTransition { .. }
                | TrackerCall::AddComment { .. }
        )
    }
}

#[derive(Default)]
struct TrackerState {
    ticket: Option<Ticket>,
    status: String,
    transitions: Vec<Transition>,
    comments: Vec<String>,
    calls: Vec<TrackerCall>,
    fail_with: Option<String>,
    fail_on: Vec<&'static str>,
    next_key: u32,
}

#[derive(Default)]
pub struct RecordingTracker {
    state: Mutex<TrackerState>,
}

impl RecordingTracker {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_ticket(key: &str) -> Self {
        let tracker = Self::default();
        tracker.state.lock().unwrap().ticket = Some(Ticket {
            key: key.to_string(),
            url: None,
        });
        tracker
    }

    pub fn with_status(self, status: &str) -> Self {
        self.state.lock().unwrap().status = status.to_string();
        self
    }

    /// Adds a workflow edge reachable from any status.
    pub fn with_transition(self, id: &str, to_status: &str) -> Self {
        self.state.lock().unwrap().transitions.push(Transition {
            id: id.to_string(),
            to_status: to_status.to_string(),
        });
        self
    }

    pub fn with_comment(self, text: &str) -> Self {
        self.state.lock().unwrap().comments.push(text.to_string());
        self
    }

    /// Every call fails with an issue tracker error, unless narrowed by
    /// [`RecordingTracker::failing_on`].
    pub fn failing(self, message: &str) -> Self {
        self.state.lock().unwrap().fail_with = Some(message.to_string());
        self
    }

    /// Only calls to the named trait method fail.
    pub fn failing_on(self, method: &'static str, message: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.fail_on.push(method);
            state.fail_with = Some(message.to_string());
        }
        self
    }

    pub fn calls(&self) -> Vec<TrackerCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn mutations(&self) -> Vec<TrackerCall> {
        self.calls()
            .into_iter()
            .filter(TrackerCall::is_mutation)
            .collect()
    }

    pub fn status(&self) -> String {
        self.state.lock().unwrap().status.clone()
    }

    pub fn comments(&self) -> Vec<String> {
        self.state.lock().unwrap().comments.clone()
    }

    fn record(&self, call: TrackerCall) -> AppResult<std::sync::MutexGuard<'_, TrackerState>> {
        let mut state = self.state.lock().unwrap();
        let fails = state.fail_on.is_empty() || state.fail_on.contains(&call.name());
        state.calls.push(call);
        match &state.fail_with {
            Some(message) if fails => Err(AppError::IssueTracker(message.clone())),
            _ => Ok(state),
        }
    }
}

#[async_trait]
impl IssueTrackerService for RecordingTracker {
    async fn find_ticket(&self, project_key: &str, bug: &BugId) -> AppResult<Option<Ticket>> {
        let state = self.record(TrackerCall::Find {
            project_key: project_key.to_string(),
            bug: bug.to_string(),
        })?;
        Ok(state.ticket.clone())
    }

    async fn create_ticket(&self, fields: &TicketFields) -> AppResult<Ticket> {
        let mut state = self.record(TrackerCall::Create(fields.clone()))?;
        state.next_key += 1;
        let ticket = Ticket {
            key: format!("{}-{}", fields.project_key, state.next_key),
            url: None,
        };
        state.ticket = Some(ticket.clone());
        if state.status.is_empty() {
            state.status = "Backlog".to_string();
        }
        Ok(ticket)
    }

    async fn update_ticket(&self, ticket: &Ticket, update: &FieldUpdate) -> AppResult<()> {
        self.record(TrackerCall::Update {
            key: ticket.key.clone(),
            update: update.clone(),
        })?;
        Ok(())
    }

    async fn current_status(&self, ticket: &Ticket) -> AppResult<String> {
        let state = self.record(TrackerCall::CurrentStatus(ticket.key.clone()))?;
        Ok(state.status.clone())
    }

    async fn available_transitions(&self, ticket: &Ticket) -> AppResult<Vec<Transition>> {
        let state = self.record(TrackerCall::Transitions(ticket.key.clone()))?;
        Ok(state.transitions.clone())
    }

    async fn apply_transition(&self, ticket: &Ticket, transition: &Transition) -> AppResult<()> {
        let mut state = self.record(TrackerCall::ApplyTransition {
            key: ticket.key.clone(),
            to_status: transition.to_status.clone(),
        })?;
        state.status = transition.to_status.clone();
        Ok(())
    }

    async fn add_comment(&self, ticket: &Ticket, text: &str) -> AppResult<()> {
        let mut state = self.record(TrackerCall::AddComment {
            key: ticket.key.clone(),
            text: text.to_string(),
        })?;
        state.comments.push(text.to_string());
        Ok(())
    }

    async fn has_comment(&self, ticket: &Ticket, comment_id: &str) -> AppResult<bool> {
        let state = self.record(TrackerCall::HasComment {
            key: ticket.key.clone(),
            comment_id: comment_id.to_string(),
        })?;
        let marker = comment_marker(comment_id);
        Ok(state.comments.iter().any(|comment| comment.contains(&marker)))
    }
}
