use async_trait::async_trait;

use crate::domain::event::BugId;
use crate::domain::ticket::{FieldUpdate, Ticket, TicketFields, Transition};
use crate::error::AppResult;

#[async_trait]
pub trait IssueTrackerService: Send + Sync {
    /// Most recently created ticket in `project_key` tracking `bug`.
    async fn find_ticket(&self, project_key: &str, bug: &BugId) -> AppResult<Option<Ticket>>;
    async fn create_ticket(&self, fields: &TicketFields) -> AppResult<Ticket>;
    async fn update_ticket(&self, ticket: &Ticket, update: &FieldUpdate) -> AppResult<()>;
    async fn current_status(&self, ticket: &Ticket) -> AppResult<String>;
    async fn available_transitions(&self, ticket: &Ticket) -> AppResult<Vec<Transition>>;
    async fn apply_transition(&self, ticket: &Ticket, transition: &Transition) -> AppResult<()>;
    async fn add_comment(&self, ticket: &Ticket, text: &str) -> AppResult<()>;
    async fn has_comment(&self, ticket: &Ticket, comment_id: &str) -> AppResult<bool>;
}
