use std::time::Duration;

use async_trait::async_trait;
use base64::prelude::{BASE64_STANDARD, Engine as _};
use reqwest::{
    Client, Method, RequestBuilder, Response,
    header::{ACCEPT, AUTHORIZATION},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::AppSettings;
use crate::domain::event::BugId;
use crate::domain::ticket::{FieldUpdate, Ticket, TicketFields, Transition, comment_marker};
use crate::error::{AppError, AppResult};
use crate::services::IssueTrackerService;

const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);
const GET_TIMEOUT: Duration = Duration::from_secs(10);
const WRITE_TIMEOUT: Duration = Duration::from_secs(15);
const COMMENT_PAGE_SIZE: u32 = 100;

pub struct JiraClient {
    http: Client,
    base_url: Option<String>,
    username: Option<String>,
    token: Option<String>,
}

impl JiraClient {
    pub fn new(base_url: Option<String>, username: Option<String>, token: Option<String>) -> Self {
        Self {
            http: Client::new(),
            base_url,
            username,
            token,
        }
    }

    pub fn from_settings(settings: &AppSettings) -> Self {
        Self::new(
            settings.jira_instance.clone(),
            settings.jira_username.clone(),
            settings.jira_token.clone(),
        )
    }

    fn api_details(&self) -> AppResult<(&str, &str, &str)> {
        let base_url = self
            .base_url
            .as_deref()
            .ok_or_else(|| AppError::Configuration("Jira instance not configured".to_string()))?;
        let username = self
            .username
            .as_deref()
            .ok_or_else(|| AppError::Configuration("Jira username not configured".to_string()))?;
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| AppError::Configuration("Jira API token not configured".to_string()))?;
        Ok((base_url, username, token))
    }

    fn auth_header(username: &str, token: &str) -> String {
        let credentials = format!("{username}:{token}");
        let encoded = BASE64_STANDARD.encode(credentials);
        format!("Basic {encoded}")
    }

    fn api_url(base_url: &str, path: &str) -> String {
        format!("{}/rest/api/3/{}", base_url.trim_end_matches('/'), path)
    }

    fn browse_url(base_url: &str, key: &str) -> String {
        format!("{}/browse/{}", base_url.trim_end_matches('/'), key)
    }

    fn ticket(&self, key: String) -> Ticket {
        let url = self
            .base_url
            .as_deref()
            .map(|base_url| Self::browse_url(base_url, &key));
        Ticket { key, url }
    }

    fn request(&self, method: Method, path: &str) -> AppResult<RequestBuilder> {
        let (base_url, username, token) = self.api_details()?;
        Ok(self
            .http
            .request(method, Self::api_url(base_url, path))
            .header(AUTHORIZATION, Self::auth_header(username, token))
            .header(ACCEPT, "application/json"))
    }

    async fn send(request: RequestBuilder, timeout: Duration) -> AppResult<Response> {
        let response = request
            .timeout(timeout)
            .send()
            .await
            .map_err(|err| AppError::IssueTracker(format!("failed to call Jira: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unable to read response>".to_string());
            return Err(AppError::IssueTracker(format!(
                "Jira responded with {status}: {body}"
            )));
        }
        Ok(response)
    }

    async fn parse<T: for<'de> Deserialize<'de>>(response: Response) -> AppResult<T> {
        response
            .json()
            .await
            .map_err(|err| AppError::IssueTracker(format!("failed to parse Jira response: {err}")))
    }

    fn tracking_jql(project_key: &str, bug: &BugId) -> String {
        // Jira project keys are letters, digits and underscores only.
        let project: String = project_key
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect();
        format!(
            "project = \"{}\" AND labels = \"{}\" ORDER BY created DESC",
            project,
            bug.tracking_label()
        )
    }
}

#[async_trait]
impl IssueTrackerService for JiraClient {
    async fn find_ticket(&self, project_key: &str, bug: &BugId) -> AppResult<Option<Ticket>> {
        let jql = Self::tracking_jql(project_key, bug);
        debug!(jql = %jql, "Searching Jira for tracked bug");

        let request = self.request(Method::GET, "search/jql")?.query(&[
            ("jql", jql.as_str()),
            ("maxResults", "1"),
            ("fields", "status,created"),
        ]);
        let payload: JiraSearchResponse = Self::parse(Self::send(request, SEARCH_TIMEOUT).await?).await?;

        Ok(payload
            .issues
            .into_iter()
            .next()
            .map(|issue| self.ticket(issue.key)))
    }

    async fn create_ticket(&self, fields: &TicketFields) -> AppResult<Ticket> {
        if fields.project_key.trim().is_empty() {
            return Err(AppError::Configuration(
                "Jira project key must not be empty".to_string(),
            ));
        }

        let request = self
            .request(Method::POST, "issue")?
            .json(&JiraCreateIssueRequest::new(fields));
        let payload: JiraCreateIssueResponse =
            Self::parse(Self::send(request, WRITE_TIMEOUT).await?).await?;

        info!(key = %payload.key, project = %fields.project_key, "Created Jira issue");
        Ok(self.ticket(payload.key))
    }

    async fn update_ticket(&self, ticket: &Ticket, update: &FieldUpdate) -> AppResult<()> {
        let request = self
            .request(Method::PUT, &format!("issue/{}", ticket.key))?
            .json(&JiraUpdateIssueRequest::new(update));
        Self::send(request, WRITE_TIMEOUT).await?;

        info!(key = %ticket.key, "Updated Jira issue");
        Ok(())
    }

    async fn current_status(&self, ticket: &Ticket) -> AppResult<String> {
        let request = self
            .request(Method::GET, &format!("issue/{}", ticket.key))?
            .query(&[("fields", "status")]);
        let payload: JiraIssueStatusResponse =
            Self::parse(Self::send(request, GET_TIMEOUT).await?).await?;
        Ok(payload.fields.status.name)
    }

    async fn available_transitions(&self, ticket: &Ticket) -> AppResult<Vec<Transition>> {
        let request = self.request(Method::GET, &format!("issue/{}/transitions", ticket.key))?;
        let payload: JiraTransitionsResponse =
            Self::parse(Self::send(request, GET_TIMEOUT).await?).await?;

        Ok(payload
            .transitions
            .into_iter()
            .map(|transition| Transition {
                id: transition.id,
                to_status: transition.to.name,
            })
            .collect())
    }

    async fn apply_transition(&self, ticket: &Ticket, transition: &Transition) -> AppResult<()> {
        info!(
            key = %ticket.key,
            transition_id = %transition.id,
            to_status = %transition.to_status,
            "Transitioning Jira issue"
        );
        let request = self
            .request(Method::POST, &format!("issue/{}/transitions", ticket.key))?
            .json(&JiraTransitionRequest {
                transition: JiraTransitionId {
                    id: transition.id.clone(),
                },
            });
        Self::send(request, WRITE_TIMEOUT).await?;
        Ok(())
    }

    async fn add_comment(&self, ticket: &Ticket, text: &str) -> AppResult<()> {
        let request = self
            .request(Method::POST, &format!("issue/{}/comment", ticket.key))?
            .json(&JiraCommentCreate {
                body: JiraDescription::from_text(text),
            });
        Self::send(request, WRITE_TIMEOUT).await?;

        info!(key = %ticket.key, "Added comment to Jira issue");
        Ok(())
    }

    async fn has_comment(&self, ticket: &Ticket, comment_id: &str) -> AppResult<bool> {
        let marker = comment_marker(comment_id);
        let path = format!("issue/{}/comment", ticket.key);
        let mut start_at = 0u32;

        loop {
            let request = self.request(Method::GET, &path)?.query(&[
                ("startAt", start_at.to_string()),
                ("maxResults", COMMENT_PAGE_SIZE.to_string()),
            ]);
            let page: JiraCommentsPage = Self::parse(Self::send(request, GET_TIMEOUT).await?).await?;

            if page
                .comments
                .iter()
                .any(|comment| document_text(&comment.body).contains(&marker))
            {
                return Ok(true);
            }

            let fetched = page.comments.len() as u32;
            start_at += fetched;
            if fetched == 0 || start_at >= page.total {
                return Ok(false);
            }
        }
    }
}

/// Concatenates the text nodes of an Atlassian document (or a plain string body).
fn document_text(body: &Value) -> String {
    fn collect(node: &Value, out: &mut String) {
        match node {
            Value::String(text) => out.push_str(text),
            Value::Object(map) => {
                if let Some(Value::String(text)) = map.get("text") {
                    out.push_str(text);
                }
                if let Some(Value::Array(children)) = map.get("content") {
                    for child in children {
                        collect(child, out);
                    }
                    out.push('\n');
                }
            }
            _ => {}
        }
    }

    let mut out = String::new();
    collect(body, &mut out);
    out
}

#[derive(Serialize)]
struct JiraCreateIssueRequest {
    fields: JiraCreateIssueFields,
}

impl JiraCreateIssueRequest {
    fn new(fields: &TicketFields) -> Self {
        Self {
            fields: JiraCreateIssueFields {
                project: JiraKeyRef {
                    key: fields.project_key.trim().to_string(),
                },
                summary: fields.summary.trim().to_string(),
                description: JiraDescription::from_text(&fields.description),
                issuetype: JiraNamed {
                    name: fields.issue_type.clone(),
                },
                priority: fields.priority.clone().map(|name| JiraNamed { name }),
                components: (!fields.components.is_empty()).then(|| {
                    fields
                        .components
                        .iter()
                        .map(|name| JiraNamed { name: name.clone() })
                        .collect()
                }),
                parent: fields.parent_key.clone().map(|key| JiraKeyRef { key }),
                labels: fields.labels.clone(),
            },
        }
    }
}

#[derive(Serialize)]
struct JiraCreateIssueFields {
    project: JiraKeyRef,
    summary: String,
    description: JiraDescription,
    issuetype: JiraNamed,
    #[serde(skip_serializing_if = "Option::is_none")]
    priority: Option<JiraNamed>,
    #[serde(skip_serializing_if = "Option::is_none")]
    components: Option<Vec<JiraNamed>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent: Option<JiraKeyRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    labels: Vec<String>,
}

#[derive(Serialize)]
struct JiraUpdateIssueRequest {
    fields: JiraUpdateIssueFields,
}

impl JiraUpdateIssueRequest {
    fn new(update: &FieldUpdate) -> Self {
        Self {
            fields: JiraUpdateIssueFields {
                summary: update.summary.as_deref().map(|s| s.trim().to_string()),
                description: update.description.as_deref().map(JiraDescription::from_text),
                priority: update.priority.clone().map(|name| JiraNamed { name }),
            },
        }
    }
}

#[derive(Serialize)]
struct JiraUpdateIssueFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<JiraDescription>,
    #[serde(skip_serializing_if = "Option::is_none")]
    priority: Option<JiraNamed>,
}

#[derive(Serialize)]
struct JiraKeyRef {
    key: String,
}

#[derive(Serialize)]
struct JiraNamed {
    name: String,
}

#[derive(Serialize)]
struct JiraTransitionRequest {
    transition: JiraTransitionId,
}

#[derive(Serialize)]
struct JiraTransitionId {
    id: String,
}

#[derive(Serialize)]
struct JiraCommentCreate {
    body: JiraDescription,
}

#[derive(Serialize)]
struct JiraDescription {
    #[serde(rename = "type")]
    doc_type: &'static str,
    version: u8,
    content: Vec<JiraDocNode>,
}

impl JiraDescription {
    /// Splits on blank lines into paragraphs; single newlines become hard breaks.
    fn from_text(text: &str) -> Self {
        let cleaned = text.replace('\r', "");
        let content = cleaned
            .split("\n\n")
            .map(|section| section.trim())
            .filter(|section| !section.is_empty())
            .map(JiraDocNode::paragraph)
            .collect();

        Self {
            doc_type: "doc",
            version: 1,
            content,
        }
    }
}

#[derive(Serialize)]
struct JiraDocNode {
    #[serde(rename = "type")]
    node_type: &'static str,
    content: Vec<JiraDocInline>,
}

impl JiraDocNode {
    fn paragraph(section: &str) -> Self {
        let mut content = Vec::new();
        for (index, line) in section.lines().enumerate() {
            if index > 0 {
                content.push(JiraDocInline::hard_break());
            }
            if !line.is_empty() {
                content.push(JiraDocInline::text(line.to_string()));
            }
        }
        Self {
            node_type: "paragraph",
            content,
        }
    }
}

#[derive(Serialize)]
struct JiraDocInline {
    #[serde(rename = "type")]
    inline_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

impl JiraDocInline {
    fn text(text: String) -> Self {
        Self {
            inline_type: "text",
            text: Some(text),
        }
    }

    fn hard_break() -> Self {
        Self {
            inline_type: "hardBreak",
            text: None,
        }
    }
}

#[derive(Deserialize)]
struct JiraCreateIssueResponse {
    key: String,
}

#[derive(Deserialize)]
struct JiraSearchResponse {
    #[serde(default)]
    issues: Vec<JiraIssueRef>,
}

#[derive(Deserialize)]
struct JiraIssueRef {
    key: String,
}

#[derive(Deserialize)]
struct JiraIssueStatusResponse {
    fields: JiraStatusFields,
}

#[derive(Deserialize)]
struct JiraStatusFields {
    status: JiraStatus,
}

#[derive(Deserialize)]
struct JiraStatus {
    name: String,
}

#[derive(Deserialize)]
struct JiraTransitionsResponse {
    transitions: Vec<JiraTransition>,
}

#[derive(Deserialize)]
struct JiraTransition {
    id: String,
    to: JiraStatus,
}

#[derive(Deserialize)]
struct JiraCommentsPage {
    #[serde(default)]
    total: u32,
    #[serde(default)]
    comments: Vec<JiraComment>,
}

#[derive(Deserialize)]
struct JiraComment {
    #[serde(default)]
    body: Value,
}
