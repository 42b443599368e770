use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::IssueTrackerService;

#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub issue_tracker: Arc<dyn IssueTrackerService>,
}

impl AppContext {
    pub fn new(config: AppConfig, issue_tracker: Arc<dyn IssueTrackerService>) -> Self {
        Self {
            config: Arc::new(config),
            issue_tracker,
        }
    }
}
