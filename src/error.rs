use std::io;

use thiserror::Error;

use crate::config::OverrideError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("invalid base64 YAML in \"yaml\" query parameter: {0}")]
    Override(#[from] OverrideError),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("issue tracker error: {0}")]
    IssueTracker(String),
    #[error("internal error")]
    Internal,
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
