use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use std::string::FromUtf8Error;

use base64::prelude::{BASE64_STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};

pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Top-level key of an encoded override whose mapping is overlaid on the
/// project section.
const OVERRIDE_KEY: &str = "project";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSettings,
    pub project: SyncConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub launchpad_webhook_secret_code: Option<String>,
    pub launchpad_url: String,
    pub jira_instance: Option<String>,
    pub jira_username: Option<String>,
    pub jira_token: Option<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            launchpad_webhook_secret_code: None,
            launchpad_url: "https://launchpad.net".to_string(),
            jira_instance: None,
            jira_username: None,
            jira_token: None,
        }
    }
}

/// Per-project sync settings. The process-wide copy is the base that request
/// overrides are merged onto.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub jira_project_key: String,
    pub jira_issue_type: String,
    pub jira_epic_key: Option<String>,
    pub status_mapping: BTreeMap<String, String>,
    pub severity_mapping: BTreeMap<String, String>,
    pub components: Vec<String>,
    pub sync_description: bool,
    pub sync_comments: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            jira_project_key: String::new(),
            jira_issue_type: "Task".to_string(),
            jira_epic_key: None,
            status_mapping: BTreeMap::new(),
            severity_mapping: BTreeMap::new(),
            components: Vec::new(),
            sync_description: false,
            sync_comments: false,
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> AppResult<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "Config file not found, using defaults");
                return Ok(Self::default());
            }
            Err(err) => return Err(AppError::Io(err)),
        };

        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Self = serde_yaml::from_str(&contents).map_err(|err| {
            AppError::Configuration(format!(
                "failed to read config file \"{}\": {err}",
                path.display()
            ))
        })?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Shared secret for webhook signatures; empty when unset.
    pub fn webhook_secret(&self) -> &str {
        self.app
            .launchpad_webhook_secret_code
            .as_deref()
            .unwrap_or_default()
    }
}

#[derive(Debug, Error)]
pub enum OverrideError {
    #[error("invalid base64 input: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("invalid UTF-8 in decoded data: {0}")]
    Utf8(#[from] FromUtf8Error),
    #[error("invalid YAML content: {0}")]
    Yaml(#[source] serde_yaml::Error),
    #[error("override does not fit the project configuration: {0}")]
    Shape(#[source] serde_yaml::Error),
}

/// Decodes a base64 block of YAML. An empty value decodes to `Value::Null`.
pub fn decode_override(encoded: &str) -> Result<Value, OverrideError> {
    if encoded.is_empty() {
        return Ok(Value::Null);
    }
    let raw = BASE64_STANDARD.decode(encoded.as_bytes())?;
    let text = String::from_utf8(raw)?;
    serde_yaml::from_str(&text).map_err(OverrideError::Yaml)
}

/// Overlays the `project` mapping of an encoded override onto `base`, key by
/// key. `base` is left untouched.
pub fn merge_project_config(
    base: &SyncConfig,
    encoded_override: Option<&str>,
) -> Result<SyncConfig, OverrideError> {
    let Some(encoded) = encoded_override.filter(|value| !value.is_empty()) else {
        return Ok(base.clone());
    };

    let document = decode_override(encoded)?;
    let Some(overrides) = document.get(OVERRIDE_KEY).and_then(Value::as_mapping) else {
        debug!("Override has no project mapping, using base configuration");
        return Ok(base.clone());
    };

    let mut merged = serde_yaml::to_value(base).map_err(OverrideError::Shape)?;
    if let Value::Mapping(fields) = &mut merged {
        for (key, value) in overrides {
            fields.insert(key.clone(), value.clone());
        }
    }
    serde_yaml::from_value(merged).map_err(OverrideError::Shape)
}

/// Encodes an override file for the `yaml` query parameter after checking it
/// merges cleanly.
pub fn encode_override(yaml_text: &str) -> Result<String, OverrideError> {
    let encoded = BASE64_STANDARD.encode(yaml_text.as_bytes());
    merge_project_config(&SyncConfig::default(), Some(&encoded))?;
    Ok(encoded)
}
