use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};

use crate::config::{AppConfig, encode_override};
use crate::error::AppResult;

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    /// Show the loaded configuration (secrets masked).
    Show,
    /// Encode a YAML override file for the webhook's `yaml` query parameter.
    Encode {
        /// YAML file with a top-level `project` mapping.
        file: PathBuf,
    },
}

pub fn run(command: ConfigCommand, config_path: &Path) -> AppResult<()> {
    match command {
        ConfigCommand::Show => run_show(config_path),
        ConfigCommand::Encode { file } => run_encode(&file),
    }
}

fn run_show(config_path: &Path) -> AppResult<()> {
    let cfg = AppConfig::load(config_path)?;
    let app = &cfg.app;
    let project = &cfg.project;

    println!("Configuration file: {}", config_path.display());
    println!("Launchpad URL: {}", app.launchpad_url);
    println!(
        "Webhook secret: {}",
        mask_secret(&app.launchpad_webhook_secret_code)
    );
    println!("Jira instance: {}", display_value(&app.jira_instance));
    println!("Jira username: {}", display_value(&app.jira_username));
    println!("Jira API token: {}", mask_secret(&app.jira_token));
    println!();
    println!("Project key: {}", or_not_set(&project.jira_project_key));
    println!("Issue type: {}", project.jira_issue_type);
    println!("Epic: {}", display_value(&project.jira_epic_key));
    println!("Components: {}", or_not_set(&project.components.join(", ")));
    println!("Sync description: {}", project.sync_description);
    println!("Sync comments: {}", project.sync_comments);
    print_mapping("Status mapping", &project.status_mapping);
    print_mapping("Severity mapping", &project.severity_mapping);

    Ok(())
}

fn run_encode(file: &Path) -> AppResult<()> {
    let contents = fs::read_to_string(file)?;
    println!("{}", encode_override(&contents)?);
    Ok(())
}

fn print_mapping(title: &str, mapping: &std::collections::BTreeMap<String, String>) {
    if mapping.is_empty() {
        println!("{title}: <not set>");
        return;
    }
    println!("{title}:");
    for (from, to) in mapping {
        println!("  {from} -> {to}");
    }
}

fn or_not_set(value: &str) -> String {
    if value.is_empty() {
        "<not set>".to_string()
    } else {
        value.to_string()
    }
}

fn display_value(value: &Option<String>) -> String {
    or_not_set(value.as_deref().unwrap_or_default())
}

fn mask_secret(value: &Option<String>) -> String {
    match value {
        Some(token) if token.chars().count() > 6 => {
            let chars: Vec<char> = token.chars().collect();
            let prefix: String = chars[..3].iter().collect();
            let suffix: String = chars[chars.len() - 3..].iter().collect();
            format!("{prefix}***{suffix}")
        }
        Some(token) if !token.is_empty() => "***".to_string(),
        _ => "<not set>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_are_masked() {
        assert_eq!(mask_secret(&Some("abcdefghij".to_string())), "abc***hij");
        assert_eq!(mask_secret(&Some("short".to_string())), "***");
        assert_eq!(mask_secret(&Some(String::new())), "<not set>");
        assert_eq!(mask_secret(&None), "<not set>");
    }

    #[test]
    fn empty_values_display_as_not_set() {
        assert_eq!(display_value(&None), "<not set>");
        assert_eq!(display_value(&Some(String::new())), "<not set>");
        assert_eq!(display_value(&Some("PRJ".to_string())), "PRJ");
    }
}
