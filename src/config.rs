//! Configuration Management
//!
//! Persistent defaults for awsql, read from `<config_dir>/awsql/config.json`.

use anyhow::{Context, Result};
use awsql::aws::auth::{self, DEFAULT_PROFILE};
use awsql::aws::client::DEFAULT_TIMEOUT;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_REGION: &str = "us-east-1";

/// How query rows are written to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One JSON object per line, written as rows arrive
    #[default]
    Jsonl,
    /// A single JSON array
    Json,
    /// A YAML sequence
    Yaml,
}

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// AWS profile for credentials and region
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    /// Send every request here (LocalStack and similar)
    #[serde(default)]
    pub endpoint_url: Option<String>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub output: Option<OutputFormat>,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("awsql").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring config file: {:#}", e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// Get effective profile (CLI > config > AWS_PROFILE > default)
    pub fn effective_profile(&self, cli: Option<&str>) -> String {
        cli.map(str::to_string)
            .or_else(|| self.profile.clone())
            .or_else(|| std::env::var("AWS_PROFILE").ok().filter(|p| !p.is_empty()))
            .unwrap_or_else(|| DEFAULT_PROFILE.to_string())
    }

    /// Get effective region (CLI > config > env / shared config > us-east-1)
    pub fn effective_region(&self, cli: Option<&str>, profile: &str) -> String {
        cli.map(str::to_string)
            .or_else(|| self.region.clone())
            .or_else(|| auth::get_default_region(profile))
            .unwrap_or_else(|| DEFAULT_REGION.to_string())
    }

    /// Get effective endpoint override (CLI > config > AWS_ENDPOINT_URL)
    pub fn effective_endpoint_url(&self, cli: Option<&str>) -> Option<String> {
        cli.map(str::to_string)
            .or_else(|| self.endpoint_url.clone())
            .or_else(|| std::env::var("AWS_ENDPOINT_URL").ok().filter(|u| !u.is_empty()))
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT)
    }

    pub fn effective_output(&self, cli: Option<OutputFormat>) -> OutputFormat {
        cli.or(self.output).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_partial_config() {
        let dir = std::env::temp_dir().join(format!("awsql-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        std::fs::write(&path, r#"{"region": "eu-west-1", "output": "yaml"}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.output, Some(OutputFormat::Yaml));
        assert!(config.profile.is_none());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_cli_wins_over_config() {
        let config = Config {
            profile: Some("work".to_string()),
            region: Some("eu-west-1".to_string()),
            endpoint_url: Some("http://localhost:4566".to_string()),
            request_timeout_secs: Some(5),
            output: Some(OutputFormat::Json),
        };
        assert_eq!(config.effective_profile(Some("ci")), "ci");
        assert_eq!(config.effective_profile(None), "work");
        assert_eq!(config.effective_region(Some("ap-south-1"), "work"), "ap-south-1");
        assert_eq!(config.effective_region(None, "work"), "eu-west-1");
        assert_eq!(
            config.effective_endpoint_url(None).as_deref(),
            Some("http://localhost:4566")
        );
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.effective_output(None), OutputFormat::Json);
        assert_eq!(
            config.effective_output(Some(OutputFormat::Jsonl)),
            OutputFormat::Jsonl
        );
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.request_timeout(), DEFAULT_TIMEOUT);
        assert_eq!(config.effective_output(None), OutputFormat::Jsonl);
    }
}
