//! AWS Authentication
//!
//! Credentials come from the AWS SDK default provider chain: environment
//! variables, shared profiles (static keys, `role_arn`/`source_profile`,
//! SSO, `credential_process`), web identity and container or instance
//! roles. The default region is read from the environment or the shared
//! config file.

use crate::error::{QueryError, Result};
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_credential_types::Credentials;
use aws_runtime::env_config::file::EnvConfigFiles;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::RwLock;

/// Profile used when nothing else is configured
pub const DEFAULT_PROFILE: &str = "default";

/// Credentials are refreshed once they are this close to expiring
const EXPIRY_BUFFER: Duration = Duration::from_secs(300);

/// Build the default credential provider chain for a profile.
///
/// `profile_files` replaces the shared config/credentials files when given.
pub async fn credentials_provider(
    profile: &str,
    region: &str,
    profile_files: Option<EnvConfigFiles>,
) -> Result<SharedCredentialsProvider> {
    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .profile_name(profile)
        .region(Region::new(region.to_string()));
    if let Some(files) = profile_files {
        loader = loader.profile_files(files);
    }

    let config = loader.load().await;
    config.credentials_provider().ok_or_else(|| {
        QueryError::Credentials(format!("no credential source for profile '{}'", profile))
    })
}

/// Resolves credentials from a provider and keeps them until they near
/// expiry, so a provider chain (e.g. an assumed role) runs once per client
#[derive(Clone)]
pub struct CredentialSource {
    provider: SharedCredentialsProvider,
    cached: Arc<RwLock<Option<Credentials>>>,
}

impl CredentialSource {
    pub fn new(provider: SharedCredentialsProvider) -> Self {
        Self {
            provider,
            cached: Arc::new(RwLock::new(None)),
        }
    }

    /// Fixed credentials, mostly for tests and local endpoints
    pub fn from_static(credentials: Credentials) -> Self {
        Self::new(SharedCredentialsProvider::new(credentials))
    }

    /// Current credentials, resolving them on first use or near expiry
    pub async fn credentials(&self) -> Result<Credentials> {
        if let Some(creds) = self.cached.read().await.as_ref().filter(|c| is_fresh(c)) {
            return Ok(creds.clone());
        }

        let mut cached = self.cached.write().await;
        if let Some(creds) = cached.as_ref().filter(|c| is_fresh(c)) {
            return Ok(creds.clone());
        }

        tracing::debug!("Resolving AWS credentials");
        let creds = self
            .provider
            .provide_credentials()
            .await
            .map_err(|e| QueryError::Credentials(error_chain(&e)))?;
        tracing::debug!("Resolved credentials for {}", creds.access_key_id());

        *cached = Some(creds.clone());
        Ok(creds)
    }
}

fn is_fresh(creds: &Credentials) -> bool {
    creds
        .expiry()
        .map_or(true, |expiry| expiry > SystemTime::now() + EXPIRY_BUFFER)
}

// Provider errors wrap the useful detail in their sources.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Path of the shared config file
pub fn shared_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("AWS_CONFIG_FILE") {
        return Some(PathBuf::from(path));
    }
    dirs::home_dir().map(|h| h.join(".aws").join("config"))
}

/// Validate a region name such as `us-east-1` or `cn-north-1`
pub fn validate_region(region: &str) -> bool {
    let parts: Vec<&str> = region.split('-').collect();
    if parts.len() < 3 {
        return false;
    }
    if !parts[parts.len() - 1].chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    parts
        .iter()
        .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()))
}

/// Read the default region from the environment or the shared config file
pub fn get_default_region(profile: &str) -> Option<String> {
    for var in ["AWS_REGION", "AWS_DEFAULT_REGION"] {
        if let Ok(region) = std::env::var(var) {
            if validate_region(&region) {
                return Some(region);
            }
            tracing::warn!("Invalid region format in {}", var);
        }
    }

    let path = shared_config_path()?;
    // The config file names non-default profiles "[profile <name>]"
    let section_name = if profile == DEFAULT_PROFILE {
        DEFAULT_PROFILE.to_string()
    } else {
        format!("profile {}", profile)
    };
    let section = read_ini_section(&path, &section_name)?;
    section
        .get("region")
        .filter(|r| validate_region(r))
        .cloned()
}

/// Read one `[section]` of an INI-style AWS file into a key/value map
pub fn read_ini_section(path: &Path, section: &str) -> Option<HashMap<String, String>> {
    let content = std::fs::read_to_string(path).ok()?;
    parse_ini_section(&content, section)
}

fn parse_ini_section(content: &str, section: &str) -> Option<HashMap<String, String>> {
    let mut in_section = false;
    let mut found = false;
    let mut values = HashMap::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if line.starts_with('[') && line.ends_with(']') {
            in_section = line[1..line.len() - 1].trim() == section;
            found |= in_section;
            continue;
        }
        if !in_section {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            values.insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    found.then_some(values)
}
