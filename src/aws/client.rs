//! AWS Client
//!
//! Main client for interacting with AWS APIs, combining credentials, region
//! and endpoint resolution, request signing and HTTP.

use super::auth::{self, CredentialSource};
use super::http::AwsHttpClient;
use super::sigv4::SigningParams;
use super::sts::{self, AccountIdentity};
use crate::error::{QueryError, Result};
use crate::query::IdentityProvider;
use aws_credential_types::Credentials;
use serde_json::Value;
use std::time::{Duration, SystemTime};
use url::Url;

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// AWS services this client talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Ec2,
    Sts,
    ResourceExplorer,
}

impl Service {
    /// Name used in the SigV4 credential scope
    pub fn signing_name(&self) -> &'static str {
        match self {
            Self::Ec2 => "ec2",
            Self::Sts => "sts",
            Self::ResourceExplorer => "resource-explorer-2",
        }
    }
}

/// Settings used to build an [`AwsClient`]
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub profile: String,
    pub region: String,
    /// Send every request here instead of the public endpoints
    pub endpoint_url: Option<String>,
    pub request_timeout: Duration,
    /// Explicit credentials; the default provider chain is used when absent
    pub credentials: Option<Credentials>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            profile: super::auth::DEFAULT_PROFILE.to_string(),
            region: "us-east-1".to_string(),
            endpoint_url: None,
            request_timeout: DEFAULT_TIMEOUT,
            credentials: None,
        }
    }
}

/// Main AWS client
#[derive(Clone)]
pub struct AwsClient {
    pub credentials: CredentialSource,
    pub http: AwsHttpClient,
    pub region: String,
    pub profile: String,
    endpoint_url: Option<Url>,
}

impl AwsClient {
    /// Create a new AWS client
    pub async fn new(options: ClientOptions) -> Result<Self> {
        let credentials = match options.credentials {
            Some(creds) => CredentialSource::from_static(creds),
            None => CredentialSource::new(
                auth::credentials_provider(&options.profile, &options.region, None).await?,
            ),
        };

        let endpoint_url = options
            .endpoint_url
            .as_deref()
            .map(Url::parse)
            .transpose()
            .map_err(|e| QueryError::decode("endpoint URL", e))?;

        let http = AwsHttpClient::new(options.request_timeout)?;

        Ok(Self {
            credentials,
            http,
            region: options.region,
            profile: options.profile,
            endpoint_url,
        })
    }

    /// DNS suffix for the client's region
    pub fn dns_suffix(&self) -> &'static str {
        if self.region.starts_with("cn-") {
            "amazonaws.com.cn"
        } else {
            "amazonaws.com"
        }
    }

    /// Partition implied by the client's region
    pub fn partition(&self) -> &'static str {
        if self.region.starts_with("cn-") {
            "aws-cn"
        } else if self.region.starts_with("us-gov-") {
            "aws-us-gov"
        } else {
            "aws"
        }
    }

    /// Base endpoint for a service
    pub fn endpoint(&self, service: Service) -> Result<Url> {
        if let Some(url) = &self.endpoint_url {
            return Ok(url.clone());
        }

        let raw = match service {
            Service::Ec2 => format!("https://ec2.{}.{}/", self.region, self.dns_suffix()),
            Service::Sts => format!("https://sts.{}.{}/", self.region, self.dns_suffix()),
            Service::ResourceExplorer => {
                format!("https://resource-explorer-2.{}.api.aws/", self.region)
            }
        };
        Url::parse(&raw).map_err(|e| QueryError::decode("endpoint URL", e))
    }

    fn signing_params<'a>(
        &'a self,
        credentials: &'a Credentials,
        service: Service,
    ) -> SigningParams<'a> {
        SigningParams {
            credentials,
            region: &self.region,
            service: service.signing_name(),
            time: SystemTime::now(),
        }
    }

    /// Call a Query protocol action (EC2, STS) and return the XML body
    pub async fn query(&self, service: Service, params: &[(String, String)]) -> Result<String> {
        let url = self.endpoint(service)?;
        let credentials = self.credentials.credentials().await?;
        self.http
            .post_query(&url, &self.signing_params(&credentials, service), params)
            .await
    }

    /// Call a JSON protocol operation at `/<operation>`
    pub async fn json(&self, service: Service, operation: &str, body: &Value) -> Result<Value> {
        let url = self
            .endpoint(service)?
            .join(operation)
            .map_err(|e| QueryError::decode("endpoint URL", e))?;
        let credentials = self.credentials.credentials().await?;
        self.http
            .post_json(&url, &self.signing_params(&credentials, service), body)
            .await
    }
}

impl IdentityProvider for AwsClient {
    async fn resolve_identity(&self) -> Result<AccountIdentity> {
        sts::get_caller_identity(self).await
    }
}
