//! STS `GetCallerIdentity`

use super::client::{AwsClient, Service};
use super::xml;
use crate::error::Result;
use serde::Deserialize;

const API_VERSION: &str = "2011-06-15";

/// Who the configured credentials belong to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountIdentity {
    pub account_id: String,
    pub arn: String,
    pub user_id: String,
    /// `aws`, `aws-cn`, `aws-us-gov`, ... taken from the caller ARN
    pub partition: String,
}

impl AccountIdentity {
    pub fn new(account_id: &str, arn: &str, user_id: &str) -> Self {
        Self {
            account_id: account_id.to_string(),
            arn: arn.to_string(),
            user_id: user_id.to_string(),
            partition: partition_from_arn(arn).unwrap_or("aws").to_string(),
        }
    }
}

/// `arn:<partition>:<service>:...`
pub fn partition_from_arn(arn: &str) -> Option<&str> {
    let mut parts = arn.split(':');
    match (parts.next(), parts.next()) {
        (Some("arn"), Some(partition)) if !partition.is_empty() => Some(partition),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CallerIdentityResult {
    account: String,
    arn: String,
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct GetCallerIdentityResponse {
    #[serde(rename = "GetCallerIdentityResult")]
    result: CallerIdentityResult,
}

pub fn parse_get_caller_identity(body: &str) -> Result<AccountIdentity> {
    let response: GetCallerIdentityResponse =
        xml::from_str("GetCallerIdentity response", body)?;
    let r = response.result;
    Ok(AccountIdentity::new(&r.account, &r.arn, &r.user_id))
}

pub async fn get_caller_identity(client: &AwsClient) -> Result<AccountIdentity> {
    let params = vec![
        ("Action".to_string(), "GetCallerIdentity".to_string()),
        ("Version".to_string(), API_VERSION.to_string()),
    ];
    let body = client.query(Service::Sts, &params).await?;
    parse_get_caller_identity(&body)
}
