//! Resource Explorer `ListSupportedResourceTypes`

use super::client::{AwsClient, Service};
use crate::error::{QueryError, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Regions where the Resource Explorer API is available
pub const SUPPORTED_REGIONS: &[&str] = &[
    "af-south-1",
    "ap-east-1",
    "ap-northeast-1",
    "ap-northeast-2",
    "ap-northeast-3",
    "ap-south-1",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-southeast-3",
    "ca-central-1",
    "eu-central-1",
    "eu-north-1",
    "eu-south-1",
    "eu-west-1",
    "eu-west-2",
    "eu-west-3",
    "me-central-1",
    "me-south-1",
    "sa-east-1",
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
];

pub fn is_supported_region(region: &str) -> bool {
    SUPPORTED_REGIONS.contains(&region)
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SupportedResourceType {
    pub resource_type: Option<String>,
    pub service: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListSupportedResourceTypesResponse {
    #[serde(default)]
    resource_types: Vec<SupportedResourceType>,
    next_token: Option<String>,
}

#[derive(Debug)]
pub struct SupportedResourceTypesPage {
    pub resource_types: Vec<SupportedResourceType>,
    pub next_token: Option<String>,
}

pub async fn list_supported_resource_types(
    client: &AwsClient,
    max_results: u32,
    next_token: Option<&str>,
) -> Result<SupportedResourceTypesPage> {
    let mut body = json!({ "MaxResults": max_results });
    if let Some(token) = next_token {
        body["NextToken"] = json!(token);
    }

    let response = client
        .json(Service::ResourceExplorer, "ListSupportedResourceTypes", &body)
        .await?;
    let parsed: ListSupportedResourceTypesResponse = serde_json::from_value(response)
        .map_err(|e| QueryError::decode("ListSupportedResourceTypes response", e))?;

    Ok(SupportedResourceTypesPage {
        resource_types: parsed.resource_types,
        next_token: parsed.next_token.filter(|t| !t.is_empty()),
    })
}
