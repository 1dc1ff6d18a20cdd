//! EC2 `DescribeImages`
//!
//! Images are decoded from the Query protocol XML and re-serialized with the
//! AWS SDK field names (`ImageId`, `OwnerId`, `Tags`, ...), which is the shape
//! table columns read from.

use super::client::{AwsClient, Service};
use super::xml::{self, ItemSet};
use crate::error::Result;
use serde::{Deserialize, Serialize};

const API_VERSION: &str = "2016-11-15";

/// A provider-native filter: one key, one or more values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub name: String,
    pub values: Vec<String>,
}

impl Filter {
    pub fn new(name: &str, values: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            values,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DescribeImagesInput {
    pub owners: Vec<String>,
    pub image_ids: Vec<String>,
    pub filters: Vec<Filter>,
    pub max_results: Option<u32>,
    pub next_token: Option<String>,
}

impl DescribeImagesInput {
    /// Flatten into Query protocol parameters
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("Action".to_string(), "DescribeImages".to_string()),
            ("Version".to_string(), API_VERSION.to_string()),
        ];

        for (i, owner) in self.owners.iter().enumerate() {
            params.push((format!("Owner.{}", i + 1), owner.clone()));
        }
        for (i, id) in self.image_ids.iter().enumerate() {
            params.push((format!("ImageId.{}", i + 1), id.clone()));
        }
        for (i, filter) in self.filters.iter().enumerate() {
            params.push((format!("Filter.{}.Name", i + 1), filter.name.clone()));
            for (j, value) in filter.values.iter().enumerate() {
                params.push((format!("Filter.{}.Value.{}", i + 1, j + 1), value.clone()));
            }
        }
        if let Some(max) = self.max_results {
            params.push(("MaxResults".to_string(), max.to_string()));
        }
        if let Some(token) = &self.next_token {
            params.push(("NextToken".to_string(), token.clone()));
        }

        params
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all(serialize = "PascalCase", deserialize = "camelCase"))]
pub struct Tag {
    pub key: Option<String>,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all(serialize = "PascalCase", deserialize = "camelCase"))]
pub struct ProductCode {
    #[serde(rename(deserialize = "productCode"))]
    pub product_code_id: Option<String>,
    #[serde(rename(deserialize = "type"))]
    pub product_code_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all(serialize = "PascalCase", deserialize = "camelCase"))]
pub struct EbsBlockDevice {
    pub delete_on_termination: Option<bool>,
    pub encrypted: Option<bool>,
    pub iops: Option<i64>,
    pub kms_key_id: Option<String>,
    pub snapshot_id: Option<String>,
    pub throughput: Option<i64>,
    pub volume_size: Option<i64>,
    pub volume_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all(serialize = "PascalCase", deserialize = "camelCase"))]
pub struct BlockDeviceMapping {
    pub device_name: Option<String>,
    pub virtual_name: Option<String>,
    pub no_device: Option<String>,
    pub ebs: Option<EbsBlockDevice>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all(serialize = "PascalCase", deserialize = "camelCase"))]
pub struct Image {
    pub image_id: Option<String>,
    pub name: Option<String>,
    #[serde(rename(deserialize = "imageState"))]
    pub state: Option<String>,
    pub image_type: Option<String>,
    pub image_location: Option<String>,
    pub creation_date: Option<String>,
    pub deprecation_time: Option<String>,
    pub architecture: Option<String>,
    pub description: Option<String>,
    pub ena_support: Option<bool>,
    pub hypervisor: Option<String>,
    pub image_owner_alias: Option<String>,
    pub imds_support: Option<String>,
    pub boot_mode: Option<String>,
    pub kernel_id: Option<String>,
    #[serde(rename(deserialize = "imageOwnerId"))]
    pub owner_id: Option<String>,
    pub platform: Option<String>,
    pub platform_details: Option<String>,
    #[serde(rename(deserialize = "isPublic"))]
    pub public: Option<bool>,
    pub ramdisk_id: Option<String>,
    pub root_device_name: Option<String>,
    pub root_device_type: Option<String>,
    pub sriov_net_support: Option<String>,
    pub usage_operation: Option<String>,
    pub virtualization_type: Option<String>,
    #[serde(rename(deserialize = "blockDeviceMapping"), default)]
    pub block_device_mappings: ItemSet<BlockDeviceMapping>,
    #[serde(default)]
    pub product_codes: ItemSet<ProductCode>,
    #[serde(rename(deserialize = "tagSet"), default)]
    pub tags: ItemSet<Tag>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeImagesResponse {
    #[serde(default)]
    images_set: ItemSet<Image>,
    next_token: Option<String>,
}

/// One page of `DescribeImages` output
#[derive(Debug)]
pub struct DescribeImagesPage {
    pub images: Vec<Image>,
    pub next_token: Option<String>,
}

/// Decode a `DescribeImagesResponse` document
pub fn parse_describe_images(body: &str) -> Result<DescribeImagesPage> {
    let response: DescribeImagesResponse = xml::from_str("DescribeImages response", body)?;
    Ok(DescribeImagesPage {
        images: response.images_set.into_inner(),
        next_token: response.next_token.filter(|t| !t.is_empty()),
    })
}

/// Call `DescribeImages` once (one page)
pub async fn describe_images(
    client: &AwsClient,
    input: &DescribeImagesInput,
) -> Result<DescribeImagesPage> {
    let body = client.query(Service::Ec2, &input.to_params()).await?;
    parse_describe_images(&body)
}
