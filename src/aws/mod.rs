//! AWS API interaction module
//!
//! This module provides the core functionality for interacting with AWS
//! APIs: credentials, request signing, HTTP transport and the handful of
//! operations the tables need.
//!
//! # Module Structure
//!
//! - [`auth`] - Credential provider chain and default region
//! - [`client`] - Main AWS client (endpoints, signing, protocol dispatch)
//! - [`http`] - HTTP utilities for Query (XML) and JSON protocol calls
//! - [`sigv4`] - AWS Signature Version 4 (via `aws-sigv4`)
//! - [`xml`] - XML decoding helpers
//! - [`ec2`], [`sts`], [`resource_explorer`] - API operations
//!
//! # Example
//!
//! ```ignore
//! use awsql::aws::client::{AwsClient, ClientOptions};
//! use awsql::aws::ec2::{describe_images, DescribeImagesInput};
//!
//! async fn example() -> awsql::Result<()> {
//!     let client = AwsClient::new(ClientOptions::default()).await?;
//!     let input = DescribeImagesInput { owners: vec!["self".into()], ..Default::default() };
//!     let page = describe_images(&client, &input).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod ec2;
pub mod http;
pub mod resource_explorer;
pub mod sigv4;
pub mod sts;
pub mod xml;
