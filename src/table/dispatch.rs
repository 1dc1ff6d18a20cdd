//! Table Dispatch
//!
//! Maps the list/get method names in the table definitions to the functions
//! that implement them.

use super::{ec2_ami, resource_explorer};
use crate::aws::client::AwsClient;
use crate::error::{QueryError, Result};
use crate::query::{ItemSink, ListSummary, QueryContext};
use serde_json::Value;

/// Invoke a table's list method
pub async fn invoke_list(
    method: &str,
    client: &AwsClient,
    ctx: &QueryContext,
    sink: &mut dyn ItemSink<Value>,
) -> Result<ListSummary> {
    tracing::debug!("invoke_list: table={}, method={}", ctx.table, method);

    match method {
        "list_owned_amis" => ec2_ami::list_owned_amis(client, ctx, sink).await,
        "list_amis_by_owner" => ec2_ami::list_amis_by_owner(client, ctx, sink).await,
        "list_supported_resource_types" => {
            resource_explorer::list_supported_resource_types(client, ctx, sink).await
        }
        _ => Err(QueryError::Schema(format!("unknown list method: {}", method))),
    }
}

/// Invoke a table's get method
pub async fn invoke_get(
    method: &str,
    client: &AwsClient,
    ctx: &QueryContext,
    sink: &mut dyn ItemSink<Value>,
) -> Result<ListSummary> {
    tracing::debug!("invoke_get: table={}, method={}", ctx.table, method);

    match method {
        "get_ec2_ami" => ec2_ami::get_ec2_ami(client, ctx, sink).await,
        "get_ec2_ami_shared" => ec2_ami::get_ec2_ami_shared(client, ctx, sink).await,
        _ => Err(QueryError::Schema(format!("unknown get method: {}", method))),
    }
}
