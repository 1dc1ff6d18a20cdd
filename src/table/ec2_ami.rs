//! List and get functions for the AMI tables

use super::filters::{build_ami_filters, AmiListing};
use crate::aws::client::AwsClient;
use crate::aws::ec2::{self, DescribeImagesInput, Filter, Image};
use crate::error::{QueryError, Result};
use crate::query::{
    list_pages, qual_value, ItemSink, ListSummary, Page, PaginatorOptions, QueryContext, ValueKind,
};
use serde_json::Value;

/// `DescribeImages` accepts 5 to 1000 results per page
const MAX_PAGE_SIZE: u32 = 1000;
const MIN_PAGE_SIZE: u32 = 5;

const SELF_OWNER: &str = "self";

/// Images owned by the caller's account
pub async fn list_owned_amis(
    client: &AwsClient,
    ctx: &QueryContext,
    sink: &mut dyn ItemSink<Value>,
) -> Result<ListSummary> {
    // The owner filter may need an STS call; skip it when no rows are wanted.
    if sink.rows_remaining() == 0 {
        return Ok(ListSummary::stopped_early());
    }
    let filters = build_ami_filters(ctx, client, AmiListing::Owned).await;
    list_images(client, ctx, vec![SELF_OWNER.to_string()], filters, sink).await
}

/// Images owned by the accounts in the `owner_id` qual
pub async fn list_amis_by_owner(
    client: &AwsClient,
    ctx: &QueryContext,
    sink: &mut dyn ItemSink<Value>,
) -> Result<ListSummary> {
    let owners = qual_value(&ctx.quals, "owner_id", ValueKind::String).ok_or_else(|| {
        QueryError::MissingKeyColumn {
            table: ctx.table.clone(),
            column: "owner_id".to_string(),
        }
    })?;
    let filters = build_ami_filters(ctx, client, AmiListing::Shared).await;
    list_images(client, ctx, owners, filters, sink).await
}

async fn list_images(
    client: &AwsClient,
    ctx: &QueryContext,
    owners: Vec<String>,
    filters: Vec<Filter>,
    sink: &mut dyn ItemSink<Value>,
) -> Result<ListSummary> {
    let page_size = ctx.page_size(MAX_PAGE_SIZE, MIN_PAGE_SIZE);
    tracing::debug!(
        query = %ctx.id,
        "DescribeImages owners={:?} page_size={}",
        owners,
        page_size
    );

    let options = PaginatorOptions {
        stop_on_duplicate_token: true,
    };
    list_pages(options, sink, |token| {
        let input = DescribeImagesInput {
            owners: owners.clone(),
            filters: filters.clone(),
            max_results: Some(page_size),
            next_token: token,
            ..Default::default()
        };
        async move {
            let page = ec2::describe_images(client, &input).await?;
            Ok(Page {
                items: images_to_values(page.images)?,
                next_token: page.next_token,
            })
        }
    })
    .await
}

/// Owned image by id
pub async fn get_ec2_ami(
    client: &AwsClient,
    ctx: &QueryContext,
    sink: &mut dyn ItemSink<Value>,
) -> Result<ListSummary> {
    get_image(client, ctx, vec![SELF_OWNER.to_string()], sink).await
}

/// Any image visible to the caller, by id
pub async fn get_ec2_ami_shared(
    client: &AwsClient,
    ctx: &QueryContext,
    sink: &mut dyn ItemSink<Value>,
) -> Result<ListSummary> {
    get_image(client, ctx, Vec::new(), sink).await
}

async fn get_image(
    client: &AwsClient,
    ctx: &QueryContext,
    owners: Vec<String>,
    sink: &mut dyn ItemSink<Value>,
) -> Result<ListSummary> {
    let image_id = ctx
        .quals
        .equals_string("image_id")
        .ok_or_else(|| QueryError::MissingKeyColumn {
            table: ctx.table.clone(),
            column: "image_id".to_string(),
        })?;

    if sink.rows_remaining() == 0 {
        return Ok(ListSummary::stopped_early());
    }

    let input = DescribeImagesInput {
        owners,
        image_ids: vec![image_id],
        ..Default::default()
    };
    let page = ec2::describe_images(client, &input).await?;

    let mut summary = ListSummary::empty();
    summary.pages = 1;
    // The id is unique, so at most one image comes back.
    if let Some(image) = images_to_values(page.images)?.into_iter().next() {
        sink.stream_item(image)?;
        summary.items = 1;
    }
    Ok(summary)
}

fn images_to_values(images: Vec<Image>) -> Result<Vec<Value>> {
    images
        .into_iter()
        .map(|image| serde_json::to_value(image).map_err(|e| QueryError::decode("image", e)))
        .collect()
}
