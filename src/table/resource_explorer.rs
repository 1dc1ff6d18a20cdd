//! List function for the Resource Explorer supported resource types table

use crate::aws::client::AwsClient;
use crate::aws::resource_explorer::{self, is_supported_region};
use crate::error::{QueryError, Result};
use crate::query::{list_pages, ItemSink, ListSummary, Page, PaginatorOptions, QueryContext};
use serde_json::Value;

const MAX_PAGE_SIZE: u32 = 100;
const MIN_PAGE_SIZE: u32 = 1;

/// Resource types Resource Explorer can index. Regions where the service
/// is not offered produce no rows.
pub async fn list_supported_resource_types(
    client: &AwsClient,
    ctx: &QueryContext,
    sink: &mut dyn ItemSink<Value>,
) -> Result<ListSummary> {
    if !is_supported_region(&client.region) {
        tracing::info!(
            query = %ctx.id,
            "Resource Explorer is not available in {}, returning no rows",
            client.region
        );
        return Ok(ListSummary::empty());
    }

    let page_size = ctx.page_size(MAX_PAGE_SIZE, MIN_PAGE_SIZE);
    let options = PaginatorOptions {
        stop_on_duplicate_token: true,
    };

    list_pages(options, sink, |token| async move {
        let page =
            resource_explorer::list_supported_resource_types(client, page_size, token.as_deref())
                .await?;
        let items = page
            .resource_types
            .into_iter()
            .map(|t| {
                serde_json::to_value(t).map_err(|e| QueryError::decode("resource type", e))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Page {
            items,
            next_token: page.next_token,
        })
    })
    .await
}
