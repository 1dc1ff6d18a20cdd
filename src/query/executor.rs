//! Query executor
//!
//! Runs one scan of one table: validates the request, picks the get or list
//! method, builds the per-query context, and streams enriched, projected
//! rows into the caller's sink.

use super::context::QueryContext;
use super::paginator::{ItemSink, ListOutcome, ListSummary};
use super::quals::{Operator, Qual, QualMap, QualValue};
use super::sink::{LimitedSink, Row, RowSink};
use crate::aws::client::AwsClient;
use crate::error::{QueryError, Result};
use crate::table::dispatch::{invoke_get, invoke_list};
use crate::table::{column_value, get_table, ColumnDef, EnrichContext, OperationDef, TableDef};
use serde_json::Value;
use tracing::Instrument;
use uuid::Uuid;

/// A scan of one table
#[derive(Debug, Clone, Default)]
pub struct QueryRequest {
    pub table: String,
    /// Output columns, in order; empty selects all
    pub columns: Vec<String>,
    pub quals: Vec<Qual>,
    pub limit: Option<usize>,
}

/// What a scan did
#[derive(Debug, Clone)]
pub struct QuerySummary {
    pub query_id: Uuid,
    /// Rows handed to the sink
    pub rows: usize,
    /// Items the provider returned
    pub items: usize,
    pub pages: usize,
    pub outcome: ListOutcome,
    /// Provider error code that was treated as "no rows"
    pub ignored_error: Option<String>,
}

/// Run a query against the table named in `request`
pub async fn execute<S: RowSink>(
    client: &AwsClient,
    request: &QueryRequest,
    sink: &mut S,
) -> Result<QuerySummary> {
    let table = get_table(&request.table)
        .ok_or_else(|| QueryError::UnknownTable(request.table.clone()))?;
    let columns = table.select_columns(&request.columns)?;

    for qual in &request.quals {
        if table.column(&qual.column).is_none() {
            return Err(QueryError::UnknownColumn {
                table: table.name.clone(),
                column: qual.column.clone(),
            });
        }
    }

    let (operation, is_get) = choose_operation(table, &request.quals);
    let key_quals = key_column_quals(operation, &request.quals);
    check_required(table, operation, &key_quals)?;

    let ctx = QueryContext::new(&table.name, key_quals, request.limit);
    let span = tracing::info_span!("query", id = %ctx.id, table = %table.name);

    async {
        tracing::info!(
            "{} via {} ({} quals, limit {:?})",
            if is_get { "get" } else { "list" },
            operation.method,
            request.quals.len(),
            request.limit
        );

        let needs_identity = columns.iter().any(|c| c.needs_identity())
            || request.quals.iter().any(|q| {
                table
                    .column(&q.column)
                    .map(|c| c.needs_identity())
                    .unwrap_or(false)
            });
        let sink = LimitedSink::new(sink, request.limit);
        // No rows wanted means no enrichment, so no STS call either.
        let identity = if needs_identity && sink.rows_remaining() > 0 {
            Some(ctx.account_identity(client).await?)
        } else {
            None
        };

        let mut stream = RowStream {
            sink,
            table,
            columns,
            predicates: &request.quals,
            cx: EnrichContext {
                region: &client.region,
                identity,
            },
            filtered: 0,
        };

        let result = if is_get {
            invoke_get(&operation.method, client, &ctx, &mut stream).await
        } else {
            invoke_list(&operation.method, client, &ctx, &mut stream).await
        };

        let mut ignored_error = None;
        let listing = match result {
            Ok(summary) => summary,
            Err(e) if e.is_ignorable(&operation.ignore_error_codes) => {
                tracing::info!("ignoring provider error: {}", e);
                ignored_error = e.api_code().map(str::to_string);
                ListSummary::empty()
            }
            Err(e) => {
                tracing::error!("query failed: {}", e);
                return Err(e);
            }
        };

        let summary = QuerySummary {
            query_id: ctx.id,
            rows: stream.sink.emitted(),
            items: listing.items,
            pages: listing.pages,
            outcome: listing.outcome,
            ignored_error,
        };
        tracing::info!(
            "{} rows from {} items over {} pages ({} filtered out), {:?}",
            summary.rows,
            summary.items,
            summary.pages,
            stream.filtered,
            summary.outcome
        );
        Ok(summary)
    }
    .instrument(span)
    .await
}

/// Get when the table has one and every get key column has a single `=`
/// value; list otherwise
fn choose_operation<'t>(table: &'t TableDef, quals: &[Qual]) -> (&'t OperationDef, bool) {
    if let Some(get) = &table.get {
        let all_keyed = get.required_columns().all(|key| {
            quals.iter().any(|q| {
                q.column == key.name
                    && q.operator == Operator::Eq
                    && !matches!(q.value, QualValue::List(_))
            })
        });
        if all_keyed {
            return (get, true);
        }
    }
    (&table.list, false)
}

/// Quals the list/get function may use: those on its key columns with an
/// operator the key column accepts
fn key_column_quals(operation: &OperationDef, quals: &[Qual]) -> QualMap {
    let mut map = QualMap::new();
    for qual in quals {
        if let Some(key) = operation.key_column(&qual.column) {
            if key.accepts(qual.operator) {
                map.push(qual.clone());
            }
        }
    }
    map
}

fn check_required(table: &TableDef, operation: &OperationDef, quals: &QualMap) -> Result<()> {
    for key in operation.required_columns() {
        let present = quals
            .get(&key.name)
            .map(|qs| qs.iter().any(|q| q.operator == Operator::Eq))
            .unwrap_or(false);
        if !present {
            return Err(QueryError::MissingKeyColumn {
                table: table.name.clone(),
                column: key.name.clone(),
            });
        }
    }
    Ok(())
}

/// Turns listed items into rows: rechecks every qual against the item,
/// then projects the requested columns
struct RowStream<'a, S: RowSink> {
    sink: LimitedSink<'a, S>,
    table: &'static TableDef,
    columns: Vec<&'static ColumnDef>,
    predicates: &'a [Qual],
    cx: EnrichContext<'a>,
    filtered: usize,
}

impl<S: RowSink> RowStream<'_, S> {
    fn matches(&self, item: &Value) -> Result<bool> {
        for qual in self.predicates {
            let Some(column) = self.table.column(&qual.column) else {
                continue;
            };
            if !qual.matches(&column_value(column, item, &self.cx)?) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl<S: RowSink> ItemSink<Value> for RowStream<'_, S> {
    fn stream_item(&mut self, item: Value) -> Result<()> {
        if !self.matches(&item)? {
            self.filtered += 1;
            return Ok(());
        }

        let mut row = Row::new();
        for column in &self.columns {
            row.push(&column.name, column_value(column, &item, &self.cx)?);
        }
        self.sink.stream_row(row)
    }

    fn rows_remaining(&self) -> usize {
        self.sink.rows_remaining()
    }
}
