//! awsql - query AWS resources as tables
//!
//! AMIs and Resource Explorer resource types exposed as tables with typed
//! columns. A query names a table, optional predicates, columns and a row
//! limit; rows are streamed to a [`query::RowSink`] page by page.
//!
//! - [`aws`] - Signed HTTP access to EC2, STS and Resource Explorer
//! - [`query`] - Predicates, query context, pagination and the executor
//! - [`table`] - Table definitions, filter translation and row enrichment

pub mod aws;
pub mod error;
pub mod query;
pub mod table;

pub use error::{QueryError, Result};
