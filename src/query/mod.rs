//! Query engine side
//!
//! Everything between a caller's request and the table functions: the
//! predicate map, the per-query context, row sinks, the paginated lister
//! and the executor that ties them together.
//!
//! # Architecture
//!
//! - [`quals`] - Predicates and the qualifier extractor
//! - [`context`] - Per-query state and the cached caller identity
//! - [`sink`] - Rows and their consumers
//! - [`paginator`] - Page-by-page listing with early stop
//! - [`executor`] - Runs one table scan end to end

pub mod context;
pub mod executor;
pub mod paginator;
pub mod quals;
pub mod sink;

pub use context::{IdentityProvider, QueryContext};
pub use executor::{execute, QueryRequest, QuerySummary};
pub use paginator::{list_pages, ItemSink, ListOutcome, ListSummary, Page, PaginatorOptions};
pub use quals::{qual_value, Operator, Qual, QualMap, QualValue, ValueKind};
pub use sink::{CollectSink, JsonLinesSink, LimitedSink, Row, RowSink};
