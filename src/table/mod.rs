//! Table abstraction layer
//!
//! Tables are data-driven: their columns, key columns and list/get methods
//! are loaded from JSON files at compile time. The functions behind the
//! method names live alongside.
//!
//! # Architecture
//!
//! - [`registry`] - Loads and caches table definitions from embedded JSON
//! - [`enrich`] - Computes column values from listed items
//! - [`filters`] - Translates quals into `DescribeImages` filters
//! - [`dispatch`] - Maps method names to list/get functions
//!
//! # Table Definitions
//!
//! Tables are defined in JSON files under `src/schemas/`:
//! - `common.json` - Standard columns appended to every table
//! - `ec2.json` - AMI tables and their shared column set
//! - `resource_explorer.json` - Resource Explorer supported resource types
//!
//! # Example
//!
//! ```ignore
//! use awsql::table::get_table;
//!
//! let table = get_table("aws_ec2_ami_shared").unwrap();
//! for column in &table.columns {
//!     println!("{} {}", column.name, column.column_type.as_str());
//! }
//! ```

pub mod dispatch;
pub mod ec2_ami;
pub mod enrich;
pub mod filters;
mod registry;
pub mod resource_explorer;

pub use enrich::{column_value, image_owner_alias, EnrichContext};
pub use filters::{build_ami_filters, build_filters, AmiListing, AMI_FILTER_QUALS};
pub use registry::{
    build_registry, get_all_table_names, get_registry, get_table, pascal_case, ColumnDef,
    ColumnType, Hydrate, KeyColumnDef, OperationDef, Require, TableDef, TableRegistry, Transform,
};
