//! Table Registry - Load table definitions from JSON
//!
//! This module loads all table definitions from embedded JSON files and
//! provides lookup functions for the rest of the crate.

use crate::error::{QueryError, Result};
use crate::query::Operator;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

/// Embedded schema JSON files (compiled into the binary)
const SCHEMA_FILES: &[&str] = &[
    include_str!("../schemas/common.json"),
    include_str!("../schemas/ec2.json"),
    include_str!("../schemas/resource_explorer.json"),
];

/// Column data type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    String,
    Bool,
    Int,
    Timestamp,
    Json,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Timestamp => "timestamp",
            Self::Json => "json",
        }
    }
}

/// Reshapes a source value (or the whole item) into a column value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    /// Empty string, zero and false become null
    NullIfZero,
    /// Image name, falling back to the image id
    ImageTitle,
    /// `[{Key, Value}]` to `{key: value}`
    TagsToMap,
}

/// Column computed outside the listed item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hydrate {
    ImageOwnerAlias,
    ImageAkas,
    AccountId,
    Partition,
    Region,
}

impl Hydrate {
    /// Whether computing this column needs the caller's identity
    pub fn needs_identity(&self) -> bool {
        !matches!(self, Self::Region)
    }
}

/// Column definition from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub description: String,
    /// Dot path into the item; defaults to the PascalCase column name
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub transform: Option<Transform>,
    #[serde(default)]
    pub hydrate: Option<Hydrate>,
}

impl ColumnDef {
    pub fn source_path(&self) -> String {
        self.path
            .clone()
            .unwrap_or_else(|| pascal_case(&self.name))
    }

    pub fn needs_identity(&self) -> bool {
        self.hydrate.map(|h| h.needs_identity()).unwrap_or(false)
    }
}

/// `image_owner_alias` -> `ImageOwnerAlias`
pub fn pascal_case(name: &str) -> String {
    name.split('_')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Require {
    Required,
    #[default]
    Optional,
}

fn default_operators() -> Vec<String> {
    vec!["=".to_string()]
}

/// A column whose quals are passed to the list/get function
#[derive(Debug, Clone, Deserialize)]
pub struct KeyColumnDef {
    pub name: String,
    #[serde(default)]
    pub require: Require,
    #[serde(default = "default_operators")]
    pub operators: Vec<String>,
}

impl KeyColumnDef {
    pub fn accepts(&self, operator: Operator) -> bool {
        self.operators
            .iter()
            .any(|o| Operator::parse(o) == Some(operator))
    }
}

/// List or get configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OperationDef {
    pub method: String,
    #[serde(default)]
    pub key_columns: Vec<KeyColumnDef>,
    /// Provider error codes that mean "no rows" rather than failure
    #[serde(default)]
    pub ignore_error_codes: Vec<String>,
}

impl OperationDef {
    pub fn key_column(&self, name: &str) -> Option<&KeyColumnDef> {
        self.key_columns.iter().find(|k| k.name == name)
    }

    pub fn required_columns(&self) -> impl Iterator<Item = &KeyColumnDef> {
        self.key_columns
            .iter()
            .filter(|k| k.require == Require::Required)
    }
}

/// Table definition from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct TableDef {
    #[serde(default)]
    pub name: String,
    pub description: String,
    pub list: OperationDef,
    #[serde(default)]
    pub get: Option<OperationDef>,
    #[serde(default)]
    pub columns: Vec<ColumnDef>,
    /// Name of a shared column set to prepend to `columns`
    #[serde(default)]
    pub column_set: Option<String>,
}

impl TableDef {
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Resolve column names; an empty list selects every column
    pub fn select_columns(&self, names: &[String]) -> Result<Vec<&ColumnDef>> {
        if names.is_empty() {
            return Ok(self.columns.iter().collect());
        }
        names
            .iter()
            .map(|n| {
                self.column(n).ok_or_else(|| QueryError::UnknownColumn {
                    table: self.name.clone(),
                    column: n.clone(),
                })
            })
            .collect()
    }
}

/// Root structure of schemas/*.json
#[derive(Debug, Clone, Deserialize)]
struct SchemaFile {
    #[serde(default)]
    standard_columns: Vec<ColumnDef>,
    #[serde(default)]
    column_sets: HashMap<String, Vec<ColumnDef>>,
    #[serde(default)]
    tables: BTreeMap<String, TableDef>,
}

/// All known tables
#[derive(Debug, Clone)]
pub struct TableRegistry {
    pub tables: BTreeMap<String, TableDef>,
}

/// Merge schema documents into a registry
pub fn build_registry(files: &[&str]) -> Result<TableRegistry> {
    let mut standard_columns = Vec::new();
    let mut column_sets = HashMap::new();
    let mut tables = BTreeMap::new();

    for content in files {
        let partial: SchemaFile = serde_json::from_str(content)
            .map_err(|e| QueryError::Schema(format!("invalid schema JSON: {}", e)))?;
        standard_columns.extend(partial.standard_columns);
        column_sets.extend(partial.column_sets);
        tables.extend(partial.tables);
    }

    for (name, table) in tables.iter_mut() {
        table.name = name.clone();

        if let Some(set) = &table.column_set {
            let shared: &Vec<ColumnDef> = column_sets.get(set).ok_or_else(|| {
                QueryError::Schema(format!("table {} uses unknown column set {}", name, set))
            })?;
            let own = std::mem::take(&mut table.columns);
            table.columns = shared.iter().cloned().chain(own).collect();
        }

        table.columns.extend(standard_columns.iter().cloned());

        let mut seen = std::collections::HashSet::new();
        for column in &table.columns {
            if !seen.insert(column.name.as_str()) {
                return Err(QueryError::Schema(format!(
                    "table {} declares column {} twice",
                    name, column.name
                )));
            }
        }
    }

    Ok(TableRegistry { tables })
}

/// Global registry loaded from JSON
static REGISTRY: OnceLock<TableRegistry> = OnceLock::new();

/// Get the table registry (loads from embedded JSON on first access)
pub fn get_registry() -> &'static TableRegistry {
    REGISTRY.get_or_init(|| {
        build_registry(SCHEMA_FILES)
            .unwrap_or_else(|e| panic!("Failed to load embedded table schemas: {}", e))
    })
}

/// Get a table definition by name
pub fn get_table(name: &str) -> Option<&'static TableDef> {
    get_registry().tables.get(name)
}

/// Get all table names, sorted
pub fn get_all_table_names() -> Vec<&'static str> {
    get_registry().tables.keys().map(|s| s.as_str()).collect()
}
