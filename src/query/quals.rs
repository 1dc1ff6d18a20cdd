//! Qualifiers
//!
//! Caller-supplied predicates (`column = value`, `column <> value`) keyed by
//! column name, and the extraction of those values for filter building.

use crate::error::{QueryError, Result};
use crate::table::ColumnType;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
}

impl Operator {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "=" => Some(Self::Eq),
            "<>" | "!=" => Some(Self::Ne),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
        }
    }
}

/// A literal on the right-hand side of a qualifier
#[derive(Debug, Clone, PartialEq)]
pub enum QualValue {
    String(String),
    Bool(bool),
    Int(i64),
    /// `column = [a, b]`, i.e. an IN list
    List(Vec<String>),
}

impl fmt::Display for QualValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{}", s),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(n) => write!(f, "{}", n),
            Self::List(items) => write!(f, "[{}]", items.join(" ")),
        }
    }
}

impl QualValue {
    /// Parse a raw literal for a column of the given type.
    ///
    /// Literals that don't parse as the column's type are kept as strings.
    pub fn parse_for(column_type: ColumnType, raw: &str) -> Self {
        let raw = raw.trim();
        if let Some(inner) = raw.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
            return Self::List(
                inner
                    .split(',')
                    .map(|s| unquote(s.trim()).to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            );
        }

        let raw = unquote(raw);
        match column_type {
            ColumnType::Bool => match raw.to_ascii_lowercase().as_str() {
                "true" => Self::Bool(true),
                "false" => Self::Bool(false),
                _ => Self::String(raw.to_string()),
            },
            ColumnType::Int => raw
                .parse()
                .map(Self::Int)
                .unwrap_or_else(|_| Self::String(raw.to_string())),
            _ => Self::String(raw.to_string()),
        }
    }
}

fn unquote(s: &str) -> &str {
    for quote in ['\'', '"'] {
        if let Some(inner) = s.strip_prefix(quote).and_then(|r| r.strip_suffix(quote)) {
            return inner;
        }
    }
    s
}

/// One predicate on one column
#[derive(Debug, Clone, PartialEq)]
pub struct Qual {
    pub column: String,
    pub operator: Operator,
    pub value: QualValue,
}

impl Qual {
    pub fn new(column: &str, operator: Operator, value: QualValue) -> Self {
        Self {
            column: column.to_string(),
            operator,
            value,
        }
    }

    /// Evaluate this predicate against a column value. NULL never matches.
    pub fn matches(&self, value: &Value) -> bool {
        let Some(actual) = value_as_string(value) else {
            return false;
        };
        let equal = match &self.value {
            QualValue::List(items) => items.iter().any(|i| *i == actual),
            other => other.to_string() == actual,
        };
        match self.operator {
            Operator::Eq => equal,
            Operator::Ne => !equal,
        }
    }
}

fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

/// Split `column<op>value` into its parts
pub fn split_predicate(expr: &str) -> Option<(&str, Operator, &str)> {
    let (idx, op) = ["<>", "!=", "="]
        .iter()
        .filter_map(|op| expr.find(op).map(|i| (i, *op)))
        .min_by_key(|(i, _)| *i)?;

    let column = expr[..idx].trim();
    if column.is_empty() {
        return None;
    }
    Some((column, Operator::parse(op)?, &expr[idx + op.len()..]))
}

/// The predicate map: column name to the quals on that column
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QualMap {
    quals: BTreeMap<String, Vec<Qual>>,
}

impl QualMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, column: &str, operator: Operator, value: QualValue) -> Self {
        self.push(Qual::new(column, operator, value));
        self
    }

    pub fn push(&mut self, qual: Qual) {
        self.quals.entry(qual.column.clone()).or_default().push(qual);
    }

    pub fn get(&self, column: &str) -> Option<&[Qual]> {
        self.quals.get(column).map(|v| v.as_slice())
    }

    pub fn contains(&self, column: &str) -> bool {
        self.quals.contains_key(column)
    }

    pub fn is_empty(&self) -> bool {
        self.quals.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.quals.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Qual> {
        self.quals.values().flatten()
    }

    /// First `=` string value for a column (single-item lookups)
    pub fn equals_string(&self, column: &str) -> Option<String> {
        self.get(column)?
            .iter()
            .find(|q| q.operator == Operator::Eq)
            .map(|q| q.value.to_string())
    }
}

/// Kind a filter value is coerced to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Bool,
}

/// Read the qualifier value for `column`, coerced to `kind`, as the
/// provider value set. Returns `None` if the column has no usable qual.
///
/// When a column carries several quals the last one wins. Boolean columns
/// take their value from the operator and literal together (`<> true` is
/// `"false"`); a literal that is not a boolean is passed through in its
/// string form instead of failing the query.
// NOTE: the string fallback for boolean columns is kept for compatibility;
// the provider rejects such values, so the query fails there instead.
pub fn qual_value(quals: &QualMap, column: &str, kind: ValueKind) -> Option<Vec<String>> {
    let mut value = None;

    for qual in quals.get(column)? {
        match kind {
            ValueKind::Bool => {
                let coerced = match &qual.value {
                    QualValue::Bool(b) => match qual.operator {
                        Operator::Eq => b.to_string(),
                        Operator::Ne => (!b).to_string(),
                    },
                    other => {
                        tracing::debug!(
                            "non-boolean value {:?} for boolean column {}, using string form",
                            other,
                            column
                        );
                        other.to_string()
                    }
                };
                value = Some(vec![coerced]);
            }
            ValueKind::String => {
                if qual.operator != Operator::Eq {
                    continue;
                }
                value = Some(match &qual.value {
                    QualValue::List(items) => items.clone(),
                    other => vec![other.to_string()],
                });
            }
        }
    }

    value.filter(|v: &Vec<String>| !v.is_empty())
}

/// Parse a `column<op>value` expression against a column type lookup
pub fn parse_predicate(
    table: &str,
    expr: &str,
    column_type: impl Fn(&str) -> Option<ColumnType>,
) -> Result<Qual> {
    let (column, operator, raw) = split_predicate(expr).ok_or_else(|| {
        QueryError::Schema(format!(
            "cannot parse predicate '{}', expected column=value or column<>value",
            expr
        ))
    })?;

    let ty = column_type(column).ok_or_else(|| QueryError::UnknownColumn {
        table: table.to_string(),
        column: column.to_string(),
    })?;

    Ok(Qual::new(column, operator, QualValue::parse_for(ty, raw)))
}
