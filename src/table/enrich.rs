//! Row enrichment
//!
//! Computes column values from a listed item. Plain columns read a dot path
//! out of the item; transformed and hydrated columns are derived here. Every
//! function is pure: the caller's identity is resolved beforehand and passed
//! in.

use super::registry::{ColumnDef, ColumnType, Hydrate, Transform};
use crate::aws::sts::AccountIdentity;
use crate::error::{QueryError, Result};
use chrono::{DateTime, SecondsFormat};
use serde_json::{Map, Value};

/// What a row needs besides the item itself
#[derive(Debug, Clone, Copy)]
pub struct EnrichContext<'a> {
    pub region: &'a str,
    pub identity: Option<&'a AccountIdentity>,
}

impl<'a> EnrichContext<'a> {
    fn identity(&self, column: &str) -> Result<&'a AccountIdentity> {
        self.identity.ok_or_else(|| {
            QueryError::Identity(format!(
                "caller identity is needed for column {} but was not resolved",
                column
            ))
        })
    }
}

/// Value of one column for one item
pub fn column_value(column: &ColumnDef, item: &Value, cx: &EnrichContext<'_>) -> Result<Value> {
    if let Some(hydrate) = column.hydrate {
        return hydrate_value(hydrate, column, item, cx);
    }

    let value = match column.transform {
        Some(Transform::ImageTitle) => image_title(item),
        Some(Transform::TagsToMap) => tags_to_map(lookup(item, &column.source_path())),
        Some(Transform::NullIfZero) => null_if_zero(lookup(item, &column.source_path())),
        None => lookup(item, &column.source_path()).cloned().unwrap_or(Value::Null),
    };

    Ok(match column.column_type {
        ColumnType::Timestamp => normalize_timestamp(value),
        _ => value,
    })
}

fn hydrate_value(
    hydrate: Hydrate,
    column: &ColumnDef,
    item: &Value,
    cx: &EnrichContext<'_>,
) -> Result<Value> {
    let value = match hydrate {
        Hydrate::Region => Value::String(cx.region.to_string()),
        Hydrate::AccountId => Value::String(cx.identity(&column.name)?.account_id.clone()),
        Hydrate::Partition => Value::String(cx.identity(&column.name)?.partition.clone()),
        Hydrate::ImageOwnerAlias => {
            let identity = cx.identity(&column.name)?;
            image_owner_alias(
                string_at(item, "ImageOwnerAlias"),
                string_at(item, "OwnerId"),
                &identity.account_id,
            )
            .map(Value::String)
            .unwrap_or(Value::Null)
        }
        Hydrate::ImageAkas => {
            let identity = cx.identity(&column.name)?;
            match (string_at(item, "OwnerId"), string_at(item, "ImageId")) {
                (Some(owner), Some(image)) => Value::Array(vec![Value::String(image_arn(
                    &identity.partition,
                    cx.region,
                    owner,
                    image,
                ))]),
                _ => Value::Null,
            }
        }
    };
    Ok(value)
}

/// Owner alias as shown to the caller: the provider's alias if any, `self`
/// for images the caller owns, otherwise the owner's account id
pub fn image_owner_alias(
    alias: Option<&str>,
    owner_id: Option<&str>,
    caller_account: &str,
) -> Option<String> {
    if let Some(alias) = alias.filter(|a| !a.is_empty()) {
        return Some(alias.to_string());
    }
    let owner = owner_id?;
    if owner == caller_account {
        Some("self".to_string())
    } else {
        Some(owner.to_string())
    }
}

pub fn image_arn(partition: &str, region: &str, owner_id: &str, image_id: &str) -> String {
    format!(
        "arn:{}:ec2:{}:{}:image/{}",
        partition, region, owner_id, image_id
    )
}

fn image_title(item: &Value) -> Value {
    string_at(item, "Name")
        .filter(|n| !n.is_empty())
        .or_else(|| string_at(item, "ImageId"))
        .map(|s| Value::String(s.to_string()))
        .unwrap_or(Value::Null)
}

/// `[{"Key": k, "Value": v}, ...]` to `{k: v, ...}`; null when there are no tags
pub fn tags_to_map(tags: Option<&Value>) -> Value {
    let Some(Value::Array(list)) = tags else {
        return Value::Null;
    };
    if list.is_empty() {
        return Value::Null;
    }

    let mut map = Map::new();
    for tag in list {
        if let Some(key) = tag.get("Key").and_then(Value::as_str) {
            let value = tag.get("Value").cloned().unwrap_or(Value::Null);
            map.insert(key.to_string(), value);
        }
    }
    Value::Object(map)
}

fn null_if_zero(value: Option<&Value>) -> Value {
    match value {
        None | Some(Value::Null) => Value::Null,
        Some(Value::String(s)) if s.is_empty() => Value::Null,
        Some(Value::Bool(false)) => Value::Null,
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => Value::Null,
        Some(other) => other.clone(),
    }
}

/// RFC 3339 timestamps are re-rendered in UTC with second precision;
/// anything else is passed through
fn normalize_timestamp(value: Value) -> Value {
    match &value {
        Value::String(s) => match DateTime::parse_from_rfc3339(s) {
            Ok(ts) => Value::String(
                ts.with_timezone(&chrono::Utc)
                    .to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
            Err(_) => value,
        },
        _ => value,
    }
}

/// Follow a dot path (`Ebs.VolumeSize`) through nested objects
pub fn lookup<'v>(item: &'v Value, path: &str) -> Option<&'v Value> {
    path.split('.').try_fold(item, |current, key| current.get(key))
}

fn string_at<'v>(item: &'v Value, path: &str) -> Option<&'v str> {
    lookup(item, path).and_then(Value::as_str)
}
