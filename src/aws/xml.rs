//! XML helpers for Query protocol responses

use crate::error::{QueryError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An EC2-style `<xxxSet><item>..</item></xxxSet>` list.
///
/// Deserializes from the XML wrapper and serializes as a plain array, so
/// decoded records come out with the same shape as the AWS SDK types.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemSet<T>(pub Vec<T>);

impl<T> Default for ItemSet<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> ItemSet<T> {
    pub fn into_inner(self) -> Vec<T> {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for ItemSet<T> {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Wrapper<T> {
            #[serde(default = "Vec::new")]
            item: Vec<T>,
        }

        Wrapper::deserialize(deserializer).map(|w| ItemSet(w.item))
    }
}

impl<T: Serialize> Serialize for ItemSet<T> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

/// Decode an XML document
pub fn from_str<T: DeserializeOwned>(what: &str, xml: &str) -> Result<T> {
    quick_xml::de::from_str(xml).map_err(|e| QueryError::decode(what, e))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorBody {
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorList {
    #[serde(default)]
    error: Vec<ErrorBody>,
}

/// EC2 wraps errors in `<Response><Errors>`, STS in `<ErrorResponse>`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorDocument {
    errors: Option<ErrorList>,
    error: Option<ErrorBody>,
}

/// Extract `(code, message)` from a Query protocol error document
pub fn parse_error(xml: &str) -> Option<(String, String)> {
    let doc: ErrorDocument = quick_xml::de::from_str(xml).ok()?;
    let body = doc
        .error
        .or_else(|| doc.errors.and_then(|e| e.error.into_iter().next()))?;
    Some((body.code, body.message))
}
