//! Query context
//!
//! Per-query state passed by reference into every list, get and hydrate
//! function: the key-column quals, the requested limit and the cached
//! caller identity.

use crate::aws::sts::AccountIdentity;
use crate::error::{QueryError, Result};
use crate::query::QualMap;
use tokio::sync::OnceCell;
use uuid::Uuid;

/// Source of the caller's own account identity
#[allow(async_fn_in_trait)]
pub trait IdentityProvider {
    async fn resolve_identity(&self) -> Result<AccountIdentity>;
}

pub struct QueryContext {
    pub id: Uuid,
    pub table: String,
    /// Quals on the table's key columns, with operators the table accepts
    pub quals: QualMap,
    pub limit: Option<usize>,
    // Failures are cached too: one identity call per query, at most.
    identity: OnceCell<std::result::Result<AccountIdentity, String>>,
}

impl QueryContext {
    pub fn new(table: &str, quals: QualMap, limit: Option<usize>) -> Self {
        Self {
            id: Uuid::new_v4(),
            table: table.to_string(),
            quals,
            limit,
            identity: OnceCell::new(),
        }
    }

    /// The caller's identity, resolved on first use and cached for the
    /// rest of the query
    pub async fn account_identity<P: IdentityProvider>(
        &self,
        provider: &P,
    ) -> Result<&AccountIdentity> {
        let cached = self
            .identity
            .get_or_init(|| async {
                tracing::debug!(query = %self.id, "resolving caller identity");
                provider
                    .resolve_identity()
                    .await
                    .map_err(|e| e.to_string())
            })
            .await;

        cached
            .as_ref()
            .map_err(|msg| QueryError::Identity(msg.clone()))
    }

    /// Like [`account_identity`](Self::account_identity), but a failure
    /// yields `None` for callers that only use the identity to narrow
    /// results
    pub async fn optional_identity<P: IdentityProvider>(
        &self,
        provider: &P,
    ) -> Option<&AccountIdentity> {
        match self.account_identity(provider).await {
            Ok(identity) => Some(identity),
            Err(e) => {
                tracing::warn!(query = %self.id, "continuing without owner scope: {}", e);
                None
            }
        }
    }

    /// Page size for a listing call: the provider maximum, or the query
    /// limit when smaller (never below the provider minimum)
    pub fn page_size(&self, max: u32, min: u32) -> u32 {
        match self.limit {
            Some(limit) if (limit as u64) < max as u64 => (limit as u32).max(min),
            _ => max,
        }
    }
}
