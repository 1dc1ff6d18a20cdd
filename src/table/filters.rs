//! Qualifier to `DescribeImages` filter translation

use crate::aws::ec2::Filter;
use crate::query::{qual_value, IdentityProvider, QualMap, QueryContext, ValueKind};

/// Column, EC2 filter name, and how the qual value is coerced
pub const AMI_FILTER_QUALS: &[(&str, &str, ValueKind)] = &[
    ("architecture", "architecture", ValueKind::String),
    ("description", "description", ValueKind::String),
    ("ena_support", "ena-support", ValueKind::Bool),
    ("hypervisor", "hypervisor", ValueKind::String),
    ("image_id", "image-id", ValueKind::String),
    ("image_type", "image-type", ValueKind::String),
    ("kernel_id", "kernel-id", ValueKind::String),
    ("name", "name", ValueKind::String),
    ("platform", "platform", ValueKind::String),
    ("public", "is-public", ValueKind::Bool),
    ("ramdisk_id", "ramdisk-id", ValueKind::String),
    ("root_device_name", "root-device-name", ValueKind::String),
    ("root_device_type", "root-device-type", ValueKind::String),
    ("state", "state", ValueKind::String),
    ("sriov_net_support", "sriov-net-support", ValueKind::String),
    ("virtualization_type", "virtualization-type", ValueKind::String),
];

const OWNER_FILTER: &str = "owner-id";

/// One filter per mapped column that has a usable qual, in mapping order.
/// Columns missing from the mapping are ignored.
pub fn build_filters(quals: &QualMap, mapping: &[(&str, &str, ValueKind)]) -> Vec<Filter> {
    mapping
        .iter()
        .filter_map(|(column, filter_name, kind)| {
            qual_value(quals, column, *kind).map(|values| Filter::new(filter_name, values))
        })
        .collect()
}

/// Which images an AMI table lists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmiListing {
    /// Images owned by the caller, narrowed by an `owner-id` filter
    Owned,
    /// Images of the owners named in the `owner_id` qual
    Shared,
}

/// Owner to scope an owned listing to: the `owner_id` qual if given,
/// otherwise the caller's account. `None` when identity lookup fails.
pub async fn resolve_owner_scope<P: IdentityProvider>(
    ctx: &QueryContext,
    provider: &P,
) -> Option<Vec<String>> {
    if let Some(owners) = qual_value(&ctx.quals, "owner_id", ValueKind::String) {
        return Some(owners);
    }
    ctx.optional_identity(provider)
        .await
        .map(|identity| vec![identity.account_id.clone()])
}

/// Filters for a `DescribeImages` listing
pub async fn build_ami_filters<P: IdentityProvider>(
    ctx: &QueryContext,
    provider: &P,
    listing: AmiListing,
) -> Vec<Filter> {
    let mut filters = build_filters(&ctx.quals, AMI_FILTER_QUALS);

    if listing == AmiListing::Owned {
        if let Some(owners) = resolve_owner_scope(ctx, provider).await {
            filters.push(Filter::new(OWNER_FILTER, owners));
        }
    }

    tracing::debug!(
        query = %ctx.id,
        "built {} filters: {:?}",
        filters.len(),
        filters.iter().map(|f| f.name.as_str()).collect::<Vec<_>>()
    );
    filters
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::sts::AccountIdentity;
    use crate::error::{QueryError, Result};
    use crate::query::{Operator, QualValue};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Provider {
        calls: AtomicUsize,
        fail: bool,
    }

    impl Provider {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    impl IdentityProvider for Provider {
        async fn resolve_identity(&self) -> Result<AccountIdentity> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(QueryError::Identity("AccessDenied".to_string()));
            }
            Ok(AccountIdentity::new(
                "222222222222",
                "arn:aws:iam::222222222222:root",
                "222222222222",
            ))
        }
    }

    fn s(v: &str) -> QualValue {
        QualValue::String(v.to_string())
    }

    #[test]
    fn test_one_filter_per_column_in_table_order() {
        let quals = QualMap::new()
            .with("state", Operator::Eq, s("available"))
            .with("public", Operator::Eq, QualValue::Bool(true))
            .with("architecture", Operator::Eq, s("x86_64"))
            .with("not_a_column", Operator::Eq, s("x"));

        let filters = build_filters(&quals, AMI_FILTER_QUALS);
        let names: Vec<_> = filters.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["architecture", "is-public", "state"]);
        assert_eq!(filters[1].values, vec!["true".to_string()]);
    }

    #[test]
    fn test_image_id_maps_to_image_id_filter() {
        let quals = QualMap::new().with("image_id", Operator::Eq, s("ami-1"));
        let filters = build_filters(&quals, AMI_FILTER_QUALS);
        assert_eq!(filters, vec![Filter::new("image-id", vec!["ami-1".to_string()])]);
    }

    #[tokio::test]
    async fn test_explicit_owner_skips_identity() {
        let provider = Provider::new(false);
        let quals = QualMap::new().with("owner_id", Operator::Eq, s("111111111111"));
        let ctx = QueryContext::new("aws_ec2_ami", quals, None);

        let filters = build_ami_filters(&ctx, &provider, AmiListing::Owned).await;
        assert_eq!(
            filters,
            vec![Filter::new("owner-id", vec!["111111111111".to_string()])]
        );
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_owned_scope_uses_identity_once() {
        let provider = Provider::new(false);
        let quals = QualMap::new().with("name", Operator::Eq, s("web"));
        let ctx = QueryContext::new("aws_ec2_ami", quals, None);

        let first = build_ami_filters(&ctx, &provider, AmiListing::Owned).await;
        let second = build_ami_filters(&ctx, &provider, AmiListing::Owned).await;
        assert_eq!(first, second);
        assert_eq!(
            first.last(),
            Some(&Filter::new("owner-id", vec!["222222222222".to_string()]))
        );
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_identity_failure_drops_owner_filter() {
        let provider = Provider::new(true);
        let quals = QualMap::new().with("name", Operator::Eq, s("web"));
        let ctx = QueryContext::new("aws_ec2_ami", quals, None);

        let filters = build_ami_filters(&ctx, &provider, AmiListing::Owned).await;
        assert_eq!(filters, vec![Filter::new("name", vec!["web".to_string()])]);
    }

    #[tokio::test]
    async fn test_shared_listing_has_no_owner_filter() {
        let provider = Provider::new(false);
        let quals = QualMap::new().with("owner_id", Operator::Eq, s("111111111111"));
        let ctx = QueryContext::new("aws_ec2_ami_shared", quals, None);

        let filters = build_ami_filters(&ctx, &provider, AmiListing::Shared).await;
        assert!(filters.is_empty());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }
}
